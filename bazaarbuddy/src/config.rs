//! Persistent application configuration.
//!
//! Stored as JSON in a platform-appropriate config directory. The automation
//! services re-read `fastsell.interval` from the same file before every step,
//! so saving here is how pacing edits reach a running service.

use std::{collections::BTreeMap, fs, path::PathBuf};

use anyhow::{Context, Result};
use data::flips::{FlipFilter, FlipMode, SortOrder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	pub fastsell: FastSell,

	/// Holds `selecteditems.json`, `coordinates.json` and `template/`.
	pub data_dir: PathBuf,

	pub hotkeys: Hotkeys,
	/// When set, only the full-auto hotkey is registered.
	pub fullauto_mode: bool,

	pub collect_threshold: f32,
	pub orange_threshold: f32,
	/// Force-stop the collect phase of full-auto after this many seconds.
	pub collect_cutoff_s: Option<f32>,

	/// Write every OCR'd crop here when set.
	pub ocr_debug_dir: Option<PathBuf>,

	pub market: Market,

	pub ui_zoom_factor: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FastSell {
	/// Seconds between automation steps.
	pub interval: f32,
}

impl Default for FastSell {
	fn default() -> Self {
		Self {
			interval: automation::settings::AUTOMATION_FALLBACK_INTERVAL,
		}
	}
}

/// Key names as accepted by [`crate::hotkey::vk_code`]. Empty disables a binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hotkeys {
	pub collect: String,
	pub buy: String,
	pub fullauto: String,
	pub fastsell: String,
}

impl Default for Hotkeys {
	fn default() -> Self {
		Self {
			collect: "F1".into(),
			buy: "F2".into(),
			fullauto: "Insert".into(),
			fastsell: String::new(),
		}
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Market {
	pub filter: FlipFilter,
	pub sort: BTreeMap<String, SortOrder>,
	/// Amount queued by the market cards' queue button.
	pub queue_amount: u32,
	/// Seconds between background rescans; 0 disables them.
	pub auto_refresh_s: u64,
}

impl Market {
	pub fn sort_mut(&mut self, mode: FlipMode) -> &mut SortOrder {
		self.sort.entry(format!("{mode:?}")).or_default()
	}

	pub fn sort(&self, mode: FlipMode) -> SortOrder {
		self.sort.get(&format!("{mode:?}")).cloned().unwrap_or_default()
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			fastsell: FastSell::default(),
			data_dir: default_data_dir(),
			hotkeys: Hotkeys::default(),
			fullauto_mode: false,
			collect_threshold: 0.85,
			orange_threshold: 0.70,
			collect_cutoff_s: None,
			ocr_debug_dir: None,
			market: Market::default(),
			ui_zoom_factor: 1.0,
		}
	}
}

fn default_data_dir() -> PathBuf {
	dirs::data_dir()
		.map(|p| p.join("BazaarBuddy"))
		.unwrap_or_else(|| PathBuf::from("data"))
}

impl Config {
	/// Path to the config file.
	pub fn path() -> Result<PathBuf> {
		let base = dirs::config_dir().context("config_dir() unavailable")?;
		Ok(base.join("BazaarBuddy").join("config.json"))
	}

	/// Load configuration from disk, falling back to defaults.
	pub fn load_or_default() -> Self {
		match Self::try_load() {
			Ok(cfg) => cfg,
			Err(err) => {
				tracing::warn!(error = %format!("{err:#}"), "failed to load config; using defaults");
				Self::default()
			}
		}
	}

	/// Try to load configuration from disk. A missing file yields defaults.
	pub fn try_load() -> Result<Self> {
		let path = Self::path()?;
		if !path.exists() {
			return Ok(Self::default());
		}
		let json = fs::read_to_string(&path).with_context(|| format!("read {:?}", path))?;
		let cfg = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
		Ok(cfg)
	}

	/// Save configuration to disk.
	pub fn save(&self) -> Result<()> {
		let path = Self::path()?;
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
		}
		let json = serde_json::to_string_pretty(self).context("serialize config")?;
		fs::write(&path, json).with_context(|| format!("write {:?}", path))?;
		Ok(())
	}

	pub fn queue_path(&self) -> PathBuf {
		self.data_dir.join("selecteditems.json")
	}

	pub fn coords_path(&self) -> PathBuf {
		self.data_dir.join("coordinates.json")
	}

	pub fn template_dir(&self) -> PathBuf {
		self.data_dir.join("template")
	}

	pub fn queue_amount(&self) -> u32 {
		self.market.queue_amount.max(1)
	}
}
