use std::{
	fs::File,
	io::{BufReader, BufWriter, Write},
	path::{Path, PathBuf},
	time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};

pub mod schema;
mod analyze;
pub use analyze::*;
pub mod flips;

/// One analyzed bazaar scan.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
	pub timestamp: u64,
	pub rows: Vec<MarketRow>,
	/// Set when the rows came from the on-disk cache instead of the network.
	#[serde(skip)]
	pub cached: bool,
}

impl Snapshot {
	pub fn default_cache_path() -> Option<PathBuf> {
		dirs::cache_dir().map(|p| p.join("BazaarBuddy").join("bazaar_cache.json"))
	}

	fn load_cache(path: &Path) -> Result<Self> {
		let file = File::open(path).with_context(|| format!("Open cache {}", path.display()))?;
		let reader = BufReader::new(file);
		let mut data: Self = serde_json::from_reader(reader).with_context(|| format!("Parse cache {}", path.display()))?;
		data.cached = true;
		Ok(data)
	}

	fn save_cache(&self, path: &Path) -> Result<()> {
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent).with_context(|| format!("Create cache dir {}", parent.display()))?;
		}

		let tmp = path.with_extension("json.tmp");
		let file = File::create(&tmp).with_context(|| format!("Write cache temp {}", tmp.display()))?;
		let mut writer = BufWriter::new(file);
		serde_json::to_writer(&mut writer, self).context("Serialize cache")?;
		writer.flush().context("Flush cache")?;
		drop(writer);

		// Replace existing file (Windows-friendly).
		if std::fs::rename(&tmp, path).is_err() {
			let _ = std::fs::remove_file(path);
			std::fs::rename(&tmp, path).with_context(|| format!("Persist cache {}", path.display()))?;
		}
		Ok(())
	}

	fn fetch_remote() -> Result<Self> {
		let mut res = ureq::get(schema::bazaar::URL)
			.call()
			.context("GET bazaar")?;
		let bazaar = res
			.body_mut()
			.read_json::<schema::bazaar::Bazaar>()
			.context("Decode bazaar JSON")?;
		anyhow::ensure!(bazaar.success, "bazaar API reported success=false");

		let mut res = ureq::get(schema::items::URL)
			.call()
			.context("GET items")?;
		let items = res
			.body_mut()
			.read_json::<schema::items::Items>()
			.context("Decode items JSON")?;

		let timestamp = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_secs())
			.unwrap_or_default();
		let meta = item_meta(items);
		Ok(Self {
			timestamp,
			rows: analyze(&bazaar.products, &meta, timestamp),
			cached: false,
		})
	}

	/// Fetch from the network; if it fails, fall back to the cached copy at `cache` (if any).
	pub fn try_fetch(cache: Option<&Path>) -> Result<Self> {
		Self::resolve(Self::fetch_remote(), cache)
	}

	fn resolve(fetched: Result<Self>, cache: Option<&Path>) -> Result<Self> {
		match fetched {
			Ok(data) => {
				if let Some(path) = cache
					&& let Err(err) = data.save_cache(path)
				{
					tracing::warn!(error = %format!("{err:#}"), "failed to write bazaar cache");
				}
				Ok(data)
			}
			Err(err) => match cache.map(Self::load_cache) {
				Some(Ok(cached)) => {
					tracing::warn!(error = %format!("{err:#}"), "using cached bazaar data due to network error");
					Ok(cached)
				}
				_ => Err(err),
			},
		}
	}
}
