//! Narrow interfaces to the outside world.

use std::path::Path;

use anyhow::Result;

use crate::{Match, Point, Region};

/// Keys the scripts send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
	Char(char),
	Enter,
	Escape,
}

impl std::fmt::Display for Key {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Key::Char(c) => write!(f, "{c}"),
			Key::Enter => write!(f, "enter"),
			Key::Escape => write!(f, "esc"),
		}
	}
}

/// Screen capture, template matching and text extraction.
pub trait ScreenProbe: Send + Sync {
	/// Returns an error if the backend cannot work at all (no monitor, no OCR models...).
	fn check(&self) -> Result<()> {
		Ok(())
	}

	/// Capture `region` and look for `template` in it.
	///
	/// Returns the best hit whose score reaches `threshold`.
	fn find(&self, region: Region, template: &Path, threshold: f32) -> Result<Option<Match>>;

	/// Capture `region` and read the text in it.
	fn read_text(&self, region: Region) -> Result<String>;
}

/// Pointer and keyboard injection.
pub trait InputInjector: Send + Sync {
	fn check(&self) -> Result<()> {
		Ok(())
	}

	fn move_to(&self, at: Point) -> Result<()>;

	/// Left click at the current pointer position.
	fn click(&self) -> Result<()>;

	fn press(&self, key: Key) -> Result<()>;

	fn type_text(&self, text: &str) -> Result<()>;

	fn click_at(&self, at: Point) -> Result<()> {
		self.move_to(at)?;
		self.click()
	}
}
