//! Live-tunable pacing read from the shared configuration file.
//!
//! The file looks like `{"fastsell": {"interval": 0.3}}` (other keys are
//! ignored). It is re-read before every timed step so edits apply mid-run.

use std::{
	fs,
	path::{Path, PathBuf},
	time::Duration,
};

use anyhow::{Context, Result};

/// Fallback step interval of the automation services (seconds).
pub const AUTOMATION_FALLBACK_INTERVAL: f32 = 0.3;
/// Fallback of the standalone fast-click tool (seconds).
pub const FASTCLICK_FALLBACK_INTERVAL: f32 = 0.0;

const MAX_INTERVAL: f32 = 600.0;

#[derive(Debug, Clone)]
pub struct IntervalSource {
	path: Option<PathBuf>,
	fallback: f32,
}

impl IntervalSource {
	/// Read `fastsell.interval` from `path`, using `fallback` when absent or broken.
	pub fn file(path: impl Into<PathBuf>, fallback: f32) -> Self {
		Self {
			path: Some(path.into()),
			fallback: clamp_interval(fallback),
		}
	}

	/// A constant interval (no file involved).
	pub fn fixed(secs: f32) -> Self {
		Self {
			path: None,
			fallback: clamp_interval(secs),
		}
	}

	pub fn path(&self) -> Option<&Path> {
		self.path.as_deref()
	}

	/// Current interval in seconds, never negative.
	pub fn seconds(&self) -> f32 {
		let Some(path) = &self.path else {
			return self.fallback;
		};
		if !path.exists() {
			return self.fallback;
		}
		match read_interval(path) {
			Ok(Some(secs)) => clamp_interval(secs),
			Ok(None) => self.fallback,
			Err(err) => {
				tracing::warn!(error = %format!("{err:#}"), "bad interval config; using fallback");
				self.fallback
			}
		}
	}

	pub fn read(&self) -> Duration {
		Duration::from_secs_f32(self.seconds())
	}
}

fn read_interval(path: &Path) -> Result<Option<f32>> {
	let json = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
	parse_interval(&json).with_context(|| format!("parse {}", path.display()))
}

/// Extract `fastsell.interval`. `Ok(None)` means "not configured".
pub fn parse_interval(json: &str) -> Result<Option<f32>> {
	let value: serde_json::Value = serde_json::from_str(json)?;
	let interval = value
		.get("fastsell")
		.and_then(|fs| fs.get("interval"))
		.filter(|v| !v.is_null());
	match interval {
		None => Ok(None),
		Some(v) => {
			let secs = v
				.as_f64()
				.with_context(|| format!("fastsell.interval is not a number: {v}"))?;
			Ok(Some(secs as f32))
		}
	}
}

/// Negative (and NaN) intervals become zero.
pub fn clamp_interval(secs: f32) -> f32 {
	if secs.is_nan() {
		return 0.0;
	}
	secs.clamp(0.0, MAX_INTERVAL)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn source_with(json: &str) -> (tempfile::TempDir, IntervalSource) {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.json");
		fs::write(&path, json).unwrap();
		(dir, IntervalSource::file(path, AUTOMATION_FALLBACK_INTERVAL))
	}

	#[test]
	fn negative_interval_is_clamped_to_zero() {
		let (_dir, source) = source_with(r#"{"fastsell": {"interval": -1}}"#);
		assert_eq!(source.seconds(), 0.0);
		assert_eq!(source.read(), Duration::ZERO);
		assert_eq!(IntervalSource::fixed(-1.0).seconds(), 0.0);
	}

	#[test]
	fn missing_file_or_field_uses_fallback() {
		let dir = tempfile::tempdir().unwrap();
		let missing = IntervalSource::file(dir.path().join("nope.json"), FASTCLICK_FALLBACK_INTERVAL);
		assert_eq!(missing.seconds(), 0.0);

		let (_dir, source) = source_with(r#"{"ui": {}}"#);
		assert_eq!(source.seconds(), AUTOMATION_FALLBACK_INTERVAL);
	}

	#[test]
	fn malformed_file_uses_fallback() {
		let (_dir, source) = source_with("{ not json");
		assert_eq!(source.seconds(), AUTOMATION_FALLBACK_INTERVAL);

		let (_dir, source) = source_with(r#"{"fastsell": {"interval": "fast"}}"#);
		assert_eq!(source.seconds(), AUTOMATION_FALLBACK_INTERVAL);
	}

	#[test]
	fn edits_are_picked_up_on_next_read() {
		let (dir, source) = source_with(r#"{"fastsell": {"interval": 0.5}}"#);
		assert_eq!(source.seconds(), 0.5);
		fs::write(dir.path().join("config.json"), r#"{"fastsell": {"interval": 1.25}}"#).unwrap();
		assert_eq!(source.seconds(), 1.25);
	}
}
