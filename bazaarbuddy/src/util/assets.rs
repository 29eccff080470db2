use std::path::PathBuf;

use anyhow::{Result, bail};

pub const ASSETS_ENV: &str = "BAZAARBUDDY_ASSETS_DIR";

const DETECTION: &str = "detection.mnn";
const RECOGNITION: &str = "latin_recognition.mnn";
const CHARSET: &str = "latin_charset.txt";

#[derive(Debug, Clone)]
pub struct OcrAssets {
	pub detection: PathBuf,
	pub recognition: PathBuf,
	pub charset: PathBuf,
}

impl OcrAssets {
	fn in_dir(dir: &std::path::Path) -> Option<Self> {
		let assets = Self {
			detection: dir.join(DETECTION),
			recognition: dir.join(RECOGNITION),
			charset: dir.join(CHARSET),
		};
		(assets.detection.is_file() && assets.recognition.is_file() && assets.charset.is_file()).then_some(assets)
	}
}

// The env var may name the app root (containing `ocr/`) or the `ocr/` folder itself.
fn normalize_ocr_dir(dir: PathBuf) -> PathBuf {
	if dir.join(DETECTION).is_file() {
		dir
	} else {
		dir.join("ocr")
	}
}

fn candidates() -> Vec<PathBuf> {
	let mut out = Vec::new();
	if let Some(dir) = std::env::var_os(ASSETS_ENV) {
		out.push(PathBuf::from(dir));
	}
	if let Ok(exe) = std::env::current_exe()
		&& let Some(dir) = exe.parent()
	{
		out.push(dir.to_path_buf());
	}
	if let Ok(cwd) = std::env::current_dir() {
		out.push(cwd);
	}
	#[cfg(debug_assertions)]
	out.push(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".."));
	out
}

/// Locate the OCR model files next to the executable, in the CWD, or under
/// `BAZAARBUDDY_ASSETS_DIR`.
pub fn resolve_ocr_assets() -> Result<OcrAssets> {
	resolve_in(candidates())
}

fn resolve_in(bases: Vec<PathBuf>) -> Result<OcrAssets> {
	let mut tried = Vec::new();
	for base in bases {
		let dir = normalize_ocr_dir(base);
		if let Some(assets) = OcrAssets::in_dir(&dir) {
			return Ok(assets);
		}
		tried.push(dir);
	}

	bail!(
		"OCR model files not found. Expected ocr/{DETECTION}, ocr/{RECOGNITION} and ocr/{CHARSET}.\n\nSearched in:\n{}\n\nCopy the 'ocr/' folder next to the executable or set {ASSETS_ENV}.",
		tried
			.into_iter()
			.map(|p| format!("  - {}", p.display()))
			.collect::<Vec<_>>()
			.join("\n")
	)
}

#[cfg(test)]
mod tests {
	use std::fs;

	use super::*;

	fn populate(dir: &std::path::Path) {
		fs::create_dir_all(dir).unwrap();
		for name in [DETECTION, RECOGNITION, CHARSET] {
			fs::write(dir.join(name), b"x").unwrap();
		}
	}

	#[test]
	fn accepts_root_or_ocr_folder() {
		let root = tempfile::tempdir().unwrap();
		populate(&root.path().join("ocr"));

		let found = resolve_in(vec![root.path().to_path_buf()]).unwrap();
		assert_eq!(found.detection, root.path().join("ocr").join(DETECTION));

		let found = resolve_in(vec![root.path().join("ocr")]).unwrap();
		assert_eq!(found.charset, root.path().join("ocr").join(CHARSET));
	}

	#[test]
	fn missing_files_list_searched_dirs() {
		let root = tempfile::tempdir().unwrap();
		let err = resolve_in(vec![root.path().to_path_buf()]).unwrap_err();
		assert!(format!("{err}").contains(&root.path().join("ocr").display().to_string()));
	}
}
