//! OCR wrapper around `ocr-rs` (Rust PaddleOCR bindings).
//!
//! Preprocessing lives in `Image::get_text(...)`; this module only owns the
//! engine and the optional debug snapshot directory.

use std::{
	path::{Path, PathBuf},
	sync::atomic::{AtomicU32, Ordering},
};

use anyhow::{Context, Result};

pub struct Ocr {
	engine: ocr_rs::OcrEngine,
}

impl Ocr {
	/// Load the detection/recognition models and the charset.
	pub fn try_new(detection: impl AsRef<Path>, recognition: impl AsRef<Path>, charset: impl AsRef<Path>) -> Result<Self> {
		let thread_count = std::thread::available_parallelism()
			.map(|n| n.get())
			.unwrap_or(1);

		let engine = ocr_rs::OcrEngine::new(
			detection,
			recognition,
			charset,
			Some(ocr_rs::OcrEngineConfig {
				backend: ocr_rs::Backend::CPU,
				thread_count,
				precision_mode: ocr_rs::PrecisionMode::High,
				enable_parallel: thread_count > 1,
				min_result_confidence: 0.5,
				..Default::default()
			}),
		)
		.context("failed to initialize OCR engine")?;

		Ok(Self { engine })
	}

	/// Recognize text from an RGB image view, joining the detected lines with spaces.
	pub fn get_text(&self, image: crate::Image) -> Result<String> {
		let image = ocr_rs::preprocess::rgb_to_image(&image.get_bytes(), image.width(), image.height());
		let results = self.engine.recognize(&image).context("recognize")?;
		Ok(results
			.into_iter()
			.map(|v| v.text)
			.collect::<Vec<_>>()
			.join(" "))
	}
}

/// Numbered PNG snapshots of every OCR'd crop.
pub struct DebugSink {
	dir: PathBuf,
	counter: AtomicU32,
}

impl DebugSink {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self {
			dir: dir.into(),
			counter: AtomicU32::new(0),
		}
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Write `ocr_NNNN_roi_raw.png` and `ocr_NNNN_roi_th.png`. Failures are logged only.
	pub fn save(&self, raw: crate::Image, binarized: &image::GrayImage) {
		let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
		let raw_path = self.dir.join(format!("ocr_{n:04}_roi_raw.png"));
		let th_path = self.dir.join(format!("ocr_{n:04}_roi_th.png"));

		let result = std::fs::create_dir_all(&self.dir)
			.context("create debug dir")
			.and_then(|_| raw.save_png(&raw_path))
			.and_then(|_| binarized.save(&th_path).context("save binarized png"));
		match result {
			Ok(()) => tracing::debug!(raw = %raw_path.display(), th = %th_path.display(), "ocr snapshot"),
			Err(err) => tracing::warn!(error = %format!("{err:#}"), "failed to write ocr snapshot"),
		}
	}
}
