//! Screen capture through `xcap`, and the [`ScreenProbe`] built on it.

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use automation::{Match, Region, ScreenProbe};
use xcap::image::EncodableLayout;

/// Capture `region` (virtual desktop coordinates) from the monitor containing its top-left corner.
pub fn capture_region(region: Region) -> Result<ie::OwnedImage> {
	let monitor = xcap::Monitor::from_point(region.x, region.y)
		.with_context(|| format!("no monitor at {}", region.top_left()))?;
	let (mx, my) = (
		monitor.x().context("monitor x")?,
		monitor.y().context("monitor y")?,
	);
	let img = monitor.capture_image().context("capture monitor")?;
	let full = ie::OwnedImage::from_rgba(img.width() as usize, img.as_bytes());

	let view = full.as_image().sub_image(
		(region.x - mx).max(0) as u32,
		(region.y - my).max(0) as u32,
		region.width,
		region.height,
	);
	anyhow::ensure!(view.width() > 0 && view.height() > 0, "region {region:?} is off screen");
	Ok(view.to_owned_image())
}

pub struct XcapProbe {
	ie: Arc<ie::Ie>,
	/// Whether `check()` should also require the OCR models.
	needs_text: bool,
}

impl XcapProbe {
	pub fn new(ie: Arc<ie::Ie>) -> Self {
		Self { ie, needs_text: false }
	}

	pub fn with_text(ie: Arc<ie::Ie>) -> Self {
		Self { ie, needs_text: true }
	}
}

impl ScreenProbe for XcapProbe {
	fn check(&self) -> Result<()> {
		let monitors = xcap::Monitor::all().context("enumerate monitors")?;
		anyhow::ensure!(!monitors.is_empty(), "no monitor available for capture");
		if self.needs_text {
			anyhow::ensure!(self.ie.has_ocr(), "OCR models not loaded");
		}
		Ok(())
	}

	fn find(&self, region: Region, template: &Path, threshold: f32) -> Result<Option<Match>> {
		let image = capture_region(region)?;
		let found = self.ie.find_template(image.as_image(), template, threshold)?;
		Ok(found.map(|m| Match {
			center: region.top_left().offset(m.x as i32, m.y as i32),
			score: m.score,
		}))
	}

	fn read_text(&self, region: Region) -> Result<String> {
		let image = capture_region(region)?;
		self.ie.read_text(image.as_image())
	}
}
