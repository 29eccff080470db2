mod image;
pub use image::*;
mod ocr;
pub use ocr::{DebugSink, Ocr};
mod template;
pub use template::*;

/// Image evaluation: template probes and text reads on captured screen regions.
pub struct Ie {
	ocr: Option<Ocr>,
	templates: TemplateCache,
	debug: Option<DebugSink>,
}

impl Ie {
	/// `ocr` may be missing (models not installed); template probes still work.
	pub fn new(ocr: Option<Ocr>, debug: Option<DebugSink>) -> Self {
		Self {
			ocr,
			templates: TemplateCache::default(),
			debug,
		}
	}

	pub fn has_ocr(&self) -> bool {
		self.ocr.is_some()
	}

	pub fn find_template(&self, image: Image, template: &std::path::Path, threshold: f32) -> anyhow::Result<Option<TemplateMatch>> {
		self.templates.find(image, template, threshold)
	}

	pub fn read_text(&self, image: Image) -> anyhow::Result<String> {
		let ocr = self.ocr.as_ref().ok_or_else(|| anyhow::anyhow!("OCR models not loaded"))?;
		image.get_text(ocr, self.debug.as_ref())
	}

	pub fn reload_templates(&self) {
		self.templates.clear();
	}
}
