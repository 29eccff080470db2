//! Image primitives.
//!
//! Screen captures are stored as an owned RGB buffer (`OwnedImage`) and most
//! work happens on borrowed rectangular views (`Image<'a>`), so cropping a
//! capture down to a probe region or a name ROI never copies pixels.

use std::path::Path;

use anyhow::{Context, Result};

/// Owned RGB image (no alpha).
#[derive(Clone, Debug)]
pub struct OwnedImage {
	width: u32,
	height: u32,
	data: Vec<Color>,
}

impl OwnedImage {
	/// Build an `OwnedImage` from tightly packed RGBA bytes (alpha is discarded).
	pub fn from_rgba(width: usize, bytes: &[u8]) -> Self {
		let height = bytes.len() / width.max(1) / 4;
		let data = bytes
			.chunks_exact(4)
			.map(|v| Color::new(v[0], v[1], v[2]))
			.collect::<Vec<_>>();

		Self {
			width: width as u32,
			height: height as u32,
			data,
		}
	}

	pub fn from_png_file(path: &Path) -> Result<Self> {
		let img = image::open(path)
			.with_context(|| format!("decode {}", path.display()))?
			.to_rgb8();
		let (width, height) = img.dimensions();
		let data = img.pixels().map(|p| Color::new(p.0[0], p.0[1], p.0[2])).collect();
		Ok(Self { width, height, data })
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	/// Resize this image to the given height (preserving aspect ratio).
	pub fn resize_h(&mut self, height: u32) -> Result<()> {
		if self.height == height {
			return Ok(());
		}

		let height = height.max(1);
		let width = ((self.width as u64 * height as u64 / self.height.max(1) as u64) as u32).max(1);

		// SAFETY: `Color` is `#[repr(C)]` with 3 x `u8`, so it is layout-compatible
		// with `fast_image_resize::pixels::U8x3` (alignment 1).
		let src_pixels = unsafe {
			std::slice::from_raw_parts(
				self.data.as_ptr() as *const fast_image_resize::pixels::U8x3,
				self.data.len(),
			)
		};
		let src = fast_image_resize::images::ImageRef::from_pixels(self.width, self.height, src_pixels)
			.context("wrap pixels for resize")?;
		let mut dst = fast_image_resize::images::Image::new(width, height, fast_image_resize::PixelType::U8x3);

		let options = fast_image_resize::ResizeOptions::new().resize_alg(
			fast_image_resize::ResizeAlg::Convolution(fast_image_resize::FilterType::Bilinear),
		);
		fast_image_resize::Resizer::new()
			.resize(&src, &mut dst, &Some(options))
			.context("resize")?;

		self.data = dst
			.into_vec()
			.chunks_exact(3)
			.map(|px| Color::new(px[0], px[1], px[2]))
			.collect();
		self.width = width;
		self.height = height;
		Ok(())
	}

	/// Create a borrowed view of this entire image.
	pub fn as_image(&self) -> Image<'_> {
		Image {
			x1: 0,
			y1: 0,
			x2: self.width,
			y2: self.height,
			true_width: self.width,
			data: &self.data,
		}
	}

	pub fn to_gray_image(&self) -> image::GrayImage {
		image::GrayImage::from_fn(self.width, self.height, |x, y| {
			image::Luma([self.data[(x + y * self.width) as usize].luma()])
		})
	}

	/// Create an RGB `OwnedImage` from a grayscale image (each pixel repeated into RGB).
	pub fn from_gray_as_rgb(gray: &image::GrayImage) -> Self {
		let (width, height) = gray.dimensions();
		let data = gray.pixels().map(|p| Color::new(p.0[0], p.0[0], p.0[0])).collect();
		Self { width, height, data }
	}
}

// ----------

/// Borrowed image view into an `OwnedImage`.
#[derive(Clone, Copy)]
pub struct Image<'a> {
	x1: u32,
	y1: u32,
	x2: u32,
	y2: u32,
	true_width: u32,
	data: &'a [Color],
}

impl<'a> Image<'a> {
	#[inline(always)]
	pub fn width(&self) -> u32 {
		self.x2 - self.x1
	}

	#[inline(always)]
	pub fn height(&self) -> u32 {
		self.y2 - self.y1
	}

	#[inline(always)]
	fn pixel(&self, x: u32, y: u32) -> &Color {
		&self.data[(x + y * self.true_width) as usize]
	}

	/// Pixel at view-relative coordinates.
	#[inline(always)]
	pub(crate) fn at(&self, x: u32, y: u32) -> Color {
		*self.pixel(self.x1 + x, self.y1 + y)
	}

	pub fn to_owned_image(self) -> OwnedImage {
		let mut data = Vec::with_capacity((self.width() * self.height()) as usize);
		for y in self.y1..self.y2 {
			for x in self.x1..self.x2 {
				data.push(*self.pixel(x, y));
			}
		}

		OwnedImage {
			width: self.width(),
			height: self.height(),
			data,
		}
	}

	pub fn to_gray_image(&self) -> image::GrayImage {
		image::GrayImage::from_fn(self.width(), self.height(), |x, y| {
			image::Luma([self.pixel(self.x1 + x, self.y1 + y).luma()])
		})
	}

	pub fn get_bytes(&self) -> Vec<u8> {
		let mut bytes = Vec::with_capacity((self.width() * self.height() * 3) as usize);
		for y in self.y1..self.y2 {
			for x in self.x1..self.x2 {
				let clr = self.pixel(x, y);
				bytes.extend_from_slice(&[clr.r, clr.g, clr.b]);
			}
		}
		bytes
	}

	pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
		let img = image::RgbImage::from_raw(self.width(), self.height(), self.get_bytes())
			.context("RgbImage::from_raw failed")?;
		img.save_with_format(path, image::ImageFormat::Png)
			.context("save png")?;
		Ok(())
	}

	/// Create an arbitrary subimage (relative coordinates), clamped to this view.
	pub fn sub_image(&self, x: u32, y: u32, width: u32, height: u32) -> Self {
		let x = x.min(self.width());
		let y = y.min(self.height());
		let width = width.min(self.width() - x);
		let height = height.min(self.height() - y);

		Self {
			x1: self.x1 + x,
			y1: self.y1 + y,
			x2: self.x1 + x + width,
			y2: self.y1 + y + height,
			true_width: self.true_width,
			data: self.data,
		}
	}

	/// Read a single line of text.
	///
	/// The crop is upscaled 1.5x and binarized twice (global Otsu and adaptive);
	/// the more plausible recognition wins. With a `debug` sink the raw crop and
	/// the Otsu binarization are written out for inspection.
	pub fn get_text(&self, ocr: &crate::Ocr, debug: Option<&crate::DebugSink>) -> Result<String> {
		use imageproc::contrast::{ThresholdType, adaptive_threshold, otsu_level, threshold};

		let mut base = self.to_owned_image();
		base.resize_h(base.height() * 3 / 2)?;
		let gray = base.to_gray_image();

		let otsu = ensure_dark_text_on_light(threshold(&gray, otsu_level(&gray), ThresholdType::Binary));
		let adaptive = ensure_dark_text_on_light(adaptive_threshold(&gray, 7, 10));

		if let Some(debug) = debug {
			debug.save(*self, &otsu);
		}

		let mut best = String::new();
		let mut best_score = i64::MIN;
		for cand in [otsu, adaptive] {
			let text = ocr.get_text(OwnedImage::from_gray_as_rgb(&cand).as_image())?;
			let score = score_ocr_text(&text);
			if score > best_score {
				best_score = score;
				best = text;
			}
		}
		Ok(best.trim().to_owned())
	}
}

fn ensure_dark_text_on_light(mut bin: image::GrayImage) -> image::GrayImage {
	// Mostly black means light text on a dark background.
	let white = bin.pixels().filter(|p| p.0[0] > 0).count();
	if white * 2 < (bin.width() * bin.height()) as usize {
		for p in bin.pixels_mut() {
			p.0[0] = 255 - p.0[0];
		}
	}
	bin
}

/// Prefer readings with more alphanumerics and slightly more length.
fn score_ocr_text(text: &str) -> i64 {
	let mut score = 0i64;
	for ch in text.chars() {
		if ch.is_ascii_alphanumeric() {
			score += 3;
		} else if !ch.is_whitespace() {
			score += 1;
		}
	}
	score + text.len() as i64
}

// ----------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
}

impl Color {
	#[inline]
	pub const fn new(r: u8, g: u8, b: u8) -> Self {
		Self { r, g, b }
	}

	/// Luma (grayscale intensity), ITU-R 601 weights.
	pub fn luma(&self) -> u8 {
		let r = self.r as u32;
		let g = self.g as u32;
		let b = self.b as u32;
		((299 * r + 587 * g + 114 * b) / 1000) as u8
	}
}
