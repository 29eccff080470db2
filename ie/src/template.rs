//! Template matching with zero-mean normalized cross-correlation over RGB.
//!
//! Scores follow the usual `TM_CCOEFF_NORMED` definition: 1.0 is a perfect
//! match, 0.0 is uncorrelated. Flat windows (zero variance) score 0.

use std::{
	collections::HashMap,
	path::{Path, PathBuf},
	sync::{Arc, Mutex, PoisonError},
};

use anyhow::Result;

use crate::{Image, OwnedImage};

/// Best match, as the template centre relative to the searched view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemplateMatch {
	pub x: u32,
	pub y: u32,
	pub score: f32,
}

/// Slide `template` over `haystack` and return the highest scoring position.
/// `None` when the template does not fit inside the haystack.
pub fn best_match(haystack: Image, template: Image) -> Option<TemplateMatch> {
	let (tw, th) = (template.width(), template.height());
	let (hw, hh) = (haystack.width(), haystack.height());
	if tw == 0 || th == 0 || tw > hw || th > hh {
		return None;
	}
	let n = (tw * th) as f64;

	let mut mean = [0f64; 3];
	for y in 0..th {
		for x in 0..tw {
			let c = channels(template.at(x, y));
			for i in 0..3 {
				mean[i] += c[i];
			}
		}
	}
	mean.iter_mut().for_each(|m| *m /= n);

	let centred = (0..th)
		.flat_map(|y| (0..tw).map(move |x| (x, y)))
		.map(|(x, y)| {
			let c = channels(template.at(x, y));
			[c[0] - mean[0], c[1] - mean[1], c[2] - mean[2]]
		})
		.collect::<Vec<_>>();
	let template_energy: f64 = centred.iter().flatten().map(|v| v * v).sum();

	let sums = Integral::new(haystack);
	let mut best = TemplateMatch { x: 0, y: 0, score: f32::MIN };
	for oy in 0..=(hh - th) {
		for ox in 0..=(hw - tw) {
			// The centred template sums to zero, so the window mean drops out of the numerator.
			let mut num = 0f64;
			for y in 0..th {
				for x in 0..tw {
					let c = channels(haystack.at(ox + x, oy + y));
					let t = centred[(x + y * tw) as usize];
					num += c[0] * t[0] + c[1] * t[1] + c[2] * t[2];
				}
			}

			let (sum, sq) = sums.window(ox, oy, tw, th);
			let variance: f64 = (0..3).map(|i| sq[i] - sum[i] * sum[i] / n).sum();
			let denom = (variance * template_energy).sqrt();
			let score = if denom > f64::EPSILON { (num / denom) as f32 } else { 0.0 };

			if score > best.score {
				best = TemplateMatch {
					x: ox + tw / 2,
					y: oy + th / 2,
					score,
				};
			}
		}
	}
	Some(best)
}

#[inline(always)]
fn channels(c: crate::Color) -> [f64; 3] {
	[c.r as f64, c.g as f64, c.b as f64]
}

/// Per-channel summed-area tables of values and squared values.
struct Integral {
	stride: usize,
	sum: Vec<[f64; 3]>,
	sq: Vec<[f64; 3]>,
}

impl Integral {
	fn new(image: Image) -> Self {
		let (w, h) = (image.width() as usize, image.height() as usize);
		let stride = w + 1;
		let mut sum = vec![[0f64; 3]; stride * (h + 1)];
		let mut sq = vec![[0f64; 3]; stride * (h + 1)];
		for y in 0..h {
			for x in 0..w {
				let c = channels(image.at(x as u32, y as u32));
				let at = (x + 1) + (y + 1) * stride;
				for i in 0..3 {
					sum[at][i] = c[i] + sum[at - 1][i] + sum[at - stride][i] - sum[at - stride - 1][i];
					sq[at][i] = c[i] * c[i] + sq[at - 1][i] + sq[at - stride][i] - sq[at - stride - 1][i];
				}
			}
		}
		Self { stride, sum, sq }
	}

	fn window(&self, x: u32, y: u32, w: u32, h: u32) -> ([f64; 3], [f64; 3]) {
		let (x, y, w, h) = (x as usize, y as usize, w as usize, h as usize);
		let a = x + y * self.stride;
		let b = (x + w) + y * self.stride;
		let c = x + (y + h) * self.stride;
		let d = (x + w) + (y + h) * self.stride;
		let pick = |t: &Vec<[f64; 3]>| -> [f64; 3] { std::array::from_fn(|i| t[d][i] - t[b][i] - t[c][i] + t[a][i]) };
		(pick(&self.sum), pick(&self.sq))
	}
}

/// Templates decoded once per path.
#[derive(Default)]
pub struct TemplateCache {
	templates: Mutex<HashMap<PathBuf, Arc<OwnedImage>>>,
}

impl TemplateCache {
	pub fn get(&self, path: &Path) -> Result<Arc<OwnedImage>> {
		let mut templates = self.templates.lock().unwrap_or_else(PoisonError::into_inner);
		if let Some(tpl) = templates.get(path) {
			return Ok(tpl.clone());
		}
		anyhow::ensure!(path.exists(), "template missing: {}", path.display());
		let tpl = Arc::new(OwnedImage::from_png_file(path)?);
		templates.insert(path.to_owned(), tpl.clone());
		Ok(tpl)
	}

	/// Best match of the template at `path` if it scores at least `threshold`.
	pub fn find(&self, haystack: Image, path: &Path, threshold: f32) -> Result<Option<TemplateMatch>> {
		let tpl = self.get(path)?;
		let found = best_match(haystack, tpl.as_image());
		if let Some(m) = found {
			tracing::trace!(template = %path.display(), score = m.score, "best template score");
		}
		Ok(found.filter(|m| m.score >= threshold))
	}

	/// Drop cached templates so edited files are picked up.
	pub fn clear(&self) {
		self.templates.lock().unwrap_or_else(PoisonError::into_inner).clear();
	}
}
