//! Recovering item names from noisy OCR output.

use std::{collections::BTreeMap, sync::LazyLock};

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::queue::QueueEntry;

/// Default minimum similarity (0-100) for accepting a cached name.
pub const DEFAULT_CUTOFF: u8 = 70;

static NON_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^A-Za-z0-9 ]+").expect("regex"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("regex"));

/// Fold accents and keep only ASCII letters, digits and single spaces.
pub fn sanitize(raw: &str) -> String {
	let folded: String = raw.nfkd().filter(char::is_ascii).collect();
	let cleaned = NON_NAME.replace_all(&folded, " ");
	SPACES.replace_all(&cleaned, " ").trim().to_owned()
}

/// Choose between two OCR readings of the same region.
///
/// Agreeing non-empty readings win outright; otherwise the longer one is kept.
pub fn pick_reading(first: &str, second: &str) -> String {
	if !second.is_empty() && first == second {
		return second.to_owned();
	}
	if second.chars().count() > first.chars().count() {
		second.to_owned()
	} else {
		first.to_owned()
	}
}

/// Insert spaces at lower→upper, acronym→word and letter↔digit boundaries.
///
/// `"NetherWart"` → `"Nether Wart"`, `"ABCDef"` → `"ABC Def"`, `"Tier2Ore"` → `"Tier 2 Ore"`.
pub fn split_words(raw: &str) -> String {
	let chars: Vec<char> = raw.trim().chars().collect();
	let mut out = String::with_capacity(chars.len() + 8);
	for (i, &c) in chars.iter().enumerate() {
		if i > 0 {
			let prev = chars[i - 1];
			let next = chars.get(i + 1).copied();
			let boundary = (prev.is_lowercase() && c.is_uppercase())
				|| (prev.is_uppercase() && c.is_uppercase() && next.is_some_and(char::is_lowercase))
				|| (prev.is_alphabetic() && c.is_ascii_digit())
				|| (prev.is_ascii_digit() && c.is_alphabetic());
			if boundary {
				out.push(' ');
			}
		}
		out.push(c);
	}
	SPACES.replace_all(&out, " ").trim().to_owned()
}

/// Lowercased spellings of `raw` tried against the cache, best guess first.
pub fn lookup_variants(raw: &str) -> Vec<String> {
	let base = raw.trim();
	let spaced = split_words(base);
	let mut variants = Vec::with_capacity(4);
	for v in [
		spaced.to_lowercase(),
		base.to_lowercase(),
		spaced.replace(' ', "").to_lowercase(),
		base.replace(' ', "").to_lowercase(),
	] {
		if !v.is_empty() && !variants.contains(&v) {
			variants.push(v);
		}
	}
	variants
}

/// Similarity score in `0..=100` based on the Levenshtein distance.
pub fn similarity(a: &str, b: &str) -> u8 {
	let len = a.chars().count().max(b.chars().count());
	if len == 0 {
		return 100;
	}
	let distance = levenshtein::levenshtein(a, b).min(len);
	((1.0 - distance as f64 / len as f64) * 100.0).round() as u8
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAmount {
	pub amount: u32,
	pub original: String,
}

/// Queue contents remembered across the reset at the start of an interrupt pass.
#[derive(Debug, Clone, Default)]
pub struct NameAmountCache {
	entries: BTreeMap<String, CachedAmount>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
	pub name: String,
	pub amount: u32,
	/// Similarity of the accepted cache hit, `None` when falling back to the raw name.
	pub score: Option<u8>,
}

impl NameAmountCache {
	pub fn from_entries(entries: &[QueueEntry]) -> Self {
		let mut cache = Self::default();
		for entry in entries {
			cache.insert(&entry.name, entry.expected_amount);
		}
		cache
	}

	pub fn insert(&mut self, original: &str, amount: u32) {
		let original = original.trim();
		if original.is_empty() {
			return;
		}
		let value = CachedAmount {
			amount: amount.max(1),
			original: original.to_owned(),
		};
		let key = original.to_lowercase();
		self.entries.insert(key.replace(' ', ""), value.clone());
		self.entries.insert(key, value);
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn get(&self, key: &str) -> Option<&CachedAmount> {
		self.entries.get(key)
	}

	/// Best `(key, score)` over every lookup variant of `raw`.
	pub fn best_match(&self, raw: &str) -> Option<(&str, u8)> {
		let mut best: Option<(&str, u8)> = None;
		for attempt in lookup_variants(raw) {
			for key in self.entries.keys() {
				let score = similarity(&attempt, key);
				if best.is_none_or(|(_, s)| score > s) {
					best = Some((key.as_str(), score));
				}
			}
		}
		best
	}

	/// Map an OCR'd name to the remembered name and amount, or fall back to `(raw, 1)`.
	pub fn resolve(&self, raw: &str, cutoff: u8) -> Resolution {
		if let Some((key, score)) = self.best_match(raw)
			&& score >= cutoff
			&& let Some(hit) = self.entries.get(key)
		{
			tracing::info!(raw, name = %hit.original, score, "fuzzy match");
			return Resolution {
				name: hit.original.clone(),
				amount: hit.amount,
				score: Some(score),
			};
		}

		Resolution {
			name: raw.trim().to_owned(),
			amount: 1,
			score: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sanitize_folds_accents_and_strips_punctuation() {
		assert_eq!(sanitize("  Énchanted   Nether-Wart! "), "Enchanted Nether Wart");
		assert_eq!(sanitize("Ça\tva\n2"), "Ca va 2");
		assert_eq!(sanitize("§§§"), "");
	}

	#[test]
	fn identical_readings_are_trusted() {
		assert_eq!(pick_reading("Sand", "Sand"), "Sand");
		assert_eq!(pick_reading("Enchanted Sand", "Enchanted Sand"), "Enchanted Sand");
	}

	#[test]
	fn differing_readings_keep_the_longer() {
		assert_eq!(pick_reading("Nether Wa", "Nether Wart"), "Nether Wart");
		assert_eq!(pick_reading("Feather", ""), "Feather");
		assert_eq!(pick_reading("", ""), "");
	}

	#[test]
	fn split_words_boundaries() {
		assert_eq!(split_words("NetherWart"), "Nether Wart");
		assert_eq!(split_words("ABCDef"), "ABC Def");
		assert_eq!(split_words("Tier2Ore"), "Tier 2 Ore");
		assert_eq!(split_words("sand"), "sand");
	}

	#[test]
	fn variants_are_lowercase_and_unique() {
		assert_eq!(
			lookup_variants("NetherWart"),
			vec!["nether wart".to_string(), "netherwart".to_string()]
		);
	}

	#[test]
	fn similarity_bounds() {
		assert_eq!(similarity("sand", "sand"), 100);
		assert_eq!(similarity("", ""), 100);
		assert_eq!(similarity("abcd", "wxyz"), 0);
		assert_eq!(similarity("feather", "feathr"), 86);
	}

	#[test]
	fn camel_case_ocr_recovers_cached_name_and_amount() {
		let cache = NameAmountCache::from_entries(&[QueueEntry::new("Nether Wart", 64)]);
		assert!(cache.get("nether wart").is_some());
		assert!(cache.get("netherwart").is_some());

		let resolved = cache.resolve("NetherWart", DEFAULT_CUTOFF);
		assert_eq!(resolved.name, "Nether Wart");
		assert_eq!(resolved.amount, 64);
		assert!(resolved.score.unwrap() >= DEFAULT_CUTOFF);
	}

	#[test]
	fn noisy_reading_still_matches() {
		let cache = NameAmountCache::from_entries(&[
			QueueEntry::new("Prismarine Shard", 20),
			QueueEntry::new("Sand", 100),
		]);
		let resolved = cache.resolve("Prismarlne Shard", DEFAULT_CUTOFF);
		assert_eq!(resolved.name, "Prismarine Shard");
		assert_eq!(resolved.amount, 20);
	}

	#[test]
	fn miss_falls_back_to_raw_name_and_one() {
		let cache = NameAmountCache::from_entries(&[QueueEntry::new("Sand", 100)]);
		let resolved = cache.resolve("Enchanted Diamond", DEFAULT_CUTOFF);
		assert_eq!(
			resolved,
			Resolution {
				name: "Enchanted Diamond".into(),
				amount: 1,
				score: None
			}
		);

		let empty = NameAmountCache::default();
		assert_eq!(empty.resolve("Sand", DEFAULT_CUTOFF).amount, 1);
	}
}
