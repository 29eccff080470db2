//! Per-item overrides for the two variant clicks of the buy script.
//!
//! Some items show their order buttons at a different position; the table
//! maps an item name to the target ids to use instead of the base `a`/`b`.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::{Point, queue::queue_key};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
	A,
	B,
}

impl Group {
	pub fn base_id(self) -> &'static str {
		match self {
			Group::A => "a",
			Group::B => "b",
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub a: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub b: Option<String>,
}

impl Variant {
	pub fn new(a: Option<&str>, b: Option<&str>) -> Self {
		Self {
			a: a.map(str::to_owned),
			b: b.map(str::to_owned),
		}
	}

	fn get(&self, group: Group) -> Option<&str> {
		match group {
			Group::A => self.a.as_deref(),
			Group::B => self.b.as_deref(),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantTable {
	overrides: HashMap<String, Variant>,
}

impl VariantTable {
	pub fn new<I, S>(overrides: I) -> Self
	where
		I: IntoIterator<Item = (S, Variant)>,
		S: AsRef<str>,
	{
		Self {
			overrides: overrides
				.into_iter()
				.map(|(name, v)| (queue_key(name.as_ref()), v))
				.collect(),
		}
	}

	/// The overrides the bazaar layout shipped with.
	pub fn builtin() -> Self {
		Self::new([
			("Emerald", Variant::new(Some("a2"), None)),
			("Nether Wart", Variant::new(Some("a1"), Some("b2"))),
			("Snow Block", Variant::new(None, Some("b1"))),
			("Plasma", Variant::new(Some("a1"), None)),
			("Feather", Variant::new(Some("a1"), Some("b2"))),
			("Cocoa Beans", Variant::new(Some("a1"), None)),
			("Prismarine Shard", Variant::new(Some("a1"), Some("b1"))),
			("Jungle Log", Variant::new(Some("a1"), Some("b1"))),
			("Blaze Ashes", Variant::new(Some("a2"), None)),
			("Iron Ingot", Variant::new(None, Some("b1"))),
			("Sand", Variant::new(None, Some("b4"))),
			("Lily Pad", Variant::new(None, Some("b1"))),
		])
	}

	pub fn insert(&mut self, name: &str, variant: Variant) {
		self.overrides.insert(queue_key(name), variant);
	}

	pub fn get(&self, name: &str) -> Option<&Variant> {
		self.overrides.get(&queue_key(name))
	}

	pub fn len(&self) -> usize {
		self.overrides.len()
	}

	pub fn is_empty(&self) -> bool {
		self.overrides.is_empty()
	}

	/// Target id for `group` (`"a"`, `"b2"`, ...).
	pub fn target_id<'a>(&'a self, name: &str, group: Group) -> &'a str {
		self.get(name)
			.and_then(|v| v.get(group))
			.unwrap_or(group.base_id())
	}
}

/// Screen position of every variant target id.
pub fn builtin_targets() -> BTreeMap<String, Point> {
	[
		("a", Point::new(952, 427)),
		("a1", Point::new(940, 472)),
		("a2", Point::new(950, 512)),
		("b", Point::new(886, 392)),
		("b1", Point::new(926, 391)),
		("b2", Point::new(957, 391)),
		("b3", Point::new(997, 391)),
		("b4", Point::new(1027, 391)),
	]
	.into_iter()
	.map(|(k, v)| (k.to_owned(), v))
	.collect()
}

/// Resolve the click position for `name`'s `group` target.
pub fn resolve(table: &VariantTable, targets: &BTreeMap<String, Point>, name: &str, group: Group) -> Result<Point> {
	let id = table.target_id(name, group);
	match targets.get(id) {
		Some(p) => Ok(*p),
		None => bail!("unknown variant target {id:?} for {name:?}"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lookups_are_case_and_space_insensitive() {
		let table = VariantTable::builtin();
		assert_eq!(table.target_id("  NETHER wart ", Group::A), "a1");
		assert_eq!(table.target_id("Nether Wart", Group::B), "b2");
		assert_eq!(table.target_id("Snow Block", Group::A), "a");
		assert_eq!(table.target_id("Cobblestone", Group::B), "b");
	}

	#[test]
	fn resolves_against_targets() {
		let table = VariantTable::builtin();
		let targets = builtin_targets();
		assert_eq!(resolve(&table, &targets, "Emerald", Group::A).unwrap(), Point::new(950, 512));
		assert_eq!(resolve(&table, &targets, "Sand", Group::B).unwrap(), Point::new(1027, 391));
		assert_eq!(resolve(&table, &targets, "Sand", Group::A).unwrap(), Point::new(952, 427));
	}

	#[test]
	fn unknown_target_is_an_error() {
		let table = VariantTable::new([("Weird", Variant::new(Some("a9"), None))]);
		assert!(resolve(&table, &builtin_targets(), "weird", Group::A).is_err());
	}
}
