//! Turn raw bazaar order books into per-item market rows.

use std::collections::{BTreeMap, HashMap};

use crate::schema::{bazaar::Product, items::Items};

/// Order book depth summed into the volume figures.
const VOLUME_DEPTH: usize = 10;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ItemMeta {
	pub name: String,
	pub tier: String,
	pub category: String,
	pub npc_price: f64,
}

impl ItemMeta {
	fn unknown(id: &str) -> Self {
		Self {
			name: id.to_owned(),
			tier: "UNKNOWN".to_owned(),
			category: "Unknown".to_owned(),
			npc_price: 0.0,
		}
	}
}

pub fn item_meta(items: Items) -> HashMap<String, ItemMeta> {
	items
		.items
		.into_iter()
		.filter(|v| !v.id.is_empty())
		.map(|v| {
			let npc_price = v
				.npc_sell_price
				.filter(|p| *p != 0.0)
				.or(v.npc_buy_price)
				.unwrap_or(0.0);
			let meta = ItemMeta {
				name: v.name.unwrap_or_else(|| v.id.clone()),
				tier: v.tier.unwrap_or_else(|| "UNKNOWN".to_owned()),
				category: v.category.unwrap_or_else(|| "Unknown".to_owned()),
				npc_price,
			};
			(v.id, meta)
		})
		.collect()
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MarketRow {
	pub id: String,
	pub name: String,
	/// Insta-buy price (lowest sell offer).
	pub buy_price: f64,
	/// Insta-sell price (highest buy order).
	pub sell_price: f64,
	pub npc_price: f64,
	pub buy_volume: u64,
	pub sell_volume: u64,
	pub hourly_buy: u64,
	pub hourly_sell: u64,
	pub spread: f64,
	pub spread_percent: f64,
	pub npc_unit: f64,
	pub rev_unit: f64,
	pub category: String,
	pub tier: String,
	pub timestamp: u64,
}

fn round2(v: f64) -> f64 {
	(v * 100.0).round() / 100.0
}

pub fn analyze(products: &BTreeMap<String, Product>, meta: &HashMap<String, ItemMeta>, timestamp: u64) -> Vec<MarketRow> {
	let mut rows = Vec::with_capacity(products.len());
	for (id, product) in products {
		let insta_buy = product.sell_summary.first().map_or(0.0, |v| v.price_per_unit);
		let insta_sell = product.buy_summary.first().map_or(0.0, |v| v.price_per_unit);
		if insta_buy <= 0.0 || insta_sell <= 0.0 {
			continue;
		}

		let sell_volume = product.sell_summary.iter().take(VOLUME_DEPTH).map(|v| v.amount).sum::<u64>();
		let buy_volume = product.buy_summary.iter().take(VOLUME_DEPTH).map(|v| v.amount).sum::<u64>();

		let info = meta.get(id).cloned().unwrap_or_else(|| ItemMeta::unknown(id));
		let spread = insta_sell - insta_buy;

		rows.push(MarketRow {
			id: id.clone(),
			name: info.name,
			buy_price: round2(insta_buy),
			sell_price: round2(insta_sell),
			npc_price: round2(info.npc_price),
			buy_volume,
			sell_volume,
			hourly_buy: buy_volume / 24,
			hourly_sell: sell_volume / 24,
			spread: round2(spread),
			spread_percent: round2(spread * 100.0 / insta_buy),
			npc_unit: round2(info.npc_price - insta_buy),
			rev_unit: round2(insta_sell - info.npc_price),
			category: info.category,
			tier: info.tier,
			timestamp,
		});
	}
	rows
}
