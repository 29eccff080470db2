//! Flip opportunities derived from market rows, filtered and ranked.

use crate::MarketRow;

/// Maximum number of cards produced for a single mode.
pub const MAX_CARDS: usize = 400;
/// Maximum number of sort keys kept in a [`SortOrder`].
pub const MAX_SORT_KEYS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FlipMode {
	/// Insta-buy, then sell order (bazaar spread).
	Bazaar,
	/// Insta-buy, then sell to an NPC.
	Npc,
	/// Buy from an NPC, then insta-sell.
	Reverse,
}

impl FlipMode {
	pub const ALL: [Self; 3] = [Self::Bazaar, Self::Npc, Self::Reverse];

	pub fn label(self) -> &'static str {
		match self {
			Self::Bazaar => "Bazaar Flips",
			Self::Npc => "NPC Flips",
			Self::Reverse => "Reverse Flips",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlipCard {
	pub row: MarketRow,
	pub mode: FlipMode,
	pub unit: f64,
	pub coins_per_hour: f64,
	pub percent: f64,
	pub power: f64,
}

impl FlipCard {
	fn new(row: &MarketRow, mode: FlipMode) -> Option<Self> {
		let hourly = row.hourly_sell.min(row.hourly_buy) as f64;
		let (unit, percent) = match mode {
			FlipMode::Bazaar => {
				let unit = row.sell_price - row.buy_price;
				(unit, unit * 100.0 / row.buy_price)
			}
			FlipMode::Npc => {
				let unit = row.npc_price - row.buy_price;
				if row.npc_price <= 0.0 || unit <= 0.0 {
					return None;
				}
				(unit, unit * 100.0 / row.buy_price)
			}
			FlipMode::Reverse => {
				let unit = row.sell_price - row.npc_price;
				if row.npc_price <= 0.0 || unit <= 0.0 {
					return None;
				}
				(unit, unit * 100.0 / row.npc_price)
			}
		};

		let coins_per_hour = unit * hourly;
		// Bazaar cards are weighted by the row's rounded spread.
		let weight = match mode {
			FlipMode::Bazaar => row.spread_percent,
			FlipMode::Npc | FlipMode::Reverse => percent,
		};
		Some(Self {
			row: row.clone(),
			mode,
			unit,
			coins_per_hour,
			percent,
			power: coins_per_hour * weight.max(1.0),
		})
	}

	fn key(&self, key: SortKey) -> f64 {
		match key {
			SortKey::Power => self.power,
			SortKey::Unit => self.unit,
			SortKey::CoinsPerHour => self.coins_per_hour,
			SortKey::HourlySell => self.row.hourly_sell as f64,
			SortKey::HourlyBuy => self.row.hourly_buy as f64,
		}
	}
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FlipFilter {
	/// Minimum 24h volume on both sides.
	pub min_volume: u64,
	pub min_percent: f64,
	/// Case-insensitive substring of the item name.
	pub search: String,
}

impl Default for FlipFilter {
	fn default() -> Self {
		Self {
			min_volume: 500,
			min_percent: 0.0,
			search: String::new(),
		}
	}
}

impl FlipFilter {
	fn accepts_row(&self, row: &MarketRow, search: &str) -> bool {
		row.buy_price > 0.0
			&& row.sell_price > 0.0
			&& row.sell_volume >= self.min_volume
			&& row.buy_volume >= self.min_volume
			&& (search.is_empty() || row.name.to_lowercase().contains(search))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SortKey {
	Power,
	Unit,
	CoinsPerHour,
	HourlySell,
	HourlyBuy,
}

impl SortKey {
	pub const ALL: [Self; 5] = [Self::Power, Self::Unit, Self::CoinsPerHour, Self::HourlySell, Self::HourlyBuy];

	pub fn label(self) -> &'static str {
		match self {
			Self::Power => "Power",
			Self::Unit => "Unit profit",
			Self::CoinsPerHour => "Coins/h",
			Self::HourlySell => "Insta-sell/h",
			Self::HourlyBuy => "Insta-buy/h",
		}
	}
}

/// Sort keys, most recently pushed first. Empty means by power.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SortOrder(Vec<SortKey>);

impl SortOrder {
	pub fn push(&mut self, key: SortKey) {
		self.0.retain(|k| *k != key);
		self.0.insert(0, key);
		self.0.truncate(MAX_SORT_KEYS);
	}

	pub fn clear(&mut self) {
		self.0.clear();
	}

	pub fn keys(&self) -> &[SortKey] {
		if self.0.is_empty() {
			&[SortKey::Power]
		} else {
			&self.0
		}
	}
}

/// Build, filter and rank the cards of one mode.
pub fn cards(rows: &[MarketRow], mode: FlipMode, filter: &FlipFilter, order: &SortOrder) -> Vec<FlipCard> {
	let search = filter.search.trim().to_lowercase();
	let mut cards = rows
		.iter()
		.filter(|row| filter.accepts_row(row, &search))
		.filter_map(|row| FlipCard::new(row, mode))
		.filter(|card| card.percent >= filter.min_percent)
		.collect::<Vec<_>>();

	let keys = order.keys();
	cards.sort_by(|a, b| {
		keys.iter()
			.map(|k| b.key(*k).total_cmp(&a.key(*k)))
			.find(|o| o.is_ne())
			.unwrap_or(std::cmp::Ordering::Equal)
	});
	cards.truncate(MAX_CARDS);
	cards
}
