use std::collections::BTreeMap;

pub const URL: &str = "https://api.hypixel.net/v2/skyblock/bazaar";

#[derive(Debug, serde::Deserialize)]
pub struct Bazaar {
	pub success: bool,
	#[serde(default)]
	pub products: BTreeMap<String, Product>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct Product {
	/// Buy orders: what an insta-sell receives.
	#[serde(default)]
	pub buy_summary: Vec<Summary>,
	/// Sell offers: what an insta-buy pays.
	#[serde(default)]
	pub sell_summary: Vec<Summary>,
}

#[derive(Debug, Clone, Copy, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
	#[serde(default)]
	pub amount: u64,
	#[serde(default)]
	pub price_per_unit: f64,
	// pub orders: u32,
}
