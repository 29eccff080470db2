pub const URL: &str = "https://api.hypixel.net/resources/skyblock/items";

#[derive(serde::Deserialize)]
pub struct Items {
	#[serde(default)]
	pub items: Vec<Item>,
}

#[derive(serde::Deserialize)]
pub struct Item {
	#[serde(default)]
	pub id: String,
	pub name: Option<String>,
	pub tier: Option<String>,
	pub category: Option<String>,
	pub npc_sell_price: Option<f64>,
	pub npc_buy_price: Option<f64>,
}
