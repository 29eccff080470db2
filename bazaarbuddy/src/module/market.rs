use std::{
	sync::mpsc::{Receiver, TryRecvError},
	time::{Duration, Instant},
};

use anyhow::Result;
use data::{
	Snapshot,
	flips::{self, FlipCard, FlipMode, SortKey},
};

use crate::UiExt;

const COLUMNS: usize = 4;

pub struct Market {
	uniform: crate::Uniform,

	snapshot: Option<Snapshot>,
	pending: Option<Receiver<Result<Snapshot>>>,
	last_error: Option<String>,
	fetched_at: Option<Instant>,

	mode: FlipMode,
	cards: Vec<FlipCard>,
	dirty: bool,
}

impl Market {
	pub fn new(uniform: crate::Uniform) -> Self {
		Self {
			uniform,
			snapshot: None,
			pending: None,
			last_error: None,
			fetched_at: None,
			mode: FlipMode::Bazaar,
			cards: Vec::new(),
			dirty: true,
		}
	}

	fn refresh(&mut self, ctx: &egui::Context) {
		if self.pending.is_some() {
			return;
		}
		let (tx, rx) = std::sync::mpsc::channel();
		let ctx = ctx.clone();
		let spawned = std::thread::Builder::new()
			.name("bazaar-scan".into())
			.spawn(move || {
				let cache = Snapshot::default_cache_path();
				let _ = tx.send(Snapshot::try_fetch(cache.as_deref()));
				ctx.request_repaint();
			});
		match spawned {
			Ok(_) => {
				tracing::info!("fetching bazaar data");
				self.pending = Some(rx);
			}
			Err(err) => tracing::warn!(error = %err, "failed to spawn bazaar scan"),
		}
	}

	fn receive(&mut self) {
		let Some(rx) = &self.pending else { return };
		let result = match rx.try_recv() {
			Ok(result) => result,
			Err(TryRecvError::Empty) => return,
			Err(TryRecvError::Disconnected) => Err(anyhow::anyhow!("bazaar scan thread exited")),
		};
		self.pending = None;
		self.fetched_at = Some(Instant::now());

		match result {
			Ok(snapshot) => {
				tracing::info!(products = snapshot.rows.len(), cached = snapshot.cached, "bazaar data updated");
				self.last_error = None;
				self.snapshot = Some(snapshot);
				self.dirty = true;
			}
			Err(err) => {
				let err = format!("{err:#}");
				tracing::warn!(error = %err, "bazaar scan failed");
				self.last_error = Some(err);
			}
		}
	}

	fn rebuild(&mut self) {
		if !self.dirty {
			return;
		}
		self.dirty = false;
		let Some(snapshot) = &self.snapshot else {
			self.cards.clear();
			return;
		};
		let config = crate::config_read();
		self.cards = flips::cards(
			&snapshot.rows,
			self.mode,
			&config.market.filter,
			&config.market.sort(self.mode),
		);
	}

	fn ui_toolbar(&mut self, ui: &mut egui::Ui) {
		ui.horizontal(|ui| {
			let busy = self.pending.is_some();
			if ui.add_enabled(!busy, egui::Button::new("Refresh")).clicked() {
				self.refresh(ui.ctx());
			}
			if busy {
				ui.spinner();
			}
			if let Some(snapshot) = &self.snapshot {
				let mut text = format!("{} products", snapshot.rows.len());
				if snapshot.cached {
					text.push_str(" (cached)");
				}
				if let Some(at) = self.fetched_at {
					text.push_str(&format!(", {}s ago", at.elapsed().as_secs()));
				}
				ui.label(text);
			}
		});
		if let Some(err) = &self.last_error {
			ui.colored_label(ui.visuals().error_fg_color, err);
		}

		ui.horizontal(|ui| {
			for mode in FlipMode::ALL {
				if ui.selectable_value(&mut self.mode, mode, mode.label()).changed() {
					self.dirty = true;
				}
			}
		});

		let mut config = crate::config();
		let mut changed = false;
		ui.horizontal(|ui| {
			ui.label("Search");
			changed |= ui.text_edit_singleline(&mut config.market.filter.search).changed();
		});
		ui.horizontal(|ui| {
			changed |= ui
				.num_edit_range(&mut config.market.filter.min_volume, "Min volume", 0..=10_000_000)
				.changed();
			changed |= ui
				.num_edit_range(&mut config.market.filter.min_percent, "Min %", 0.0..=10_000.0)
				.changed();
		});

		ui.horizontal(|ui| {
			ui.label("Sort");
			let order = config.market.sort_mut(self.mode);
			for key in SortKey::ALL {
				if ui.button(key.label()).clicked() {
					order.push(key);
					changed = true;
					tracing::info!(mode = self.mode.label(), order = %describe(order.keys()), "sort order");
				}
			}
			if ui.button("Reset").clicked() {
				order.clear();
				changed = true;
			}
			ui.label(describe(order.keys()));
		});

		if changed {
			self.dirty = true;
			if let Err(err) = config.save() {
				tracing::warn!(error = %format!("{err:#}"), "failed to save config");
			}
		}
	}

	fn ui_card(&self, ui: &mut egui::Ui, card: &FlipCard) {
		ui.group(|ui| {
			ui.set_width(ui.available_width());
			let title = ui.add(egui::Label::new(egui::RichText::new(&card.row.name).strong()).sense(egui::Sense::click()));
			if title.clicked() {
				ui.ctx().copy_text(card.row.name.clone());
				tracing::info!(
					name = %card.row.name,
					mode = card.mode.label(),
					power = %fmt_int(card.power),
					"selected"
				);
			}
			ui.small(format!("{} · {}", card.row.category, card.row.tier));

			ui.label(format!("Power: {}", fmt_int(card.power)));
			ui.label(format!("Coins/h: {}", fmt_int(card.coins_per_hour)));
			ui.label(format!("Unit profit: {} ({:.1}%)", fmt_int(card.unit), card.percent));
			ui.label(format!(
				"Hourly insta-sell/buy: {} / {}",
				fmt_int(card.row.hourly_sell as f64),
				fmt_int(card.row.hourly_buy as f64)
			));
			if card.mode != FlipMode::Bazaar {
				ui.label(format!("NPC: {}", fmt_int(card.row.npc_price)));
			}
			ui.label(format!(
				"Buy/Sell: {} / {}",
				fmt_int(card.row.buy_price),
				fmt_int(card.row.sell_price)
			));

			if ui.small_button("Queue").clicked() {
				let amount = crate::config_read().queue_amount();
				if self.uniform.queue.append(&card.row.name, amount) {
					tracing::info!(name = %card.row.name, amount, "queued for buying");
				} else {
					tracing::info!(name = %card.row.name, "already queued");
				}
			}
		});
	}
}

fn describe(keys: &[SortKey]) -> String {
	keys.iter().map(|k| k.label()).collect::<Vec<_>>().join(" > ")
}

/// Round to an integer and group thousands.
fn fmt_int(value: f64) -> String {
	let n = value.round() as i64;
	let digits = n.unsigned_abs().to_string();
	let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
	if n < 0 {
		out.push('-');
	}
	for (i, c) in digits.chars().enumerate() {
		if i > 0 && (digits.len() - i) % 3 == 0 {
			out.push(',');
		}
		out.push(c);
	}
	out
}

impl super::Module for Market {
	fn name(&self) -> &'static str {
		"Market"
	}

	fn ui(&mut self, ui: &mut egui::Ui) {
		if self.snapshot.is_none() && self.pending.is_none() && self.last_error.is_none() {
			self.refresh(ui.ctx());
		}
		let every = crate::config_read().market.auto_refresh_s;
		if every > 0
			&& let Some(at) = self.fetched_at
		{
			let every = Duration::from_secs(every);
			match every.checked_sub(at.elapsed()) {
				Some(left) => ui.ctx().request_repaint_after(left),
				None => self.refresh(ui.ctx()),
			}
		}

		self.ui_toolbar(ui);
		self.rebuild();
		ui.separator();

		if self.cards.is_empty() {
			ui.label(if self.snapshot.is_some() { "No items match the filters." } else { "Loading…" });
			return;
		}

		egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
			for row in self.cards.chunks(COLUMNS) {
				ui.columns(COLUMNS, |cols| {
					for (col, card) in cols.iter_mut().zip(row) {
						self.ui_card(col, card);
					}
				});
			}
		});
	}

	fn ui_settings(&mut self, ui: &mut egui::Ui, config: &mut crate::config::Config) -> bool {
		ui.label("Market");
		let mut changed = ui
			.num_edit_range(&mut config.market.queue_amount, "Amount queued from a card (0 = 1)", 0..=1_000_000)
			.changed();
		changed |= ui
			.num_edit_range(&mut config.market.auto_refresh_s, "Auto-refresh every N seconds (0 = off)", 0..=3600)
			.changed();
		changed
	}

	fn tick(&mut self) {
		self.receive();
	}
}
