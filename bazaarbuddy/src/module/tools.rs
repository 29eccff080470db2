use std::time::{Duration, Instant};

use automation::queue::QueueEntry;

use crate::{UiExt, hotkey::HotkeyAction};

const QUEUE_REFRESH: Duration = Duration::from_secs(1);

/// Start/stop controls for the automation services and the buy queue editor.
pub struct Tools {
	uniform: crate::Uniform,

	entries: Vec<QueueEntry>,
	loaded_at: Option<Instant>,

	new_name: String,
	new_amount: u32,
	last_error: Option<String>,
}

impl Tools {
	pub fn new(uniform: crate::Uniform) -> Self {
		Self {
			uniform,
			entries: Vec::new(),
			loaded_at: None,
			new_name: String::new(),
			new_amount: 1,
			last_error: None,
		}
	}

	fn reload_queue(&mut self) {
		self.entries = self.uniform.queue.load();
		self.loaded_at = Some(Instant::now());
	}

	fn toggle(&mut self, action: HotkeyAction) {
		self.last_error = match self.uniform.services.toggle(action) {
			Ok(()) => None,
			Err(err) => {
				let err = format!("{err:#}");
				tracing::warn!(error = %err, ?action, "toggle refused");
				Some(err)
			}
		};
	}

	fn ui_services(&mut self, ui: &mut egui::Ui) {
		let hotkeys = crate::config_read().hotkeys.clone();
		let services = &self.uniform.services;
		let rows = [
			(HotkeyAction::Collect, "Collect filled orders", services.collect.is_running(), hotkeys.collect),
			(HotkeyAction::Buy, "Place buy orders", services.buy.is_running(), hotkeys.buy),
			(HotkeyAction::FastSell, "Fast-sell inventory", services.fastsell.is_running(), hotkeys.fastsell),
			(HotkeyAction::FullAuto, "Full-auto", services.fullauto.is_running(), hotkeys.fullauto),
		];

		let mut clicked = None;
		egui::Grid::new("services").num_columns(3).striped(true).show(ui, |ui| {
			for (action, label, running, key) in rows {
				ui.label(label);
				ui.label(if key.trim().is_empty() { "-".to_owned() } else { key });
				if ui.button(if running { "Stop" } else { "Start" }).clicked() {
					clicked = Some(action);
				}
				ui.end_row();
			}
		});
		if let Some(action) = clicked {
			self.toggle(action);
		}

		if let Some(err) = &self.last_error {
			ui.colored_label(ui.visuals().error_fg_color, err);
		}

		ui.horizontal(|ui| {
			if ui.button("Stop all").clicked() {
				self.uniform.services.stop_all();
			}
			if ui.button("Reload templates").clicked() {
				self.uniform.ie.reload_templates();
				tracing::info!("template cache cleared");
			}
			if !self.uniform.ie.has_ocr() {
				ui.colored_label(ui.visuals().warn_fg_color, "OCR models missing: full-auto cannot start");
			}
		});
	}

	fn ui_queue(&mut self, ui: &mut egui::Ui) {
		ui.horizontal(|ui| {
			ui.label(format!("Buy queue ({} items)", self.entries.len()));
			if ui.small_button("Clear").clicked() {
				if self.uniform.queue.reset() {
					tracing::info!("buy queue cleared");
				}
				self.reload_queue();
			}
		});
		ui.small(self.uniform.queue.path().display().to_string());

		ui.horizontal(|ui| {
			ui.add(egui::TextEdit::singleline(&mut self.new_name).hint_text("Item name"));
			ui.add(egui::DragValue::new(&mut self.new_amount).range(1..=1_000_000));
			let name = self.new_name.trim().to_owned();
			if ui.add_enabled(!name.is_empty(), egui::Button::new("Add")).clicked() {
				if self.uniform.queue.append(&name, self.new_amount) {
					tracing::info!(%name, amount = self.new_amount, "queued for buying");
					self.new_name.clear();
				} else {
					tracing::info!(%name, "already queued");
				}
				self.reload_queue();
			}
		});

		let mut remove = None;
		egui::ScrollArea::vertical().max_height(240.0).show(ui, |ui| {
			egui::Grid::new("queue").num_columns(3).striped(true).show(ui, |ui| {
				for entry in &self.entries {
					ui.label(&entry.name);
					ui.label(format!("x{}", entry.expected_amount));
					if ui.small_button("Remove").clicked() {
						remove = Some(entry.name.clone());
					}
					ui.end_row();
				}
			});
		});
		if let Some(name) = remove {
			if self.uniform.queue.remove(&name) {
				tracing::info!(%name, "removed from queue");
			}
			self.reload_queue();
		}
	}
}

impl super::Module for Tools {
	fn name(&self) -> &'static str {
		"Automation"
	}

	fn ui(&mut self, ui: &mut egui::Ui) {
		self.ui_services(ui);
		ui.separator();
		self.ui_queue(ui);
		// Phases rewrite the queue file while running.
		ui.ctx().request_repaint_after(QUEUE_REFRESH);
	}

	fn ui_settings(&mut self, ui: &mut egui::Ui, config: &mut crate::config::Config) -> bool {
		ui.label("Automation");
		let mut changed = ui
			.num_edit_range(&mut config.fastsell.interval, "Seconds between automation steps", 0.0..=5.0)
			.changed();

		let mut cutoff = config.collect_cutoff_s.is_some();
		ui.horizontal(|ui| {
			if ui.checkbox(&mut cutoff, "Stop full-auto collect after").changed() {
				config.collect_cutoff_s = cutoff.then_some(120.0);
				changed = true;
			}
			if let Some(secs) = config.collect_cutoff_s.as_mut() {
				changed |= ui.add(egui::DragValue::new(secs).range(1.0..=3600.0).suffix(" s")).changed();
			}
		});
		ui.small("The collect cutoff requires restart.");
		changed
	}

	fn tick(&mut self) {
		if self.loaded_at.is_none_or(|at| at.elapsed() >= QUEUE_REFRESH) {
			self.reload_queue();
		}
	}
}
