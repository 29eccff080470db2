use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use automation::queue::{ItemQueueStore, QueueHandle};

mod ext;
pub use ext::UiExt;

mod settings;

use crate::{
	config::Hotkeys,
	hotkey::{self, HotkeyListener},
	services::Services,
};

pub struct BazaarBuddy {
	uniform: crate::Uniform,
	modules: Vec<Box<dyn crate::module::Module>>,

	tab: Tab,

	hotkeys: Option<HotkeyListener>,
	/// Bindings the current listener was spawned with.
	bound: Option<(Hotkeys, bool)>,
}

fn load_ie(ocr_debug_dir: Option<std::path::PathBuf>) -> ie::Ie {
	let ocr = crate::util::assets::resolve_ocr_assets()
		.and_then(|assets| ie::Ocr::try_new(&assets.detection, &assets.recognition, &assets.charset))
		.inspect_err(|err| {
			tracing::warn!(error = %format!("{err:#}"), "OCR disabled; the outbid pass needs it");
		})
		.ok();
	ie::Ie::new(ocr, ocr_debug_dir.map(ie::DebugSink::new))
}

impl BazaarBuddy {
	pub fn new(cc: &eframe::CreationContext<'_>) -> Result<Self> {
		let config = crate::config_read().clone();

		cc.egui_ctx.set_zoom_factor(config.ui_zoom_factor);

		let ie = Arc::new(load_ie(config.ocr_debug_dir.clone()));
		let queue = QueueHandle::spawn(ItemQueueStore::new(config.queue_path())).context("start queue")?;
		let services = Services::new(&config, ie.clone(), crate::input::system(), queue.clone());

		let uniform = Arc::new(crate::UniformData { ie, queue, services });

		let modules: Vec<Box<dyn crate::module::Module>> = vec![
			Box::new(crate::module::Market::new(uniform.clone())),
			Box::new(crate::module::Tools::new(uniform.clone())),
		];

		tracing::info!(data_dir = %config.data_dir.display(), "BazaarBuddy started");

		Ok(Self {
			uniform,
			modules,
			tab: Tab::Module(0),
			hotkeys: None,
			bound: None,
		})
	}

	/// (Re)register global hotkeys when their settings changed.
	fn sync_hotkeys(&mut self, ctx: &egui::Context) {
		let wanted = {
			let config = crate::config_read();
			(config.hotkeys.clone(), config.fullauto_mode)
		};
		if self.bound.as_ref() == Some(&wanted) {
			return;
		}

		// Unregister before registering the same keys again.
		self.hotkeys = None;
		let bindings = hotkey::bindings(&wanted.0, wanted.1);
		self.hotkeys = match HotkeyListener::spawn(bindings, ctx.clone()) {
			Ok(listener) => Some(listener),
			Err(err) => {
				tracing::warn!(error = %format!("{err:#}"), "global hotkeys unavailable");
				None
			}
		};
		self.bound = Some(wanted);
	}

	fn handle_hotkeys(&mut self) {
		let Some(listener) = &self.hotkeys else { return };
		for action in listener.poll() {
			tracing::debug!(?action, "hotkey");
			if let Err(err) = self.uniform.services.toggle(action) {
				tracing::warn!(error = %format!("{err:#}"), ?action, "hotkey ignored");
			}
		}
	}

	fn ui_status(&self, ui: &mut egui::Ui) {
		ui.horizontal(|ui| {
			for (name, running) in self.uniform.services.status() {
				let text = egui::RichText::new(name);
				if running {
					ui.label(text.strong().color(ui.visuals().warn_fg_color));
				} else {
					ui.label(text.weak());
				}
			}
		});
	}
}

fn ui_log(ui: &mut egui::Ui) {
	let log = crate::log_buffer();
	if ui.button("Clear").clicked() {
		log.clear();
	}
	ui.separator();
	egui::ScrollArea::vertical()
		.auto_shrink([false, false])
		.stick_to_bottom(true)
		.show(ui, |ui| {
			for line in log.lines() {
				ui.monospace(line);
			}
		});
}

impl eframe::App for BazaarBuddy {
	fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
		self.sync_hotkeys(ctx);
		self.handle_hotkeys();

		let zoom = crate::config_read().ui_zoom_factor;
		if (ctx.zoom_factor() - zoom).abs() > f32::EPSILON {
			ctx.set_zoom_factor(zoom);
		}

		egui::TopBottomPanel::top("tabs").show(ctx, |ui| {
			ui.horizontal(|ui| {
				for (i, module) in self.modules.iter().enumerate() {
					ui.selectable_value(&mut self.tab, Tab::Module(i), module.name());
				}
				ui.selectable_value(&mut self.tab, Tab::Settings, "Settings");
				ui.selectable_value(&mut self.tab, Tab::Log, "Log");
			});
		});

		egui::TopBottomPanel::bottom("status").show(ctx, |ui| self.ui_status(ui));

		egui::CentralPanel::default().show(ctx, |ui| match self.tab {
			Tab::Module(i) => {
				if let Some(module) = self.modules.get_mut(i) {
					module.ui(ui);
				}
			}
			Tab::Settings => {
				egui::ScrollArea::vertical().show(ui, |ui| settings::ui(ui, &mut self.modules));
			}
			Tab::Log => ui_log(ui),
		});

		for module in &mut self.modules {
			module.tick();
		}

		// Keep the status strip and log panel current while workers run.
		if self.uniform.services.status().iter().any(|(_, running)| *running) || self.tab == Tab::Log {
			ctx.request_repaint_after(Duration::from_millis(250));
		}
	}
}

impl Drop for BazaarBuddy {
	fn drop(&mut self) {
		self.uniform.services.stop_all();
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tab {
	Module(usize),
	Settings,
	Log,
}
