use std::path::PathBuf;

use crate::ui::ext::UiExt;

fn path_edit(ui: &mut egui::Ui, path: &mut PathBuf, label: &str) -> bool {
	let mut text = path.display().to_string();
	let changed = ui
		.horizontal(|ui| {
			let changed = ui.text_edit_singleline(&mut text).changed();
			ui.label(label);
			changed
		})
		.inner;
	if changed {
		*path = PathBuf::from(text.trim());
	}
	changed
}

pub fn ui(ui: &mut egui::Ui, modules: &mut [Box<dyn crate::module::Module>]) {
	let mut config = crate::config();
	let mut changed = false;

	ui.label("Files");
	changed |= path_edit(ui, &mut config.data_dir, "Data folder (queue, coordinates, templates). Requires restart");

	let mut debug_enabled = config.ocr_debug_dir.is_some();
	if ui.checkbox(&mut debug_enabled, "Save OCR debug crops. Requires restart").changed() {
		config.ocr_debug_dir = debug_enabled.then(|| config.data_dir.join("ocr_debug"));
		changed = true;
	}
	if let Some(dir) = config.ocr_debug_dir.as_mut() {
		changed |= path_edit(ui, dir, "OCR debug folder");
	}

	ui.spacer();
	ui.label("Template matching (requires restart)");
	changed |= ui
		.num_edit_range(&mut config.collect_threshold, "Collect match threshold", 0.1..=1.0)
		.changed();
	changed |= ui
		.num_edit_range(&mut config.orange_threshold, "Outbid marker threshold", 0.1..=1.0)
		.changed();

	ui.spacer();
	ui.label("Hotkeys");
	changed |= ui.key_edit(&mut config.hotkeys.collect, "Collect");
	changed |= ui.key_edit(&mut config.hotkeys.buy, "Buy");
	changed |= ui.key_edit(&mut config.hotkeys.fullauto, "Full-auto");
	changed |= ui.key_edit(&mut config.hotkeys.fastsell, "Fast-sell");
	changed |= ui
		.checkbox(&mut config.fullauto_mode, "Full-auto mode (only the full-auto hotkey is active)")
		.changed();

	ui.spacer();
	changed |= ui
		.num_edit_range(&mut config.ui_zoom_factor, "UI zoom", 0.5..=3.0)
		.changed();

	for module in modules {
		ui.spacer();
		changed |= module.ui_settings(ui, &mut config);
	}

	if changed && let Err(err) = config.save() {
		tracing::warn!(error = %format!("{err:#}"), "failed to save config");
	}
}
