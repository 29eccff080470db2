use std::ops::RangeInclusive;

pub trait UiExt {
	fn spacer(&mut self);

	fn num_edit_range<T: egui::emath::Numeric>(&mut self, value: &mut T, label: &str, range: RangeInclusive<T>) -> egui::Response;

	/// A text field for a key name; flags names the hotkey parser rejects.
	fn key_edit(&mut self, value: &mut String, label: &str) -> bool;
}

impl UiExt for egui::Ui {
	fn spacer(&mut self) {
		self.add_space(12.0);
	}

	fn num_edit_range<T: egui::emath::Numeric>(&mut self, value: &mut T, label: &str, range: RangeInclusive<T>) -> egui::Response {
		self.horizontal(|ui| {
			let resp = ui.add(egui::DragValue::new(value).range(range).speed(0.05));
			ui.label(label);
			resp
		})
		.inner
	}

	fn key_edit(&mut self, value: &mut String, label: &str) -> bool {
		self.horizontal(|ui| {
			let changed = ui
				.add(egui::TextEdit::singleline(value).desired_width(80.0))
				.changed();
			ui.label(label);
			if !value.trim().is_empty() && crate::hotkey::vk_code(value).is_none() {
				ui.colored_label(ui.visuals().warn_fg_color, "unknown key");
			}
			changed
		})
		.inner
	}
}
