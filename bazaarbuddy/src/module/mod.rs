mod market;
pub use market::Market;

mod tools;
pub use tools::Tools;

pub trait Module {
	fn name(&self) -> &'static str;

	fn ui(&mut self, ui: &mut egui::Ui);

	#[allow(unused_variables)]
	fn ui_settings(&mut self, ui: &mut egui::Ui, config: &mut crate::config::Config) -> bool {false}

	fn tick(&mut self) {}
}
