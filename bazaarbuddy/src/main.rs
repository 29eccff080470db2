//! BazaarBuddy: Bazaar flip finder and in-game order automation.

use std::sync::{LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod capture;
mod config;
mod hotkey;
mod input;
mod logbuf;
mod module;
mod services;
mod ui;
mod util;

use logbuf::LogBuffer;
pub use ui::UiExt;

static CONFIG: LazyLock<RwLock<config::Config>> = LazyLock::new(|| RwLock::new(config::Config::load_or_default()));
static LOG: LazyLock<LogBuffer> = LazyLock::new(LogBuffer::default);

pub fn config() -> RwLockWriteGuard<'static, config::Config> {
	CONFIG.write().unwrap_or_else(PoisonError::into_inner)
}

pub fn config_read() -> RwLockReadGuard<'static, config::Config> {
	CONFIG.read().unwrap_or_else(PoisonError::into_inner)
}

pub fn log_buffer() -> &'static LogBuffer {
	&LOG
}

/// State shared by the UI modules.
pub struct UniformData {
	pub ie: std::sync::Arc<ie::Ie>,
	pub queue: automation::queue::QueueHandle,
	pub services: services::Services,
}

pub type Uniform = std::sync::Arc<UniformData>;

fn init_tracing() {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::registry()
		.with(env_filter)
		.with(fmt::layer().with_target(false))
		.with(fmt::layer().with_target(false).with_ansi(false).with_writer(LOG.clone()))
		.init();
}

fn main() -> anyhow::Result<()> {
	init_tracing();

	let zoom = config_read().ui_zoom_factor;
	let options = eframe::NativeOptions {
		viewport: egui::ViewportBuilder::default()
			.with_title("BazaarBuddy")
			.with_inner_size([960.0 * zoom.max(0.5), 680.0 * zoom.max(0.5)])
			.with_min_inner_size([480.0, 320.0]),
		..Default::default()
	};

	eframe::run_native(
		"BazaarBuddy",
		options,
		Box::new(|cc| Ok(Box::new(ui::BazaarBuddy::new(cc)?))),
	)
	.map_err(|err| anyhow::anyhow!("{err}"))
}
