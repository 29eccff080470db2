//! Builds the automation services from the configuration and the capture/input backends.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Result, bail};
use automation::{
	InputInjector, ScreenProbe,
	buy::{BuyJob, BuyLayout, BuyPhaseRunner, ScreenBuyScript},
	collect::{CollectJob, CollectLayout, CollectPhaseRunner},
	fastsell::{FastSellJob, FastSellSweep},
	fullauto::{FullAutoJob, ServicePhases},
	orange::{OrangeInterruptDetector, OrangeLayout},
	queue::QueueHandle,
	service::Service,
	settings::{AUTOMATION_FALLBACK_INTERVAL, FASTCLICK_FALLBACK_INTERVAL, IntervalSource},
};

use crate::{capture::XcapProbe, config::Config, hotkey::HotkeyAction};

/// Everything a job needs that is shared between services.
struct Backends {
	probe: Arc<dyn ScreenProbe>,
	text_probe: Arc<dyn ScreenProbe>,
	input: Arc<dyn InputInjector>,
	queue: QueueHandle,
	config_path: Option<PathBuf>,
	coords: PathBuf,
	templates: PathBuf,
	collect_threshold: f32,
	orange_threshold: f32,
}

impl Backends {
	fn interval(&self, fallback: f32) -> IntervalSource {
		match &self.config_path {
			Some(path) => IntervalSource::file(path, fallback),
			None => IntervalSource::fixed(fallback),
		}
	}

	fn sweep(&self, fallback: f32) -> FastSellSweep {
		FastSellSweep::new(self.input.clone(), self.interval(fallback))
	}

	fn buy_job(&self) -> BuyJob {
		let script = ScreenBuyScript::new(self.input.clone(), BuyLayout::default());
		BuyJob {
			queue: self.queue.clone(),
			runner: BuyPhaseRunner::new(Arc::new(script), self.interval(AUTOMATION_FALLBACK_INTERVAL)),
		}
	}

	fn collect_job(&self) -> CollectJob {
		let mut layout = CollectLayout::with_template_dir(&self.templates);
		layout.threshold = self.collect_threshold;
		CollectJob {
			runner: CollectPhaseRunner::new(
				self.probe.clone(),
				self.input.clone(),
				layout,
				self.sweep(AUTOMATION_FALLBACK_INTERVAL),
				self.coords.clone(),
			),
		}
	}

	fn orange(&self) -> OrangeInterruptDetector {
		let mut layout = OrangeLayout::with_template_dir(&self.templates);
		layout.threshold = self.orange_threshold;
		OrangeInterruptDetector::new(self.text_probe.clone(), self.input.clone(), self.queue.clone(), layout)
	}
}

pub struct Services {
	pub buy: Service<BuyJob>,
	pub collect: Service<CollectJob>,
	pub fastsell: Service<FastSellJob>,
	pub fullauto: Service<FullAutoJob>,
}

impl Services {
	pub fn new(config: &Config, ie: Arc<ie::Ie>, input: Arc<dyn InputInjector>, queue: QueueHandle) -> Self {
		let config_path = Config::path()
			.inspect_err(|err| {
				tracing::warn!(error = %format!("{err:#}"), "no config path; automation uses fixed intervals");
			})
			.ok();

		let backends = Backends {
			probe: Arc::new(XcapProbe::new(ie.clone())),
			text_probe: Arc::new(XcapProbe::with_text(ie)),
			input,
			queue,
			config_path,
			coords: config.coords_path(),
			templates: config.template_dir(),
			collect_threshold: config.collect_threshold,
			orange_threshold: config.orange_threshold,
		};

		let cutoff = config.collect_cutoff_s.filter(|s| *s > 0.0).map(Duration::from_secs_f32);
		let phases =
			ServicePhases::new(backends.buy_job(), backends.collect_job(), backends.orange()).with_collect_cutoff(cutoff);

		Self {
			buy: Service::new(backends.buy_job()),
			collect: Service::new(backends.collect_job()),
			fastsell: Service::new(FastSellJob {
				sweep: backends.sweep(FASTCLICK_FALLBACK_INTERVAL),
				coords: backends.coords.clone(),
			}),
			fullauto: Service::new(FullAutoJob::new(phases)),
		}
	}

	/// `(name, running)` for every service, in display order.
	pub fn status(&self) -> [(&'static str, bool); 4] {
		[
			(self.collect.name(), self.collect.is_running()),
			(self.buy.name(), self.buy.is_running()),
			(self.fastsell.name(), self.fastsell.is_running()),
			(self.fullauto.name(), self.fullauto.is_running()),
		]
	}

	pub fn stop_all(&self) {
		self.fullauto.stop();
		self.buy.stop();
		self.collect.stop();
		self.fastsell.stop();
	}

	/// Toggle one service. Only one service may run at a time; a service that
	/// was asked to stop still counts until its worker has wound down.
	pub fn toggle(&self, action: HotkeyAction) -> Result<()> {
		let (name, running) = match action {
			HotkeyAction::Collect => (self.collect.name(), self.collect.is_running()),
			HotkeyAction::Buy => (self.buy.name(), self.buy.is_running()),
			HotkeyAction::FastSell => (self.fastsell.name(), self.fastsell.is_running()),
			HotkeyAction::FullAuto => (self.fullauto.name(), self.fullauto.is_running()),
		};
		if !running && let Some(other) = conflicting(&self.status(), name) {
			bail!("{other} is running; stop it before starting {name}");
		}
		match action {
			HotkeyAction::Collect => self.collect.toggle()?,
			HotkeyAction::Buy => self.buy.toggle()?,
			HotkeyAction::FastSell => self.fastsell.toggle()?,
			HotkeyAction::FullAuto => self.fullauto.toggle()?,
		}
		Ok(())
	}
}

/// The first running service other than `starting`.
fn conflicting(status: &[(&'static str, bool)], starting: &str) -> Option<&'static str> {
	status
		.iter()
		.find(|(name, running)| *running && *name != starting)
		.map(|(name, _)| *name)
}
