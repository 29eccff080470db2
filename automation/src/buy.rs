//! Buy phase: place one buy order per queued item.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use anyhow::Result;

use crate::{
	InputInjector, Key, Point, Sleeper, StopSignal,
	queue::{QueueEntry, QueueHandle},
	service::Job,
	settings::IntervalSource,
	variant::{self, Group, VariantTable},
};

/// Entries between two rate-limit pauses.
pub const COOLDOWN_EVERY: usize = 5;
pub const COOLDOWN: Duration = Duration::from_secs(65);

/// Step pacing handed to a [`BuyScript`].
pub struct Pace<'a> {
	pub sleeper: &'a dyn Sleeper,
	pub interval: &'a IntervalSource,
}

impl Pace<'_> {
	/// The configured inter-step delay, re-read every call.
	pub fn step(&self) {
		let dur = self.interval.read();
		if !dur.is_zero() {
			self.sleeper.sleep(dur);
		}
	}

	pub fn wait(&self, dur: Duration) {
		self.sleeper.sleep(dur);
	}

	/// Like [`Pace::step`], but returns early on stop. Only for use between entries.
	fn rest(&self) {
		let dur = self.interval.read();
		if !dur.is_zero() {
			self.sleeper.pause(dur);
		}
	}
}

/// Executes the order-placing interaction for one entry.
pub trait BuyScript: Send + Sync {
	fn check(&self) -> Result<()> {
		Ok(())
	}

	fn buy(&self, entry: &QueueEntry, pace: &Pace) -> Result<()>;
}

/// Fixed positions of the buy-order dialog.
#[derive(Debug, Clone)]
pub struct BuyLayout {
	pub bazaar_key: Key,
	pub search: Point,
	pub c: Point,
	pub d: Point,
	pub e: Point,
	pub f: Point,
	pub confirm_wait: Duration,
	pub targets: BTreeMap<String, Point>,
	pub variants: VariantTable,
}

impl Default for BuyLayout {
	fn default() -> Self {
		Self {
			bazaar_key: Key::Char('x'),
			search: Point::new(817, 540),
			c: Point::new(1022, 430),
			d: Point::new(1072, 427),
			e: Point::new(927, 431),
			f: Point::new(965, 431),
			confirm_wait: Duration::from_secs(1),
			targets: variant::builtin_targets(),
			variants: VariantTable::builtin(),
		}
	}
}

/// The on-screen buy script.
pub struct ScreenBuyScript {
	input: Arc<dyn InputInjector>,
	layout: BuyLayout,
}

impl ScreenBuyScript {
	pub fn new(input: Arc<dyn InputInjector>, layout: BuyLayout) -> Self {
		Self { input, layout }
	}

	fn click(&self, at: Point, label: &str, pace: &Pace) -> Result<()> {
		self.input.click_at(at)?;
		tracing::debug!(label, %at, "click");
		pace.step();
		Ok(())
	}

	fn press(&self, key: Key, pace: &Pace) -> Result<()> {
		self.input.press(key)?;
		pace.step();
		Ok(())
	}

	fn type_text(&self, text: &str, pace: &Pace) -> Result<()> {
		self.input.type_text(text)?;
		tracing::debug!(text, "typed");
		pace.step();
		Ok(())
	}
}

impl BuyScript for ScreenBuyScript {
	fn check(&self) -> Result<()> {
		self.input.check()
	}

	fn buy(&self, entry: &QueueEntry, pace: &Pace) -> Result<()> {
		let layout = &self.layout;
		let a = variant::resolve(&layout.variants, &layout.targets, &entry.name, Group::A)?;
		let b = variant::resolve(&layout.variants, &layout.targets, &entry.name, Group::B)?;

		self.press(layout.bazaar_key, pace)?;
		self.click(layout.search, "search", pace)?;
		self.type_text(&entry.name, pace)?;

		self.click(a, "a", pace)?;
		self.click(b, "b", pace)?;
		self.click(layout.c, "c", pace)?;
		self.click(layout.d, "d", pace)?;

		self.type_text(&entry.expected_amount.to_string(), pace)?;
		self.press(Key::Enter, pace)?;

		pace.wait(layout.confirm_wait);
		self.click(layout.e, "e", pace)?;
		pace.wait(layout.confirm_wait);
		self.click(layout.f, "f", pace)?;

		self.press(layout.bazaar_key, pace)
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuyReport {
	/// Entries the script was run for (including failures).
	pub processed: usize,
	pub failed: usize,
	/// Entries without a name.
	pub skipped: usize,
	pub cooldowns: usize,
	pub stopped: bool,
}

pub struct BuyPhaseRunner {
	script: Arc<dyn BuyScript>,
	interval: IntervalSource,
	cooldown_every: usize,
	cooldown: Duration,
}

impl BuyPhaseRunner {
	pub fn new(script: Arc<dyn BuyScript>, interval: IntervalSource) -> Self {
		Self {
			script,
			interval,
			cooldown_every: COOLDOWN_EVERY,
			cooldown: COOLDOWN,
		}
	}

	pub fn with_cooldown(mut self, every: usize, pause: Duration) -> Self {
		self.cooldown_every = every.max(1);
		self.cooldown = pause;
		self
	}

	pub fn check(&self) -> Result<()> {
		self.script.check()
	}

	pub fn run(&self, entries: &[QueueEntry], stop: &StopSignal, sleeper: &dyn Sleeper) -> BuyReport {
		let mut report = BuyReport::default();
		if entries.is_empty() {
			tracing::info!("no items to buy");
			return report;
		}
		tracing::info!(count = entries.len(), "buy phase starting");

		let pace = Pace {
			sleeper,
			interval: &self.interval,
		};
		let total = entries.len();

		for (idx, entry) in entries.iter().enumerate() {
			if stop.is_stopped() {
				report.stopped = true;
				break;
			}

			let name = entry.name.trim();
			if name.is_empty() {
				tracing::info!(index = idx + 1, "skipping entry without a name");
				report.skipped += 1;
				continue;
			}

			tracing::info!(index = idx + 1, total, name, amount = entry.expected_amount, "buying");
			let entry = QueueEntry {
				name: name.to_owned(),
				..entry.clone()
			};
			report.processed += 1;
			if let Err(err) = self.script.buy(&entry, &pace) {
				tracing::warn!(error = %format!("{err:#}"), name, "buy failed");
				report.failed += 1;
				pace.rest();
			}

			if report.processed % self.cooldown_every == 0 {
				tracing::info!(
					processed = report.processed,
					secs = self.cooldown.as_secs(),
					"rate limit pause"
				);
				sleeper.pause(self.cooldown);
				report.cooldowns += 1;
			}
		}

		tracing::info!(?report, "buy phase done");
		report
	}
}

/// Buy phase as a service: snapshot the queue and run through it once.
pub struct BuyJob {
	pub queue: QueueHandle,
	pub runner: BuyPhaseRunner,
}

impl Job for BuyJob {
	type Output = BuyReport;

	fn name(&self) -> &'static str {
		"buy"
	}

	fn check(&self) -> Result<()> {
		self.runner.check()
	}

	fn run(&self, stop: &StopSignal) -> BuyReport {
		let entries = self.queue.load();
		self.runner.run(&entries, stop, stop)
	}
}
