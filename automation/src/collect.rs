//! Collect phase: claim filled orders, confirm, then fast-sell the inventory.

use std::{
	path::{Path, PathBuf},
	sync::Arc,
	time::Duration,
};

use anyhow::Result;

use crate::{
	InputInjector, Key, Match, Point, Region, ScreenProbe, Sleeper, StopSignal,
	fastsell::FastSellSweep,
	service::Job,
};

#[derive(Debug, Clone)]
pub struct CollectLayout {
	pub close_key: Key,
	pub cancel_key: Key,
	pub click_pos: Point,
	/// Where the pointer is parked after clicking a template.
	pub idle_point: Point,
	pub region: Region,
	/// "Reward found" templates, first hit wins.
	pub reward_templates: Vec<PathBuf>,
	/// "Percentage confirmation" templates, each clicked until gone.
	pub confirm_templates: Vec<PathBuf>,
	pub threshold: f32,
	pub confirm_attempts: usize,
	pub key_settle: Duration,
	pub capture_settle: Duration,
	pub template_gap: Duration,
	pub cycle_pause: Duration,
}

impl CollectLayout {
	/// The default layout with templates loaded from `dir`.
	pub fn with_template_dir(dir: &Path) -> Self {
		Self {
			close_key: Key::Char('x'),
			cancel_key: Key::Escape,
			click_pos: Point::new(1000, 534),
			idle_point: Point::new(1115, 532),
			region: Region::from_corners(Point::new(795, 373), Point::new(1121, 519)),
			reward_templates: (1..=4).map(|i| dir.join(format!("green{i}.png"))).collect(),
			confirm_templates: (1..=3).map(|i| dir.join(format!("yuzde{i}.png"))).collect(),
			threshold: 0.85,
			confirm_attempts: 5,
			key_settle: Duration::from_millis(310),
			capture_settle: Duration::from_millis(450),
			template_gap: Duration::from_millis(150),
			cycle_pause: Duration::from_millis(250),
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
	pub reward_found: bool,
	pub confirmations: usize,
	pub sold: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectReport {
	pub cycles: usize,
	pub rewards: usize,
	pub confirmations: usize,
	pub sold: usize,
	pub errors: usize,
}

pub struct CollectPhaseRunner {
	probe: Arc<dyn ScreenProbe>,
	input: Arc<dyn InputInjector>,
	layout: CollectLayout,
	sweep: FastSellSweep,
	coords: PathBuf,
}

impl CollectPhaseRunner {
	pub fn new(
		probe: Arc<dyn ScreenProbe>,
		input: Arc<dyn InputInjector>,
		layout: CollectLayout,
		sweep: FastSellSweep,
		coords: PathBuf,
	) -> Self {
		Self {
			probe,
			input,
			layout,
			sweep,
			coords,
		}
	}

	pub fn check(&self) -> Result<()> {
		self.probe.check()?;
		self.input.check()
	}

	/// Capture the region and match `template`. Errors count as a miss.
	fn probe(&self, template: &Path, sleeper: &dyn Sleeper) -> Option<Match> {
		let found = self
			.probe
			.find(self.layout.region, template, self.layout.threshold)
			.unwrap_or_else(|err| {
				tracing::warn!(error = %format!("{err:#}"), template = %template.display(), "template probe failed");
				None
			});
		sleeper.sleep(self.layout.capture_settle);
		found
	}

	fn click_match(&self, hit: Match, template: &Path) -> Result<()> {
		self.input.click_at(hit.center)?;
		tracing::info!(template = %template.display(), score = hit.score, at = %hit.center, "template clicked");
		self.input.move_to(self.layout.idle_point)
	}

	pub fn run_cycle(&self, stop: &StopSignal, sleeper: &dyn Sleeper) -> Result<CycleReport> {
		let layout = &self.layout;
		let mut report = CycleReport::default();

		self.input.press(layout.close_key)?;
		sleeper.sleep(layout.key_settle);
		self.input.click_at(layout.click_pos)?;
		sleeper.sleep(layout.key_settle);

		// A missing reward just means nothing filled since the last cycle.
		for template in &layout.reward_templates {
			if let Some(hit) = self.probe(template, sleeper) {
				self.click_match(hit, template)?;
				report.reward_found = true;
				break;
			}
			sleeper.sleep(layout.template_gap);
		}
		sleeper.sleep(layout.capture_settle);

		for template in &layout.confirm_templates {
			let mut attempts = 0;
			while let Some(hit) = self.probe(template, sleeper) {
				self.click_match(hit, template)?;
				report.confirmations += 1;
				attempts += 1;
				if attempts >= layout.confirm_attempts {
					tracing::warn!(template = %template.display(), attempts, "confirmation still visible; moving on");
					break;
				}
			}
		}

		sleeper.sleep(layout.capture_settle);
		self.input.press(layout.cancel_key)?;
		sleeper.sleep(layout.capture_settle);
		self.input.click()?;
		sleeper.sleep(layout.capture_settle);

		if !stop.is_stopped() {
			match self.sweep.run_file(&self.coords, stop, sleeper) {
				Ok(sweep) => report.sold = sweep.clicked,
				Err(err) => tracing::warn!(error = %format!("{err:#}"), "fast-sell failed"),
			}
		}
		Ok(report)
	}

	pub fn run(&self, stop: &StopSignal, sleeper: &dyn Sleeper) -> CollectReport {
		let mut report = CollectReport::default();
		while !stop.is_stopped() {
			match self.run_cycle(stop, sleeper) {
				Ok(cycle) => {
					report.rewards += usize::from(cycle.reward_found);
					report.confirmations += cycle.confirmations;
					report.sold += cycle.sold;
				}
				Err(err) => {
					tracing::warn!(error = %format!("{err:#}"), "collect cycle failed");
					report.errors += 1;
				}
			}
			report.cycles += 1;
			sleeper.pause(self.layout.cycle_pause);
		}
		tracing::info!(?report, "collect loop stopped");
		report
	}
}

pub struct CollectJob {
	pub runner: CollectPhaseRunner,
}

impl Job for CollectJob {
	type Output = CollectReport;

	fn name(&self) -> &'static str {
		"collect"
	}

	fn check(&self) -> Result<()> {
		self.runner.check()
	}

	fn run(&self, stop: &StopSignal) -> CollectReport {
		self.runner.run(stop, stop)
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use super::*;
	use crate::{
		settings::IntervalSource,
		testing::{Event, FakeInput, FakeProbe, RecordingSleeper, hit},
	};

	struct Rig {
		_dir: tempfile::TempDir,
		probe: Arc<FakeProbe>,
		input: Arc<FakeInput>,
		runner: CollectPhaseRunner,
	}

	fn rig() -> Rig {
		let dir = tempfile::tempdir().unwrap();
		let coords = dir.path().join("coordinates.json");
		fs::write(&coords, r#"[{"x": 5, "y": 6}, {"x": 7, "y": 8}]"#).unwrap();

		let probe = Arc::new(FakeProbe::default());
		let input = Arc::new(FakeInput::default());
		let sweep = FastSellSweep::new(input.clone(), IntervalSource::fixed(0.0));
		let runner = CollectPhaseRunner::new(
			probe.clone(),
			input.clone(),
			CollectLayout::with_template_dir(&dir.path().join("template")),
			sweep,
			coords,
		);
		Rig {
			_dir: dir,
			probe,
			input,
			runner,
		}
	}

	#[test]
	fn first_reward_template_wins() {
		let rig = rig();
		rig.probe.script("green2.png", [hit(900, 400)]);
		rig.probe.script("green3.png", [hit(1, 1)]);

		let report = rig.runner.run_cycle(&StopSignal::new(), &RecordingSleeper::default()).unwrap();

		assert!(report.reward_found);
		assert_eq!(rig.probe.probe_count("green1.png"), 1);
		assert_eq!(rig.probe.probe_count("green3.png"), 0);
		assert!(rig.input.clicks_at().contains(&Point::new(900, 400)));
	}

	#[test]
	fn no_reward_still_confirms_and_sells() {
		let rig = rig();
		rig.probe.script("yuzde1.png", [hit(10, 10), hit(10, 10), None]);

		let report = rig.runner.run_cycle(&StopSignal::new(), &RecordingSleeper::default()).unwrap();

		assert!(!report.reward_found);
		assert_eq!(report.confirmations, 2);
		assert_eq!(report.sold, 2);
		let events = rig.input.events();
		assert_eq!(events.first(), Some(&Event::Press(Key::Char('x'))));
		assert!(events.contains(&Event::Press(Key::Escape)));
		let clicks = rig.input.clicks_at();
		assert_eq!(&clicks[clicks.len() - 2..], &[Point::new(5, 6), Point::new(7, 8)]);
	}

	#[test]
	fn confirmation_loop_is_bounded() {
		let rig = rig();
		rig.probe.script("yuzde2.png", [hit(10, 10)]);

		let report = rig.runner.run_cycle(&StopSignal::new(), &RecordingSleeper::default()).unwrap();

		assert_eq!(report.confirmations, 5);
		assert_eq!(rig.probe.probe_count("yuzde2.png"), 5);
		assert_eq!(rig.probe.probe_count("yuzde3.png"), 1);
	}

	#[test]
	fn unreadable_template_counts_as_miss() {
		let rig = rig();
		rig.probe.break_template("green1.png");
		rig.probe.script("green2.png", [hit(3, 3)]);

		let report = rig.runner.run_cycle(&StopSignal::new(), &RecordingSleeper::default()).unwrap();
		assert!(report.reward_found);
	}

	#[test]
	fn loop_runs_until_stopped() {
		struct StopAfter {
			stop: StopSignal,
			left: std::sync::Mutex<usize>,
		}
		impl Sleeper for StopAfter {
			fn sleep(&self, dur: Duration) {
				if dur == Duration::from_millis(250) {
					let mut left = self.left.lock().unwrap();
					*left -= 1;
					if *left == 0 {
						self.stop.stop();
					}
				}
			}
		}

		let rig = rig();
		let stop = StopSignal::new();
		let sleeper = StopAfter {
			stop: stop.clone(),
			left: std::sync::Mutex::new(3),
		};
		let report = rig.runner.run(&stop, &sleeper);
		assert_eq!(report.cycles, 3);
		assert_eq!(report.sold, 6);
	}
}
