//! Click sweep over a saved list of inventory slots.

use std::{
	fs,
	path::{Path, PathBuf},
	sync::Arc,
};

use anyhow::{Context, Result, ensure};

use crate::{InputInjector, Point, Sleeper, StopSignal, service::Job, settings::IntervalSource};

/// Load `[{"x": .., "y": ..}, ...]`. Malformed entries are skipped.
pub fn load_points(path: &Path) -> Result<Vec<Point>> {
	ensure!(path.exists(), "coordinate file not found: {}", path.display());
	let json = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
	let value: serde_json::Value =
		serde_json::from_str(&json).with_context(|| format!("parse {}", path.display()))?;
	let list = value
		.as_array()
		.with_context(|| format!("{} is not a list", path.display()))?;

	Ok(list
		.iter()
		.filter_map(|item| {
			let x = item.get("x")?.as_i64()?;
			let y = item.get("y")?.as_i64()?;
			Some(Point::new(i32::try_from(x).ok()?, i32::try_from(y).ok()?))
		})
		.collect())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
	pub clicked: usize,
	pub aborted: bool,
}

pub struct FastSellSweep {
	input: Arc<dyn InputInjector>,
	interval: IntervalSource,
}

impl FastSellSweep {
	pub fn new(input: Arc<dyn InputInjector>, interval: IntervalSource) -> Self {
		Self { input, interval }
	}

	pub fn check(&self) -> Result<()> {
		self.input.check()
	}

	pub fn run(&self, points: &[Point], stop: &StopSignal, sleeper: &dyn Sleeper) -> SweepReport {
		let mut report = SweepReport::default();
		for (idx, &point) in points.iter().enumerate() {
			let interval = self.interval.read();
			if idx > 0 && !interval.is_zero() {
				sleeper.pause(interval);
			}
			if stop.is_stopped() {
				tracing::info!(clicked = report.clicked, "fast-sell aborted");
				report.aborted = true;
				return report;
			}

			if let Err(err) = self.input.click_at(point) {
				tracing::warn!(error = %format!("{err:#}"), %point, "fast-sell click failed");
				continue;
			}
			report.clicked += 1;
			tracing::debug!(%point, step = report.clicked, interval = interval.as_secs_f32(), "fast-sell click");
		}
		tracing::info!(clicked = report.clicked, "fast-sell done");
		report
	}

	/// Load `coords` and sweep it.
	pub fn run_file(&self, coords: &Path, stop: &StopSignal, sleeper: &dyn Sleeper) -> Result<SweepReport> {
		let points = load_points(coords)?;
		Ok(self.run(&points, stop, sleeper))
	}
}

/// The standalone fast-click tool.
pub struct FastSellJob {
	pub sweep: FastSellSweep,
	pub coords: PathBuf,
}

impl Job for FastSellJob {
	type Output = Result<SweepReport>;

	fn name(&self) -> &'static str {
		"fast-sell"
	}

	fn check(&self) -> Result<()> {
		self.sweep.check()
	}

	fn run(&self, stop: &StopSignal) -> Self::Output {
		self.sweep.run_file(&self.coords, stop, stop).inspect_err(|err| {
			tracing::warn!(error = %format!("{err:#}"), "fast-sell failed");
		})
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;
	use crate::testing::{FakeInput, RecordingSleeper};

	fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
		let path = dir.path().join(name);
		fs::write(&path, body).unwrap();
		path
	}

	#[test]
	fn load_skips_malformed_entries() {
		let dir = tempfile::tempdir().unwrap();
		let path = write(&dir, "coordinates.json", r#"[{"x": 1, "y": 2}, {"x": "a", "y": 3}, 7, {"x": 4, "y": 5}]"#);
		assert_eq!(load_points(&path).unwrap(), vec![Point::new(1, 2), Point::new(4, 5)]);
	}

	#[test]
	fn load_rejects_missing_or_non_list() {
		let dir = tempfile::tempdir().unwrap();
		assert!(load_points(&dir.path().join("none.json")).is_err());
		let path = write(&dir, "coordinates.json", r#"{"x": 1, "y": 2}"#);
		assert!(load_points(&path).is_err());
	}

	#[test]
	fn sweep_clicks_every_point_with_interval() {
		let dir = tempfile::tempdir().unwrap();
		let config = write(&dir, "config.json", r#"{"fastsell": {"interval": 0.5}}"#);
		let input = Arc::new(FakeInput::default());
		let sweep = FastSellSweep::new(input.clone(), IntervalSource::file(config, 0.0));
		let sleeper = RecordingSleeper::default();

		let points = [Point::new(10, 10), Point::new(20, 20), Point::new(30, 30)];
		let report = sweep.run(&points, &StopSignal::new(), &sleeper);

		assert_eq!(report, SweepReport { clicked: 3, aborted: false });
		assert_eq!(input.clicks_at(), points.to_vec());
		assert_eq!(sleeper.count(Duration::from_millis(500)), 2);
	}

	#[test]
	fn zero_interval_never_sleeps() {
		let input = Arc::new(FakeInput::default());
		let sweep = FastSellSweep::new(input, IntervalSource::fixed(0.0));
		let sleeper = RecordingSleeper::default();
		sweep.run(&[Point::new(1, 1), Point::new(2, 2)], &StopSignal::new(), &sleeper);
		assert!(sleeper.sleeps.lock().unwrap().is_empty());
	}

	#[test]
	fn stop_aborts_before_next_click() {
		let input = Arc::new(FakeInput::default());
		let sweep = FastSellSweep::new(input.clone(), IntervalSource::fixed(0.0));
		let stop = StopSignal::new();
		stop.stop();
		let report = sweep.run(&[Point::new(1, 1)], &stop, &RecordingSleeper::default());
		assert_eq!(report, SweepReport { clicked: 0, aborted: true });
		assert!(input.events().is_empty());
	}

	#[test]
	fn last_click_is_not_followed_by_a_wait() {
		let input = Arc::new(FakeInput::default());
		let sweep = FastSellSweep::new(input.clone(), IntervalSource::fixed(0.2));
		let sleeper = RecordingSleeper::default();
		sweep.run(&[Point::new(1, 1)], &StopSignal::new(), &sleeper);
		assert_eq!(input.clicks_at(), vec![Point::new(1, 1)]);
		assert!(sleeper.sleeps.lock().unwrap().is_empty());
	}

	#[test]
	fn stop_during_the_interval_skips_the_next_click() {
		let input = Arc::new(FakeInput::default());
		let sweep = FastSellSweep::new(input.clone(), IntervalSource::fixed(30.0));
		let stop = StopSignal::new();
		let remote = stop.clone();
		let stopper = std::thread::spawn(move || {
			std::thread::sleep(Duration::from_millis(50));
			remote.stop();
		});

		let started = std::time::Instant::now();
		let report = sweep.run(&[Point::new(1, 1), Point::new(2, 2)], &stop, &stop);
		stopper.join().unwrap();

		assert!(started.elapsed() < Duration::from_secs(10));
		assert_eq!(report, SweepReport { clicked: 1, aborted: true });
		assert_eq!(input.clicks_at(), vec![Point::new(1, 1)]);
	}
}
