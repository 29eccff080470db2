//! Re-queueing of outbid ("orange") orders after a buy or collect phase.

use std::{
	path::{Path, PathBuf},
	sync::Arc,
	time::Duration,
};

use anyhow::Result;

use crate::{
	InputInjector, Point, Region, ScreenProbe, Sleeper, StopSignal,
	names::{self, NameAmountCache},
	queue::QueueHandle,
};

#[derive(Debug, Clone)]
pub struct OrangeLayout {
	pub region: Region,
	pub marker_template: PathBuf,
	pub threshold: f32,
	pub post_click: Point,
	pub idle_point: Point,
	/// Name ROI top-left, relative to the marker centre.
	pub name_offset: Point,
	pub name_size: (u32, u32),
	pub cutoff: u8,
	pub sleep_short: Duration,
	pub sleep_long: Duration,
	pub reread: Duration,
	/// Iterations per pass before giving up on a marker that never goes away.
	pub max_iterations: Option<usize>,
}

impl OrangeLayout {
	pub fn with_template_dir(dir: &Path) -> Self {
		Self {
			region: Region::from_corners(Point::new(795, 373), Point::new(1121, 519)),
			marker_template: dir.join("turuncu.png"),
			threshold: 0.70,
			post_click: Point::new(887, 428),
			idle_point: Point::new(959, 501),
			name_offset: Point::new(77, -32),
			name_size: (300, 25),
			cutoff: names::DEFAULT_CUTOFF,
			sleep_short: Duration::from_secs(2),
			sleep_long: Duration::from_secs(3),
			reread: Duration::from_millis(200),
			max_iterations: Some(64),
		}
	}

	fn name_region(&self, marker: Point) -> Region {
		let at = marker.offset(self.name_offset.x, self.name_offset.y);
		Region::new(at.x, at.y, self.name_size.0, self.name_size.1)
	}
}

#[derive(Debug, Clone, Default)]
pub enum DetectorState {
	#[default]
	NotPrepared,
	/// Queue snapshot taken when the pass started.
	Prepared(NameAmountCache),
}

pub struct OrangeInterruptDetector {
	probe: Arc<dyn ScreenProbe>,
	input: Arc<dyn InputInjector>,
	queue: QueueHandle,
	layout: OrangeLayout,
	state: DetectorState,
}

impl OrangeInterruptDetector {
	pub fn new(probe: Arc<dyn ScreenProbe>, input: Arc<dyn InputInjector>, queue: QueueHandle, layout: OrangeLayout) -> Self {
		Self {
			probe,
			input,
			queue,
			layout,
			state: DetectorState::NotPrepared,
		}
	}

	pub fn check(&self) -> Result<()> {
		self.probe.check()?;
		self.input.check()
	}

	pub fn state(&self) -> &DetectorState {
		&self.state
	}

	/// Forget the cache so the next [`run`](Self::run) snapshots the queue again.
	pub fn reset(&mut self) {
		self.state = DetectorState::NotPrepared;
	}

	fn prepare(&mut self) -> NameAmountCache {
		if let DetectorState::Prepared(cache) = &self.state {
			return cache.clone();
		}
		let entries = self.queue.load();
		let cache = NameAmountCache::from_entries(&entries);
		if !self.queue.reset() {
			tracing::warn!("queue reset failed; continuing with the existing queue");
		}
		tracing::info!(remembered = entries.len(), "orange pass prepared");
		self.state = DetectorState::Prepared(cache.clone());
		cache
	}

	fn read_name(&self, marker: Point, sleeper: &dyn Sleeper) -> Result<String> {
		let roi = self.layout.name_region(marker);
		let first = self.probe.read_text(roi)?;
		sleeper.sleep(self.layout.reread);
		let second = self.probe.read_text(roi)?;
		Ok(names::pick_reading(&names::sanitize(&first), &names::sanitize(&second)))
	}

	/// Handle every visible marker. Returns whether anything was re-queued.
	pub fn run(&mut self, stop: &StopSignal, sleeper: &dyn Sleeper) -> bool {
		match self.pass(stop, sleeper) {
			Ok(changed) => changed,
			Err((changed, err)) => {
				tracing::warn!(error = %format!("{err:#}"), "orange pass aborted");
				changed
			}
		}
	}

	fn pass(&mut self, stop: &StopSignal, sleeper: &dyn Sleeper) -> Result<bool, (bool, anyhow::Error)> {
		let cache = self.prepare();
		let layout = &self.layout;
		let mut changed = false;
		let mut iterations = 0usize;

		sleeper.pause(layout.sleep_short);
		while !stop.is_stopped() {
			if layout.max_iterations.is_some_and(|max| iterations >= max) {
				tracing::warn!(iterations, "orange marker never cleared; ending pass");
				break;
			}
			iterations += 1;

			let marker = self
				.probe
				.find(layout.region, &layout.marker_template, layout.threshold)
				.map_err(|e| (changed, e))?;
			let Some(marker) = marker else {
				self.input.click_at(layout.idle_point).map_err(|e| (changed, e))?;
				break;
			};

			let step = || -> Result<String> {
				self.input.move_to(marker.center)?;
				let name = self.read_name(marker.center, sleeper)?;
				sleeper.sleep(layout.sleep_short);
				self.input.click()?;
				sleeper.sleep(layout.sleep_short);
				self.input.click_at(layout.post_click)?;
				Ok(name)
			};
			let name = step().map_err(|e| (changed, e))?;
			sleeper.pause(layout.sleep_long);

			if name.is_empty() {
				tracing::warn!(at = %marker.center, "orange order name unreadable");
				continue;
			}
			let resolved = cache.resolve(&name, layout.cutoff);
			if self.queue.append(&resolved.name, resolved.amount) {
				tracing::info!(name = %resolved.name, amount = resolved.amount, "re-queued outbid order");
			}
			changed = true;
		}
		Ok(changed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		queue::{ItemQueueStore, QueueEntry},
		testing::{FakeInput, FakeProbe, RecordingSleeper, hit},
	};

	struct Rig {
		_dir: tempfile::TempDir,
		probe: Arc<FakeProbe>,
		input: Arc<FakeInput>,
		queue: QueueHandle,
		detector: OrangeInterruptDetector,
	}

	fn rig(initial: &[(&str, u32)]) -> Rig {
		let dir = tempfile::tempdir().unwrap();
		let store = ItemQueueStore::new(dir.path().join("selecteditems.json"));
		for (name, amount) in initial {
			store.append(name, *amount).unwrap();
		}
		let queue = QueueHandle::spawn(store).unwrap();
		let probe = Arc::new(FakeProbe::default());
		let input = Arc::new(FakeInput::default());
		let detector = OrangeInterruptDetector::new(
			probe.clone(),
			input.clone(),
			queue.clone(),
			OrangeLayout::with_template_dir(&dir.path().join("template")),
		);
		Rig {
			_dir: dir,
			probe,
			input,
			queue,
			detector,
		}
	}

	fn names(entries: &[QueueEntry]) -> Vec<(&str, u32)> {
		entries.iter().map(|e| (e.name.as_str(), e.expected_amount)).collect()
	}

	#[test]
	fn no_marker_clears_queue_and_reports_no_change() {
		let mut rig = rig(&[("Enchanted Diamond", 4)]);

		let changed = rig.detector.run(&StopSignal::new(), &RecordingSleeper::default());

		assert!(!changed);
		assert!(rig.queue.load().is_empty());
		assert_eq!(rig.input.clicks_at(), vec![Point::new(959, 501)]);
	}

	#[test]
	fn ocr_name_is_recovered_from_cache() {
		let mut rig = rig(&[("Nether Wart", 64), ("Sand", 2)]);
		rig.probe.script("turuncu.png", [hit(900, 420), None]);
		rig.probe.texts(["NetherWart", "NetherWart"]);
		let sleeper = RecordingSleeper::default();

		let changed = rig.detector.run(&StopSignal::new(), &sleeper);

		assert!(changed);
		assert_eq!(names(&rig.queue.load()), vec![("Nether Wart", 64)]);
		assert_eq!(
			rig.input.clicks_at(),
			vec![Point::new(900, 420), Point::new(887, 428), Point::new(959, 501)]
		);
		assert_eq!(sleeper.count(Duration::from_secs(2)), 3);
		assert_eq!(sleeper.count(Duration::from_secs(3)), 1);
		assert_eq!(sleeper.count(Duration::from_millis(200)), 1);
	}

	#[test]
	fn unknown_name_falls_back_to_amount_one() {
		let mut rig = rig(&[("Nether Wart", 64)]);
		rig.probe.script("turuncu.png", [hit(900, 420), None]);
		rig.probe.texts(["Enchanted Cobblestone", "Enchanted Cobbl"]);

		assert!(rig.detector.run(&StopSignal::new(), &RecordingSleeper::default()));
		assert_eq!(names(&rig.queue.load()), vec![("Enchanted Cobblestone", 1)]);
	}

	#[test]
	fn garbage_second_reading_does_not_hide_the_first() {
		let mut rig = rig(&[("Sand", 5)]);
		rig.probe.script("turuncu.png", [hit(900, 420), None]);
		rig.probe.texts(["Sand", "~~~~~~"]);

		assert!(rig.detector.run(&StopSignal::new(), &RecordingSleeper::default()));
		assert_eq!(names(&rig.queue.load()), vec![("Sand", 5)]);
	}

	#[test]
	fn empty_reading_appends_nothing() {
		let mut rig = rig(&[]);
		rig.probe.script("turuncu.png", [hit(900, 420), None]);
		rig.probe.texts(["", "@@"]);

		assert!(!rig.detector.run(&StopSignal::new(), &RecordingSleeper::default()));
		assert!(rig.queue.load().is_empty());
	}

	#[test]
	fn stuck_marker_is_bounded() {
		let mut rig = rig(&[]);
		rig.detector.layout.max_iterations = Some(3);
		rig.probe.script("turuncu.png", [hit(900, 420)]);
		rig.probe.texts(["Sand", "Sand", "Sand", "Sand", "Sand", "Sand"]);

		assert!(rig.detector.run(&StopSignal::new(), &RecordingSleeper::default()));
		assert_eq!(rig.probe.probe_count("turuncu.png"), 3);
		assert_eq!(names(&rig.queue.load()), vec![("Sand", 1)]);
	}

	#[test]
	fn cache_is_snapshotted_once_per_pass() {
		let mut rig = rig(&[("Sand", 5)]);
		rig.detector.run(&StopSignal::new(), &RecordingSleeper::default());
		assert!(matches!(rig.detector.state(), DetectorState::Prepared(c) if c.get("sand").is_some()));

		// Second run without reset keeps the old snapshot even though the queue is empty now.
		rig.probe.script("turuncu.png", [hit(900, 420), None]);
		rig.probe.texts(["sand", "sand"]);
		rig.detector.run(&StopSignal::new(), &RecordingSleeper::default());
		assert_eq!(names(&rig.queue.load()), vec![("Sand", 5)]);

		rig.detector.reset();
		assert!(matches!(rig.detector.state(), DetectorState::NotPrepared));
	}

	#[test]
	fn probe_error_ends_pass() {
		let mut rig = rig(&[]);
		rig.probe.break_template("turuncu.png");
		assert!(!rig.detector.run(&StopSignal::new(), &RecordingSleeper::default()));
		assert!(rig.input.events().is_empty());
	}
}
