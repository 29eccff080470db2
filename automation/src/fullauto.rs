//! Full-auto: alternate buy and collect phases, re-queueing outbid orders in
//! between, until stopped.

use std::{
	sync::{Mutex, PoisonError},
	time::{Duration, Instant},
};

use anyhow::Result;

use crate::{
	Error, StopSignal,
	buy::BuyJob,
	collect::CollectJob,
	orange::OrangeInterruptDetector,
	service::{Job, Service, Waited},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Buy,
	Collect,
}

/// The steps a full-auto cycle is made of.
pub trait Phases: Send {
	fn buy(&mut self, stop: &StopSignal) -> Result<(), Error>;

	fn collect(&mut self, stop: &StopSignal) -> Result<(), Error>;

	/// Reset the interrupt detector and run one pass. Returns whether anything was re-queued.
	fn interrupt(&mut self, stop: &StopSignal) -> bool;

	/// Stop every sub-service.
	fn halt(&mut self);
}

pub struct FullAutoOrchestrator<P> {
	phases: P,
	next: Phase,
}

impl<P: Phases> FullAutoOrchestrator<P> {
	pub fn new(phases: P) -> Self {
		Self {
			phases,
			next: Phase::Buy,
		}
	}

	pub fn next_phase(&self) -> Phase {
		self.next
	}

	pub fn phases(&self) -> &P {
		&self.phases
	}

	/// Run one phase plus the interrupt pass. `None` when stopped or the phase
	/// could not start, otherwise whether the interrupt pass changed the queue.
	pub fn run_cycle(&mut self, stop: &StopSignal) -> Option<bool> {
		if stop.is_stopped() {
			return None;
		}
		tracing::info!(phase = ?self.next, "full-auto phase");
		let started = match self.next {
			Phase::Buy => self.phases.buy(stop),
			Phase::Collect => self.phases.collect(stop),
		};
		if let Err(err) = started {
			tracing::warn!(error = %err, phase = ?self.next, "full-auto phase failed to start");
			return None;
		}
		if stop.is_stopped() {
			return None;
		}

		let changed = self.phases.interrupt(stop);
		self.next = if changed { Phase::Buy } else { Phase::Collect };
		Some(changed)
	}

	/// Cycle until stopped. Returns the number of completed cycles.
	pub fn run(&mut self, stop: &StopSignal) -> usize {
		let mut cycles = 0;
		while self.run_cycle(stop).is_some() {
			cycles += 1;
		}
		self.phases.halt();
		cycles
	}
}

/// [`Phases`] backed by the real buy and collect services.
pub struct ServicePhases {
	pub buy: Service<BuyJob>,
	pub collect: Service<CollectJob>,
	pub orange: OrangeInterruptDetector,
	pub poll: Duration,
	/// Force-stop the collect loop after this long.
	pub collect_cutoff: Option<Duration>,
}

impl ServicePhases {
	pub fn new(buy: BuyJob, collect: CollectJob, orange: OrangeInterruptDetector) -> Self {
		Self {
			buy: Service::new(buy),
			collect: Service::new(collect),
			orange,
			poll: Duration::from_millis(400),
			collect_cutoff: None,
		}
	}

	pub fn with_collect_cutoff(mut self, cutoff: Option<Duration>) -> Self {
		self.collect_cutoff = cutoff;
		self
	}

	fn check(&self) -> Result<()> {
		self.buy.job().check()?;
		self.collect.job().check()?;
		self.orange.check()
	}
}

impl Phases for ServicePhases {
	fn buy(&mut self, stop: &StopSignal) -> Result<(), Error> {
		let done = self.buy.start()?;
		match done.wait_polling(self.poll, || stop.is_stopped()) {
			Waited::Done(report) => tracing::info!(?report, "buy phase finished"),
			Waited::Lost => tracing::warn!("buy worker exited without a report"),
			Waited::Interrupted => {
				self.buy.stop();
				done.wait();
			}
		}
		Ok(())
	}

	fn collect(&mut self, stop: &StopSignal) -> Result<(), Error> {
		let done = self.collect.start()?;
		let deadline = self.collect_cutoff.map(|d| Instant::now() + d);
		match done.wait_until(self.poll, deadline, || stop.is_stopped()) {
			Waited::Done(report) => tracing::info!(?report, "collect phase finished"),
			Waited::Lost => tracing::warn!("collect worker exited without a report"),
			Waited::Interrupted => {
				if !stop.is_stopped() {
					tracing::info!("collect cutoff reached");
				}
				self.collect.stop();
				if let Some(report) = done.wait() {
					tracing::info!(?report, "collect phase stopped");
				}
			}
		}
		Ok(())
	}

	fn interrupt(&mut self, stop: &StopSignal) -> bool {
		self.orange.reset();
		self.orange.run(stop, stop)
	}

	fn halt(&mut self) {
		self.buy.stop();
		self.collect.stop();
	}
}

/// The orchestrator as a service job. The next phase survives restarts.
pub struct FullAutoJob {
	orchestrator: Mutex<FullAutoOrchestrator<ServicePhases>>,
}

impl FullAutoJob {
	pub fn new(phases: ServicePhases) -> Self {
		Self {
			orchestrator: Mutex::new(FullAutoOrchestrator::new(phases)),
		}
	}
}

impl Job for FullAutoJob {
	type Output = usize;

	fn name(&self) -> &'static str {
		"fullauto"
	}

	fn check(&self) -> Result<()> {
		self.orchestrator
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.phases()
			.check()
	}

	fn run(&self, stop: &StopSignal) -> usize {
		self.orchestrator.lock().unwrap_or_else(PoisonError::into_inner).run(stop)
	}
}

#[cfg(test)]
mod tests {
	use std::{collections::VecDeque, sync::Arc};

	use super::*;
	use crate::{
		Point,
		buy::{BuyLayout, BuyPhaseRunner, ScreenBuyScript},
		collect::{CollectLayout, CollectPhaseRunner},
		fastsell::FastSellSweep,
		orange::OrangeLayout,
		queue::{ItemQueueStore, QueueHandle},
		settings::IntervalSource,
		testing::{FakeInput, FakeProbe},
	};

	#[derive(Default)]
	struct ScriptedPhases {
		interrupts: VecDeque<bool>,
		calls: Vec<Phase>,
		stop_after: Option<StopSignal>,
		halted: bool,
		broken_buy: bool,
	}

	impl Phases for ScriptedPhases {
		fn buy(&mut self, _stop: &StopSignal) -> Result<(), Error> {
			if self.broken_buy {
				return Err(Error::MissingCapability {
					service: "buy",
					reason: "no input backend".into(),
				});
			}
			self.calls.push(Phase::Buy);
			Ok(())
		}

		fn collect(&mut self, _stop: &StopSignal) -> Result<(), Error> {
			self.calls.push(Phase::Collect);
			Ok(())
		}

		fn interrupt(&mut self, _stop: &StopSignal) -> bool {
			let changed = self.interrupts.pop_front().unwrap_or(false);
			if self.interrupts.is_empty()
				&& let Some(stop) = &self.stop_after
			{
				stop.stop();
			}
			changed
		}

		fn halt(&mut self) {
			self.halted = true;
		}
	}

	#[test]
	fn next_phase_follows_interrupt_result() {
		let stop = StopSignal::new();
		let mut auto = FullAutoOrchestrator::new(ScriptedPhases {
			interrupts: VecDeque::from([false, false, true, false]),
			stop_after: Some(stop.clone()),
			..Default::default()
		});

		assert_eq!(auto.next_phase(), Phase::Buy);
		assert_eq!(auto.run(&stop), 4);
		assert_eq!(
			auto.phases().calls,
			vec![Phase::Buy, Phase::Collect, Phase::Collect, Phase::Buy]
		);
		assert_eq!(auto.next_phase(), Phase::Collect);
		assert!(auto.phases().halted);
	}

	#[test]
	fn run_cycle_reports_change() {
		let stop = StopSignal::new();
		let mut auto = FullAutoOrchestrator::new(ScriptedPhases {
			interrupts: VecDeque::from([true, true]),
			..Default::default()
		});
		assert_eq!(auto.run_cycle(&stop), Some(true));
		assert_eq!(auto.next_phase(), Phase::Buy);
	}

	#[test]
	fn stopped_orchestrator_does_nothing() {
		let stop = StopSignal::new();
		stop.stop();
		let mut auto = FullAutoOrchestrator::new(ScriptedPhases::default());
		assert_eq!(auto.run(&stop), 0);
		assert!(auto.phases().calls.is_empty());
		assert!(auto.phases().halted);
	}

	fn service_phases(dir: &tempfile::TempDir, probe: Arc<FakeProbe>, input: Arc<FakeInput>) -> ServicePhases {
		let tick = Duration::from_millis(1);
		let queue = QueueHandle::spawn(ItemQueueStore::new(dir.path().join("selecteditems.json"))).unwrap();
		let templates = dir.path().join("template");

		let buy = BuyJob {
			queue: queue.clone(),
			runner: BuyPhaseRunner::new(
				Arc::new(ScreenBuyScript::new(input.clone(), BuyLayout::default())),
				IntervalSource::fixed(0.0),
			),
		};

		let mut collect_layout = CollectLayout::with_template_dir(&templates);
		collect_layout.key_settle = tick;
		collect_layout.capture_settle = tick;
		collect_layout.template_gap = tick;
		collect_layout.cycle_pause = tick;
		let collect = CollectJob {
			runner: CollectPhaseRunner::new(
				probe.clone(),
				input.clone(),
				collect_layout,
				FastSellSweep::new(input.clone(), IntervalSource::fixed(0.0)),
				dir.path().join("coordinates.json"),
			),
		};

		let mut orange_layout = OrangeLayout::with_template_dir(&templates);
		orange_layout.sleep_short = tick;
		orange_layout.sleep_long = tick;
		orange_layout.reread = tick;
		let orange = OrangeInterruptDetector::new(probe, input, queue, orange_layout);

		let mut phases = ServicePhases::new(buy, collect, orange).with_collect_cutoff(Some(Duration::from_millis(20)));
		phases.poll = Duration::from_millis(5);
		phases
	}

	#[test]
	fn collect_cutoff_stops_collect_and_runs_the_interrupt_pass() {
		let dir = tempfile::tempdir().unwrap();
		let input = Arc::new(FakeInput::default());
		let idle = Point::new(959, 501);
		let mut auto = FullAutoOrchestrator::new(service_phases(&dir, Arc::new(FakeProbe::default()), input.clone()));
		let stop = StopSignal::new();

		// Empty queue: buy finishes at once and the pass finds nothing.
		assert_eq!(auto.run_cycle(&stop), Some(false));
		assert_eq!(auto.next_phase(), Phase::Collect);

		let started = Instant::now();
		assert_eq!(auto.run_cycle(&stop), Some(false));
		assert!(started.elapsed() < Duration::from_secs(10));

		assert!(!stop.is_stopped());
		assert_eq!(input.clicks_at().iter().filter(|p| **p == idle).count(), 2);

		let collect = &auto.phases().collect;
		while collect.is_running() && started.elapsed() < Duration::from_secs(10) {
			std::thread::sleep(Duration::from_millis(1));
		}
		assert!(!collect.is_running());
	}

	#[test]
	fn phase_that_cannot_start_ends_the_run() {
		let stop = StopSignal::new();
		let mut auto = FullAutoOrchestrator::new(ScriptedPhases {
			broken_buy: true,
			..Default::default()
		});
		assert_eq!(auto.run(&stop), 0);
		assert_eq!(auto.next_phase(), Phase::Buy);
	}
}
