//! Start/stop lifecycle shared by every long-running automation service.
//!
//! A service owns one [`Job`]. Each start spawns a named worker thread that
//! runs the job once and publishes its output on a [`Completion`] channel.

use std::{
	sync::{
		Arc, Mutex, PoisonError,
		mpsc::{self, Receiver, RecvTimeoutError},
	},
	thread::JoinHandle,
	time::{Duration, Instant},
};

use crate::{Error, StopSignal};

pub trait Job: Send + Sync + 'static {
	type Output: Send + 'static;

	fn name(&self) -> &'static str;

	/// Verify the capabilities the job needs before a worker is spawned.
	fn check(&self) -> anyhow::Result<()> {
		Ok(())
	}

	fn run(&self, stop: &StopSignal) -> Self::Output;
}

pub struct Service<J: Job> {
	job: Arc<J>,
	stop: StopSignal,
	worker: Mutex<Option<JoinHandle<()>>>,
}

impl<J: Job> Service<J> {
	pub fn new(job: J) -> Self {
		Self {
			job: Arc::new(job),
			stop: StopSignal::new(),
			worker: Mutex::new(None),
		}
	}

	pub fn job(&self) -> &J {
		&self.job
	}

	pub fn name(&self) -> &'static str {
		self.job.name()
	}

	pub fn is_running(&self) -> bool {
		self.worker
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.as_ref()
			.is_some_and(|h| !h.is_finished())
	}

	pub fn start(&self) -> Result<Completion<J::Output>, Error> {
		let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
		if worker.as_ref().is_some_and(|h| !h.is_finished()) {
			return Err(Error::AlreadyRunning(self.name()));
		}

		if let Err(err) = self.job.check() {
			let reason = format!("{err:#}");
			tracing::warn!(service = self.name(), %reason, "missing capability; not starting");
			return Err(Error::MissingCapability {
				service: self.name(),
				reason,
			});
		}

		self.stop.reset();
		let (tx, rx) = mpsc::channel();
		let job = self.job.clone();
		let stop = self.stop.clone();
		let handle = std::thread::Builder::new()
			.name(self.name().to_owned())
			.spawn(move || {
				tracing::info!(service = job.name(), "started");
				let output = job.run(&stop);
				tracing::info!(service = job.name(), "finished");
				let _ = tx.send(output);
			})
			.map_err(|source| Error::Spawn {
				service: self.name(),
				source,
			})?;

		*worker = Some(handle);
		Ok(Completion { rx })
	}

	/// Ask the worker to stop at its next checkpoint.
	pub fn stop(&self) {
		if self.is_running() {
			tracing::info!(service = self.name(), "stopping");
		}
		self.stop.stop();
	}

	pub fn toggle(&self) -> Result<(), Error> {
		if self.is_running() {
			self.stop();
			Ok(())
		} else {
			self.start().map(drop)
		}
	}
}

impl<J: Job> Drop for Service<J> {
	fn drop(&mut self) {
		self.stop.stop();
	}
}

/// How waiting on a [`Completion`] ended.
#[derive(Debug)]
pub enum Waited<T> {
	Done(T),
	/// The worker exited without an output (it panicked).
	Lost,
	/// The caller's condition asked to stop waiting.
	Interrupted,
}

/// Receiving end of one service run.
pub struct Completion<T> {
	rx: Receiver<T>,
}

impl<T> Completion<T> {
	/// Block until the run finishes.
	pub fn wait(&self) -> Option<T> {
		self.rx.recv().ok()
	}

	/// Wait for the run, checking `interrupt` every `poll`.
	pub fn wait_polling(&self, poll: Duration, mut interrupt: impl FnMut() -> bool) -> Waited<T> {
		loop {
			match self.rx.recv_timeout(poll) {
				Ok(v) => return Waited::Done(v),
				Err(RecvTimeoutError::Disconnected) => return Waited::Lost,
				Err(RecvTimeoutError::Timeout) => {
					if interrupt() {
						return Waited::Interrupted;
					}
				}
			}
		}
	}

	/// Like [`Completion::wait_polling`] with an optional deadline.
	pub fn wait_until(&self, poll: Duration, deadline: Option<Instant>, mut interrupt: impl FnMut() -> bool) -> Waited<T> {
		self.wait_polling(poll, || interrupt() || deadline.is_some_and(|d| Instant::now() >= d))
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;

	struct Counter {
		runs: AtomicUsize,
		available: bool,
	}

	impl Job for Counter {
		type Output = usize;

		fn name(&self) -> &'static str {
			"counter"
		}

		fn check(&self) -> anyhow::Result<()> {
			anyhow::ensure!(self.available, "input backend missing");
			Ok(())
		}

		fn run(&self, stop: &StopSignal) -> usize {
			// Runs until stopped.
			while !stop.wait_timeout(Duration::from_millis(5)) {}
			self.runs.fetch_add(1, Ordering::SeqCst) + 1
		}
	}

	fn counter(available: bool) -> Service<Counter> {
		Service::new(Counter {
			runs: AtomicUsize::new(0),
			available,
		})
	}

	#[test]
	fn start_stop_publishes_completion() {
		let service = counter(true);
		let done = service.start().unwrap();
		assert!(service.is_running());
		assert!(matches!(service.start(), Err(Error::AlreadyRunning("counter"))));

		service.stop();
		assert_eq!(done.wait(), Some(1));
		std::thread::sleep(Duration::from_millis(20));
		assert!(!service.is_running());

		let again = service.start().unwrap();
		service.toggle().unwrap();
		assert_eq!(again.wait(), Some(2));
	}

	#[test]
	fn missing_capability_does_not_start() {
		let service = counter(false);
		let err = service.start().err().unwrap();
		assert!(matches!(err, Error::MissingCapability { service: "counter", .. }));
		assert!(!service.is_running());
	}

	#[test]
	fn wait_polling_can_be_interrupted() {
		let service = counter(true);
		let done = service.start().unwrap();
		let mut polls = 0;
		let waited = done.wait_polling(Duration::from_millis(1), || {
			polls += 1;
			polls >= 3
		});
		assert!(matches!(waited, Waited::Interrupted));
		service.stop();
		assert!(done.wait().is_some());
	}
}
