use std::{
	sync::{Arc, Condvar, Mutex, PoisonError},
	time::{Duration, Instant},
};

/// Cooperative cancellation flag shared between a service and its worker.
///
/// Sleeping through [`StopSignal::wait_timeout`] wakes up as soon as the
/// signal is raised, so long pauses never delay a stop.
#[derive(Clone, Default)]
pub struct StopSignal(Arc<(Mutex<bool>, Condvar)>);

impl StopSignal {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn stop(&self) {
		let (lock, cv) = &*self.0;
		*lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
		cv.notify_all();
	}

	pub fn reset(&self) {
		let (lock, _) = &*self.0;
		*lock.lock().unwrap_or_else(PoisonError::into_inner) = false;
	}

	pub fn is_stopped(&self) -> bool {
		*self.0.0.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Block for `dur` or until stopped. Returns whether the stop was observed.
	pub fn wait_timeout(&self, dur: Duration) -> bool {
		let (lock, cv) = &*self.0;
		let deadline = Instant::now() + dur;
		let mut stopped = lock.lock().unwrap_or_else(PoisonError::into_inner);
		while !*stopped {
			let now = Instant::now();
			if now >= deadline {
				break;
			}
			let (guard, _timeout) = cv
				.wait_timeout(stopped, deadline - now)
				.unwrap_or_else(PoisonError::into_inner);
			stopped = guard;
		}
		*stopped
	}
}

impl std::fmt::Debug for StopSignal {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("StopSignal").field(&self.is_stopped()).finish()
	}
}

/// Wall-clock suspension used by every automation step.
///
/// [`Sleeper::sleep`] paces the inputs of a step and always runs to the end,
/// so a step that is already underway keeps its timing after a stop.
/// [`Sleeper::pause`] is a checkpoint wait between steps and may return early.
pub trait Sleeper: Send + Sync {
	fn sleep(&self, dur: Duration);

	fn pause(&self, dur: Duration) {
		self.sleep(dur);
	}
}

impl Sleeper for StopSignal {
	fn sleep(&self, dur: Duration) {
		std::thread::sleep(dur);
	}

	fn pause(&self, dur: Duration) {
		self.wait_timeout(dur);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn wait_returns_early_once_stopped() {
		let stop = StopSignal::new();
		let remote = stop.clone();
		let waiter = std::thread::spawn(move || {
			let started = Instant::now();
			let stopped = remote.wait_timeout(Duration::from_secs(30));
			(stopped, started.elapsed())
		});
		std::thread::sleep(Duration::from_millis(50));
		stop.stop();
		let (stopped, elapsed) = waiter.join().unwrap();
		assert!(stopped);
		assert!(elapsed < Duration::from_secs(10));
	}

	#[test]
	fn reset_clears_the_flag() {
		let stop = StopSignal::new();
		stop.stop();
		assert!(stop.is_stopped());
		stop.reset();
		assert!(!stop.is_stopped());
		assert!(!stop.wait_timeout(Duration::from_millis(1)));
	}

	#[test]
	fn pacing_sleep_ignores_stop_but_pause_does_not() {
		let stop = StopSignal::new();
		stop.stop();

		let started = Instant::now();
		Sleeper::sleep(&stop, Duration::from_millis(60));
		assert!(started.elapsed() >= Duration::from_millis(60));

		let started = Instant::now();
		stop.pause(Duration::from_secs(30));
		assert!(started.elapsed() < Duration::from_secs(10));
	}
}
