/// Failures surfaced by the automation services.
///
/// Per-step failures inside a phase never end up here; they are logged where
/// they happen and the phase moves on.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{service} cannot start: {reason}")]
	MissingCapability {
		service: &'static str,
		reason: String,
	},

	#[error("{0} is already running")]
	AlreadyRunning(&'static str),

	#[error("failed to spawn worker thread for {service}")]
	Spawn {
		service: &'static str,
		#[source]
		source: std::io::Error,
	},

	#[error("queue actor is no longer running")]
	QueueClosed,
}
