//! Recent log lines for the log panel.

use std::{
	collections::VecDeque,
	io,
	sync::{Arc, Mutex, PoisonError},
};

const CAPACITY: usize = 500;

/// Ring buffer of formatted log lines, usable as a `tracing_subscriber` writer.
#[derive(Clone, Default)]
pub struct LogBuffer {
	lines: Arc<Mutex<VecDeque<String>>>,
}

impl LogBuffer {
	pub fn lines(&self) -> Vec<String> {
		self.lines
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.iter()
			.cloned()
			.collect()
	}

	pub fn clear(&self) {
		self.lines.lock().unwrap_or_else(PoisonError::into_inner).clear();
	}

	fn push(&self, text: &str) {
		let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
		for line in text.lines().filter(|l| !l.trim().is_empty()) {
			if lines.len() == CAPACITY {
				lines.pop_front();
			}
			lines.push_back(line.to_owned());
		}
	}
}

/// One formatted event; flushed into the buffer on drop.
pub struct LineWriter {
	buffer: LogBuffer,
	pending: Vec<u8>,
}

impl io::Write for LineWriter {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.pending.extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

impl Drop for LineWriter {
	fn drop(&mut self) {
		self.buffer.push(&String::from_utf8_lossy(&self.pending));
	}
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogBuffer {
	type Writer = LineWriter;

	fn make_writer(&'a self) -> Self::Writer {
		LineWriter {
			buffer: self.clone(),
			pending: Vec::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use tracing_subscriber::fmt::MakeWriter;

	use super::*;

	#[test]
	fn keeps_most_recent_lines() {
		let buf = LogBuffer::default();
		for i in 0..CAPACITY + 3 {
			let mut w = buf.make_writer();
			writeln!(w, "line {i}").unwrap();
		}
		let lines = buf.lines();
		assert_eq!(lines.len(), CAPACITY);
		assert_eq!(lines[0], "line 3");
		assert_eq!(lines.last().map(String::as_str), Some("line 502"));
	}

	#[test]
	fn captures_tracing_events() {
		let buf = LogBuffer::default();
		let subscriber = tracing_subscriber::fmt()
			.with_ansi(false)
			.with_writer(buf.clone())
			.finish();
		tracing::subscriber::with_default(subscriber, || {
			tracing::info!(name = "Sand", "re-queued outbid order");
		});
		let lines = buf.lines();
		assert_eq!(lines.len(), 1);
		assert!(lines[0].contains("re-queued outbid order"));
		assert!(lines[0].contains("name=\"Sand\"") || lines[0].contains("name=Sand"));
	}
}
