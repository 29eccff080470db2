//! The persisted buy queue (`selecteditems.json`).
//!
//! [`ItemQueueStore`] does whole-document read-modify-write on the file.
//! [`QueueHandle`] puts a single thread in front of it so every reader and
//! writer in the process goes through one owner.

use std::{
	fs::{self, File},
	io::{BufWriter, Write},
	path::{Path, PathBuf},
	sync::mpsc::{self, Receiver, Sender},
	time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
	#[serde(default)]
	pub id: String,
	#[serde(default)]
	pub name: String,
	#[serde(default = "one", deserialize_with = "lenient_amount")]
	pub expected_amount: u32,
}

impl QueueEntry {
	pub fn new(name: impl Into<String>, expected_amount: u32) -> Self {
		Self {
			id: String::new(),
			name: name.into(),
			expected_amount: expected_amount.max(1),
		}
	}

	pub fn key(&self) -> String {
		queue_key(&self.name)
	}
}

/// Identity of a queue entry: the trimmed, lowercased name.
pub fn queue_key(name: &str) -> String {
	name.trim().to_lowercase()
}

fn one() -> u32 {
	1
}

/// Amounts written by hand or by older tools may be strings, floats or junk.
fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
	let value = serde_json::Value::deserialize(deserializer)?;
	let amount = match &value {
		serde_json::Value::Number(n) => n
			.as_u64()
			.or_else(|| n.as_f64().filter(|v| *v >= 1.0).map(|v| v as u64)),
		serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
		_ => None,
	};
	Ok(amount.unwrap_or(1).clamp(1, u32::MAX as u64) as u32)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct QueueFile {
	#[serde(default)]
	items: Option<Vec<QueueEntry>>,
	#[serde(default)]
	saved_at: u64,
}

fn unix_now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct ItemQueueStore {
	path: PathBuf,
}

impl ItemQueueStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// All entries in file order. Missing or corrupt files read as empty.
	pub fn load(&self) -> Vec<QueueEntry> {
		if !self.path.exists() {
			tracing::info!(path = %self.path.display(), "queue file missing; treating as empty");
			return Vec::new();
		}
		match self.try_load() {
			Ok(items) => items,
			Err(err) => {
				tracing::warn!(error = %format!("{err:#}"), "failed to read queue; treating as empty");
				Vec::new()
			}
		}
	}

	fn try_load(&self) -> Result<Vec<QueueEntry>> {
		let json = fs::read_to_string(&self.path)
			.with_context(|| format!("read {}", self.path.display()))?;
		let file: QueueFile = serde_json::from_str(&json)
			.with_context(|| format!("parse {}", self.path.display()))?;
		Ok(file.items.unwrap_or_default())
	}

	/// Overwrite the file with an empty queue.
	pub fn reset(&self) -> Result<()> {
		self.save(Vec::new())?;
		tracing::info!(path = %self.path.display(), "queue reset");
		Ok(())
	}

	/// Append unless an entry with the same key exists. Returns whether it was written.
	pub fn append(&self, name: &str, expected_amount: u32) -> Result<bool> {
		let key = queue_key(name);
		if key.is_empty() {
			return Ok(false);
		}

		// A corrupt file is replaced rather than blocking new entries.
		let mut items = if self.path.exists() {
			self.try_load().unwrap_or_default()
		} else {
			Vec::new()
		};
		if items.iter().any(|v| v.key() == key) {
			tracing::info!(name, "queue already contains item");
			return Ok(false);
		}

		items.push(QueueEntry::new(name.trim(), expected_amount));
		self.save(items)?;
		tracing::info!(name, expected_amount, "queued item");
		Ok(true)
	}

	/// Remove every entry matching `name`'s key. Returns whether anything was removed.
	pub fn remove(&self, name: &str) -> Result<bool> {
		let key = queue_key(name);
		let mut items = self.load();
		let before = items.len();
		items.retain(|v| v.key() != key);
		if items.len() == before {
			return Ok(false);
		}
		self.save(items)?;
		Ok(true)
	}

	fn save(&self, items: Vec<QueueEntry>) -> Result<()> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
		}

		let file = QueueFile {
			items: Some(items),
			saved_at: unix_now(),
		};

		let tmp = self.path.with_extension("json.tmp");
		let out = File::create(&tmp).with_context(|| format!("write {}", tmp.display()))?;
		let mut writer = BufWriter::new(out);
		serde_json::to_writer_pretty(&mut writer, &file).context("serialize queue")?;
		writer.flush().context("flush queue")?;
		drop(writer);

		if fs::rename(&tmp, &self.path).is_err() {
			let _ = fs::remove_file(&self.path);
			fs::rename(&tmp, &self.path).with_context(|| format!("persist {}", self.path.display()))?;
		}
		Ok(())
	}
}

// ----------

enum Request {
	Load(Sender<Vec<QueueEntry>>),
	Reset(Sender<bool>),
	Append {
		name: String,
		amount: u32,
		reply: Sender<bool>,
	},
	Remove {
		name: String,
		reply: Sender<bool>,
	},
}

/// Cloneable handle to the thread that owns the queue file.
///
/// The owner thread exits once every handle is dropped.
#[derive(Clone)]
pub struct QueueHandle {
	tx: Sender<Request>,
	path: PathBuf,
}

impl QueueHandle {
	pub fn spawn(store: ItemQueueStore) -> Result<Self> {
		let (tx, rx) = mpsc::channel();
		let path = store.path().to_path_buf();
		std::thread::Builder::new()
			.name("queue".into())
			.spawn(move || serve(store, rx))
			.context("spawn queue thread")?;
		Ok(Self { tx, path })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn load(&self) -> Vec<QueueEntry> {
		self.request(Request::Load).unwrap_or_else(|err| {
			tracing::warn!(%err, "queue load failed");
			Vec::new()
		})
	}

	pub fn reset(&self) -> bool {
		self.request(Request::Reset).unwrap_or_else(|err| {
			tracing::warn!(%err, "queue reset failed");
			false
		})
	}

	pub fn append(&self, name: &str, amount: u32) -> bool {
		let name = name.to_owned();
		self.request(|reply| Request::Append { name, amount, reply })
			.unwrap_or_else(|err| {
				tracing::warn!(%err, "queue append failed");
				false
			})
	}

	pub fn remove(&self, name: &str) -> bool {
		let name = name.to_owned();
		self.request(|reply| Request::Remove { name, reply })
			.unwrap_or_else(|err| {
				tracing::warn!(%err, "queue remove failed");
				false
			})
	}

	fn request<T>(&self, make: impl FnOnce(Sender<T>) -> Request) -> Result<T, crate::Error> {
		let (reply, rx) = mpsc::channel();
		self.tx.send(make(reply)).map_err(|_| crate::Error::QueueClosed)?;
		rx.recv().map_err(|_| crate::Error::QueueClosed)
	}
}

fn serve(store: ItemQueueStore, rx: Receiver<Request>) {
	for request in rx {
		match request {
			Request::Load(reply) => {
				let _ = reply.send(store.load());
			}
			Request::Reset(reply) => {
				let ok = store
					.reset()
					.map_err(|err| tracing::warn!(error = %format!("{err:#}"), "failed to reset queue"))
					.is_ok();
				let _ = reply.send(ok);
			}
			Request::Append { name, amount, reply } => {
				let appended = store.append(&name, amount).unwrap_or_else(|err| {
					tracing::warn!(error = %format!("{err:#}"), name, "failed to append to queue");
					false
				});
				let _ = reply.send(appended);
			}
			Request::Remove { name, reply } => {
				let removed = store.remove(&name).unwrap_or_else(|err| {
					tracing::warn!(error = %format!("{err:#}"), name, "failed to remove from queue");
					false
				});
				let _ = reply.send(removed);
			}
		}
	}
	tracing::debug!("queue thread exiting");
}

#[cfg(test)]
mod tests {
	use super::*;

	fn store() -> (tempfile::TempDir, ItemQueueStore) {
		let dir = tempfile::tempdir().unwrap();
		let store = ItemQueueStore::new(dir.path().join("data").join("selecteditems.json"));
		(dir, store)
	}

	#[test]
	fn missing_or_corrupt_file_loads_empty() {
		let (_dir, store) = store();
		assert!(store.load().is_empty());

		fs::create_dir_all(store.path().parent().unwrap()).unwrap();
		fs::write(store.path(), "{\"items\": [oops").unwrap();
		assert!(store.load().is_empty());
	}

	#[test]
	fn reset_then_load_is_empty() {
		let (_dir, store) = store();
		store.append("Sand", 100).unwrap();
		store.append("Emerald", 12).unwrap();
		store.reset().unwrap();
		assert!(store.load().is_empty());

		let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
		assert_eq!(raw["items"], serde_json::json!([]));
		assert!(raw["saved_at"].as_u64().unwrap() > 0);
	}

	#[test]
	fn append_suppresses_duplicates_by_key() {
		let (_dir, store) = store();
		fs::create_dir_all(store.path().parent().unwrap()).unwrap();
		fs::write(
			store.path(),
			r#"{"items": [
				{"id": "", "name": "Nether Wart", "expected_amount": 64},
				{"id": "", "name": " nether wart ", "expected_amount": 3}
			], "saved_at": 1}"#,
		)
		.unwrap();

		let before = store.load();
		assert_eq!(before.len(), 2);

		assert!(!store.append("NETHER WART", 5).unwrap());
		assert!(!store.append("  Nether Wart", 5).unwrap());
		let after = store.load();
		assert_eq!(after.len(), 2, "no additional duplicate entry");

		assert!(store.append("Sand", 100).unwrap());
		let after = store.load();
		assert_eq!(after.len(), 3);
		assert_eq!(after[2], QueueEntry::new("Sand", 100));
	}

	#[test]
	fn lenient_amounts() {
		let (_dir, store) = store();
		fs::create_dir_all(store.path().parent().unwrap()).unwrap();
		fs::write(
			store.path(),
			r#"{"items": [
				{"name": "A", "expected_amount": "7"},
				{"name": "B", "expected_amount": null},
				{"name": "C"},
				{"name": "D", "expected_amount": 0},
				{"name": "E", "expected_amount": 2.9}
			]}"#,
		)
		.unwrap();
		let amounts: Vec<u32> = store.load().iter().map(|v| v.expected_amount).collect();
		assert_eq!(amounts, vec![7, 1, 1, 1, 2]);
	}

	#[test]
	fn null_items_load_empty() {
		let (_dir, store) = store();
		fs::create_dir_all(store.path().parent().unwrap()).unwrap();
		fs::write(store.path(), r#"{"items": null}"#).unwrap();
		assert!(store.load().is_empty());
	}

	#[test]
	fn remove_by_key() {
		let (_dir, store) = store();
		store.append("Sand", 1).unwrap();
		store.append("Feather", 1).unwrap();
		assert!(store.remove("sand ").unwrap());
		assert!(!store.remove("sand").unwrap());
		let names: Vec<String> = store.load().into_iter().map(|v| v.name).collect();
		assert_eq!(names, vec!["Feather".to_string()]);
	}

	#[test]
	fn handle_serializes_through_one_owner() {
		let (_dir, store) = store();
		let handle = QueueHandle::spawn(store).unwrap();

		let writers: Vec<_> = (0..8)
			.map(|i| {
				let handle = handle.clone();
				std::thread::spawn(move || {
					handle.append(&format!("Item {}", i % 4), 1);
				})
			})
			.collect();
		for w in writers {
			w.join().unwrap();
		}

		let items = handle.load();
		assert_eq!(items.len(), 4);
		assert!(handle.reset());
		assert!(handle.load().is_empty());
	}
}
