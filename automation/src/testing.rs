//! Fakes for the capabilities, shared by the unit tests.

use std::{
	collections::{HashMap, VecDeque},
	path::Path,
	sync::Mutex,
	time::Duration,
};

use anyhow::{Result, bail};

use crate::{InputInjector, Key, Match, Point, Region, ScreenProbe, Sleeper};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	Move(Point),
	Click,
	Press(Key),
	Type(String),
}

#[derive(Default)]
pub struct FakeInput {
	pub events: Mutex<Vec<Event>>,
}

impl FakeInput {
	pub fn events(&self) -> Vec<Event> {
		self.events.lock().unwrap().clone()
	}

	pub fn clicks_at(&self) -> Vec<Point> {
		let mut at = None;
		let mut out = Vec::new();
		for e in self.events() {
			match e {
				Event::Move(p) => at = Some(p),
				Event::Click => out.extend(at),
				_ => {}
			}
		}
		out
	}
}

impl InputInjector for FakeInput {
	fn move_to(&self, at: Point) -> Result<()> {
		self.events.lock().unwrap().push(Event::Move(at));
		Ok(())
	}

	fn click(&self) -> Result<()> {
		self.events.lock().unwrap().push(Event::Click);
		Ok(())
	}

	fn press(&self, key: Key) -> Result<()> {
		self.events.lock().unwrap().push(Event::Press(key));
		Ok(())
	}

	fn type_text(&self, text: &str) -> Result<()> {
		self.events.lock().unwrap().push(Event::Type(text.to_owned()));
		Ok(())
	}
}

/// Scripted screen: each template file name has a queue of answers, the
/// last answer repeats forever. Texts are handed out in order.
#[derive(Default)]
pub struct FakeProbe {
	pub finds: Mutex<HashMap<String, VecDeque<Option<Match>>>>,
	pub texts: Mutex<VecDeque<String>>,
	pub broken: Mutex<Vec<String>>,
	pub probes: Mutex<Vec<String>>,
}

impl FakeProbe {
	pub fn script(&self, template: &str, answers: impl IntoIterator<Item = Option<Match>>) {
		self.finds
			.lock()
			.unwrap()
			.insert(template.to_owned(), answers.into_iter().collect());
	}

	pub fn texts(&self, texts: impl IntoIterator<Item = &'static str>) {
		self.texts.lock().unwrap().extend(texts.into_iter().map(str::to_owned));
	}

	pub fn break_template(&self, template: &str) {
		self.broken.lock().unwrap().push(template.to_owned());
	}

	pub fn probe_count(&self, template: &str) -> usize {
		self.probes.lock().unwrap().iter().filter(|v| *v == template).count()
	}
}

pub fn hit(x: i32, y: i32) -> Option<Match> {
	Some(Match {
		center: Point::new(x, y),
		score: 0.95,
	})
}

impl ScreenProbe for FakeProbe {
	fn find(&self, _region: Region, template: &Path, _threshold: f32) -> Result<Option<Match>> {
		let name = template
			.file_name()
			.map(|v| v.to_string_lossy().into_owned())
			.unwrap_or_default();
		self.probes.lock().unwrap().push(name.clone());
		if self.broken.lock().unwrap().contains(&name) {
			bail!("template unreadable: {name}");
		}
		let mut finds = self.finds.lock().unwrap();
		let Some(answers) = finds.get_mut(&name) else {
			return Ok(None);
		};
		if answers.len() > 1 {
			Ok(answers.pop_front().flatten())
		} else {
			Ok(answers.front().copied().flatten())
		}
	}

	fn read_text(&self, _region: Region) -> Result<String> {
		Ok(self.texts.lock().unwrap().pop_front().unwrap_or_default())
	}
}

/// Records every requested sleep instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
	pub sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
	pub fn count(&self, dur: Duration) -> usize {
		self.sleeps.lock().unwrap().iter().filter(|v| **v == dur).count()
	}
}

impl Sleeper for RecordingSleeper {
	fn sleep(&self, dur: Duration) {
		self.sleeps.lock().unwrap().push(dur);
	}
}
