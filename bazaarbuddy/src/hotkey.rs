//! Global hotkeys that toggle the automation services.

use std::sync::mpsc::Receiver;

use anyhow::Result;

use crate::config::Hotkeys;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
	Collect,
	Buy,
	FullAuto,
	FastSell,
}

/// Windows virtual-key code for a key name like `F1`, `Insert` or `K`.
pub fn vk_code(name: &str) -> Option<u32> {
	let name = name.trim();
	let upper = name.to_ascii_uppercase();
	if let Some(n) = upper.strip_prefix('F').and_then(|n| n.parse::<u32>().ok()) {
		return (1..=24).contains(&n).then(|| 0x70 + n - 1);
	}
	let code = match upper.as_str() {
		"INSERT" | "INS" => 0x2D,
		"DELETE" | "DEL" => 0x2E,
		"HOME" => 0x24,
		"END" => 0x23,
		"PAGEUP" | "PGUP" => 0x21,
		"PAGEDOWN" | "PGDN" => 0x22,
		"PAUSE" => 0x13,
		_ => {
			let mut chars = upper.chars();
			let c = chars.next()?;
			if chars.next().is_some() || !c.is_ascii_alphanumeric() {
				return None;
			}
			c as u32
		}
	};
	Some(code)
}

/// Keys to register. In full-auto mode only the orchestrator is bound.
pub fn bindings(keys: &Hotkeys, fullauto_mode: bool) -> Vec<(HotkeyAction, u32)> {
	let all = [
		(HotkeyAction::Collect, &keys.collect),
		(HotkeyAction::Buy, &keys.buy),
		(HotkeyAction::FullAuto, &keys.fullauto),
		(HotkeyAction::FastSell, &keys.fastsell),
	];
	all.into_iter()
		.filter(|(action, _)| !fullauto_mode || *action == HotkeyAction::FullAuto)
		.filter(|(_, name)| !name.trim().is_empty())
		.filter_map(|(action, name)| match vk_code(name) {
			Some(vk) => Some((action, vk)),
			None => {
				tracing::warn!(key = %name, ?action, "unknown hotkey name; not bound");
				None
			}
		})
		.collect()
}

/// Background listener; dropping it unregisters every key.
pub struct HotkeyListener {
	rx: Receiver<HotkeyAction>,
	#[cfg(windows)]
	thread_id: u32,
}

impl HotkeyListener {
	/// Actions triggered since the last call.
	pub fn poll(&self) -> Vec<HotkeyAction> {
		self.rx.try_iter().collect()
	}
}

#[cfg(windows)]
impl HotkeyListener {
	pub fn spawn(bindings: Vec<(HotkeyAction, u32)>, ctx: egui::Context) -> Result<Self> {
		use anyhow::Context;
		use windows::Win32::{
			System::Threading::GetCurrentThreadId,
			UI::{
				Input::KeyboardAndMouse::{MOD_NOREPEAT, RegisterHotKey, UnregisterHotKey},
				WindowsAndMessaging::{GetMessageW, MSG, WM_HOTKEY},
			},
		};

		let (tx, rx) = std::sync::mpsc::channel();
		let (id_tx, id_rx) = std::sync::mpsc::channel();

		std::thread::Builder::new()
			.name("hotkeys".into())
			.spawn(move || {
				let mut registered = Vec::new();
				for (i, (action, vk)) in bindings.into_iter().enumerate() {
					let id = i as i32 + 1;
					match unsafe { RegisterHotKey(None, id, MOD_NOREPEAT, vk) } {
						Ok(()) => registered.push((id, action)),
						Err(err) => tracing::warn!(error = %err, ?action, "failed to register hotkey"),
					}
				}
				tracing::info!(count = registered.len(), "hotkeys registered");
				let _ = id_tx.send(unsafe { GetCurrentThreadId() });

				let mut msg = MSG::default();
				while unsafe { GetMessageW(&mut msg, None, 0, 0) }.0 > 0 {
					if msg.message != WM_HOTKEY {
						continue;
					}
					let Some((_, action)) = registered.iter().find(|(id, _)| *id as usize == msg.wParam.0) else {
						continue;
					};
					if tx.send(*action).is_err() {
						break;
					}
					ctx.request_repaint();
				}

				for (id, _) in registered {
					let _ = unsafe { UnregisterHotKey(None, id) };
				}
			})
			.context("spawn hotkey thread")?;

		let thread_id = id_rx.recv().context("hotkey thread exited early")?;
		Ok(Self { rx, thread_id })
	}
}

#[cfg(windows)]
impl Drop for HotkeyListener {
	fn drop(&mut self) {
		use windows::Win32::{
			Foundation::{LPARAM, WPARAM},
			UI::WindowsAndMessaging::{PostThreadMessageW, WM_QUIT},
		};
		if let Err(err) = unsafe { PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
			tracing::warn!(error = %err, "failed to stop hotkey thread");
		}
	}
}

#[cfg(not(windows))]
impl HotkeyListener {
	pub fn spawn(_bindings: Vec<(HotkeyAction, u32)>, _ctx: egui::Context) -> Result<Self> {
		anyhow::bail!("global hotkeys are only implemented on Windows")
	}
}
