//! Pointer and keyboard injection.

use std::sync::Arc;

use automation::InputInjector;

#[cfg(windows)]
pub use win::SendInputInjector as SystemInput;

#[cfg(not(windows))]
pub use unsupported::UnsupportedInput as SystemInput;

#[cfg(windows)]
mod win {
	use std::mem;

	use anyhow::{Result, bail};
	use automation::{InputInjector, Key, Point};
	use windows::Win32::UI::{
		Input::KeyboardAndMouse::{
			INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBD_EVENT_FLAGS, KEYBDINPUT, KEYEVENTF_KEYUP,
			KEYEVENTF_UNICODE, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MOVE,
			MOUSE_EVENT_FLAGS, MOUSEEVENTF_VIRTUALDESK, MOUSEINPUT, SendInput, VIRTUAL_KEY, VK_ESCAPE, VK_RETURN, VkKeyScanW,
		},
		WindowsAndMessaging::{
			GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN, SM_YVIRTUALSCREEN,
		},
	};

	/// Global input through `SendInput`; events go to the foreground window.
	#[derive(Default)]
	pub struct SendInputInjector;

	fn send(inputs: &[INPUT]) -> Result<()> {
		let sent = unsafe { SendInput(inputs, mem::size_of::<INPUT>() as i32) };
		if sent as usize != inputs.len() {
			bail!("SendInput injected {sent} of {} events", inputs.len());
		}
		Ok(())
	}

	fn mouse(dx: i32, dy: i32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
		INPUT {
			r#type: INPUT_MOUSE,
			Anonymous: INPUT_0 {
				mi: MOUSEINPUT {
					dx,
					dy,
					mouseData: 0,
					dwFlags: flags,
					time: 0,
					dwExtraInfo: 0,
				},
			},
		}
	}

	fn key(vk: VIRTUAL_KEY, scan: u16, flags: KEYBD_EVENT_FLAGS) -> [INPUT; 2] {
		let ki = |flags| INPUT {
			r#type: INPUT_KEYBOARD,
			Anonymous: INPUT_0 {
				ki: KEYBDINPUT {
					wVk: vk,
					wScan: scan,
					dwFlags: flags,
					time: 0,
					dwExtraInfo: 0,
				},
			},
		};
		[ki(flags), ki(flags | KEYEVENTF_KEYUP)]
	}

	impl InputInjector for SendInputInjector {
		fn move_to(&self, at: Point) -> Result<()> {
			let (w, h, x0, y0) = unsafe {
				(
					GetSystemMetrics(SM_CXVIRTUALSCREEN),
					GetSystemMetrics(SM_CYVIRTUALSCREEN),
					GetSystemMetrics(SM_XVIRTUALSCREEN),
					GetSystemMetrics(SM_YVIRTUALSCREEN),
				)
			};
			if w <= 1 || h <= 1 {
				bail!("virtual screen size unavailable");
			}
			// Absolute coordinates are normalized to 0..=65535 over the virtual desktop.
			let dx = ((at.x - x0) as i64 * 65535 / (w - 1) as i64) as i32;
			let dy = ((at.y - y0) as i64 * 65535 / (h - 1) as i64) as i32;
			send(&[mouse(dx, dy, MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK | MOUSEEVENTF_MOVE)])
		}

		fn click(&self) -> Result<()> {
			send(&[mouse(0, 0, MOUSEEVENTF_LEFTDOWN), mouse(0, 0, MOUSEEVENTF_LEFTUP)])
		}

		fn press(&self, k: Key) -> Result<()> {
			let vk = match k {
				Key::Enter => VK_RETURN,
				Key::Escape => VK_ESCAPE,
				Key::Char(c) => {
					let scan = unsafe { VkKeyScanW(c as u16) };
					if scan == -1 {
						bail!("no key for {c:?} in the current layout");
					}
					VIRTUAL_KEY((scan & 0xff) as u16)
				}
			};
			send(&key(vk, 0, KEYBD_EVENT_FLAGS(0)))
		}

		fn type_text(&self, text: &str) -> Result<()> {
			for unit in text.encode_utf16() {
				send(&key(VIRTUAL_KEY(0), unit, KEYEVENTF_UNICODE))?;
			}
			Ok(())
		}
	}
}

#[cfg(not(windows))]
mod unsupported {
	use anyhow::{Result, bail};
	use automation::{InputInjector, Key, Point};

	#[derive(Default)]
	pub struct UnsupportedInput;

	const REASON: &str = "input injection is only implemented on Windows";

	impl InputInjector for UnsupportedInput {
		fn check(&self) -> Result<()> {
			bail!(REASON)
		}

		fn move_to(&self, _at: Point) -> Result<()> {
			bail!(REASON)
		}

		fn click(&self) -> Result<()> {
			bail!(REASON)
		}

		fn press(&self, _key: Key) -> Result<()> {
			bail!(REASON)
		}

		fn type_text(&self, _text: &str) -> Result<()> {
			bail!(REASON)
		}
	}
}

/// Shared handle to the platform injector.
pub fn system() -> Arc<dyn InputInjector> {
	Arc::new(SystemInput::default())
}
