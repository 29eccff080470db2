//! Screen automation core for the Bazaar tools.
//!
//! Everything here talks to the game client through the [`ScreenProbe`] and
//! [`InputInjector`] capabilities, so the phases can be driven by the real
//! capture/input backends in `bazaarbuddy` or by fakes in tests.

mod error;
pub use error::Error;
mod geometry;
pub use geometry::*;
mod capability;
pub use capability::*;
mod signal;
pub use signal::*;
pub mod settings;
pub mod queue;
pub mod variant;
pub mod names;
pub mod service;
pub mod fastsell;
pub mod buy;
pub mod collect;
pub mod orange;
pub mod fullauto;

#[cfg(test)]
pub(crate) mod testing;
