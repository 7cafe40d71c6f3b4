//! Host adapter trait interfaces for focusguard
//!
//! This crate defines the capability-based interface between the policy core
//! and platform-specific implementations: foreground events in, overlay,
//! go-home and termination requests out, plus a one-shot wake-up scheduler.
//! It contains no platform code itself.

mod capabilities;
mod mock;
mod traits;

pub use capabilities::*;
pub use mock::*;
pub use traits::*;
