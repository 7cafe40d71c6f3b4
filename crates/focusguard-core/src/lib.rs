//! Policy core for focusguard
//!
//! This crate is the heart of focusguardd, containing:
//! - The decision engine (block or allow a resource, and when to look again)
//! - The enforcement state machine (suppression, cooldown, overlay and kill scheduling)
//! - The scheduling bridge that keeps one wake-up armed at the next rule change
//! - Periodic housekeeping and the policy operations behind the control surface

mod enforcement;
mod engine;
mod events;
mod executor;
mod monitor;
mod scheduler;
mod service;
mod termination;

pub use enforcement::*;
pub use engine::*;
pub use events::*;
pub use executor::*;
pub use monitor::*;
pub use scheduler::*;
pub use service::*;
pub use termination::*;
