//! Rule model for focusguard
//!
//! This crate defines the immutable value types the policy core works on:
//! - Block rules and their temporal windows (one-time, daily, weekly)
//! - Bypass grants
//! - Countdown timers
//! - Decision verdicts
//!
//! Every type is validated at construction, including when deserialized, so
//! an invalid instance can never be observed.

mod bypass;
mod decision;
mod error;
mod rule;
mod timer;
mod window;

pub use bypass::*;
pub use decision::*;
pub use error::*;
pub use rule::*;
pub use timer::*;
pub use window::*;
