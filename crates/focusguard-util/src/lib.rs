//! Shared utilities for focusguard
//!
//! This crate provides:
//! - ID types (RuleId, BypassId, TimerId, ResourceId)
//! - Time utilities (epoch-millisecond day math, clock, formatting)
//! - Error types
//! - Per-key cooldown tracking
//! - Default paths for config and data directories

mod error;
mod ids;
mod paths;
mod rate_limit;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use rate_limit::*;
pub use time::*;
