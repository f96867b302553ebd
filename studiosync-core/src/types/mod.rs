//! Channel and project-state types
//!
//! These records mirror the wire contract of the channels and sources APIs
//! and hold the per-session mutable state of the currently open project.

mod channel;
mod context;
mod sources;
mod state;

pub use channel::*;
pub use context::*;
pub use sources::*;
pub use state::*;
