//! The OCP client runtime: link engine (C3), link state machine (C4), system manager (C5) and
//! task-id registry (C6) built on the wire codec (`wire`, C1) and framer (`ocp::framer`, C2).
//! See spec.md §2 for how the pieces fit together.

pub mod collab;
pub mod config;
mod framer;
pub mod link;
mod registry;
pub mod system;

pub use collab::{Alarm, Collaborators, NullCollaborator, Stats, Watchdog};
pub use config::{Config, ConfigError, LinkChange, LinkConfig, ReloadPlan};
pub use link::state::{GapEnd, Gapping, LinkEvent, Role};
pub use link::Link;
pub use registry::Handler;
pub use system::state::AggregateState;
pub use system::System;
