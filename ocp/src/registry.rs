//! Per-link task-id registry (C6), per spec.md §4.6.
//!
//! Call-control messages are delivered upward by forwarding `(Message, Actor<Link>)` to a
//! registered [`Handler`] — the `Actor<Link>` lets the handler reply later via
//! `originatingLink.queueMessage(...)` (spec.md §6, "Upward handler interface") without the
//! registry holding a lock across the callback.

use std::collections::HashMap;
use std::hash::BuildHasherDefault;

use ahash::AHasher;
use stakker::{Actor, Fwd};
use wire::MANAGEMENT_TASK;

use crate::link::Link;

pub type Handler = Fwd<(wire::Message, Actor<Link>)>;

/// The exclusive task id -> handler map for one link, plus the dedicated management slot that
/// bypasses it (spec.md §4.6: "The management task id ... bypasses the map entirely").
#[derive(Default)]
pub struct TaskRegistry {
	map: HashMap<u32, Handler, BuildHasherDefault<AHasher>>,
	management: Option<Handler>,
}

impl TaskRegistry {
	/// Register `handler` for `id`, overwriting any existing registration (spec.md §3: "at most
	/// one handler per id; registering overwrites").
	pub fn register(&mut self, id: u32, handler: Handler) {
		if id == MANAGEMENT_TASK {
			self.management = Some(handler);
		} else {
			self.map.insert(id, handler);
		}
	}

	pub fn deregister(&mut self, id: u32) {
		if id == MANAGEMENT_TASK {
			self.management = None;
		} else {
			self.map.remove(&id);
		}
	}

	pub fn lookup(&self, id: u32) -> Option<&Handler> {
		if id == MANAGEMENT_TASK {
			self.management.as_ref()
		} else {
			self.map.get(&id)
		}
	}

	/// In-progress call count, per spec.md §3 ("in-progress call count = size of task-id map").
	pub fn active_calls(&self) -> u32 {
		self.map.len() as u32
	}

	/// Drop every task-id registration. Called on disconnect per spec.md §4.3's `RESET` handling
	/// — invariant (iv) says disconnect doesn't *implicitly* deregister, but a reconnect must not
	/// resurrect stale entries, so the link clears this explicitly when it re-enters `RESET`.
	pub fn clear(&mut self) {
		self.map.clear();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use stakker::{fwd_nop, Fwd};

	#[test]
	fn register_overwrites_and_deregister_removes() {
		let mut reg = TaskRegistry::default();
		let fwd: Fwd<(wire::Message, Actor<Link>)> = fwd_nop!();

		reg.register(7, fwd.clone());
		assert!(reg.lookup(7).is_some());
		assert_eq!(reg.active_calls(), 1);

		reg.register(7, fwd.clone());
		assert_eq!(reg.active_calls(), 1);

		reg.deregister(7);
		assert!(reg.lookup(7).is_none());
		assert_eq!(reg.active_calls(), 0);
	}

	#[test]
	fn management_slot_bypasses_the_map() {
		let mut reg = TaskRegistry::default();
		let fwd: Fwd<(wire::Message, Actor<Link>)> = fwd_nop!();

		reg.register(MANAGEMENT_TASK, fwd);
		assert!(reg.lookup(MANAGEMENT_TASK).is_some());
		assert_eq!(reg.active_calls(), 0);
	}
}
