//! Cached peer-view + link state machine (C4), per spec.md §3, §4.4.

use core::net::Ipv4Addr;
use std::time::{Duration, Instant};

use wire::codes;
use wire::message::{Abort, CallGap, PreferredUnit, StatusRequest, StatusResponse, Unsupported};
use wire::{Body, Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
	Master,
	Slave,
	Loadshare,
	Connecting,
	Disconnected,
}

impl Role {
	pub fn is_active_candidate(self) -> bool {
		!matches!(self, Role::Connecting | Role::Disconnected)
	}
}

/// The peer-initiated gapping window (spec.md §3/§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Gapping {
	pub active: bool,
	pub end: GapEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GapEnd {
	#[default]
	None,
	At(u64),
	Indefinite,
}

impl Gapping {
	fn disabled() -> Self {
		Self { active: false, end: GapEnd::None }
	}

	fn indefinite() -> Self {
		Self { active: true, end: GapEnd::Indefinite }
	}

	fn until(now: u64, seconds: u32) -> Self {
		Self { active: true, end: GapEnd::At(now + seconds as u64) }
	}

	/// Expire the window if its end time has passed, per spec.md §4.5 step 1. `now` is a
	/// monotonic second counter (`stakker`'s `cx.now()` reduced to seconds by the caller).
	pub fn expire(&mut self, now: u64) {
		if let GapEnd::At(end) = self.end {
			if now > end {
				*self = Self::disabled();
			}
		}
	}
}

/// Events emitted by the state machine for the system manager (and any other observer) to react
/// to, per spec.md §9's "observer chains ... become small typed tagged events".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkEvent {
	RoleChanged(Role),
	EnabledChanged(bool),
	GapChanged(Gapping),
	PreferredUnit { preferred: Ipv4Addr, secondary: Ipv4Addr },
	/// The task-id registry's size changed (spec.md §3: "in-progress call count = size of the
	/// task-id map"). Emitted so the system manager's load-sharing selection (§4.5.2) can see
	/// each link's call count without reaching into its registry directly.
	ActiveCalls(u32),
	/// This link's suspect flag changed, per spec.md §4.5 step 1.
	Suspect(bool),
	/// The remote unit/cluster id changed — folded into `StatusRequest` handling but split out
	/// as its own event so observers don't have to special-case `RoleChanged`'s payload.
	RemoteId { unit_id: u32, cluster_id: u8 },
}

/// The cached view of one link's peer-reported state, plus local health bookkeeping.
pub struct LinkState {
	pub role: Role,
	pub enabled: bool,
	pub gapping: Gapping,
	pub preferred: Option<Ipv4Addr>,
	pub secondary: Option<Ipv4Addr>,
	pub remote_unit_id: Option<u32>,
	pub cluster_id: Option<u8>,
	pub suspect: bool,
	pub last_activity: Instant,
}

impl LinkState {
	pub fn new(now: Instant) -> Self {
		Self {
			role: Role::Disconnected,
			enabled: false,
			gapping: Gapping::disabled(),
			preferred: None,
			secondary: None,
			remote_unit_id: None,
			cluster_id: None,
			suspect: false,
			last_activity: now,
		}
	}

	/// `active = enabled ∧ ¬gapping`, spec.md §3 invariant (ii).
	pub fn is_active(&self) -> bool {
		self.enabled && !self.gapping.active
	}

	/// Reset to the `DISCONNECTED` view, preserving invariant (i): not-enabled, not-active.
	pub fn reset(&mut self, now: Instant) {
		*self = Self::new(now);
	}

	/// Called on every transition into `CONNECTING`/`DISCONNECTED`, per spec.md §8's testable
	/// property ("the cached `unitEnabled` flag is false").
	pub fn enter_connecting(&mut self, now: Instant) {
		self.role = Role::Connecting;
		self.enabled = false;
		self.last_activity = now;
	}

	/// Per-link per-second housekeeping: expire the gapping window and recompute the suspect
	/// flag. Spec.md §4.5 step 1 places this in the system manager's supervisor tick; here it
	/// runs per-link instead (see DESIGN.md) so the system manager never has to reach into a
	/// link's private timers, only observe the resulting events.
	pub fn tick(&mut self, now: Instant, now_secs: u64, suspect_timeout: Duration) -> Vec<LinkEvent> {
		let mut events = Vec::new();

		let before = self.gapping;
		self.gapping.expire(now_secs);

		if self.gapping != before {
			events.push(LinkEvent::GapChanged(self.gapping));
		}

		let suspect = now.duration_since(self.last_activity) > suspect_timeout;

		if suspect != self.suspect {
			self.suspect = suspect;
			events.push(LinkEvent::Suspect(suspect));
		}

		events
	}
}

/// Handle a decoded link-class message, updating `state` and appending any observer events to
/// `events`. Returns a reply to enqueue, if any, per spec.md §4.4.
pub fn handle_link_message(state: &mut LinkState, now_secs: u64, unit_name: &str, active_calls: u32, body: &Body, events: &mut Vec<LinkEvent>) -> Option<Message> {
	match body {
		Body::Heartbeat => None,

		Body::StatusRequest(sr) => Some(handle_status_request(state, sr, unit_name, active_calls, events)),

		Body::LinkCommandUnsupported(_) => {
			log::debug!("peer reported LinkCommandUnsupported");
			None
		}

		Body::CallGap(gap) => {
			handle_call_gap(state, now_secs, *gap, events);
			None
		}

		Body::PreferredUnit(pu) => {
			handle_preferred_unit(state, pu, events);
			None
		}

		// Client-originated messages the peer would not normally send to us; accepted but inert.
		Body::AreYouMaster | Body::AreYouMasterReply(_) | Body::BecomeMaster | Body::ChangeActiveLink(_) | Body::ChangeActiveLinkAck => {
			log::debug!("received {:?}, no client-side handling defined", body);
			None
		}

		_ => unreachable!("handle_link_message called with a non-link Body"),
	}
}

fn handle_status_request(state: &mut LinkState, sr: &StatusRequest, unit_name: &str, active_calls: u32, events: &mut Vec<LinkEvent>) -> Message {
	let new_role = if sr.is_master_slave() {
		if sr.is_master() {
			Role::Master
		} else {
			Role::Slave
		}
	} else {
		Role::Loadshare
	};

	if new_role != state.role {
		state.role = new_role;
		events.push(LinkEvent::RoleChanged(new_role));
	}

	if state.remote_unit_id != Some(sr.unit_id) || state.cluster_id != Some(sr.cluster_id) {
		events.push(LinkEvent::RemoteId { unit_id: sr.unit_id, cluster_id: sr.cluster_id });
	}

	state.remote_unit_id = Some(sr.unit_id);
	state.cluster_id = Some(sr.cluster_id);

	let new_enabled = sr.enabled();

	if new_enabled != state.enabled {
		state.enabled = new_enabled;
		events.push(LinkEvent::EnabledChanged(new_enabled));
	}

	Message::link(Body::StatusResponse(StatusResponse { active_calls, unit_name: unit_name.to_string() }))
}

fn handle_call_gap(state: &mut LinkState, now_secs: u64, gap: CallGap, events: &mut Vec<LinkEvent>) {
	match gap {
		CallGap::Disable => state.gapping = Gapping::disabled(),
		CallGap::Indefinite => state.gapping = Gapping::indefinite(),
		// Open question in spec.md §9: DURATION_NETWORK_SPECIFIC is silently ignored.
		CallGap::NetworkSpecific => return,
		CallGap::Seconds(secs) => state.gapping = Gapping::until(now_secs, secs),
	}

	events.push(LinkEvent::GapChanged(state.gapping));
}

fn handle_preferred_unit(state: &mut LinkState, pu: &PreferredUnit, events: &mut Vec<LinkEvent>) {
	state.preferred = Some(pu.preferred);
	state.secondary = Some(pu.secondary);
	events.push(LinkEvent::PreferredUnit { preferred: pu.preferred, secondary: pu.secondary });
}

/// Synthesise the `Abort(TASK_NOT_RUNNING)` reply spec.md §4.4/§7 calls for when a call-class
/// message's destination task id has no registered handler. Returns `None` if `body` is itself
/// an `Abort` (spec.md: "unless the incoming message is itself an `Abort` (no loops)").
pub fn task_not_found_reply(dst_task: u32, src_task: u32, body: &Body) -> Option<Message> {
	if matches!(body, Body::Abort(_)) {
		return None;
	}

	Some(Message::call(src_task, dst_task, Body::Abort(Abort { reason: codes::TASK_NOT_RUNNING })))
}

#[allow(dead_code)]
fn unsupported(nested_cmd: u16, reason: wire::Reason) -> Unsupported {
	Unsupported { nested_cmd, reason, value: 0 }
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Instant;

	#[test]
	fn status_request_from_master_slave_peer_sets_role_and_replies() {
		let mut state = LinkState::new(Instant::now());
		let mut events = Vec::new();

		let sr = StatusRequest { unit_id: 7, cluster_id: codes::CLUSTER_MASTER_SLAVE, flags: codes::FLAG_MASTER | codes::FLAG_UNIT_ENABLED };
		let reply = handle_link_message(&mut state, 0, "scp-a", 0, &Body::StatusRequest(sr), &mut events);

		assert_eq!(state.role, Role::Master);
		assert!(state.enabled);
		assert!(matches!(reply, Some(Message { body: Body::StatusResponse(_), .. })));
		assert!(events.iter().any(|e| matches!(e, LinkEvent::RoleChanged(Role::Master))));
		assert!(events.iter().any(|e| matches!(e, LinkEvent::EnabledChanged(true))));
	}

	#[test]
	fn status_request_from_loadshare_peer() {
		let mut state = LinkState::new(Instant::now());
		let mut events = Vec::new();

		let sr = StatusRequest { unit_id: 3, cluster_id: 5, flags: codes::FLAG_UNIT_ENABLED };
		handle_link_message(&mut state, 0, "scp-a", 0, &Body::StatusRequest(sr), &mut events);

		assert_eq!(state.role, Role::Loadshare);
	}

	#[test]
	fn call_gap_sentinels() {
		let mut state = LinkState::new(Instant::now());
		let mut events = Vec::new();

		handle_link_message(&mut state, 100, "u", 0, &Body::CallGap(CallGap::Seconds(30)), &mut events);
		assert!(state.gapping.active);
		assert_eq!(state.gapping.end, GapEnd::At(130));

		events.clear();
		handle_link_message(&mut state, 100, "u", 0, &Body::CallGap(CallGap::Indefinite), &mut events);
		assert_eq!(state.gapping.end, GapEnd::Indefinite);

		events.clear();
		handle_link_message(&mut state, 100, "u", 0, &Body::CallGap(CallGap::NetworkSpecific), &mut events);
		// Ignored: gapping state from the previous message is untouched, no event raised.
		assert_eq!(state.gapping.end, GapEnd::Indefinite);
		assert!(events.is_empty());

		events.clear();
		handle_link_message(&mut state, 100, "u", 0, &Body::CallGap(CallGap::Disable), &mut events);
		assert!(!state.gapping.active);
	}

	#[test]
	fn tick_expires_gapping_and_flags_suspect() {
		let mut state = LinkState::new(Instant::now());
		state.gapping = Gapping::until(0, 10);

		let events = state.tick(Instant::now(), 5, Duration::from_secs(3));
		assert!(events.is_empty(), "gap has not expired yet and link is still within suspect window");

		let events = state.tick(Instant::now(), 11, Duration::from_secs(3));
		assert!(events.contains(&LinkEvent::GapChanged(Gapping::disabled())));

		std::thread::sleep(Duration::from_millis(5));
		let events = state.tick(Instant::now(), 12, Duration::from_millis(1));
		assert!(events.contains(&LinkEvent::Suspect(true)));
		assert!(state.suspect);
	}

	#[test]
	fn task_not_found_reply_swaps_task_ids_unless_abort() {
		let reply = task_not_found_reply(42, 7, &Body::DeliverTo(wire::message::DeliverTo { flags: 0 })).unwrap();
		assert_eq!(reply.dst_task, 7);
		assert_eq!(reply.src_task, 42);
		assert!(matches!(reply.body, Body::Abort(Abort { reason }) if reason == codes::TASK_NOT_RUNNING));

		assert!(task_not_found_reply(42, 7, &Body::Abort(Abort { reason: 0 })).is_none());
	}
}
