//! End-to-end scenarios from spec.md §8, driven through the same pure state-machine functions
//! `ocp::link`/`ocp::system` use internally. These compose link-level message handling with the
//! system-level aggregate/selection logic the way a running link engine and system manager would,
//! without needing a live TCP socket or a `stakker` event loop (scenario 2, the framer resync
//! case, is covered directly in `ocp::framer`'s own unit tests).

use std::net::Ipv4Addr;
use std::time::Instant;

use collections::map::Index;
use ocp::link::state::{handle_link_message, task_not_found_reply, LinkEvent, LinkState, Role};
use ocp::system::state::{compute_aggregate, compute_preferred, promotion_candidate, select_link, AggregateState, LinkSnapshot};
use wire::message::{Abort, CallGap, DeliverTo, PreferredUnit, StatusRequest};
use wire::{codes, Body, DecodeError};

fn snapshot_from(state: &LinkState) -> LinkSnapshot {
	LinkSnapshot {
		role: state.role,
		enabled: state.enabled,
		gapping: state.gapping.active,
		suspect: state.suspect,
		active_calls: 0,
		cluster_id: state.cluster_id,
		remote_unit_id: state.remote_unit_id,
		remote_addr: Ipv4Addr::UNSPECIFIED,
		preferred: state.preferred,
		secondary: state.secondary,
	}
}

/// Scenario 1: clean handshake — a `StatusRequest` from a master-slave-configured, enabled,
/// master peer drives the link to `MASTER`, produces a `StatusResponse`, and the resulting
/// snapshot makes the system's aggregate state `MASTER_SLAVE` with this link preferred.
#[test]
fn clean_handshake_reaches_master_slave_with_this_link_preferred() {
	let mut state = LinkState::new(Instant::now());
	assert_eq!(state.role, Role::Disconnected);
	state.enter_connecting(Instant::now());
	assert_eq!(state.role, Role::Connecting);
	assert!(!state.enabled);

	let mut events = Vec::new();
	let sr = StatusRequest { unit_id: 7, cluster_id: codes::CLUSTER_MASTER_SLAVE, flags: codes::FLAG_MASTER | codes::FLAG_UNIT_ENABLED };
	let reply = handle_link_message(&mut state, 0, "configured-unit-name", 0, &Body::StatusRequest(sr), &mut events).expect("StatusRequest always replies");

	assert_eq!(state.role, Role::Master);
	assert!(state.enabled);
	match reply.body {
		Body::StatusResponse(resp) => {
			assert_eq!(resp.unit_name, "configured-unit-name");
			assert_eq!(resp.active_calls, 0);
		}
		other => panic!("expected StatusResponse, got {other:?}"),
	}
	assert!(events.contains(&LinkEvent::RoleChanged(Role::Master)));

	let slots = [Some(snapshot_from(&state)), None];
	let aggregate = compute_aggregate(true, &slots);
	assert_eq!(aggregate, AggregateState::MasterSlave);
	assert_eq!(compute_preferred(aggregate, &slots), Some(0));
}

/// Scenario 3: a well-framed but unrecognised call-class command yields a `CallCommandUnsupported`
/// with task ids swapped back to the originator.
#[test]
fn unknown_call_command_yields_call_command_unsupported() {
	let mut bytes = vec![0u8; 14];
	bytes[0..2].copy_from_slice(&0x10FFu16.to_be_bytes());
	bytes[2..4].copy_from_slice(&10u16.to_be_bytes());
	bytes[4..8].copy_from_slice(&7u32.to_be_bytes());
	bytes[8..12].copy_from_slice(&9u32.to_be_bytes());
	bytes[12..14].copy_from_slice(&wire::header::TERMINATOR);

	let err = wire::decode(&bytes).unwrap_err();
	assert!(matches!(err, DecodeError::UnsupportedCommand { cmd: 0x10FF, .. }));

	let reply = err.to_reply().expect("call-class errors always synthesise a reply");
	assert_eq!(reply.dst_task, 9);
	assert_eq!(reply.src_task, 7);
	assert!(matches!(reply.body, Body::CallCommandUnsupported(u) if u.nested_cmd == 0x10FF));
}

/// Scenario 4: a `DeliverTo` for an unregistered task id gets an `Abort(TASK_NOT_RUNNING)` back
/// with task ids swapped; an `Abort` itself never gets one (no reply loops).
#[test]
fn task_not_found_synthesises_abort_unless_already_an_abort() {
	let reply = task_not_found_reply(42, 7, &Body::DeliverTo(DeliverTo { flags: 0 })).expect("unknown destination gets an Abort");
	assert_eq!(reply.dst_task, 7);
	assert_eq!(reply.src_task, 42);
	assert!(matches!(reply.body, Body::Abort(Abort { reason }) if reason == codes::TASK_NOT_RUNNING));

	assert!(task_not_found_reply(42, 7, &Body::Abort(Abort { reason: 0 })).is_none(), "an Abort never provokes another Abort");
}

/// Scenario 5: with two links both reporting `SLAVE` (unit ids 3 and 5), the aggregate state is
/// `MISSING_MASTER` and the promotion candidate is the higher-unit-id link — the one the system
/// manager's supervisor tick sends `BecomeMaster` to once the swap timeout elapses.
#[test]
fn missing_master_promotes_the_highest_unit_id_slave() {
	let mut a = LinkState::new(Instant::now());
	let mut events = Vec::new();
	handle_link_message(&mut a, 0, "u", 0, &Body::StatusRequest(StatusRequest { unit_id: 3, cluster_id: codes::CLUSTER_MASTER_SLAVE, flags: codes::FLAG_UNIT_ENABLED }), &mut events);

	let mut b = LinkState::new(Instant::now());
	events.clear();
	handle_link_message(&mut b, 0, "u", 0, &Body::StatusRequest(StatusRequest { unit_id: 5, cluster_id: codes::CLUSTER_MASTER_SLAVE, flags: codes::FLAG_UNIT_ENABLED }), &mut events);

	assert_eq!(a.role, Role::Slave);
	assert_eq!(b.role, Role::Slave);

	let slots = [Some(snapshot_from(&a)), Some(snapshot_from(&b))];
	assert_eq!(compute_aggregate(true, &slots), AggregateState::MissingMaster);
	assert_eq!(promotion_candidate(&slots), Some(Index::<2>::new(1)), "link index 1 (unit id 5) should be promoted");
}

/// Scenario 6: two load-sharing peers both report the same `(preferred=A, secondary=B)` pair.
/// `getLink(∅)` returns the A link; after trying A, the B link is returned even though peer
/// agreement was required to pick A in the first place.
#[test]
fn loadshare_preferred_unit_agreement_then_fallback_after_trying_it() {
	let a_addr = Ipv4Addr::new(10, 0, 0, 1);
	let b_addr = Ipv4Addr::new(10, 0, 0, 2);

	let mut a = LinkState::new(Instant::now());
	let mut events = Vec::new();
	handle_link_message(&mut a, 0, "u", 0, &Body::StatusRequest(StatusRequest { unit_id: 1, cluster_id: 5, flags: codes::FLAG_UNIT_ENABLED }), &mut events);
	handle_link_message(&mut a, 0, "u", 0, &Body::PreferredUnit(PreferredUnit { preferred: a_addr, secondary: b_addr }), &mut events);

	let mut b = LinkState::new(Instant::now());
	events.clear();
	handle_link_message(&mut b, 0, "u", 0, &Body::StatusRequest(StatusRequest { unit_id: 2, cluster_id: 5, flags: codes::FLAG_UNIT_ENABLED }), &mut events);
	handle_link_message(&mut b, 0, "u", 0, &Body::PreferredUnit(PreferredUnit { preferred: a_addr, secondary: b_addr }), &mut events);

	let mut a_snap = snapshot_from(&a);
	a_snap.remote_addr = a_addr;
	let mut b_snap = snapshot_from(&b);
	b_snap.remote_addr = b_addr;

	let slots = [Some(a_snap), Some(b_snap)];
	let aggregate = compute_aggregate(true, &slots);
	assert_eq!(aggregate, AggregateState::Loadsharing);

	let preferred = compute_preferred(aggregate, &slots);
	assert_eq!(preferred, Some(0));
	assert_eq!(select_link(aggregate, &slots, preferred, &[]), Some(Index::<2>::new(0)));

	let tried = [Index::<2>::new(0)];
	assert_eq!(select_link(aggregate, &slots, preferred, &tried), Some(Index::<2>::new(1)));
}

/// Gapping disables/reenables call eligibility independent of the enabled flag, per spec.md §3
/// invariant (ii) (`active = enabled ∧ ¬gapping`).
#[test]
fn gapping_makes_an_enabled_link_inactive() {
	let mut state = LinkState::new(Instant::now());
	let mut events = Vec::new();
	handle_link_message(&mut state, 0, "u", 0, &Body::StatusRequest(StatusRequest { unit_id: 1, cluster_id: 5, flags: codes::FLAG_UNIT_ENABLED }), &mut events);
	assert!(state.is_active());

	events.clear();
	handle_link_message(&mut state, 100, "u", 0, &Body::CallGap(CallGap::Indefinite), &mut events);
	assert!(!state.is_active(), "an indefinite gap must make an otherwise-enabled link inactive");
}
