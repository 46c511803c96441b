//! Aggregate state computation, preferred-link selection, and load-balanced link selection
//! (C5), per spec.md §4.5, §4.5.1, §4.5.2. These are pure functions over a snapshot of each
//! link's cached view — no transport, no actor, no timers — so the truth table and the two
//! selection policies can be exercised directly against spec.md §8's testable properties.

use core::net::Ipv4Addr;

use collections::map::Index;

use crate::link::state::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateState {
	Stopped,
	NoLinks,
	Connecting,
	MissingMaster,
	MasterSlave,
	Loadsharing,
	Inconsistent,
}

/// The per-link facts the system manager needs, mirrored from each link's `LinkState` via the
/// `LinkEvent`s it emits (spec.md §9: "observer chains ... become small typed tagged events").
#[derive(Debug, Clone, Copy)]
pub struct LinkSnapshot {
	pub role: Role,
	pub enabled: bool,
	pub gapping: bool,
	pub suspect: bool,
	pub active_calls: u32,
	pub cluster_id: Option<u8>,
	pub remote_unit_id: Option<u32>,
	pub remote_addr: Ipv4Addr,
	pub preferred: Option<Ipv4Addr>,
	pub secondary: Option<Ipv4Addr>,
}

impl LinkSnapshot {
	/// `active = enabled ∧ ¬gapping`, spec.md §3 invariant (ii).
	pub fn is_active(&self) -> bool {
		self.enabled && !self.gapping
	}
}

/// `slots[i]` is `None` for an index with no configured link.
pub type Slots = [Option<LinkSnapshot>; 2];

/// Recompute the aggregate state from the truth table in spec.md §4.5 step 2.
pub fn compute_aggregate(supervisor_running: bool, slots: &Slots) -> AggregateState {
	if !supervisor_running {
		return AggregateState::Stopped;
	}

	if slots.iter().all(Option::is_none) {
		return AggregateState::NoLinks;
	}

	let participating: Vec<&LinkSnapshot> = slots.iter().flatten().filter(|l| l.role.is_active_candidate()).collect();

	if participating.is_empty() {
		return AggregateState::Connecting;
	}

	if participating.iter().all(|l| l.role == Role::Loadshare) {
		let first_cluster = participating[0].cluster_id;

		return if participating.iter().all(|l| l.cluster_id == first_cluster) {
			AggregateState::Loadsharing
		} else {
			AggregateState::Inconsistent
		};
	}

	if participating.iter().all(|l| l.role == Role::Slave) {
		return AggregateState::MissingMaster;
	}

	let masters = participating.iter().filter(|l| l.role == Role::Master).count();
	let slaves = participating.iter().filter(|l| l.role == Role::Slave).count();

	if masters == 1 && slaves == participating.len() - 1 {
		return AggregateState::MasterSlave;
	}

	// Any remaining combination: multiple masters, load-share mixed with master/slave, etc.
	AggregateState::Inconsistent
}

/// Preferred link selection, per spec.md §4.5.1.
pub fn compute_preferred(state: AggregateState, slots: &Slots) -> Option<usize> {
	match state {
		AggregateState::MasterSlave => slots.iter().position(|l| matches!(l, Some(l) if l.role == Role::Master)),

		AggregateState::Loadsharing => {
			let populated: Vec<usize> = slots.iter().enumerate().filter(|(_, l)| l.is_some()).map(|(i, _)| i).collect();

			if populated.len() == 1 {
				return Some(populated[0]);
			}

			let first = slots[populated[0]].as_ref().unwrap();
			let pair = first.preferred.zip(first.secondary)?;

			let all_agree = populated.iter().all(|&i| {
				let l = slots[i].as_ref().unwrap();
				l.preferred.zip(l.secondary) == Some(pair)
			});

			if !all_agree {
				// Open question in spec.md §9: if the addresses don't match one of ours, or
				// don't all agree, this is "no preference" — never an error.
				return None;
			}

			slots.iter().position(|l| matches!(l, Some(l) if l.remote_addr == pair.0))
		}

		_ => None,
	}
}

/// Link selection for a new call, per spec.md §4.5.2. `tried` excludes links the caller has
/// already attempted this call on.
pub fn select_link(state: AggregateState, slots: &Slots, preferred: Option<usize>, tried: &[Index<2>]) -> Option<Index<2>> {
	let tried_contains = |i: usize| tried.iter().any(|t| t.get() == i);

	let idx = match state {
		AggregateState::MasterSlave => match preferred {
			Some(idx) if !tried_contains(idx) && matches!(&slots[idx], Some(l) if l.is_active()) => Some(idx),
			// Confirmed intentional (spec.md §9): no fallthrough to a slave if the master fails.
			_ => None,
		},

		AggregateState::Loadsharing => {
			if let Some(idx) = preferred {
				if !tried_contains(idx) && matches!(&slots[idx], Some(l) if l.is_active()) {
					return Some(Index::new(idx));
				}
			}

			let mut candidates: Vec<(usize, &LinkSnapshot)> = slots
				.iter()
				.enumerate()
				.filter(|(i, l)| !tried_contains(*i) && matches!(l, Some(l) if l.is_active()))
				.map(|(i, l)| (i, l.as_ref().unwrap()))
				.collect();

			// Open question in spec.md §9: the source sorts the BUSIER non-suspect link first
			// (sticky fill), which looks inverted from least-loaded balancing. Preserved as
			// specified rather than "corrected".
			candidates.sort_by(|(_, a), (_, b)| a.suspect.cmp(&b.suspect).then(b.active_calls.cmp(&a.active_calls)));

			candidates.first().map(|(i, _)| *i)
		}

		_ => None,
	};

	idx.map(Index::new)
}

/// The slave to promote after `MISSING_MASTER` persists past the swap timeout, per spec.md
/// §4.5 step 5: "the SLAVE link with the highest remote unit id".
pub fn promotion_candidate(slots: &Slots) -> Option<Index<2>> {
	slots
		.iter()
		.enumerate()
		.filter(|(_, l)| matches!(l, Some(l) if l.role == Role::Slave))
		.max_by_key(|(_, l)| l.as_ref().unwrap().remote_unit_id)
		.map(|(i, _)| Index::new(i))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn link(role: Role, enabled: bool, cluster_id: Option<u8>) -> LinkSnapshot {
		LinkSnapshot {
			role,
			enabled,
			gapping: false,
			suspect: false,
			active_calls: 0,
			cluster_id,
			remote_unit_id: None,
			remote_addr: Ipv4Addr::UNSPECIFIED,
			preferred: None,
			secondary: None,
		}
	}

	#[test]
	fn no_supervisor_is_stopped_no_links_is_empty_config() {
		assert_eq!(compute_aggregate(false, &[None, None]), AggregateState::Stopped);
		assert_eq!(compute_aggregate(true, &[None, None]), AggregateState::NoLinks);
	}

	#[test]
	fn all_connecting_or_disconnected_is_connecting() {
		let slots = [Some(link(Role::Connecting, false, None)), Some(link(Role::Disconnected, false, None))];
		assert_eq!(compute_aggregate(true, &slots), AggregateState::Connecting);
	}

	#[test]
	fn one_master_rest_slave_is_master_slave() {
		let slots = [Some(link(Role::Master, true, Some(0xFF))), Some(link(Role::Slave, true, Some(0xFF)))];
		assert_eq!(compute_aggregate(true, &slots), AggregateState::MasterSlave);
	}

	#[test]
	fn all_slave_is_missing_master() {
		let slots = [Some(link(Role::Slave, true, Some(0xFF))), Some(link(Role::Slave, true, Some(0xFF)))];
		assert_eq!(compute_aggregate(true, &slots), AggregateState::MissingMaster);
	}

	#[test]
	fn all_loadshare_same_cluster_is_loadsharing() {
		let slots = [Some(link(Role::Loadshare, true, Some(5))), Some(link(Role::Loadshare, true, Some(5)))];
		assert_eq!(compute_aggregate(true, &slots), AggregateState::Loadsharing);
	}

	#[test]
	fn loadshare_links_with_differing_cluster_ids_is_inconsistent() {
		let slots = [Some(link(Role::Loadshare, true, Some(5))), Some(link(Role::Loadshare, true, Some(6)))];
		assert_eq!(compute_aggregate(true, &slots), AggregateState::Inconsistent);
	}

	#[test]
	fn mixing_loadshare_with_master_is_inconsistent() {
		let slots = [Some(link(Role::Master, true, Some(0xFF))), Some(link(Role::Loadshare, true, Some(5)))];
		assert_eq!(compute_aggregate(true, &slots), AggregateState::Inconsistent);
	}

	#[test]
	fn two_masters_is_inconsistent() {
		let slots = [Some(link(Role::Master, true, Some(0xFF))), Some(link(Role::Master, true, Some(0xFF)))];
		assert_eq!(compute_aggregate(true, &slots), AggregateState::Inconsistent);
	}

	#[test]
	fn never_both_master_slave_and_inconsistent() {
		// Exhaustive over every role combination for 2 slots, checked against the truth table in
		// spec.md §4.5 step 2 directly, so this fails if MASTER_SLAVE and INCONSISTENT ever
		// overlapped instead of just restating "the function returns one value".
		let roles = [Role::Master, Role::Slave, Role::Loadshare, Role::Connecting, Role::Disconnected];

		fn participates(r: Role) -> bool {
			!matches!(r, Role::Connecting | Role::Disconnected)
		}

		fn expected(a: Role, b: Role) -> AggregateState {
			let participants: Vec<Role> = [a, b].into_iter().filter(|r| participates(*r)).collect();

			if participants.is_empty() {
				return AggregateState::Connecting;
			}
			if participants.iter().all(|r| *r == Role::Loadshare) {
				return AggregateState::Loadsharing;
			}
			if participants.iter().all(|r| *r == Role::Slave) {
				return AggregateState::MissingMaster;
			}

			let masters = participants.iter().filter(|r| *r == Role::Master).count();
			let slaves = participants.iter().filter(|r| *r == Role::Slave).count();

			if masters == 1 && slaves == participants.len() - 1 {
				return AggregateState::MasterSlave;
			}

			AggregateState::Inconsistent
		}

		for &a in &roles {
			for &b in &roles {
				let slots = [Some(link(a, true, Some(0xFF))), Some(link(b, true, Some(0xFF)))];
				assert_eq!(compute_aggregate(true, &slots), expected(a, b), "a={a:?} b={b:?}");
			}
		}
	}

	#[test]
	fn preferred_is_master_in_master_slave() {
		let slots = [Some(link(Role::Slave, true, Some(0xFF))), Some(link(Role::Master, true, Some(0xFF)))];
		assert_eq!(compute_preferred(AggregateState::MasterSlave, &slots), Some(1));
	}

	#[test]
	fn get_link_in_master_slave_never_falls_through_to_slave() {
		let mut master = link(Role::Master, false, Some(0xFF)); // inactive master
		master.enabled = false;
		let slots = [Some(master), Some(link(Role::Slave, true, Some(0xFF)))];

		let preferred = compute_preferred(AggregateState::MasterSlave, &slots);
		assert_eq!(preferred, Some(0));
		assert_eq!(select_link(AggregateState::MasterSlave, &slots, preferred, &[]), None);
	}

	#[test]
	fn get_link_never_returns_a_tried_or_inactive_link() {
		let slots = [Some(link(Role::Loadshare, true, Some(5))), Some(link(Role::Loadshare, true, Some(5)))];

		let tried = [Index::<2>::new(0)];
		let picked = select_link(AggregateState::Loadsharing, &slots, None, &tried);
		assert_eq!(picked, Some(Index::new(1)));

		let tried_both = [Index::<2>::new(0), Index::<2>::new(1)];
		assert_eq!(select_link(AggregateState::Loadsharing, &slots, None, &tried_both), None);
	}

	#[test]
	fn loadshare_prefers_non_suspect_then_busier() {
		let mut a = link(Role::Loadshare, true, Some(5));
		a.active_calls = 2;
		let mut b = link(Role::Loadshare, true, Some(5));
		b.active_calls = 10;
		b.suspect = true;

		let slots = [Some(a), Some(b)];
		// b is suspect, so a wins even though b is busier.
		assert_eq!(select_link(AggregateState::Loadsharing, &slots, None, &[]), Some(Index::new(0)));

		let mut c = link(Role::Loadshare, true, Some(5));
		c.active_calls = 2;
		let mut d = link(Role::Loadshare, true, Some(5));
		d.active_calls = 10;

		let slots = [Some(c), Some(d)];
		// Neither suspect: the busier link wins (sticky fill, spec.md §9 open question).
		assert_eq!(select_link(AggregateState::Loadsharing, &slots, None, &[]), Some(Index::new(1)));
	}

	#[test]
	fn preferred_unit_agreement_picks_the_matching_link() {
		let a_addr = Ipv4Addr::new(10, 0, 0, 1);
		let b_addr = Ipv4Addr::new(10, 0, 0, 2);

		let mut a = link(Role::Loadshare, true, Some(5));
		a.remote_addr = a_addr;
		a.preferred = Some(a_addr);
		a.secondary = Some(b_addr);

		let mut b = link(Role::Loadshare, true, Some(5));
		b.remote_addr = b_addr;
		b.preferred = Some(a_addr);
		b.secondary = Some(b_addr);

		let slots = [Some(a), Some(b)];
		let preferred = compute_preferred(AggregateState::Loadsharing, &slots);
		assert_eq!(preferred, Some(0));

		let tried = [Index::<2>::new(0)];
		assert_eq!(select_link(AggregateState::Loadsharing, &slots, preferred, &tried), Some(Index::new(1)));
	}

	#[test]
	fn preferred_unit_matching_no_local_address_is_no_preference() {
		let elsewhere = Ipv4Addr::new(192, 168, 1, 1);
		let mut a = link(Role::Loadshare, true, Some(5));
		a.remote_addr = Ipv4Addr::new(10, 0, 0, 1);
		a.preferred = Some(elsewhere);
		a.secondary = Some(elsewhere);

		let mut b = a;
		b.remote_addr = Ipv4Addr::new(10, 0, 0, 2);

		let slots = [Some(a), Some(b)];
		assert_eq!(compute_preferred(AggregateState::Loadsharing, &slots), None);
	}

	#[test]
	fn promotes_highest_unit_id_slave() {
		let mut a = link(Role::Slave, true, Some(0xFF));
		a.remote_unit_id = Some(3);
		let mut b = link(Role::Slave, true, Some(0xFF));
		b.remote_unit_id = Some(5);

		let slots = [Some(a), Some(b)];
		assert_eq!(promotion_candidate(&slots), Some(Index::new(1)));
	}
}
