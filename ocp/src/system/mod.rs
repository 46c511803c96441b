//! Aggregate system manager (C5): composes up to two link engines into one client-facing view,
//! runs the 1 s supervisor tick, and exposes link selection/registration/reload to the
//! embedding application. See spec.md §4.5, §4.6, §6.

pub mod state;

use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::{Duration, Instant};

use collections::map::Index;
use log::info;
use stakker::{actor, fwd_to, ret_nop, Actor, ActorOwn, CX};
use wire::{Body, Message, MANAGEMENT_TASK};

use self::state::{AggregateState, LinkSnapshot, Slots};
use crate::collab::{Collaborators, ALARM_CANNOT_TAKE_CALLS};
use crate::config::{Config, LinkChange};
use crate::link::state::{LinkEvent, Role};
use crate::link::{self, Link};
use crate::registry::Handler;

/// The supervisor tick's cadence, per spec.md §4.5 step 1 ("once per second").
const TICK: Duration = Duration::from_secs(1);

struct Slot {
	link: ActorOwn<Link>,
	snapshot: LinkSnapshot,
}

/// Owns both link engines (if configured), the cached aggregate view, and the public API
/// surface spec.md §6 names: `connect`/`disconnect` (folded into construction/shutdown in this
/// actor-based rendering — see DESIGN.md), `reloadProperties`, `registerHandler`, `getLink`,
/// and `queueMessage` (the latter lives on `Link` itself, see `link::send`).
pub struct System {
	collab: Collaborators,
	config: Config,
	slots: [Option<Slot>; 2],
	supervisor_running: bool,
	state: AggregateState,
	preferred: Option<Index<2>>,
	missing_master_since: Option<Instant>,
	alarm_raised: bool,
	management: Option<Handler>,
	tick_timer: stakker::FixedTimerKey,
}

impl System {
	pub fn init(cx: CX![], config: Config, collab: Collaborators) -> Option<Self> {
		let mut this = Self {
			collab,
			config: Config { links: Vec::new(), ..config.clone() },
			slots: [None, None],
			supervisor_running: true,
			state: AggregateState::NoLinks,
			preferred: None,
			missing_master_since: None,
			alarm_raised: false,
			management: None,
			tick_timer: stakker::FixedTimerKey::default(),
		};

		this.collab.watchdog.start();
		this.apply_config(cx, config);
		this.schedule_tick(cx);
		this.recompute(cx);

		Some(this)
	}

	fn schedule_tick(&mut self, cx: CX![]) {
		cx.timer_del(self.tick_timer);
		let actor = cx.access_actor().clone();
		self.tick_timer = cx.after(TICK, move |s| actor.apply(s, |this, cx| this.tick(cx)));
	}

	fn spawn_link(&mut self, cx: CX![], idx: usize, link_config: crate::config::LinkConfig) {
		let index = Index::<2>::new(idx);
		let owner = fwd_to!([cx], on_link_event() as (Index<2>, LinkEvent));

		let link = actor!(cx, Link::init(index, link_config.clone(), self.config.suspect_timeout, self.config.unit_name.clone(), self.collab.clone(), owner), ret_nop!());

		let remote_addr = Ipv4Addr::from_str(&link_config.remote_addr).unwrap_or_else(|_| {
			log::warn!("link {idx} remote address {:?} is not a literal IPv4 address, preferred-unit matching against it will never match", link_config.remote_addr);
			Ipv4Addr::UNSPECIFIED
		});

		let snapshot = LinkSnapshot {
			role: Role::Disconnected,
			enabled: false,
			gapping: false,
			suspect: false,
			active_calls: 0,
			cluster_id: None,
			remote_unit_id: None,
			remote_addr,
			preferred: None,
			secondary: None,
		};

		if let Some(handler) = self.management.clone() {
			let actor = link.clone();
			let actor2 = actor.clone();
			actor.defer(move |s| actor2.apply(s, move |this, cx| this.register(cx, MANAGEMENT_TASK, handler)));
		}

		self.slots[idx] = Some(Slot { link, snapshot });
	}

	fn apply_config(&mut self, cx: CX![], config: Config) {
		let plan = config.diff(&self.config);

		// Scalar fields (suspect timeout, unit name) take effect immediately, ahead of the
		// per-link plan, since `spawn_link`/`reconfigure` read them off `self.config`.
		self.config.suspect_timeout = config.suspect_timeout;
		self.config.master_slave_swap_timeout = config.master_slave_swap_timeout;
		self.config.unit_name = config.unit_name.clone();

		for (idx, change) in plan.changes {
			match change {
				LinkChange::Unchanged => {}

				LinkChange::Updated => {
					if let Some(slot) = &self.slots[idx] {
						let link_config = config.links[idx].clone();

						let actor = slot.link.clone();
						let actor2 = actor.clone();
						let suspect_timeout = config.suspect_timeout;
						let unit_name = config.unit_name.clone();
						actor.defer(move |s| actor2.apply(s, move |this, cx| this.reconfigure(cx, link_config, suspect_timeout, unit_name)));
					}
				}

				LinkChange::Recreated => {
					self.slots[idx] = None;
					self.spawn_link(cx, idx, config.links[idx].clone());
				}

				LinkChange::Added => self.spawn_link(cx, idx, config.links[idx].clone()),

				LinkChange::Removed => self.slots[idx] = None,
			}
		}

		self.config = config;
	}

	/// Apply a configuration reload, per spec.md §6. Link-identity changes recreate that link's
	/// engine (dropping its in-flight state); everything else is applied in place.
	pub fn reload(&mut self, cx: CX![], config: Config) {
		self.apply_config(cx, config);
		self.recompute(cx);
	}

	fn slots_snapshot(&self) -> Slots {
		[self.slots[0].as_ref().map(|s| s.snapshot), self.slots[1].as_ref().map(|s| s.snapshot)]
	}

	fn on_link_event(&mut self, cx: CX![], idx: Index<2>, event: LinkEvent) {
		let i = idx.get();

		let Some(slot) = &mut self.slots[i] else { return };

		match event {
			LinkEvent::RoleChanged(role) => slot.snapshot.role = role,
			LinkEvent::EnabledChanged(enabled) => slot.snapshot.enabled = enabled,
			LinkEvent::GapChanged(gap) => slot.snapshot.gapping = gap.active,
			LinkEvent::PreferredUnit { preferred, secondary } => {
				slot.snapshot.preferred = Some(preferred);
				slot.snapshot.secondary = Some(secondary);
			}
			LinkEvent::ActiveCalls(n) => slot.snapshot.active_calls = n,
			LinkEvent::Suspect(s) => slot.snapshot.suspect = s,
			LinkEvent::RemoteId { unit_id, cluster_id } => {
				slot.snapshot.remote_unit_id = Some(unit_id);
				slot.snapshot.cluster_id = Some(cluster_id);
			}
		}

		self.recompute(cx);
	}

	/// Recompute the aggregate state/preferred link and raise or clear the "cannot take calls"
	/// alarm on the transitions spec.md §4.5 step 3 names. Run both after every link event (for
	/// responsiveness) and every supervisor tick (to pick up gap-expiry/suspect/promotion
	/// effects that aren't tied to an event).
	fn recompute(&mut self, _: CX![]) {
		let slots = self.slots_snapshot();
		let new_state = state::compute_aggregate(self.supervisor_running, &slots);

		if new_state != self.state {
			info!("system aggregate state {:?} -> {:?}", self.state, new_state);

			if new_state == AggregateState::MissingMaster && self.state != AggregateState::MissingMaster {
				self.missing_master_since = Some(Instant::now());
			}

			if new_state != AggregateState::MissingMaster {
				self.missing_master_since = None;
			}
		}

		self.state = new_state;
		self.preferred = state::compute_preferred(new_state, &slots).map(Index::new);

		let cannot_take_calls = match new_state {
			AggregateState::Connecting | AggregateState::Inconsistent | AggregateState::MissingMaster => true,
			AggregateState::MasterSlave | AggregateState::Loadsharing => match self.preferred {
				Some(idx) => !matches!(&slots[idx.get()], Some(l) if l.is_active()),
				None => true,
			},
			AggregateState::Stopped | AggregateState::NoLinks => false,
		};

		if cannot_take_calls != self.alarm_raised {
			self.alarm_raised = cannot_take_calls;

			if cannot_take_calls {
				self.collab.alarm.raise_alarm(ALARM_CANNOT_TAKE_CALLS, &self.config.unit_name, &[]);
			} else {
				self.collab.alarm.clear_alarm(ALARM_CANNOT_TAKE_CALLS, &self.config.unit_name);
			}
		}
	}

	/// Supervisor tick, per spec.md §4.5: pats every link's per-second housekeeping, recomputes
	/// the aggregate view, and promotes a slave once `MISSING_MASTER` has persisted past
	/// `master_slave_swap_timeout` (step 5).
	fn tick(&mut self, cx: CX![]) {
		self.collab.watchdog.pat();

		for slot in self.slots.iter().flatten() {
			let actor = slot.link.clone();
			let actor2 = actor.clone();
			actor.defer(move |s| actor2.apply(s, |this, cx| this.tick(cx)));
		}

		self.recompute(cx);

		if self.state == AggregateState::MissingMaster {
			if let Some(since) = self.missing_master_since {
				if since.elapsed() >= self.config.master_slave_swap_timeout {
					let slots = self.slots_snapshot();

					if let Some(idx) = state::promotion_candidate(&slots) {
						if let Some(slot) = &self.slots[idx.get()] {
							info!("promoting link {} to master after missing-master timeout", idx.get());
							link::send(&slot.link, Message::link(Body::BecomeMaster));
						}
					}

					// Avoid re-promoting every tick while waiting for the peer to confirm.
					self.missing_master_since = Some(Instant::now());
				}
			}
		}

		self.schedule_tick(cx);
	}

	/// Install a broadcast management handler in every currently-configured link (and every link
	/// added by a future reload), per spec.md §4.6.
	pub fn register_management(&mut self, _: CX![], handler: Handler) {
		self.management = Some(handler.clone());

		for slot in self.slots.iter().flatten() {
			let actor = slot.link.clone();
			let actor2 = actor.clone();
			let h = handler.clone();
			actor.defer(move |s| actor2.apply(s, move |this, cx| this.register(cx, MANAGEMENT_TASK, h)));
		}
	}

	/// Register a call-control handler on a specific link, per spec.md §4.6.
	pub fn register_handler(&mut self, _: CX![], idx: Index<2>, task_id: u32, handler: Handler) {
		if let Some(slot) = &self.slots[idx.get()] {
			let actor = slot.link.clone();
			let actor2 = actor.clone();
			actor.defer(move |s| actor2.apply(s, move |this, cx| this.register(cx, task_id, handler)));
		}
	}

	/// The public link-selection entry point, per spec.md §4.5.2 ("getLink").
	pub fn get_link(&self, tried: &[Index<2>]) -> Option<Actor<Link>> {
		let slots = self.slots_snapshot();
		let idx = state::select_link(self.state, &slots, self.preferred.map(|i| i.get()), tried)?;
		self.slots[idx.get()].as_ref().map(|s| s.link.clone())
	}

	pub fn state(&self) -> AggregateState {
		self.state
	}

	pub fn preferred(&self) -> Option<Index<2>> {
		self.preferred
	}

	/// Cooperative shutdown, per spec.md §5 ("no forced kill — RX and TX loops exit at their
	/// next checkpoint").
	pub fn shutdown(&mut self, cx: CX![]) {
		self.supervisor_running = false;
		self.collab.watchdog.stop();
		cx.timer_del(self.tick_timer);

		for slot in self.slots.iter_mut() {
			if let Some(slot) = slot.take() {
				let actor = slot.link.clone();
				let actor2 = actor.clone();
				actor.defer(move |s| actor2.apply(s, |this, cx| this.shutdown(cx)));
			}
		}

		self.recompute(cx);
	}
}
