//! Per-link connection engine (C3): owns one TCP connection, drives the framer (C2) and wire
//! codec (C1), paces heartbeats, and runs the link state machine (C4) and task-id registry
//! (C6) for this link. See spec.md §4.3, §4.4, §4.6.

pub mod connect;
pub mod state;

use std::collections::VecDeque;
use std::net::TcpStream;
use std::time::{Duration, Instant};

use collections::bytes::Slice;
use collections::map::Index;
use log::{debug, error, warn};
use runtime::Io;
use stakker::{fwd_to, Actor, Fwd, FixedTimerKey, CX};
use wire::{Body, Class, Message};

use self::connect::ConnectAttempt;
use self::state::{handle_link_message, task_not_found_reply, LinkEvent, LinkState, Role};
use crate::collab::Collaborators;
use crate::config::LinkConfig;
use crate::framer::Framer;
use crate::registry::{Handler, TaskRegistry};

/// Bound on the transmit queue, per spec.md §4.3 ("Transmit queue is bounded (100 entries)").
const QUEUE_CAP: usize = 100;
/// How often the off-thread `ConnectAttempt` is polled for completion.
const CONNECT_POLL: Duration = Duration::from_millis(100);
/// Base back-off between `RESET` and the next `UNCONNECTED` dial, per spec.md §4.3 ("failure
/// increments the fail counter and returns to RESET after a small back-off").
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);
/// Cap on the back-off growth so a persistently unreachable peer doesn't push the retry
/// interval out indefinitely.
const MAX_BACKOFF_STEPS: u32 = 10;

/// Returned by [`Link::queue_message`] when the bounded transmit queue is full, per spec.md
/// §4.3/§5 ("Enqueue blocks when full, providing end-to-end back-pressure to upstream callers").
/// The actor model has no caller thread to block, so back-pressure is an `Err` the caller acts
/// on instead of the message being silently dropped.
#[derive(Debug, thiserror::Error)]
#[error("link {idx} transmit queue is full")]
pub struct QueueFull {
	pub idx: usize,
}

/// The socket lifecycle, per spec.md §4.3: "RESET -> UNCONNECTED -> CONNECTING -> CONNECTED ->
/// (framing loop)".
enum Phase {
	Reset,
	Unconnected,
	Connecting(ConnectAttempt),
	Connected,
}

/// One TCP connection to one SCP, plus its live state. A `stakker` actor owned by
/// [`crate::system::System`] via `ActorOwn<Link>`.
pub struct Link {
	idx: Index<2>,
	config: LinkConfig,
	suspect_timeout: Duration,
	unit_name: String,
	collab: Collaborators,
	/// Where role/enabled/gap/preferred/active-call events are forwarded, per spec.md §9
	/// ("observer chains ... become small typed tagged events").
	owner: Fwd<(Index<2>, LinkEvent)>,
	phase: Phase,
	io: Option<Io<TcpStream>>,
	framer: Framer,
	state: LinkState,
	registry: TaskRegistry,
	tx_queue: VecDeque<Message>,
	fail_count: u32,
	epoch: Instant,
	fixed_hb: FixedTimerKey,
	idle_hb: FixedTimerKey,
	inbound_timeout: FixedTimerKey,
	reconnect: FixedTimerKey,
}

impl Link {
	#[allow(clippy::too_many_arguments)]
	pub fn init(
		cx: CX![],
		idx: Index<2>,
		config: LinkConfig,
		suspect_timeout: Duration,
		unit_name: String,
		collab: Collaborators,
		owner: Fwd<(Index<2>, LinkEvent)>,
	) -> Option<Self> {
		let now = Instant::now();

		let mut this = Self {
			idx,
			config,
			suspect_timeout,
			unit_name,
			collab,
			owner,
			phase: Phase::Reset,
			io: None,
			framer: Framer::new(),
			state: LinkState::new(now),
			registry: TaskRegistry::default(),
			tx_queue: VecDeque::new(),
			fail_count: 0,
			epoch: now,
			fixed_hb: FixedTimerKey::default(),
			idle_hb: FixedTimerKey::default(),
			inbound_timeout: FixedTimerKey::default(),
			reconnect: FixedTimerKey::default(),
		};

		this.do_reset(cx);

		Some(this)
	}

	/// Non-significant config update (heartbeat/timeout tuning, unit name, suspect timeout),
	/// applied in place per spec.md §6's reload semantics — no reconnect, new values are picked
	/// up the next time a timer reschedules itself.
	pub fn reconfigure(&mut self, _: CX![], config: LinkConfig, suspect_timeout: Duration, unit_name: String) {
		self.config = config;
		self.suspect_timeout = suspect_timeout;
		self.unit_name = unit_name;
	}

	fn now_secs(&self, cx: CX![]) -> u64 {
		cx.now().duration_since(self.epoch).as_secs()
	}

	fn cancel_timers(&mut self, cx: CX![]) {
		cx.timer_del(self.fixed_hb);
		cx.timer_del(self.idle_hb);
		cx.timer_del(self.inbound_timeout);
		cx.timer_del(self.reconnect);
		self.fixed_hb = FixedTimerKey::default();
		self.idle_hb = FixedTimerKey::default();
		self.inbound_timeout = FixedTimerKey::default();
		self.reconnect = FixedTimerKey::default();
	}

	/// `RESET`, per spec.md §4.3: "closes any existing socket, clears the framer slab, resets
	/// all cached peer state to defaults and notifies listeners that the link has become
	/// DISCONNECTED / not-enabled."
	fn do_reset(&mut self, cx: CX![]) {
		self.io = None;
		self.framer.reset();
		// Invariant (iv): disconnect doesn't implicitly deregister, but a reconnect must not
		// resurrect stale task-id entries.
		self.registry.clear();
		self.state.reset(Instant::now());
		// Spec.md §4.3: "On disconnect the queue is discarded — messages are not replayed."
		self.tx_queue.clear();
		self.cancel_timers(cx);
		self.phase = Phase::Reset;

		self.emit(LinkEvent::RoleChanged(Role::Disconnected));
		self.emit(LinkEvent::EnabledChanged(false));
		self.emit(LinkEvent::ActiveCalls(0));

		let steps = self.fail_count.min(MAX_BACKOFF_STEPS).max(1);
		let backoff = RECONNECT_BACKOFF * steps;

		let actor = cx.access_actor().clone();
		self.reconnect = cx.after(backoff, move |s| actor.apply(s, |this, cx| this.do_unconnected(cx)));
	}

	/// `UNCONNECTED`: opens a new TCP socket, binds the configured local endpoint and initiates
	/// a non-blocking connect (spec.md §4.3). The dial itself runs off-thread (see
	/// [`connect::ConnectAttempt`]) since `runtime::Io` has no "connect in progress" readiness
	/// mode.
	fn do_unconnected(&mut self, cx: CX![]) {
		self.phase = Phase::Unconnected;

		let attempt = ConnectAttempt::start(self.config.remote_addr.clone(), self.config.remote_port, self.config.local_addr.clone(), self.config.local_port, self.config.timeout);

		self.phase = Phase::Connecting(attempt);
		self.schedule_poll_connect(cx);
	}

	fn schedule_poll_connect(&mut self, cx: CX![]) {
		let actor = cx.access_actor().clone();
		self.reconnect = cx.after(CONNECT_POLL, move |s| actor.apply(s, |this, cx| this.poll_connect(cx)));
	}

	fn poll_connect(&mut self, cx: CX![]) {
		let Phase::Connecting(attempt) = &self.phase else { return };

		match attempt.poll() {
			Ok(Some(stream)) => self.do_connected(cx, stream),
			Ok(None) => self.schedule_poll_connect(cx),
			Err(()) => {
				self.fail_count += 1;
				self.collab.stats.increment_stat("ocpLinkConnectFailures");
				self.do_reset(cx);
			}
		}
	}

	/// `CONNECTED`: per spec.md §4.3, "switches the selector to read-ready ... advances the
	/// role to CONNECTING and framer to NO_SYNC."
	fn do_connected(&mut self, cx: CX![], stream: TcpStream) {
		self.fail_count = 0;
		self.framer.reset();
		self.state.enter_connecting(Instant::now());
		self.emit(LinkEvent::RoleChanged(Role::Connecting));
		self.emit(LinkEvent::EnabledChanged(false));

		let read_fwd = fwd_to!([cx], on_read() as (Slice));
		self.io = Some(Io::new(stream, read_fwd));
		self.phase = Phase::Connected;

		self.schedule_fixed_heartbeat(cx);
		self.schedule_idle_heartbeat(cx);
		self.schedule_inbound_timeout(cx);
	}

	fn schedule_fixed_heartbeat(&mut self, cx: CX![]) {
		cx.timer_del(self.fixed_hb);
		let actor = cx.access_actor().clone();
		let interval = self.config.fixed_heartbeat;
		self.fixed_hb = cx.after(interval, move |s| actor.apply(s, |this, cx| this.send_heartbeat(cx, true)));
	}

	fn schedule_idle_heartbeat(&mut self, cx: CX![]) {
		cx.timer_del(self.idle_hb);
		let actor = cx.access_actor().clone();
		let interval = self.config.inactive_heartbeat;
		self.idle_hb = cx.after(interval, move |s| actor.apply(s, |this, cx| this.send_heartbeat(cx, false)));
	}

	fn schedule_inbound_timeout(&mut self, cx: CX![]) {
		cx.timer_del(self.inbound_timeout);
		let actor = cx.access_actor().clone();
		let timeout = self.config.timeout;
		self.inbound_timeout = cx.after(timeout, move |s| actor.apply(s, |this, cx| this.inbound_idle(cx)));
	}

	/// Fires on the fixed-interval timer (`is_fixed = true`, unconditional) or the idle-interval
	/// timer (`is_fixed = false`, reset on every outbound byte) — spec.md §4.3's two heartbeat
	/// timers.
	fn send_heartbeat(&mut self, cx: CX![], is_fixed: bool) {
		if !matches!(self.phase, Phase::Connected) {
			return;
		}

		let _ = self.send_now(cx, Message::link(Body::Heartbeat));

		if is_fixed {
			self.schedule_fixed_heartbeat(cx);
		} else {
			self.schedule_idle_heartbeat(cx);
		}
	}

	/// Inbound idle past `Timeout`: identical handling to an I/O error, per spec.md §7.
	fn inbound_idle(&mut self, cx: CX![]) {
		warn!("link {} inbound idle past {:?}, resetting", self.idx.get(), self.config.timeout);
		self.do_reset(cx);
	}

	/// RX framing loop: one `recv()` worth of bytes, per spec.md §4.3's "framing loop". An
	/// empty read signals EOF.
	fn on_read(&mut self, cx: CX![], buf: Slice) {
		if buf.is_empty() {
			debug!("link {} EOF, resetting", self.idx.get());
			self.do_reset(cx);
			return;
		}

		self.state.last_activity = Instant::now();
		self.collab.watchdog.pat();
		self.schedule_inbound_timeout(cx);

		let mut frames = Vec::new();
		self.framer.feed(&buf, |frame| frames.push(frame.to_vec()));

		for frame in frames {
			self.dispatch(cx, &frame);
		}
	}

	fn dispatch(&mut self, cx: CX![], frame: &[u8]) {
		match wire::decode(frame) {
			Ok(msg) => self.route(cx, msg),
			Err(err) => {
				debug!("link {} decode error: {err}", self.idx.get());

				if let Some(reply) = err.to_reply() {
					let _ = self.send_now(cx, reply);
				}
			}
		}
	}

	fn route(&mut self, cx: CX![], msg: Message) {
		match msg.class() {
			Class::Link => self.route_link(cx, msg),
			Class::Call => self.route_call(cx, msg),
		}
	}

	fn route_link(&mut self, cx: CX![], msg: Message) {
		let now_secs = self.now_secs(cx);
		let active_calls = self.registry.active_calls();
		let mut events = Vec::new();

		let reply = handle_link_message(&mut self.state, now_secs, &self.unit_name, active_calls, &msg.body, &mut events);

		for event in events {
			self.emit(event);
		}

		if let Some(reply) = reply {
			let _ = self.send_now(cx, reply);
		}
	}

	fn route_call(&mut self, cx: CX![], msg: Message) {
		let handler = self.registry.lookup(msg.dst_task).cloned();

		match handler {
			Some(handler) => handler.fwd((msg, cx.access_actor().clone())),
			None => {
				if let Some(reply) = task_not_found_reply(msg.dst_task, msg.src_task, &msg.body) {
					let _ = self.send_now(cx, reply);
				}
			}
		}
	}

	/// Enqueue a message for transmission, per spec.md §6's "Upward handler interface"
	/// (`originatingLink.queueMessage(reply, null)`). Normal (non-priority) FIFO ordering. Returns
	/// `Err(QueueFull)` instead of dropping the message when the queue is at capacity, so the
	/// caller can apply its own back-pressure (spec.md §4.3/§5, §9).
	pub fn queue_message(&mut self, cx: CX![], msg: Message) -> Result<(), QueueFull> {
		if !matches!(self.phase, Phase::Connected) {
			debug!("link {} queue_message while not connected, dropping", self.idx.get());
			return Ok(());
		}

		if self.tx_queue.len() >= QUEUE_CAP {
			warn!("link {} transmit queue full, rejecting message", self.idx.get());
			return Err(QueueFull { idx: self.idx.get() });
		}

		self.tx_queue.push_back(msg);
		self.drain_tx(cx);
		Ok(())
	}

	/// Send ahead of the FIFO queue — used for heartbeats and link-class replies, per spec.md
	/// §4.3: "Priority: when a pending heartbeat is flagged, preempt the queue."
	fn send_now(&mut self, cx: CX![], msg: Message) -> Result<(), QueueFull> {
		if self.tx_queue.len() >= QUEUE_CAP {
			warn!("link {} transmit queue full, dropping priority message", self.idx.get());
			return Err(QueueFull { idx: self.idx.get() });
		}

		self.tx_queue.push_front(msg);
		self.drain_tx(cx);
		Ok(())
	}

	fn drain_tx(&mut self, cx: CX![]) {
		let Some(io) = &self.io else { return };

		let mut wrote = false;

		while let Some(msg) = self.tx_queue.pop_front() {
			let bytes = wire::encode(&msg);

			if io.write(|cur| cur.push(&bytes[..])).is_err() {
				error!("link {} write failed, resetting", self.idx.get());
				self.do_reset(cx);
				return;
			}

			wrote = true;
		}

		// Any outbound byte resets the idle-interval heartbeat, per spec.md §4.3: it only fires
		// "when the link is quiet", not on a fixed cadence regardless of traffic.
		if wrote {
			self.schedule_idle_heartbeat(cx);
		}
	}

	/// Register a call-control handler for `id`, per spec.md §4.6 (overwrites any existing
	/// registration).
	pub fn register(&mut self, _: CX![], id: u32, handler: Handler) {
		self.registry.register(id, handler);
		self.emit(LinkEvent::ActiveCalls(self.registry.active_calls()));
	}

	pub fn deregister(&mut self, _: CX![], id: u32) {
		self.registry.deregister(id);
		self.emit(LinkEvent::ActiveCalls(self.registry.active_calls()));
	}

	/// Per-second housekeeping driven by the system manager's supervisor tick, per spec.md
	/// §4.5 step 1 ("expire gapping ... mark suspect").
	pub fn tick(&mut self, cx: CX![]) {
		self.collab.watchdog.pat();
		let now_secs = self.now_secs(cx);
		let events = self.state.tick(Instant::now(), now_secs, self.suspect_timeout);

		for event in events {
			self.emit(event);
		}
	}

	/// Cooperative teardown, per spec.md §4.3/§5: "sets flags, closes the socket ... joins. No
	/// forced kill."
	pub fn shutdown(&mut self, cx: CX![]) {
		self.cancel_timers(cx);
		self.io = None;
		self.framer.reset();
		self.registry.clear();
		self.tx_queue.clear();
		self.phase = Phase::Reset;
	}

	pub fn is_active(&self) -> bool {
		self.state.is_active()
	}

	fn emit(&mut self, event: LinkEvent) {
		self.owner.fwd((self.idx, event));
	}
}

/// Convenience wrapper for the "Upward handler interface" (spec.md §6): a call-control handler
/// that only holds an `Actor<Link>` handle (as delivered alongside every forwarded message) can
/// reply without reaching for `apply`/`defer` boilerplate itself. Deferred delivery has no caller
/// left to hand a `Result` back to, so a full queue is logged here rather than silently lost.
pub fn send(link: &Actor<Link>, msg: Message) {
	let target = link.clone();
	link.defer(move |s| {
		target.apply(s, move |this, cx| {
			if let Err(err) = this.queue_message(cx, msg) {
				warn!("{err}");
			}
		})
	});
}
