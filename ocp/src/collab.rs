//! External collaborators the core calls into but never owns the lifecycle of, per spec.md §6
//! ("Observability") and §1's "out of scope: configuration file loading; logging;
//! statistics/alarm publication; watchdog pat/heartbeat hooks". These traits are the narrow
//! interface the core actually uses; a null implementation is explicitly acceptable (§6) and
//! is what `ocp` defaults to when the embedding application doesn't supply its own.

use std::rc::Rc;

/// `registerStat`/`incrementStat`/`decrementStat`/`unregisterStat`, per spec.md §6.
pub trait Stats: Send + Sync {
	fn register_stat(&self, name: &str, extended: bool);
	fn increment_stat(&self, name: &str);
	fn decrement_stat(&self, name: &str);
	fn unregister_stat(&self, name: &str);
}

/// `raiseAlarm`/`clearAlarm`, per spec.md §6. `source` identifies the raising component (e.g.
/// a link's remote address) so the same named alarm can be raised/cleared independently per
/// source.
pub trait Alarm: Send + Sync {
	fn raise_alarm(&self, name: &str, source: &str, params: &[(&str, &str)]);
	fn clear_alarm(&self, name: &str, source: &str);
}

/// `start`/`stop`/`pat`, per spec.md §6. The core pats this every supervisor tick and every
/// RX/TX loop iteration.
pub trait Watchdog: Send + Sync {
	fn start(&self);
	fn stop(&self);
	fn pat(&self);
}

/// The name of the alarm raised while the system cannot take new calls, per spec.md §4.5 step 3.
pub const ALARM_CANNOT_TAKE_CALLS: &str = "ocpCannotTakeCalls";

/// A null implementation of all three collaborators, per spec.md §6's "a null implementation
/// is acceptable" — logs at trace level instead of doing nothing silently, so a misconfigured
/// embedding application can still see the calls happening during development.
#[derive(Default)]
pub struct NullCollaborator;

impl Stats for NullCollaborator {
	fn register_stat(&self, name: &str, extended: bool) {
		log::trace!("registerStat({name}, extended={extended})");
	}

	fn increment_stat(&self, name: &str) {
		log::trace!("incrementStat({name})");
	}

	fn decrement_stat(&self, name: &str) {
		log::trace!("decrementStat({name})");
	}

	fn unregister_stat(&self, name: &str) {
		log::trace!("unregisterStat({name})");
	}
}

impl Alarm for NullCollaborator {
	fn raise_alarm(&self, name: &str, source: &str, params: &[(&str, &str)]) {
		log::trace!("raiseAlarm({name}, source={source}, params={params:?})");
	}

	fn clear_alarm(&self, name: &str, source: &str) {
		log::trace!("clearAlarm({name}, source={source})");
	}
}

impl Watchdog for NullCollaborator {
	fn start(&self) {
		log::trace!("watchdog start()");
	}

	fn stop(&self) {
		log::trace!("watchdog stop()");
	}

	fn pat(&self) {
		log::trace!("watchdog pat()");
	}
}

/// The three collaborators bundled together and shared (via `Rc`, since a `stakker` core runs
/// single-threaded) between the system manager and every link it owns — there is exactly one
/// instance of each per running core, supplied once at construction.
#[derive(Clone)]
pub struct Collaborators {
	pub stats: Rc<dyn Stats>,
	pub alarm: Rc<dyn Alarm>,
	pub watchdog: Rc<dyn Watchdog>,
}

impl Default for Collaborators {
	fn default() -> Self {
		let null = Rc::new(NullCollaborator);
		Self { stats: null.clone(), alarm: null.clone(), watchdog: null }
	}
}
