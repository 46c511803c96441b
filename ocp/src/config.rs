//! The external key/value configuration surface, per spec.md §6. Loading the entries
//! themselves (file format, reload triggers) is out of scope; this module only validates
//! and interprets the key/value pairs an external loader hands it.

use core::time::Duration;
use std::collections::HashMap;

/// A single configured link's settings (the `ocpLink<i>` key group).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
	pub fixed_heartbeat: Duration,
	pub inactive_heartbeat: Duration,
	pub remote_addr: String,
	pub remote_port: u16,
	pub timeout: Duration,
	pub local_addr: String,
	pub local_port: u16,
}

impl Default for LinkConfig {
	fn default() -> Self {
		Self {
			fixed_heartbeat: Duration::from_secs(10),
			inactive_heartbeat: Duration::from_secs(1),
			remote_addr: "localhost".into(),
			remote_port: 10012,
			timeout: Duration::from_secs(30),
			local_addr: "localhost".into(),
			local_port: 0,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub master_slave_swap_timeout: Duration,
	pub suspect_timeout: Duration,
	pub unit_name: String,
	pub links: Vec<LinkConfig>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			master_slave_swap_timeout: Duration::from_secs(30),
			suspect_timeout: Duration::from_secs(3),
			unit_name: local_fqdn(),
			links: Vec::new(),
		}
	}
}

fn local_fqdn() -> String {
	hostname::get().ok().and_then(|s| s.into_string().ok()).unwrap_or_else(|| "localhost".into())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("{key} = {value:?} is out of range ({min}..={max})")]
	OutOfRange { key: String, value: i64, min: i64, max: i64 },
	#[error("{key} = {value:?} could not be parsed as {expected}")]
	Unparsable { key: String, value: String, expected: &'static str },
}

fn parse_ranged(entries: &HashMap<String, String>, key: &str, min: i64, max: i64, default: i64) -> Result<i64, ConfigError> {
	let Some(raw) = entries.get(key) else { return Ok(default) };

	let value: i64 = raw.parse().map_err(|_| ConfigError::Unparsable { key: key.into(), value: raw.clone(), expected: "integer" })?;

	if !(min..=max).contains(&value) {
		return Err(ConfigError::OutOfRange { key: key.into(), value, min, max });
	}

	Ok(value)
}

impl Config {
	/// Build and validate a `Config` from an external key/value source, per spec.md §6. Any
	/// out-of-range or unparsable value aborts the whole load, as §7 requires.
	pub fn from_entries(entries: impl Iterator<Item = (String, String)>) -> Result<Self, ConfigError> {
		let entries: HashMap<String, String> = entries.collect();

		let num_links = parse_ranged(&entries, "ocpSystemNumLinks", 0, 2, 0)?;
		let master_slave_swap_timeout = parse_ranged(&entries, "ocpSystemMasterSlaveSwapTimeout", 1, 43200, 30)?;
		let suspect_timeout = parse_ranged(&entries, "ocpSystemSuspectTimeout", 1, 3600, 3)?;

		let unit_name = match entries.get("ocpSystemUnitName") {
			Some(name) => name.chars().take(31).collect(),
			None => local_fqdn(),
		};

		let mut links = Vec::with_capacity(num_links as usize);

		for i in 0..num_links {
			let prefix = format!("ocpLink{i}");

			let fixed_heartbeat = parse_ranged(&entries, &format!("{prefix}.FixedHeartbeat"), 1, 3600, 10)?;
			let inactive_heartbeat = parse_ranged(&entries, &format!("{prefix}.InactiveHeartbeat"), 1, 3600, 1)?;
			let remote_port = parse_ranged(&entries, &format!("{prefix}.RemotePort"), 0, 65535, 10012)?;
			let timeout = parse_ranged(&entries, &format!("{prefix}.Timeout"), 1, 43200, 30)?;
			let local_port = parse_ranged(&entries, &format!("{prefix}.LocalPort"), 0, 65535, 0)?;

			let remote_addr = entries.get(&format!("{prefix}.RemoteAddress")).cloned().unwrap_or_else(|| "localhost".into());
			let local_addr = entries.get(&format!("{prefix}.LocalAddress")).cloned().unwrap_or_else(|| "localhost".into());

			links.push(LinkConfig {
				fixed_heartbeat: Duration::from_secs(fixed_heartbeat as u64),
				inactive_heartbeat: Duration::from_secs(inactive_heartbeat as u64),
				remote_addr,
				remote_port: remote_port as u16,
				timeout: Duration::from_secs(timeout as u64),
				local_addr,
				local_port: local_port as u16,
			});
		}

		Ok(Self {
			master_slave_swap_timeout: Duration::from_secs(master_slave_swap_timeout as u64),
			suspect_timeout: Duration::from_secs(suspect_timeout as u64),
			unit_name,
			links,
		})
	}

	/// Classify the change (if any) from `old` to `self` for each link index, per spec.md §6's
	/// reload semantics. `Config::diff` is the "pure diff" translation called for in SPEC_FULL.md
	/// §0 ("Architectural translations"): the engine applies the resulting plan without the public
	/// API needing to know about reload at all.
	pub fn diff(&self, old: &Config) -> ReloadPlan {
		let mut changes = Vec::new();

		for idx in 0..old.links.len().max(self.links.len()) {
			let change = match (old.links.get(idx), self.links.get(idx)) {
				(None, Some(_)) => LinkChange::Added,
				(Some(_), None) => LinkChange::Removed,
				(Some(a), Some(b)) if a.remote_addr != b.remote_addr || a.remote_port != b.remote_port || a.local_addr != b.local_addr || a.local_port != b.local_port => {
					LinkChange::Recreated
				}
				(Some(a), Some(b)) if a == b => LinkChange::Unchanged,
				(Some(_), Some(_)) => LinkChange::Updated,
				(None, None) => continue,
			};

			changes.push((idx, change));
		}

		ReloadPlan { changes }
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkChange {
	Unchanged,
	Updated,
	Recreated,
	Added,
	Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadPlan {
	pub changes: Vec<(usize, LinkChange)>,
}

#[cfg(test)]
mod tests {
	use super::*;

	fn entries(pairs: &[(&str, &str)]) -> impl Iterator<Item = (String, String)> + '_ {
		pairs.iter().map(|(k, v)| (k.to_string(), v.to_string()))
	}

	#[test]
	fn defaults_with_no_entries() {
		let cfg = Config::from_entries(std::iter::empty()).unwrap();
		assert_eq!(cfg.master_slave_swap_timeout, Duration::from_secs(30));
		assert_eq!(cfg.suspect_timeout, Duration::from_secs(3));
		assert!(cfg.links.is_empty());
	}

	#[test]
	fn parses_two_links() {
		let cfg = Config::from_entries(entries(&[
			("ocpSystemNumLinks", "2"),
			("ocpLink0.RemoteAddress", "scp-a"),
			("ocpLink0.RemotePort", "10012"),
			("ocpLink1.RemoteAddress", "scp-b"),
		]))
		.unwrap();

		assert_eq!(cfg.links.len(), 2);
		assert_eq!(cfg.links[0].remote_addr, "scp-a");
		assert_eq!(cfg.links[1].remote_addr, "scp-b");
		assert_eq!(cfg.links[1].remote_port, 10012);
	}

	#[test]
	fn rejects_out_of_range_num_links() {
		let err = Config::from_entries(entries(&[("ocpSystemNumLinks", "3")])).unwrap_err();
		assert!(matches!(err, ConfigError::OutOfRange { .. }));
	}

	#[test]
	fn rejects_unparsable_value() {
		let err = Config::from_entries(entries(&[("ocpSystemNumLinks", "two")])).unwrap_err();
		assert!(matches!(err, ConfigError::Unparsable { .. }));
	}

	#[test]
	fn truncates_unit_name_to_31_chars() {
		let name = "x".repeat(64);
		let cfg = Config::from_entries(entries(&[("ocpSystemUnitName", &name)])).unwrap();
		assert_eq!(cfg.unit_name.len(), 31);
	}

	#[test]
	fn diff_detects_recreate_vs_update() {
		let mut old = Config::default();
		old.links.push(LinkConfig { remote_addr: "a".into(), ..Default::default() });

		let mut significant = old.clone();
		significant.links[0].remote_addr = "b".into();
		assert_eq!(significant.diff(&old).changes, vec![(0, LinkChange::Recreated)]);

		let mut insignificant = old.clone();
		insignificant.links[0].fixed_heartbeat = Duration::from_secs(20);
		assert_eq!(insignificant.diff(&old).changes, vec![(0, LinkChange::Updated)]);

		let mut removed = old.clone();
		removed.links.clear();
		assert_eq!(removed.diff(&old).changes, vec![(0, LinkChange::Removed)]);
	}
}
