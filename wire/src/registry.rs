//! A `const` table giving `(command code) -> (rx_supported, tx_supported, display_name)`, per
//! spec.md §4.1. Decoding itself dispatches through `codec::{link,call}::decode`, which is
//! exhaustive over the same code set this table describes; the table is the introspection
//! surface (what a supervisor/telemetry caller can list) rather than a second decode path.

use crate::codes;
use crate::header::Class;

pub struct Entry {
	pub code: u16,
	pub class: Class,
	pub name: &'static str,
	pub rx_supported: bool,
	pub tx_supported: bool,
}

macro_rules! entries {
	( $( $code:expr, $class:expr, $name:literal, $rx:literal, $tx:literal; )* ) => {
		&[ $( Entry { code: $code, class: $class, name: $name, rx_supported: $rx, tx_supported: $tx } ),* ]
	};
}

pub const REGISTRY: &[Entry] = entries! {
	codes::HEARTBEAT, Class::Link, "Heartbeat", true, true;
	codes::ARE_YOU_MASTER, Class::Link, "AreYouMaster", true, true;
	codes::ARE_YOU_MASTER_REPLY, Class::Link, "AreYouMasterReply", true, true;
	codes::BECOME_MASTER, Class::Link, "BecomeMaster", true, true;
	codes::STATUS_REQUEST, Class::Link, "StatusRequest", true, false;
	codes::STATUS_RESPONSE, Class::Link, "StatusResponse", false, true;
	codes::CHANGE_ACTIVE_LINK, Class::Link, "ChangeActiveLink", true, true;
	codes::CHANGE_ACTIVE_LINK_ACK, Class::Link, "ChangeActiveLinkAck", true, true;
	codes::LINK_COMMAND_UNSUPPORTED, Class::Link, "LinkCommandUnsupported", true, true;
	codes::CALL_GAP, Class::Link, "CallGap", true, false;
	codes::PREFERRED_UNIT, Class::Link, "PreferredUnit", true, false;

	codes::INITIAL_DP, Class::Call, "InitialDP", true, false;
	codes::INITIAL_DP_SERVICE_KEY, Class::Call, "InitialDPServiceKey", true, false;
	codes::CALL_CLEARDOWN, Class::Call, "CallCleardown", true, true;
	codes::DELIVER_TO, Class::Call, "DeliverTo", true, true;
	codes::DELIVER_TO_WITH_FLAGS, Class::Call, "DeliverToWithFlags", true, true;
	codes::DELIVER_TO_RESULT, Class::Call, "DeliverToResult", true, true;
	codes::REQUEST_CLEARDOWN, Class::Call, "RequestCleardown", true, true;
	codes::ANSWER_CALL, Class::Call, "AnswerCall", true, true;
	codes::ANSWER_RESULT, Class::Call, "AnswerResult", true, true;
	codes::TELSIS_HANDLER, Class::Call, "TelsisHandler", true, true;
	codes::TELSIS_HANDLER_WITH_PARTY, Class::Call, "TelsisHandlerWithParty", true, true;
	codes::TELSIS_HANDLER_RESULT, Class::Call, "TelsisHandlerResult", true, true;
	codes::INAP_CONTINUE, Class::Call, "INAPContinue", true, true;
	codes::TASK_ACTIVE, Class::Call, "TaskActive", true, true;
	codes::TASK_ACTIVE_RESULT, Class::Call, "TaskActiveResult", true, true;
	codes::INSUFFICIENT_RESOURCES, Class::Call, "InsufficientResources", true, true;
	codes::ABORT, Class::Call, "Abort", true, true;
	codes::CALL_COMMAND_UNSUPPORTED, Class::Call, "CallCommandUnsupported", true, true;
	codes::INITIAL_DP_RESPONSE, Class::Call, "InitialDPResponse", true, true;
	codes::SET_CDR_EXTENDED_FIELD_DATA, Class::Call, "SetCDRExtendedFieldData", true, true;
	codes::SET_CDR_EXTENDED_FIELD_DATA_RESULT, Class::Call, "SetCDRExtendedFieldDataResult", true, true;
	codes::CONNECT_TO_RESOURCE, Class::Call, "ConnectToResource", true, true;
	codes::CONNECT_TO_RESOURCE_ACK, Class::Call, "ConnectToResourceAck", true, true;
	codes::DISCONNECT_FROM_RESOURCE, Class::Call, "DisconnectFromResource", true, true;
	codes::DISCONNECT_FROM_RESOURCE_ACK, Class::Call, "DisconnectFromResourceAck", true, true;
};

pub fn lookup(code: u16) -> Option<&'static Entry> {
	REGISTRY.iter().find(|e| e.code == code)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn registry_matches_wire_format_catalogue() {
		for entry in REGISTRY {
			assert_eq!(Class::of(entry.code), Some(entry.class));
		}

		// Every code crate::decode accepts as "known" also appears here.
		assert!(crate::decode(&encode_empty(codes::HEARTBEAT)).is_ok());
	}

	fn encode_empty(cmd: u16) -> Vec<u8> {
		let mut buf = vec![0u8; 12];
		buf[0..2].copy_from_slice(&cmd.to_be_bytes());
		buf[2..4].copy_from_slice(&10u16.to_be_bytes());
		buf[4..8].copy_from_slice(&0xFFFF_FFFFu32.to_be_bytes());
		buf[8..12].copy_from_slice(&0xFFFF_FFFFu32.to_be_bytes());
		buf.extend_from_slice(&crate::header::TERMINATOR);
		buf
	}
}
