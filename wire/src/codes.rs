//! The closed set of ~35 command codes the core recognises, per spec.md §3/§4.1.
//!
//! The top 4 bits of every code are its class: `0x0xxx` = link, `0x1xxx` = call.

// Link class (0x0xxx).
pub const HEARTBEAT: u16 = 0x0001;
pub const ARE_YOU_MASTER: u16 = 0x0002;
pub const ARE_YOU_MASTER_REPLY: u16 = 0x0003;
pub const BECOME_MASTER: u16 = 0x0004;
pub const STATUS_REQUEST: u16 = 0x0005;
pub const STATUS_RESPONSE: u16 = 0x0006;
pub const CHANGE_ACTIVE_LINK: u16 = 0x0007;
pub const CHANGE_ACTIVE_LINK_ACK: u16 = 0x0008;
pub const LINK_COMMAND_UNSUPPORTED: u16 = 0x0009;
pub const CALL_GAP: u16 = 0x000A;
pub const PREFERRED_UNIT: u16 = 0x000B;

// Call class (0x1xxx).
pub const INITIAL_DP: u16 = 0x1001;
pub const INITIAL_DP_SERVICE_KEY: u16 = 0x1002;
pub const CALL_CLEARDOWN: u16 = 0x1003;
pub const DELIVER_TO: u16 = 0x1004;
pub const DELIVER_TO_WITH_FLAGS: u16 = 0x1005;
pub const DELIVER_TO_RESULT: u16 = 0x1006;
pub const REQUEST_CLEARDOWN: u16 = 0x1007;
pub const ANSWER_CALL: u16 = 0x1008;
pub const ANSWER_RESULT: u16 = 0x1009;
pub const TELSIS_HANDLER: u16 = 0x100A;
pub const TELSIS_HANDLER_WITH_PARTY: u16 = 0x100B;
pub const TELSIS_HANDLER_RESULT: u16 = 0x100C;
pub const INAP_CONTINUE: u16 = 0x100D;
pub const TASK_ACTIVE: u16 = 0x100E;
pub const TASK_ACTIVE_RESULT: u16 = 0x100F;
pub const INSUFFICIENT_RESOURCES: u16 = 0x1010;
pub const ABORT: u16 = 0x1011;
pub const CALL_COMMAND_UNSUPPORTED: u16 = 0x1012;
pub const INITIAL_DP_RESPONSE: u16 = 0x1013;
pub const SET_CDR_EXTENDED_FIELD_DATA: u16 = 0x1014;
pub const SET_CDR_EXTENDED_FIELD_DATA_RESULT: u16 = 0x1015;
pub const CONNECT_TO_RESOURCE: u16 = 0x1016;
pub const CONNECT_TO_RESOURCE_ACK: u16 = 0x1017;
pub const DISCONNECT_FROM_RESOURCE: u16 = 0x1018;
pub const DISCONNECT_FROM_RESOURCE_ACK: u16 = 0x1019;

/// Reason carried by `Abort`: the destination task id was not a running call.
pub const TASK_NOT_RUNNING: u8 = 1;

/// `StatusRequest`/`StatusResponse` flag bits.
pub const FLAG_UNIT_ENABLED: u8 = 0x01;
pub const FLAG_MASTER: u8 = 0x02;

/// `clusterId` value meaning the peer is configured master-slave rather than load-sharing.
pub const CLUSTER_MASTER_SLAVE: u8 = 0xFF;

/// `CallGap` duration sentinels.
pub const DURATION_DISABLE: i32 = 0;
pub const DURATION_INDEFINITE: i32 = -1;
pub const DURATION_NETWORK_SPECIFIC: i32 = -2;
