use core::net::Ipv4Addr;

use crate::bcd::PhoneNumber;
use crate::codes;
use crate::error::Reason;
use crate::header::{Class, MANAGEMENT_TASK};

/// A fully decoded wire message: the task pair plus its typed body.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
	pub dst_task: u32,
	pub src_task: u32,
	pub body: Body,
}

impl Message {
	/// Build a link-class message. Task ids are always the management sentinel.
	pub fn link(body: Body) -> Self {
		Self { dst_task: MANAGEMENT_TASK, src_task: MANAGEMENT_TASK, body }
	}

	/// Build a call-class message addressed to `dst_task` from `src_task`.
	pub fn call(dst_task: u32, src_task: u32, body: Body) -> Self {
		Self { dst_task, src_task, body }
	}

	pub fn class(&self) -> Class {
		self.body.class()
	}

	pub fn cmd_code(&self) -> u16 {
		self.body.cmd_code()
	}
}

/// One variant per recognised command code (§4.1's "per-message class hierarchy collapses
/// into tagged variants").
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
	// Link class.
	Heartbeat,
	AreYouMaster,
	AreYouMasterReply(AreYouMasterReply),
	BecomeMaster,
	StatusRequest(StatusRequest),
	StatusResponse(StatusResponse),
	ChangeActiveLink(ChangeActiveLink),
	ChangeActiveLinkAck,
	LinkCommandUnsupported(Unsupported),
	CallGap(CallGap),
	PreferredUnit(PreferredUnit),

	// Call class.
	InitialDP(InitialDp),
	InitialDPServiceKey(InitialDpServiceKey),
	CallCleardown(CallCleardown),
	DeliverTo(DeliverTo),
	DeliverToWithFlags(DeliverToWithFlags),
	DeliverToResult(DeliverToResult),
	RequestCleardown,
	AnswerCall,
	AnswerResult(AnswerResult),
	TelsisHandler(TelsisHandler),
	TelsisHandlerWithParty(TelsisHandlerWithParty),
	TelsisHandlerResult(TelsisHandlerResult),
	INAPContinue,
	TaskActive,
	TaskActiveResult(TaskActiveResult),
	InsufficientResources,
	Abort(Abort),
	CallCommandUnsupported(Unsupported),
	InitialDPResponse(InitialDpResponse),
	SetCDRExtendedFieldData(SetCdrExtendedFieldData),
	SetCDRExtendedFieldDataResult(SetCdrExtendedFieldDataResult),
	ConnectToResource(ConnectToResource),
	ConnectToResourceAck,
	DisconnectFromResource(DisconnectFromResource),
	DisconnectFromResourceAck,
}

impl Body {
	pub fn cmd_code(&self) -> u16 {
		use codes::*;

		match self {
			Body::Heartbeat => HEARTBEAT,
			Body::AreYouMaster => ARE_YOU_MASTER,
			Body::AreYouMasterReply(_) => ARE_YOU_MASTER_REPLY,
			Body::BecomeMaster => BECOME_MASTER,
			Body::StatusRequest(_) => STATUS_REQUEST,
			Body::StatusResponse(_) => STATUS_RESPONSE,
			Body::ChangeActiveLink(_) => CHANGE_ACTIVE_LINK,
			Body::ChangeActiveLinkAck => CHANGE_ACTIVE_LINK_ACK,
			Body::LinkCommandUnsupported(_) => LINK_COMMAND_UNSUPPORTED,
			Body::CallGap(_) => CALL_GAP,
			Body::PreferredUnit(_) => PREFERRED_UNIT,

			Body::InitialDP(_) => INITIAL_DP,
			Body::InitialDPServiceKey(_) => INITIAL_DP_SERVICE_KEY,
			Body::CallCleardown(_) => CALL_CLEARDOWN,
			Body::DeliverTo(_) => DELIVER_TO,
			Body::DeliverToWithFlags(_) => DELIVER_TO_WITH_FLAGS,
			Body::DeliverToResult(_) => DELIVER_TO_RESULT,
			Body::RequestCleardown => REQUEST_CLEARDOWN,
			Body::AnswerCall => ANSWER_CALL,
			Body::AnswerResult(_) => ANSWER_RESULT,
			Body::TelsisHandler(_) => TELSIS_HANDLER,
			Body::TelsisHandlerWithParty(_) => TELSIS_HANDLER_WITH_PARTY,
			Body::TelsisHandlerResult(_) => TELSIS_HANDLER_RESULT,
			Body::INAPContinue => INAP_CONTINUE,
			Body::TaskActive => TASK_ACTIVE,
			Body::TaskActiveResult(_) => TASK_ACTIVE_RESULT,
			Body::InsufficientResources => INSUFFICIENT_RESOURCES,
			Body::Abort(_) => ABORT,
			Body::CallCommandUnsupported(_) => CALL_COMMAND_UNSUPPORTED,
			Body::InitialDPResponse(_) => INITIAL_DP_RESPONSE,
			Body::SetCDRExtendedFieldData(_) => SET_CDR_EXTENDED_FIELD_DATA,
			Body::SetCDRExtendedFieldDataResult(_) => SET_CDR_EXTENDED_FIELD_DATA_RESULT,
			Body::ConnectToResource(_) => CONNECT_TO_RESOURCE,
			Body::ConnectToResourceAck => CONNECT_TO_RESOURCE_ACK,
			Body::DisconnectFromResource(_) => DISCONNECT_FROM_RESOURCE,
			Body::DisconnectFromResourceAck => DISCONNECT_FROM_RESOURCE_ACK,
		}
	}

	pub fn class(&self) -> Class {
		Class::of(self.cmd_code()).expect("every Body variant maps to a known class")
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreYouMasterReply {
	pub is_master: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRequest {
	pub unit_id: u32,
	pub cluster_id: u8,
	pub flags: u8,
}

impl StatusRequest {
	pub fn enabled(&self) -> bool {
		self.flags & codes::FLAG_UNIT_ENABLED != 0
	}

	pub fn is_master(&self) -> bool {
		self.flags & codes::FLAG_MASTER != 0
	}

	pub fn is_master_slave(&self) -> bool {
		self.cluster_id == codes::CLUSTER_MASTER_SLAVE
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
	pub active_calls: u32,
	pub unit_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeActiveLink {
	pub reason: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unsupported {
	pub nested_cmd: u16,
	pub reason: Reason,
	pub value: u32,
}

/// Decoded `CallGap` duration. Disable/indefinite/network-specific are spelled out explicitly
/// so callers never have to remember the magic sentinel values from spec.md §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallGap {
	Disable,
	Indefinite,
	NetworkSpecific,
	Seconds(u32),
}

impl CallGap {
	pub(crate) fn from_raw(raw: i32) -> Self {
		match raw {
			codes::DURATION_DISABLE => CallGap::Disable,
			codes::DURATION_INDEFINITE => CallGap::Indefinite,
			codes::DURATION_NETWORK_SPECIFIC => CallGap::NetworkSpecific,
			n => CallGap::Seconds(n as u32),
		}
	}

	pub(crate) fn to_raw(self) -> i32 {
		match self {
			CallGap::Disable => codes::DURATION_DISABLE,
			CallGap::Indefinite => codes::DURATION_INDEFINITE,
			CallGap::NetworkSpecific => codes::DURATION_NETWORK_SPECIFIC,
			CallGap::Seconds(n) => n as i32,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferredUnit {
	pub preferred: Ipv4Addr,
	pub secondary: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectingNumber {
	pub presentation: u8,
	pub type_plan: u8,
	pub number: PhoneNumber,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialDp {
	pub calling: PhoneNumber,
	pub called: PhoneNumber,
	pub redirecting: Option<RedirectingNumber>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialDpServiceKey {
	pub dp: InitialDp,
	pub service_key: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallCleardown {
	pub reason: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliverTo {
	pub flags: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliverToWithFlags {
	pub flags: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliverToResult {
	pub result: u8,
	pub zip: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerResult {
	pub result: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelsisHandler {
	pub handler: u16,
	pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelsisHandlerWithParty {
	pub handler: u16,
	pub party: PhoneNumber,
	pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelsisHandlerResult {
	pub handler: u16,
	pub result: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskActiveResult {
	pub result: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abort {
	pub reason: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialDpResponse {
	pub result: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCdrExtendedFieldData {
	pub field_id: u16,
	pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetCdrExtendedFieldDataResult {
	pub result: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectToResource {
	pub resource_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectFromResource {
	pub resource_id: u32,
}
