use super::{expect_len, expect_one_of, u16be, u32be};
use crate::bcd::{self, PhoneNumber};
use crate::codes;
use crate::error::{DecodeError, Reason};
use crate::header::Class;
use crate::message::*;
use crate::telsis;

const REDIRECTING_LEN: usize = 1 + 1 + bcd::ENCODED_LEN;
const DP_LEN: usize = 2 * bcd::ENCODED_LEN;

const TELSIS_MAX_DATA: usize = 64;
const TELSIS_WITH_PARTY_MAX_DATA: usize = 448;

pub(crate) fn decode(cmd: u16, dst_task: u32, src_task: u32, payload: &[u8]) -> Result<Body, DecodeError> {
	match cmd {
		codes::INITIAL_DP => {
			expect_one_of(payload, &[DP_LEN, DP_LEN + REDIRECTING_LEN], Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::InitialDP(decode_initial_dp(payload, cmd, dst_task, src_task)?))
		}
		codes::INITIAL_DP_SERVICE_KEY => {
			expect_one_of(payload, &[DP_LEN + 4, DP_LEN + 4 + REDIRECTING_LEN], Class::Call, cmd, dst_task, src_task)?;
			decode_initial_dp_service_key(payload, cmd, dst_task, src_task).map(Body::InitialDPServiceKey)
		}
		codes::CALL_CLEARDOWN => {
			expect_len(payload, 1, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::CallCleardown(CallCleardown { reason: payload[0] }))
		}
		codes::DELIVER_TO => {
			expect_len(payload, 1, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::DeliverTo(DeliverTo { flags: payload[0] }))
		}
		codes::DELIVER_TO_WITH_FLAGS => {
			expect_len(payload, 2, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::DeliverToWithFlags(DeliverToWithFlags { flags: u16be(payload, 0) }))
		}
		codes::DELIVER_TO_RESULT => {
			expect_len(payload, 2, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::DeliverToResult(DeliverToResult { result: payload[0], zip: payload[1] }))
		}
		codes::REQUEST_CLEARDOWN => {
			expect_len(payload, 0, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::RequestCleardown)
		}
		codes::ANSWER_CALL => {
			expect_len(payload, 0, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::AnswerCall)
		}
		codes::ANSWER_RESULT => {
			expect_len(payload, 1, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::AnswerResult(AnswerResult { result: payload[0] }))
		}
		codes::TELSIS_HANDLER => {
			if payload.len() < 2 || payload.len() > 2 + TELSIS_MAX_DATA {
				return Err(len_err(payload, Class::Call, cmd, dst_task, src_task));
			}
			let handler = u16be(payload, 0);
			telsis::validate(handler, cmd, dst_task, src_task)?;
			Ok(Body::TelsisHandler(TelsisHandler { handler, data: payload[2..].to_vec() }))
		}
		codes::TELSIS_HANDLER_WITH_PARTY => {
			let min = 2 + bcd::ENCODED_LEN;
			if payload.len() < min || payload.len() > min + TELSIS_WITH_PARTY_MAX_DATA {
				return Err(len_err(payload, Class::Call, cmd, dst_task, src_task));
			}
			let handler = u16be(payload, 0);
			telsis::validate(handler, cmd, dst_task, src_task)?;
			let party_buf: &[u8; bcd::ENCODED_LEN] = payload[2..2 + bcd::ENCODED_LEN].try_into().unwrap();
			let party = PhoneNumber::decode(party_buf, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::TelsisHandlerWithParty(TelsisHandlerWithParty { handler, party, data: payload[min..].to_vec() }))
		}
		codes::TELSIS_HANDLER_RESULT => {
			expect_len(payload, 3, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::TelsisHandlerResult(TelsisHandlerResult { handler: u16be(payload, 0), result: payload[2] }))
		}
		codes::INAP_CONTINUE => {
			expect_len(payload, 0, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::INAPContinue)
		}
		codes::TASK_ACTIVE => {
			expect_len(payload, 0, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::TaskActive)
		}
		codes::TASK_ACTIVE_RESULT => {
			expect_len(payload, 1, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::TaskActiveResult(TaskActiveResult { result: payload[0] }))
		}
		codes::INSUFFICIENT_RESOURCES => {
			expect_len(payload, 0, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::InsufficientResources)
		}
		codes::ABORT => {
			expect_len(payload, 1, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::Abort(Abort { reason: payload[0] }))
		}
		codes::CALL_COMMAND_UNSUPPORTED => {
			expect_len(payload, 8, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::CallCommandUnsupported(crate::codec::link::decode_unsupported(payload)))
		}
		codes::INITIAL_DP_RESPONSE => {
			expect_len(payload, 1, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::InitialDPResponse(InitialDpResponse { result: payload[0] }))
		}
		codes::SET_CDR_EXTENDED_FIELD_DATA => {
			if payload.len() < 4 {
				return Err(len_err(payload, Class::Call, cmd, dst_task, src_task));
			}
			let field_id = u16be(payload, 0);
			let data_len = u16be(payload, 2) as usize;
			if payload.len() != 4 + data_len {
				return Err(len_err(payload, Class::Call, cmd, dst_task, src_task));
			}
			Ok(Body::SetCDRExtendedFieldData(SetCdrExtendedFieldData { field_id, data: payload[4..].to_vec() }))
		}
		codes::SET_CDR_EXTENDED_FIELD_DATA_RESULT => {
			expect_len(payload, 1, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::SetCDRExtendedFieldDataResult(SetCdrExtendedFieldDataResult { result: payload[0] }))
		}
		codes::CONNECT_TO_RESOURCE => {
			expect_len(payload, 4, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::ConnectToResource(ConnectToResource { resource_id: u32be(payload, 0) }))
		}
		codes::CONNECT_TO_RESOURCE_ACK => {
			expect_len(payload, 0, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::ConnectToResourceAck)
		}
		codes::DISCONNECT_FROM_RESOURCE => {
			expect_len(payload, 4, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::DisconnectFromResource(DisconnectFromResource { resource_id: u32be(payload, 0) }))
		}
		codes::DISCONNECT_FROM_RESOURCE_ACK => {
			expect_len(payload, 0, Class::Call, cmd, dst_task, src_task)?;
			Ok(Body::DisconnectFromResourceAck)
		}
		_ => Err(DecodeError::UnsupportedCommand { class: Class::Call, cmd, dst_task, src_task }),
	}
}

fn len_err(payload: &[u8], class: Class, cmd: u16, dst_task: u32, src_task: u32) -> DecodeError {
	DecodeError::InvalidField { class, cmd, reason: Reason::InvalidFieldValue, value: Some(payload.len() as u32), dst_task, src_task }
}

fn decode_initial_dp(payload: &[u8], cmd: u16, dst_task: u32, src_task: u32) -> Result<InitialDp, DecodeError> {
	let calling_buf: &[u8; bcd::ENCODED_LEN] = payload[0..bcd::ENCODED_LEN].try_into().unwrap();
	let called_buf: &[u8; bcd::ENCODED_LEN] = payload[bcd::ENCODED_LEN..DP_LEN].try_into().unwrap();

	let calling = PhoneNumber::decode(calling_buf, Class::Call, cmd, dst_task, src_task)?;
	let called = PhoneNumber::decode(called_buf, Class::Call, cmd, dst_task, src_task)?;

	let redirecting = if payload.len() > DP_LEN {
		let presentation = payload[DP_LEN];
		let type_plan = payload[DP_LEN + 1];
		let num_buf: &[u8; bcd::ENCODED_LEN] = payload[DP_LEN + 2..DP_LEN + 2 + bcd::ENCODED_LEN].try_into().unwrap();
		let number = PhoneNumber::decode(num_buf, Class::Call, cmd, dst_task, src_task)?;
		Some(RedirectingNumber { presentation, type_plan, number })
	} else {
		None
	};

	Ok(InitialDp { calling, called, redirecting })
}

fn decode_initial_dp_service_key(payload: &[u8], cmd: u16, dst_task: u32, src_task: u32) -> Result<InitialDpServiceKey, DecodeError> {
	let has_redirecting = payload.len() > DP_LEN + 4;
	let dp_and_tail_len = if has_redirecting { DP_LEN + REDIRECTING_LEN } else { DP_LEN };

	let dp_payload = {
		let mut buf = Vec::with_capacity(dp_and_tail_len);
		buf.extend_from_slice(&payload[..DP_LEN]);
		if has_redirecting {
			buf.extend_from_slice(&payload[DP_LEN + 4..]);
		}
		buf
	};

	let dp = decode_initial_dp(&dp_payload, cmd, dst_task, src_task)?;
	let service_key = u32be(payload, DP_LEN);

	Ok(InitialDpServiceKey { dp, service_key })
}

pub(crate) fn encode(body: &Body, out: &mut Vec<u8>) {
	match body {
		Body::InitialDP(m) => encode_initial_dp(m, out),
		Body::InitialDPServiceKey(m) => {
			out.extend_from_slice(&{
				let mut calling = [0u8; bcd::ENCODED_LEN];
				m.dp.calling.encode(&mut calling);
				calling
			});
			out.extend_from_slice(&{
				let mut called = [0u8; bcd::ENCODED_LEN];
				m.dp.called.encode(&mut called);
				called
			});
			out.extend_from_slice(&m.service_key.to_be_bytes());
			encode_redirecting(&m.dp.redirecting, out);
		}
		Body::CallCleardown(m) => out.push(m.reason),
		Body::DeliverTo(m) => out.push(m.flags),
		Body::DeliverToWithFlags(m) => out.extend_from_slice(&m.flags.to_be_bytes()),
		Body::DeliverToResult(m) => {
			out.push(m.result);
			out.push(m.zip);
		}
		Body::RequestCleardown | Body::AnswerCall | Body::INAPContinue | Body::TaskActive | Body::InsufficientResources => {}
		Body::AnswerResult(m) => out.push(m.result),
		Body::TelsisHandler(m) => {
			out.extend_from_slice(&m.handler.to_be_bytes());
			out.extend_from_slice(&m.data);
		}
		Body::TelsisHandlerWithParty(m) => {
			out.extend_from_slice(&m.handler.to_be_bytes());
			let mut party = [0u8; bcd::ENCODED_LEN];
			m.party.encode(&mut party);
			out.extend_from_slice(&party);
			out.extend_from_slice(&m.data);
		}
		Body::TelsisHandlerResult(m) => {
			out.extend_from_slice(&m.handler.to_be_bytes());
			out.push(m.result);
		}
		Body::TaskActiveResult(m) => out.push(m.result),
		Body::Abort(m) => out.push(m.reason),
		Body::CallCommandUnsupported(m) => crate::codec::link::encode_unsupported(m, out),
		Body::InitialDPResponse(m) => out.push(m.result),
		Body::SetCDRExtendedFieldData(m) => {
			out.extend_from_slice(&m.field_id.to_be_bytes());
			out.extend_from_slice(&(m.data.len() as u16).to_be_bytes());
			out.extend_from_slice(&m.data);
		}
		Body::SetCDRExtendedFieldDataResult(m) => out.push(m.result),
		Body::ConnectToResource(m) => out.extend_from_slice(&m.resource_id.to_be_bytes()),
		Body::ConnectToResourceAck => {}
		Body::DisconnectFromResource(m) => out.extend_from_slice(&m.resource_id.to_be_bytes()),
		Body::DisconnectFromResourceAck => {}
		_ => panic!("encode_call called with a non-call Body"),
	}
}

fn encode_initial_dp(m: &InitialDp, out: &mut Vec<u8>) {
	let mut calling = [0u8; bcd::ENCODED_LEN];
	m.calling.encode(&mut calling);
	out.extend_from_slice(&calling);

	let mut called = [0u8; bcd::ENCODED_LEN];
	m.called.encode(&mut called);
	out.extend_from_slice(&called);

	encode_redirecting(&m.redirecting, out);
}

fn encode_redirecting(redirecting: &Option<RedirectingNumber>, out: &mut Vec<u8>) {
	let Some(r) = redirecting else { return };

	out.push(r.presentation);
	out.push(r.type_plan);

	let mut num = [0u8; bcd::ENCODED_LEN];
	r.number.encode(&mut num);
	out.extend_from_slice(&num);
}
