use super::{expect_len, u32be};
use crate::codes;
use crate::error::DecodeError;
use crate::header::Class;
use crate::message::*;

pub(crate) fn decode(cmd: u16, dst_task: u32, src_task: u32, payload: &[u8]) -> Result<Body, DecodeError> {
	match cmd {
		codes::HEARTBEAT => {
			expect_len(payload, 0, Class::Link, cmd, dst_task, src_task)?;
			Ok(Body::Heartbeat)
		}
		codes::ARE_YOU_MASTER => {
			expect_len(payload, 0, Class::Link, cmd, dst_task, src_task)?;
			Ok(Body::AreYouMaster)
		}
		codes::ARE_YOU_MASTER_REPLY => {
			expect_len(payload, 1, Class::Link, cmd, dst_task, src_task)?;
			Ok(Body::AreYouMasterReply(AreYouMasterReply { is_master: payload[0] & codes::FLAG_MASTER != 0 }))
		}
		codes::BECOME_MASTER => {
			expect_len(payload, 0, Class::Link, cmd, dst_task, src_task)?;
			Ok(Body::BecomeMaster)
		}
		codes::STATUS_REQUEST => {
			expect_len(payload, 6, Class::Link, cmd, dst_task, src_task)?;
			Ok(Body::StatusRequest(StatusRequest { unit_id: u32be(payload, 0), cluster_id: payload[4], flags: payload[5] }))
		}
		codes::STATUS_RESPONSE => {
			expect_len(payload, 4 + crate::unitname::ENCODED_LEN, Class::Link, cmd, dst_task, src_task)?;
			let active_calls = u32be(payload, 0);
			let name: &[u8; crate::unitname::ENCODED_LEN] = payload[4..].try_into().unwrap();
			Ok(Body::StatusResponse(StatusResponse { active_calls, unit_name: crate::unitname::decode(name) }))
		}
		codes::CHANGE_ACTIVE_LINK => {
			expect_len(payload, 1, Class::Link, cmd, dst_task, src_task)?;
			Ok(Body::ChangeActiveLink(ChangeActiveLink { reason: payload[0] }))
		}
		codes::CHANGE_ACTIVE_LINK_ACK => {
			expect_len(payload, 0, Class::Link, cmd, dst_task, src_task)?;
			Ok(Body::ChangeActiveLinkAck)
		}
		codes::LINK_COMMAND_UNSUPPORTED => {
			expect_len(payload, 8, Class::Link, cmd, dst_task, src_task)?;
			Ok(Body::LinkCommandUnsupported(decode_unsupported(payload)))
		}
		codes::CALL_GAP => {
			expect_len(payload, 4, Class::Link, cmd, dst_task, src_task)?;
			Ok(Body::CallGap(CallGap::from_raw(u32be(payload, 0) as i32)))
		}
		codes::PREFERRED_UNIT => {
			expect_len(payload, 8, Class::Link, cmd, dst_task, src_task)?;
			let preferred = core::net::Ipv4Addr::new(payload[0], payload[1], payload[2], payload[3]);
			let secondary = core::net::Ipv4Addr::new(payload[4], payload[5], payload[6], payload[7]);
			Ok(Body::PreferredUnit(PreferredUnit { preferred, secondary }))
		}
		_ => Err(DecodeError::UnsupportedCommand { class: Class::Link, cmd, dst_task, src_task }),
	}
}

pub(crate) fn decode_unsupported(payload: &[u8]) -> Unsupported {
	let nested_cmd = super::u16be(payload, 0);
	let reason = crate::error::Reason::from_u8(payload[2]);
	let value = u32be(payload, 4);
	Unsupported { nested_cmd, reason, value }
}

pub(crate) fn encode(body: &Body, out: &mut Vec<u8>) {
	match body {
		Body::Heartbeat | Body::AreYouMaster | Body::BecomeMaster | Body::ChangeActiveLinkAck => {}
		Body::AreYouMasterReply(m) => out.push(if m.is_master { codes::FLAG_MASTER } else { 0 }),
		Body::StatusRequest(m) => {
			out.extend_from_slice(&m.unit_id.to_be_bytes());
			out.push(m.cluster_id);
			out.push(m.flags);
		}
		Body::StatusResponse(m) => {
			out.extend_from_slice(&m.active_calls.to_be_bytes());
			let mut name = [0u8; crate::unitname::ENCODED_LEN];
			crate::unitname::encode(&m.unit_name, &mut name);
			out.extend_from_slice(&name);
		}
		Body::ChangeActiveLink(m) => out.push(m.reason),
		Body::LinkCommandUnsupported(m) => encode_unsupported(m, out),
		Body::CallGap(m) => out.extend_from_slice(&(m.to_raw() as u32).to_be_bytes()),
		Body::PreferredUnit(m) => {
			out.extend_from_slice(&m.preferred.octets());
			out.extend_from_slice(&m.secondary.octets());
		}
		_ => panic!("encode_link called with a non-link Body"),
	}
}

pub(crate) fn encode_unsupported(m: &Unsupported, out: &mut Vec<u8>) {
	out.extend_from_slice(&m.nested_cmd.to_be_bytes());
	out.push(m.reason as u8);
	out.push(0);
	out.extend_from_slice(&m.value.to_be_bytes());
}
