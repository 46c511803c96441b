//! The OCP binary wire codec (C1): the fixed frame header, the ~35-entry command-code
//! registry, and decode/encode for the full message catalogue. See spec.md §3–4.1.

pub mod bcd;
mod codec;
pub mod codes;
pub mod error;
pub mod header;
pub mod message;
pub mod registry;
pub mod telsis;
pub mod unitname;

pub use error::{DecodeError, Reason};
pub use header::{Class, MANAGEMENT_TASK};
pub use message::{Body, Message};

use header::Header;
use utils::bytes;

/// Decode a single complete frame (as produced by `ocp::framer::Framer`) into a typed message.
pub fn decode(frame: &[u8]) -> Result<Message, DecodeError> {
	if frame.len() < core::mem::size_of::<Header>() {
		return Err(DecodeError::BadLength);
	}

	let header: &Header = bytes::cast(&frame[..core::mem::size_of::<Header>()]);
	let cmd = header.cmd.get();
	let len = header.len.get();
	let dst_task = header.dst_task.get();
	let src_task = header.src_task.get();

	let payload_len = Header::payload_len(len).ok_or(DecodeError::BadLength)?;
	let total = len as usize + 4;

	if frame.len() != total {
		return Err(DecodeError::BadLength);
	}

	const HDR: usize = core::mem::size_of::<Header>();
	let payload = &frame[HDR..HDR + payload_len];
	let terminator = &frame[HDR + payload_len..];

	if terminator != header::TERMINATOR {
		return Err(DecodeError::BadTerminator);
	}

	let class = Class::of(cmd).ok_or(DecodeError::UnknownClass { cmd })?;

	let body = match class {
		Class::Link => codec::link::decode(cmd, dst_task, src_task, payload)?,
		Class::Call => codec::call::decode(cmd, dst_task, src_task, payload)?,
	};

	Ok(Message { dst_task, src_task, body })
}

/// Encode a message into a complete frame ready to write to the wire.
pub fn encode(msg: &Message) -> Vec<u8> {
	let mut payload = Vec::new();

	match msg.class() {
		Class::Link => codec::link::encode(&msg.body, &mut payload),
		Class::Call => codec::call::encode(&msg.body, &mut payload),
	}

	let len = Header::len_for_payload(payload.len());

	let mut out = Vec::with_capacity(12 + payload.len() + 2);
	out.extend_from_slice(&msg.cmd_code().to_be_bytes());
	out.extend_from_slice(&len.to_be_bytes());
	out.extend_from_slice(&msg.dst_task.to_be_bytes());
	out.extend_from_slice(&msg.src_task.to_be_bytes());
	out.extend_from_slice(&payload);
	out.extend_from_slice(&header::TERMINATOR);
	out
}
