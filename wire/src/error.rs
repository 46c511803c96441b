use crate::header::Class;
use crate::message::{Message, Unsupported};

/// The reason code carried by a synthesised `LinkCommandUnsupported`/`CallCommandUnsupported` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Reason {
	CommandCodeUnsupported = 1,
	InvalidFieldValue = 2,
}

impl Reason {
	pub(crate) fn from_u8(raw: u8) -> Self {
		match raw {
			1 => Reason::CommandCodeUnsupported,
			_ => Reason::InvalidFieldValue,
		}
	}
}

/// Decode failures, per spec.md §4.1/§7.
///
/// `BadLength`/`BadTerminator`/`UnknownClass` are frame-level: the framer resyncs and nothing is
/// sent back. `UnsupportedCommand`/`InvalidField` are message-level: the link replies in kind.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
	#[error("frame length field out of the 14..=1024 total-length range")]
	BadLength,
	#[error("frame terminator did not match 0x55 0xAA")]
	BadTerminator,
	#[error("command code 0x{cmd:04x} belongs to no known class")]
	UnknownClass { cmd: u16 },
	#[error("command code 0x{cmd:04x} is not a recognised {class:?} command")]
	UnsupportedCommand { class: Class, cmd: u16, dst_task: u32, src_task: u32 },
	#[error("command 0x{cmd:04x} carried an out-of-range field value ({value:?})")]
	InvalidField { class: Class, cmd: u16, reason: Reason, value: Option<u32>, dst_task: u32, src_task: u32 },
}

impl DecodeError {
	/// Synthesise the wire-level reply this error calls for, per §4.1/§7. Frame-level errors
	/// (bad length/terminator, unknown class) have no addressee and produce no reply.
	pub fn to_reply(&self) -> Option<Message> {
		match *self {
			DecodeError::BadLength | DecodeError::BadTerminator | DecodeError::UnknownClass { .. } => None,
			DecodeError::UnsupportedCommand { class, cmd, dst_task, src_task } => {
				Some(Self::unsupported_reply(class, cmd, Reason::CommandCodeUnsupported, None, dst_task, src_task))
			}
			DecodeError::InvalidField { class, cmd, reason, value, dst_task, src_task } => {
				Some(Self::unsupported_reply(class, cmd, reason, value, dst_task, src_task))
			}
		}
	}

	fn unsupported_reply(class: Class, cmd: u16, reason: Reason, value: Option<u32>, dst_task: u32, src_task: u32) -> Message {
		let body = Unsupported { nested_cmd: cmd, reason, value: value.unwrap_or(0) };

		// Task ids are swapped so the reply routes back to the originator.
		match class {
			Class::Link => Message::link(crate::message::Body::LinkCommandUnsupported(body)),
			Class::Call => Message::call(src_task, dst_task, crate::message::Body::CallCommandUnsupported(body)),
		}
	}
}
