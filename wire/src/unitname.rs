//! The 32-byte fixed NUL-terminated/padded ASCII unit-name field used by `StatusResponse`.

pub const ENCODED_LEN: usize = 32;

pub fn decode(buf: &[u8; ENCODED_LEN]) -> String {
	let end = buf.iter().position(|&b| b == 0).unwrap_or(ENCODED_LEN);
	String::from_utf8_lossy(&buf[..end]).into_owned()
}

pub fn encode(name: &str, out: &mut [u8; ENCODED_LEN]) {
	out.fill(0);

	let bytes = name.as_bytes();
	let n = bytes.len().min(ENCODED_LEN - 1);
	out[..n].copy_from_slice(&bytes[..n]);
}
