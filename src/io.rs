//! Binary primitives shared by every other layer of the crate.
//!
//! [`Sink`] is a grow-only byte accumulator used by encoders; [`Source`] is a
//! cursor over a borrowed byte slice used by decoders. Every other component
//! in this crate (codec combinators, the generic decoder, the OCF reader and
//! writer) is built exclusively in terms of these two types, so that the wire
//! format is defined in exactly one place.

use integer_encoding::VarInt;

/// A grow-only byte accumulator.
///
/// Encoders never read back what they've written, so `Sink` only exposes
/// append operations.
#[derive(Debug, Default)]
pub struct Sink {
	buf: Vec<u8>,
}

impl Sink {
	/// Start with an empty buffer.
	pub fn new() -> Self {
		Self { buf: Vec::new() }
	}

	/// Start with an empty buffer with at least `capacity` bytes reserved.
	pub fn with_capacity(capacity: usize) -> Self {
		Self {
			buf: Vec::with_capacity(capacity),
		}
	}

	/// Wrap an existing buffer, appending to whatever it already contains.
	pub fn from_vec(buf: Vec<u8>) -> Self {
		Self { buf }
	}

	/// Consume the sink, yielding the accumulated bytes.
	pub fn into_vec(self) -> Vec<u8> {
		self.buf
	}

	/// Current length of the accumulated buffer.
	pub fn len(&self) -> usize {
		self.buf.len()
	}

	/// Whether nothing has been written yet.
	pub fn is_empty(&self) -> bool {
		self.buf.is_empty()
	}

	/// Discard everything written so far, keeping the allocation.
	pub fn clear(&mut self) {
		self.buf.clear();
	}

	#[inline]
	fn push_bytes(&mut self, bytes: &[u8]) {
		self.buf.extend_from_slice(bytes);
	}

	/// `null` has no representation on the wire.
	#[inline]
	pub fn write_null(&mut self) {}

	/// One byte: `0x00` for `false`, `0x01` for `true`.
	#[inline]
	pub fn write_bool(&mut self, value: bool) {
		self.buf.push(value as u8);
	}

	/// Zig-zag varint, routed through the 64-bit encoding.
	#[inline]
	pub fn write_int(&mut self, value: i32) {
		self.write_long(value as i64);
	}

	/// Zig-zag varint: `zz(n) = (n << 1) ^ (n >> 63)`, little-endian base-128
	/// with a continuation bit, 1 to 10 bytes.
	#[inline]
	pub fn write_long(&mut self, value: i64) {
		let mut buf = [0u8; 10];
		let n = value.encode_var(&mut buf);
		self.push_bytes(&buf[..n]);
	}

	/// IEEE 754 single precision, little-endian, 4 bytes.
	#[inline]
	pub fn write_float(&mut self, value: f32) {
		self.push_bytes(&value.to_le_bytes());
	}

	/// IEEE 754 double precision, little-endian, 8 bytes.
	#[inline]
	pub fn write_double(&mut self, value: f64) {
		self.push_bytes(&value.to_le_bytes());
	}

	/// Length (as `long`) followed by the raw payload.
	#[inline]
	pub fn write_bytes(&mut self, value: &[u8]) {
		self.write_long(value.len() as i64);
		self.push_bytes(value);
	}

	/// Length (as `long`) followed by the UTF-8 payload.
	#[inline]
	pub fn write_string(&mut self, value: &str) {
		self.write_bytes(value.as_bytes());
	}

	/// Raw payload, no length prefix. The caller is responsible for writing
	/// exactly `size` bytes; this is enforced by the `fixed` codec, not here.
	#[inline]
	pub fn write_fixed(&mut self, value: &[u8]) {
		self.push_bytes(value);
	}

	/// Raw access for framing code (OCF block headers, sync markers) that
	/// doesn't go through the typed primitives above.
	pub fn write_raw(&mut self, bytes: &[u8]) {
		self.push_bytes(bytes);
	}

	/// Borrow what has been written so far.
	pub fn as_slice(&self) -> &[u8] {
		&self.buf
	}
}

impl std::io::Write for Sink {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		self.push_bytes(buf);
		Ok(buf.len())
	}
	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}

/// A cursor over a borrowed byte slice.
///
/// Every read that would cross the end of the slice fails with
/// [`IoError::UnexpectedEnd`].
#[derive(Debug, Clone, Copy)]
pub struct Source<'a> {
	bytes: &'a [u8],
	pos: usize,
}

/// Failure reading from a [`Source`].
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum IoError {
	/// A read would have crossed the end of the underlying buffer.
	#[error("unexpected end of input at byte offset {offset}")]
	UnexpectedEnd {
		/// Cursor position at the time of the failed read.
		offset: usize,
	},
	/// A varint did not terminate within the expected number of bytes, or
	/// overflowed the target integer width.
	#[error("malformed varint at byte offset {offset}")]
	MalformedVarint {
		/// Cursor position where the varint started.
		offset: usize,
	},
	/// A length prefix (for `bytes`, `string`, a block count, ...) was
	/// negative where only a non-negative length was expected, or otherwise
	/// out of range for this platform.
	#[error("invalid length {length} at byte offset {offset}")]
	InvalidLength {
		/// The offending length.
		length: i64,
		/// Cursor position where the length was read.
		offset: usize,
	},
}

impl<'a> Source<'a> {
	/// Wrap a byte slice for reading from the start.
	pub fn new(bytes: &'a [u8]) -> Self {
		Self { bytes, pos: 0 }
	}

	/// Current cursor offset into the underlying slice.
	pub fn position(&self) -> usize {
		self.pos
	}

	/// Whether every byte of the underlying slice has been consumed.
	pub fn is_at_end(&self) -> bool {
		self.pos >= self.bytes.len()
	}

	/// Remaining, unread bytes.
	pub fn remaining(&self) -> &'a [u8] {
		&self.bytes[self.pos..]
	}

	#[inline]
	fn take(&mut self, n: usize) -> Result<&'a [u8], IoError> {
		let end = self
			.pos
			.checked_add(n)
			.filter(|&end| end <= self.bytes.len())
			.ok_or(IoError::UnexpectedEnd { offset: self.pos })?;
		let slice = &self.bytes[self.pos..end];
		self.pos = end;
		Ok(slice)
	}

	/// `null` has no representation on the wire.
	#[inline]
	pub fn read_null(&mut self) -> Result<(), IoError> {
		Ok(())
	}

	/// Any non-zero byte decodes as `true`.
	#[inline]
	pub fn read_bool(&mut self) -> Result<bool, IoError> {
		let [byte] = self.take(1)?.try_into().expect("take(1) returns 1 byte");
		Ok(byte != 0)
	}

	/// Zig-zag varint, widened from the 64-bit decode.
	#[inline]
	pub fn read_int(&mut self) -> Result<i32, IoError> {
		Ok(self.read_long()? as i32)
	}

	/// Zig-zag varint over a signed 64-bit value.
	#[inline]
	pub fn read_long(&mut self) -> Result<i64, IoError> {
		let start = self.pos;
		// Varints are at most 10 bytes for a 64-bit value; decode against the
		// remaining slice directly rather than pre-scanning continuation bits.
		let remaining = self.remaining();
		let (value, consumed) =
			i64::decode_var(remaining).ok_or(IoError::MalformedVarint { offset: start })?;
		if consumed == 0 {
			return Err(IoError::UnexpectedEnd { offset: start });
		}
		self.pos += consumed;
		Ok(value)
	}

	/// IEEE 754 single precision, little-endian, 4 bytes.
	#[inline]
	pub fn read_float(&mut self) -> Result<f32, IoError> {
		let bytes: [u8; 4] = self.take(4)?.try_into().expect("take(4) returns 4 bytes");
		Ok(f32::from_le_bytes(bytes))
	}

	/// IEEE 754 double precision, little-endian, 8 bytes.
	#[inline]
	pub fn read_double(&mut self) -> Result<f64, IoError> {
		let bytes: [u8; 8] = self.take(8)?.try_into().expect("take(8) returns 8 bytes");
		Ok(f64::from_le_bytes(bytes))
	}

	/// Length-prefixed raw payload.
	#[inline]
	pub fn read_bytes(&mut self) -> Result<&'a [u8], IoError> {
		let offset = self.pos;
		let len = self.read_long()?;
		let len = usize::try_from(len).map_err(|_| IoError::InvalidLength { length: len, offset })?;
		self.take(len)
	}

	/// Length-prefixed payload. UTF-8 validity is not checked here; by Avro
	/// convention `string` payloads are UTF-8, but decode does not enforce it.
	#[inline]
	pub fn read_string_bytes(&mut self) -> Result<&'a [u8], IoError> {
		self.read_bytes()
	}

	/// Raw, unprefixed payload of exactly `size` bytes.
	#[inline]
	pub fn read_fixed(&mut self, size: usize) -> Result<&'a [u8], IoError> {
		self.take(size)
	}

	/// Raw access for framing code that doesn't go through the typed
	/// primitives above (OCF block headers, sync markers).
	pub fn read_raw(&mut self, n: usize) -> Result<&'a [u8], IoError> {
		self.take(n)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zigzag_round_trip_samples() {
		for n in [0i64, -1, 1, -2, 2, -64, 64, i64::MIN, i64::MAX] {
			let mut sink = Sink::new();
			sink.write_long(n);
			let mut source = Source::new(sink.as_slice());
			assert_eq!(source.read_long().unwrap(), n);
		}
	}

	#[test]
	fn zigzag_concrete_bytes() {
		let cases: &[(i32, &[u8])] = &[
			(0, &[0x00]),
			(-1, &[0x01]),
			(1, &[0x02]),
			(-2, &[0x03]),
			(2, &[0x04]),
			(-64, &[0x7F]),
			(64, &[0x80, 0x01]),
		];
		for &(value, expected) in cases {
			let mut sink = Sink::new();
			sink.write_int(value);
			assert_eq!(sink.as_slice(), expected, "value={value}");
		}
	}

	#[test]
	fn string_round_trip_matches_spec_example() {
		let mut sink = Sink::new();
		sink.write_string("Alice");
		assert_eq!(sink.as_slice(), &[0x0A, 0x41, 0x6C, 0x69, 0x63, 0x65]);
		let mut source = Source::new(sink.as_slice());
		assert_eq!(source.read_string_bytes().unwrap(), b"Alice");
	}

	#[test]
	fn bool_any_nonzero_byte_is_true() {
		let mut source = Source::new(&[0x2A]);
		assert!(source.read_bool().unwrap());
	}

	#[test]
	fn reading_past_end_is_unexpected_end() {
		let mut source = Source::new(&[0x01]);
		assert_eq!(source.read_bool(), Ok(true));
		assert_eq!(
			source.read_bool(),
			Err(IoError::UnexpectedEnd { offset: 1 })
		);
	}

	#[test]
	fn fixed_has_no_length_prefix() {
		let mut sink = Sink::new();
		sink.write_fixed(&[1, 2, 3, 4]);
		assert_eq!(sink.as_slice(), &[1, 2, 3, 4]);
	}

	proptest::proptest! {
		#[test]
		fn zigzag_is_a_bijection(n: i64) {
			let mut sink = Sink::new();
			sink.write_long(n);
			let mut source = Source::new(sink.as_slice());
			proptest::prop_assert_eq!(source.read_long().unwrap(), n);
		}

		#[test]
		fn float_round_trips(f: f32) {
			let mut sink = Sink::new();
			sink.write_float(f);
			let mut source = Source::new(sink.as_slice());
			let decoded = source.read_float().unwrap();
			proptest::prop_assert!(decoded.to_bits() == f.to_bits() || (decoded.is_nan() && f.is_nan()));
		}

		#[test]
		fn bytes_round_trip(data: Vec<u8>) {
			let mut sink = Sink::new();
			sink.write_bytes(&data);
			let mut source = Source::new(sink.as_slice());
			proptest::prop_assert_eq!(source.read_bytes().unwrap(), &data[..]);
		}
	}
}
