//! Avro Object Container Files (§4.7, §4.8): a self-describing framing format
//! wrapping a sequence of blocks, each a batch of values serialized with a
//! [`crate::codec::Codec`] and optionally compressed.

pub mod reader;
pub mod writer;

pub use reader::ContainerReader;
pub use writer::{ContainerWriter, ContainerWriterBuilder};

pub(crate) const MAGIC: [u8; 4] = [b'O', b'b', b'j', 0x01];
pub(crate) const SYNC_MARKER_SIZE: usize = 16;
pub(crate) const DEFAULT_SYNC_INTERVAL: usize = 4000;

/// Failure constructing, writing to, or reading from a container file.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	Wire(#[from] crate::io::IoError),
	#[error("not an Avro object container file: bad magic bytes")]
	BadMagic,
	#[error("trailing sync marker did not match the header's")]
	SyncMismatch,
	#[error(transparent)]
	Encode(#[from] crate::codec::EncodeError),
	#[error(transparent)]
	Decode(#[from] crate::codec::DecodeError),
	#[error(transparent)]
	Compression(#[from] crate::compression::CompressionError),
	#[error(transparent)]
	Schema(#[from] crate::schema::json::JsonSchemaError),
	#[error("header is missing the `avro.schema` metadata entry")]
	MissingSchema,
	#[error("block truncated before its declared payload was fully read")]
	MalformedBlock,
}

/// Write the header/block metadata as one Avro `map<bytes>` block: `count as
/// long`, `{key: string, value: bytes}` per entry, terminated by a `0` (§4.7).
pub(crate) fn write_metadata_block(sink: &mut crate::io::Sink, entries: &[(String, Vec<u8>)]) {
	if !entries.is_empty() {
		sink.write_long(entries.len() as i64);
		for (key, value) in entries {
			sink.write_string(key);
			sink.write_bytes(value);
		}
	}
	sink.write_long(0);
}

/// Mirror of [`write_metadata_block`] for the reader side; accepts the same
/// negative-count block form the rest of the crate's block framing does.
pub(crate) fn read_metadata_block(
	source: &mut crate::io::Source,
) -> Result<Vec<(String, Vec<u8>)>, ContainerError> {
	let mut entries = Vec::new();
	loop {
		let raw_count = source.read_long()?;
		if raw_count == 0 {
			return Ok(entries);
		}
		let count = if raw_count < 0 {
			source.read_long()?;
			-raw_count
		} else {
			raw_count
		};
		for _ in 0..count {
			let key = String::from_utf8_lossy(source.read_string_bytes()?).into_owned();
			let value = source.read_bytes()?.to_vec();
			entries.push((key, value));
		}
	}
}
