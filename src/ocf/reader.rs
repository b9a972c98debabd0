//! OCF reader (§4.8).

use super::{read_metadata_block, ContainerError, MAGIC, SYNC_MARKER_SIZE};
use crate::codec::Codec;
use crate::compression::{self, CompressionCodec};
use crate::io::Source;
use crate::schema::Schema;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// An open container file. Owns its source bytes and a per-stream
/// decompressor; both are released when the reader is dropped (§3
/// "Lifecycles").
pub struct ContainerReader<T> {
	bytes: Vec<u8>,
	pos: usize,
	codec: Codec<T>,
	compressor: Arc<dyn CompressionCodec>,
	compression_name: String,
	sync_marker: [u8; SYNC_MARKER_SIZE],
	writer_schema: Schema,
	metadata: Vec<(String, Vec<u8>)>,
}

impl<T> ContainerReader<T> {
	/// Open a container file already fully read into memory.
	pub fn from_bytes(bytes: Vec<u8>, codec: Codec<T>) -> Result<Self, ContainerError> {
		let pos;
		let writer_schema;
		let compression_name;
		let compressor;
		let sync_marker;
		let metadata;
		{
			let mut source = Source::new(&bytes);
			if source.read_raw(MAGIC.len())? != MAGIC {
				return Err(ContainerError::BadMagic);
			}
			let mut entries: HashMap<String, Vec<u8>> =
				read_metadata_block(&mut source)?.into_iter().collect();

			let schema_bytes = entries
				.remove("avro.schema")
				.ok_or(ContainerError::MissingSchema)?;
			writer_schema = crate::schema::json::parse(&String::from_utf8_lossy(&schema_bytes))?;

			compression_name = entries
				.remove("avro.codec")
				.map(|b| String::from_utf8_lossy(&b).into_owned())
				.unwrap_or_else(|| "null".to_owned());
			compressor = compression::lookup(&compression_name).inspect_err(|_| {
				tracing::warn!(codec = %compression_name, "unknown compression codec in container header");
			})?;

			let marker_bytes = source.read_raw(SYNC_MARKER_SIZE)?;
			sync_marker = marker_bytes
				.try_into()
				.expect("read_raw(SYNC_MARKER_SIZE) returns exactly that many bytes");

			metadata = entries.into_iter().collect();
			pos = source.position();
		}

		tracing::debug!(
			compression = %compression_name,
			fingerprint = %writer_schema.fingerprint(),
			"opened Avro object container file for reading"
		);

		Ok(Self {
			bytes,
			pos,
			codec,
			compressor,
			compression_name,
			sync_marker,
			writer_schema,
			metadata,
		})
	}

	/// Open a container file from disk.
	pub fn open(path: impl AsRef<Path>, codec: Codec<T>) -> Result<Self, ContainerError> {
		let bytes = std::fs::read(path)?;
		Self::from_bytes(bytes, codec)
	}

	/// The writer's schema, as recorded in the header.
	pub fn writer_schema(&self) -> &Schema {
		&self.writer_schema
	}

	/// The compression codec name in effect for this file.
	pub fn codec_name(&self) -> &str {
		&self.compression_name
	}

	/// All metadata entries besides `avro.schema` and `avro.codec`.
	pub fn metadata(&self) -> &[(String, Vec<u8>)] {
		&self.metadata
	}

	/// Read and decode the next block, or `None` at end of file (§4.8).
	pub fn read_block(&mut self) -> Result<Option<Vec<T>>, ContainerError> {
		if self.pos >= self.bytes.len() {
			return Ok(None);
		}
		let mut source = Source::new(&self.bytes[self.pos..]);
		let count = source.read_long().map_err(|_| ContainerError::MalformedBlock)?;
		let compressed_size = source.read_long().map_err(|_| ContainerError::MalformedBlock)?;
		let compressed = source
			.read_raw(compressed_size as usize)
			.map_err(|_| ContainerError::MalformedBlock)?;
		let decompressed = self.compressor.decompress(compressed)?;
		let marker = source
			.read_raw(SYNC_MARKER_SIZE)
			.map_err(|_| ContainerError::MalformedBlock)?;
		if marker != self.sync_marker {
			tracing::warn!("sync marker mismatch while reading Avro container block");
			return Err(ContainerError::SyncMismatch);
		}
		self.pos += source.position();

		let mut body = Source::new(&decompressed);
		let mut out = Vec::with_capacity(count.max(0) as usize);
		for _ in 0..count {
			out.push(self.codec.decode(&mut body)?);
		}
		tracing::trace!(record_count = out.len(), compressed_size, "read Avro container block");
		Ok(Some(out))
	}

	/// Apply `f` to each record, block by block, freeing each block's
	/// allocation before reading the next (§4.8 `iter`).
	pub fn iter(&mut self, mut f: impl FnMut(T) -> Result<(), ContainerError>) -> Result<(), ContainerError> {
		while let Some(block) = self.read_block()? {
			for value in block {
				f(value)?;
			}
		}
		Ok(())
	}

	/// Fold over every record across the whole file (§4.8 `fold`).
	pub fn fold<A>(
		&mut self,
		init: A,
		mut f: impl FnMut(A, T) -> A,
	) -> Result<A, ContainerError> {
		let mut acc = init;
		while let Some(block) = self.read_block()? {
			for value in block {
				acc = f(acc, value);
			}
		}
		Ok(acc)
	}

	/// Apply `f` to each whole decoded block (§4.8 `iter_blocks`).
	pub fn iter_blocks(
		&mut self,
		mut f: impl FnMut(&[T]) -> Result<(), ContainerError>,
	) -> Result<(), ContainerError> {
		while let Some(block) = self.read_block()? {
			f(&block)?;
		}
		Ok(())
	}

	/// Turn this reader into a lazy, one-record-at-a-time [`Iterator`]; block
	/// boundaries are internal (§4.8 `to_sequence`). Early termination (e.g.
	/// `.take(n)` followed by a drop) leaves the remainder of the file
	/// unread.
	pub fn to_sequence(self) -> Sequence<T> {
		Sequence {
			reader: self,
			current: Vec::new().into_iter(),
		}
	}
}

/// Iterator returned by [`ContainerReader::to_sequence`].
pub struct Sequence<T> {
	reader: ContainerReader<T>,
	current: std::vec::IntoIter<T>,
}

impl<T> Iterator for Sequence<T> {
	type Item = Result<T, ContainerError>;

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			if let Some(value) = self.current.next() {
				return Some(Ok(value));
			}
			match self.reader.read_block() {
				Ok(Some(block)) => self.current = block.into_iter(),
				Ok(None) => return None,
				Err(e) => return Some(Err(e)),
			}
		}
	}
}
