//! OCF writer (§4.7).

use super::{write_metadata_block, ContainerError, DEFAULT_SYNC_INTERVAL, MAGIC, SYNC_MARKER_SIZE};
use crate::codec::Codec;
use crate::compression::{self, CompressionCodec};
use crate::io::Sink;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

/// Configures and opens a [`ContainerWriter`].
///
/// Mirrors the construction-time configuration in §4.7: compression codec
/// (default `null`), user metadata entries, and the block size in records
/// (default 4000) before the FIFO buffer is flushed automatically.
pub struct ContainerWriterBuilder<T> {
	codec: Codec<T>,
	compression: String,
	metadata: Vec<(String, Vec<u8>)>,
	sync_interval: usize,
}

impl<T> ContainerWriterBuilder<T> {
	pub fn new(codec: Codec<T>) -> Self {
		Self {
			codec,
			compression: "null".to_owned(),
			metadata: Vec::new(),
			sync_interval: DEFAULT_SYNC_INTERVAL,
		}
	}

	/// The compression codec name, looked up in [`crate::compression`] at
	/// build time.
	pub fn compression(mut self, name: impl Into<String>) -> Self {
		self.compression = name.into();
		self
	}

	/// Add a user metadata entry to the header, alongside `avro.schema` and
	/// `avro.codec`.
	pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
		self.metadata.push((key.into(), value.into()));
		self
	}

	/// Number of records buffered before a block is flushed automatically.
	pub fn sync_interval(mut self, records: usize) -> Self {
		self.sync_interval = records;
		self
	}

	/// Create (truncating) the file at `path` and write the header.
	pub fn create(self, path: impl AsRef<Path>) -> Result<ContainerWriter<File, T>, ContainerError> {
		let file = File::create(path)?;
		self.build(file)
	}

	/// Write the header to an arbitrary [`Write`] sink.
	pub fn build<W: Write>(self, mut sink: W) -> Result<ContainerWriter<W, T>, ContainerError> {
		let compressor = compression::lookup(&self.compression)?;

		let mut sync_marker = [0u8; SYNC_MARKER_SIZE];
		rand::Rng::fill(&mut rand::thread_rng(), &mut sync_marker);

		let mut header = Sink::new();
		header.write_raw(&MAGIC);

		let mut entries = vec![
			(
				"avro.schema".to_owned(),
				crate::schema::json::print_full(self.codec.schema()).into_bytes(),
			),
			("avro.codec".to_owned(), self.compression.clone().into_bytes()),
		];
		entries.extend(self.metadata);
		write_metadata_block(&mut header, &entries);
		header.write_raw(&sync_marker);

		sink.write_all(header.as_slice())?;

		tracing::debug!(
			compression = %self.compression,
			sync_interval = self.sync_interval,
			"opened Avro object container file for writing"
		);

		Ok(ContainerWriter {
			sink,
			codec: self.codec,
			compressor,
			sync_marker,
			sync_interval: self.sync_interval,
			pending: Vec::new(),
		})
	}
}

/// An open container file, buffering records and flushing them as blocks
/// (§4.7).
pub struct ContainerWriter<W: Write, T> {
	sink: W,
	codec: Codec<T>,
	compressor: Arc<dyn CompressionCodec>,
	sync_marker: [u8; SYNC_MARKER_SIZE],
	sync_interval: usize,
	pending: Vec<T>,
}

impl<W: Write, T> ContainerWriter<W, T> {
	/// Buffer `value`, flushing automatically once the buffer reaches the
	/// configured `sync_interval`.
	pub fn write(&mut self, value: T) -> Result<(), ContainerError> {
		self.pending.push(value);
		if self.pending.len() >= self.sync_interval {
			self.flush_block()?;
		}
		Ok(())
	}

	/// Flush any pending buffer, then emit exactly one block containing
	/// `values`.
	pub fn write_block(&mut self, values: impl IntoIterator<Item = T>) -> Result<(), ContainerError> {
		self.flush_block()?;
		self.pending.extend(values);
		self.flush_block()
	}

	/// Serialize and compress the pending buffer into one block; a no-op if
	/// nothing is pending.
	fn flush_block(&mut self) -> Result<(), ContainerError> {
		if self.pending.is_empty() {
			return Ok(());
		}
		let mut body = Sink::new();
		for value in &self.pending {
			self.codec.encode(value, &mut body)?;
		}
		let compressed = self.compressor.compress(body.as_slice())?;

		let mut block = Sink::new();
		block.write_long(self.pending.len() as i64);
		block.write_long(compressed.len() as i64);
		block.write_raw(&compressed);
		block.write_raw(&self.sync_marker);
		self.sink.write_all(block.as_slice())?;

		tracing::trace!(
			record_count = self.pending.len(),
			compressed_size = compressed.len(),
			"flushed Avro container block"
		);

		self.pending.clear();
		Ok(())
	}

	/// Flush any pending buffer, flush the underlying sink, and return it.
	pub fn close(mut self) -> Result<W, ContainerError> {
		self.flush_block()?;
		self.sink.flush()?;
		Ok(self.sink)
	}

	/// Borrow the underlying sink, e.g. to inspect bytes written so far.
	pub fn get_ref(&self) -> &W {
		&self.sink
	}
}
