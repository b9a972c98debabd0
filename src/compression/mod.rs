//! The pluggable block compression registry (§4.6).
//!
//! Block compression is keyed by a lowercase name stored in the OCF header's
//! `avro.codec` metadata entry. `null` and `deflate` are always available;
//! `snappy`, `xz`, and `zstandard` register themselves when their Cargo
//! feature is enabled. Callers may [`register`] a replacement or an
//! additional codec at any time — the registry is a process-wide singleton,
//! per §3's "Global compression registry" note.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// Failure compressing or decompressing a block.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CompressionError {
	#[error("no compression codec registered under `{0}`")]
	Unknown(String),
	#[error("`{codec}` codec failed: {message}")]
	Failed { codec: &'static str, message: String },
}

/// A block (de)compression strategy, keyed in the registry by [`name`](Self::name).
pub trait CompressionCodec: Send + Sync {
	/// The lowercase name this codec is registered and looked up under.
	fn name(&self) -> &'static str;
	/// Compress one block's serialized records.
	fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;
	/// Decompress one block's payload back to serialized records.
	fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError>;
}

struct NullCodec;

impl CompressionCodec for NullCodec {
	fn name(&self) -> &'static str {
		"null"
	}
	fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
		Ok(data.to_vec())
	}
	fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
		Ok(data.to_vec())
	}
}

#[cfg(feature = "deflate")]
struct DeflateCodec;

#[cfg(feature = "deflate")]
impl CompressionCodec for DeflateCodec {
	fn name(&self) -> &'static str {
		"deflate"
	}
	fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
		use std::io::Write;
		let mut encoder = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
		encoder
			.write_all(data)
			.map_err(|e| CompressionError::Failed { codec: "deflate", message: e.to_string() })?;
		encoder
			.finish()
			.map_err(|e| CompressionError::Failed { codec: "deflate", message: e.to_string() })
	}
	fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
		use std::io::Read;
		let mut decoder = flate2::read::DeflateDecoder::new(data);
		let mut out = Vec::new();
		decoder
			.read_to_end(&mut out)
			.map_err(|e| CompressionError::Failed { codec: "deflate", message: e.to_string() })?;
		Ok(out)
	}
}

/// Each compressed Snappy block is followed by the 4-byte, big-endian CRC32
/// checksum of the *uncompressed* payload (the Avro spec's Snappy framing).
#[cfg(feature = "snappy")]
struct SnappyCodec;

#[cfg(feature = "snappy")]
impl CompressionCodec for SnappyCodec {
	fn name(&self) -> &'static str {
		"snappy"
	}
	fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
		let mut encoder = snap::raw::Encoder::new();
		let mut out = encoder
			.compress_vec(data)
			.map_err(|e| CompressionError::Failed { codec: "snappy", message: e.to_string() })?;
		out.extend_from_slice(&crc32fast::hash(data).to_be_bytes());
		Ok(out)
	}
	fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
		if data.len() < 4 {
			return Err(CompressionError::Failed {
				codec: "snappy",
				message: "block shorter than the trailing CRC32".to_owned(),
			});
		}
		let (payload, checksum) = data.split_at(data.len() - 4);
		let mut decoder = snap::raw::Decoder::new();
		let out = decoder
			.decompress_vec(payload)
			.map_err(|e| CompressionError::Failed { codec: "snappy", message: e.to_string() })?;
		let expected = u32::from_be_bytes(checksum.try_into().expect("split_at(len-4) leaves 4 bytes"));
		if crc32fast::hash(&out) != expected {
			return Err(CompressionError::Failed {
				codec: "snappy",
				message: "CRC32 checksum mismatch".to_owned(),
			});
		}
		Ok(out)
	}
}

#[cfg(feature = "xz")]
struct XzCodec;

#[cfg(feature = "xz")]
impl CompressionCodec for XzCodec {
	fn name(&self) -> &'static str {
		"xz"
	}
	fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
		use std::io::Write;
		let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
		encoder
			.write_all(data)
			.map_err(|e| CompressionError::Failed { codec: "xz", message: e.to_string() })?;
		encoder
			.finish()
			.map_err(|e| CompressionError::Failed { codec: "xz", message: e.to_string() })
	}
	fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
		use std::io::Read;
		let mut decoder = xz2::read::XzDecoder::new(data);
		let mut out = Vec::new();
		decoder
			.read_to_end(&mut out)
			.map_err(|e| CompressionError::Failed { codec: "xz", message: e.to_string() })?;
		Ok(out)
	}
}

#[cfg(feature = "zstandard")]
struct ZstandardCodec;

#[cfg(feature = "zstandard")]
impl CompressionCodec for ZstandardCodec {
	fn name(&self) -> &'static str {
		"zstandard"
	}
	fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
		zstd::stream::encode_all(data, 0).map_err(|e| CompressionError::Failed {
			codec: "zstandard",
			message: e.to_string(),
		})
	}
	fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
		zstd::stream::decode_all(data).map_err(|e| CompressionError::Failed {
			codec: "zstandard",
			message: e.to_string(),
		})
	}
}

type Registry = Mutex<HashMap<String, Arc<dyn CompressionCodec>>>;

fn registry() -> &'static Registry {
	static REGISTRY: OnceLock<Registry> = OnceLock::new();
	REGISTRY.get_or_init(|| {
		let mut map: HashMap<String, Arc<dyn CompressionCodec>> = HashMap::new();
		map.insert("null".to_owned(), Arc::new(NullCodec));
		#[cfg(feature = "deflate")]
		map.insert("deflate".to_owned(), Arc::new(DeflateCodec));
		#[cfg(feature = "snappy")]
		map.insert("snappy".to_owned(), Arc::new(SnappyCodec));
		#[cfg(feature = "xz")]
		map.insert("xz".to_owned(), Arc::new(XzCodec));
		#[cfg(feature = "zstandard")]
		map.insert("zstandard".to_owned(), Arc::new(ZstandardCodec));
		Mutex::new(map)
	})
}

/// Register (or replace) a codec under its own [`CompressionCodec::name`].
pub fn register(codec: Arc<dyn CompressionCodec>) {
	let name = codec.name().to_owned();
	registry().lock().expect("compression registry poisoned").insert(name, codec);
}

/// Look up a codec by name.
pub fn lookup(name: &str) -> Result<Arc<dyn CompressionCodec>, CompressionError> {
	registry()
		.lock()
		.expect("compression registry poisoned")
		.get(name)
		.cloned()
		.ok_or_else(|| CompressionError::Unknown(name.to_owned()))
}

/// The names currently registered, in no particular order.
pub fn names() -> Vec<String> {
	registry().lock().expect("compression registry poisoned").keys().cloned().collect()
}
