//! The crate-wide error type (§3 "Error handling").
//!
//! Every fallible operation in `avrokit` has its own narrow error enum
//! (`io::IoError`, `schema::SchemaError`, `codec::EncodeError`/`DecodeError`,
//! `resolve::ResolutionError`, `compression::CompressionError`,
//! `ocf::ContainerError`, ...); this one exists only to give callers a single
//! type to propagate with `?` across module boundaries without naming each
//! source error at every call site.

use crate::codec::{DecodeError as CodecDecodeError, EncodeError as CodecEncodeError};
use crate::compression::CompressionError;
use crate::io::IoError;
use crate::ocf::ContainerError;
use crate::resolve::decode::DecodeError as ResolveDecodeError;
use crate::resolve::ResolutionError;
use crate::schema::json::JsonSchemaError;
use crate::schema::SchemaError;

/// The union of every error this crate can produce.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] IoError),
	#[error(transparent)]
	Schema(#[from] SchemaError),
	#[error(transparent)]
	JsonSchema(#[from] JsonSchemaError),
	#[error(transparent)]
	Encode(#[from] CodecEncodeError),
	#[error(transparent)]
	Decode(#[from] CodecDecodeError),
	#[error(transparent)]
	Resolution(#[from] ResolutionError),
	#[error(transparent)]
	ResolvedDecode(#[from] ResolveDecodeError),
	#[error(transparent)]
	Compression(#[from] CompressionError),
	#[error(transparent)]
	Container(#[from] ContainerError),
}
