//! `avrokit` — a combinator-based Apache Avro codec.
//!
//! Compose a [`codec::Codec`] out of the primitives and combinators in
//! [`codec`] to marshal Rust values to and from the Avro binary wire format.
//! When a value needs to be read back under a schema different from the one
//! it was written with, resolve the two schemas with [`resolve`] and decode
//! through the resulting plan into a dynamic [`value::Value`]. [`ocf`] reads
//! and writes Avro Object Container Files on top of either path.
//!
//! ```
//! use avrokit::codec::{int, record, string};
//!
//! struct Person {
//!     name: String,
//!     age: i32,
//! }
//!
//! let codec = record::<Person, _>("Person", |name| move |age| Person { name, age })
//!     .field("name", string(), |p: &Person| p.name.clone())
//!     .field("age", int(), |p: &Person| p.age)
//!     .finish();
//!
//! let bytes = codec.encode_to_vec(&Person { name: "Alice".into(), age: 30 }).unwrap();
//! let back = codec.decode_from_slice(&bytes).unwrap();
//! assert_eq!(back.name, "Alice");
//! ```

pub mod codec;
pub mod compression;
pub mod error;
pub mod io;
pub mod ocf;
pub mod resolve;
pub mod schema;
pub mod value;

pub use error::Error;
