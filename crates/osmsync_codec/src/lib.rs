//! # osmsync Codec
//!
//! Flat binary record encoding for osmsync spill stores.
//!
//! A record is a tuple of primitives (bool, byte, i32, i64, f64, UTF-8
//! string) written in a fixed order with no field tags and no record
//! framing. Writer and reader must agree on the field order exactly,
//! including any nested sub-records.
//!
//! ## Modes
//!
//! - **Single type**: a stream holds one Rust type and writes no tag.
//! - **Tagged**: a closed enum writes a one-byte class tag from a
//!   [`ClassRegistry`] before its fields. Tags are assigned on first sight
//!   and are scoped to one stream.
//!
//! ## Usage
//!
//! ```
//! use osmsync_codec::{ClassRegistry, RecordReader, RecordWriter, Storeable};
//!
//! let mut registry = ClassRegistry::new();
//! let mut writer = RecordWriter::new(Vec::new());
//! (42i64, String::from("amenity")).store(&mut writer, &mut registry).unwrap();
//! let bytes = writer.into_inner();
//!
//! let mut reader = RecordReader::new(bytes.as_slice());
//! let decoded = <(i64, String)>::load(&mut reader, &registry).unwrap();
//! assert_eq!(decoded, (42, "amenity".to_string()));
//! assert!(reader.is_at_end().unwrap());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod registry;
mod storeable;

pub use decoder::RecordReader;
pub use encoder::RecordWriter;
pub use error::{CodecError, CodecResult};
pub use registry::{ClassRegistry, MAX_CLASS_COUNT};
pub use storeable::Storeable;
