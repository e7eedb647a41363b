//! Low-level byte cursor primitives for the NBL codec.
//!
//! This crate provides bounded [`ByteReader`] and [`ByteWriter`] for
//! little-endian binary encoding and decoding, plus length-prefixed UTF-8
//! strings. It is designed for bounded, panic-free operation with explicit
//! error handling.
//!
//! # Design Principles
//!
//! - **No unsafe code** - Safety is paramount.
//! - **Bounded operations** - All reads are bounds-checked.
//! - **No domain knowledge** - This crate knows nothing about particles,
//!   frames, or containers.
//! - **Explicit errors** - All failures return structured errors, never
//!   panic.
//!
//! # Example
//!
//! ```
//! use nbl_bytes::{ByteReader, ByteWriter};
//!
//! let mut writer = ByteWriter::new();
//! writer.write_u32(42);
//! writer.write_string("flame").unwrap();
//!
//! let bytes = writer.finish();
//!
//! let mut reader = ByteReader::new(&bytes);
//! assert_eq!(reader.read_u32().unwrap(), 42);
//! assert_eq!(reader.read_string().unwrap(), "flame");
//! ```

mod error;
mod reader;
mod writer;

pub use error::{ByteError, ByteResult};
pub use reader::ByteReader;
pub use writer::ByteWriter;
