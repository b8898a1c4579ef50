//! Strict bencode decoding over random-access byte sources.
//!
//! ```
//! use bendec::{decode, decode_bytes, BufferSource, OutputShape, Value};
//!
//! let value = decode_bytes(b"d3:cow3:moo4:spam4:eggse").unwrap();
//! assert_eq!(value.get(b"cow").and_then(Value::as_str), Some("moo"));
//!
//! let value = decode(BufferSource::new(b"l4:spami42ee"), OutputShape::List).unwrap();
//! assert_eq!(value.as_list().map(|l| l.len()), Some(2));
//! ```
//!
//! Malformed input is rejected outright with a [`DecodingError`] carrying the
//! offending offset; no partial value is ever returned.

mod bdecode;
mod bencode;
mod bytestring;
mod error;
mod source;
mod value;

pub use bdecode::{decode, decode_bytes, decode_file, Decoder, DEFAULT_MAX_DEPTH};
pub use bencode::encode;
pub use bytestring::{ByteString, ToByteString};
pub use error::{DecodingError, Result};
pub use source::{BufferSource, ByteSource, FileSource};
pub use value::{Dictionary, OutputShape, Value};
