use std::path::Path;

use linked_hash_map::LinkedHashMap;
use tracing::debug;

use crate::bytestring::ByteString;
use crate::error::{DecodingError, Result};
use crate::source::{BufferSource, ByteSource, FileSource};
use crate::value::{Dictionary, OutputShape, Value};

/// Container nesting allowed unless [`Decoder::with_max_depth`] says otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Single-pass recursive descent decoder over a [`ByteSource`].
///
/// The cursor only moves forward. A decoder is consumed by [`Decoder::decode`].
pub struct Decoder<S> {
    source: S,
    source_len: usize,
    cursor: usize,
    depth: usize,
    shape: OutputShape,
    max_depth: Option<usize>,
}

impl<S: ByteSource> Decoder<S> {
    pub fn new(source: S) -> Decoder<S> {
        Decoder {
            source,
            source_len: 0,
            cursor: 0,
            depth: 0,
            shape: OutputShape::default(),
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }

    pub fn with_shape(mut self, shape: OutputShape) -> Self {
        self.shape = shape;
        self
    }

    /// `None` lifts the nesting ceiling entirely.
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Decodes exactly one entity spanning the whole source.
    pub fn decode(mut self) -> Result<Value> {
        self.source_len = self.source.length()?;
        debug!(
            length = self.source_len,
            shape = ?self.shape,
            max_depth = ?self.max_depth,
            "decoding bencode source"
        );

        let result = self.parse_root();
        if let Err(err) = &result {
            debug!(offset = err.offset(), error = %err, "bencode decode failed");
        }
        result
    }

    fn parse_root(&mut self) -> Result<Value> {
        let value = self.parse_type()?;
        if self.cursor != self.source_len {
            return Err(DecodingError::TrailingData { offset: self.cursor });
        }
        Ok(value.into_shape(self.shape))
    }

    fn parse_type(&mut self) -> Result<Value> {
        let start = self.cursor;
        match self.peek()? {
            Some(b'i') => {
                self.advance();
                self.parse_int(start).map(Value::Integer)
            }
            Some(b'l') => {
                self.advance();
                self.parse_list(start).map(Value::List)
            }
            Some(b'd') => {
                self.advance();
                self.parse_dict(start).map(Value::Dictionary)
            }
            Some(chr) if chr.is_ascii_digit() => self.parse_str().map(Value::ByteString),
            _ => Err(DecodingError::UnknownEntity { offset: start }),
        }
    }

    // Cursor sits just past the 'i' at `start`.
    fn parse_int(&mut self, start: usize) -> Result<i64> {
        let negative = self.peek()? == Some(b'-');
        if negative {
            self.advance();
        }

        let mut first_digit = None;
        let mut digits = 0usize;
        // None once the magnitude no longer fits.
        let mut acc = Some(0i64);
        loop {
            match self.peek()? {
                None => return Err(DecodingError::UnterminatedInteger { offset: start }),
                Some(b'e') => break,
                Some(chr) if chr.is_ascii_digit() => {
                    let digit = i64::from(chr - b'0');
                    acc = acc.and_then(|a| a.checked_mul(10)).and_then(|a| {
                        // Accumulate negatives downwards so i64::MIN fits.
                        if negative {
                            a.checked_sub(digit)
                        } else {
                            a.checked_add(digit)
                        }
                    });
                    if first_digit.is_none() {
                        first_digit = Some(chr);
                    }
                    digits += 1;
                    self.advance();
                }
                Some(_) => return Err(DecodingError::InvalidInteger { offset: self.cursor }),
            }
        }

        match first_digit {
            None => return Err(DecodingError::InvalidInteger { offset: start }),
            Some(b'0') if negative || digits > 1 => {
                return Err(DecodingError::IllegalZeroPadding { offset: start })
            }
            Some(_) => {}
        }
        let value = acc.ok_or(DecodingError::IntegerOverflow { offset: start })?;
        self.advance();
        Ok(value)
    }

    fn parse_str(&mut self) -> Result<ByteString> {
        let start = self.cursor;
        let mut digits = 0usize;
        let mut len = Some(0usize);
        loop {
            match self.peek()? {
                Some(b':') if digits > 0 => break,
                Some(chr) if chr.is_ascii_digit() => {
                    if digits == 1 && len == Some(0) {
                        return Err(DecodingError::IllegalZeroPadding { offset: start });
                    }
                    len = len
                        .and_then(|l| l.checked_mul(10))
                        .and_then(|l| l.checked_add(usize::from(chr - b'0')));
                    digits += 1;
                    self.advance();
                }
                _ => return Err(DecodingError::UnterminatedString { offset: start }),
            }
        }
        self.advance();

        let data_start = self.cursor;
        let (len, end) = len
            .and_then(|l| data_start.checked_add(l).map(|end| (l, end)))
            .filter(|&(_, end)| end <= self.source_len)
            .ok_or(DecodingError::UnexpectedEndOfString { offset: start })?;
        if len == 0 {
            return Ok(ByteString::default());
        }

        let bytes = self.source.read(data_start, len)?.into_owned();
        self.cursor = end;
        Ok(ByteString(bytes))
    }

    // Cursor sits just past the 'l' at `start`.
    fn parse_list(&mut self, start: usize) -> Result<Vec<Value>> {
        self.enter(start)?;
        let mut list = Vec::new();
        loop {
            match self.peek()? {
                None => return Err(DecodingError::UnterminatedList { offset: start }),
                Some(b'e') => break,
                Some(_) => list.push(self.parse_type()?),
            }
        }
        self.advance();
        self.leave();
        Ok(list)
    }

    // Cursor sits just past the 'd' at `start`.
    fn parse_dict(&mut self, start: usize) -> Result<Dictionary> {
        self.enter(start)?;
        let mut dict = LinkedHashMap::new();
        loop {
            let key_offset = self.cursor;
            match self.peek()? {
                None => return Err(DecodingError::UnterminatedDictionary { offset: start }),
                Some(b'e') => break,
                Some(chr) if chr.is_ascii_digit() => {}
                Some(_) => return Err(DecodingError::InvalidDictionaryKey { offset: key_offset }),
            }

            let key = self.parse_str()?;
            if dict.contains_key(&key) {
                return Err(DecodingError::DuplicateDictionaryKey { key, offset: key_offset });
            }
            if self.peek()?.is_none() {
                return Err(DecodingError::UnterminatedDictionary { offset: start });
            }
            let value = self.parse_type()?;
            dict.insert(key, value);
        }
        self.advance();
        self.leave();
        Ok(dict)
    }

    fn enter(&mut self, start: usize) -> Result<()> {
        self.depth += 1;
        match self.max_depth {
            Some(max_depth) if self.depth > max_depth => {
                Err(DecodingError::NestingTooDeep { max_depth, offset: start })
            }
            _ => Ok(()),
        }
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // None at end of input.
    fn peek(&mut self) -> Result<Option<u8>> {
        if self.cursor >= self.source_len {
            return Ok(None);
        }
        self.source.read_byte(self.cursor).map(Some)
    }

    fn advance(&mut self) {
        self.cursor += 1;
    }
}

/// Decodes a whole source into one value.
pub fn decode<S: ByteSource>(source: S, shape: OutputShape) -> Result<Value> {
    Decoder::new(source).with_shape(shape).decode()
}

pub fn decode_bytes(inp: &[u8]) -> Result<Value> {
    decode(BufferSource::new(inp), OutputShape::List)
}

pub fn decode_file<P: AsRef<Path>>(path: P, shape: OutputShape) -> Result<Value> {
    let source = FileSource::open(path).map_err(|e| DecodingError::io(&e, 0))?;
    decode(source, shape)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bytestring::ToByteString;

    fn decoder(inp: &str) -> Decoder<BufferSource<&[u8]>> {
        let mut decoder = Decoder::new(BufferSource::new(inp.as_bytes()));
        decoder.source_len = inp.len();
        decoder
    }

    fn bs(s: &str) -> Value {
        Value::ByteString(s.to_byte_string())
    }

    #[test]
    pub fn peek_and_advance() {
        let mut decoder = decoder("ab");

        assert_eq!(Ok(Some(b'a')), decoder.peek());
        decoder.advance();
        assert_eq!(Ok(Some(b'b')), decoder.peek());
        decoder.advance();
        assert_eq!(Ok(None), decoder.peek());
        assert_eq!(2, decoder.cursor);
    }

    #[test]
    pub fn test_parse_integer() {
        let parse_int = |inp: &str| {
            let mut decoder = decoder(inp);
            (decoder.parse_type(), decoder.cursor)
        };

        assert_eq!((Ok(Value::Integer(123)), 5), parse_int("i123e"));
        assert_eq!((Ok(Value::Integer(-123)), 6), parse_int("i-123e"));
        assert_eq!((Ok(Value::Integer(0)), 3), parse_int("i0e"));
        assert_eq!((Ok(Value::Integer(i64::MAX)), 21), parse_int("i9223372036854775807e"));
        assert_eq!((Ok(Value::Integer(i64::MIN)), 22), parse_int("i-9223372036854775808e"));
        assert_eq!((Err(DecodingError::IntegerOverflow { offset: 0 }), 20), parse_int("i9223372036854775808e"));
        assert_eq!((Err(DecodingError::IntegerOverflow { offset: 0 }), 21), parse_int("i-9223372036854775809e"));
        assert_eq!((Err(DecodingError::IllegalZeroPadding { offset: 0 }), 3), parse_int("i-0e"));
        assert_eq!((Err(DecodingError::IllegalZeroPadding { offset: 0 }), 3), parse_int("i03e"));
        assert_eq!((Err(DecodingError::IllegalZeroPadding { offset: 0 }), 3), parse_int("i00e"));
        assert_eq!((Err(DecodingError::InvalidInteger { offset: 0 }), 1), parse_int("ie"));
        assert_eq!((Err(DecodingError::InvalidInteger { offset: 0 }), 2), parse_int("i-e"));
        assert_eq!((Err(DecodingError::InvalidInteger { offset: 1 }), 1), parse_int("iabc"));
        assert_eq!((Err(DecodingError::InvalidInteger { offset: 2 }), 2), parse_int("i-abc"));
        assert_eq!((Err(DecodingError::InvalidInteger { offset: 3 }), 3), parse_int("i23abc"));
        assert_eq!((Err(DecodingError::InvalidInteger { offset: 2 }), 2), parse_int("i1-2e"));
        assert_eq!((Err(DecodingError::UnterminatedInteger { offset: 0 }), 3), parse_int("i23"));
    }

    #[test]
    pub fn test_parse_string() {
        let parse_string = |inp: &str| {
            let mut decoder = decoder(inp);
            (decoder.parse_type(), decoder.cursor)
        };

        assert_eq!((Ok(bs("abc")), 5), parse_string("3:abc"));
        assert_eq!((Ok(bs("")), 2), parse_string("0:"));
        assert_eq!((Ok(bs("hello world")), 14), parse_string("11:hello world"));
        assert_eq!((Err(DecodingError::IllegalZeroPadding { offset: 0 }), 1), parse_string("05:hello"));
        assert_eq!((Err(DecodingError::IllegalZeroPadding { offset: 0 }), 1), parse_string("00:"));
        assert_eq!((Err(DecodingError::UnterminatedString { offset: 0 }), 1), parse_string("3abc"));
        assert_eq!((Err(DecodingError::UnterminatedString { offset: 0 }), 2), parse_string("12"));
        assert_eq!((Err(DecodingError::UnexpectedEndOfString { offset: 0 }), 2), parse_string("3:ab"));
        assert_eq!((Err(DecodingError::UnexpectedEndOfString { offset: 0 }), 2), parse_string("5:hel"));
        assert_eq!(
            (Err(DecodingError::UnexpectedEndOfString { offset: 0 }), 41),
            parse_string("9999999999999999999999999999999999999999:x")
        );
        assert_eq!((Err(DecodingError::UnknownEntity { offset: 0 }), 0), parse_string("abc"));
    }

    #[test]
    pub fn binary_string() {
        let mut decoder = Decoder::new(BufferSource::new(&b"3:\x00\xff:"[..]));
        decoder.source_len = 5;
        assert_eq!(Ok(Value::ByteString(ByteString(vec![0x00, 0xff, b':']))), decoder.parse_type());
    }

    #[test]
    pub fn test_parse_list() {
        let parse_list = |inp: &str| {
            let mut decoder = decoder(inp);
            (decoder.parse_type(), decoder.cursor)
        };

        assert_eq!((Ok(Value::List(vec![])), 2), parse_list("le"));
        assert_eq!((Ok(Value::List(vec![Value::Integer(123)])), 7), parse_list("li123ee"));
        assert_eq!((Ok(Value::List(vec![bs("abc")])), 7), parse_list("l3:abce"));
        assert_eq!((Ok(Value::List(vec![bs("abc"), bs("defg")])), 13), parse_list("l3:abc4:defge"));
        assert_eq!((Ok(Value::List(vec![Value::List(vec![])])), 4), parse_list("llee"));
        assert_eq!((Ok(Value::List(vec![
            Value::List(vec![Value::List(vec![])]),
            Value::List(vec![Value::List(vec![])]),
        ])), 10), parse_list("llleelleee"));
        assert_eq!((Err(DecodingError::UnterminatedList { offset: 0 }), 6), parse_list("l3:abc"));
        assert_eq!((Err(DecodingError::UnterminatedList { offset: 1 }), 5), parse_list("lli1e"));
        assert_eq!((Err(DecodingError::UnterminatedList { offset: 0 }), 1), parse_list("l"));
        assert_eq!((Err(DecodingError::UnknownEntity { offset: 1 }), 1), parse_list("lxe"));
    }

    #[test]
    pub fn test_parse_dictionary() {
        let parse_dictionary = |inp: &str| {
            let mut decoder = decoder(inp);
            (decoder.parse_type(), decoder.cursor)
        };

        assert_eq!((Ok(Value::Dictionary(LinkedHashMap::new())), 2), parse_dictionary("de"));

        let mut dct = LinkedHashMap::new();
        dct.insert("a".to_byte_string(), Value::Integer(123));
        assert_eq!((Ok(Value::Dictionary(dct)), 10), parse_dictionary("d1:ai123ee"));

        let mut dct = LinkedHashMap::new();
        dct.insert("a".to_byte_string(), Value::List(vec![bs("hey")]));
        dct.insert("b".to_byte_string(), Value::List(vec![]));
        assert_eq!((Ok(Value::Dictionary(dct)), 17), parse_dictionary("d1:al3:heye1:blee"));

        let mut dct = LinkedHashMap::new();
        let mut inner_dct = LinkedHashMap::new();
        inner_dct.insert("a".to_byte_string(), Value::Integer(345));
        inner_dct.insert("b".to_byte_string(), bs("wow"));
        dct.insert("inner".to_byte_string(), Value::Dictionary(inner_dct));
        dct.insert("inner2".to_byte_string(), Value::Dictionary(LinkedHashMap::new()));
        assert_eq!((Ok(Value::Dictionary(dct)), 37), parse_dictionary("d5:innerd1:ai345e1:b3:wowe6:inner2dee"));

        // Unsorted keys are accepted and keep wire order.
        let mut dct = LinkedHashMap::new();
        dct.insert("b".to_byte_string(), Value::Integer(1));
        dct.insert("a".to_byte_string(), Value::Integer(2));
        assert_eq!((Ok(Value::Dictionary(dct)), 14), parse_dictionary("d1:bi1e1:ai2ee"));

        assert_eq!(
            (Err(DecodingError::UnknownEntity { offset: 7 }), 7),
            parse_dictionary("d4:iteme")
        );
        assert_eq!((Err(DecodingError::UnknownEntity { offset: 4 }), 4), parse_dictionary("d1:axe"));
        assert_eq!(
            (Err(DecodingError::DuplicateDictionaryKey { key: "a".to_byte_string(), offset: 7 }), 10),
            parse_dictionary("d1:ai1e1:ai2ee")
        );
        assert_eq!((Err(DecodingError::InvalidDictionaryKey { offset: 1 }), 1), parse_dictionary("di1ei2ee"));
        assert_eq!((Err(DecodingError::UnterminatedDictionary { offset: 0 }), 8), parse_dictionary("d1:a2:bc"));
        assert_eq!((Err(DecodingError::UnterminatedDictionary { offset: 0 }), 4), parse_dictionary("d1:a"));
        assert_eq!((Err(DecodingError::UnterminatedDictionary { offset: 0 }), 1), parse_dictionary("d"));
    }

    #[test]
    pub fn nesting_ceiling() {
        let nested = |depth: usize| format!("{}{}", "l".repeat(depth), "e".repeat(depth));

        let decode_with = |inp: &str, max_depth: Option<usize>| {
            Decoder::new(BufferSource::new(inp.as_bytes()))
                .with_max_depth(max_depth)
                .decode()
        };

        assert!(decode_with(&nested(3), Some(3)).is_ok());
        assert_eq!(
            Err(DecodingError::NestingTooDeep { max_depth: 3, offset: 3 }),
            decode_with(&nested(4), Some(3))
        );
        assert!(decode_with(&nested(DEFAULT_MAX_DEPTH), Some(DEFAULT_MAX_DEPTH)).is_ok());
        assert!(decode_with(&nested(DEFAULT_MAX_DEPTH + 1), None).is_ok());
        assert_eq!(
            Err(DecodingError::NestingTooDeep { max_depth: 0, offset: 0 }),
            decode_with("de", Some(0))
        );
        assert_eq!(Ok(Value::Integer(1)), decode_with("i1e", Some(0)));
    }

    #[test]
    pub fn trailing_data() {
        assert_eq!(Err(DecodingError::TrailingData { offset: 3 }), decode_bytes(b"i1ei2e"));
        assert_eq!(Err(DecodingError::TrailingData { offset: 2 }), decode_bytes(b"lee"));
    }

    #[test]
    pub fn empty_source() {
        assert_eq!(Err(DecodingError::UnknownEntity { offset: 0 }), decode_bytes(b""));
    }

    #[test]
    pub fn map_shape_sorts_after_parsing() {
        let value = decode(BufferSource::new(b"d1:bi1e1:ai2ee"), OutputShape::Map).unwrap();
        let keys: Vec<&[u8]> = value.as_dict().unwrap().keys().map(|k| k.as_bytes()).collect();
        assert_eq!(vec![b"a".as_slice(), b"b".as_slice()], keys);

        // Shape never changes what is rejected.
        assert_eq!(
            Err(DecodingError::DuplicateDictionaryKey { key: "a".to_byte_string(), offset: 7 }),
            decode(BufferSource::new(b"d1:ai1e1:ai2ee"), OutputShape::Map)
        );
    }
}
