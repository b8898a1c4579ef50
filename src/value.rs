use linked_hash_map::LinkedHashMap;

use crate::bytestring::ByteString;

/// Dictionary entries in the order they were decoded or inserted.
pub type Dictionary = LinkedHashMap<ByteString, Value>;

/// How containers are materialized once parsing is done.
///
/// Parsing accepts and rejects exactly the same inputs either way.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum OutputShape {
    /// Dictionaries keep their entries in wire order.
    #[default]
    List,
    /// Dictionaries are rebuilt in byte-wise sorted key order, at every depth.
    Map,
}

/// A decoded bencode value.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Value {
    Integer(i64),
    ByteString(ByteString),
    List(Vec<Value>),
    Dictionary(Dictionary),
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::ByteString(ByteString::from(s))
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::ByteString(bs) => Some(bs.as_bytes()),
            _ => None,
        }
    }

    /// The byte string as UTF-8, if it is one and is valid.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Value::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn into_dict(self) -> Option<Dictionary> {
        match self {
            Value::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Looks up `key` if this is a dictionary.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.as_dict()?.get(key)
    }

    /// Materializes containers in `shape`, recursing through lists and dictionaries.
    pub fn into_shape(self, shape: OutputShape) -> Value {
        match shape {
            OutputShape::List => self,
            OutputShape::Map => self.into_sorted(),
        }
    }

    fn into_sorted(self) -> Value {
        match self {
            Value::List(list) => Value::List(list.into_iter().map(Value::into_sorted).collect()),
            Value::Dictionary(dict) => {
                let mut entries: Vec<(ByteString, Value)> = dict.into_iter().collect();
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                Value::Dictionary(
                    entries
                        .into_iter()
                        .map(|(key, value)| (key, value.into_sorted()))
                        .collect(),
                )
            }
            scalar => scalar,
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<ByteString> for Value {
    fn from(bs: ByteString) -> Self {
        Value::ByteString(bs)
    }
}

impl From<Vec<Value>> for Value {
    fn from(list: Vec<Value>) -> Self {
        Value::List(list)
    }
}

impl From<Dictionary> for Value {
    fn from(dict: Dictionary) -> Self {
        Value::Dictionary(dict)
    }
}
