//! Keys, key ranges, and scan ordering.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// An engine key.
///
/// Keys are totally ordered: integers sort before strings, strings before
/// binary. Within a variant the natural order of the payload applies.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    /// A signed integer key. Auto-increment generators produce these.
    Int(i64),
    /// A string key.
    Text(String),
    /// A binary key.
    Bytes(Vec<u8>),
}

impl Key {
    /// Interprets a record field as a key, if it has a key-compatible type.
    ///
    /// Integers and strings are valid keys; everything else is not.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Key::Int),
            Value::String(s) => Some(Key::Text(s.clone())),
            _ => None,
        }
    }

    /// Renders the key as a record field value.
    ///
    /// Used when an engine injects a generated key into an in-line-key
    /// record.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Key::Int(i) => Value::from(*i),
            Key::Text(s) => Value::from(s.clone()),
            Key::Bytes(b) => Value::from(b.clone()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{i}"),
            Key::Text(s) => write!(f, "{s:?}"),
            Key::Bytes(b) => {
                write!(f, "0x")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(i64::from(value))
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Text(value)
    }
}

impl From<Vec<u8>> for Key {
    fn from(value: Vec<u8>) -> Self {
        Key::Bytes(value)
    }
}

/// Extracts the key stored at a dotted key path inside a record value.
///
/// Returns `None` if the path is absent or the field is not key-compatible.
#[must_use]
pub fn key_at_path(value: &Value, path: &str) -> Option<Key> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Key::from_value(current)
}

/// Writes `key` at a dotted key path inside a record value.
///
/// Missing intermediate objects are created. Returns `false` if the path
/// runs through a non-object value.
pub(crate) fn inject_at_path(value: &mut Value, path: &str, key: &Key) -> bool {
    let mut current = value;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Some(map) = current.as_object_mut() else {
            return false;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), key.to_value());
            return true;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    false
}

/// Scan ordering for index lookups and cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Order {
    /// Ascending key order.
    #[default]
    Asc,
    /// Descending key order.
    Desc,
}

/// A bounded or unbounded interval over key values.
///
/// Bounds are inclusive by default; either side can be marked open.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyRange {
    lower: Option<Key>,
    upper: Option<Key>,
    lower_open: bool,
    upper_open: bool,
}

impl KeyRange {
    /// The unbounded range matching every key.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// A range matching exactly one key.
    #[must_use]
    pub fn only(key: impl Into<Key>) -> Self {
        let key = key.into();
        Self {
            lower: Some(key.clone()),
            upper: Some(key),
            ..Self::default()
        }
    }

    /// A range bounded below (inclusive).
    #[must_use]
    pub fn at_least(key: impl Into<Key>) -> Self {
        Self {
            lower: Some(key.into()),
            ..Self::default()
        }
    }

    /// A range bounded above (inclusive).
    #[must_use]
    pub fn at_most(key: impl Into<Key>) -> Self {
        Self {
            upper: Some(key.into()),
            ..Self::default()
        }
    }

    /// A range bounded on both sides (inclusive).
    #[must_use]
    pub fn bound(lower: impl Into<Key>, upper: impl Into<Key>) -> Self {
        Self {
            lower: Some(lower.into()),
            upper: Some(upper.into()),
            ..Self::default()
        }
    }

    /// Marks the lower bound as exclusive.
    #[must_use]
    pub fn lower_open(mut self) -> Self {
        self.lower_open = true;
        self
    }

    /// Marks the upper bound as exclusive.
    #[must_use]
    pub fn upper_open(mut self) -> Self {
        self.upper_open = true;
        self
    }

    /// Checks whether `key` lies inside the range.
    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        if let Some(lower) = &self.lower {
            if key < lower || (self.lower_open && key == lower) {
                return false;
            }
        }
        if let Some(upper) = &self.upper {
            if key > upper || (self.upper_open && key == upper) {
                return false;
            }
        }
        true
    }
}
