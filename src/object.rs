use crate::{Error, Result};
use indexmap::IndexMap;
use std::fmt;

/// Object identifier consists of two parts: object number and generation number.
pub type ObjectId = (u32, u16);

/// Dictionary value. Preserves key insertion order so re-serialized
/// dictionaries read like the source bytes.
#[derive(Clone, Default, PartialEq)]
pub struct Dictionary(IndexMap<Vec<u8>, Value>);

/// The subset of PDF object types that can appear inside an object's
/// dictionary. Streams never nest here; stream data lives in the document
/// bytes and is addressed through [`crate::ObjectRecord`].
#[derive(Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Name(Vec<u8>),
    String(Vec<u8>),
    Array(Vec<Value>),
    Dictionary(Dictionary),
    Reference(ObjectId),
}

impl Value {
    pub fn enum_variant(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Name(_) => "name",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Dictionary(_) => "dictionary",
            Value::Reference(_) => "reference",
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::Integer(value) => Ok(*value),
            _ => Err(Error::ValueType {
                expected: "integer",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_name(&self) -> Result<&[u8]> {
        match self {
            Value::Name(name) => Ok(name),
            _ => Err(Error::ValueType {
                expected: "name",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_reference(&self) -> Result<ObjectId> {
        match self {
            Value::Reference(id) => Ok(*id),
            _ => Err(Error::ValueType {
                expected: "reference",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_array(&self) -> Result<&[Value]> {
        match self {
            Value::Array(array) => Ok(array),
            _ => Err(Error::ValueType {
                expected: "array",
                found: self.enum_variant(),
            }),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Value::Dictionary(dict) => Ok(dict),
            _ => Err(Error::ValueType {
                expected: "dictionary",
                found: self.enum_variant(),
            }),
        }
    }

    /// Collect the object numbers this value points at.
    ///
    /// A reference yields its own object number, an array yields the numbers
    /// of its reference members (other members are skipped), and every other
    /// value yields nothing. This never fails; callers that need to reject
    /// non-reference shapes check the value first.
    pub fn referenced_objects(&self) -> Vec<u32> {
        match self {
            Value::Reference((number, _)) => vec![*number],
            Value::Array(items) => items
                .iter()
                .filter_map(|item| item.as_reference().ok())
                .map(|(number, _)| number)
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(value) => {
                if *value {
                    f.write_str("true")
                } else {
                    f.write_str("false")
                }
            }
            Value::Integer(value) => write!(f, "{}", *value),
            Value::Real(value) => write!(f, "{}", *value),
            Value::Name(name) => write!(f, "/{}", String::from_utf8_lossy(name)),
            Value::String(text) => write!(f, "({})", String::from_utf8_lossy(text)),
            Value::Array(array) => {
                let items = array.iter().map(|item| format!("{:?}", item)).collect::<Vec<String>>();
                write!(f, "[{}]", items.join(" "))
            }
            Value::Dictionary(dict) => write!(f, "{:?}", dict),
            Value::Reference(id) => write!(f, "{} {} R", id.0, id.1),
        }
    }
}

impl Dictionary {
    pub fn new() -> Dictionary {
        Dictionary(IndexMap::new())
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &[u8]) -> Result<&Value> {
        self.0
            .get(key)
            .ok_or_else(|| Error::MissingKey(String::from_utf8_lossy(key).into_owned()))
    }

    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<Vec<u8>>,
        V: Into<Value>,
    {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.len() == 0
    }

    /// True when the `/Type` entry is a name equal to `type_name`. An absent
    /// or non-name `/Type` is simply not a match, so `/Pages` nodes never
    /// pass a check for `Page`.
    pub fn type_is(&self, type_name: &[u8]) -> bool {
        self.get(b"Type").and_then(Value::as_name).ok() == Some(type_name)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, Vec<u8>, Value> {
        self.0.iter()
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items = self
            .0
            .iter()
            .map(|(key, value)| format!("/{} {:?}", String::from_utf8_lossy(key), value))
            .collect::<Vec<String>>();
        write!(f, "<<{}>>", items.join(" "))
    }
}
