use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, convert::TryFrom, fmt};

/// Content of a document, mapping field names to values.
///
/// Which fields are allowed, and what values they may hold, is defined by the
/// document's template (see [`super::template::Schema`]).
pub type Content = BTreeMap<String, FieldValue>;

/// A single value in a document's content.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    /// Integer too large for [`FieldValue::Integer`].
    Unsigned(u64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
    Record(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Is this value absent or blank?
    pub fn is_blank(&self) -> bool {
        match *self {
            FieldValue::Null => true,
            FieldValue::Text(ref text) => text.trim().is_empty(),
            FieldValue::List(ref items) => items.is_empty(),
            FieldValue::Record(ref fields) => fields.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(v) => write!(fmt, "{}", v),
            FieldValue::Integer(v) => write!(fmt, "{}", v),
            FieldValue::Unsigned(v) => write!(fmt, "{}", v),
            FieldValue::Float(v) => write!(fmt, "{}", v),
            FieldValue::Text(ref v) => fmt.write_str(v),
            FieldValue::List(ref items) => {
                for (inx, item) in items.iter().enumerate() {
                    if inx > 0 {
                        fmt.write_str(", ")?;
                    }
                    write!(fmt, "{}", item)?;
                }
                Ok(())
            }
            FieldValue::Record(ref fields) => {
                for (inx, (name, value)) in fields.iter().enumerate() {
                    if inx > 0 {
                        fmt.write_str(", ")?;
                    }
                    write!(fmt, "{}: {}", name, value)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl_from! { for FieldValue ;
    String => |v| FieldValue::Text(v),
    bool => |v| FieldValue::Bool(v),
    i64 => |v| FieldValue::Integer(v),
    u64 => |v| match i64::try_from(v) {
        Ok(v) => FieldValue::Integer(v),
        Err(_) => FieldValue::Unsigned(v),
    },
    f64 => |v| FieldValue::Float(v),
    Vec<FieldValue> => |v| FieldValue::List(v),
}

/// Encode content for storage.
pub fn encode(content: &Content) -> Result<Vec<u8>, rmps::encode::Error> {
    rmps::to_vec_named(content)
}

/// Decode content from storage.
pub fn decode(data: &[u8]) -> Result<Content, rmps::decode::Error> {
    rmps::from_slice(data)
}
