use std::{collections::BTreeMap, fmt};

use prost_types::UninterpretedOption;

/// An opaque mapping of option names to scalar option values.
///
/// Descriptor options are treated as data, not behavior: the recognized scalar
/// fields of the generated `*Options` messages and any uninterpreted options
/// are collected here and compared by value.
#[derive(Debug, Clone, Default)]
pub struct OptionMap {
    entries: BTreeMap<Box<str>, OptionValue>,
}

/// A scalar option value.
///
/// Comparison is strict for the bool, integer and string kinds. Other kinds
/// (and mismatched kinds) fall back to comparing their canonical string form,
/// since arbitrary option payloads have no universal structural equality.
#[derive(Debug, Clone)]
pub enum OptionValue {
    /// A boolean option.
    Bool(bool),
    /// A signed integer option.
    Int(i64),
    /// An unsigned integer option.
    Uint(u64),
    /// A floating point option.
    Double(f64),
    /// A string option.
    String(String),
    /// A bytes option.
    Bytes(Vec<u8>),
}

impl OptionMap {
    pub(crate) fn insert(&mut self, name: impl Into<Box<str>>, value: OptionValue) {
        self.entries.insert(name.into(), value);
    }

    pub(crate) fn insert_uninterpreted(&mut self, options: &[UninterpretedOption]) {
        for option in options {
            let name = option
                .name
                .iter()
                .map(|part| part.name_part.as_str())
                .collect::<Vec<_>>()
                .join(".");
            let value = if let Some(value) = &option.identifier_value {
                match value.as_str() {
                    "true" => OptionValue::Bool(true),
                    "false" => OptionValue::Bool(false),
                    other => OptionValue::String(other.to_owned()),
                }
            } else if let Some(value) = option.positive_int_value {
                OptionValue::Uint(value)
            } else if let Some(value) = option.negative_int_value {
                OptionValue::Int(value)
            } else if let Some(value) = option.double_value {
                OptionValue::Double(value)
            } else if let Some(value) = &option.string_value {
                OptionValue::Bytes(value.clone())
            } else if let Some(value) = &option.aggregate_value {
                OptionValue::String(value.clone())
            } else {
                continue;
            };
            self.insert(name, value);
        }
    }

    /// Returns the value of the option named `name`, if present.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries.get(name)
    }

    /// Returns `true` if no options are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over all options in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(name, value)| (&**name, value))
    }
}

impl PartialEq for OptionMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(name, value)| other.entries.get(name) == Some(value))
    }
}

impl OptionValue {
    /// Returns the value if it is a `Bool`, or `None` otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            OptionValue::Bool(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is an `Int`, or `None` otherwise.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            OptionValue::Int(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `Uint`, or `None` otherwise.
    pub fn as_uint(&self) -> Option<u64> {
        match *self {
            OptionValue::Uint(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the value if it is a `String`, or `None` otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::String(value) => Some(value),
            _ => None,
        }
    }
}

impl PartialEq for OptionValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (OptionValue::Bool(lhs), OptionValue::Bool(rhs)) => lhs == rhs,
            (OptionValue::Int(lhs), OptionValue::Int(rhs)) => lhs == rhs,
            (OptionValue::Uint(lhs), OptionValue::Uint(rhs)) => lhs == rhs,
            (OptionValue::String(lhs), OptionValue::String(rhs)) => lhs == rhs,
            // Mixed-sign integers still have a well defined numeric equality.
            (OptionValue::Int(lhs), OptionValue::Uint(rhs)) => {
                u64::try_from(*lhs).map_or(false, |lhs| lhs == *rhs)
            }
            (OptionValue::Uint(lhs), OptionValue::Int(rhs)) => {
                u64::try_from(*rhs).map_or(false, |rhs| *lhs == rhs)
            }
            (lhs, rhs) => lhs.to_string() == rhs.to_string(),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(value) => write!(f, "{}", value),
            OptionValue::Int(value) => write!(f, "{}", value),
            OptionValue::Uint(value) => write!(f, "{}", value),
            OptionValue::Double(value) => write!(f, "{}", value),
            OptionValue::String(value) => write!(f, "{}", value),
            OptionValue::Bytes(value) => {
                for byte in value {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}
