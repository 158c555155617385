//! Config schema and validation
//!
//! Each device type declares an ordered list of [`SlotDesc`]. A slot has a
//! kind that fixes both its validation rule and how a host value is
//! normalized before being stored:
//!
//! | Kind     | Accepts                                   | Stored as      |
//! |----------|-------------------------------------------|----------------|
//! | Boolean  | anything (truthiness)                     | `Bool`         |
//! | Integer  | numbers                                   | `Int`          |
//! | Float    | numbers                                   | `Float`        |
//! | Option   | index into the name table, or exact name  | `Option(index)`|
//! | Sequence | a byte number, or 1..=max byte numbers    | `Sequence`     |

use heapless::Vec;

use crate::error::DeviceError;
use crate::value::Value;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum config slots per device type
pub const MAX_SLOTS: usize = 8;

/// Maximum elements in a sequence slot
pub const MAX_SEQUENCE_LEN: usize = 16;

/// Stored values for every slot of one device instance, in slot order
pub type ConfigValues = Vec<SlotValue, MAX_SLOTS>;

/// Host-supplied config object: key/value pairs
pub type ConfigObject<'a> = &'a [(&'a str, Value<'a>)];

/// Kind of a config slot, with its default
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotKind {
    /// On/off flag
    Boolean { default: bool },
    /// Integer number
    Integer { default: i32 },
    /// Floating point number
    Float { default: f32 },
    /// One of a fixed set of names
    Option {
        names: &'static [&'static str],
        default: u8,
    },
    /// Up to `max_len` byte values
    Sequence {
        max_len: usize,
        default: &'static [u8],
    },
}

/// One named config slot of a device type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotDesc {
    /// Key used by config objects and `config_get`
    pub name: &'static str,
    /// Kind and default
    pub kind: SlotKind,
}

impl SlotDesc {
    /// Boolean slot
    pub const fn boolean(name: &'static str, default: bool) -> Self {
        Self {
            name,
            kind: SlotKind::Boolean { default },
        }
    }

    /// Integer slot
    pub const fn integer(name: &'static str, default: i32) -> Self {
        Self {
            name,
            kind: SlotKind::Integer { default },
        }
    }

    /// Float slot
    pub const fn float(name: &'static str, default: f32) -> Self {
        Self {
            name,
            kind: SlotKind::Float { default },
        }
    }

    /// Option slot over a name table
    pub const fn option(name: &'static str, names: &'static [&'static str], default: u8) -> Self {
        Self {
            name,
            kind: SlotKind::Option { names, default },
        }
    }

    /// Sequence slot
    pub const fn sequence(name: &'static str, max_len: usize, default: &'static [u8]) -> Self {
        Self {
            name,
            kind: SlotKind::Sequence { max_len, default },
        }
    }

    /// Check that the slot fits the fixed-size storage
    pub fn is_well_formed(&self) -> bool {
        match self.kind {
            SlotKind::Option { names, default } => {
                !names.is_empty() && names.len() <= u8::MAX as usize && (default as usize) < names.len()
            }
            SlotKind::Sequence { max_len, default } => {
                max_len > 0 && max_len <= MAX_SEQUENCE_LEN && default.len() <= max_len
            }
            _ => true,
        }
    }

    /// The slot's declared default
    pub fn default_value(&self) -> SlotValue {
        match self.kind {
            SlotKind::Boolean { default } => SlotValue::Bool(default),
            SlotKind::Integer { default } => SlotValue::Int(default),
            SlotKind::Float { default } => SlotValue::Float(default),
            SlotKind::Option { default, .. } => SlotValue::Option(default),
            SlotKind::Sequence { default, .. } => {
                let mut seq = Vec::new();
                // Length was checked against MAX_SEQUENCE_LEN at registration
                let _ = seq.extend_from_slice(default);
                SlotValue::Sequence(seq)
            }
        }
    }

    /// Validate a host value and normalize it for storage
    ///
    /// Rejected values leave nothing behind; the caller decides whether to
    /// store the result.
    pub fn normalize(&self, value: &Value<'_>) -> Result<SlotValue, DeviceError> {
        match self.kind {
            SlotKind::Boolean { .. } => Ok(SlotValue::Bool(value.truthy())),
            SlotKind::Integer { .. } => value
                .as_int()
                .map(SlotValue::Int)
                .ok_or(DeviceError::InvalidArgument),
            SlotKind::Float { .. } => value
                .as_float()
                .map(SlotValue::Float)
                .ok_or(DeviceError::InvalidArgument),
            SlotKind::Option { names, .. } => match *value {
                Value::Int(index) if index >= 0 && (index as usize) < names.len() => {
                    Ok(SlotValue::Option(index as u8))
                }
                Value::Str(s) => names
                    .iter()
                    .position(|name| *name == s)
                    .map(|index| SlotValue::Option(index as u8))
                    .ok_or(DeviceError::InvalidArgument),
                _ => Err(DeviceError::InvalidArgument),
            },
            SlotKind::Sequence { max_len, .. } => {
                let mut seq: Vec<u8, MAX_SEQUENCE_LEN> = Vec::new();
                match *value {
                    Value::Int(_) | Value::Float(_) => {
                        seq.push(to_byte(value)?)
                            .map_err(|_| DeviceError::InvalidArgument)?;
                    }
                    Value::Array(items) => {
                        if items.is_empty() || items.len() > max_len {
                            return Err(DeviceError::InvalidArgument);
                        }
                        for item in items {
                            seq.push(to_byte(item)?)
                                .map_err(|_| DeviceError::InvalidArgument)?;
                        }
                    }
                    Value::Bytes(bytes) => {
                        if bytes.is_empty() || bytes.len() > max_len {
                            return Err(DeviceError::InvalidArgument);
                        }
                        seq.extend_from_slice(bytes)
                            .map_err(|_| DeviceError::InvalidArgument)?;
                    }
                    _ => return Err(DeviceError::InvalidArgument),
                }
                Ok(SlotValue::Sequence(seq))
            }
        }
    }
}

fn to_byte(value: &Value<'_>) -> Result<u8, DeviceError> {
    value
        .as_int()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or(DeviceError::InvalidArgument)
}

/// A normalized, stored config value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SlotValue {
    /// Boolean slot value
    Bool(bool),
    /// Integer slot value
    Int(i32),
    /// Float slot value
    Float(f32),
    /// Index into the slot's option table
    Option(u8),
    /// Sequence slot elements
    Sequence(Vec<u8, MAX_SEQUENCE_LEN>),
}

impl SlotValue {
    /// Convert back into a host value
    ///
    /// Options come back as their name, so a value set by name or by index
    /// reads back the same way.
    pub fn to_value(&self, desc: &SlotDesc) -> Value<'_> {
        match (self, desc.kind) {
            (SlotValue::Bool(b), _) => Value::Bool(*b),
            (SlotValue::Int(i), _) => Value::Int(*i),
            (SlotValue::Float(f), _) => Value::Float(*f),
            (SlotValue::Option(index), SlotKind::Option { names, .. }) => names
                .get(*index as usize)
                .map(|name| Value::Str(*name))
                .unwrap_or(Value::Int(*index as i32)),
            (SlotValue::Option(index), _) => Value::Int(*index as i32),
            (SlotValue::Sequence(seq), _) => Value::Bytes(seq),
        }
    }

    /// Integer view of numeric, boolean and option values
    ///
    /// Drivers use this when committing a slot to hardware registers.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            SlotValue::Bool(b) => Some(*b as i32),
            SlotValue::Int(i) => Some(*i),
            SlotValue::Float(f) => Some(*f as i32),
            SlotValue::Option(index) => Some(*index as i32),
            SlotValue::Sequence(_) => None,
        }
    }
}

/// Slot addressed by name or by position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKey<'a> {
    /// Slot name
    Name(&'a str),
    /// Slot position in the schema
    Index(usize),
}

impl<'a> From<&'a str> for SlotKey<'a> {
    fn from(name: &'a str) -> Self {
        SlotKey::Name(name)
    }
}

impl From<usize> for SlotKey<'_> {
    fn from(index: usize) -> Self {
        SlotKey::Index(index)
    }
}

impl SlotKey<'_> {
    /// Find the slot position within a schema
    pub fn resolve(&self, slots: &[SlotDesc]) -> Option<usize> {
        match *self {
            SlotKey::Name(name) => slots.iter().position(|slot| slot.name == name),
            SlotKey::Index(index) => (index < slots.len()).then_some(index),
        }
    }
}

/// Default values for every slot of a schema
pub fn defaults(slots: &[SlotDesc]) -> ConfigValues {
    slots.iter().map(SlotDesc::default_value).collect()
}

/// Apply a config object to staged values
///
/// Keys that name no slot are skipped. Every recognized value is validated
/// before anything is written, so on error `values` is left untouched.
pub fn apply_object(
    slots: &[SlotDesc],
    values: &mut ConfigValues,
    object: ConfigObject<'_>,
) -> Result<(), DeviceError> {
    let mut staged = values.clone();
    for (key, value) in object {
        let Some(index) = SlotKey::Name(*key).resolve(slots) else {
            continue;
        };
        let normalized = slots[index].normalize(value)?;
        if let Some(slot) = staged.get_mut(index) {
            *slot = normalized;
        }
    }
    *values = staged;
    Ok(())
}
