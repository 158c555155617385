//! Tagged values exchanged with the script host
//!
//! The host converts its own objects into [`Value`] before calling into the
//! core, and receives listener arguments in the same shape. The core only
//! looks at values through the predicates and accessors defined here.

/// A borrowed host value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    /// Absent / undefined
    Null,
    /// Boolean
    Bool(bool),
    /// Integer number
    Int(i32),
    /// Floating point number
    Float(f32),
    /// String
    Str(&'a str),
    /// Array of values
    Array(&'a [Value<'a>]),
    /// Array of byte-range integers
    Bytes(&'a [u8]),
}

impl<'a> Value<'a> {
    /// Check if this is a number (integer or float)
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Check if this is a string
    pub fn is_string(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// Check if this is an array (including byte arrays)
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_) | Value::Bytes(_))
    }

    /// Numeric value as an integer, truncating floats toward zero
    pub fn as_int(&self) -> Option<i32> {
        match *self {
            Value::Int(i) => Some(i),
            Value::Float(f) if f.is_finite() => Some(f as i32),
            _ => None,
        }
    }

    /// Numeric value as a float
    pub fn as_float(&self) -> Option<f32> {
        match *self {
            Value::Int(i) => Some(i as f32),
            Value::Float(f) => Some(f),
            _ => None,
        }
    }

    /// String contents, if this is a string
    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Script-style truthiness
    ///
    /// Null, false, zero, NaN and the empty string are false; everything
    /// else (arrays included, even empty ones) is true.
    pub fn truthy(&self) -> bool {
        match *self {
            Value::Null => false,
            Value::Bool(b) => b,
            Value::Int(i) => i != 0,
            Value::Float(f) => f != 0.0 && !f.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Bytes(_) => true,
        }
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value<'_> {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<f32> for Value<'_> {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Value::Str(s)
    }
}
