//! Typed key/value pairs attached to a record.
//!
//! A `Field` borrows its key and any string or blob payload; it lives only as
//! long as the call that encodes it. The value is a sum type with one payload
//! per wire tag, so there is no way to read the wrong variant.

/// Wire tag identifying the type of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldType {
    Int = 0,
    Uint = 1,
    Float32 = 2,
    Float64 = 3,
    String = 4,
    Bool = 5,
    Bytes = 6,
}

impl FieldType {
    #[inline]
    pub const fn from_u8(tag: u8) -> Option<FieldType> {
        match tag {
            0 => Some(FieldType::Int),
            1 => Some(FieldType::Uint),
            2 => Some(FieldType::Float32),
            3 => Some(FieldType::Float64),
            4 => Some(FieldType::String),
            5 => Some(FieldType::Bool),
            6 => Some(FieldType::Bytes),
            _ => None,
        }
    }

    /// Size of the fixed value slot, or `None` for length-prefixed payloads.
    #[inline]
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            FieldType::Int | FieldType::Uint | FieldType::Float64 | FieldType::Bool => Some(8),
            FieldType::Float32 => Some(4),
            FieldType::String | FieldType::Bytes => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Int(i64),
    Uint(u64),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    /// String payload. Kept as bytes because truncation may split a UTF-8
    /// sequence; renderers write the bytes through unchanged.
    Str(&'a [u8]),
    Bytes(&'a [u8]),
}

impl<'a> Value<'a> {
    #[inline]
    pub const fn field_type(&self) -> FieldType {
        match self {
            Value::Int(_) => FieldType::Int,
            Value::Uint(_) => FieldType::Uint,
            Value::Float32(_) => FieldType::Float32,
            Value::Float64(_) => FieldType::Float64,
            Value::Bool(_) => FieldType::Bool,
            Value::Str(_) => FieldType::String,
            Value::Bytes(_) => FieldType::Bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field<'a> {
    pub key: &'a [u8],
    pub value: Value<'a>,
}

impl<'a> Field<'a> {
    #[inline]
    pub const fn new(key: &'a str, value: Value<'a>) -> Self {
        Self { key: key.as_bytes(), value }
    }

    #[inline]
    pub const fn int(key: &'a str, value: i64) -> Self {
        Self::new(key, Value::Int(value))
    }

    #[inline]
    pub const fn uint(key: &'a str, value: u64) -> Self {
        Self::new(key, Value::Uint(value))
    }

    #[inline]
    pub const fn float32(key: &'a str, value: f32) -> Self {
        Self::new(key, Value::Float32(value))
    }

    #[inline]
    pub const fn float64(key: &'a str, value: f64) -> Self {
        Self::new(key, Value::Float64(value))
    }

    #[inline]
    pub const fn bool(key: &'a str, value: bool) -> Self {
        Self::new(key, Value::Bool(value))
    }

    #[inline]
    pub const fn str(key: &'a str, value: &'a str) -> Self {
        Self::new(key, Value::Str(value.as_bytes()))
    }

    #[inline]
    pub const fn bytes(key: &'a str, value: &'a [u8]) -> Self {
        Self::new(key, Value::Bytes(value))
    }

    #[inline]
    pub const fn field_type(&self) -> FieldType {
        self.value.field_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_match_wire_values() {
        for tag in 0..=6u8 {
            assert_eq!(FieldType::from_u8(tag).map(|t| t as u8), Some(tag));
        }
        assert_eq!(FieldType::from_u8(7), None);
    }

    #[test]
    fn test_constructors() {
        assert_eq!(Field::int("a", -1).field_type(), FieldType::Int);
        assert_eq!(Field::uint("a", 1).field_type(), FieldType::Uint);
        assert_eq!(Field::float32("a", 1.0).field_type(), FieldType::Float32);
        assert_eq!(Field::float64("a", 1.0).field_type(), FieldType::Float64);
        assert_eq!(Field::bool("a", true).field_type(), FieldType::Bool);
        assert_eq!(Field::str("a", "b").field_type(), FieldType::String);
        assert_eq!(Field::bytes("a", b"b").field_type(), FieldType::Bytes);
        assert_eq!(Field::str("key", "v").key, b"key");
    }
}
