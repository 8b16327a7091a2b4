//! Binary wire format for log records.
//!
//! Layout of one record:
//!
//! ```text
//! magic(4, LE) | version(1) | level(1) | sequence(8, LE) | timestamp(8, LE)
//! message_len(1) | message
//! field_count(1) | fields...
//! ```
//!
//! and of one field:
//!
//! ```text
//! key_len(1) | key | type_tag(1) | value
//! ```
//!
//! where the value is 8 bytes for int/uint/float64/bool, 4 bytes for float32
//! and `len(2) | payload` for strings and byte blobs. Header integers are
//! little-endian while every integer in the value section is big-endian. The
//! asymmetry is part of the format and must be kept for compatibility with
//! existing log files.
//!
//! Encoding never allocates and never fails: anything that does not fit the
//! caller's buffer (or exceeds a length cap) is truncated or dropped.

use crate::error::DecodeError;
use crate::field::{Field, FieldType, Value};
use crate::level::Level;

/// "ULOG" read as a little-endian u32.
pub const MAGIC: u32 = 0x554C_4F47;
pub const VERSION: u8 = 1;
pub const HEADER_SIZE: usize = 22;

pub const MAX_MESSAGE_LEN: usize = u8::MAX as usize;
pub const MAX_KEY_LEN: usize = u8::MAX as usize;
pub const MAX_FIELDS: usize = u8::MAX as usize;
pub const MAX_VALUE_LEN: usize = u16::MAX as usize;

/// Smallest buffer `encode` will write into: header, message length and
/// field count.
pub const MIN_RECORD_SIZE: usize = HEADER_SIZE + 2;

/// Encodes one record into `buf` and returns the number of bytes written.
///
/// The message is capped at 255 bytes, at most 255 fields are written, and
/// fields that no longer fit the buffer are dropped together with every field
/// after them. The field-count byte always reflects the fields actually
/// written. Returns 0 if `buf` is shorter than [`MIN_RECORD_SIZE`].
pub fn encode(
    buf: &mut [u8],
    level: Level,
    sequence: u64,
    timestamp: u64,
    message: &[u8],
    fields: &[Field<'_>],
) -> usize {
    if buf.len() < MIN_RECORD_SIZE {
        return 0;
    }

    let mut pos = write_header(buf, level, sequence, timestamp);

    // Keep one byte back for the field count.
    let msg_len = message.len().min(MAX_MESSAGE_LEN).min(buf.len() - pos - 2);
    buf[pos] = msg_len as u8;
    pos += 1;
    buf[pos..pos + msg_len].copy_from_slice(&message[..msg_len]);
    pos += msg_len;

    let count_pos = pos;
    pos += 1;

    let mut written = 0u8;
    for field in fields.iter().take(MAX_FIELDS) {
        match encode_field(&mut buf[pos..], field) {
            Some(n) => {
                pos += n;
                written += 1;
            }
            None => break,
        }
    }
    buf[count_pos] = written;

    pos
}

#[inline]
fn write_header(buf: &mut [u8], level: Level, sequence: u64, timestamp: u64) -> usize {
    buf[0..4].copy_from_slice(&MAGIC.to_le_bytes());
    buf[4] = VERSION;
    buf[5] = level.as_u8();
    buf[6..14].copy_from_slice(&sequence.to_le_bytes());
    buf[14..22].copy_from_slice(&timestamp.to_le_bytes());
    HEADER_SIZE
}

/// Writes one field, or returns `None` without touching `out` if the key, tag
/// and fixed part of the value do not fit.
fn encode_field(out: &mut [u8], field: &Field<'_>) -> Option<usize> {
    let key_len = field.key.len().min(MAX_KEY_LEN);
    let value_min = field.field_type().fixed_size().unwrap_or(2);
    if out.len() < 1 + key_len + 1 + value_min {
        return None;
    }

    let mut pos = 0;
    out[pos] = key_len as u8;
    pos += 1;
    out[pos..pos + key_len].copy_from_slice(&field.key[..key_len]);
    pos += key_len;
    out[pos] = field.field_type() as u8;
    pos += 1;

    match field.value {
        Value::Int(v) => pos += put_u64(&mut out[pos..], v as u64),
        Value::Uint(v) => pos += put_u64(&mut out[pos..], v),
        Value::Bool(v) => pos += put_u64(&mut out[pos..], v as u64),
        Value::Float64(v) => pos += put_u64(&mut out[pos..], v.to_bits()),
        Value::Float32(v) => {
            out[pos..pos + 4].copy_from_slice(&v.to_bits().to_be_bytes());
            pos += 4;
        }
        Value::Str(data) | Value::Bytes(data) => {
            let len = data.len().min(MAX_VALUE_LEN).min(out.len() - pos - 2);
            out[pos..pos + 2].copy_from_slice(&(len as u16).to_be_bytes());
            pos += 2;
            out[pos..pos + len].copy_from_slice(&data[..len]);
            pos += len;
        }
    }

    Some(pos)
}

#[inline]
fn put_u64(out: &mut [u8], v: u64) -> usize {
    out[..8].copy_from_slice(&v.to_be_bytes());
    8
}

/// A record decoded in place; message and field data borrow from the input.
#[derive(Debug, Clone, Copy)]
pub struct DecodedRecord<'a> {
    pub version: u8,
    pub raw_level: u8,
    pub sequence: u64,
    pub timestamp: u64,
    pub message: &'a [u8],
    /// `None` when the record ends before the field-count byte.
    pub field_count: Option<u8>,
    bytes: &'a [u8],
    fields_start: usize,
}

impl<'a> DecodedRecord<'a> {
    /// Level of the record, or `None` if the level byte is out of range.
    #[inline]
    pub fn level(&self) -> Option<Level> {
        Level::from_u8(self.raw_level)
    }

    #[inline]
    pub fn has_fields(&self) -> bool {
        matches!(self.field_count, Some(n) if n > 0)
    }

    /// Iterates the record's fields in insertion order.
    pub fn fields(&self) -> FieldIter<'a> {
        FieldIter {
            buf: self.bytes,
            pos: self.fields_start,
            remaining: self.field_count.unwrap_or(0),
            done: false,
        }
    }

    /// Number of input bytes the record occupies, as far as it could be parsed.
    ///
    /// For a record with a torn field section this stops where parsing stopped.
    pub fn encoded_len(&self) -> usize {
        let mut fields = self.fields();
        while fields.next().is_some() {}
        fields.pos
    }
}

/// Decodes the record at the start of `bytes`.
///
/// Only structural header problems are errors. A message or field section cut
/// short by the end of the input is tolerated: the message is clamped and the
/// field iterator reports the damaged field as [`MalformedField`].
pub fn decode(bytes: &[u8]) -> Result<DecodedRecord<'_>, DecodeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DecodeError::TooShort { len: bytes.len() });
    }

    let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if magic != MAGIC {
        return Err(DecodeError::BadMagic { found: magic });
    }
    let version = bytes[4];
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }

    let raw_level = bytes[5];
    let sequence = read_u64_le(&bytes[6..14]);
    let timestamp = read_u64_le(&bytes[14..22]);

    let mut pos = HEADER_SIZE;
    let mut message: &[u8] = &[];
    if pos < bytes.len() {
        let len = bytes[pos] as usize;
        pos += 1;
        let end = (pos + len).min(bytes.len());
        message = &bytes[pos..end];
        pos = end;
    }

    let mut field_count = None;
    if pos < bytes.len() {
        field_count = Some(bytes[pos]);
        pos += 1;
    }

    Ok(DecodedRecord {
        version,
        raw_level,
        sequence,
        timestamp,
        message,
        field_count,
        bytes,
        fields_start: pos,
    })
}

#[inline]
fn read_u64_le(b: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&b[..8]);
    u64::from_le_bytes(raw)
}

#[inline]
fn read_u64_be(b: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&b[..8]);
    u64::from_be_bytes(raw)
}

/// A field whose value could not be read: unknown tag or not enough bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedField<'a> {
    pub key: &'a [u8],
}

/// Lazy iterator over the field section of a [`DecodedRecord`].
///
/// Iteration stops after the first malformed field since the position of
/// anything that follows it is unknown.
#[derive(Debug, Clone)]
pub struct FieldIter<'a> {
    buf: &'a [u8],
    pos: usize,
    remaining: u8,
    done: bool,
}

impl<'a> FieldIter<'a> {
    fn malformed(&mut self, key: &'a [u8]) -> Option<Result<Field<'a>, MalformedField<'a>>> {
        self.done = true;
        Some(Err(MalformedField { key }))
    }
}

impl<'a> Iterator for FieldIter<'a> {
    type Item = Result<Field<'a>, MalformedField<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let buf = self.buf;
        let mut pos = self.pos;
        if pos >= buf.len() {
            self.done = true;
            return None;
        }

        let key_len = buf[pos] as usize;
        pos += 1;
        if pos + key_len > buf.len() {
            self.done = true;
            return None;
        }
        let key = &buf[pos..pos + key_len];
        pos += key_len;
        self.pos = pos;

        if pos >= buf.len() {
            return self.malformed(key);
        }
        let Some(field_type) = FieldType::from_u8(buf[pos]) else {
            self.pos = pos + 1;
            return self.malformed(key);
        };
        pos += 1;
        self.pos = pos;

        let value = match field_type.fixed_size() {
            Some(size) => {
                if pos + size > buf.len() {
                    return self.malformed(key);
                }
                let raw = &buf[pos..pos + size];
                pos += size;
                match field_type {
                    FieldType::Int => Value::Int(read_u64_be(raw) as i64),
                    FieldType::Uint => Value::Uint(read_u64_be(raw)),
                    FieldType::Bool => Value::Bool(read_u64_be(raw) != 0),
                    FieldType::Float64 => Value::Float64(f64::from_bits(read_u64_be(raw))),
                    _ => Value::Float32(f32::from_bits(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))),
                }
            }
            None => {
                if pos + 2 > buf.len() {
                    return self.malformed(key);
                }
                let len = u16::from_be_bytes([buf[pos], buf[pos + 1]]) as usize;
                if pos + 2 + len > buf.len() {
                    return self.malformed(key);
                }
                let data = &buf[pos + 2..pos + 2 + len];
                pos += 2 + len;
                if field_type == FieldType::String {
                    Value::Str(data)
                } else {
                    Value::Bytes(data)
                }
            }
        };

        self.pos = pos;
        Some(Ok(Field { key, value }))
    }
}
