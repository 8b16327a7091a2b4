//! Allocation-free text formatting shared by the renderers.
//!
//! Everything here appends to a caller-owned `Vec<u8>` that the renderers
//! reuse between records, so steady-state rendering does not allocate.

use std::borrow::Cow;
use std::io::Write;

const HEX: &[u8; 16] = b"0123456789abcdef";

#[inline]
fn needs_escape(b: u8) -> bool {
    matches!(b, b'"' | b'\\' | b'\n' | b'\r' | b'\t' | b' ')
}

/// Returns `s` unchanged when it contains none of `" \ \n \r \t` or space;
/// otherwise a quoted copy with those characters backslash-escaped.
///
/// ```
/// use ultralog::render::text::escape;
///
/// assert_eq!(&*escape(b"simple"), b"simple");
/// assert_eq!(&*escape(b"a\"b"), br#""a\"b""#);
/// assert_eq!(&*escape(b"a b"), br#""a b""#);
/// ```
pub fn escape(s: &[u8]) -> Cow<'_, [u8]> {
    if !s.iter().copied().any(needs_escape) {
        return Cow::Borrowed(s);
    }
    let mut out = Vec::with_capacity(s.len() + 8);
    append_quoted_escaped(&mut out, s);
    Cow::Owned(out)
}

/// Appends `s` the way [`escape`] renders it.
pub fn append_escaped(buf: &mut Vec<u8>, s: &[u8]) {
    if s.iter().copied().any(needs_escape) {
        append_quoted_escaped(buf, s);
    } else {
        buf.extend_from_slice(s);
    }
}

fn append_quoted_escaped(buf: &mut Vec<u8>, s: &[u8]) {
    buf.push(b'"');
    for &b in s {
        match b {
            b'"' => buf.extend_from_slice(b"\\\""),
            b'\\' => buf.extend_from_slice(b"\\\\"),
            b'\n' => buf.extend_from_slice(b"\\n"),
            b'\r' => buf.extend_from_slice(b"\\r"),
            b'\t' => buf.extend_from_slice(b"\\t"),
            _ => buf.push(b),
        }
    }
    buf.push(b'"');
}

/// logfmt quoting: quoted when `s` is empty or holds a space, `"`, `=`, or a
/// line break; otherwise verbatim.
pub fn append_logfmt(buf: &mut Vec<u8>, s: &[u8]) {
    let quote = s.is_empty()
        || s
            .iter()
            .any(|&b| matches!(b, b' ' | b'"' | b'=' | b'\n' | b'\r'));
    if !quote {
        buf.extend_from_slice(s);
        return;
    }

    buf.push(b'"');
    for &b in s {
        match b {
            b'"' => buf.extend_from_slice(b"\\\""),
            b'\\' => buf.extend_from_slice(b"\\\\"),
            b'\n' => buf.extend_from_slice(b"\\n"),
            b'\r' => buf.extend_from_slice(b"\\r"),
            _ => buf.push(b),
        }
    }
    buf.push(b'"');
}

/// Lowercase hex, two digits per byte.
pub fn append_hex(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.reserve(bytes.len() * 2);
    for &b in bytes {
        buf.push(HEX[(b >> 4) as usize]);
        buf.push(HEX[(b & 0x0f) as usize]);
    }
}

pub fn append_u64(buf: &mut Vec<u8>, mut v: u64) {
    let mut digits = [0u8; 20];
    let mut i = digits.len();
    loop {
        i -= 1;
        digits[i] = b'0' + (v % 10) as u8;
        v /= 10;
        if v == 0 {
            break;
        }
    }
    buf.extend_from_slice(&digits[i..]);
}

pub fn append_i64(buf: &mut Vec<u8>, v: i64) {
    if v < 0 {
        buf.push(b'-');
    }
    append_u64(buf, v.unsigned_abs());
}

pub fn append_bool(buf: &mut Vec<u8>, v: bool) {
    let text: &[u8] = if v { b"true" } else { b"false" };
    buf.extend_from_slice(text);
}

// Above this the scaled value no longer fits the integer path.
const FIXED_LIMIT: f64 = 1e15;

/// Fixed-point with three decimals, e.g. `1.235`, `-0.500`, `+Inf`.
pub fn append_fixed3(buf: &mut Vec<u8>, v: f64) {
    if v.is_nan() {
        buf.extend_from_slice(b"NaN");
        return;
    }
    if v.is_infinite() {
        buf.extend_from_slice(if v > 0.0 { b"+Inf" } else { b"-Inf" });
        return;
    }
    if v.abs() >= FIXED_LIMIT {
        // Writing into a Vec cannot fail.
        let _ = write!(buf, "{:.3}", v);
        return;
    }

    if v < 0.0 {
        buf.push(b'-');
    }
    let scaled = (v.abs() * 1000.0).round() as u64;
    append_u64(buf, scaled / 1000);
    buf.push(b'.');
    let frac = scaled % 1000;
    buf.push(b'0' + (frac / 100) as u8);
    buf.push(b'0' + (frac / 10 % 10) as u8);
    buf.push(b'0' + (frac % 10) as u8);
}
