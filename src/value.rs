//! Field value formatting and text-to-number conversions.

use core::fmt::Write;

use heapless::String;

use crate::status::Status;

/// Maximum length of a ThingSpeak field in bytes (UTF-8).
pub const FIELD_LENGTH_MAX: usize = 255;

/// Largest finite magnitude the service accepts for a float field.
const FLOAT_RANGE_MAX: f32 = 999_999_000_000.0;

/// A value that can be written to a channel field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    /// A 32-bit signed integer.
    Int(i32),
    /// A 64-bit signed integer.
    Long(i64),
    /// A floating point value, formatted with five decimal places.
    ///
    /// Finite magnitudes above 999,999,000,000 are rejected with
    /// [`Status::OutOfRange`]. For more precision or a wider range, format
    /// the number yourself and use [`Value::Text`].
    Float(f32),
    /// A UTF-8 string, limited to 255 bytes by the service.
    Text(&'a str),
}

impl Value<'_> {
    /// Render the value as it appears in the url-encoded request body.
    pub(crate) fn render(&self) -> Result<String<FIELD_LENGTH_MAX>, Status> {
        let mut out = String::new();
        match *self {
            Value::Int(v) => write!(out, "{}", v).map_err(|_| Status::OutOfRange)?,
            Value::Long(v) => write!(out, "{}", v).map_err(|_| Status::OutOfRange)?,
            Value::Float(v) => {
                if v.is_finite() && (v > FLOAT_RANGE_MAX || v < -FLOAT_RANGE_MAX) {
                    return Err(Status::OutOfRange);
                }
                write!(out, "{:.5}", v).map_err(|_| Status::OutOfRange)?;
            }
            Value::Text(v) => {
                if v.len() > FIELD_LENGTH_MAX {
                    return Err(Status::OutOfRange);
                }
                out.push_str(v).map_err(|_| Status::OutOfRange)?;
            }
        }
        Ok(out)
    }
}

impl From<i32> for Value<'_> {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value<'_> {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f32> for Value<'_> {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(v: &'a str) -> Self {
        Value::Text(v)
    }
}

/// Parse the leading integer out of a field value, `0` when there is none.
///
/// Field values are free-form text, so `"12.5"` converts to `12` and
/// `"banana"` to `0`.
pub(crate) fn parse_long(text: &str) -> i64 {
    let t = text.trim();
    let mut end = 0;
    for (i, c) in t.char_indices() {
        let ok = c.is_ascii_digit() || ((c == '+' || c == '-') && i == 0);
        if !ok {
            break;
        }
        end = i + 1;
    }
    t[..end].parse().unwrap_or(0)
}

/// Parse the leading decimal number out of a field value, `0.0` when there
/// is none.
pub(crate) fn parse_float(text: &str) -> f32 {
    let t = text.trim();
    if let Ok(v) = t.parse() {
        return v;
    }
    let mut end = 0;
    for (i, c) in t.char_indices() {
        let ok = c.is_ascii_digit() || c == '.' || ((c == '+' || c == '-') && i == 0);
        if !ok {
            break;
        }
        end = i + 1;
    }
    t[..end].parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_integers() {
        assert_eq!(Value::Int(42).render().unwrap().as_str(), "42");
        assert_eq!(Value::Long(-2_147_483_649).render().unwrap().as_str(), "-2147483649");
    }

    #[test]
    fn renders_floats_with_five_decimals() {
        assert_eq!(Value::Float(3.14).render().unwrap().as_str(), "3.14000");
        assert_eq!(Value::Float(-0.5).render().unwrap().as_str(), "-0.50000");
    }

    #[test]
    fn rejects_floats_out_of_range() {
        assert_eq!(Value::Float(1.0e12).render(), Err(Status::OutOfRange));
        assert_eq!(Value::Float(-1.0e12).render(), Err(Status::OutOfRange));
        // Infinities are passed through, matching the service behavior.
        assert!(Value::Float(f32::INFINITY).render().is_ok());
    }

    #[test]
    fn rejects_oversized_text() {
        let long = [b'a'; FIELD_LENGTH_MAX + 1];
        let long = core::str::from_utf8(&long).unwrap();
        assert_eq!(Value::Text(long).render(), Err(Status::OutOfRange));
    }

    #[test]
    fn parses_leading_integers() {
        assert_eq!(parse_long("123"), 123);
        assert_eq!(parse_long(" -42 "), -42);
        assert_eq!(parse_long("12.5"), 12);
        assert_eq!(parse_long("banana"), 0);
        assert_eq!(parse_long(""), 0);
    }

    #[test]
    fn parses_leading_floats() {
        assert_eq!(parse_float("12.5"), 12.5);
        assert_eq!(parse_float("-0.25"), -0.25);
        assert_eq!(parse_float("3.5e2"), 350.0);
        assert_eq!(parse_float("12.5C"), 12.5);
        assert_eq!(parse_float("banana"), 0.0);
        assert_eq!(parse_float("-inf"), f32::NEG_INFINITY);
    }
}
