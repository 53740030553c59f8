//! The channel feed record returned by `/feeds/last.txt`.

use heapless::String;
use serde::Deserialize;

use crate::value::{self, FIELD_LENGTH_MAX};

/// Number of data fields in a channel.
pub const FEED_FIELDS: usize = 8;

/// Borrowed view of one feed entry as the service serializes it.
///
/// Every key is optional: the service omits or nulls the ones that were
/// never written, and `status`/location keys only appear when the request
/// asked for them.
#[derive(Debug, Default, Deserialize)]
struct RawFeed<'a> {
    created_at: Option<&'a str>,
    #[allow(dead_code)]
    entry_id: Option<u32>,
    field1: Option<&'a str>,
    field2: Option<&'a str>,
    field3: Option<&'a str>,
    field4: Option<&'a str>,
    field5: Option<&'a str>,
    field6: Option<&'a str>,
    field7: Option<&'a str>,
    field8: Option<&'a str>,
    latitude: Option<&'a str>,
    longitude: Option<&'a str>,
    elevation: Option<&'a str>,
    status: Option<&'a str>,
}

/// The most recently fetched feed entry of a channel.
///
/// Produced by a `read_feed` operation; all accessors return the value as
/// the service stored it, with absent values as empty strings.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Feed {
    fields: [String<FIELD_LENGTH_MAX>; FEED_FIELDS],
    status: String<FIELD_LENGTH_MAX>,
    latitude: String<32>,
    longitude: String<32>,
    elevation: String<32>,
    created_at: String<32>,
}

impl Feed {
    /// Parse a feed entry out of a response body.
    ///
    /// A body that is not valid feed JSON yields an empty record, matching
    /// the service convention that a missing key reads as an empty string.
    pub(crate) fn from_json(body: &str) -> Self {
        let raw = match serde_json_core::from_str::<RawFeed>(body) {
            Ok((raw, _)) => raw,
            Err(_) => RawFeed::default(),
        };

        let mut feed = Feed::default();
        let raw_fields = [
            raw.field1, raw.field2, raw.field3, raw.field4, raw.field5, raw.field6, raw.field7,
            raw.field8,
        ];
        for (slot, text) in feed.fields.iter_mut().zip(raw_fields) {
            copy_into(slot, text);
        }
        copy_into(&mut feed.status, raw.status);
        copy_into(&mut feed.latitude, raw.latitude);
        copy_into(&mut feed.longitude, raw.longitude);
        copy_into(&mut feed.elevation, raw.elevation);
        copy_into(&mut feed.created_at, raw.created_at);
        feed
    }

    /// The value of a field (1-8) as text, `None` for an invalid field number.
    pub fn field_text(&self, field: u8) -> Option<&str> {
        let index = usize::from(field.checked_sub(1)?);
        self.fields.get(index).map(|f| f.as_str())
    }

    /// The value of a field (1-8) as an integer, `None` for an invalid
    /// field number. Text that does not start with a number reads as `0`.
    pub fn field_long(&self, field: u8) -> Option<i64> {
        self.field_text(field).map(value::parse_long)
    }

    /// The value of a field (1-8) as an `i32`, `None` for an invalid field
    /// number.
    pub fn field_int(&self, field: u8) -> Option<i32> {
        self.field_long(field).map(|v| v as i32)
    }

    /// The value of a field (1-8) as a float, `None` for an invalid field
    /// number. Text that does not start with a number reads as `0.0`.
    pub fn field_float(&self, field: u8) -> Option<f32> {
        self.field_text(field).map(value::parse_float)
    }

    /// The status message of the entry, empty when none was written.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// The latitude of the entry as text, empty when none was written.
    pub fn latitude(&self) -> &str {
        &self.latitude
    }

    /// The longitude of the entry as text, empty when none was written.
    pub fn longitude(&self) -> &str {
        &self.longitude
    }

    /// The elevation of the entry as text, empty when none was written.
    pub fn elevation(&self) -> &str {
        &self.elevation
    }

    /// The ISO 8601 creation timestamp of the entry, empty when unknown.
    pub fn created_at(&self) -> &str {
        &self.created_at
    }
}

/// Copy an optional borrowed value into a fixed-capacity slot, truncating
/// anything that does not fit.
fn copy_into<const N: usize>(slot: &mut String<N>, text: Option<&str>) {
    if let Some(text) = text {
        let mut end = text.len().min(N);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let _ = slot.push_str(&text[..end]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = concat!(
        r#"{"created_at":"2024-03-01T10:15:00Z","entry_id":271,"#,
        r#""field1":"12.5","field2":"42","field3":null,"field4":null,"#,
        r#""field5":null,"field6":null,"field7":null,"field8":"ok","#,
        r#""latitude":"40.7","longitude":"-74.0","elevation":"10","#,
        r#""status":"running"}"#
    );

    #[test]
    fn parses_full_entry() {
        let feed = Feed::from_json(BODY);
        assert_eq!(feed.field_text(1), Some("12.5"));
        assert_eq!(feed.field_float(1), Some(12.5));
        assert_eq!(feed.field_long(2), Some(42));
        assert_eq!(feed.field_int(2), Some(42));
        assert_eq!(feed.field_text(3), Some(""));
        assert_eq!(feed.field_text(8), Some("ok"));
        assert_eq!(feed.status(), "running");
        assert_eq!(feed.latitude(), "40.7");
        assert_eq!(feed.longitude(), "-74.0");
        assert_eq!(feed.elevation(), "10");
        assert_eq!(feed.created_at(), "2024-03-01T10:15:00Z");
    }

    #[test]
    fn invalid_field_numbers() {
        let feed = Feed::from_json(BODY);
        assert_eq!(feed.field_text(0), None);
        assert_eq!(feed.field_text(9), None);
    }

    #[test]
    fn missing_keys_read_empty() {
        let feed = Feed::from_json(r#"{"created_at":"2024-03-01T10:15:00Z","entry_id":1}"#);
        assert_eq!(feed.field_text(1), Some(""));
        assert_eq!(feed.status(), "");
        assert_eq!(feed.created_at(), "2024-03-01T10:15:00Z");
    }

    #[test]
    fn garbage_reads_as_empty_record() {
        let feed = Feed::from_json("0");
        assert_eq!(feed, Feed::default());
        let feed = Feed::from_json("not json at all");
        assert_eq!(feed, Feed::default());
    }
}
