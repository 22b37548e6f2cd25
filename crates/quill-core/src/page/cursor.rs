//! Cursor codec.
//!
//! A cursor is `base64url(<seconds>.<nanos>|<id>)` without padding, where
//! `seconds` is the signed Unix timestamp zero-padded to 20 characters and
//! `nanos` is the sub-second part padded to 10 digits. The key
//! `(2026-03-01T12:00:00Z, 42)` travels as the base64 of
//! `+0000000001772366400.0000000000|42`. The fixed widths hold every
//! `DateTime<Utc>`, including years outside 0000-9999 and leap seconds (which
//! chrono keeps as nanoseconds past one billion).
//!
//! Only the sort key is encoded, never the record payload. Decoding is
//! strict: no trimming, no repair of malformed input.

use super::{Cursor, SortKey};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};

/// Upper bound on accepted cursor length, checked before decoding.
pub const MAX_CURSOR_LEN: usize = 256;

const SEPARATOR: char = '|';

/// Sign plus 19 digits, enough for any `i64`.
const SECONDS_WIDTH: usize = 20;
const NANOS_WIDTH: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    #[error("cursor is empty")]
    Empty,

    #[error("cursor exceeds max length: {len} chars (max {max})")]
    TooLong { len: usize, max: usize },

    #[error("cursor is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("cursor payload is not valid UTF-8")]
    Utf8,

    #[error("cursor payload is missing the '|' separator")]
    MissingSeparator,

    #[error("cursor timestamp {0:?} is not a valid timestamp")]
    Timestamp(String),

    #[error("cursor id {0:?} is not an integer")]
    Id(String),
}

/// Encode a sort key as an opaque cursor.
#[must_use]
pub fn encode(key: &SortKey) -> Cursor {
    let payload = format!(
        "{}{SEPARATOR}{}",
        encode_timestamp(key.created_at),
        key.id
    );
    Cursor(URL_SAFE_NO_PAD.encode(payload))
}

fn encode_timestamp(at: DateTime<Utc>) -> String {
    format!(
        "{:+0sw$}.{:0nw$}",
        at.timestamp(),
        at.timestamp_subsec_nanos(),
        sw = SECONDS_WIDTH,
        nw = NANOS_WIDTH
    )
}

fn decode_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let (secs, nanos) = raw.split_once('.')?;
    let unsigned = secs.strip_prefix(['+', '-'])?;
    if secs.len() != SECONDS_WIDTH
        || nanos.len() != NANOS_WIDTH
        || !unsigned.bytes().all(|b| b.is_ascii_digit())
        || !nanos.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    DateTime::from_timestamp(secs.parse().ok()?, nanos.parse().ok()?)
}

/// Decode a cursor previously produced by [`encode`].
///
/// # Errors
///
/// Returns a distinct [`CursorError`] variant for each way the token can be
/// malformed.
pub fn decode(token: &str) -> Result<SortKey, CursorError> {
    if token.is_empty() {
        return Err(CursorError::Empty);
    }

    if token.len() > MAX_CURSOR_LEN {
        return Err(CursorError::TooLong {
            len: token.len(),
            max: MAX_CURSOR_LEN,
        });
    }

    let bytes = URL_SAFE_NO_PAD.decode(token)?;
    let payload = String::from_utf8(bytes).map_err(|_| CursorError::Utf8)?;

    let (timestamp, id) = payload
        .split_once(SEPARATOR)
        .ok_or(CursorError::MissingSeparator)?;

    let created_at = decode_timestamp(timestamp)
        .ok_or_else(|| CursorError::Timestamp(timestamp.to_string()))?;
    let id = id
        .parse::<i64>()
        .map_err(|_| CursorError::Id(id.to_string()))?;

    Ok(SortKey::new(created_at, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use proptest::prelude::*;

    fn raw(payload: &str) -> String {
        URL_SAFE_NO_PAD.encode(payload)
    }

    #[test]
    fn encodes_fixed_width_payload() {
        let key = SortKey::new(Utc.timestamp_opt(1_772_366_400, 0).unwrap(), 42);
        let cursor = encode(&key);
        let payload = URL_SAFE_NO_PAD.decode(cursor.as_str()).unwrap();
        assert_eq!(
            String::from_utf8(payload).unwrap(),
            "+0000000001772366400.0000000000|42"
        );
    }

    #[test]
    fn round_trips_sub_microsecond_precision() {
        let key = SortKey::new(Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap(), 7);
        assert_eq!(decode(encode(&key).as_str()), Ok(key));
    }

    #[test]
    fn round_trips_years_outside_four_digits() {
        for at in [
            Utc.with_ymd_and_hms(10_000, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(-1, 1, 1, 0, 0, 0).unwrap(),
            DateTime::<Utc>::MIN_UTC,
            DateTime::<Utc>::MAX_UTC,
        ] {
            let key = SortKey::new(at, 1);
            assert_eq!(decode(encode(&key).as_str()), Ok(key));
        }
    }

    #[test]
    fn round_trips_leap_second() {
        let leap = NaiveDate::from_ymd_opt(2016, 12, 31)
            .unwrap()
            .and_hms_nano_opt(23, 59, 59, 1_500_000_000)
            .unwrap()
            .and_utc();
        let key = SortKey::new(leap, 3);
        assert_eq!(decode(encode(&key).as_str()), Ok(key));
    }

    #[test]
    fn cursor_is_url_safe() {
        let key = SortKey::new(Utc.timestamp_opt(4_000_000_000, 999_999_999).unwrap(), i64::MAX);
        let cursor = encode(&key);
        assert!(
            cursor
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn rejects_malformed_base64() {
        assert!(matches!(
            decode("not-base64!!!"),
            Err(CursorError::Encoding(_))
        ));
    }

    #[test]
    fn rejects_empty_and_oversized_tokens() {
        assert_eq!(decode(""), Err(CursorError::Empty));

        let long = "A".repeat(MAX_CURSOR_LEN + 1);
        assert_eq!(
            decode(&long),
            Err(CursorError::TooLong {
                len: MAX_CURSOR_LEN + 1,
                max: MAX_CURSOR_LEN
            })
        );
    }

    #[test]
    fn rejects_non_utf8_payload() {
        let token = URL_SAFE_NO_PAD.encode([0xff, 0xfe, 0xfd]);
        assert_eq!(decode(&token), Err(CursorError::Utf8));
    }

    #[test]
    fn rejects_missing_separator() {
        assert_eq!(
            decode(&raw("+0000000001772366400.0000000000")),
            Err(CursorError::MissingSeparator)
        );
    }

    #[test]
    fn rejects_bad_timestamp() {
        assert_eq!(
            decode(&raw("yesterday|42")),
            Err(CursorError::Timestamp("yesterday".to_string()))
        );
        // Unsigned, short, and out of chrono's range.
        for ts in [
            "00000000001772366400.0000000000",
            "+1772366400.0000000000",
            "+0000000001772366400.000000000",
            "+9223372036854775807.0000000000",
            "+0000000001772366400.9999999999",
        ] {
            assert_eq!(
                decode(&raw(&format!("{ts}|1"))),
                Err(CursorError::Timestamp(ts.to_string()))
            );
        }
    }

    #[test]
    fn rejects_bad_id() {
        assert_eq!(
            decode(&raw("+0000000001772366400.0000000000|forty-two")),
            Err(CursorError::Id("forty-two".to_string()))
        );
        assert_eq!(
            decode(&raw("+0000000001772366400.0000000000|")),
            Err(CursorError::Id(String::new()))
        );
    }

    #[test]
    fn does_not_trim_whitespace() {
        let key = SortKey::new(Utc.timestamp_opt(10, 0).unwrap(), 1);
        let padded = format!(" {}", encode(&key));
        assert!(matches!(decode(&padded), Err(CursorError::Encoding(_))));
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            secs in DateTime::<Utc>::MIN_UTC.timestamp()..=DateTime::<Utc>::MAX_UTC.timestamp(),
            nanos in 0_u32..1_000_000_000,
            id in any::<i64>(),
        ) {
            let created_at = DateTime::from_timestamp(secs, nanos).unwrap();
            let key = SortKey::new(created_at, id);
            prop_assert_eq!(decode(encode(&key).as_str()), Ok(key));
        }

        #[test]
        fn encoding_is_deterministic(secs in 0_i64..4_000_000_000, id in any::<i64>()) {
            let key = SortKey::new(Utc.timestamp_opt(secs, 0).unwrap(), id);
            prop_assert_eq!(encode(&key), encode(&key));
        }

        #[test]
        fn arbitrary_input_never_panics(token in ".{0,64}") {
            let _ = decode(&token);
        }
    }
}
