// SPDX-License-Identifier: MIT OR Apache-2.0

//! Duration strings and their serde helpers.
//!
//! Configuration files spell durations as `"300ms"`, `"1.5s"` or `"1h30m"`.
//! [`parse_duration`] understands that notation, and the [`serialize`] and
//! [`deserialize`] functions let a field opt into it:
//!
//! ```
//! use serde::Deserialize;
//! use std::time::Duration;
//!
//! #[derive(Deserialize)]
//! struct Client {
//!     #[serde(with = "dyncfg::duration")]
//!     timeout: Duration,
//! }
//!
//! let client: Client = serde_json::from_str(r#"{"timeout": "1.5s"}"#).unwrap();
//! assert_eq!(client.timeout, Duration::from_millis(1500));
//! ```

use crate::domain::config_value::ConfigValue;
use crate::domain::errors::{ConfigError, Result};
use serde::{de, Deserialize, Deserializer, Serializer};
use std::time::Duration;

const NANOS_PER_MICRO: f64 = 1e3;
const NANOS_PER_MILLI: f64 = 1e6;
const NANOS_PER_SECOND: f64 = 1e9;

/// Parses a duration string made of `<number><unit>` pairs.
///
/// Recognized units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`. Numbers
/// may carry a fractional part. A lone `"0"` is accepted without a unit.
///
/// # Examples
///
/// ```
/// use dyncfg::domain::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("2h45m").unwrap(), Duration::from_secs(9900));
/// assert!(parse_duration("ten minutes").is_err());
/// ```
pub fn parse_duration(input: &str) -> Result<Duration> {
    let invalid = |reason: &str| ConfigError::ParseError {
        message: format!("invalid duration {:?}: {}", input, reason),
        source: None,
    };

    let s = input.trim();
    let s = s.strip_prefix('+').unwrap_or(s);
    if s.is_empty() {
        return Err(invalid("empty"));
    }
    if s.starts_with('-') {
        return Err(invalid("negative durations are not supported"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut nanos = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return Err(invalid("expected a number"));
        }
        let number: f64 = rest[..number_len]
            .parse()
            .map_err(|e| ConfigError::from_parse_float_error(input.to_string(), e))?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" | "μs" => NANOS_PER_MICRO,
            "ms" => NANOS_PER_MILLI,
            "s" => NANOS_PER_SECOND,
            "m" => 60.0 * NANOS_PER_SECOND,
            "h" => 3600.0 * NANOS_PER_SECOND,
            "" => return Err(invalid("missing unit")),
            _ => return Err(invalid("unknown unit")),
        };
        rest = &rest[unit_len..];
        nanos += number * scale;
    }

    Ok(Duration::from_nanos(nanos.round() as u64))
}

/// Formats a duration with the largest unit that represents it exactly.
pub fn format_duration(duration: Duration) -> String {
    let nanos = duration.as_nanos();
    if nanos == 0 {
        "0s".to_string()
    } else if nanos % 1_000_000_000 == 0 {
        format!("{}s", nanos / 1_000_000_000)
    } else if nanos % 1_000_000 == 0 {
        format!("{}ms", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!("{}us", nanos / 1_000)
    } else {
        format!("{}ns", nanos)
    }
}

/// Serializes a `Duration` as a duration string.
pub fn serialize<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_duration(*duration))
}

/// Deserializes a `Duration` from a duration string or a nanosecond count.
pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Duration, D::Error> {
    let value = ConfigValue::deserialize(deserializer)?;
    value.as_duration("duration").map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_units() {
        assert_eq!(parse_duration("10ns").unwrap(), Duration::from_nanos(10));
        assert_eq!(parse_duration("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("10µs").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    }

    #[test]
    fn test_parse_compound_and_fractional() {
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration(" +2m3s ").unwrap(), Duration::from_secs(123));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("10d").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("1.2.3s").is_err());
    }

    #[test]
    fn test_format_duration_round_trips() {
        for d in [
            Duration::ZERO,
            Duration::from_secs(90),
            Duration::from_millis(1500),
            Duration::from_micros(7),
            Duration::from_nanos(3),
        ] {
            assert_eq!(parse_duration(&format_duration(d)).unwrap(), d);
        }
    }

    #[test]
    fn test_serde_helpers() {
        #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
        struct Timeouts {
            #[serde(with = "crate::domain::duration")]
            read: Duration,
        }

        let parsed: Timeouts = serde_json::from_str(r#"{"read": "250ms"}"#).unwrap();
        assert_eq!(parsed.read, Duration::from_millis(250));

        let nanos: Timeouts = serde_json::from_str(r#"{"read": 1000}"#).unwrap();
        assert_eq!(nanos.read, Duration::from_micros(1));

        let json = serde_json::to_string(&parsed).unwrap();
        assert_eq!(json, r#"{"read":"250ms"}"#);
    }
}
