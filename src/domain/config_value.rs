// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration value tree with lenient conversions.
//!
//! This module provides the `ConfigValue` type, the node type of the nested
//! configuration tree. A node is either a scalar, a sequence of nodes, or a
//! string-keyed map of nodes. Decoded payloads of every supported format land
//! in this type, and the typed accessors of the store convert from it.

use crate::domain::duration::parse_duration;
use crate::domain::errors::{ConfigError, Result};
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// A nested, string-keyed configuration map.
pub type ConfigMap = BTreeMap<String, ConfigValue>;

/// Marker key the TOML deserializer uses to surface datetimes.
const TOML_DATETIME_FIELD: &str = "$__toml_private_datetime";

/// A node of the configuration tree.
///
/// # Examples
///
/// ```
/// use dyncfg::domain::ConfigValue;
///
/// let value = ConfigValue::from("42");
/// assert_eq!(value.as_i64("test.key").unwrap(), 42);
/// assert_eq!(value.as_string("test.key").unwrap(), "42");
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ConfigValue {
    /// An explicit null / absent value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    String(String),
    /// An ordered sequence of values.
    Sequence(Vec<ConfigValue>),
    /// A nested map.
    Map(ConfigMap),
}

impl ConfigValue {
    /// Returns a short name of the value's shape, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigValue::Null => "null",
            ConfigValue::Bool(_) => "boolean",
            ConfigValue::Integer(_) => "integer",
            ConfigValue::Float(_) => "float",
            ConfigValue::String(_) => "string",
            ConfigValue::Sequence(_) => "sequence",
            ConfigValue::Map(_) => "map",
        }
    }

    /// Returns `true` for `ConfigValue::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    /// Returns the string slice if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the nested map if this is a map value.
    pub fn as_table(&self) -> Option<&ConfigMap> {
        match self {
            ConfigValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Converts a decoded document into the root map of a tree.
    ///
    /// An empty (null) document becomes an empty map; any other non-map
    /// document is rejected.
    pub fn into_root_map(self) -> Result<ConfigMap> {
        match self {
            ConfigValue::Map(map) => Ok(map),
            ConfigValue::Null => Ok(ConfigMap::new()),
            other => Err(ConfigError::ParseError {
                message: format!("expected a map at the document root, found {}", other.kind()),
                source: None,
            }),
        }
    }

    /// Converts the value to a `String`.
    ///
    /// Scalars are rendered with their natural text form and null becomes the
    /// empty string. Sequences and maps cannot be converted.
    pub fn as_string(&self, key: &str) -> Result<String> {
        match self {
            ConfigValue::Null => Ok(String::new()),
            ConfigValue::Bool(b) => Ok(b.to_string()),
            ConfigValue::Integer(i) => Ok(i.to_string()),
            ConfigValue::Float(f) => Ok(f.to_string()),
            ConfigValue::String(s) => Ok(s.clone()),
            other => Err(ConfigError::shape_mismatch(key, "string", other.kind())),
        }
    }

    /// Converts the value to a boolean.
    ///
    /// Strings are recognized case-insensitively:
    /// - `true`: "true", "t", "yes", "y", "1", "on"
    /// - `false`: "false", "f", "no", "n", "0", "off"
    ///
    /// Numbers are `true` when non-zero.
    pub fn as_bool(&self, key: &str) -> Result<bool> {
        match self {
            ConfigValue::Null => Ok(false),
            ConfigValue::Bool(b) => Ok(*b),
            ConfigValue::Integer(i) => Ok(*i != 0),
            ConfigValue::Float(f) => Ok(*f != 0.0),
            ConfigValue::String(s) => match s.trim().to_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" | "on" => Ok(true),
                "false" | "f" | "no" | "n" | "0" | "off" => Ok(false),
                other => other
                    .parse::<bool>()
                    .map_err(|e| ConfigError::from_parse_bool_error(key.to_string(), e)),
            },
            other => Err(ConfigError::shape_mismatch(key, "boolean", other.kind())),
        }
    }

    /// Converts the value to an `i64`.
    ///
    /// Floats are truncated toward zero and booleans map to `0`/`1`.
    pub fn as_i64(&self, key: &str) -> Result<i64> {
        match self {
            ConfigValue::Null => Ok(0),
            ConfigValue::Bool(b) => Ok(i64::from(*b)),
            ConfigValue::Integer(i) => Ok(*i),
            ConfigValue::Float(f) if f.is_finite() => Ok(f.trunc() as i64),
            ConfigValue::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|e| ConfigError::from_parse_int_error(key.to_string(), e)),
            other => Err(ConfigError::shape_mismatch(key, "integer", other.kind())),
        }
    }

    /// Converts the value to an `i32`, failing when it does not fit.
    pub fn as_i32(&self, key: &str) -> Result<i32> {
        let wide = self.as_i64(key)?;
        i32::try_from(wide).map_err(|e| ConfigError::TypeConversionError {
            key: key.to_string(),
            target_type: "i32".to_string(),
            source: Box::new(e),
        })
    }

    /// Converts the value to a `u64`, failing on negative numbers.
    pub fn as_u64(&self, key: &str) -> Result<u64> {
        match self {
            ConfigValue::String(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::from_parse_int_error(key.to_string(), e)),
            other => {
                let wide = other.as_i64(key)?;
                u64::try_from(wide).map_err(|e| ConfigError::TypeConversionError {
                    key: key.to_string(),
                    target_type: "u64".to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// Converts the value to an `f64`.
    pub fn as_f64(&self, key: &str) -> Result<f64> {
        match self {
            ConfigValue::Null => Ok(0.0),
            ConfigValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            ConfigValue::Integer(i) => Ok(*i as f64),
            ConfigValue::Float(f) => Ok(*f),
            ConfigValue::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| ConfigError::from_parse_float_error(key.to_string(), e)),
            other => Err(ConfigError::shape_mismatch(key, "float", other.kind())),
        }
    }

    /// Converts the value to a `Duration`.
    ///
    /// Bare numbers (and digit-only strings) are nanoseconds; other strings
    /// are parsed as durations such as `"1h30m"`, `"300ms"` or `"1.5s"`.
    ///
    /// # Examples
    ///
    /// ```
    /// use dyncfg::domain::ConfigValue;
    /// use std::time::Duration;
    ///
    /// let value = ConfigValue::from("1m30s");
    /// assert_eq!(value.as_duration("t").unwrap(), Duration::from_secs(90));
    /// ```
    pub fn as_duration(&self, key: &str) -> Result<Duration> {
        match self {
            ConfigValue::Null => Ok(Duration::ZERO),
            ConfigValue::Integer(_) | ConfigValue::Float(_) | ConfigValue::Bool(_) => {
                let nanos = self.as_f64(key)?;
                if nanos < 0.0 {
                    return Err(ConfigError::shape_mismatch(key, "duration", "negative number"));
                }
                Ok(Duration::from_nanos(nanos as u64))
            }
            ConfigValue::String(s) => {
                let s = s.trim();
                if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                    return s
                        .parse::<u64>()
                        .map(Duration::from_nanos)
                        .map_err(|e| ConfigError::from_parse_int_error(key.to_string(), e));
                }
                parse_duration(s)
            }
            other => Err(ConfigError::shape_mismatch(key, "duration", other.kind())),
        }
    }

    /// Converts the value to a sequence of values.
    pub fn as_sequence(&self, key: &str) -> Result<Vec<ConfigValue>> {
        match self {
            ConfigValue::Null => Ok(Vec::new()),
            ConfigValue::Sequence(items) => Ok(items.clone()),
            other => Err(ConfigError::shape_mismatch(key, "sequence", other.kind())),
        }
    }

    /// Converts the value to a list of strings.
    ///
    /// A plain string is split on whitespace.
    pub fn as_string_slice(&self, key: &str) -> Result<Vec<String>> {
        match self {
            ConfigValue::String(s) => Ok(s.split_whitespace().map(str::to_string).collect()),
            other => other
                .as_sequence(key)?
                .iter()
                .map(|item| item.as_string(key))
                .collect(),
        }
    }

    /// Converts the value to a list of integers.
    pub fn as_i64_slice(&self, key: &str) -> Result<Vec<i64>> {
        self.as_sequence(key)?
            .iter()
            .map(|item| item.as_i64(key))
            .collect()
    }

    /// Converts the value to a map.
    ///
    /// A string holding a JSON object is decoded into a map.
    pub fn as_map(&self, key: &str) -> Result<ConfigMap> {
        match self {
            ConfigValue::Null => Ok(ConfigMap::new()),
            ConfigValue::Map(map) => Ok(map.clone()),
            ConfigValue::String(s) => match serde_json::from_str::<ConfigValue>(s) {
                Ok(ConfigValue::Map(map)) => Ok(map),
                _ => Err(ConfigError::shape_mismatch(key, "map", "string")),
            },
            other => Err(ConfigError::shape_mismatch(key, "map", other.kind())),
        }
    }

    /// Converts the value to a map of strings.
    pub fn as_string_map_string(&self, key: &str) -> Result<BTreeMap<String, String>> {
        self.as_map(key)?
            .into_iter()
            .map(|(k, v)| v.as_string(key).map(|s| (k, s)))
            .collect()
    }

    /// Converts the value to a map of string lists.
    pub fn as_string_map_string_slice(&self, key: &str) -> Result<BTreeMap<String, Vec<String>>> {
        self.as_map(key)?
            .into_iter()
            .map(|(k, v)| v.as_string_slice(key).map(|s| (k, s)))
            .collect()
    }

    /// Converts the value to a list of maps.
    pub fn as_map_slice(&self, key: &str) -> Result<Vec<ConfigMap>> {
        self.as_sequence(key)?
            .iter()
            .map(|item| item.as_map(key))
            .collect()
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Integer(i)
    }
}

impl From<i32> for ConfigValue {
    fn from(i: i32) -> Self {
        ConfigValue::Integer(i64::from(i))
    }
}

impl From<u32> for ConfigValue {
    fn from(i: u32) -> Self {
        ConfigValue::Integer(i64::from(i))
    }
}

impl From<f64> for ConfigValue {
    fn from(f: f64) -> Self {
        ConfigValue::Float(f)
    }
}

impl From<ConfigMap> for ConfigValue {
    fn from(map: ConfigMap) -> Self {
        ConfigValue::Map(map)
    }
}

impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(items: Vec<T>) -> Self {
        ConfigValue::Sequence(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Null => Ok(()),
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Integer(i) => write!(f, "{}", i),
            ConfigValue::Float(x) => write!(f, "{}", x),
            ConfigValue::String(s) => write!(f, "{}", s),
            composite => {
                let rendered = serde_json::to_string(composite).map_err(|_| fmt::Error)?;
                write!(f, "{}", rendered)
            }
        }
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ConfigValue::Null => serializer.serialize_unit(),
            ConfigValue::Bool(b) => serializer.serialize_bool(*b),
            ConfigValue::Integer(i) => serializer.serialize_i64(*i),
            ConfigValue::Float(f) => serializer.serialize_f64(*f),
            ConfigValue::String(s) => serializer.serialize_str(s),
            ConfigValue::Sequence(items) => items.serialize(serializer),
            ConfigValue::Map(map) => map.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ConfigValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = ConfigValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a configuration value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<ConfigValue, E> {
        Ok(ConfigValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<ConfigValue, E> {
        Ok(ConfigValue::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<ConfigValue, E> {
        Ok(match i64::try_from(v) {
            Ok(i) => ConfigValue::Integer(i),
            Err(_) => ConfigValue::Float(v as f64),
        })
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<ConfigValue, E> {
        Ok(ConfigValue::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<ConfigValue, E> {
        Ok(ConfigValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<ConfigValue, E> {
        Ok(ConfigValue::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<ConfigValue, E> {
        Ok(ConfigValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<ConfigValue, E> {
        Ok(ConfigValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<ConfigValue, D::Error> {
        ConfigValue::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<ConfigValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(ConfigValue::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<ConfigValue, A::Error> {
        let mut map = ConfigMap::new();
        while let Some(MapKey(key)) = access.next_key()? {
            let value: ConfigValue = access.next_value()?;
            map.insert(key, value);
        }

        if map.len() == 1 && matches!(map.get(TOML_DATETIME_FIELD), Some(ConfigValue::String(_))) {
            if let Some(datetime) = map.remove(TOML_DATETIME_FIELD) {
                return Ok(datetime);
            }
        }

        Ok(ConfigValue::Map(map))
    }
}

/// A map key; YAML allows scalar keys that are not strings.
struct MapKey(String);

impl<'de> Deserialize<'de> for MapKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct KeyVisitor;

        impl Visitor<'_> for KeyVisitor {
            type Value = MapKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a scalar map key")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<MapKey, E> {
                Ok(MapKey(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<MapKey, E> {
                Ok(MapKey(v.to_string()))
            }
        }

        deserializer.deserialize_any(KeyVisitor)
    }
}
