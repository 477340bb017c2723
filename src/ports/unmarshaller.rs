// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unmarshaller trait definition.
//!
//! This module defines the `Unmarshaller` trait, which decodes a raw
//! configuration payload (TOML, JSON, YAML, ...) into the nested map the store
//! merges.

use crate::domain::{ConfigMap, Result};

/// A trait for decoding raw configuration payloads.
///
/// Unlike a flat key-value parser, an unmarshaller keeps the nesting of the
/// document: the store flattens on its own, using its configured delimiter.
///
/// Any `Fn(&[u8]) -> Result<ConfigMap>` closure is an unmarshaller as well.
///
/// # Examples
///
/// ```rust
/// use dyncfg::domain::{ConfigMap, ConfigValue, Result};
/// use dyncfg::ports::Unmarshaller;
///
/// struct KeyValueLines;
///
/// impl Unmarshaller for KeyValueLines {
///     fn unmarshal(&self, content: &[u8]) -> Result<ConfigMap> {
///         let text = String::from_utf8_lossy(content);
///         Ok(text
///             .lines()
///             .filter_map(|line| line.split_once('='))
///             .map(|(k, v)| (k.trim().to_string(), ConfigValue::from(v.trim())))
///             .collect())
///     }
///
///     fn supported_extensions(&self) -> &[&str] {
///         &["kv"]
///     }
/// }
///
/// let map = KeyValueLines.unmarshal(b"name = demo").unwrap();
/// assert_eq!(map.get("name"), Some(&ConfigValue::from("demo")));
/// ```
pub trait Unmarshaller: Send + Sync {
    /// Decodes `content` into a nested map.
    ///
    /// # Returns
    ///
    /// * `Ok(ConfigMap)` - The decoded document
    /// * `Err(ConfigError::ParseError)` - The payload is malformed
    fn unmarshal(&self, content: &[u8]) -> Result<ConfigMap>;

    /// Returns the file extensions (without the leading dot) this
    /// unmarshaller handles.
    fn supported_extensions(&self) -> &[&str] {
        &[]
    }
}

impl<F> Unmarshaller for F
where
    F: Fn(&[u8]) -> Result<ConfigMap> + Send + Sync,
{
    fn unmarshal(&self, content: &[u8]) -> Result<ConfigMap> {
        self(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConfigError, ConfigValue};

    struct TestUnmarshaller;

    impl Unmarshaller for TestUnmarshaller {
        fn unmarshal(&self, _content: &[u8]) -> Result<ConfigMap> {
            let mut map = ConfigMap::new();
            map.insert("test".to_string(), ConfigValue::from("value"));
            Ok(map)
        }

        fn supported_extensions(&self) -> &[&str] {
            &["test", "tst"]
        }
    }

    #[test]
    fn test_unmarshaller_unmarshal() {
        let result = TestUnmarshaller.unmarshal(b"dummy").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.get("test"), Some(&ConfigValue::from("value")));
    }

    #[test]
    fn test_unmarshaller_supported_extensions() {
        assert_eq!(TestUnmarshaller.supported_extensions(), &["test", "tst"]);
    }

    #[test]
    fn test_closure_is_unmarshaller() {
        let failing = |_: &[u8]| -> Result<ConfigMap> {
            Err(ConfigError::ParseError {
                message: "always fails".to_string(),
                source: None,
            })
        };
        assert!(failing.unmarshal(b"").is_err());
        assert!(failing.supported_extensions().is_empty());
    }

    #[test]
    fn test_unmarshaller_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn Unmarshaller>();
    }
}
