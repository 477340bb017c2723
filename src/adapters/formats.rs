// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in payload formats.
//!
//! This module provides unmarshallers for JSON (always available), YAML
//! (feature `yaml`) and TOML (feature `toml`), and picks one by file
//! extension.

use crate::domain::{ConfigError, ConfigMap, ConfigValue, Result};
use crate::ports::Unmarshaller;
use std::path::Path;
use std::sync::Arc;

fn is_blank(content: &[u8]) -> bool {
    content.iter().all(u8::is_ascii_whitespace)
}

#[cfg(feature = "toml")]
fn utf8<'a>(content: &'a [u8], format: &str) -> Result<&'a str> {
    std::str::from_utf8(content).map_err(|e| ConfigError::ParseError {
        message: format!("{} payload is not valid UTF-8: {}", format, e),
        source: Some(Box::new(e)),
    })
}

/// JSON unmarshaller.
///
/// # Examples
///
/// ```rust
/// use dyncfg::adapters::JsonUnmarshaller;
/// use dyncfg::ports::Unmarshaller;
///
/// let map = JsonUnmarshaller.unmarshal(br#"{"server": {"port": 8080}}"#).unwrap();
/// assert!(map.contains_key("server"));
/// assert!(JsonUnmarshaller.unmarshal(b"").unwrap().is_empty());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonUnmarshaller;

impl Unmarshaller for JsonUnmarshaller {
    fn unmarshal(&self, content: &[u8]) -> Result<ConfigMap> {
        if is_blank(content) {
            return Ok(ConfigMap::new());
        }
        let value: ConfigValue =
            serde_json::from_slice(content).map_err(|e| ConfigError::ParseError {
                message: format!("Failed to parse JSON: {}", e),
                source: Some(Box::new(e)),
            })?;
        value.into_root_map()
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }
}

/// YAML unmarshaller.
#[cfg(feature = "yaml")]
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlUnmarshaller;

#[cfg(feature = "yaml")]
impl Unmarshaller for YamlUnmarshaller {
    fn unmarshal(&self, content: &[u8]) -> Result<ConfigMap> {
        if is_blank(content) {
            return Ok(ConfigMap::new());
        }
        let value: ConfigValue =
            serde_yaml::from_slice(content).map_err(|e| ConfigError::ParseError {
                message: format!("Failed to parse YAML: {}", e),
                source: Some(Box::new(e)),
            })?;
        value.into_root_map()
    }

    fn supported_extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }
}

/// TOML unmarshaller.
///
/// Datetimes are kept as their RFC 3339 string form.
#[cfg(feature = "toml")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlUnmarshaller;

#[cfg(feature = "toml")]
impl Unmarshaller for TomlUnmarshaller {
    fn unmarshal(&self, content: &[u8]) -> Result<ConfigMap> {
        let text = utf8(content, "TOML")?;
        let value: ConfigValue = toml::from_str(text).map_err(|e| ConfigError::ParseError {
            message: format!("Failed to parse TOML: {}", e),
            source: Some(Box::new(e)),
        })?;
        value.into_root_map()
    }

    fn supported_extensions(&self) -> &[&str] {
        &["toml"]
    }
}

/// Returns every built-in unmarshaller enabled in this build.
pub fn builtin_unmarshallers() -> Vec<Arc<dyn Unmarshaller>> {
    let mut unmarshallers: Vec<Arc<dyn Unmarshaller>> = vec![Arc::new(JsonUnmarshaller)];
    #[cfg(feature = "yaml")]
    unmarshallers.push(Arc::new(YamlUnmarshaller));
    #[cfg(feature = "toml")]
    unmarshallers.push(Arc::new(TomlUnmarshaller));
    unmarshallers
}

/// Picks the built-in unmarshaller handling the extension of `path`.
///
/// The extension is compared case-insensitively.
///
/// # Examples
///
/// ```rust
/// use dyncfg::adapters::unmarshaller_for_path;
///
/// assert!(unmarshaller_for_path("conf/app.json").is_ok());
/// assert!(unmarshaller_for_path("conf/app.ini").is_err());
/// ```
pub fn unmarshaller_for_path(path: impl AsRef<Path>) -> Result<Arc<dyn Unmarshaller>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    builtin_unmarshallers()
        .into_iter()
        .find(|u| u.supported_extensions().contains(&extension.as_str()))
        .ok_or_else(|| ConfigError::UnsupportedFormat {
            path: path.display().to_string(),
        })
}
