// SPDX-License-Identifier: MIT OR Apache-2.0

//! Options for structured decoding of configuration subtrees.

/// Namespace under which built-in components keep their settings.
pub const BUILTIN_NAMESPACE: &str = "jupiter";

/// Options accepted by `Configuration::unmarshal_key_with`.
///
/// A namespace and module scope the requested key, so a component can ask
/// for `"demo"` and read `"jupiter.mysql.demo"`.
///
/// # Examples
///
/// ```
/// use dyncfg::domain::GetOptions;
///
/// let options = GetOptions::builtin_module("mysql");
/// assert_eq!(options.scoped_key("demo", "."), "jupiter.mysql.demo");
/// assert_eq!(GetOptions::new().scoped_key("demo", "."), "demo");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetOptions {
    namespace: Option<String>,
    module: Option<String>,
}

impl GetOptions {
    /// Creates empty options; keys are used as given.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options scoped to a module of the built-in namespace.
    pub fn builtin_module(module: impl Into<String>) -> Self {
        Self::new().namespace(BUILTIN_NAMESPACE).module(module)
    }

    /// Sets the namespace segment.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the module segment.
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Joins namespace, module and key with `delimiter`, skipping empty parts.
    pub fn scoped_key(&self, key: &str, delimiter: &str) -> String {
        [self.namespace.as_deref(), self.module.as_deref(), Some(key)]
            .into_iter()
            .flatten()
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join(delimiter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_key_combinations() {
        assert_eq!(GetOptions::new().scoped_key("", "."), "");
        assert_eq!(
            GetOptions::new().namespace("app").scoped_key("db", "."),
            "app.db"
        );
        assert_eq!(GetOptions::new().module("redis").scoped_key("", "/"), "redis");
        assert_eq!(
            GetOptions::builtin_module("grpc").scoped_key("server", "."),
            "jupiter.grpc.server"
        );
    }
}
