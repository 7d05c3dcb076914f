//! Per-context binding configuration.
//!
//! ## Environment Variables
//!
//! - `HOSTLUA_BINDING_MODE`: `"eager"` (default) or `"lazy"`
//! - `HOSTLUA_PRIVATE_ACCESS`: `"1"` or `"true"` binds non-public members too
//! - `HOSTLUA_BIND_NESTED`: `"0"` or `"false"` stops recursive binding of nested types
use hostlua_types::MemberAccess;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BindingMode {
    /// Every member wrapper is generated when the type is bound.
    #[default]
    Eager,
    /// Members start as placeholders and are generated on first use.
    Lazy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub binding_mode: BindingMode,
    pub member_access: MemberAccess,
    pub bind_nested_types: bool,
    pub merge_extension_methods: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            binding_mode: BindingMode::Eager,
            member_access: MemberAccess::Public,
            bind_nested_types: true,
            merge_extension_methods: true,
        }
    }
}

fn flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary variable source; unknown
    /// values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(mode) = lookup("HOSTLUA_BINDING_MODE") {
            match mode.trim().to_ascii_lowercase().as_str() {
                "lazy" => config.binding_mode = BindingMode::Lazy,
                "eager" => config.binding_mode = BindingMode::Eager,
                other => tracing::warn!(value = other, "ignoring unknown HOSTLUA_BINDING_MODE"),
            }
        }
        if lookup("HOSTLUA_PRIVATE_ACCESS").and_then(|v| flag(&v)) == Some(true) {
            config.member_access = MemberAccess::All;
        }
        if let Some(nested) = lookup("HOSTLUA_BIND_NESTED").and_then(|v| flag(&v)) {
            config.bind_nested_types = nested;
        }
        config
    }

    pub fn lazy(mut self) -> Self {
        self.binding_mode = BindingMode::Lazy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| vars.get(k).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        assert_eq!(BridgeConfig::from_lookup(lookup(&[])), BridgeConfig::default());
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = BridgeConfig::from_lookup(lookup(&[
            ("HOSTLUA_BINDING_MODE", "Lazy"),
            ("HOSTLUA_PRIVATE_ACCESS", "1"),
            ("HOSTLUA_BIND_NESTED", "false"),
        ]));
        assert_eq!(config.binding_mode, BindingMode::Lazy);
        assert_eq!(config.member_access, MemberAccess::All);
        assert!(!config.bind_nested_types);
    }

    #[test]
    fn test_unknown_mode_is_ignored() {
        let config = BridgeConfig::from_lookup(lookup(&[("HOSTLUA_BINDING_MODE", "sometimes")]));
        assert_eq!(config.binding_mode, BindingMode::Eager);
    }
}
