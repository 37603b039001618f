//! In-memory layered settings store.
//!
//! [`Settings`] holds a base layer of dotted keys plus one layer per
//! protocol. Reads consult the active protocol's layer first and fall back
//! to the base layer, so a protocol switch changes what every subsequent
//! read observes without rebuilding anything.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::{ConfigAccessor, ConfigError, keys};

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ConfigValue>),
    Table(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Booleans also accept the strings `"true"` and `"false"`, which is
    /// how untyped sources such as environment variables deliver them.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            ConfigValue::Str(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the list as strings, or `None` if any element is not a string.
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        match self {
            ConfigValue::List(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => None,
        }
    }

    /// Returns the list as integers, or `None` if any element is not an integer.
    pub fn as_int_list(&self) -> Option<Vec<i64>> {
        match self {
            ConfigValue::List(items) => items.iter().map(ConfigValue::as_i64).collect(),
            _ => None,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Int(_) => "int",
            ConfigValue::Float(_) => "float",
            ConfigValue::Str(_) => "string",
            ConfigValue::List(_) => "list",
            ConfigValue::Table(_) => "table",
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        ConfigValue::Float(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Str(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Str(value)
    }
}

impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(values: Vec<T>) -> Self {
        ConfigValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Layered configuration with a switchable active protocol.
///
/// # Thread Safety
///
/// The layers are immutable once the settings are shared. Only the active
/// protocol selector is mutable through `&self`, guarded by an `RwLock`, so
/// `Settings` can sit behind an `Arc` and be read from every entity thread.
#[derive(Debug, Default)]
pub struct Settings {
    base: HashMap<String, ConfigValue>,
    protocols: HashMap<String, HashMap<String, ConfigValue>>,
    current_protocol: RwLock<Option<String>>,
}

impl Settings {
    /// Creates empty settings with no active protocol.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a base-layer value. Builder form of [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets a value in a protocol layer. Builder form of
    /// [`set_for_protocol`](Self::set_for_protocol).
    pub fn with_protocol(
        mut self,
        protocol: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<ConfigValue>,
    ) -> Self {
        self.set_for_protocol(protocol, key, value);
        self
    }

    /// Sets a base-layer value, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.base.insert(key.into(), value.into());
    }

    /// Sets a value that only applies while `protocol` is active.
    pub fn set_for_protocol(
        &mut self,
        protocol: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<ConfigValue>,
    ) {
        self.protocols
            .entry(protocol.into())
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Builds settings from a nested configuration tree.
    ///
    /// Nested tables are flattened into dotted keys. The top-level
    /// `protocols` table is split out: each of its entries becomes the layer
    /// for the protocol of the same name.
    pub fn from_tree(tree: BTreeMap<String, ConfigValue>) -> Result<Self, ConfigError> {
        let mut settings = Self::new();

        for (key, value) in tree {
            if key == keys::PROTOCOLS_TABLE {
                let ConfigValue::Table(protocols) = value else {
                    return Err(ConfigError::ProtocolsNotTable {
                        key: keys::PROTOCOLS_TABLE,
                    });
                };
                for (protocol, layer) in protocols {
                    let ConfigValue::Table(layer) = layer else {
                        return Err(ConfigError::InvalidProtocolLayer { protocol });
                    };
                    let flattened = settings.protocols.entry(protocol).or_default();
                    for (layer_key, layer_value) in layer {
                        flatten_into(flattened, layer_key, layer_value);
                    }
                }
            } else {
                flatten_into(&mut settings.base, key, value);
            }
        }

        Ok(settings)
    }

    /// Parses settings from a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let tree: BTreeMap<String, ConfigValue> = toml::from_str(source)?;
        Self::from_tree(tree)
    }

    /// Reads and parses a single TOML file, without any layering.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let tree: BTreeMap<String, ConfigValue> =
            toml::from_str(&source).map_err(|source| ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_tree(tree)
    }

    /// Returns the raw value visible for `key` under the active protocol.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        let current = self
            .current_protocol
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let layered = current
            .as_deref()
            .and_then(|protocol| self.protocols.get(protocol))
            .and_then(|layer| layer.get(key));
        drop(current);

        layered.or_else(|| self.base.get(key))
    }

    /// Names of all protocols that have a dedicated layer.
    pub fn protocols(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.protocols.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn typed<T>(
        &self,
        key: &str,
        expected: &'static str,
        convert: impl FnOnce(&ConfigValue) -> Option<T>,
    ) -> Option<T> {
        let value = self.get(key)?;
        let converted = convert(value);
        if converted.is_none() {
            tracing::warn!(
                key,
                expected,
                found = value.type_name(),
                "config value has unexpected type, treating as unset"
            );
        }
        converted
    }
}

fn flatten_into(target: &mut HashMap<String, ConfigValue>, prefix: String, value: ConfigValue) {
    match value {
        ConfigValue::Table(table) => {
            for (key, nested) in table {
                flatten_into(target, format!("{prefix}.{key}"), nested);
            }
        }
        other => {
            target.insert(prefix, other);
        }
    }
}

impl ConfigAccessor for Settings {
    fn string(&self, key: &str) -> Option<String> {
        self.typed(key, "string", |v| v.as_str().map(str::to_string))
    }

    fn bool(&self, key: &str) -> Option<bool> {
        self.typed(key, "bool", ConfigValue::as_bool)
    }

    fn string_list(&self, key: &str) -> Option<Vec<String>> {
        self.typed(key, "list of strings", ConfigValue::as_string_list)
    }

    fn int_list(&self, key: &str) -> Option<Vec<i64>> {
        self.typed(key, "list of integers", ConfigValue::as_int_list)
    }

    fn current_protocol(&self) -> Option<String> {
        self.current_protocol
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_current_protocol(&self, protocol: &str) {
        if !self.protocols.contains_key(protocol) {
            tracing::debug!(protocol, "no protocol layer configured, base values apply");
        }
        *self
            .current_protocol
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(protocol.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn layered() -> Settings {
        Settings::new()
            .with(keys::PLUGINS_ROLE, "primary")
            .with(keys::PROTOCOL_FAULT_OVERRIDE, vec!["timeout"])
            .with_protocol("zyzzyva", keys::PROTOCOL_FAULT_OVERRIDE, vec!["in-dark"])
            .with_protocol("zyzzyva", keys::PLUGINS_PIPELINE, "qc-pipeline")
    }

    #[test]
    fn test_base_values_without_protocol() {
        let settings = layered();
        assert_eq!(settings.current_protocol(), None);
        assert_eq!(settings.string(keys::PLUGINS_ROLE).as_deref(), Some("primary"));
        assert_eq!(
            settings.string_list(keys::PROTOCOL_FAULT_OVERRIDE),
            Some(vec!["timeout".to_string()])
        );
        assert_eq!(settings.string(keys::PLUGINS_PIPELINE), None);
    }

    #[test]
    fn test_protocol_layer_shadows_base() {
        let settings = layered();
        settings.set_current_protocol("zyzzyva");

        assert_eq!(settings.current_protocol().as_deref(), Some("zyzzyva"));
        assert_eq!(
            settings.string_list(keys::PROTOCOL_FAULT_OVERRIDE),
            Some(vec!["in-dark".to_string()])
        );
        assert_eq!(
            settings.string(keys::PLUGINS_PIPELINE).as_deref(),
            Some("qc-pipeline")
        );
        // Keys missing from the layer fall back to the base.
        assert_eq!(settings.string(keys::PLUGINS_ROLE).as_deref(), Some("primary"));
    }

    #[test]
    fn test_switching_to_unlayered_protocol_uses_base() {
        let settings = layered();
        settings.set_current_protocol("zyzzyva");
        settings.set_current_protocol("pbft");

        assert_eq!(
            settings.string_list(keys::PROTOCOL_FAULT_OVERRIDE),
            Some(vec!["timeout".to_string()])
        );
    }

    #[test]
    fn test_type_mismatch_reads_as_unset() {
        let settings = Settings::new()
            .with(keys::GENERAL_LEARNING, 3_i64)
            .with(keys::PLUGINS_MESSAGE, vec![ConfigValue::from("digest"), 7_i64.into()]);

        assert_eq!(settings.bool(keys::GENERAL_LEARNING), None);
        assert_eq!(settings.string_list(keys::PLUGINS_MESSAGE), None);
    }

    #[test_case(ConfigValue::Bool(true), Some(true); "native bool")]
    #[test_case(ConfigValue::from("false"), Some(false); "string bool")]
    #[test_case(ConfigValue::from("yes"), None; "unparseable string")]
    #[test_case(ConfigValue::Int(1), None; "integer")]
    fn test_bool_coercion(value: ConfigValue, expected: Option<bool>) {
        assert_eq!(value.as_bool(), expected);
    }

    #[test]
    fn test_from_toml_splits_protocol_layers() {
        let settings = Settings::from_toml_str(
            r#"
[plugins]
role = "primary"
message = ["checkpoint", "digest"]

[fault.timeout]
affected-entities = [1, 2, 3]

[protocols.cheapbft.protocol]
fault-override = ["slow-proposal"]
"#,
        )
        .expect("valid toml");

        assert_eq!(
            settings.string_list(keys::PLUGINS_MESSAGE),
            Some(vec!["checkpoint".to_string(), "digest".to_string()])
        );
        assert_eq!(
            settings.int_list("fault.timeout.affected-entities"),
            Some(vec![1, 2, 3])
        );
        assert_eq!(settings.protocols(), vec!["cheapbft"]);
        assert_eq!(settings.string_list(keys::PROTOCOL_FAULT_OVERRIDE), None);

        settings.set_current_protocol("cheapbft");
        assert_eq!(
            settings.string_list(keys::PROTOCOL_FAULT_OVERRIDE),
            Some(vec!["slow-proposal".to_string()])
        );
    }

    #[test]
    fn test_protocol_layer_must_be_table() {
        let result = Settings::from_toml_str(
            r#"
[protocols]
pbft = "not a table"
"#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidProtocolLayer { protocol }) if protocol == "pbft"
        ));

        let result = Settings::from_toml_str("protocols = [\"pbft\"]");
        assert!(matches!(result, Err(ConfigError::ProtocolsNotTable { .. })));
    }

    #[test]
    fn test_from_file_reports_path_on_parse_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[plugins\nrole = 1").expect("Failed to write config");

        match Settings::from_file(&path) {
            Err(ConfigError::ParseError { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected ParseError, got {other:?}"),
        }
    }
}
