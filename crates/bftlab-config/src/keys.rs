//! Well-known configuration keys.
//!
//! These strings are part of the configuration file contract and must match
//! the keys written by users exactly.

/// Role plugin identifier.
pub const PLUGINS_ROLE: &str = "plugins.role";

/// Ordered list of message plugin identifiers.
pub const PLUGINS_MESSAGE: &str = "plugins.message";

/// Pipeline plugin identifier.
pub const PLUGINS_PIPELINE: &str = "plugins.pipeline";

/// Ordered list of transition plugin identifiers.
pub const PLUGINS_TRANSITION: &str = "plugins.transition";

/// Global learning-mode flag.
pub const GENERAL_LEARNING: &str = "general.learning";

/// Ordered list of protocol names a run cycles through.
pub const SWITCHING_DEBUG_SEQUENCE: &str = "switching.debug-sequence";

/// Fault policies forced active for the current protocol.
pub const PROTOCOL_FAULT_OVERRIDE: &str = "protocol.fault-override";

/// Keys holding lists of names. Environment values for these are split on
/// commas: `BFTLAB__PLUGINS__MESSAGE=checkpoint,digest`.
pub const LIST_KEYS: [&str; 4] = [
    PLUGINS_MESSAGE,
    PLUGINS_TRANSITION,
    SWITCHING_DEBUG_SEQUENCE,
    PROTOCOL_FAULT_OVERRIDE,
];

/// Namespace root for per-policy fault parameters.
pub const FAULT_NAMESPACE: &str = "fault";

/// Per-policy field listing the entities a fault applies to.
pub const AFFECTED_ENTITIES: &str = "affected-entities";

/// Top-level table holding per-protocol layers in configuration files.
pub const PROTOCOLS_TABLE: &str = "protocols";

/// Builds the namespaced key for a fault policy parameter.
///
/// ```
/// use bftlab_config::keys;
///
/// assert_eq!(
///     keys::fault_field("timeout", keys::AFFECTED_ENTITIES),
///     "fault.timeout.affected-entities"
/// );
/// ```
pub fn fault_field(policy: &str, field: &str) -> String {
    format!("{FAULT_NAMESPACE}.{policy}.{field}")
}
