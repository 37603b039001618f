//! Plugin categories and identifiers.

use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt::{self, Display};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use bftlab_config::keys;
use serde::{Deserialize, Serialize};

/// The four plugin categories an entity is composed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginKind {
    /// Consensus role behavior (primary, passive, ...).
    Role,
    /// Handling of one message category. An entity has an ordered list.
    Message,
    /// Message-processing flow.
    Pipeline,
    /// Protocol state transitions. An entity has an ordered list.
    Transition,
}

impl PluginKind {
    pub const ALL: [PluginKind; 4] = [
        PluginKind::Role,
        PluginKind::Message,
        PluginKind::Pipeline,
        PluginKind::Transition,
    ];

    /// Configuration key naming the plugin(s) of this kind.
    pub fn config_key(self) -> &'static str {
        match self {
            PluginKind::Role => keys::PLUGINS_ROLE,
            PluginKind::Message => keys::PLUGINS_MESSAGE,
            PluginKind::Pipeline => keys::PLUGINS_PIPELINE,
            PluginKind::Transition => keys::PLUGINS_TRANSITION,
        }
    }
}

impl Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginKind::Role => write!(f, "role"),
            PluginKind::Message => write!(f, "message"),
            PluginKind::Pipeline => write!(f, "pipeline"),
            PluginKind::Transition => write!(f, "transition"),
        }
    }
}

/// Identifier a plugin factory is registered under.
///
/// Identifiers used by the stock framework have dedicated variants; anything
/// else is carried as [`PluginId::Custom`]. Construction from a string is
/// canonical, so `PluginId::new("passive")` is always `PluginId::Passive`
/// and never `Custom("passive")`.
///
/// Equality, ordering and hashing go through [`as_str`](Self::as_str), so a
/// hand-built `Custom("passive")` is the same identifier as `Passive`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PluginId {
    /// `primary` role.
    Primary,
    /// `passive` role.
    Passive,
    /// `qc-primary` role.
    QcPrimary,
    /// `checkpoint` message or transition plugin.
    Checkpoint,
    /// `digest` message plugin.
    Digest,
    /// `mac` message plugin.
    Mac,
    /// `speculate` message plugin (speculative fast path).
    Speculate,
    /// `read-only` message plugin.
    ReadOnly,
    /// `learning` message plugin (learning-harness instrumentation).
    Learning,
    /// `direct` pipeline.
    Direct,
    /// `qc-pipeline` pipeline.
    QcPipeline,
    /// Any other identifier.
    Custom(String),
}

impl PluginId {
    /// Parses an identifier, mapping well-known names to their variants.
    pub fn new(name: impl AsRef<str>) -> Self {
        match name.as_ref() {
            "primary" => PluginId::Primary,
            "passive" => PluginId::Passive,
            "qc-primary" => PluginId::QcPrimary,
            "checkpoint" => PluginId::Checkpoint,
            "digest" => PluginId::Digest,
            "mac" => PluginId::Mac,
            "speculate" => PluginId::Speculate,
            "read-only" => PluginId::ReadOnly,
            "learning" => PluginId::Learning,
            "direct" => PluginId::Direct,
            "qc-pipeline" => PluginId::QcPipeline,
            other => PluginId::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PluginId::Primary => "primary",
            PluginId::Passive => "passive",
            PluginId::QcPrimary => "qc-primary",
            PluginId::Checkpoint => "checkpoint",
            PluginId::Digest => "digest",
            PluginId::Mac => "mac",
            PluginId::Speculate => "speculate",
            PluginId::ReadOnly => "read-only",
            PluginId::Learning => "learning",
            PluginId::Direct => "direct",
            PluginId::QcPipeline => "qc-pipeline",
            PluginId::Custom(name) => name,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, PluginId::Custom(_))
    }

    /// Identifiers a stock catalog registers for `kind`.
    pub fn defaults(kind: PluginKind) -> Vec<PluginId> {
        match kind {
            PluginKind::Role => vec![PluginId::Primary, PluginId::Passive, PluginId::QcPrimary],
            PluginKind::Message => vec![
                PluginId::Checkpoint,
                PluginId::Digest,
                PluginId::Mac,
                PluginId::Speculate,
                PluginId::ReadOnly,
                PluginId::Learning,
            ],
            PluginKind::Pipeline => vec![PluginId::Direct, PluginId::QcPipeline],
            PluginKind::Transition => vec![PluginId::Checkpoint],
        }
    }
}

impl PartialEq for PluginId {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for PluginId {}

impl Hash for PluginId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl PartialOrd for PluginId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PluginId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PluginId::new(s))
    }
}

impl From<&str> for PluginId {
    fn from(name: &str) -> Self {
        PluginId::new(name)
    }
}

impl From<String> for PluginId {
    fn from(name: String) -> Self {
        PluginId::new(name)
    }
}

impl From<PluginId> for String {
    fn from(id: PluginId) -> Self {
        match id {
            PluginId::Custom(name) => name,
            known => known.as_str().to_string(),
        }
    }
}
