use crate::{PluginId, PluginKind};

/// Errors raised while resolving plugins for an entity.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PluginError {
    /// The configured identifier has no registered factory.
    #[error("{kind} plugin not found: {id}")]
    IdentifierNotFound { kind: PluginKind, id: PluginId },

    /// No identifier is configured for a single-valued plugin kind.
    #[error("no {kind} plugin configured under '{key}'")]
    Unconfigured { kind: PluginKind, key: &'static str },
}

impl PluginError {
    pub fn kind(&self) -> PluginKind {
        match self {
            PluginError::IdentifierNotFound { kind, .. } | PluginError::Unconfigured { kind, .. } => {
                *kind
            }
        }
    }
}
