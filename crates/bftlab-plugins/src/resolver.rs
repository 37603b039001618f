//! Protocol-aware plugin selection.
//!
//! Every resolution reads configuration live through [`ConfigAccessor`], so
//! re-resolving after a protocol switch re-derives an entity's plugin set
//! from the configuration visible at that moment. Nothing is cached.
//!
//! ## Override rules
//!
//! - **Role**: learning mode, or a debug switch sequence that includes
//!   `cheapbft`, forces the `passive` role regardless of `plugins.role`.
//! - **Message**: learning mode, or a debug switch sequence that includes
//!   `zyzzyva`, puts `speculate` at the front of the list so the speculative
//!   fast path runs before any other message plugin. Learning mode also
//!   appends `learning`. Neither is ever duplicated.
//! - **Pipeline** and **transition**: no overrides.
//!
//! Unknown identifiers in list-valued kinds are logged and skipped; a
//! missing role or pipeline is returned as an error.

use std::sync::Arc;

use bftlab_config::{ConfigAccessor, keys};

use crate::{PluginCatalog, PluginError, PluginFamily, PluginId, PluginKind, Registry};

/// Protocol whose presence in the debug switch sequence forces a passive role.
pub const CHEAPBFT: &str = "cheapbft";

/// Protocol whose presence in the debug switch sequence enables speculation.
pub const ZYZZYVA: &str = "zyzzyva";

/// Applies the message-plugin override rules to a configured list.
///
/// `speculate` is inserted at the front when `learning` is set or the debug
/// sequence contains `zyzzyva`; `learning` is appended when `learning` is
/// set. Identifiers already present are left where they are, which makes
/// the function idempotent.
///
/// ```
/// use bftlab_plugins::{PluginId, compose_message_ids};
///
/// let composed = compose_message_ids(
///     vec![PluginId::Checkpoint, PluginId::Digest],
///     true,
///     &[],
/// );
/// assert_eq!(
///     composed,
///     vec![PluginId::Speculate, PluginId::Checkpoint, PluginId::Digest, PluginId::Learning]
/// );
/// ```
pub fn compose_message_ids(
    mut ids: Vec<PluginId>,
    learning: bool,
    debug_sequence: &[String],
) -> Vec<PluginId> {
    let speculative = learning || debug_sequence.iter().any(|p| p == ZYZZYVA);

    if speculative && !ids.contains(&PluginId::Speculate) {
        ids.insert(0, PluginId::Speculate);
    }
    if learning && !ids.contains(&PluginId::Learning) {
        ids.push(PluginId::Learning);
    }

    ids
}

/// The complete plugin set of one entity.
pub struct EntityPlugins<F: PluginFamily> {
    pub role: Box<F::Role>,
    pub messages: Vec<Box<F::Message>>,
    pub pipeline: Box<F::Pipeline>,
    pub transitions: Vec<Box<F::Transition>>,
}

/// Selects plugins for entities from a catalog and live configuration.
///
/// The resolver holds no state of its own beyond its two shared inputs and
/// may be cloned into, and called concurrently from, every entity thread.
pub struct PluginResolver<F: PluginFamily> {
    catalog: Arc<PluginCatalog<F>>,
    config: Arc<dyn ConfigAccessor>,
}

impl<F: PluginFamily> PluginResolver<F> {
    pub fn new(catalog: Arc<PluginCatalog<F>>, config: Arc<dyn ConfigAccessor>) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &PluginCatalog<F> {
        &self.catalog
    }

    pub fn config(&self) -> &Arc<dyn ConfigAccessor> {
        &self.config
    }

    /// Whether `general.learning` is set. Absent means `false`.
    pub fn learning_mode(&self) -> bool {
        self.config.flag(keys::GENERAL_LEARNING)
    }

    /// The configured debug switch sequence, empty when unset.
    pub fn debug_sequence(&self) -> Vec<String> {
        self.config
            .string_list(keys::SWITCHING_DEBUG_SEQUENCE)
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------------
    // Identifier selection
    // ------------------------------------------------------------------------

    /// Selects the role identifier, applying the passive-role overrides.
    pub fn role_id(&self) -> Result<PluginId, PluginError> {
        if self.learning_mode() {
            tracing::debug!("learning mode forces passive role");
            return Ok(PluginId::Passive);
        }
        if self.config.list_contains(keys::SWITCHING_DEBUG_SEQUENCE, CHEAPBFT) {
            tracing::debug!("cheapbft in debug sequence forces passive role");
            return Ok(PluginId::Passive);
        }
        self.configured_id(PluginKind::Role)
    }

    /// Composes the ordered message identifiers, applying the speculation
    /// and learning injections.
    pub fn message_ids(&self) -> Vec<PluginId> {
        compose_message_ids(
            self.configured_ids(PluginKind::Message),
            self.learning_mode(),
            &self.debug_sequence(),
        )
    }

    pub fn pipeline_id(&self) -> Result<PluginId, PluginError> {
        self.configured_id(PluginKind::Pipeline)
    }

    /// The configured transition identifiers, verbatim.
    pub fn transition_ids(&self) -> Vec<PluginId> {
        self.configured_ids(PluginKind::Transition)
    }

    // ------------------------------------------------------------------------
    // Instantiation
    // ------------------------------------------------------------------------

    /// Builds the role plugin for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::IdentifierNotFound`] if the selected role is not
    /// registered, or [`PluginError::Unconfigured`] if no role is configured
    /// and no override applies. Both are logged.
    pub fn resolve_role(&self, entity: &F::Entity) -> Result<Box<F::Role>, PluginError> {
        self.role_id()
            .and_then(|id| self.catalog.role().instantiate(&id, entity))
            .inspect_err(log_missing)
    }

    /// Builds the message plugins for `entity`, in processing order.
    /// Unregistered identifiers are logged and left out.
    pub fn resolve_message_plugins(&self, entity: &F::Entity) -> Vec<Box<F::Message>> {
        instantiate_known(self.catalog.message(), &self.message_ids(), entity)
    }

    /// Builds the pipeline plugin for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::IdentifierNotFound`] or
    /// [`PluginError::Unconfigured`]; there is no fallback pipeline.
    pub fn resolve_pipeline(&self, entity: &F::Entity) -> Result<Box<F::Pipeline>, PluginError> {
        self.pipeline_id()
            .and_then(|id| self.catalog.pipeline().instantiate(&id, entity))
            .inspect_err(log_missing)
    }

    /// Builds the transition plugins for `entity`, in configured order.
    /// Unregistered identifiers are logged and left out.
    pub fn resolve_transition_plugins(&self, entity: &F::Entity) -> Vec<Box<F::Transition>> {
        instantiate_known(self.catalog.transition(), &self.transition_ids(), entity)
    }

    /// Builds the complete plugin set for `entity`.
    ///
    /// Fails only if the role or the pipeline cannot be resolved.
    pub fn resolve_all(&self, entity: &F::Entity) -> Result<EntityPlugins<F>, PluginError> {
        let role = self.resolve_role(entity)?;
        let pipeline = self.resolve_pipeline(entity)?;
        Ok(EntityPlugins {
            role,
            messages: self.resolve_message_plugins(entity),
            pipeline,
            transitions: self.resolve_transition_plugins(entity),
        })
    }

    fn configured_id(&self, kind: PluginKind) -> Result<PluginId, PluginError> {
        let key = kind.config_key();
        self.config
            .string(key)
            .map(PluginId::new)
            .ok_or(PluginError::Unconfigured { kind, key })
    }

    fn configured_ids(&self, kind: PluginKind) -> Vec<PluginId> {
        self.config
            .string_list(kind.config_key())
            .unwrap_or_default()
            .into_iter()
            .map(PluginId::new)
            .collect()
    }
}

impl<F: PluginFamily> Clone for PluginResolver<F> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            config: Arc::clone(&self.config),
        }
    }
}

fn instantiate_known<E: ?Sized + 'static, P: ?Sized + 'static>(
    registry: &Registry<E, P>,
    ids: &[PluginId],
    entity: &E,
) -> Vec<Box<P>> {
    ids.iter()
        .filter_map(|id| {
            registry
                .instantiate(id, entity)
                .inspect_err(log_missing)
                .ok()
        })
        .collect()
}

fn log_missing(err: &PluginError) {
    match err {
        PluginError::IdentifierNotFound { kind, id } => {
            tracing::warn!(kind = %kind, id = %id, "plugin not found");
        }
        PluginError::Unconfigured { kind, key } => {
            tracing::warn!(kind = %kind, key, "plugin not configured");
        }
    }
}
