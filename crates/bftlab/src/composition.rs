//! The composition root of a simulation run.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use bftlab_config::{ConfigAccessor, ConfigLoader};
use bftlab_fault::{Fault, FaultKind, FaultPolicy, FaultSet};
use bftlab_plugins::{EntityPlugins, PluginCatalog, PluginError, PluginFamily, PluginResolver};

/// Owns the shared pieces of a run: the configuration, the plugin catalog
/// (through the resolver) and the fault policies.
///
/// Built once by the simulation driver and handed to entity threads by
/// reference. Entities call [`assemble`](Self::assemble) (or the resolver
/// directly) to get their plugins; the driver calls
/// [`switch_protocol`](Self::switch_protocol) when the run moves on to the
/// next protocol.
pub struct Composition<F: PluginFamily> {
    config: Arc<dyn ConfigAccessor>,
    resolver: PluginResolver<F>,
    faults: FaultSet,
}

impl<F: PluginFamily> Composition<F> {
    pub fn new(catalog: PluginCatalog<F>, config: Arc<dyn ConfigAccessor>) -> Self {
        for (kind, id) in catalog.missing_defaults() {
            tracing::debug!(kind = %kind, id = %id, "stock plugin not registered");
        }

        Self {
            resolver: PluginResolver::new(Arc::new(catalog), Arc::clone(&config)),
            config,
            faults: FaultSet::new(),
        }
    }

    /// Loads configuration from `experiment_dir` (see [`ConfigLoader`]) and
    /// composes it with `catalog`.
    pub fn load(catalog: PluginCatalog<F>, experiment_dir: impl AsRef<Path>) -> Result<Self> {
        let settings = ConfigLoader::new().with_experiment_dir(experiment_dir).load()?;
        Ok(Self::new(catalog, Arc::new(settings)))
    }

    /// Registers a concrete fault.
    pub fn with_fault(mut self, fault: Arc<dyn Fault>) -> Self {
        self.faults.register(fault);
        self
    }

    /// Registers a bare policy for one of the stock fault types.
    pub fn with_fault_kind(self, kind: FaultKind) -> Self {
        let policy = FaultPolicy::for_kind(kind, Arc::clone(&self.config));
        self.with_fault(Arc::new(policy))
    }

    pub fn config(&self) -> &Arc<dyn ConfigAccessor> {
        &self.config
    }

    pub fn resolver(&self) -> &PluginResolver<F> {
        &self.resolver
    }

    pub fn faults(&self) -> &FaultSet {
        &self.faults
    }

    /// Builds every plugin for `entity` under the active protocol.
    pub fn assemble(&self, entity: &F::Entity) -> Result<EntityPlugins<F>, PluginError> {
        self.resolver.resolve_all(entity)
    }

    /// Makes `protocol` the active protocol for configuration reads and
    /// reloads every fault policy under it.
    ///
    /// Entities pick up protocol-dependent plugins the next time they
    /// resolve.
    pub fn switch_protocol(&self, protocol: &str) {
        self.faults.switch_protocol(self.config.as_ref(), protocol);
        tracing::info!(protocol, "protocol switched");
    }

    pub fn current_protocol(&self) -> Option<String> {
        self.config.current_protocol()
    }
}
