//! Driver-side collection of every fault in a run.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use bftlab_config::ConfigAccessor;

use crate::Fault;

/// All fault policies of a simulation run.
///
/// The simulation driver registers each concrete fault once at startup and
/// calls [`switch_protocol`](Self::switch_protocol) whenever the active
/// protocol changes. Reloads through the set are serialized by an internal
/// lock, so two threads switching protocols cannot interleave their steps;
/// the last completed reload determines every policy's flag and the active
/// protocol.
#[derive(Default)]
pub struct FaultSet {
    faults: Vec<Arc<dyn Fault>>,
    reload_lock: Mutex<Option<String>>,
}

impl FaultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fault. A fault with the same name is replaced.
    pub fn register(&mut self, fault: Arc<dyn Fault>) {
        match self.faults.iter_mut().find(|f| f.name() == fault.name()) {
            Some(existing) => *existing = fault,
            None => self.faults.push(fault),
        }
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, fault: Arc<dyn Fault>) -> Self {
        self.register(fault);
        self
    }

    /// Reloads every fault under `protocol`.
    pub fn reload_protocol(&self, protocol: &str) {
        self.reload(None, protocol);
    }

    /// Makes `protocol` active on `config` and reloads every fault, as one
    /// step under the reload lock.
    ///
    /// Faults may hold a different accessor than `config`; both end up on
    /// `protocol`.
    pub fn switch_protocol(&self, config: &dyn ConfigAccessor, protocol: &str) {
        self.reload(Some(config), protocol);
    }

    fn reload(&self, config: Option<&dyn ConfigAccessor>, protocol: &str) {
        let mut current = self
            .reload_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(config) = config {
            config.set_current_protocol(protocol);
        }
        for fault in &self.faults {
            fault.reload_protocol(protocol);
        }
        *current = Some(protocol.to_string());

        tracing::info!(
            protocol,
            faults = self.faults.len(),
            overridden = ?self.overridden(),
            "fault policies reloaded"
        );
    }

    /// Protocol of the last completed reload through this set.
    pub fn current_protocol(&self) -> Option<String> {
        self.reload_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Names of the faults currently forced active.
    pub fn overridden(&self) -> Vec<&str> {
        self.faults
            .iter()
            .filter(|f| f.is_overridden())
            .map(|f| f.name())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Fault>> {
        self.faults.iter().find(|f| f.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Fault>> {
        self.faults.iter()
    }

    pub fn len(&self) -> usize {
        self.faults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }
}

impl fmt::Debug for FaultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.faults.iter().map(|fault| fault.name()).collect();
        f.debug_struct("FaultSet")
            .field("faults", &names)
            .field("overridden", &self.overridden())
            .finish_non_exhaustive()
    }
}
