//! Per-fault-type override bookkeeping.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bftlab_config::{ConfigAccessor, keys};

use crate::FaultKind;

/// Base state shared by every concrete fault type.
///
/// A policy is *overridden* when its name appears in
/// `protocol.fault-override` for the active protocol, meaning the fault is
/// forced on whatever the rest of its configuration says. The flag is
/// recomputed from scratch at construction and on every
/// [`reload_protocol`](Self::reload_protocol).
///
/// # Concurrency
///
/// The flag is an [`AtomicBool`]: fault-checking threads always observe
/// either the value before a reload or the value after it. A reload itself
/// is three separate steps (switch protocol, read override list, store
/// flag), so two threads reloading different protocols at once race and the
/// last writer wins. Drive reloads through [`FaultSet`](crate::FaultSet),
/// which serializes them, when more than one thread may switch protocols.
pub struct FaultPolicy {
    name: String,
    overridden: AtomicBool,
    config: Arc<dyn ConfigAccessor>,
}

impl FaultPolicy {
    pub fn new(name: impl Into<String>, config: Arc<dyn ConfigAccessor>) -> Self {
        let name = name.into();
        let overridden = is_listed(config.as_ref(), &name);
        Self {
            name,
            overridden: AtomicBool::new(overridden),
            config,
        }
    }

    /// Creates the policy for one of the framework's fault types.
    pub fn for_kind(kind: FaultKind, config: Arc<dyn ConfigAccessor>) -> Self {
        Self::new(kind.policy_name(), config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the fault is forced active under the current protocol.
    pub fn is_overridden(&self) -> bool {
        self.overridden.load(Ordering::Acquire)
    }

    /// Switches the configuration to `protocol` and recomputes the override
    /// flag under it.
    pub fn reload_protocol(&self, protocol: &str) {
        self.config.set_current_protocol(protocol);
        let overridden = is_listed(self.config.as_ref(), &self.name);
        let previous = self.overridden.swap(overridden, Ordering::AcqRel);

        if previous != overridden {
            tracing::debug!(
                policy = %self.name,
                protocol,
                overridden,
                "fault override changed"
            );
        }
    }

    /// Namespaced configuration key for one of this policy's parameters.
    pub fn field_key(&self, field: &str) -> String {
        keys::fault_field(&self.name, field)
    }

    /// Entities the fault applies to, in configured order.
    ///
    /// An unset list means the fault applies to no entity.
    pub fn affected_entities(&self) -> Vec<i64> {
        self.config
            .int_list(&self.field_key(keys::AFFECTED_ENTITIES))
            .unwrap_or_default()
    }

    pub fn affects(&self, entity: i64) -> bool {
        self.affected_entities().contains(&entity)
    }

    /// The configuration this policy reads, for policy-specific parameters.
    pub fn config(&self) -> &Arc<dyn ConfigAccessor> {
        &self.config
    }
}

impl fmt::Debug for FaultPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultPolicy")
            .field("name", &self.name)
            .field("overridden", &self.is_overridden())
            .finish_non_exhaustive()
    }
}

fn is_listed(config: &dyn ConfigAccessor, name: &str) -> bool {
    config.list_contains(keys::PROTOCOL_FAULT_OVERRIDE, name)
}

/// Contract for concrete fault types.
///
/// Implementors own a [`FaultPolicy`] and decide, from its override flag and
/// their own `fault.<name>.*` parameters, whether and how to inject.
pub trait Fault: Send + Sync {
    fn policy(&self) -> &FaultPolicy;

    fn name(&self) -> &str {
        self.policy().name()
    }

    fn reload_protocol(&self, protocol: &str) {
        self.policy().reload_protocol(protocol);
    }

    fn is_overridden(&self) -> bool {
        self.policy().is_overridden()
    }

    fn affected_entities(&self) -> Vec<i64> {
        self.policy().affected_entities()
    }
}

impl Fault for FaultPolicy {
    fn policy(&self) -> &FaultPolicy {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bftlab_config::Settings;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn policy(name: &str, settings: Settings) -> FaultPolicy {
        FaultPolicy::new(name, Arc::new(settings))
    }

    #[test]
    fn overridden_at_construction_when_listed() {
        let policy = policy(
            "slow-proposal",
            Settings::new().with(keys::PROTOCOL_FAULT_OVERRIDE, vec!["slow-proposal", "timeout"]),
        );
        assert!(policy.is_overridden());
    }

    #[test]
    fn not_overridden_when_list_absent_or_unlisted() {
        assert!(!policy("timeout", Settings::new()).is_overridden());
        assert!(
            !policy(
                "timeout",
                Settings::new().with(keys::PROTOCOL_FAULT_OVERRIDE, vec!["in-dark"])
            )
            .is_overridden()
        );
    }

    #[test]
    fn reload_recomputes_from_protocol_layer() {
        let settings = Settings::new()
            .with(keys::PROTOCOL_FAULT_OVERRIDE, vec!["slow-proposal", "timeout"])
            .with_protocol("pbft", keys::PROTOCOL_FAULT_OVERRIDE, vec!["timeout"])
            .with_protocol(
                "zyzzyva",
                keys::PROTOCOL_FAULT_OVERRIDE,
                vec!["slow-proposal", "in-dark"],
            );
        let policy = policy("slow-proposal", settings);
        assert!(policy.is_overridden());

        policy.reload_protocol("pbft");
        assert!(!policy.is_overridden());
        assert_eq!(policy.config().current_protocol().as_deref(), Some("pbft"));

        policy.reload_protocol("zyzzyva");
        assert!(policy.is_overridden());

        // Reloading the same protocol keeps the flag.
        policy.reload_protocol("zyzzyva");
        assert!(policy.is_overridden());
    }

    #[test]
    fn field_key_is_namespaced() {
        let policy = policy("in-dark", Settings::new());
        assert_eq!(policy.field_key("duration"), "fault.in-dark.duration");
        assert_eq!(
            policy.field_key(keys::AFFECTED_ENTITIES),
            "fault.in-dark.affected-entities"
        );
    }

    #[test]
    fn affected_entities_reads_namespaced_list() {
        let policy = policy(
            "pollution",
            Settings::new()
                .with("fault.pollution.affected-entities", vec![3_i64, 1, 2])
                .with("fault.timeout.affected-entities", vec![9_i64]),
        );
        assert_eq!(policy.affected_entities(), vec![3, 1, 2]);
        assert!(policy.affects(1));
        assert!(!policy.affects(9));
    }

    #[test]
    fn affected_entities_unset_is_empty() {
        let policy = policy("pollution", Settings::new());
        assert!(policy.affected_entities().is_empty());
        assert!(!policy.affects(0));
    }

    #[test]
    fn affected_entities_follow_protocol() {
        let settings = Settings::new()
            .with("fault.timeout.affected-entities", vec![0_i64])
            .with_protocol("hotstuff", "fault.timeout.affected-entities", vec![1_i64, 2]);
        let policy = policy("timeout", settings);

        assert_eq!(policy.affected_entities(), vec![0]);
        policy.reload_protocol("hotstuff");
        assert_eq!(policy.affected_entities(), vec![1, 2]);
    }

    #[test]
    fn for_kind_uses_policy_name() {
        let policy = FaultPolicy::for_kind(
            FaultKind::SlowProposal,
            Arc::new(Settings::new().with(keys::PROTOCOL_FAULT_OVERRIDE, vec!["slow-proposal"])),
        );
        assert_eq!(policy.name(), "slow-proposal");
        assert!(Fault::is_overridden(&policy));
    }

    #[test]
    fn concurrent_readers_track_reloads() {
        let settings = Settings::new()
            .with_protocol("on", keys::PROTOCOL_FAULT_OVERRIDE, vec!["timeout"])
            .with_protocol("off", keys::PROTOCOL_FAULT_OVERRIDE, Vec::<String>::new());
        let policy = Arc::new(policy("timeout", settings));
        let finished = Arc::new(AtomicUsize::new(0));

        // Each reader runs until it has observed both flag values.
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let policy = Arc::clone(&policy);
                let finished = Arc::clone(&finished);
                thread::spawn(move || {
                    let mut seen = [false; 2];
                    while !(seen[0] && seen[1]) {
                        seen[usize::from(policy.is_overridden())] = true;
                        thread::yield_now();
                    }
                    finished.fetch_add(1, Ordering::AcqRel);
                })
            })
            .collect();

        let mut on = true;
        while finished.load(Ordering::Acquire) < 4 {
            policy.reload_protocol(if on { "on" } else { "off" });
            on = !on;
            thread::yield_now();
        }
        for reader in readers {
            reader.join().unwrap();
        }

        policy.reload_protocol("on");
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let policy = Arc::clone(&policy);
                thread::spawn(move || policy.is_overridden())
            })
            .collect();
        let observed: Vec<bool> = readers
            .into_iter()
            .map(|reader| reader.join().unwrap())
            .collect();
        assert_eq!(observed, vec![true; 4]);
    }
}
