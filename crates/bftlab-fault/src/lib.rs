//! Fault policies for bftlab simulations.
//!
//! Each concrete fault type (node dark-outs, data pollution, slow proposals,
//! timeouts) owns a [`FaultPolicy`]. The policy tracks whether the fault is
//! *overridden* (forced active by `protocol.fault-override` under the
//! current protocol) and scopes its parameters under `fault.<name>.*`.
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use bftlab_config::{Settings, keys};
//! use bftlab_fault::{FaultKind, FaultPolicy, FaultSet};
//!
//! let config = Arc::new(
//!     Settings::new()
//!         .with(keys::PROTOCOL_FAULT_OVERRIDE, vec!["slow-proposal", "timeout"])
//!         .with_protocol("zyzzyva", keys::PROTOCOL_FAULT_OVERRIDE, vec!["timeout"]),
//! );
//!
//! let slow = Arc::new(FaultPolicy::for_kind(FaultKind::SlowProposal, config.clone()));
//! assert!(slow.is_overridden());
//!
//! let faults = FaultSet::new().with(slow.clone());
//! faults.reload_protocol("zyzzyva");
//! assert!(!slow.is_overridden());
//! ```

mod kind;
mod policy;
mod set;

pub use kind::FaultKind;
pub use policy::{Fault, FaultPolicy};
pub use set::FaultSet;
