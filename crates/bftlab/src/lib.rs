//! # bftlab
//!
//! Protocol composition and fault-injection control for Byzantine
//! fault-tolerant protocol simulations.
//!
//! A simulated entity is assembled at runtime from interchangeable plugins
//! chosen by configuration, and faults are toggled per policy, with a
//! per-protocol override list that can force any of them on. Both follow
//! the active protocol live, so a run can switch protocols mid-flight.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Composition                          │
//! │  ┌──────────────┐   ┌────────────────┐   ┌────────────────┐  │
//! │  │ PluginCatalog│ → │ PluginResolver │ ← │ ConfigAccessor │  │
//! │  │  (factories) │   │ (override rules)│  │ (live, layered)│  │
//! │  └──────────────┘   └────────────────┘   └───────▲────────┘  │
//! │                                                  │           │
//! │                     ┌────────────────┐           │           │
//! │                     │    FaultSet    │ ──────────┘           │
//! │                     │ (FaultPolicy×n)│   switch protocol     │
//! │                     └────────────────┘                       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - **Composition root**: [`Composition`]
//! - **Configuration**: [`Settings`], [`ConfigLoader`], [`ConfigAccessor`]
//! - **Plugins**: [`PluginCatalog`], [`PluginResolver`], [`PluginId`]
//! - **Faults**: [`FaultPolicy`], [`Fault`], [`FaultSet`]

mod composition;

pub use composition::Composition;

// Configuration
pub use bftlab_config::{
    BftlabConfig, ConfigAccessor, ConfigError, ConfigLoader, ConfigValue, Paths, Settings, keys,
};

// Plugins
pub use bftlab_plugins::{
    CHEAPBFT, EntityPlugins, PluginCatalog, PluginError, PluginFamily, PluginId, PluginKind,
    PluginResolver, Registry, ZYZZYVA, compose_message_ids,
};

// Faults
pub use bftlab_fault::{Fault, FaultKind, FaultPolicy, FaultSet};
