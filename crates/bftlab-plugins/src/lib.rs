//! bftlab-plugins: runtime composition of simulated BFT entities
//!
//! A simulated node is assembled from four kinds of interchangeable
//! behavior, chosen by configuration rather than at build time:
//!
//! - **Role**: consensus role (primary, passive, ...)
//! - **Message**: an ordered chain of message-category handlers
//! - **Pipeline**: the message-processing flow
//! - **Transition**: an ordered chain of state-transition handlers
//!
//! [`PluginCatalog`] maps identifiers to factories for each kind.
//! [`PluginResolver`] reads the live configuration, applies the
//! protocol-specific override rules, and instantiates the selected plugins
//! for an entity.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use bftlab_config::{Settings, keys};
//! use bftlab_plugins::{PluginCatalog, PluginFamily, PluginResolver};
//!
//! struct Node;
//! struct Names;
//!
//! impl PluginFamily for Names {
//!     type Entity = Node;
//!     type Role = str;
//!     type Message = str;
//!     type Pipeline = str;
//!     type Transition = str;
//! }
//!
//! let catalog = PluginCatalog::<Names>::new()
//!     .with_role("primary", |_: &Node| "primary".into())
//!     .with_role("passive", |_: &Node| "passive".into());
//!
//! let settings = Settings::new()
//!     .with(keys::PLUGINS_ROLE, "primary")
//!     .with(keys::SWITCHING_DEBUG_SEQUENCE, vec!["pbft", "cheapbft"]);
//!
//! let resolver = PluginResolver::new(Arc::new(catalog), Arc::new(settings));
//!
//! // cheapbft in the switch sequence forces the passive role
//! assert_eq!(&*resolver.resolve_role(&Node).unwrap(), "passive");
//! ```

mod catalog;
mod error;
mod id;
mod resolver;

pub use catalog::{PluginCatalog, PluginFamily, Registry};
pub use error::PluginError;
pub use id::{PluginId, PluginKind};
pub use resolver::{CHEAPBFT, EntityPlugins, PluginResolver, ZYZZYVA, compose_message_ids};
