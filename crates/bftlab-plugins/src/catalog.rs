//! Plugin factory registries.

use std::collections::HashMap;
use std::fmt;

use crate::{PluginError, PluginId, PluginKind};

/// Binds the entity type and the four plugin product types together.
///
/// The simulation engine implements this once; the catalog and resolver are
/// generic over it, so a message factory can never be registered where a
/// role factory is expected.
///
/// ```
/// use bftlab_plugins::PluginFamily;
///
/// pub trait Behavior: Send {}
///
/// pub struct Node { pub id: u32 }
///
/// pub struct Stock;
///
/// impl PluginFamily for Stock {
///     type Entity = Node;
///     type Role = dyn Behavior;
///     type Message = dyn Behavior;
///     type Pipeline = dyn Behavior;
///     type Transition = dyn Behavior;
/// }
/// ```
pub trait PluginFamily: 'static {
    /// Handle of a simulated node. Passed to factories, never inspected.
    type Entity: ?Sized + 'static;
    type Role: ?Sized + 'static;
    type Message: ?Sized + 'static;
    type Pipeline: ?Sized + 'static;
    type Transition: ?Sized + 'static;
}

/// Factories of a single plugin kind, keyed by identifier.
///
/// A factory produces a plugin instance bound to the entity it is given.
pub struct Registry<E: ?Sized, P: ?Sized> {
    kind: PluginKind,
    factories: HashMap<PluginId, Box<dyn Fn(&E) -> Box<P> + Send + Sync>>,
}

impl<E: ?Sized + 'static, P: ?Sized + 'static> Registry<E, P> {
    /// Creates an empty registry for `kind`.
    pub fn new(kind: PluginKind) -> Self {
        Self {
            kind,
            factories: HashMap::new(),
        }
    }

    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    /// Stores `factory` under `id`. An existing factory for the same
    /// identifier is replaced: the last registration wins.
    pub fn register<F>(&mut self, id: impl Into<PluginId>, factory: F)
    where
        F: Fn(&E) -> Box<P> + Send + Sync + 'static,
    {
        let id = PluginId::new(id.into().as_str());
        self.factories.insert(id, Box::new(factory));
    }

    /// Returns the factory registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::IdentifierNotFound`] if nothing is registered
    /// under `id`.
    pub fn lookup(
        &self,
        id: &PluginId,
    ) -> Result<&(dyn Fn(&E) -> Box<P> + Send + Sync), PluginError> {
        self.factories
            .get(id)
            .map(|factory| &**factory)
            .ok_or_else(|| PluginError::IdentifierNotFound {
                kind: self.kind,
                id: id.clone(),
            })
    }

    /// Runs the factory registered under `id` for `entity`.
    pub fn instantiate(&self, id: &PluginId, entity: &E) -> Result<Box<P>, PluginError> {
        let factory = self.lookup(id)?;
        Ok(factory(entity))
    }

    pub fn contains(&self, id: &PluginId) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered identifiers in sorted order.
    pub fn ids(&self) -> Vec<&PluginId> {
        let mut ids: Vec<&PluginId> = self.factories.keys().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl<E: ?Sized, P: ?Sized> fmt::Debug for Registry<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self.factories.keys().map(PluginId::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("ids", &ids)
            .finish()
    }
}

/// The four plugin registries of a simulation.
///
/// # Thread Safety
///
/// Registration takes `&mut self`. Build the catalog once at startup, then
/// share it behind an `Arc`; from that point it is read-only and every
/// entity thread may look up factories concurrently.
///
/// # Example
///
/// ```
/// use bftlab_plugins::{PluginCatalog, PluginFamily, PluginId};
///
/// struct Node;
/// struct Stock;
///
/// impl PluginFamily for Stock {
///     type Entity = Node;
///     type Role = str;
///     type Message = str;
///     type Pipeline = str;
///     type Transition = str;
/// }
///
/// let catalog = PluginCatalog::<Stock>::new()
///     .with_role("primary", |_: &Node| "primary".into())
///     .with_role("passive", |_: &Node| "passive".into());
///
/// assert!(catalog.role().contains(&PluginId::Passive));
/// assert_eq!(&*catalog.role().instantiate(&PluginId::Primary, &Node).unwrap(), "primary");
/// ```
pub struct PluginCatalog<F: PluginFamily> {
    role: Registry<F::Entity, F::Role>,
    message: Registry<F::Entity, F::Message>,
    pipeline: Registry<F::Entity, F::Pipeline>,
    transition: Registry<F::Entity, F::Transition>,
}

impl<F: PluginFamily> PluginCatalog<F> {
    /// Creates a catalog with four empty registries.
    pub fn new() -> Self {
        Self {
            role: Registry::new(PluginKind::Role),
            message: Registry::new(PluginKind::Message),
            pipeline: Registry::new(PluginKind::Pipeline),
            transition: Registry::new(PluginKind::Transition),
        }
    }

    pub fn register_role<G>(&mut self, id: impl Into<PluginId>, factory: G)
    where
        G: Fn(&F::Entity) -> Box<F::Role> + Send + Sync + 'static,
    {
        self.role.register(id, factory);
    }

    pub fn register_message<G>(&mut self, id: impl Into<PluginId>, factory: G)
    where
        G: Fn(&F::Entity) -> Box<F::Message> + Send + Sync + 'static,
    {
        self.message.register(id, factory);
    }

    pub fn register_pipeline<G>(&mut self, id: impl Into<PluginId>, factory: G)
    where
        G: Fn(&F::Entity) -> Box<F::Pipeline> + Send + Sync + 'static,
    {
        self.pipeline.register(id, factory);
    }

    pub fn register_transition<G>(&mut self, id: impl Into<PluginId>, factory: G)
    where
        G: Fn(&F::Entity) -> Box<F::Transition> + Send + Sync + 'static,
    {
        self.transition.register(id, factory);
    }

    /// Builder form of [`register_role`](Self::register_role).
    pub fn with_role<G>(mut self, id: impl Into<PluginId>, factory: G) -> Self
    where
        G: Fn(&F::Entity) -> Box<F::Role> + Send + Sync + 'static,
    {
        self.register_role(id, factory);
        self
    }

    /// Builder form of [`register_message`](Self::register_message).
    pub fn with_message<G>(mut self, id: impl Into<PluginId>, factory: G) -> Self
    where
        G: Fn(&F::Entity) -> Box<F::Message> + Send + Sync + 'static,
    {
        self.register_message(id, factory);
        self
    }

    /// Builder form of [`register_pipeline`](Self::register_pipeline).
    pub fn with_pipeline<G>(mut self, id: impl Into<PluginId>, factory: G) -> Self
    where
        G: Fn(&F::Entity) -> Box<F::Pipeline> + Send + Sync + 'static,
    {
        self.register_pipeline(id, factory);
        self
    }

    /// Builder form of [`register_transition`](Self::register_transition).
    pub fn with_transition<G>(mut self, id: impl Into<PluginId>, factory: G) -> Self
    where
        G: Fn(&F::Entity) -> Box<F::Transition> + Send + Sync + 'static,
    {
        self.register_transition(id, factory);
        self
    }

    pub fn role(&self) -> &Registry<F::Entity, F::Role> {
        &self.role
    }

    pub fn message(&self) -> &Registry<F::Entity, F::Message> {
        &self.message
    }

    pub fn pipeline(&self) -> &Registry<F::Entity, F::Pipeline> {
        &self.pipeline
    }

    pub fn transition(&self) -> &Registry<F::Entity, F::Transition> {
        &self.transition
    }

    /// Stock identifiers (see [`PluginId::defaults`]) that have no factory.
    pub fn missing_defaults(&self) -> Vec<(PluginKind, PluginId)> {
        PluginKind::ALL
            .into_iter()
            .flat_map(|kind| {
                PluginId::defaults(kind)
                    .into_iter()
                    .filter(move |id| !self.contains(kind, id))
                    .map(move |id| (kind, id))
            })
            .collect()
    }

    /// Returns `true` if a factory of `kind` is registered under `id`.
    pub fn contains(&self, kind: PluginKind, id: &PluginId) -> bool {
        match kind {
            PluginKind::Role => self.role.contains(id),
            PluginKind::Message => self.message.contains(id),
            PluginKind::Pipeline => self.pipeline.contains(id),
            PluginKind::Transition => self.transition.contains(id),
        }
    }
}

impl<F: PluginFamily> Default for PluginCatalog<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: PluginFamily> fmt::Debug for PluginCatalog<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("role", &self.role)
            .field("message", &self.message)
            .field("pipeline", &self.pipeline)
            .field("transition", &self.transition)
            .finish()
    }
}
