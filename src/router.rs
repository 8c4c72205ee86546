//! Key-routed dispatch: each entry of a mapping is validated against the
//! model its key routes to.
//!
//! A [`Router`] maps a key to a schema identifier and a [`Registry`] maps the
//! identifier to a model. Both are closed tables built at startup.

use crate::model::ModelSchema;
use crate::types::TypeSpec;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

type RouteFn = dyn Fn(&str) -> Option<String> + Send + Sync;

#[derive(Clone)]
pub enum Router {
    /// `(prefix, schema id)` pairs tried in order; the first prefix the key
    /// starts with wins.
    Prefix(Vec<(String, String)>),
    Custom(Arc<RouteFn>),
}

impl Router {
    pub fn prefixes<P, I>(pairs: impl IntoIterator<Item = (P, I)>) -> Self
    where
        P: Into<String>,
        I: Into<String>,
    {
        Self::Prefix(
            pairs
                .into_iter()
                .map(|(prefix, id)| (prefix.into(), id.into()))
                .collect(),
        )
    }

    pub fn custom(route: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(route))
    }

    pub fn route(&self, key: &str) -> Option<String> {
        match self {
            Self::Prefix(pairs) => pairs
                .iter()
                .find(|(prefix, _)| key.starts_with(prefix.as_str()))
                .map(|(_, id)| id.clone()),
            Self::Custom(route) => route(key),
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prefix(pairs) => f.debug_tuple("Prefix").field(pairs).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Model schemas by identifier, in registration order.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    schemas: IndexMap<String, Arc<ModelSchema>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, schema: &Arc<ModelSchema>) -> Self {
        self.register(id, schema);
        self
    }

    pub fn register(&mut self, id: impl Into<String>, schema: &Arc<ModelSchema>) -> &mut Self {
        self.schemas.insert(id.into(), Arc::clone(schema));
        self
    }

    pub fn get(&self, id: &str) -> Option<&Arc<ModelSchema>> {
        self.schemas.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Arc<ModelSchema>> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// How a key-routed mapping treats entries that fail validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Any failing entry fails the whole mapping; every entry error is
    /// reported.
    #[default]
    Atomic,
    /// Failing entries are dropped from the result and their errors are
    /// reported separately; valid entries are kept.
    Partial,
}

#[derive(Clone, Debug)]
pub struct KeyRouted {
    router: Router,
    registry: Registry,
    mode: DispatchMode,
}

impl KeyRouted {
    /// A key-routed mapping in [`DispatchMode::Atomic`] mode.
    pub fn new(router: Router, registry: Registry) -> Self {
        Self {
            router,
            registry,
            mode: DispatchMode::default(),
        }
    }

    pub fn mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn dispatch_mode(&self) -> DispatchMode {
        self.mode
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The model for `key`, or a message saying why there is none.
    pub fn resolve(&self, key: &str) -> Result<&Arc<ModelSchema>, String> {
        let id = self
            .router
            .route(key)
            .ok_or_else(|| format!("key '{key}' does not match any route"))?;

        self.registry
            .get(&id)
            .ok_or_else(|| format!("key '{key}' routes to '{id}', which is not registered"))
    }
}

impl From<KeyRouted> for TypeSpec {
    fn from(routed: KeyRouted) -> Self {
        Self::Routed(routed)
    }
}
