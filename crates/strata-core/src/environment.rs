//! Declaring contexts.
//!
//! An [`Environment`] is the context a class definition is written in. Named
//! superclass references are evaluated against it on every instantiation, and
//! bare-name lookups from method bodies fall back to it.

use std::sync::{Arc, Weak};

use dashmap::DashMap;

use crate::value::Value;

#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvironmentInner>,
}

struct EnvironmentInner {
    name: String,
    variables: DashMap<String, Value>,
    parent: Option<Environment>,
}

/// Non-owning handle kept by class definitions, so an environment that binds
/// its own classes does not keep itself alive.
#[derive(Clone, Default)]
pub struct WeakEnvironment(Option<Weak<EnvironmentInner>>);

impl Default for Environment {
    fn default() -> Self {
        Self::new("global")
    }
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EnvironmentInner {
                name: name.into(),
                variables: DashMap::new(),
                parent: None,
            }),
        }
    }

    /// Create a nested environment whose lookups fall back to `self`.
    pub fn child(&self, name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EnvironmentInner {
                name: name.into(),
                variables: DashMap::new(),
                parent: Some(self.clone()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn parent(&self) -> Option<&Environment> {
        self.inner.parent.as_ref()
    }

    /// Create or replace a binding in this environment.
    pub fn define(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.inner.variables.insert(name.into(), value.into());
    }

    /// Look a name up here, then in each parent.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut env = Some(self);
        while let Some(current) = env {
            if let Some(value) = current.inner.variables.get(name) {
                return Some(value.clone());
            }
            env = current.parent();
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Update an existing binding wherever it lives in the parent chain.
    /// Returns `false` when no environment binds `name`.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        let mut env = Some(self);
        while let Some(current) = env {
            if let Some(mut slot) = current.inner.variables.get_mut(name) {
                *slot = value;
                return true;
            }
            env = current.parent();
        }
        false
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.inner.variables.remove(name).map(|(_, value)| value)
    }

    /// Names bound directly in this environment, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .variables
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    pub fn downgrade(&self) -> WeakEnvironment {
        WeakEnvironment(Some(Arc::downgrade(&self.inner)))
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl WeakEnvironment {
    pub fn upgrade(&self) -> Option<Environment> {
        self.0
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Environment { inner })
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("name", &self.inner.name)
            .field("names", &self.names())
            .finish()
    }
}
