//! Instances and the machinery that builds them.
//!
//! An [`Instance`] is a handle to one public scope. Behind it sit an optional
//! private scope and, for every level below the most-derived, a
//! [`SuperScope`] exposing the older levels' behaviour. All of them are
//! materialized in one pass by the builder and never shared between
//! instances.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    class::{ClassLevel, ClassOptions, EncapsulationMode},
    value::Value,
};

pub(crate) mod builder;
mod clone;
pub mod method;
pub mod scope;
pub mod super_scope;

#[cfg(test)]
mod tests;

pub use method::{BoundMethod, Context};
pub use scope::{Scope, ScopeKind, SlotKind};
pub use super_scope::SuperScope;

/// Last entry of every instance type tag.
pub const GENERIC_TAG: &str = "Strata";

/// Instance identity, used only for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", &self.0.to_string()[..8])
    }
}

pub(crate) struct InstanceCore {
    pub id: InstanceId,
    pub class_name: String,
    pub public: Scope,
    pub private: Option<Scope>,
    pub class_tags: Option<Vec<String>>,
    /// Chain snapshot the instance was built from; clones rebind from it.
    pub levels: Arc<[ClassLevel]>,
    /// Per-level method bindings, root first.
    pub bindings: Vec<Arc<method::Binding>>,
    pub options: ClassOptions,
}

/// Handle to a constructed object. Clones of the handle share state.
#[derive(Clone)]
pub struct Instance {
    pub(crate) core: Arc<InstanceCore>,
}

impl Instance {
    pub fn id(&self) -> InstanceId {
        self.core.id
    }

    /// Most-derived class the instance was built from.
    pub fn class_name(&self) -> &str {
        &self.core.class_name
    }

    /// Read a public member. Absent names read as `Null`.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.core.public.get(name)
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.core.public.set(name, value)
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        self.core.public.call(name, args)
    }

    pub fn has(&self, name: &str) -> bool {
        self.core.public.has(name)
    }

    /// Public binding names in installation order.
    pub fn names(&self) -> Vec<String> {
        self.core.public.names()
    }

    /// The public scope itself.
    pub fn scope(&self) -> &Scope {
        &self.core.public
    }

    /// `[most-derived, .., root, "Strata"]`, or `None` for untagged classes.
    pub fn class_tags(&self) -> Option<&[String]> {
        self.core.class_tags.as_deref()
    }

    pub fn inherits(&self, class: &str) -> bool {
        self.class_tags()
            .is_some_and(|tags| tags.iter().any(|tag| tag == class))
    }

    /// Names of the chain levels, root first.
    pub fn chain(&self) -> Vec<String> {
        self.core.levels.iter().map(|level| level.name.clone()).collect()
    }

    pub fn is_locked(&self) -> bool {
        self.core.public.is_locked()
    }

    pub fn has_private(&self) -> bool {
        self.core.private.is_some()
    }

    pub fn is_cloneable(&self) -> bool {
        self.core.options.cloneable
    }

    pub fn mode(&self) -> EncapsulationMode {
        self.core.options.mode
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.core.class_name)
            .field("id", &self.core.id)
            .field("names", &self.core.public.names())
            .finish()
    }
}
