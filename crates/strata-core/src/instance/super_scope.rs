use std::sync::Arc;

use anyhow::Result;
use indexmap::IndexMap;

use super::method::BoundMethod;
use crate::{errors::ObjectModelError, value::Value};

/// Behaviour an older level contributes to the levels after it.
#[derive(Clone)]
pub(crate) enum Inherited {
    Method(BoundMethod),
    Active(BoundMethod),
}

/// Read-only view of the behaviour inherited by one level: every method and
/// dynamic property of the older levels, each already bound to the instance
/// being built.
#[derive(Clone)]
pub struct SuperScope {
    inner: Arc<SuperInner>,
}

struct SuperInner {
    class_name: String,
    slots: IndexMap<String, Inherited>,
}

impl SuperScope {
    pub(crate) fn new(class_name: &str, slots: IndexMap<String, Inherited>) -> Self {
        Self {
            inner: Arc::new(SuperInner {
                class_name: class_name.to_string(),
                slots,
            }),
        }
    }

    /// The nearest ancestor this scope stands for.
    pub fn class_name(&self) -> &str {
        &self.inner.class_name
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        match self.inner.slots.get(name) {
            Some(Inherited::Method(method)) => method.call(args),
            Some(Inherited::Active(active)) => match active.call(&[])? {
                Value::Function(method) => method.call(args),
                _ => Err(ObjectModelError::not_callable(&self.inner.class_name, name).into()),
            },
            None => Err(ObjectModelError::no_such_member(&self.inner.class_name, name).into()),
        }
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        match self.inner.slots.get(name) {
            Some(Inherited::Method(method)) => Ok(Value::Function(method.anchored())),
            Some(Inherited::Active(active)) => active.call(&[]),
            None => Ok(Value::Null),
        }
    }

    /// Only inherited dynamic properties accept writes.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        match self.inner.slots.get(name) {
            Some(Inherited::Active(active)) => active.call(&[value.into()]).map(|_| ()),
            Some(Inherited::Method(_)) => {
                Err(ObjectModelError::locked_binding(&self.inner.class_name, name).into())
            }
            None => Err(ObjectModelError::locked_addition(
                &self.inner.class_name,
                "super",
                name,
            )
            .into()),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner.slots.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.slots.keys().cloned().collect()
    }
}

impl std::fmt::Debug for SuperScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuperScope")
            .field("class", &self.inner.class_name)
            .field("names", &self.names())
            .finish()
    }
}
