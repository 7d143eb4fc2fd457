//! Named-binding scopes backing an instance's public and private state.

use std::sync::Weak;

use anyhow::Result;
use indexmap::{map::Entry, IndexMap};
use parking_lot::RwLock;
use serde::Serialize;

use super::{method::BoundMethod, InstanceCore};
use crate::{errors::ObjectModelError, value::Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Public,
    Private,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Public => "public",
            ScopeKind::Private => "private",
        }
    }
}

/// What a binding holds.
#[derive(Clone)]
pub(crate) enum Slot {
    Field(Value),
    Method(BoundMethod),
    /// Dynamic property: reads call the function with no argument, writes
    /// call it with the assigned value.
    Active(BoundMethod),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Field,
    Method,
    Active,
}

impl Slot {
    pub fn kind(&self) -> SlotKind {
        match self {
            Slot::Field(_) => SlotKind::Field,
            Slot::Method(_) => SlotKind::Method,
            Slot::Active(_) => SlotKind::Active,
        }
    }
}

struct ScopeData {
    slots: IndexMap<String, Slot>,
    locked: bool,
}

/// A mutable scope shared by every method bound to the same instance.
///
/// No lock is held while user code runs, so methods may freely re-enter the
/// scope they were called through.
pub struct Scope {
    owner: String,
    kind: ScopeKind,
    instance: Weak<InstanceCore>,
    data: RwLock<ScopeData>,
}

impl Scope {
    pub(crate) fn new(owner: &str, kind: ScopeKind, instance: Weak<InstanceCore>) -> Self {
        Self {
            owner: owner.to_string(),
            kind,
            instance,
            data: RwLock::new(ScopeData {
                slots: IndexMap::new(),
                locked: false,
            }),
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Read a binding. Methods come back as [`Value::Function`] holding the
    /// instance alive, dynamic properties are evaluated, and absent names read
    /// as `Null`.
    pub fn get(&self, name: &str) -> Result<Value> {
        let slot = self.data.read().slots.get(name).cloned();
        match slot {
            Some(Slot::Field(Value::Function(method))) => Ok(Value::Function(method.anchored())),
            Some(Slot::Field(value)) => Ok(value),
            Some(Slot::Method(method)) => Ok(Value::Function(method.anchored())),
            Some(Slot::Active(active)) => active.call(&[]),
            None => Ok(Value::Null),
        }
    }

    /// Write a binding. Existing fields are replaced, dynamic properties
    /// receive the value, method bindings are read-only, and new names are
    /// only accepted while the scope is unlocked.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let active = {
            let mut data = self.data.write();
            let locked = data.locked;
            match data.slots.entry(name.to_string()) {
                Entry::Occupied(mut entry) => match entry.get_mut() {
                    Slot::Field(current) => {
                        *current = self.stored(value);
                        return Ok(());
                    }
                    Slot::Method(_) => {
                        return Err(ObjectModelError::locked_binding(&self.owner, name).into())
                    }
                    Slot::Active(active) => active.clone(),
                },
                Entry::Vacant(_) if locked => {
                    return Err(ObjectModelError::locked_addition(
                        &self.owner,
                        self.kind.as_str(),
                        name,
                    )
                    .into())
                }
                Entry::Vacant(entry) => {
                    entry.insert(Slot::Field(self.stored(value)));
                    return Ok(());
                }
            }
        };
        active.call(&[value]).map(|_| ())
    }

    /// Call a method binding, a field holding a function, or a dynamic
    /// property whose value is a function.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let slot = {
            let data = self.data.read();
            match data.slots.get(name) {
                Some(Slot::Method(method)) | Some(Slot::Field(Value::Function(method))) => {
                    Slot::Method(method.clone())
                }
                Some(Slot::Active(active)) => Slot::Active(active.clone()),
                Some(Slot::Field(_)) => {
                    return Err(ObjectModelError::not_callable(&self.owner, name).into())
                }
                None => return Err(ObjectModelError::no_such_member(&self.owner, name).into()),
            }
        };
        match slot {
            Slot::Active(active) => match active.call(&[])? {
                Value::Function(method) => method.call(args),
                _ => Err(ObjectModelError::not_callable(&self.owner, name).into()),
            },
            Slot::Method(method) => method.call(args),
            Slot::Field(_) => Err(ObjectModelError::not_callable(&self.owner, name).into()),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.data.read().slots.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.data.read().slots.keys().cloned().collect()
    }

    pub fn kind_of(&self, name: &str) -> Option<SlotKind> {
        self.data.read().slots.get(name).map(Slot::kind)
    }

    pub fn is_locked(&self) -> bool {
        self.data.read().locked
    }

    /// Current field values in binding order.
    pub fn fields(&self) -> Vec<(String, Value)> {
        self.data
            .read()
            .slots
            .iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Field(value) => Some((name.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }

    /// The bound method stored under `name`, if that binding is a method.
    pub(crate) fn method(&self, name: &str) -> Option<BoundMethod> {
        match self.data.read().slots.get(name) {
            Some(Slot::Method(method)) => Some(method.clone()),
            _ => None,
        }
    }

    /// Install a binding during construction, ignoring lock state.
    pub(crate) fn put(&self, name: &str, slot: Slot) {
        self.data.write().slots.insert(name.to_string(), slot);
    }

    /// Overwrite a field value in place without consulting dynamic
    /// properties or the lock.
    pub(crate) fn put_field(&self, name: &str, value: Value) {
        self.put(name, Slot::Field(self.stored(value)));
    }

    /// A method of this same instance is stored without its anchor, so the
    /// instance does not keep itself alive.
    fn stored(&self, value: Value) -> Value {
        match value {
            Value::Function(method) if method.is_bound_to(&self.instance) => {
                Value::Function(method.unanchored())
            }
            other => other,
        }
    }

    pub(crate) fn lock(&self) {
        self.data.write().locked = true;
    }

    pub(crate) fn slot_kinds(&self) -> Vec<(String, SlotKind, Option<Value>)> {
        self.data
            .read()
            .slots
            .iter()
            .map(|(name, slot)| {
                let value = match slot {
                    Slot::Field(value) => Some(value.clone()),
                    _ => None,
                };
                (name.clone(), slot.kind(), value)
            })
            .collect()
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("owner", &self.owner)
            .field("kind", &self.kind)
            .field("names", &self.names())
            .finish()
    }
}
