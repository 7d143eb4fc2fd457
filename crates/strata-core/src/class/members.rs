//! Member declarations and the member classifier.

use std::sync::Arc;

use anyhow::Result;
use indexmap::IndexMap;

use crate::{instance::method::Context, value::Value};

/// Signature shared by methods and dynamic-property functions.
pub type NativeFn = dyn Fn(&Context<'_>, &[Value]) -> Result<Value> + Send + Sync;

/// An unbound function value. It gains `self`, `private` and `super` only
/// when an instance binds it.
#[derive(Clone)]
pub struct Method {
    func: Arc<NativeFn>,
}

impl Method {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Context<'_>, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    pub(crate) fn invoke(&self, ctx: &Context<'_>, args: &[Value]) -> Result<Value> {
        (self.func)(ctx, args)
    }

    pub fn ptr_eq(&self, other: &Method) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl std::fmt::Debug for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Method({:p})", Arc::as_ptr(&self.func))
    }
}

/// Default-value expression of a field, evaluated once per instance.
#[derive(Clone)]
pub enum FieldDefault {
    /// Cloned into every instance. Lists and maps are therefore fresh per
    /// instance, while instance handles stay shared.
    Value(Value),
    /// Re-run for every instance.
    Computed(Arc<dyn Fn() -> Result<Value> + Send + Sync>),
}

impl FieldDefault {
    pub fn evaluate(&self) -> Result<Value> {
        match self {
            FieldDefault::Value(value) => Ok(value.clone()),
            FieldDefault::Computed(thunk) => thunk(),
        }
    }
}

impl std::fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldDefault::Value(value) => f.debug_tuple("Value").field(value).finish(),
            FieldDefault::Computed(_) => write!(f, "Computed"),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Member {
    Field(FieldDefault),
    Method(Method),
}

impl Member {
    pub fn field(value: impl Into<Value>) -> Self {
        Member::Field(FieldDefault::Value(value.into()))
    }

    pub fn computed<F>(thunk: F) -> Self
    where
        F: Fn() -> Result<Value> + Send + Sync + 'static,
    {
        Member::Field(FieldDefault::Computed(Arc::new(thunk)))
    }

    pub fn method<F>(func: F) -> Self
    where
        F: Fn(&Context<'_>, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Member::Method(Method::new(func))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Member::Method(_))
    }
}

/// Ordered member collection as written in a class declaration. An empty
/// name stands for an unnamed entry and is rejected at definition time.
#[derive(Clone, Debug, Default)]
pub struct Members {
    entries: Vec<(String, Member)>,
}

impl Members {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, name: impl Into<String>, member: Member) -> Self {
        self.push(name, member);
        self
    }

    pub fn field(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entry(name, Member::field(value))
    }

    pub fn computed<F>(self, name: impl Into<String>, thunk: F) -> Self
    where
        F: Fn() -> Result<Value> + Send + Sync + 'static,
    {
        self.entry(name, Member::computed(thunk))
    }

    pub fn method<F>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Context<'_>, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.entry(name, Member::method(func))
    }

    pub fn push(&mut self, name: impl Into<String>, member: Member) {
        self.entries.push((name.into(), member));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Member)> {
        self.entries.iter().map(|(name, member)| (name.as_str(), member))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of splitting a member collection into data and behaviour.
#[derive(Clone, Debug, Default)]
pub struct Classified {
    pub fields: IndexMap<String, FieldDefault>,
    pub methods: IndexMap<String, Method>,
}

/// Partition `members` into fields and methods, preserving declaration order.
/// `None` yields two empty maps.
pub fn classify(members: Option<&Members>) -> Classified {
    let mut classified = Classified::default();
    for (name, member) in members.into_iter().flat_map(|m| m.iter()) {
        match member {
            Member::Field(default) => {
                classified.fields.insert(name.to_string(), default.clone());
            }
            Member::Method(method) => {
                classified.methods.insert(name.to_string(), method.clone());
            }
        }
    }
    classified
}
