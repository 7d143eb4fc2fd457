//! Method binding and the per-call context.
//!
//! A [`BoundMethod`] pairs an unbound [`Method`] with the [`Binding`] of the
//! level that declared it: the shared instance state, that level's `super`
//! scope, and its declaring environment. Every level of a chain shares the
//! same instance, so ancestor code invoked through `super` mutates the same
//! state the derived code sees.

use std::sync::{Arc, Weak};

use anyhow::Result;
use tracing::{debug, debug_span};

use super::{scope::Scope, super_scope::SuperScope, Instance, InstanceCore};
use crate::{
    class::{EncapsulationMode, Method},
    environment::{Environment, WeakEnvironment},
    errors::ObjectModelError,
    value::Value,
};

pub(crate) struct Binding {
    pub instance: Weak<InstanceCore>,
    pub super_scope: Option<SuperScope>,
    /// Level that declared the methods bound here.
    pub class_name: String,
    /// Position of that level in the chain, root at 0.
    pub depth: usize,
    pub mode: EncapsulationMode,
    pub env: WeakEnvironment,
}

/// A method bound to one instance.
///
/// Bindings installed in the instance's own scopes hold it weakly. A method
/// handed out as a value carries a strong anchor instead, so it stays
/// callable after every other handle to the instance is gone.
#[derive(Clone)]
pub struct BoundMethod {
    name: Arc<str>,
    method: Method,
    binding: Arc<Binding>,
    anchor: Option<Instance>,
    traced: bool,
}

impl BoundMethod {
    pub(crate) fn new(name: &str, method: Method, binding: Arc<Binding>, traced: bool) -> Self {
        Self {
            name: Arc::from(name),
            method,
            binding,
            anchor: None,
            traced,
        }
    }

    /// Copy that keeps its instance alive, for handing out as a value.
    pub(crate) fn anchored(&self) -> BoundMethod {
        let anchor = self.anchor.clone().or_else(|| {
            self.binding
                .instance
                .upgrade()
                .map(|core| Instance { core })
        });
        BoundMethod {
            anchor,
            ..self.clone()
        }
    }

    /// Copy without the strong anchor, for storing inside its own instance.
    pub(crate) fn unanchored(&self) -> BoundMethod {
        BoundMethod {
            anchor: None,
            ..self.clone()
        }
    }

    /// The same method bound to another instance's binding of the same level.
    pub(crate) fn rebound(&self, binding: Arc<Binding>) -> BoundMethod {
        BoundMethod {
            name: self.name.clone(),
            method: self.method.clone(),
            binding,
            anchor: None,
            traced: self.traced,
        }
    }

    pub(crate) fn is_bound_to(&self, instance: &Weak<InstanceCore>) -> bool {
        Weak::ptr_eq(&self.binding.instance, instance)
    }

    pub(crate) fn depth(&self) -> usize {
        self.binding.depth
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class level the method was declared in.
    pub fn declared_in(&self) -> &str {
        &self.binding.class_name
    }

    pub fn is_traced(&self) -> bool {
        self.traced
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        let core = match &self.anchor {
            Some(instance) => instance.core.clone(),
            None => self.binding.instance.upgrade().ok_or_else(|| {
                ObjectModelError::InstanceReleased {
                    method: self.name.to_string(),
                }
            })?,
        };
        let ctx = Context {
            binding: &self.binding,
            instance: Instance { core },
            method: &self.name,
        };

        if !self.traced {
            return self.method.invoke(&ctx, args);
        }

        let span = debug_span!(
            "method",
            class = %self.binding.class_name,
            method = %self.name,
            instance = %ctx.instance.id()
        );
        let _entered = span.enter();
        debug!(args = args.len(), "enter");
        let result = self.method.invoke(&ctx, args);
        match &result {
            Ok(value) => debug!(returned = value.type_name(), "exit"),
            Err(err) => debug!(error = %err, "exit with error"),
        }
        result
    }

    pub fn ptr_eq(&self, other: &BoundMethod) -> bool {
        Arc::ptr_eq(&self.binding, &other.binding)
            && self.method.ptr_eq(&other.method)
            && self.name == other.name
    }
}

impl std::fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BoundMethod({}::{})", self.binding.class_name, self.name)
    }
}

/// What a method body sees while it runs.
///
/// `this()`, `private()` and `super_()` are the qualified accessors. In the
/// unqualified mode, [`Context::lookup`] additionally resolves instance
/// fields as bare names and [`Context::rebind`] mutates them. Plain `let`
/// bindings inside the method body are ordinary locals and never touch
/// instance state.
pub struct Context<'a> {
    binding: &'a Binding,
    instance: Instance,
    method: &'a str,
}

impl<'a> Context<'a> {
    /// The instance the method runs on (`self`).
    pub fn this(&self) -> &Instance {
        &self.instance
    }

    /// The instance's private scope.
    pub fn private(&self) -> Result<&Scope> {
        self.instance.core.private.as_ref().ok_or_else(|| {
            ObjectModelError::missing_scope(&self.binding.class_name, "private").into()
        })
    }

    /// Ancestor behaviour, bound to this same instance.
    pub fn super_(&self) -> Result<&SuperScope> {
        self.binding.super_scope.as_ref().ok_or_else(|| {
            ObjectModelError::missing_scope(&self.binding.class_name, "super").into()
        })
    }

    pub fn method_name(&self) -> &str {
        self.method
    }

    /// Class level the running method was declared in.
    pub fn class_name(&self) -> &str {
        &self.binding.class_name
    }

    pub fn mode(&self) -> EncapsulationMode {
        self.binding.mode
    }

    pub fn environment(&self) -> Option<Environment> {
        self.binding.env.upgrade()
    }

    /// Resolve a bare name.
    ///
    /// `self` always resolves to the instance. Unqualified mode then tries the
    /// public scope and the private scope. Both modes fall back to the
    /// declaring environment.
    pub fn lookup(&self, name: &str) -> Result<Value> {
        if name == "self" {
            return Ok(Value::Instance(self.instance.clone()));
        }
        if let Some(scope) = self.owning_scope(name) {
            return scope.get(name);
        }
        self.environment()
            .and_then(|env| env.get(name))
            .ok_or_else(|| ObjectModelError::unbound(name).into())
    }

    /// Rebinding assignment: mutate the existing binding of `name` in the
    /// nearest enclosing scope instead of creating a local.
    pub fn rebind(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        if let Some(scope) = self.owning_scope(name) {
            return scope.set(name, value);
        }
        let assigned = self
            .environment()
            .is_some_and(|env| env.assign(name, value));
        if assigned {
            Ok(())
        } else {
            Err(ObjectModelError::unbound(name).into())
        }
    }

    fn owning_scope(&self, name: &str) -> Option<&Scope> {
        if self.binding.mode != EncapsulationMode::Unqualified {
            return None;
        }
        let core = &self.instance.core;
        if core.public.has(name) {
            return Some(&core.public);
        }
        core.private.as_ref().filter(|private| private.has(name))
    }
}
