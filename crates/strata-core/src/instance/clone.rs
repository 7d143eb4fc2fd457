//! Shallow and deep instance copies.

use std::{iter, sync::Arc};

use anyhow::Result;
use tracing::trace;

use super::{
    builder::{materialize, FieldSource, LevelFields},
    Instance,
};
use crate::{class::DEEP_CLONE_HOOK, errors::ObjectModelError, value::Value};

impl Instance {
    /// Copy this instance into fresh scopes.
    ///
    /// Field values are copied as they are now; methods and dynamic
    /// properties are rebound to the copy, and `initialize` is not run. A
    /// field holding one of this instance's own methods is rebound to the
    /// copy as well. A shallow copy shares any nested instance held in a
    /// field. With `deep`
    /// set, each field is passed through the private `deep_clone(name, value)`
    /// hook when the chain defines one; otherwise fields directly holding a
    /// cloneable instance are replaced by that instance's deep copy.
    pub fn copy(&self, deep: bool) -> Result<Instance> {
        let core = &self.core;
        if !core.options.cloneable {
            return Err(ObjectModelError::CloneUnsupported {
                class: core.class_name.clone(),
            }
            .into());
        }

        let fields = LevelFields {
            public: core.public.fields(),
            private: core
                .private
                .as_ref()
                .map(|private| private.fields())
                .unwrap_or_default(),
        };
        let copy = materialize(core.levels.clone(), FieldSource::Copied(fields))?;
        rebind_own_methods(self, &copy);

        if deep {
            deep_copy_fields(&copy)?;
        }

        trace!(
            class = %core.class_name,
            from = %core.id,
            to = %copy.id(),
            deep,
            "copied instance"
        );
        Ok(copy)
    }
}

fn rebind_own_methods(source: &Instance, copy: &Instance) {
    let source = Arc::downgrade(&source.core);
    let core = &copy.core;
    for scope in iter::once(&core.public).chain(core.private.as_ref()) {
        for (name, value) in scope.fields() {
            if let Value::Function(method) = value {
                if !method.is_bound_to(&source) {
                    continue;
                }
                if let Some(binding) = core.bindings.get(method.depth()) {
                    scope.put_field(&name, Value::Function(method.rebound(binding.clone())));
                }
            }
        }
    }
}

fn deep_copy_fields(copy: &Instance) -> Result<()> {
    let core = &copy.core;
    let hook = core
        .private
        .as_ref()
        .and_then(|private| private.method(DEEP_CLONE_HOOK));

    for scope in iter::once(&core.public).chain(core.private.as_ref()) {
        for (name, value) in scope.fields() {
            let replacement = match &hook {
                Some(hook) => hook.call(&[Value::String(name.clone()), value])?,
                None => match value {
                    Value::Instance(nested) if nested.is_cloneable() => {
                        Value::Instance(nested.copy(true)?)
                    }
                    other => other,
                },
            };
            scope.put_field(&name, replacement);
        }
    }
    Ok(())
}
