//! Instance construction.
//!
//! Construction happens in two phases. Everything that can fail (chain
//! resolution, field defaults) runs first; the scope graph is then wired in a
//! single infallible pass, so no partially built instance is ever observable.

use std::{
    iter,
    sync::{Arc, Weak},
};

use anyhow::{anyhow, Result};
use indexmap::IndexMap;
use tracing::trace;

use super::{
    method::{Binding, BoundMethod},
    scope::{Scope, ScopeKind, Slot},
    super_scope::{Inherited, SuperScope},
    Instance, InstanceCore, InstanceId, GENERIC_TAG,
};
use crate::{
    class::{resolve_chain, ClassDef, ClassLevel, FieldDefault, Method, INITIALIZER},
    errors::ObjectModelError,
    value::Value,
};

/// Field values destined for one instance's scopes.
#[derive(Default)]
pub(crate) struct LevelFields {
    pub public: Vec<(String, Value)>,
    pub private: Vec<(String, Value)>,
}

pub(crate) enum FieldSource {
    /// Freshly evaluated defaults, one entry per chain level, root first.
    Defaults(Vec<LevelFields>),
    /// Values copied from an existing instance.
    Copied(LevelFields),
}

/// Build and initialize an instance of `class`.
pub(crate) fn build(class: &ClassDef, args: &[Value]) -> Result<Instance> {
    let chain = resolve_chain(class, class.max_inheritance_depth())?;
    let levels: Arc<[ClassLevel]> = chain.iter().map(ClassDef::level).collect();
    let defaults = evaluate_defaults(&levels)?;
    let instance = materialize(levels, FieldSource::Defaults(defaults))?;

    trace!(
        class = %instance.class_name(),
        id = %instance.id(),
        levels = instance.core.levels.len(),
        "built instance"
    );

    match instance.core.public.method(INITIALIZER) {
        Some(initialize) => {
            initialize.call(args)?;
        }
        None if !args.is_empty() => {
            return Err(ObjectModelError::ConstructorArgumentMismatch {
                class: instance.class_name().to_string(),
                count: args.len(),
            }
            .into());
        }
        None => {}
    }

    Ok(instance)
}

/// Evaluate every field default of every level, root first.
fn evaluate_defaults(levels: &[ClassLevel]) -> Result<Vec<LevelFields>> {
    levels
        .iter()
        .map(|level| {
            let evaluate = |fields: &IndexMap<String, FieldDefault>| {
                fields
                    .iter()
                    .map(|(name, default)| Ok((name.clone(), default.evaluate()?)))
                    .collect::<Result<Vec<_>>>()
            };
            Ok(LevelFields {
                public: evaluate(&level.tables.public_fields)?,
                private: evaluate(&level.tables.private_fields)?,
            })
        })
        .collect()
}

/// Wire the scope graph for `levels`.
///
/// Walking root to most-derived, each level writes its fields, then binds its
/// methods against the shared scopes and a super scope holding everything
/// bound by the levels before it. Later levels overwrite earlier bindings of
/// the same name.
pub(crate) fn materialize(levels: Arc<[ClassLevel]>, source: FieldSource) -> Result<Instance> {
    let derived = levels
        .last()
        .ok_or_else(|| anyhow!("cannot build an instance from an empty chain"))?;
    let class_name = derived.name.clone();
    let options = derived.options.clone();
    let has_private = levels.iter().any(|level| level.tables.has_private());
    let class_tags: Option<Vec<String>> = options.class_tagged.then(|| {
        levels
            .iter()
            .rev()
            .map(|level| level.name.clone())
            .chain(iter::once(GENERIC_TAG.to_string()))
            .collect()
    });

    let (defaults, copied) = match source {
        FieldSource::Defaults(defaults) => (defaults, None),
        FieldSource::Copied(fields) => (Vec::new(), Some(fields)),
    };

    let core = Arc::new_cyclic(|weak: &Weak<InstanceCore>| {
        let public = Scope::new(&class_name, ScopeKind::Public, weak.clone());
        let private =
            has_private.then(|| Scope::new(&class_name, ScopeKind::Private, weak.clone()));

        let mut defaults = defaults.into_iter();
        let mut inherited: IndexMap<String, Inherited> = IndexMap::new();
        let mut bindings = Vec::with_capacity(levels.len());

        for (depth, level) in levels.iter().enumerate() {
            if let Some(fields) = defaults.next() {
                install_fields(&public, private.as_ref(), fields);
            }

            let super_scope = depth
                .checked_sub(1)
                .map(|older| SuperScope::new(&levels[older].name, inherited.clone()));
            let binding = Arc::new(Binding {
                instance: weak.clone(),
                super_scope,
                class_name: level.name.clone(),
                depth,
                mode: options.mode,
                env: level.env.clone(),
            });
            let bind = |name: &str, method: &Method| {
                BoundMethod::new(
                    name,
                    method.clone(),
                    binding.clone(),
                    level.debug_names.contains(name),
                )
            };

            for (name, method) in &level.tables.public_methods {
                let bound = bind(name, method);
                public.put(name, Slot::Method(bound.clone()));
                inherited.insert(name.clone(), Inherited::Method(bound));
            }
            if let Some(private) = &private {
                for (name, method) in &level.tables.private_methods {
                    let bound = bind(name, method);
                    private.put(name, Slot::Method(bound.clone()));
                    inherited.insert(name.clone(), Inherited::Method(bound));
                }
            }
            for (name, method) in &level.tables.active {
                let bound = bind(name, method);
                public.put(name, Slot::Active(bound.clone()));
                inherited.insert(name.clone(), Inherited::Active(bound));
            }
            bindings.push(binding);
        }

        if let Some(fields) = copied {
            install_fields(&public, private.as_ref(), fields);
        }

        if options.lock_objects {
            public.lock();
            if let Some(private) = &private {
                private.lock();
            }
        }

        InstanceCore {
            id: InstanceId::new(),
            class_name: class_name.clone(),
            public,
            private,
            class_tags,
            levels: levels.clone(),
            bindings,
            options: options.clone(),
        }
    });

    Ok(Instance { core })
}

fn install_fields(public: &Scope, private: Option<&Scope>, fields: LevelFields) {
    for (name, value) in fields.public {
        public.put_field(&name, value);
    }
    if let Some(private) = private {
        for (name, value) in fields.private {
            private.put_field(&name, value);
        }
    }
}
