//! Deferred superclass references and chain resolution.

use std::sync::Arc;

use anyhow::Result;
use tracing::trace;

use super::ClassDef;
use crate::{
    environment::{Environment, WeakEnvironment},
    errors::ObjectModelError,
    value::Value,
};

/// A superclass reference captured at definition time and evaluated again on
/// every instantiation. Redefining the referenced name between two
/// instantiations changes what the second one inherits from.
#[derive(Clone)]
pub enum SuperclassRef {
    /// A name looked up in the environment it was written in.
    Named { name: String, env: WeakEnvironment },
    /// Any deferred expression.
    Lazy(Arc<dyn Fn() -> Result<Value> + Send + Sync>),
    /// A fixed definition.
    Direct(ClassDef),
}

impl SuperclassRef {
    pub fn named(name: impl Into<String>, env: &Environment) -> Self {
        SuperclassRef::Named {
            name: name.into(),
            env: env.downgrade(),
        }
    }

    pub fn lazy<F>(thunk: F) -> Self
    where
        F: Fn() -> Result<Value> + Send + Sync + 'static,
    {
        SuperclassRef::Lazy(Arc::new(thunk))
    }

    pub fn direct(class: &ClassDef) -> Self {
        SuperclassRef::Direct(class.clone())
    }

    pub fn describe(&self) -> String {
        match self {
            SuperclassRef::Named { name, .. } => name.clone(),
            SuperclassRef::Lazy(_) => "<deferred>".to_string(),
            SuperclassRef::Direct(class) => class.name(),
        }
    }

    /// Evaluate the reference on behalf of `class`.
    pub fn evaluate(&self, class: &str) -> Result<ClassDef> {
        let value = match self {
            SuperclassRef::Named { name, env } => {
                let env = env.upgrade().ok_or_else(|| {
                    ObjectModelError::unresolvable(
                        class,
                        format!("environment declaring '{name}' no longer exists"),
                    )
                })?;
                env.get(name).ok_or_else(|| {
                    ObjectModelError::unresolvable(
                        class,
                        format!("'{name}' is not bound in environment '{}'", env.name()),
                    )
                })?
            }
            SuperclassRef::Lazy(thunk) => {
                thunk().map_err(|err| ObjectModelError::unresolvable(class, err.to_string()))?
            }
            SuperclassRef::Direct(parent) => return Ok(parent.clone()),
        };

        match value {
            Value::Class(parent) => Ok(parent),
            other => Err(ObjectModelError::unresolvable(
                class,
                format!("expected a class definition, got {}", other.type_name()),
            )
            .into()),
        }
    }
}

impl std::fmt::Debug for SuperclassRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SuperclassRef({})", self.describe())
    }
}

/// Resolve the inheritance chain of `class`, root ancestor first.
///
/// Cycles are not detected: with `limit` unset a cyclic chain does not
/// terminate.
pub fn resolve_chain(class: &ClassDef, limit: Option<usize>) -> Result<Vec<ClassDef>> {
    let mut chain = vec![class.clone()];
    let mut current = class.clone();

    while let Some(superclass) = current.superclass_ref() {
        if let Some(limit) = limit {
            if chain.len() >= limit {
                return Err(ObjectModelError::InheritanceTooDeep {
                    class: class.name(),
                    limit,
                }
                .into());
            }
        }
        let parent = superclass.evaluate(&current.name())?;
        trace!(class = %current.name(), parent = %parent.name(), "resolved superclass");
        chain.push(parent.clone());
        current = parent;
    }

    chain.reverse();
    Ok(chain)
}

impl ClassDef {
    /// Evaluate this definition's superclass reference once.
    pub fn get_inherit(&self) -> Result<Option<ClassDef>> {
        match self.superclass_ref() {
            Some(superclass) => superclass.evaluate(&self.name()).map(Some),
            None => Ok(None),
        }
    }

    /// Whether any level of the current chain declares private members.
    pub fn has_private(&self) -> Result<bool> {
        let chain = resolve_chain(self, self.max_inheritance_depth())?;
        Ok(chain
            .iter()
            .any(|level| level.inner().read().tables.has_private()))
    }
}
