//! # Strata Core
//!
//! A runtime object model built from declarative class definitions:
//! - Class definitions with public, private and dynamic (computed) members
//! - Single inheritance resolved lazily on every instantiation
//! - Instances with shared public/private scopes and per-level `super` scopes
//! - Shallow and deep instance copies
//! - Post-hoc changes to a definition that affect later instances
//!
//! Methods are native closures that receive a [`Context`] giving access to
//! `self`, `private` and `super` of the instance they are bound to.
//!
//! ```
//! use strata_core::{ClassDef, Members, Value};
//!
//! let counter = ClassDef::builder("Counter")
//!     .public(Members::new().method("bump", |ctx, _args| {
//!         let count = ctx.private()?.get("count")?.as_i64().unwrap_or(0) + 1;
//!         ctx.private()?.set("count", count)?;
//!         Ok(Value::Integer(count))
//!     }))
//!     .private(Members::new().field("count", 0))
//!     .build()?;
//!
//! let c = counter.new_instance(&[])?;
//! c.call("bump", &[])?;
//! assert_eq!(c.call("bump", &[])?, Value::Integer(2));
//! # Ok::<(), anyhow::Error>(())
//! ```

#![warn(clippy::all)]

pub mod class;
pub mod environment;
pub mod errors;
pub mod instance;
pub mod introspect;
pub mod value;

// Re-export commonly used types
pub use class::{
    define_class, resolve_chain, ClassBuilder, ClassDef, ClassOptions, EncapsulationMode,
    FieldDefault, Member, MemberTier, Members, Method, SuperclassRef, Visibility,
};
pub use environment::Environment;
pub use errors::ObjectModelError;
pub use instance::{
    BoundMethod, Context, Instance, InstanceId, Scope, ScopeKind, SlotKind, SuperScope,
};
pub use introspect::{ClassSummary, InstanceSnapshot, MemberSnapshot};
pub use value::Value;

use serde::{Deserialize, Serialize};

/// Strata version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for Strata core components
pub fn init_tracing() -> anyhow::Result<()> {
    init_tracing_with("strata_core=info")
}

/// Initialize tracing with an explicit default directive. `RUST_LOG` still
/// takes precedence.
pub fn init_tracing_with(directive: &str) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(directive.parse()?),
        )
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))
}

/// Object model configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
    /// Options every new class definition starts from
    pub default_options: ClassOptions,
    /// Maximum inheritance chain length; `None` leaves chains unbounded
    pub max_inheritance_depth: Option<usize>,
}

impl StrataConfig {
    /// Parse a configuration from JSON. Missing keys keep their defaults.
    pub fn from_json(source: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Start a class definition using these settings.
    pub fn class(&self, name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::with_config(name, self)
    }
}
