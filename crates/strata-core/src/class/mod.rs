//! Class definitions.
//!
//! A [`ClassDef`] is the blueprint instances are stamped from. It holds the
//! classified public and private members, the dynamic properties, a deferred
//! reference to its superclass and the mode flags chosen at definition time.
//! Definitions are shared handles and stay mutable after creation through
//! [`ClassDef::set`].

use std::sync::Arc;

use anyhow::Result;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    environment::{Environment, WeakEnvironment},
    errors::ObjectModelError,
    instance::Instance,
    value::Value,
    StrataConfig,
};

pub mod inherit;
pub mod members;
pub mod mutate;


pub use inherit::{resolve_chain, SuperclassRef};
pub use members::{classify, Classified, FieldDefault, Member, Members, Method};
pub use mutate::{MemberTier, Visibility};

/// Names bound by the instance machinery itself.
pub const RESERVED_NAMES: [&str; 3] = ["self", "private", "super"];
/// Constructor hook, only allowed among public members.
pub const INITIALIZER: &str = "initialize";
/// Private hook consulted by deep cloning.
pub const DEEP_CLONE_HOOK: &str = "deep_clone";

/// Member-access convention used by method bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncapsulationMode {
    /// Instance state is reached only through `self` and `private`.
    #[default]
    Qualified,
    /// Legacy mode: fields resolve as bare names and are mutated through
    /// [`Context::rebind`](crate::instance::method::Context::rebind).
    Unqualified,
}

/// Mode flags fixed when a class is defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassOptions {
    pub mode: EncapsulationMode,
    /// Instances reject new top-level names after construction.
    pub lock_objects: bool,
    /// Instances carry the `[class, ancestors.., "Strata"]` type tag.
    pub class_tagged: bool,
    /// The definition rejects [`ClassDef::set`].
    pub lock_class: bool,
    /// Instances support [`Instance::copy`].
    pub cloneable: bool,
}

impl Default for ClassOptions {
    fn default() -> Self {
        Self {
            mode: EncapsulationMode::Qualified,
            lock_objects: true,
            class_tagged: true,
            lock_class: false,
            cloneable: true,
        }
    }
}

/// Classified member tables of one definition.
#[derive(Clone, Debug, Default)]
pub(crate) struct MemberTables {
    pub public_fields: IndexMap<String, FieldDefault>,
    pub public_methods: IndexMap<String, Method>,
    pub private_fields: IndexMap<String, FieldDefault>,
    pub private_methods: IndexMap<String, Method>,
    pub active: IndexMap<String, Method>,
}

impl MemberTables {
    pub fn contains(&self, name: &str) -> bool {
        self.public_fields.contains_key(name)
            || self.public_methods.contains_key(name)
            || self.private_fields.contains_key(name)
            || self.private_methods.contains_key(name)
            || self.active.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) {
        self.public_fields.shift_remove(name);
        self.public_methods.shift_remove(name);
        self.private_fields.shift_remove(name);
        self.private_methods.shift_remove(name);
        self.active.shift_remove(name);
    }

    pub fn has_private(&self) -> bool {
        !self.private_fields.is_empty() || !self.private_methods.is_empty()
    }
}

pub(crate) struct ClassInner {
    pub name: String,
    pub tables: MemberTables,
    pub superclass: Option<SuperclassRef>,
    pub options: ClassOptions,
    pub debug_names: IndexSet<String>,
    pub env: WeakEnvironment,
    pub max_inheritance_depth: Option<usize>,
}

/// One level of a resolved chain, frozen at instantiation time so that later
/// changes to the definition never reach already-built instances.
#[derive(Clone)]
pub(crate) struct ClassLevel {
    pub name: String,
    pub tables: MemberTables,
    pub options: ClassOptions,
    pub debug_names: IndexSet<String>,
    pub env: WeakEnvironment,
}

/// Shared handle to a class definition.
#[derive(Clone)]
pub struct ClassDef {
    inner: Arc<RwLock<ClassInner>>,
}

impl ClassDef {
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name)
    }

    pub fn name(&self) -> String {
        self.inner.read().name.clone()
    }

    pub fn options(&self) -> ClassOptions {
        self.inner.read().options.clone()
    }

    pub fn mode(&self) -> EncapsulationMode {
        self.inner.read().options.mode
    }

    pub fn public_field_names(&self) -> Vec<String> {
        self.inner.read().tables.public_fields.keys().cloned().collect()
    }

    pub fn public_method_names(&self) -> Vec<String> {
        self.inner.read().tables.public_methods.keys().cloned().collect()
    }

    pub fn private_field_names(&self) -> Vec<String> {
        self.inner.read().tables.private_fields.keys().cloned().collect()
    }

    pub fn private_method_names(&self) -> Vec<String> {
        self.inner.read().tables.private_methods.keys().cloned().collect()
    }

    pub fn active_names(&self) -> Vec<String> {
        self.inner.read().tables.active.keys().cloned().collect()
    }

    /// True when any member of any tier uses `name`.
    pub fn has_member(&self, name: &str) -> bool {
        self.inner.read().tables.contains(name)
    }

    pub fn environment(&self) -> Option<Environment> {
        self.inner.read().env.upgrade()
    }

    pub fn superclass_ref(&self) -> Option<SuperclassRef> {
        self.inner.read().superclass.clone()
    }

    pub fn superclass_description(&self) -> Option<String> {
        self.inner.read().superclass.as_ref().map(SuperclassRef::describe)
    }

    pub fn ptr_eq(&self, other: &ClassDef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Build an instance, passing `args` to the `initialize` method.
    pub fn new_instance(&self, args: &[Value]) -> Result<Instance> {
        crate::instance::builder::build(self, args)
    }

    pub(crate) fn level(&self) -> ClassLevel {
        let inner = self.inner.read();
        ClassLevel {
            name: inner.name.clone(),
            tables: inner.tables.clone(),
            options: inner.options.clone(),
            debug_names: inner.debug_names.clone(),
            env: inner.env.clone(),
        }
    }

    pub(crate) fn max_inheritance_depth(&self) -> Option<usize> {
        self.inner.read().max_inheritance_depth
    }

    pub(crate) fn inner(&self) -> &RwLock<ClassInner> {
        &self.inner
    }
}

impl std::fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ClassDef")
            .field("name", &inner.name)
            .field("options", &inner.options)
            .field("superclass", &inner.superclass.as_ref().map(SuperclassRef::describe))
            .finish()
    }
}

/// Builder behind [`define_class`].
pub struct ClassBuilder {
    name: String,
    public: Members,
    private: Option<Members>,
    active: Option<Members>,
    inherit: Option<SuperclassRef>,
    environment: Option<Environment>,
    options: ClassOptions,
    max_inheritance_depth: Option<usize>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, &StrataConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: &StrataConfig) -> Self {
        Self {
            name: name.into(),
            public: Members::new(),
            private: None,
            active: None,
            inherit: None,
            environment: None,
            options: config.default_options.clone(),
            max_inheritance_depth: config.max_inheritance_depth,
        }
    }

    pub fn public(mut self, members: Members) -> Self {
        self.public = members;
        self
    }

    pub fn private(mut self, members: Members) -> Self {
        self.private = Some(members);
        self
    }

    pub fn active(mut self, members: Members) -> Self {
        self.active = Some(members);
        self
    }

    pub fn inherit(mut self, superclass: SuperclassRef) -> Self {
        self.inherit = Some(superclass);
        self
    }

    /// Context used for bare-name lookups from method bodies.
    pub fn environment(mut self, env: &Environment) -> Self {
        self.environment = Some(env.clone());
        self
    }

    pub fn options(mut self, options: ClassOptions) -> Self {
        self.options = options;
        self
    }

    pub fn mode(mut self, mode: EncapsulationMode) -> Self {
        self.options.mode = mode;
        self
    }

    pub fn lock_objects(mut self, lock: bool) -> Self {
        self.options.lock_objects = lock;
        self
    }

    pub fn class_tagged(mut self, tagged: bool) -> Self {
        self.options.class_tagged = tagged;
        self
    }

    pub fn lock_class(mut self, lock: bool) -> Self {
        self.options.lock_class = lock;
        self
    }

    pub fn cloneable(mut self, cloneable: bool) -> Self {
        self.options.cloneable = cloneable;
        self
    }

    /// Validate the declaration and produce the definition. Nothing is
    /// returned unless every check passes.
    pub fn build(self) -> Result<ClassDef> {
        validate_members(
            &self.name,
            &self.public,
            self.private.as_ref(),
            self.active.as_ref(),
        )?;

        let public = classify(Some(&self.public));
        let private = classify(self.private.as_ref());
        let active = classify(self.active.as_ref());

        let tables = MemberTables {
            public_fields: public.fields,
            public_methods: public.methods,
            private_fields: private.fields,
            private_methods: private.methods,
            active: active.methods,
        };

        debug!(
            class = %self.name,
            public = tables.public_fields.len() + tables.public_methods.len(),
            private = tables.private_fields.len() + tables.private_methods.len(),
            active = tables.active.len(),
            "defined class"
        );

        Ok(ClassDef {
            inner: Arc::new(RwLock::new(ClassInner {
                name: self.name,
                tables,
                superclass: self.inherit,
                options: self.options,
                debug_names: IndexSet::new(),
                env: self
                    .environment
                    .as_ref()
                    .map(Environment::downgrade)
                    .unwrap_or_default(),
                max_inheritance_depth: self.max_inheritance_depth,
            })),
        })
    }
}

/// Define a class in one call.
pub fn define_class(
    name: &str,
    public: Members,
    private: Option<Members>,
    active: Option<Members>,
    inherit: Option<SuperclassRef>,
    options: ClassOptions,
) -> Result<ClassDef> {
    let mut builder = ClassBuilder::new(name).public(public).options(options);
    if let Some(private) = private {
        builder = builder.private(private);
    }
    if let Some(active) = active {
        builder = builder.active(active);
    }
    if let Some(inherit) = inherit {
        builder = builder.inherit(inherit);
    }
    builder.build()
}

pub(crate) fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// Checks run in a fixed order: naming, uniqueness, reserved names,
/// initializer placement, dynamic properties being functions.
fn validate_members(
    class: &str,
    public: &Members,
    private: Option<&Members>,
    active: Option<&Members>,
) -> Result<(), ObjectModelError> {
    let groups: [(&str, Option<&Members>); 3] = [
        ("public", Some(public)),
        ("private", private),
        ("active", active),
    ];

    for (group, members) in groups {
        if members.is_some_and(|m| m.names().any(str::is_empty)) {
            return Err(ObjectModelError::InvalidMemberName {
                class: class.to_string(),
                group: group.to_string(),
            });
        }
    }

    let mut seen = IndexSet::new();
    for name in groups.iter().filter_map(|(_, m)| *m).flat_map(|m| m.names()) {
        if !seen.insert(name) {
            return Err(ObjectModelError::duplicate(class, name));
        }
    }

    if let Some(name) = seen.iter().find(|name| is_reserved(name)) {
        return Err(ObjectModelError::ReservedNameConflict {
            class: class.to_string(),
            name: name.to_string(),
        });
    }

    for (group, members) in &groups[1..] {
        if members.is_some_and(|m| m.names().any(|n| n == INITIALIZER)) {
            return Err(ObjectModelError::MisplacedInitializer {
                class: class.to_string(),
                group: group.to_string(),
            });
        }
    }

    if let Some(active) = active {
        if let Some((name, _)) = active.iter().find(|(_, member)| !member.is_function()) {
            return Err(ObjectModelError::NonFunctionDynamicProperty {
                class: class.to_string(),
                name: name.to_string(),
            });
        }
    }

    Ok(())
}
