use thiserror::Error;

/// Object-model error types raised by definition, instantiation, cloning and
/// mutation. Errors raised by user method bodies are never wrapped in these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectModelError {
    #[error("Invalid member name: every member of '{group}' in class '{class}' must be named")]
    InvalidMemberName { class: String, group: String },

    #[error("Duplicate member name '{name}' in class '{class}'")]
    DuplicateMemberName { class: String, name: String },

    #[error("Reserved name '{name}' cannot be used as a member of class '{class}'")]
    ReservedNameConflict { class: String, name: String },

    #[error("'initialize' in class '{class}' must be a public member, found in {group}")]
    MisplacedInitializer { class: String, group: String },

    #[error("Dynamic property '{name}' in class '{class}' must be a function")]
    NonFunctionDynamicProperty { class: String, name: String },

    #[error("Superclass of '{class}' could not be resolved: {reason}")]
    UnresolvableSuperclass { class: String, reason: String },

    #[error("Cannot add member '{name}' to a locked {scope} scope of '{class}'")]
    LockedMemberAddition {
        class: String,
        scope: String,
        name: String,
    },

    #[error("Class '{class}' has no initialize method to accept {count} argument(s)")]
    ConstructorArgumentMismatch { class: String, count: usize },

    #[error("Cannot change locked binding '{name}' of '{class}'")]
    LockedBinding { class: String, name: String },

    #[error("Class '{class}' is locked and cannot be modified")]
    ClassLocked { class: String },

    #[error("Instances of '{class}' are not cloneable")]
    CloneUnsupported { class: String },

    #[error("No {scope} scope is available to '{class}'")]
    MissingScope { class: String, scope: String },

    #[error("Name '{name}' is not bound")]
    UnboundName { name: String },

    #[error("Member '{name}' not found on '{class}'")]
    NoSuchMember { class: String, name: String },

    #[error("Member '{name}' of '{class}' is not a function")]
    NotCallable { class: String, name: String },

    #[error("Method '{method}' outlived the instance it was bound to")]
    InstanceReleased { method: String },

    #[error("Inheritance chain of '{class}' exceeds {limit} levels")]
    InheritanceTooDeep { class: String, limit: usize },
}

impl ObjectModelError {
    pub fn duplicate(class: &str, name: &str) -> Self {
        Self::DuplicateMemberName {
            class: class.to_string(),
            name: name.to_string(),
        }
    }

    pub fn unresolvable(class: &str, reason: impl Into<String>) -> Self {
        Self::UnresolvableSuperclass {
            class: class.to_string(),
            reason: reason.into(),
        }
    }

    pub fn locked_addition(class: &str, scope: &str, name: &str) -> Self {
        Self::LockedMemberAddition {
            class: class.to_string(),
            scope: scope.to_string(),
            name: name.to_string(),
        }
    }

    pub fn locked_binding(class: &str, name: &str) -> Self {
        Self::LockedBinding {
            class: class.to_string(),
            name: name.to_string(),
        }
    }

    pub fn missing_scope(class: &str, scope: &str) -> Self {
        Self::MissingScope {
            class: class.to_string(),
            scope: scope.to_string(),
        }
    }

    pub fn unbound(name: &str) -> Self {
        Self::UnboundName {
            name: name.to_string(),
        }
    }

    pub fn no_such_member(class: &str, name: &str) -> Self {
        Self::NoSuchMember {
            class: class.to_string(),
            name: name.to_string(),
        }
    }

    pub fn not_callable(class: &str, name: &str) -> Self {
        Self::NotCallable {
            class: class.to_string(),
            name: name.to_string(),
        }
    }

    /// Recover the object-model error carried by an `anyhow::Error`, if any.
    pub fn from_anyhow(err: &anyhow::Error) -> Option<&Self> {
        err.downcast_ref::<Self>()
    }
}
