//! Read-only views for display and debugging collaborators.
//!
//! These records carry names, tiers, flags and current field values. Turning
//! them into text is left to the caller.

use serde::Serialize;

use crate::{
    class::{ClassDef, ClassOptions},
    instance::{Instance, Scope, SlotKind},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassSummary {
    pub name: String,
    pub superclass: Option<String>,
    pub public_fields: Vec<String>,
    pub public_methods: Vec<String>,
    pub private_fields: Vec<String>,
    pub private_methods: Vec<String>,
    pub active: Vec<String>,
    pub options: ClassOptions,
    pub debug_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberSnapshot {
    pub name: String,
    pub kind: SlotKind,
    /// Present for fields only; dynamic properties are not evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSnapshot {
    pub id: String,
    pub class_name: String,
    pub chain: Vec<String>,
    pub class_tags: Option<Vec<String>>,
    pub locked: bool,
    pub public: Vec<MemberSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<Vec<MemberSnapshot>>,
}

impl ClassDef {
    pub fn summary(&self) -> ClassSummary {
        ClassSummary {
            name: self.name(),
            superclass: self.superclass_description(),
            public_fields: self.public_field_names(),
            public_methods: self.public_method_names(),
            private_fields: self.private_field_names(),
            private_methods: self.private_method_names(),
            active: self.active_names(),
            options: self.options(),
            debug_names: self.debug_names(),
        }
    }
}

impl Instance {
    pub fn snapshot(&self) -> InstanceSnapshot {
        InstanceSnapshot {
            id: self.id().to_string(),
            class_name: self.class_name().to_string(),
            chain: self.chain(),
            class_tags: self.class_tags().map(<[String]>::to_vec),
            locked: self.is_locked(),
            public: scope_members(&self.core.public),
            private: self.core.private.as_ref().map(scope_members),
        }
    }
}

fn scope_members(scope: &Scope) -> Vec<MemberSnapshot> {
    scope
        .slot_kinds()
        .into_iter()
        .map(|(name, kind, value)| MemberSnapshot {
            name,
            kind,
            value: value.map(|value| value.to_json()),
        })
        .collect()
}
