//! Post-hoc changes to a definition.
//!
//! Changes are prospective: instances already built keep the member tables
//! they were built from.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{is_reserved, ClassDef, Member, INITIALIZER};
use crate::errors::ObjectModelError;

/// Visibility group a member is added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
    Active,
}

/// Table a member lands in, from its visibility and whether it is a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberTier {
    PublicField,
    PublicMethod,
    PrivateField,
    PrivateMethod,
    Active,
}

impl MemberTier {
    pub fn of(visibility: Visibility, member: &Member) -> Option<Self> {
        match (visibility, member) {
            (Visibility::Public, Member::Field(_)) => Some(MemberTier::PublicField),
            (Visibility::Public, Member::Method(_)) => Some(MemberTier::PublicMethod),
            (Visibility::Private, Member::Field(_)) => Some(MemberTier::PrivateField),
            (Visibility::Private, Member::Method(_)) => Some(MemberTier::PrivateMethod),
            (Visibility::Active, Member::Method(_)) => Some(MemberTier::Active),
            (Visibility::Active, Member::Field(_)) => None,
        }
    }
}

impl ClassDef {
    /// Add a member, or replace one when `overwrite` is set. Returns the tier
    /// the member was stored in.
    pub fn set(
        &self,
        visibility: Visibility,
        name: &str,
        member: Member,
        overwrite: bool,
    ) -> Result<MemberTier> {
        let mut inner = self.inner().write();
        let class = inner.name.clone();

        if inner.options.lock_class {
            return Err(ObjectModelError::ClassLocked { class }.into());
        }
        if name.is_empty() {
            return Err(ObjectModelError::InvalidMemberName {
                class,
                group: format!("{visibility:?}").to_lowercase(),
            }
            .into());
        }
        if is_reserved(name) {
            return Err(ObjectModelError::ReservedNameConflict {
                class,
                name: name.to_string(),
            }
            .into());
        }
        if name == INITIALIZER && visibility != Visibility::Public {
            return Err(ObjectModelError::MisplacedInitializer {
                class,
                group: format!("{visibility:?}").to_lowercase(),
            }
            .into());
        }
        let tier = MemberTier::of(visibility, &member).ok_or_else(|| {
            ObjectModelError::NonFunctionDynamicProperty {
                class: class.clone(),
                name: name.to_string(),
            }
        })?;
        if inner.tables.contains(name) {
            if !overwrite {
                return Err(ObjectModelError::duplicate(&class, name).into());
            }
            inner.tables.remove(name);
        }

        let tables = &mut inner.tables;
        match member {
            Member::Field(default) => {
                let table = match tier {
                    MemberTier::PublicField => &mut tables.public_fields,
                    _ => &mut tables.private_fields,
                };
                table.insert(name.to_string(), default);
            }
            Member::Method(method) => {
                let table = match tier {
                    MemberTier::PublicMethod => &mut tables.public_methods,
                    MemberTier::PrivateMethod => &mut tables.private_methods,
                    _ => &mut tables.active,
                };
                table.insert(name.to_string(), method);
            }
        }

        debug!(class = %class, member = name, ?tier, overwrite, "updated class definition");
        Ok(tier)
    }

    /// Reject further [`ClassDef::set`] calls.
    pub fn lock(&self) {
        self.inner().write().options.lock_class = true;
    }

    pub fn unlock(&self) {
        self.inner().write().options.lock_class = false;
    }

    pub fn is_locked(&self) -> bool {
        self.inner().read().options.lock_class
    }

    /// Flag a method for step tracing in instances built from now on.
    pub fn debug(&self, method: &str) {
        self.inner().write().debug_names.insert(method.to_string());
    }

    pub fn undebug(&self, method: &str) {
        self.inner().write().debug_names.shift_remove(method);
    }

    pub fn debug_names(&self) -> Vec<String> {
        self.inner().read().debug_names.iter().cloned().collect()
    }
}
