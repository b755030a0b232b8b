//! Field visibility policy.
//!
//! Three classes exist: writable (the default), read-only, and private.
//! Private wins over read-only: a private field is neither readable nor
//! writable, whatever else the policy says about it.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::ValidationError;
use crate::field::{FieldName, FieldSet};

/// How the policy classifies one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldAccess {
    Writable,
    ReadOnly,
    Private,
}

/// Central authority on field readability and writability.
///
/// Both sets only grow: there is no way to un-mark a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPolicy {
    read_only: FieldSet,
    private: FieldSet,
}

impl Default for FieldPolicy {
    /// Read-only `id`, `created_at`, `updated_at`; nothing private.
    fn default() -> Self {
        Self {
            read_only: [
                FieldName::id(),
                FieldName::created_at(),
                FieldName::updated_at(),
            ]
            .into_iter()
            .collect(),
            private: FieldSet::new(),
        }
    }
}

impl FieldPolicy {
    /// Creates the conventional default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a policy from configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self {
            read_only: FieldSet::of(config.read_only.iter().cloned())?,
            private: FieldSet::of(config.private.iter().cloned())?,
        })
    }

    /// Adds fields to the read-only set.
    pub fn mark_read_only(&mut self, fields: impl IntoIterator<Item = FieldName>) {
        self.read_only.extend(fields);
    }

    /// Adds fields to the private set.
    pub fn mark_private(&mut self, fields: impl IntoIterator<Item = FieldName>) {
        self.private.extend(fields);
    }

    #[must_use]
    pub fn is_writable(&self, field: &str) -> bool {
        !self.read_only.contains(field) && !self.private.contains(field)
    }

    #[must_use]
    pub fn is_readable(&self, field: &str) -> bool {
        !self.private.contains(field)
    }

    #[must_use]
    pub fn classify(&self, field: &str) -> FieldAccess {
        if self.private.contains(field) {
            FieldAccess::Private
        } else if self.read_only.contains(field) {
            FieldAccess::ReadOnly
        } else {
            FieldAccess::Writable
        }
    }

    #[must_use]
    pub fn read_only(&self) -> &FieldSet {
        &self.read_only
    }

    #[must_use]
    pub fn private(&self) -> &FieldSet {
        &self.private
    }
}
