//! Engine configuration.
//!
//! [`EngineConfig`] is a plain serde value so it can be built in code or
//! loaded from a JSON file next to the rest of an application's settings.
//! Every field has a default, so `{}` is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::field::{is_identifier, CREATED_AT, ID, UPDATED_AT};

fn default_read_only() -> Vec<String> {
    vec![ID.to_string(), CREATED_AT.to_string(), UPDATED_AT.to_string()]
}

/// Route prefixes used to build row actions in table listings.
///
/// A row with id `4` gets the edit target `"{edit}/4"` and the delete target
/// `"{delete}/4"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionRoutes {
    pub edit: String,
    pub delete: String,
    /// Prompt shown before a delete is carried out.
    pub confirm_delete: String,
}

impl Default for ActionRoutes {
    fn default() -> Self {
        Self {
            edit: "edit".to_string(),
            delete: "delete".to_string(),
            confirm_delete: "Are you sure you want to delete this record permanently?".to_string(),
        }
    }
}

impl ActionRoutes {
    /// Creates routes with the default confirmation prompt.
    #[must_use]
    pub fn new(edit: impl Into<String>, delete: impl Into<String>) -> Self {
        Self {
            edit: edit.into(),
            delete: delete.into(),
            ..Self::default()
        }
    }
}

/// Presentation hints copied onto form descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormStyle {
    /// Style class for every input entry.
    pub input: String,
    /// Style class for the submit entry.
    pub button: String,
}

impl Default for FormStyle {
    fn default() -> Self {
        Self {
            input: "form-control".to_string(),
            button: "btn btn-primary".to_string(),
        }
    }
}

/// Configuration for a [`crate::RecordEngine`].
///
/// `read_only` and `private` seed the field policy at construction. A
/// caller-supplied `read_only` list replaces the conventional defaults rather
/// than adding to them; after construction the policy can only grow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub read_only: Vec<String>,
    pub private: Vec<String>,
    pub actions: ActionRoutes,
    pub form: FormStyle,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            read_only: default_read_only(),
            private: Vec::new(),
            actions: ActionRoutes::default(),
            form: FormStyle::default(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ValidationError::InvalidConfig {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ValidationError::InvalidConfig {
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::from_json_str(&raw)
    }

    /// Checks that every policy entry is a valid field name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (list, names) in [("read_only", &self.read_only), ("private", &self.private)] {
            if let Some(bad) = names.iter().find(|n| !is_identifier(n)) {
                return Err(ValidationError::InvalidConfig {
                    reason: format!("{list} entry '{bad}' is not a valid field name"),
                });
            }
        }
        Ok(())
    }

    /// Sets the read-only seed.
    #[must_use]
    pub fn with_read_only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.read_only = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the private seed.
    #[must_use]
    pub fn with_private<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.private = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the row action routes.
    #[must_use]
    pub fn with_actions(mut self, actions: ActionRoutes) -> Self {
        self.actions = actions;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_seeds_system_fields() {
        let config = EngineConfig::default();
        assert_eq!(config.read_only, vec!["id", "created_at", "updated_at"]);
        assert!(config.private.is_empty());
        assert_eq!(config.form.input, "form-control");
        assert_eq!(config.form.button, "btn btn-primary");
    }

    #[test]
    fn empty_json_is_default() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{"private": ["password"], "actions": {"edit": "users/edit"}}"#,
        )
        .unwrap();
        assert_eq!(config.private, vec!["password"]);
        assert_eq!(config.read_only, vec!["id", "created_at", "updated_at"]);
        assert_eq!(config.actions.edit, "users/edit");
        assert_eq!(config.actions.delete, "delete");
    }

    #[test]
    fn custom_read_only_replaces_defaults() {
        let config = EngineConfig::from_json_str(r#"{"read_only": ["uuid"]}"#).unwrap();
        assert_eq!(config.read_only, vec!["uuid"]);
    }

    #[test]
    fn invalid_names_are_rejected() {
        let err = EngineConfig::from_json_str(r#"{"private": ["pass word"]}"#).unwrap_err();
        assert!(err.to_string().contains("pass word"));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            EngineConfig::from_json_str("{not json"),
            Err(ValidationError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"private": ["token"]}"#).unwrap();
        let config = EngineConfig::from_path(&path).unwrap();
        assert_eq!(config.private, vec!["token"]);

        assert!(EngineConfig::from_path(dir.path().join("missing.json")).is_err());
    }
}
