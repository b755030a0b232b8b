//! Form descriptors.
//!
//! A [`FormDescriptor`] is structured data, not markup: an ordered list of
//! input entries plus one submit entry. Rendering is left to the caller.

use std::collections::HashMap;

use serde::Serialize;

use crate::config::FormStyle;
use crate::field::FieldName;
use crate::value::Value;

/// Caller-side knobs for form building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormOptions {
    /// Input kind per field, e.g. `email` or `password`. Missing fields get `""`.
    pub special_types: HashMap<FieldName, String>,
    /// Style class for every input entry.
    pub input_style: String,
    /// Style class for the submit entry.
    pub button_style: String,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self::from_style(FormStyle::default())
    }
}

impl FormOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options carrying the given style and no special types.
    #[must_use]
    pub fn from_style(style: FormStyle) -> Self {
        Self {
            special_types: HashMap::new(),
            input_style: style.input,
            button_style: style.button,
        }
    }

    /// Sets the input kind of one field.
    #[must_use]
    pub fn with_type(mut self, field: FieldName, input_kind: impl Into<String>) -> Self {
        self.special_types.insert(field, input_kind.into());
        self
    }

    fn input_kind(&self, field: &FieldName) -> String {
        self.special_types.get(field).cloned().unwrap_or_default()
    }
}

/// Label of the submit entry on a create form.
pub const CREATE_LABEL: &str = "Create";
/// Label of the submit entry on an update form.
pub const UPDATE_LABEL: &str = "Update";

/// One entry of a [`FormDescriptor`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FormEntry {
    Field {
        field: FieldName,
        label: String,
        input_kind: String,
        /// `input-{field}`.
        element_id: String,
        style: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_value: Option<Value>,
    },
    Submit {
        label: String,
        style: String,
    },
}

impl FormEntry {
    pub(crate) fn field(field: &FieldName, options: &FormOptions, current: Option<Value>) -> Self {
        Self::Field {
            field: field.clone(),
            label: field.to_string(),
            input_kind: options.input_kind(field),
            element_id: format!("input-{field}"),
            style: options.input_style.clone(),
            current_value: current,
        }
    }

    pub(crate) fn submit(label: &str, options: &FormOptions) -> Self {
        Self::Submit {
            label: label.to_string(),
            style: options.button_style.clone(),
        }
    }

    /// The field this entry edits, or `None` for the submit entry.
    #[must_use]
    pub fn field_name(&self) -> Option<&FieldName> {
        match self {
            Self::Field { field, .. } => Some(field),
            Self::Submit { .. } => None,
        }
    }
}

/// Ordered field entries followed by exactly one submit entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormDescriptor {
    entries: Vec<FormEntry>,
}

impl FormDescriptor {
    pub(crate) fn new(fields: Vec<FormEntry>, submit: FormEntry) -> Self {
        let mut entries = fields;
        entries.push(submit);
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[FormEntry] {
        &self.entries
    }

    /// Field entries only, in schema order.
    pub fn fields(&self) -> impl Iterator<Item = &FormEntry> {
        self.entries.iter().filter(|e| e.field_name().is_some())
    }

    /// The trailing submit entry.
    #[must_use]
    pub fn submit(&self) -> Option<&FormEntry> {
        self.entries.last()
    }

    /// The entry for `field`, if the form has one.
    #[must_use]
    pub fn entry(&self, field: &str) -> Option<&FormEntry> {
        self.entries
            .iter()
            .find(|e| e.field_name().is_some_and(|f| f.as_str() == field))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> FieldName {
        FieldName::new(s).unwrap()
    }

    #[test]
    fn field_entry_uses_special_type_and_style() {
        let options = FormOptions::new().with_type(name("email"), "email");
        let entry = FormEntry::field(&name("email"), &options, None);
        let FormEntry::Field {
            label,
            input_kind,
            element_id,
            style,
            current_value,
            ..
        } = entry
        else {
            panic!("expected field entry");
        };
        assert_eq!(label, "email");
        assert_eq!(input_kind, "email");
        assert_eq!(element_id, "input-email");
        assert_eq!(style, "form-control");
        assert!(current_value.is_none());
    }

    #[test]
    fn unknown_special_type_is_empty() {
        let entry = FormEntry::field(&name("bio"), &FormOptions::new(), None);
        assert!(matches!(entry, FormEntry::Field { ref input_kind, .. } if input_kind.is_empty()));
    }

    #[test]
    fn descriptor_ends_with_submit() {
        let options = FormOptions::from_style(FormStyle {
            input: "in".into(),
            button: "btn".into(),
        });
        let form = FormDescriptor::new(
            vec![FormEntry::field(&name("email"), &options, Some(Value::from("a@b.com")))],
            FormEntry::submit(UPDATE_LABEL, &options),
        );
        assert_eq!(form.entries().len(), 2);
        assert_eq!(form.fields().count(), 1);
        assert_eq!(
            form.submit(),
            Some(&FormEntry::Submit {
                label: "Update".into(),
                style: "btn".into()
            })
        );
        assert!(form.entry("email").is_some());
        assert!(form.entry("password").is_none());
    }

    #[test]
    fn serializes_with_kind_tag() {
        let options = FormOptions::new();
        let form = FormDescriptor::new(
            vec![FormEntry::field(&name("email"), &options, None)],
            FormEntry::submit(CREATE_LABEL, &options),
        );
        let json = serde_json::to_value(&form).unwrap();
        assert_eq!(json["entries"][0]["kind"], "field");
        assert_eq!(json["entries"][0]["element_id"], "input-email");
        assert!(json["entries"][0].get("current_value").is_none());
        assert_eq!(json["entries"][1]["kind"], "submit");
        assert_eq!(json["entries"][1]["label"], "Create");
    }
}
