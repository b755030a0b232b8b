//! Records and their identity.
//!
//! The engine never reflects over a record type. Anything it manipulates
//! implements [`Record`]: read a field by name, write a field by name, report
//! the primary key. [`DynamicRecord`] is the map-backed implementation used by
//! the bundled repositories; typed structs can implement the trait directly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::field::{is_identifier, FieldName, FieldSet};
use crate::value::Value;

/// Primary-key value of a record.
///
/// Identifiers are caller-defined and passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Parses an identifier taken from a route segment.
    ///
    /// Anything that parses as `i64` becomes [`RecordId::Int`]; every other
    /// string is kept verbatim as [`RecordId::Text`].
    ///
    /// ```
    /// use crudkit::RecordId;
    ///
    /// assert_eq!(RecordId::parse("42"), RecordId::Int(42));
    /// assert_eq!(
    ///     RecordId::parse("0b6f9c1e-2a1d-4e0a-9c61-6f0f6b1c2d3e"),
    ///     RecordId::Text("0b6f9c1e-2a1d-4e0a-9c61-6f0f6b1c2d3e".into())
    /// );
    /// ```
    #[must_use]
    pub fn parse(s: &str) -> Self {
        s.parse::<i64>()
            .map_or_else(|_| Self::Text(s.to_string()), Self::Int)
    }

    /// Reads an identifier out of a field value.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(Self::Int(*v)),
            Value::String(v) => Some(Self::Text(v.clone())),
            _ => None,
        }
    }

    /// Converts to a field value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(v) => Value::Int(*v),
            Self::Text(v) => Value::String(v.clone()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for RecordId {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for RecordId {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for RecordId {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// A structured record whose fields are addressable by name.
pub trait Record: Clone + Send + Sync + 'static {
    /// Primary-key value, or `None` before the first save.
    fn id(&self) -> Option<RecordId>;

    /// Reads a field. `None` means the record type has no such field.
    fn get(&self, field: &str) -> Option<Value>;

    /// Writes a field.
    fn set(&mut self, field: &FieldName, value: Value);
}

/// One column of a [`RecordSchema`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: FieldName,
    /// Value a fresh record starts with.
    #[serde(default)]
    pub default: Value,
}

/// Describes a record type: where it lives and which columns it has.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    table: String,
    primary_key: FieldName,
    columns: Vec<ColumnDef>,
}

impl RecordSchema {
    /// Creates a schema for `table` whose only column is the `id` primary key.
    pub fn new(table: impl Into<String>) -> Result<Self, ValidationError> {
        let table = table.into();
        if !is_identifier(&table) {
            return Err(ValidationError::InvalidTableName { name: table });
        }
        Ok(Self {
            table,
            primary_key: FieldName::id(),
            columns: vec![ColumnDef {
                name: FieldName::id(),
                default: Value::Null,
            }],
        })
    }

    /// Builds a schema from an explicit primary key and column list.
    ///
    /// The primary key is added as the first column if `columns` lacks it.
    pub fn from_columns(
        table: impl Into<String>,
        primary_key: FieldName,
        columns: Vec<ColumnDef>,
    ) -> Result<Self, ValidationError> {
        let table = table.into();
        if !is_identifier(&table) {
            return Err(ValidationError::InvalidTableName { name: table });
        }
        let mut schema = Self {
            table,
            primary_key: primary_key.clone(),
            columns: Vec::with_capacity(columns.len() + 1),
        };
        if !columns.iter().any(|c| c.name == primary_key) {
            schema.columns.push(ColumnDef {
                name: primary_key,
                default: Value::Null,
            });
        }
        for column in columns {
            schema.push_column(column);
        }
        Ok(schema)
    }

    /// Adds a column defaulting to `Null`.
    #[must_use]
    pub fn column(self, name: FieldName) -> Self {
        self.column_with_default(name, Value::Null)
    }

    /// Adds a column with an explicit default.
    #[must_use]
    pub fn column_with_default(mut self, name: FieldName, default: impl Into<Value>) -> Self {
        self.push_column(ColumnDef {
            name,
            default: default.into(),
        });
        self
    }

    /// Adds the `created_at` and `updated_at` columns.
    #[must_use]
    pub fn with_timestamps(self) -> Self {
        self.column(FieldName::created_at())
            .column(FieldName::updated_at())
    }

    fn push_column(&mut self, column: ColumnDef) {
        if let Some(existing) = self.columns.iter_mut().find(|c| c.name == column.name) {
            *existing = column;
        } else {
            self.columns.push(column);
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn primary_key(&self) -> &FieldName {
        &self.primary_key
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name.as_str() == name)
    }

    /// All column names in declaration order.
    #[must_use]
    pub fn fields(&self) -> FieldSet {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// A record holding every column at its default.
    #[must_use]
    pub fn empty_record(&self) -> DynamicRecord {
        DynamicRecord {
            primary_key: self.primary_key.clone(),
            values: self
                .columns
                .iter()
                .map(|c| (c.name.clone(), c.default.clone()))
                .collect(),
        }
    }
}

/// Map-backed record that keeps its fields in schema order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicRecord {
    primary_key: FieldName,
    values: Vec<(FieldName, Value)>,
}

impl DynamicRecord {
    /// Creates an empty record keyed by `primary_key`.
    #[must_use]
    pub fn new(primary_key: FieldName) -> Self {
        Self {
            primary_key,
            values: Vec::new(),
        }
    }

    /// Builder-style [`Record::set`].
    #[must_use]
    pub fn with(mut self, field: FieldName, value: impl Into<Value>) -> Self {
        self.set(&field, value.into());
        self
    }

    #[must_use]
    pub fn primary_key(&self) -> &FieldName {
        &self.primary_key
    }

    /// Iterates fields in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &Value)> {
        self.values.iter().map(|(k, v)| (k, v))
    }

    /// Borrows a field value.
    #[must_use]
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(k, _)| k.as_str() == field)
            .map(|(_, v)| v)
    }

    /// Renders the record as a flat JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_json()))
                .collect(),
        )
    }
}

impl Record for DynamicRecord {
    fn id(&self) -> Option<RecordId> {
        self.value(self.primary_key.as_str())
            .and_then(RecordId::from_value)
    }

    fn get(&self, field: &str) -> Option<Value> {
        self.value(field).cloned()
    }

    fn set(&mut self, field: &FieldName, value: Value) {
        if let Some(slot) = self.values.iter_mut().find(|(k, _)| k == field) {
            slot.1 = value;
        } else {
            self.values.push((field.clone(), value));
        }
    }
}
