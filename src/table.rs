//! Listing and projection output types.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::config::ActionRoutes;
use crate::field::FieldName;
use crate::record::RecordId;
use crate::value::Value;

/// Label of the trailing header cell that holds row actions.
pub const ACTIONS_LABEL: &str = "Actions";

/// One header cell. `field` is `None` for the actions column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderCell {
    pub field: Option<FieldName>,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Edit,
    Delete,
}

/// A per-row affordance such as "edit this record".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowAction {
    pub kind: ActionKind,
    /// `{route}/{id}`.
    pub target: String,
    /// Prompt to confirm before acting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm: Option<String>,
}

impl RowAction {
    pub(crate) fn for_row(routes: &ActionRoutes, id: &RecordId) -> Vec<Self> {
        vec![
            Self {
                kind: ActionKind::Edit,
                target: format!("{}/{id}", routes.edit),
                confirm: None,
            },
            Self {
                kind: ActionKind::Delete,
                target: format!("{}/{id}", routes.delete),
                confirm: Some(routes.confirm_delete.clone()),
            },
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// `None` only for records the repository returned without an id.
    pub id: Option<RecordId>,
    /// One cell per readable field, aligned with the header.
    pub cells: Vec<Value>,
    pub actions: Vec<RowAction>,
}

/// Tabular rendering of every record, as structured data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordTable {
    pub header: Vec<HeaderCell>,
    pub rows: Vec<TableRow>,
}

impl RecordTable {
    pub(crate) fn with_columns(fields: &[FieldName]) -> Self {
        let mut header: Vec<HeaderCell> = fields
            .iter()
            .map(|f| HeaderCell {
                field: Some(f.clone()),
                label: f.label(),
            })
            .collect();
        header.push(HeaderCell {
            field: None,
            label: ACTIONS_LABEL.to_string(),
        });
        Self {
            header,
            rows: Vec::new(),
        }
    }

    /// Field columns, excluding the trailing actions column.
    pub fn columns(&self) -> impl Iterator<Item = &FieldName> {
        self.header.iter().filter_map(|h| h.field.as_ref())
    }

    /// Cell of `field` in row `row`.
    #[must_use]
    pub fn cell(&self, row: usize, field: &str) -> Option<&Value> {
        let column = self.columns().position(|f| f.as_str() == field)?;
        self.rows.get(row)?.cells.get(column)
    }
}

/// Result of [`crate::RecordEngine::list`].
#[derive(Debug, Clone, PartialEq)]
pub enum Listing<R> {
    Records(Vec<R>),
    Table(RecordTable),
}

impl<R> Listing<R> {
    #[must_use]
    pub fn into_records(self) -> Option<Vec<R>> {
        match self {
            Self::Records(records) => Some(records),
            Self::Table(_) => None,
        }
    }

    #[must_use]
    pub fn into_table(self) -> Option<RecordTable> {
        match self {
            Self::Records(_) => None,
            Self::Table(table) => Some(table),
        }
    }
}

/// A record reduced to its readable fields, in schema order.
///
/// Serializes as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    values: Vec<(FieldName, Value)>,
}

impl Projection {
    pub(crate) fn push(&mut self, field: FieldName, value: Value) {
        self.values.push((field, value));
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(k, _)| k.as_str() == field)
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &Value)> {
        self.values.iter().map(|(k, v)| (k, v))
    }

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

impl Serialize for Projection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (k, v) in &self.values {
            map.serialize_entry(k.as_str(), &v.to_json())?;
        }
        map.end()
    }
}
