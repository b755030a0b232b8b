//! In-memory repository backend.
//!
//! Thread-safe, schema-driven storage of [`DynamicRecord`]s. It is intended
//! for embedded usage, tests, and as a reference implementation of the
//! [`Repository`] contract.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::field::{FieldName, FieldSet};
use crate::record::{DynamicRecord, Record, RecordId, RecordSchema};
use crate::storage::traits::{Repository, StorageError};
use crate::value::Value;

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

/// How the repository assigns ids to records saved without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    /// 1, 2, 3, ... as [`RecordId::Int`].
    #[default]
    Sequential,
    /// Random v4 UUIDs as [`RecordId::Text`].
    Uuid,
}

#[derive(Debug)]
struct RepoState {
    rows: BTreeMap<RecordId, DynamicRecord>,
    /// `None` once the sequence has passed `i64::MAX`.
    next_id: Option<i64>,
}

impl Default for RepoState {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: Some(1),
        }
    }
}

/// Thread-safe in-memory repository for one record schema.
#[derive(Debug)]
pub struct InMemoryRepository {
    schema: RecordSchema,
    ids: IdStrategy,
    state: RwLock<RepoState>,
}

impl InMemoryRepository {
    /// Create an empty repository with sequential ids.
    #[must_use]
    pub fn new(schema: RecordSchema) -> Self {
        Self::with_id_strategy(schema, IdStrategy::Sequential)
    }

    /// Create an empty repository with the given id strategy.
    #[must_use]
    pub fn with_id_strategy(schema: RecordSchema, ids: IdStrategy) -> Self {
        Self {
            schema,
            ids,
            state: RwLock::new(RepoState::default()),
        }
    }

    #[must_use]
    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// Number of stored records.
    pub fn len(&self) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("repo.len"))?;
        Ok(state.rows.len())
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    fn allocate_id(&self, state: &mut RepoState) -> Result<RecordId, StorageError> {
        match self.ids {
            IdStrategy::Sequential => {
                let id = state
                    .next_id
                    .ok_or_else(|| StorageError::Backend("sequential ids exhausted".into()))?;
                state.next_id = id.checked_add(1);
                Ok(RecordId::Int(id))
            }
            IdStrategy::Uuid => Ok(RecordId::Text(Uuid::new_v4().to_string())),
        }
    }

    /// Copies the schema's columns out of `record`, dropping anything else.
    fn conform(&self, record: &DynamicRecord) -> DynamicRecord {
        let mut row = self.schema.empty_record();
        for column in self.schema.columns() {
            if let Some(value) = record.get(column.name.as_str()) {
                row.set(&column.name, value);
            }
        }
        row
    }

    fn stamp(&self, row: &mut DynamicRecord, field: &FieldName, now: Value) {
        if self.schema.has_column(field.as_str()) {
            row.set(field, now);
        }
    }
}

impl Repository for InMemoryRepository {
    type Record = DynamicRecord;

    fn schema_fields(&self) -> Result<FieldSet, StorageError> {
        Ok(self.schema.fields())
    }

    fn primary_key(&self) -> Result<FieldName, StorageError> {
        Ok(self.schema.primary_key().clone())
    }

    fn new_record(&self) -> Result<DynamicRecord, StorageError> {
        Ok(self.schema.empty_record())
    }

    fn list_all(&self) -> Result<Vec<DynamicRecord>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("repo.list_all"))?;
        Ok(state.rows.values().cloned().collect())
    }

    fn find_by_id(&self, id: &RecordId) -> Result<Option<DynamicRecord>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("repo.find_by_id"))?;
        Ok(state.rows.get(id).cloned())
    }

    fn save(&self, record: DynamicRecord) -> Result<DynamicRecord, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("repo.save"))?;
        let mut row = self.conform(&record);
        let now = Value::Timestamp(Utc::now());

        let id = match row.id() {
            Some(id) if state.rows.contains_key(&id) => id,
            Some(id) => {
                if let (RecordId::Int(n), Some(next)) = (&id, state.next_id) {
                    state.next_id = n.checked_add(1).map(|after| next.max(after));
                }
                self.stamp(&mut row, &FieldName::created_at(), now.clone());
                id
            }
            None => {
                let id = self.allocate_id(&mut state)?;
                row.set(self.schema.primary_key(), id.to_value());
                self.stamp(&mut row, &FieldName::created_at(), now.clone());
                id
            }
        };
        self.stamp(&mut row, &FieldName::updated_at(), now);

        debug!(table = self.schema.table(), %id, "saved record");
        state.rows.insert(id, row.clone());
        Ok(row)
    }

    fn delete(&self, record: &DynamicRecord) -> Result<(), StorageError> {
        let id = record
            .id()
            .ok_or_else(|| StorageError::Backend("cannot delete a record without an id".into()))?;
        let mut state = self.state.write().map_err(|_| lock_err("repo.delete"))?;
        state
            .rows
            .remove(&id)
            .ok_or(StorageError::NotFound(id.clone()))?;
        debug!(table = self.schema.table(), %id, "deleted record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> FieldName {
        FieldName::new(s).unwrap()
    }

    fn schema() -> RecordSchema {
        RecordSchema::new("posts")
            .unwrap()
            .column(name("title"))
            .column_with_default(name("status"), "draft")
            .with_timestamps()
    }

    #[test]
    fn save_assigns_sequential_ids_and_timestamps() {
        let repo = InMemoryRepository::new(schema());
        let first = repo
            .save(repo.new_record().unwrap().with(name("title"), "one"))
            .unwrap();
        let second = repo
            .save(repo.new_record().unwrap().with(name("title"), "two"))
            .unwrap();

        assert_eq!(first.id(), Some(RecordId::Int(1)));
        assert_eq!(second.id(), Some(RecordId::Int(2)));
        assert!(first.get("created_at").unwrap().is_timestamp());
        assert!(first.get("updated_at").unwrap().is_timestamp());
        assert_eq!(first.get("status"), Some(Value::from("draft")));
        assert_eq!(repo.len().unwrap(), 2);
    }

    #[test]
    fn uuid_strategy_assigns_text_ids() {
        let repo = InMemoryRepository::with_id_strategy(schema(), IdStrategy::Uuid);
        let saved = repo.save(repo.new_record().unwrap()).unwrap();
        let Some(RecordId::Text(id)) = saved.id() else {
            panic!("expected text id");
        };
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn update_keeps_created_at_and_refreshes_updated_at() {
        let repo = InMemoryRepository::new(schema());
        let saved = repo.save(repo.new_record().unwrap()).unwrap();
        let created = saved.get("created_at");

        let mut edited = saved.clone();
        edited.set(&name("title"), Value::from("edited"));
        let updated = repo.save(edited).unwrap();

        assert_eq!(updated.id(), saved.id());
        assert_eq!(updated.get("created_at"), created);
        assert_eq!(updated.get("title"), Some(Value::from("edited")));
        assert!(
            updated.get("updated_at").unwrap().as_timestamp()
                >= saved.get("updated_at").unwrap().as_timestamp()
        );
        assert_eq!(repo.len().unwrap(), 1);
    }

    #[test]
    fn save_drops_columns_outside_schema() {
        let repo = InMemoryRepository::new(schema());
        let saved = repo
            .save(repo.new_record().unwrap().with(name("bogus"), 1))
            .unwrap();
        assert_eq!(saved.get("bogus"), None);
    }

    #[test]
    fn explicit_id_advances_sequence() {
        let repo = InMemoryRepository::new(schema());
        repo.save(repo.new_record().unwrap().with(FieldName::id(), 10))
            .unwrap();
        let next = repo.save(repo.new_record().unwrap()).unwrap();
        assert_eq!(next.id(), Some(RecordId::Int(11)));
    }

    #[test]
    fn exhausted_sequence_fails_instead_of_reusing_ids() {
        let repo = InMemoryRepository::new(schema());
        repo.save(
            repo.new_record()
                .unwrap()
                .with(FieldName::id(), i64::MAX)
                .with(name("title"), "last"),
        )
        .unwrap();

        let err = repo.save(repo.new_record().unwrap()).unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));

        let last = repo.find_by_id(&RecordId::Int(i64::MAX)).unwrap().unwrap();
        assert_eq!(last.get("title"), Some(Value::from("last")));
        assert_eq!(repo.len().unwrap(), 1);
    }

    #[test]
    fn primary_key_comes_from_schema() {
        let schema = RecordSchema::from_columns("notes", name("note_id"), Vec::new()).unwrap();
        let repo = InMemoryRepository::new(schema);
        assert_eq!(repo.primary_key().unwrap().as_str(), "note_id");
    }

    #[test]
    fn find_list_delete() {
        let repo = InMemoryRepository::new(schema());
        let saved = repo.save(repo.new_record().unwrap()).unwrap();
        let id = saved.id().unwrap();

        assert_eq!(repo.find_by_id(&id).unwrap(), Some(saved.clone()));
        assert_eq!(repo.list_all().unwrap().len(), 1);

        repo.delete(&saved).unwrap();
        assert!(repo.find_by_id(&id).unwrap().is_none());
        assert!(repo.is_empty().unwrap());
        assert!(matches!(repo.delete(&saved), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn delete_without_id_fails() {
        let repo = InMemoryRepository::new(schema());
        let unsaved = repo.new_record().unwrap();
        assert!(matches!(repo.delete(&unsaved), Err(StorageError::Backend(_))));
    }
}
