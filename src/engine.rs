//! The record engine.
//!
//! [`RecordEngine`] binds one repository and mediates every operation on it
//! through a [`FieldPolicy`]. It is synchronous and holds no state between
//! calls beyond the policy and its configuration.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{ActionRoutes, EngineConfig};
use crate::error::{CrudError, CrudResult};
use crate::field::{FieldName, FieldSet};
use crate::form::{FormDescriptor, FormEntry, FormOptions, CREATE_LABEL, UPDATE_LABEL};
use crate::input::{InputMap, InputSource};
use crate::policy::{FieldAccess, FieldPolicy};
use crate::record::{Record, RecordId};
use crate::storage::{Repository, StorageError};
use crate::table::{Listing, Projection, RecordTable, RowAction, TableRow};

/// Policy-filtered CRUD over one record type.
///
/// Configure the policy first, then share the engine. Marking methods take
/// `&mut self`, so an engine behind `Arc` or a shared borrow can no longer be
/// reconfigured.
///
/// ```
/// use crudkit::{FieldName, InMemoryRepository, InputMap, RecordEngine, RecordSchema};
///
/// let schema = RecordSchema::new("users")
///     .unwrap()
///     .column(FieldName::new("email").unwrap())
///     .column(FieldName::new("password").unwrap());
/// let mut engine = RecordEngine::new(InMemoryRepository::new(schema));
/// engine.mark_private([FieldName::new("password").unwrap()]);
///
/// let input = InputMap::new().with("email", "a@b.com").with("password", "x");
/// let created = engine.do_create(&input).unwrap();
/// let id = crudkit::Record::id(&created).unwrap();
///
/// let shown = engine.get_one(&id).unwrap();
/// assert!(shown.contains("email"));
/// assert!(!shown.contains("password"));
/// ```
pub struct RecordEngine<R: Record> {
    repository: Arc<dyn Repository<Record = R>>,
    policy: FieldPolicy,
    config: EngineConfig,
}

impl<R: Record> fmt::Debug for RecordEngine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordEngine")
            .field("policy", &self.policy)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<R: Record> RecordEngine<R> {
    /// Creates an engine with the default configuration.
    pub fn new(repository: impl Repository<Record = R> + 'static) -> Self {
        Self {
            repository: Arc::new(repository),
            policy: FieldPolicy::default(),
            config: EngineConfig::default(),
        }
    }

    /// Creates an engine whose policy is seeded from `config`.
    pub fn with_config(
        repository: impl Repository<Record = R> + 'static,
        config: EngineConfig,
    ) -> CrudResult<Self> {
        Self::from_shared(Arc::new(repository), config)
    }

    /// Creates an engine over a repository that is shared with other code.
    pub fn from_shared(
        repository: Arc<dyn Repository<Record = R>>,
        config: EngineConfig,
    ) -> CrudResult<Self> {
        let policy = FieldPolicy::from_config(&config)?;
        Ok(Self {
            repository,
            policy,
            config,
        })
    }

    /// Adds fields to the read-only set.
    pub fn mark_read_only(&mut self, fields: impl IntoIterator<Item = FieldName>) -> &mut Self {
        self.policy.mark_read_only(fields);
        self
    }

    /// Adds fields to the private set.
    pub fn mark_private(&mut self, fields: impl IntoIterator<Item = FieldName>) -> &mut Self {
        self.policy.mark_private(fields);
        self
    }

    #[must_use]
    pub fn policy(&self) -> &FieldPolicy {
        &self.policy
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn repository(&self) -> &Arc<dyn Repository<Record = R>> {
        &self.repository
    }

    /// Form options carrying the configured style.
    #[must_use]
    pub fn form_options(&self) -> FormOptions {
        FormOptions::from_style(self.config.form.clone())
    }

    fn storage<T>(&self, op: &'static str, result: Result<T, StorageError>) -> CrudResult<T> {
        result.map_err(|e| {
            warn!(op, error = %e, "repository call failed");
            CrudError::Persistence(e)
        })
    }

    fn fetch(&self, id: &RecordId) -> CrudResult<R> {
        self.storage("find_by_id", self.repository.find_by_id(id))?
            .ok_or_else(|| CrudError::not_found(id.clone()))
    }

    /// Schema fields minus private ones, in schema order.
    ///
    /// Read from the repository on every call.
    pub fn discover_fields(&self) -> CrudResult<FieldSet> {
        let schema = self.storage("schema_fields", self.repository.schema_fields())?;
        Ok(schema.difference(self.policy.private()))
    }

    fn readable_fields(&self) -> CrudResult<Vec<FieldName>> {
        Ok(self
            .discover_fields()?
            .into_iter()
            .filter(|f| self.policy.is_readable(f.as_str()))
            .collect())
    }

    fn primary_key(&self) -> CrudResult<FieldName> {
        self.storage("primary_key", self.repository.primary_key())
    }

    /// Policy classification with the primary key pinned to read-only.
    fn access(&self, field: &str, key: &FieldName) -> FieldAccess {
        match self.policy.classify(field) {
            FieldAccess::Writable if field == key.as_str() => FieldAccess::ReadOnly,
            access => access,
        }
    }

    /// How the engine treats `field` for the bound repository.
    ///
    /// Same as [`FieldPolicy::classify`], except that the repository's primary
    /// key is never writable whatever the configured read-only seed says.
    pub fn classify(&self, field: &str) -> CrudResult<FieldAccess> {
        let key = self.primary_key()?;
        Ok(self.access(field, &key))
    }

    fn writable_fields(&self) -> CrudResult<Vec<FieldName>> {
        let key = self.primary_key()?;
        Ok(self
            .discover_fields()?
            .into_iter()
            .filter(|f| self.access(f.as_str(), &key) == FieldAccess::Writable)
            .collect())
    }

    /// Every record, either raw or as a table.
    pub fn list(&self, as_table: bool) -> CrudResult<Listing<R>> {
        if as_table {
            self.list_table().map(Listing::Table)
        } else {
            self.list_records().map(Listing::Records)
        }
    }

    pub fn list_records(&self) -> CrudResult<Vec<R>> {
        self.storage("list_all", self.repository.list_all())
    }

    /// Every record as a table, with row actions from the configured routes.
    pub fn list_table(&self) -> CrudResult<RecordTable> {
        self.list_table_with(&self.config.actions)
    }

    /// Every record as a table, with row actions from `routes`.
    pub fn list_table_with(&self, routes: &ActionRoutes) -> CrudResult<RecordTable> {
        let fields = self.readable_fields()?;
        let mut table = RecordTable::with_columns(&fields);
        for record in self.list_records()? {
            let id = record.id();
            table.rows.push(TableRow {
                cells: fields
                    .iter()
                    .map(|f| record.get(f.as_str()).unwrap_or_default())
                    .collect(),
                actions: id
                    .as_ref()
                    .map(|id| RowAction::for_row(routes, id))
                    .unwrap_or_default(),
                id,
            });
        }
        Ok(table)
    }

    /// One record reduced to its readable fields.
    pub fn get_one(&self, id: &RecordId) -> CrudResult<Projection> {
        let record = self.fetch(id)?;
        let mut projection = Projection::default();
        for field in self.readable_fields()? {
            let value = record.get(field.as_str()).unwrap_or_default();
            projection.push(field, value);
        }
        Ok(projection)
    }

    /// Creates a record from the writable fields of the submitted input.
    pub fn do_create(&self, input: &dyn InputSource) -> CrudResult<R> {
        let target = self.storage("new_record", self.repository.new_record())?;
        let saved = self.reconcile(target, &input.current_input())?;
        let id = saved
            .id()
            .ok_or_else(|| CrudError::internal("repository saved a record without an id"))?;
        info!(%id, "created record");
        Ok(saved)
    }

    /// Updates a stored record from the writable fields of the submitted input.
    pub fn do_update(&self, id: &RecordId, input: &dyn InputSource) -> CrudResult<R> {
        let target = self.fetch(id)?;
        let saved = self.reconcile(target, &input.current_input())?;
        info!(%id, "updated record");
        Ok(saved)
    }

    pub fn do_delete(&self, id: &RecordId) -> CrudResult<()> {
        let record = self.fetch(id)?;
        self.storage("delete", self.repository.delete(&record))?;
        info!(%id, "deleted record");
        Ok(())
    }

    /// Empty form over the writable fields, ending in a "Create" submit entry.
    pub fn build_create_form(&self, options: &FormOptions) -> CrudResult<FormDescriptor> {
        let entries = self
            .writable_fields()?
            .iter()
            .map(|f| FormEntry::field(f, options, None))
            .collect();
        Ok(FormDescriptor::new(
            entries,
            FormEntry::submit(CREATE_LABEL, options),
        ))
    }

    /// Form over the writable fields prefilled from the stored record, ending
    /// in an "Update" submit entry.
    pub fn build_update_form(
        &self,
        id: &RecordId,
        options: &FormOptions,
    ) -> CrudResult<FormDescriptor> {
        let record = self.fetch(id)?;
        let entries = self
            .writable_fields()?
            .iter()
            .map(|f| FormEntry::field(f, options, Some(record.get(f.as_str()).unwrap_or_default())))
            .collect();
        Ok(FormDescriptor::new(
            entries,
            FormEntry::submit(UPDATE_LABEL, options),
        ))
    }

    /// Merges `input` into `target` through the allow-list, then saves once.
    ///
    /// A key is written only if it names a discovered field that the policy
    /// marks writable and that is not the primary key. Every other key is
    /// dropped and logged at debug level.
    pub fn reconcile(&self, mut target: R, input: &InputMap) -> CrudResult<R> {
        let known = self.discover_fields()?;
        let key = self.primary_key()?;
        self.apply_input(&mut target, input, &known, &key);
        self.storage("save", self.repository.save(target))
    }

    /// The in-memory half of [`RecordEngine::reconcile`]. Returns how many
    /// keys were written.
    pub(crate) fn apply_input(
        &self,
        target: &mut R,
        input: &InputMap,
        known: &FieldSet,
        primary_key: &FieldName,
    ) -> usize {
        let mut written = 0;
        for (key, value) in input.iter() {
            let reason = match (self.access(key, primary_key), known.get(key)) {
                (FieldAccess::Private, _) => "private",
                (_, None) => "unknown",
                (FieldAccess::ReadOnly, Some(_)) => "read_only",
                (FieldAccess::Writable, Some(field)) => {
                    target.set(field, value.clone());
                    written += 1;
                    continue;
                }
            };
            debug!(key, reason, "dropped input key");
        }
        written
    }
}
