//! SQLite repository backend.
//!
//! Binds one existing table. The schema is read with `PRAGMA table_info` on
//! every call, so columns added by an external migration show up without
//! reopening the repository. Table and column names must be plain
//! identifiers; anything else is refused when the repository is opened.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use crate::field::{is_identifier, FieldName, FieldSet};
use crate::record::{DynamicRecord, Record, RecordId};
use crate::storage::traits::{Repository, StorageError};
use crate::value::Value;

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(SqlValue::Null),
            Self::Bool(v) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*v))),
            Self::Int(v) => ToSqlOutput::Owned(SqlValue::Integer(*v)),
            Self::Float(v) => ToSqlOutput::Owned(SqlValue::Real(*v)),
            Self::String(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            Self::Timestamp(v) => ToSqlOutput::Owned(SqlValue::Text(v.to_rfc3339())),
            Self::Json(v) => ToSqlOutput::Owned(SqlValue::Text(v.to_string())),
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(v) => Self::Int(v),
            ValueRef::Real(v) => Self::Float(v),
            ValueRef::Text(v) => Self::String(String::from_utf8_lossy(v).into_owned()),
            ValueRef::Blob(v) => Self::Json(v.iter().copied().map(serde_json::Value::from).collect()),
        })
    }
}

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

#[derive(Debug, Clone)]
struct ColumnInfo {
    name: FieldName,
    integer: bool,
    primary_key: bool,
}

#[derive(Debug)]
struct TableInfo {
    columns: Vec<ColumnInfo>,
    primary_key: FieldName,
    integer_key: bool,
}

impl TableInfo {
    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name.as_str() == name)
    }

    fn select_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("\"{}\"", c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn empty_record(&self) -> DynamicRecord {
        self.columns.iter().fold(
            DynamicRecord::new(self.primary_key.clone()),
            |record, column| record.with(column.name.clone(), Value::Null),
        )
    }
}

fn table_info(conn: &Connection, table: &str) -> Result<TableInfo, StorageError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{table}\")"))?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(5)?,
        ))
    })?;

    let mut columns = Vec::new();
    for row in rows {
        let (name, decl_type, pk) = row?;
        let name = FieldName::new(name).map_err(|e| StorageError::Schema(e.to_string()))?;
        columns.push(ColumnInfo {
            name,
            integer: decl_type.to_ascii_uppercase().contains("INT"),
            primary_key: pk > 0,
        });
    }

    if columns.is_empty() {
        return Err(StorageError::Schema(format!("table '{table}' does not exist")));
    }

    let mut keys = columns.iter().filter(|c| c.primary_key);
    let key = match (keys.next(), keys.next()) {
        (Some(key), None) => key.clone(),
        (None, _) => {
            return Err(StorageError::Schema(format!(
                "table '{table}' has no primary key"
            )))
        }
        (Some(_), Some(_)) => {
            return Err(StorageError::Schema(format!(
                "table '{table}' has a composite primary key"
            )))
        }
    };

    Ok(TableInfo {
        primary_key: key.name,
        integer_key: key.integer,
        columns,
    })
}

fn read_row(row: &rusqlite::Row<'_>, info: &TableInfo) -> rusqlite::Result<DynamicRecord> {
    let mut record = DynamicRecord::new(info.primary_key.clone());
    for (i, column) in info.columns.iter().enumerate() {
        record.set(&column.name, row.get::<_, Value>(i)?);
    }
    Ok(record)
}

fn fetch(
    conn: &Connection,
    table: &str,
    info: &TableInfo,
    id: &RecordId,
) -> Result<Option<DynamicRecord>, StorageError> {
    let sql = format!(
        "SELECT {} FROM \"{table}\" WHERE \"{}\" = ?1",
        info.select_list(),
        info.primary_key
    );
    let record = conn
        .query_row(&sql, [id.to_value()], |row| read_row(row, info))
        .optional()?;
    Ok(record)
}

/// Repository over one table of a SQLite database.
#[derive(Debug)]
pub struct SqliteRepository {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteRepository {
    /// Binds `table` on an open connection.
    ///
    /// Fails with [`StorageError::Schema`] if the table is missing or has no
    /// single-column primary key.
    ///
    /// The table name and every column name must match
    /// `[A-Za-z_][A-Za-z0-9_]*`. Tables with quoted names such as
    /// `"first name"` or non-ASCII names are refused, since those names are
    /// interpolated into SQL as identifiers. Rename or expose such columns
    /// through a view before binding.
    pub fn new(conn: Connection, table: impl Into<String>) -> Result<Self, StorageError> {
        let table = table.into();
        if !is_identifier(&table) {
            return Err(StorageError::Schema(format!(
                "table name '{table}' is not a plain identifier"
            )));
        }
        table_info(&conn, &table)?;
        Ok(Self {
            conn: Mutex::new(conn),
            table,
        })
    }

    /// Opens a database file and binds `table`.
    pub fn open(path: impl AsRef<Path>, table: impl Into<String>) -> Result<Self, StorageError> {
        Self::new(Connection::open(path)?, table)
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    fn insert(
        &self,
        conn: &Connection,
        info: &TableInfo,
        row: &DynamicRecord,
    ) -> Result<RecordId, StorageError> {
        // Unset columns are left out so SQL defaults apply.
        let (names, values): (Vec<String>, Vec<Value>) = row
            .iter()
            .filter(|(name, value)| !value.is_null() && info.has_column(name.as_str()))
            .map(|(name, value)| (format!("\"{name}\""), value.clone()))
            .unzip();

        let sql = if names.is_empty() {
            format!("INSERT INTO \"{}\" DEFAULT VALUES", self.table)
        } else {
            let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
            format!(
                "INSERT INTO \"{}\" ({}) VALUES ({})",
                self.table,
                names.join(", "),
                placeholders.join(", ")
            )
        };
        conn.execute(&sql, params_from_iter(values.iter()))?;

        Ok(match row.id() {
            Some(id) => id,
            None => RecordId::Int(conn.last_insert_rowid()),
        })
    }

    fn update(
        &self,
        conn: &Connection,
        info: &TableInfo,
        id: &RecordId,
        row: &DynamicRecord,
    ) -> Result<(), StorageError> {
        let mut assignments = Vec::new();
        let mut values = Vec::new();
        for (name, value) in row.iter() {
            if *name == info.primary_key || !info.has_column(name.as_str()) {
                continue;
            }
            values.push(value.clone());
            assignments.push(format!("\"{name}\" = ?{}", values.len()));
        }
        if assignments.is_empty() {
            return Ok(());
        }
        values.push(id.to_value());
        let sql = format!(
            "UPDATE \"{}\" SET {} WHERE \"{}\" = ?{}",
            self.table,
            assignments.join(", "),
            info.primary_key,
            values.len()
        );
        conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(())
    }
}

impl Repository for SqliteRepository {
    type Record = DynamicRecord;

    fn schema_fields(&self) -> Result<FieldSet, StorageError> {
        let conn = self.conn.lock().map_err(|_| lock_err("sqlite.schema_fields"))?;
        let info = table_info(&conn, &self.table)?;
        Ok(info.columns.into_iter().map(|c| c.name).collect())
    }

    fn primary_key(&self) -> Result<FieldName, StorageError> {
        let conn = self.conn.lock().map_err(|_| lock_err("sqlite.primary_key"))?;
        Ok(table_info(&conn, &self.table)?.primary_key)
    }

    fn new_record(&self) -> Result<DynamicRecord, StorageError> {
        let conn = self.conn.lock().map_err(|_| lock_err("sqlite.new_record"))?;
        Ok(table_info(&conn, &self.table)?.empty_record())
    }

    fn list_all(&self) -> Result<Vec<DynamicRecord>, StorageError> {
        let conn = self.conn.lock().map_err(|_| lock_err("sqlite.list_all"))?;
        let info = table_info(&conn, &self.table)?;
        let sql = format!(
            "SELECT {} FROM \"{}\" ORDER BY \"{}\"",
            info.select_list(),
            self.table,
            info.primary_key
        );
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map([], |row| read_row(row, &info))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn find_by_id(&self, id: &RecordId) -> Result<Option<DynamicRecord>, StorageError> {
        let conn = self.conn.lock().map_err(|_| lock_err("sqlite.find_by_id"))?;
        let info = table_info(&conn, &self.table)?;
        fetch(&conn, &self.table, &info, id)
    }

    fn save(&self, record: DynamicRecord) -> Result<DynamicRecord, StorageError> {
        let conn = self.conn.lock().map_err(|_| lock_err("sqlite.save"))?;
        let info = table_info(&conn, &self.table)?;
        let now = Value::Timestamp(Utc::now());
        let mut row = record;

        let existing = match row.id() {
            Some(id) => fetch(&conn, &self.table, &info, &id)?.map(|_| id),
            None => None,
        };

        if info.has_column(crate::field::UPDATED_AT) {
            row.set(&FieldName::updated_at(), now.clone());
        }

        let id = if let Some(id) = existing {
            self.update(&conn, &info, &id, &row)?;
            id
        } else {
            if row.id().is_none() && !info.integer_key {
                let id = RecordId::Text(Uuid::new_v4().to_string());
                row.set(&info.primary_key, id.to_value());
            }
            if info.has_column(crate::field::CREATED_AT) {
                row.set(&FieldName::created_at(), now);
            }
            self.insert(&conn, &info, &row)?
        };

        debug!(table = %self.table, %id, "saved record");
        fetch(&conn, &self.table, &info, &id)?.ok_or_else(|| {
            StorageError::Backend(format!("record {id} vanished after save"))
        })
    }

    fn delete(&self, record: &DynamicRecord) -> Result<(), StorageError> {
        let id = record
            .id()
            .ok_or_else(|| StorageError::Backend("cannot delete a record without an id".into()))?;
        let conn = self.conn.lock().map_err(|_| lock_err("sqlite.delete"))?;
        let info = table_info(&conn, &self.table)?;
        let sql = format!(
            "DELETE FROM \"{}\" WHERE \"{}\" = ?1",
            self.table, info.primary_key
        );
        if conn.execute(&sql, [id.to_value()])? == 0 {
            return Err(StorageError::NotFound(id));
        }
        debug!(table = %self.table, %id, "deleted record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> SqliteRepository {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            create table users (
                id integer primary key,
                email text,
                role text not null default 'member',
                created_at text,
                updated_at text
            );
            ",
        )
        .unwrap();
        SqliteRepository::new(conn, "users").unwrap()
    }

    fn name(s: &str) -> FieldName {
        FieldName::new(s).unwrap()
    }

    #[test]
    fn schema_fields_follow_column_order() {
        let fields: Vec<String> = repo()
            .schema_fields()
            .unwrap()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(fields, vec!["id", "email", "role", "created_at", "updated_at"]);
    }

    #[test]
    fn insert_applies_sql_defaults_and_stamps() {
        let repo = repo();
        let record = repo.new_record().unwrap().with(name("email"), "a@b.com");
        let saved = repo.save(record).unwrap();

        assert_eq!(saved.id(), Some(RecordId::Int(1)));
        assert_eq!(saved.get("role"), Some(Value::from("member")));
        assert_eq!(saved.get("email"), Some(Value::from("a@b.com")));
        assert!(saved.get("created_at").unwrap().is_string());
        assert!(saved.get("updated_at").unwrap().is_string());
    }

    #[test]
    fn update_rewrites_columns() {
        let repo = repo();
        let mut saved = repo
            .save(repo.new_record().unwrap().with(name("email"), "old@x.y"))
            .unwrap();
        saved.set(&name("email"), Value::from("new@x.y"));
        let updated = repo.save(saved.clone()).unwrap();

        assert_eq!(updated.id(), saved.id());
        assert_eq!(updated.get("email"), Some(Value::from("new@x.y")));
        assert_eq!(updated.get("created_at"), saved.get("created_at"));
        assert_eq!(repo.list_all().unwrap().len(), 1);
    }

    #[test]
    fn find_and_delete() {
        let repo = repo();
        let saved = repo.save(repo.new_record().unwrap()).unwrap();
        let id = saved.id().unwrap();

        assert!(repo.find_by_id(&id).unwrap().is_some());
        repo.delete(&saved).unwrap();
        assert!(repo.find_by_id(&id).unwrap().is_none());
        assert!(matches!(repo.delete(&saved), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn text_primary_key_gets_uuid() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("create table tokens (token text primary key, label text);")
            .unwrap();
        let repo = SqliteRepository::new(conn, "tokens").unwrap();
        let saved = repo.save(repo.new_record().unwrap()).unwrap();
        let Some(RecordId::Text(token)) = saved.id() else {
            panic!("expected text id");
        };
        assert!(Uuid::parse_str(&token).is_ok());
    }

    #[test]
    fn rejects_missing_table_and_bad_names() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            SqliteRepository::new(conn, "nope"),
            Err(StorageError::Schema(_))
        ));

        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            SqliteRepository::new(conn, "users; drop table x"),
            Err(StorageError::Schema(_))
        ));

        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("create table odd (id integer primary key, \"first name\" text);")
            .unwrap();
        assert!(matches!(
            SqliteRepository::new(conn, "odd"),
            Err(StorageError::Schema(_))
        ));
    }

    #[test]
    fn primary_key_is_read_from_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("create table tokens (token text primary key, label text);")
            .unwrap();
        let repo = SqliteRepository::new(conn, "tokens").unwrap();
        assert_eq!(repo.primary_key().unwrap().as_str(), "token");
        assert_eq!(self::repo().primary_key().unwrap().as_str(), "id");
    }

    #[test]
    fn rejects_tables_without_single_primary_key() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("create table log (line text);").unwrap();
        assert!(matches!(
            SqliteRepository::new(conn, "log"),
            Err(StorageError::Schema(_))
        ));
    }

    #[test]
    fn value_sql_round_trip_types() {
        let conn = Connection::open_in_memory().unwrap();
        let got: Value = conn
            .query_row("SELECT ?1", [Value::Bool(true)], |r| r.get(0))
            .unwrap();
        assert_eq!(got, Value::Int(1));
        let got: Value = conn
            .query_row("SELECT ?1", [Value::Float(2.5)], |r| r.get(0))
            .unwrap();
        assert_eq!(got, Value::Float(2.5));
        let got: Value = conn.query_row("SELECT NULL", [], |r| r.get(0)).unwrap();
        assert_eq!(got, Value::Null);
    }
}
