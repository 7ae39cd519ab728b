use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};

use crate::catalog;
use crate::error::{Error, RecordError, SchemaError, StorageError};
use crate::storage::SyncMode;
use crate::storage::file;
use crate::storage::lock::DirLock;
use crate::types::{Column, ID_FIELD, Record, TableData};

use super::filter::{self, FilterMode, Predicate};
use super::id::IdGenerator;

/// Options for opening a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DbOptions {
    /// How [`JsonDb::list_records_filtered`] and [`JsonDb::list_records`]
    /// treat malformed filters.
    pub filter_mode: FilterMode,
    pub sync_mode: SyncMode,
}

struct DatabaseInner {
    root: PathBuf,
    options: DbOptions,
    /// One mutex per table name, held across every read-modify-write of that
    /// table's file. An entry lives only while some caller holds a clone of it.
    table_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    ids: IdGenerator,
    _dir_lock: DirLock,
}

/// The table store handle.
///
/// Every table lives in `<root>/<name>.json`. `JsonDb` is cheaply clonable
/// (`Arc`-based) and `Send + Sync`; clones share the per-table locks, so
/// concurrent writers never lose each other's updates.
#[derive(Clone)]
pub struct JsonDb {
    inner: Arc<DatabaseInner>,
}

impl JsonDb {
    /// Open (creating if needed) the store rooted at `root` with default options.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, Error> {
        Self::open_with(root, DbOptions::default())
    }

    /// Open (creating if needed) the store rooted at `root`.
    ///
    /// Fails with [`StorageError::DirectoryLocked`] if another handle already
    /// owns the directory.
    pub fn open_with(root: impl AsRef<Path>, options: DbOptions) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(StorageError::from)?;
        let dir_lock = DirLock::try_acquire(&root)?;

        info!(root = %root.display(), ?options, "store opened");

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                root,
                options,
                table_locks: Mutex::new(HashMap::new()),
                ids: IdGenerator::new(),
                _dir_lock: dir_lock,
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn options(&self) -> DbOptions {
        self.inner.options
    }

    // -----------------------------------------------------------------------
    // Tables
    // -----------------------------------------------------------------------

    /// Create a table from a column spec such as `"name:string,age:number"`.
    ///
    /// An existing table is never overwritten: the call fails with
    /// `TableAlreadyExists` and leaves the file untouched.
    pub fn create_table(&self, name: &str, column_spec: &str) -> Result<(), Error> {
        self.create_with(name, || catalog::parse_column_spec(column_spec))
    }

    /// Create a table from an already-structured column list.
    pub fn create_table_with_columns(&self, name: &str, columns: Vec<Column>) -> Result<(), Error> {
        self.create_with(name, move || {
            catalog::validate_columns(&columns)?;
            Ok(columns)
        })
    }

    fn create_with(
        &self,
        name: &str,
        columns: impl FnOnce() -> Result<Vec<Column>, Error>,
    ) -> Result<(), Error> {
        catalog::validate_table_name(name)?;
        let path = self.table_path(name);

        let created = self.with_table_lock(name, || -> Result<usize, Error> {
            if path.exists() {
                return Err(SchemaError::TableAlreadyExists(name.to_string()).into());
            }
            let table = TableData::new(columns()?);
            if !file::create_table_file(&path, &table, self.inner.options.sync_mode)? {
                return Err(SchemaError::TableAlreadyExists(name.to_string()).into());
            }
            Ok(table.columns.len())
        })?;

        info!(table = name, columns = created, "table created");
        Ok(())
    }

    /// Delete a table and its file.
    pub fn drop_table(&self, name: &str) -> Result<(), Error> {
        let path = self.locate(name)?;

        self.with_table_lock(name, || {
            match file::remove_table_file(&path, self.inner.options.sync_mode) {
                Ok(()) => Ok(()),
                Err(StorageError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                    Err(Error::from(SchemaError::TableNotFound(name.to_string())))
                }
                Err(e) => Err(Error::from(e)),
            }
        })?;

        info!(table = name, "table dropped");
        Ok(())
    }

    /// List all table names, sorted.
    pub fn list_tables(&self) -> Result<Vec<String>, Error> {
        catalog::ops::list_tables(&self.inner.root)
    }

    pub fn table_exists(&self, name: &str) -> bool {
        self.locate(name).is_ok_and(|p| p.is_file())
    }

    /// A table's columns, or `None` if the table does not exist.
    pub fn get_columns(&self, name: &str) -> Result<Option<Vec<Column>>, Error> {
        match self.read(name, |t| t.columns) {
            Ok(columns) => Ok(Some(columns)),
            Err(Error::Schema(SchemaError::TableNotFound(_))) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// A table's columns together with all of its records.
    pub fn describe_table(&self, name: &str) -> Result<TableData, Error> {
        self.read(name, |t| t)
    }

    // -----------------------------------------------------------------------
    // Records
    // -----------------------------------------------------------------------

    /// Append a record and return its newly assigned id.
    ///
    /// Any `id` present in `fields` is replaced by the generated one.
    pub fn insert_record(&self, table: &str, fields: Value) -> Result<String, Error> {
        let Value::Object(mut record) = fields else {
            return Err(RecordError::NotAnObject.into());
        };
        let ids = &self.inner.ids;

        let id = self.modify(table, move |t| {
            let id = ids.next_unused(|candidate| t.contains_id(candidate));
            record.insert(ID_FIELD.to_string(), Value::String(id.clone()));
            t.data.push(record);
            Ok(id)
        })?;

        info!(table, id = %id, "record inserted");
        Ok(id)
    }

    /// Merge `patch` over the record with `id`, keeping its position.
    ///
    /// Fields absent from `patch` are preserved and `id` never changes.
    pub fn update_record(&self, table: &str, id: &str, patch: Value) -> Result<(), Error> {
        let Value::Object(patch) = patch else {
            return Err(RecordError::NotAnObject.into());
        };

        self.modify(table, |t| {
            let pos = t.position_of(id).ok_or_else(|| record_not_found(table, id))?;
            let record = &mut t.data[pos];
            for (field, value) in patch {
                if field != ID_FIELD {
                    record.insert(field, value);
                }
            }
            record.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
            Ok(())
        })?;

        info!(table, id, "record updated");
        Ok(())
    }

    /// Remove the record with `id`.
    pub fn delete_record(&self, table: &str, id: &str) -> Result<(), Error> {
        self.modify(table, |t| {
            let pos = t.position_of(id).ok_or_else(|| record_not_found(table, id))?;
            t.data.remove(pos);
            Ok(())
        })?;

        info!(table, id, "record deleted");
        Ok(())
    }

    /// One record by id; `None` if the table exists but has no such record.
    pub fn get_record(&self, table: &str, id: &str) -> Result<Option<Record>, Error> {
        self.read(table, |mut t| t.position_of(id).map(|pos| t.data.swap_remove(pos)))
    }

    /// Every record of a table, in insertion order.
    pub fn list_all(&self, table: &str) -> Result<Vec<Record>, Error> {
        self.read(table, |t| t.data)
    }

    /// Records matching every predicate, in insertion order.
    ///
    /// Under [`FilterMode::Strict`] an unknown operator is an error instead
    /// of matching everything. A missing table is reported before any filter
    /// error.
    pub fn list_records(&self, table: &str, predicates: &[Predicate]) -> Result<Vec<Record>, Error> {
        let records = self.list_all(table)?;
        filter::check_predicates(predicates, self.inner.options.filter_mode)?;
        Ok(self.matching(table, records, predicates))
    }

    /// Records matching a filter string such as `"age>25,name:contains:al"`.
    pub fn list_records_filtered(&self, table: &str, filter: &str) -> Result<Vec<Record>, Error> {
        let records = self.list_all(table)?;
        let predicates = filter::parse_filter(filter, self.inner.options.filter_mode)?;
        filter::check_predicates(&predicates, self.inner.options.filter_mode)?;
        Ok(self.matching(table, records, &predicates))
    }

    fn matching(&self, table: &str, records: Vec<Record>, predicates: &[Predicate]) -> Vec<Record> {
        let matched = filter::filter_records(records, predicates);
        debug!(table, predicates = predicates.len(), matched = matched.len(), "records listed");
        matched
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn table_path(&self, name: &str) -> PathBuf {
        catalog::ops::table_path(&self.inner.root, name)
    }

    /// Path of an existing table. Names that could never have been created
    /// report `TableNotFound`.
    fn locate(&self, name: &str) -> Result<PathBuf, Error> {
        catalog::validate_table_name(name)
            .map_err(|_| SchemaError::TableNotFound(name.to_string()))?;
        Ok(self.table_path(name))
    }

    /// Run `f` while holding the table's mutex, then drop the map entry if
    /// no other caller is using it.
    fn with_table_lock<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let lock = {
            let mut locks = self.inner.table_locks.lock();
            Arc::clone(locks.entry(name.to_string()).or_default())
        };
        let out = {
            let _guard = lock.lock();
            f()
        };

        // Clones are only handed out under the map mutex, so a count of two
        // (the map's and ours) cannot grow while we hold it.
        let mut locks = self.inner.table_locks.lock();
        if Arc::strong_count(&lock) == 2 {
            locks.remove(name);
        }
        out
    }

    /// Load a table. The caller holds the table lock.
    fn load(&self, name: &str, path: &Path) -> Result<TableData, Error> {
        match file::read_table(path) {
            Ok(table) => Ok(table),
            Err(StorageError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                Err(SchemaError::TableNotFound(name.to_string()).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read<T>(&self, name: &str, f: impl FnOnce(TableData) -> T) -> Result<T, Error> {
        let path = self.locate(name)?;
        let table = self.with_table_lock(name, || self.load(name, &path))?;
        debug!(table = name, records = table.data.len(), "table read");
        Ok(f(table))
    }

    /// Read-modify-write one table under its lock. Nothing is written if `f`
    /// fails.
    fn modify<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut TableData) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let path = self.locate(name)?;
        self.with_table_lock(name, || {
            let mut table = self.load(name, &path)?;
            let out = f(&mut table)?;
            file::write_table(&path, &table, self.inner.options.sync_mode)?;
            Ok(out)
        })
    }
}

fn record_not_found(table: &str, id: &str) -> Error {
    RecordError::NotFound {
        table: table.to_string(),
        id: id.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use crate::types::ColumnType;
    use serde_json::json;
    use std::collections::HashSet;
    use std::thread;
    use tempfile::tempdir;

    fn create_test_db() -> (JsonDb, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = JsonDb::open_with(
            dir.path(),
            DbOptions {
                sync_mode: SyncMode::None,
                ..DbOptions::default()
            },
        )
        .unwrap();
        (db, dir)
    }

    fn create_users(db: &JsonDb) {
        db.create_table("users", "name:string,age:number").unwrap();
    }

    // ---- tables ----

    #[test]
    fn test_create_then_get_columns() {
        let (db, _dir) = create_test_db();
        db.create_table("t", "a:string,b:number").unwrap();
        assert_eq!(
            db.get_columns("t").unwrap().unwrap(),
            vec![Column::new("a", "string"), Column::new("b", "number")]
        );
    }

    #[test]
    fn test_create_twice_keeps_original() {
        let (db, _dir) = create_test_db();
        create_users(&db);
        db.insert_record("users", json!({"name": "Ali"})).unwrap();

        match db.create_table("users", "other:boolean") {
            Err(Error::Schema(SchemaError::TableAlreadyExists(name))) => assert_eq!(name, "users"),
            other => panic!("expected TableAlreadyExists, got {other:?}"),
        }

        let table = db.describe_table("users").unwrap();
        assert_eq!(table.columns[0].name, "name");
        assert_eq!(table.data.len(), 1);
    }

    #[test]
    fn test_create_existing_reports_exists_before_schema_error() {
        let (db, _dir) = create_test_db();
        create_users(&db);
        assert!(matches!(
            db.create_table("users", "broken"),
            Err(Error::Schema(SchemaError::TableAlreadyExists(_)))
        ));
    }

    #[test]
    fn test_create_invalid_schema_creates_nothing() {
        let (db, _dir) = create_test_db();
        assert!(matches!(
            db.create_table("bad", "name:string,age"),
            Err(Error::Schema(SchemaError::InvalidSchema(_)))
        ));
        assert!(!db.table_exists("bad"));
    }

    #[test]
    fn test_create_invalid_name() {
        let (db, _dir) = create_test_db();
        assert!(matches!(
            db.create_table("../escape", "a:string"),
            Err(Error::Schema(SchemaError::InvalidTableName(_)))
        ));
    }

    #[test]
    fn test_create_with_columns_accepts_unknown_types() {
        let (db, _dir) = create_test_db();
        db.create_table_with_columns("t", vec![Column::new("x", "geo")])
            .unwrap();
        let cols = db.get_columns("t").unwrap().unwrap();
        assert_eq!(cols[0].column_type, ColumnType::Other("geo".to_string()));
    }

    #[test]
    fn test_get_columns_missing_is_none() {
        let (db, _dir) = create_test_db();
        assert!(db.get_columns("missing").unwrap().is_none());
        assert!(db.get_columns("a/b").unwrap().is_none());
    }

    #[test]
    fn test_drop_table() {
        let (db, dir) = create_test_db();
        create_users(&db);
        db.drop_table("users").unwrap();

        assert!(!dir.path().join("users.json").exists());
        assert!(!db.table_exists("users"));
        assert!(matches!(
            db.list_all("users"),
            Err(Error::Schema(SchemaError::TableNotFound(_)))
        ));
    }

    #[test]
    fn test_drop_missing_table() {
        let (db, _dir) = create_test_db();
        match db.drop_table("ghost") {
            Err(Error::Schema(SchemaError::TableNotFound(name))) => assert_eq!(name, "ghost"),
            other => panic!("expected TableNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_recreate_after_drop_starts_empty() {
        let (db, _dir) = create_test_db();
        create_users(&db);
        db.insert_record("users", json!({"name": "Ali"})).unwrap();
        db.drop_table("users").unwrap();
        db.create_table("users", "email:string").unwrap();

        let table = db.describe_table("users").unwrap();
        assert_eq!(table.columns, vec![Column::new("email", "string")]);
        assert!(table.data.is_empty());
    }

    #[test]
    fn test_list_tables() {
        let (db, _dir) = create_test_db();
        assert!(db.list_tables().unwrap().is_empty());
        db.create_table("b", "x:string").unwrap();
        db.create_table("a", "x:string").unwrap();
        assert_eq!(db.list_tables().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_record_ops_on_missing_table() {
        let (db, _dir) = create_test_db();
        let not_found = |r: Result<(), Error>| {
            assert!(matches!(
                r,
                Err(Error::Schema(SchemaError::TableNotFound(_)))
            ))
        };
        not_found(db.insert_record("nope", json!({})).map(|_| ()));
        not_found(db.update_record("nope", "1", json!({})));
        not_found(db.delete_record("nope", "1"));
        not_found(db.list_all("nope").map(|_| ()));
        not_found(db.get_record("nope", "1").map(|_| ()));
        assert!(!db.table_exists("nope"));
    }

    // ---- records ----

    #[test]
    fn test_insert_assigns_distinct_ids_in_order() {
        let (db, _dir) = create_test_db();
        create_users(&db);

        let ids: Vec<String> = (0..50)
            .map(|i| db.insert_record("users", json!({"name": format!("u{i}"), "age": i})).unwrap())
            .collect();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 50);
        assert!(ids.iter().all(|id| !id.is_empty()));

        let records = db.list_all("users").unwrap();
        assert_eq!(records.len(), 50);
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r["name"], format!("u{i}"));
            assert_eq!(r["id"], ids[i].as_str());
        }
    }

    #[test]
    fn test_insert_overrides_caller_id() {
        let (db, _dir) = create_test_db();
        create_users(&db);
        let id = db
            .insert_record("users", json!({"id": "mine", "name": "Ali"}))
            .unwrap();
        assert_ne!(id, "mine");
        assert!(db.get_record("users", "mine").unwrap().is_none());
        assert_eq!(db.get_record("users", &id).unwrap().unwrap()["name"], "Ali");
    }

    #[test]
    fn test_insert_does_not_enforce_column_types() {
        let (db, _dir) = create_test_db();
        create_users(&db);
        let id = db
            .insert_record("users", json!({"age": "not a number", "extra": [1, 2]}))
            .unwrap();
        let r = db.get_record("users", &id).unwrap().unwrap();
        assert_eq!(r["age"], "not a number");
        assert_eq!(r["extra"], json!([1, 2]));
    }

    #[test]
    fn test_insert_non_object_rejected() {
        let (db, _dir) = create_test_db();
        create_users(&db);
        assert!(matches!(
            db.insert_record("users", json!([1, 2])),
            Err(Error::Record(RecordError::NotAnObject))
        ));
        assert!(db.list_all("users").unwrap().is_empty());
    }

    #[test]
    fn test_insert_skips_ids_already_on_disk() {
        let (db, dir) = create_test_db();
        create_users(&db);
        // Plant far-future ids the generator would otherwise produce next.
        let path = dir.path().join("users.json");
        let mut table = file::read_table(&path).unwrap();
        let start = IdGenerator::new().next_id();
        for offset in 0..5_000u64 {
            let mut r = Record::new();
            r.insert(ID_FIELD.to_string(), json!((start + offset).to_string()));
            table.data.push(r);
        }
        file::write_table(&path, &table, SyncMode::None).unwrap();

        let id = db.insert_record("users", json!({"name": "new"})).unwrap();
        assert!(id.parse::<u64>().unwrap() >= start + 5_000);
        let records = db.list_all("users").unwrap();
        assert_eq!(
            records
                .iter()
                .filter(|r| r["id"] == id.as_str())
                .count(),
            1
        );
    }

    #[test]
    fn test_update_merges_and_keeps_id() {
        let (db, _dir) = create_test_db();
        create_users(&db);
        let id = db
            .insert_record("users", json!({"name": "Yunus", "age": 30, "city": "Ankara"}))
            .unwrap();

        db.update_record("users", &id, json!({"age": 5, "id": "hijack"}))
            .unwrap();
        let after_once = db.get_record("users", &id).unwrap().unwrap();
        assert_eq!(after_once["age"], 5);
        assert_eq!(after_once["name"], "Yunus");
        assert_eq!(after_once["city"], "Ankara");
        assert_eq!(after_once["id"], id.as_str());
        assert!(db.get_record("users", "hijack").unwrap().is_none());

        db.update_record("users", &id, json!({"age": 5, "id": "hijack"}))
            .unwrap();
        assert_eq!(db.get_record("users", &id).unwrap().unwrap(), after_once);
    }

    #[test]
    fn test_update_keeps_position_and_field_order() {
        let (db, _dir) = create_test_db();
        create_users(&db);
        let a = db.insert_record("users", json!({"name": "a", "age": 1})).unwrap();
        let b = db.insert_record("users", json!({"name": "b", "age": 2})).unwrap();
        let c = db.insert_record("users", json!({"name": "c", "age": 3})).unwrap();

        db.update_record("users", &b, json!({"age": 20, "nick": "bee"}))
            .unwrap();

        let records = db.list_all("users").unwrap();
        let ids: Vec<_> = records.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec![a.as_str(), b.as_str(), c.as_str()]);
        let keys: Vec<_> = records[1].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "age", "id", "nick"]);
    }

    #[test]
    fn test_update_missing_record_leaves_file_untouched() {
        let (db, dir) = create_test_db();
        create_users(&db);
        db.insert_record("users", json!({"name": "a"})).unwrap();
        let before = fs::read(dir.path().join("users.json")).unwrap();

        match db.update_record("users", "404", json!({"name": "z"})) {
            Err(Error::Record(RecordError::NotFound { table, id })) => {
                assert_eq!(table, "users");
                assert_eq!(id, "404");
            }
            other => panic!("expected RecordNotFound, got {other:?}"),
        }
        assert_eq!(fs::read(dir.path().join("users.json")).unwrap(), before);
    }

    #[test]
    fn test_delete_record_once() {
        let (db, _dir) = create_test_db();
        create_users(&db);
        let a = db.insert_record("users", json!({"name": "a"})).unwrap();
        let b = db.insert_record("users", json!({"name": "b"})).unwrap();

        db.delete_record("users", &a).unwrap();
        let records = db.list_all("users").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["id"], b.as_str());

        assert!(matches!(
            db.delete_record("users", &a),
            Err(Error::Record(RecordError::NotFound { .. }))
        ));
        assert_eq!(db.list_all("users").unwrap().len(), 1);
    }

    // ---- listing with filters ----

    #[test]
    fn test_list_records_with_predicates() {
        let (db, _dir) = create_test_db();
        create_users(&db);
        db.insert_record("users", json!({"name": "Yunus", "age": 30}))
            .unwrap();
        db.insert_record("users", json!({"name": "Ali", "age": 25}))
            .unwrap();

        let out = db
            .list_records("users", &[Predicate::new("age", ">", "26")])
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["name"], "Yunus");

        let all = db.list_records("users", &[]).unwrap();
        assert_eq!(all, db.list_all("users").unwrap());
    }

    #[test]
    fn test_list_records_filtered_string() {
        let (db, _dir) = create_test_db();
        create_users(&db);
        db.insert_record("users", json!({"name": "Yunus", "age": 30}))
            .unwrap();
        db.insert_record("users", json!({"name": "Ali", "age": 25}))
            .unwrap();

        let out = db
            .list_records_filtered("users", "name:contains:ali,garbage")
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["name"], "Ali");
    }

    #[test]
    fn test_strict_mode_rejects_bad_filters() {
        let dir = tempdir().unwrap();
        let db = JsonDb::open_with(
            dir.path(),
            DbOptions {
                filter_mode: FilterMode::Strict,
                sync_mode: SyncMode::None,
            },
        )
        .unwrap();
        create_users(&db);

        assert!(matches!(
            db.list_records_filtered("users", "garbage"),
            Err(Error::Filter(FilterError::MalformedToken(_)))
        ));
        assert!(matches!(
            db.list_records("users", &[Predicate::new("age", "~", "1")]),
            Err(Error::Filter(FilterError::UnknownOperator(_)))
        ));
    }

    #[test]
    fn test_missing_table_reported_before_bad_filter() {
        let dir = tempdir().unwrap();
        let db = JsonDb::open_with(
            dir.path(),
            DbOptions {
                filter_mode: FilterMode::Strict,
                sync_mode: SyncMode::None,
            },
        )
        .unwrap();

        assert!(matches!(
            db.list_records_filtered("ghost", "garbage"),
            Err(Error::Schema(SchemaError::TableNotFound(_)))
        ));
        assert!(matches!(
            db.list_records("ghost", &[Predicate::new("age", "~", "1")]),
            Err(Error::Schema(SchemaError::TableNotFound(_)))
        ));
    }

    // ---- durability and concurrency ----

    #[test]
    fn test_table_locks_do_not_accumulate() {
        let (db, _dir) = create_test_db();

        for i in 0..10_000 {
            assert!(db.get_columns(&format!("ghost{i}")).unwrap().is_none());
            assert!(db.list_all(&format!("ghost{i}")).is_err());
        }
        assert_eq!(db.inner.table_locks.lock().len(), 0);

        for i in 0..100 {
            let name = format!("t{i}");
            db.create_table(&name, "a:string").unwrap();
            db.insert_record(&name, json!({"a": "x"})).unwrap();
            db.drop_table(&name).unwrap();
        }
        assert_eq!(db.inner.table_locks.lock().len(), 0);
        assert!(db.list_tables().unwrap().is_empty());
    }

    #[test]
    fn test_table_locks_released_after_concurrent_use() {
        let (db, _dir) = create_test_db();
        create_users(&db);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let db = db.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        db.insert_record("users", json!({"name": format!("{t}-{i}")}))
                            .unwrap();
                        db.get_columns(&format!("ghost{t}-{i}")).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(db.list_all("users").unwrap().len(), 100);
        assert_eq!(db.inner.table_locks.lock().len(), 0);
    }

    #[test]
    fn test_reopen_sees_persisted_state() {
        let dir = tempdir().unwrap();
        let id = {
            let db = JsonDb::open(dir.path()).unwrap();
            create_users(&db);
            db.insert_record("users", json!({"name": "Ali", "age": 25}))
                .unwrap()
        };

        let db = JsonDb::open(dir.path()).unwrap();
        assert_eq!(db.list_tables().unwrap(), vec!["users"]);
        let r = db.get_record("users", &id).unwrap().unwrap();
        assert_eq!(r["name"], "Ali");
    }

    #[test]
    fn test_second_open_of_same_directory_fails() {
        let (_db, dir) = create_test_db();
        assert!(matches!(
            JsonDb::open(dir.path()),
            Err(Error::Storage(StorageError::DirectoryLocked(_)))
        ));
    }

    #[test]
    fn test_concurrent_inserts_lose_nothing() {
        let (db, _dir) = create_test_db();
        create_users(&db);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let db = db.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        db.insert_record("users", json!({"name": format!("{t}-{i}")}))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let records = db.list_all("users").unwrap();
        assert_eq!(records.len(), 200);
        let ids: HashSet<_> = records.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn test_concurrent_updates_lose_nothing() {
        let (db, _dir) = create_test_db();
        create_users(&db);
        let id = db.insert_record("users", json!({"name": "shared"})).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let db = db.clone();
                let id = id.clone();
                thread::spawn(move || {
                    let mut patch = Record::new();
                    patch.insert(format!("f{t}"), json!(t));
                    db.update_record("users", &id, Value::Object(patch))
                        .unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let r = db.get_record("users", &id).unwrap().unwrap();
        for t in 0..8 {
            assert_eq!(r[&format!("f{t}")], t);
        }
    }
}
