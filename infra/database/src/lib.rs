//! SQL convenience layer over SQLite and MySQL.
//!
//! One [`Database`] handle wraps a single connection: SQLite through
//! `rusqlite` (always available) or MySQL through the `mysql` crate (behind
//! the `mysql` feature). Handles are cheap to clone and share the
//! connection. Statements use `?` placeholders on both engines; `%s`/`%d`
//! style binds are translated outside string literals. Results come back as
//! ordered [`Row`]s, with camelCase aliases for `snake_case` columns unless
//! aliasing is turned off on the handle.
//!
//! ```
//! use shed_database::{Database, DatabaseError, sql_params};
//!
//! fn main() -> Result<(), DatabaseError> {
//!     let db = Database::open_in_memory()?;
//!     db.execute("create table users (id integer primary key, user_name text)", &[], true)?;
//!     db.insert("insert into users (user_name) values (?)", &sql_params!["alice"], true)?;
//!
//!     let rows = db.select("select user_name from users", &[])?;
//!     assert_eq!(rows[0].get_string("userName").as_deref(), Some("alice"));
//!     Ok(())
//! }
//! ```

mod backend;
mod error;
mod row;
mod value;

#[cfg(feature = "mysql")]
pub use crate::backend::MysqlOptions;
pub use crate::{
    backend::Backend,
    error::{DatabaseError, DatabaseErrorExt},
    row::{Row, str_to_hump},
    value::{SqlValue, in_sql},
};

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::{backend::Connection, value::quote_text};

/// Row cap appended to `select` statements that carry no `LIMIT` clause.
pub const DEFAULT_SELECT_LIMIT: usize = 1000;

/// Inner state of the [`Database`] handle.
#[derive(Debug)]
pub struct DatabaseInner {
    connection: Mutex<Option<Connection>>,
    backend: Backend,
    limit: usize,
    hump: bool,
    debug: AtomicBool,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        if let Some(mut connection) = self.connection.get_mut().take() {
            // pending statements are committed like an explicit close
            let _ = connection.commit();
            debug!(backend = ?self.backend, "Database handle dropped");
        }
    }
}

/// Cloneable SQL handle; all clones share one underlying connection.
#[derive(Debug, Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Creates a new [`DatabaseBuilder`].
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Opens (or creates) a SQLite database file, parents included.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DatabaseError> {
        Self::builder().sqlite(path).init()
    }

    /// Opens a private in-memory SQLite database.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::builder().in_memory().init()
    }

    /// Connects to a MySQL server.
    #[cfg(feature = "mysql")]
    pub fn connect_mysql(options: MysqlOptions) -> Result<Self, DatabaseError> {
        Self::builder().mysql(options).init()
    }
}

/// A fluent builder for configuring and opening a [`Database`].
#[must_use = "builders do nothing unless you call .init()"]
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    target: Option<Target>,
    limit: Option<usize>,
    hump: Option<bool>,
    debug: bool,
}

#[derive(Debug)]
enum Target {
    Path(PathBuf),
    Memory,
    #[cfg(feature = "mysql")]
    Mysql(MysqlOptions),
}

impl DatabaseBuilder {
    /// Creates a new [`DatabaseBuilder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets a SQLite database file.
    pub fn sqlite(mut self, path: impl Into<PathBuf>) -> Self {
        self.target = Some(Target::Path(path.into()));
        self
    }

    /// Targets a private in-memory SQLite database.
    pub fn in_memory(mut self) -> Self {
        self.target = Some(Target::Memory);
        self
    }

    /// Targets a MySQL server.
    #[cfg(feature = "mysql")]
    pub fn mysql(mut self, options: MysqlOptions) -> Self {
        self.target = Some(Target::Mysql(options));
        self
    }

    /// Default row cap for `select`; `0` disables the injection.
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether rows grow camelCase aliases (default `true`).
    pub const fn hump(mut self, hump: bool) -> Self {
        self.hump = Some(hump);
        self
    }

    /// Whether statements are logged with timings (default `false`).
    pub const fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Opens the connection and verifies it with `select 1`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Validation`] when no target was set, or the
    /// engine error when the connection cannot be established.
    pub fn init(self) -> Result<Database, DatabaseError> {
        let target = self.target.ok_or(DatabaseError::Validation {
            message: "A connection target is required".into(),
            context: None,
        })?;
        let connection = match target {
            Target::Path(path) => Connection::open_sqlite(&path)?,
            Target::Memory => Connection::open_sqlite_memory()?,
            #[cfg(feature = "mysql")]
            Target::Mysql(options) => Connection::connect_mysql(&options)?,
        };
        let backend = connection.backend();
        let database = Database {
            inner: Arc::new(DatabaseInner {
                connection: Mutex::new(Some(connection)),
                backend,
                limit: self.limit.unwrap_or(DEFAULT_SELECT_LIMIT),
                hump: self.hump.unwrap_or(true),
                debug: AtomicBool::new(self.debug),
            }),
        };
        database.select_unlimited("select 1", &[]).context("Connection check")?;
        info!(backend = ?backend, "Database connection established");
        Ok(database)
    }
}

impl Database {
    /// Queries rows, appending the handle's default `LIMIT` when the
    /// statement has none.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Closed`] once the handle was closed, or the
    /// engine error for invalid SQL.
    pub fn select(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>, DatabaseError> {
        self.select_limited(sql, params, self.inner.limit)
    }

    /// Queries rows with an explicit cap; `0` means no cap. A `LIMIT`
    /// already present in the statement wins.
    pub fn select_limited(
        &self,
        sql: &str,
        params: &[SqlValue],
        limit: usize,
    ) -> Result<Vec<Row>, DatabaseError> {
        if limit == 0 {
            return self.select_unlimited(sql, params);
        }
        let sql = normalize_placeholders(sql);
        if has_limit_clause(&sql) {
            return self.fetch(&sql, params, None, self.inner.hump);
        }
        let sql = inject_limit(&sql, limit);
        self.fetch(&sql, params, Some(limit), self.inner.hump)
    }

    /// Queries rows without any limit injection.
    pub fn select_unlimited(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<Row>, DatabaseError> {
        let sql = normalize_placeholders(sql);
        self.fetch(&sql, params, None, self.inner.hump)
    }

    /// Queries the first row, injecting `LIMIT 1` when the statement has no
    /// limit of its own.
    pub fn select_one(&self, sql: &str, params: &[SqlValue]) -> Result<Option<Row>, DatabaseError> {
        self.fetch_first(sql, params, self.inner.hump)
    }

    /// Convenience `SELECT {columns} FROM {table} {where}` with `AND`-joined
    /// equality conditions. Text values are quoted, `Null` renders as
    /// `IS NULL`.
    pub fn select_table(
        &self,
        table: &str,
        columns: &str,
        where_sql: &str,
        conditions: &[(&str, SqlValue)],
    ) -> Result<Vec<Row>, DatabaseError> {
        let mut clause = where_sql.trim().to_owned();
        if clause.is_empty() {
            clause = "1 = 1".to_owned();
        }
        if !clause.to_lowercase().contains("where ") {
            clause = format!("where {clause}");
        }
        let mut sql = format!("select {columns} from {table} {clause}");
        for (column, value) in conditions {
            sql.push_str(&render_condition(column, value)?);
        }
        self.select(&sql, &[])
    }

    /// Streams every result row into `f` without collecting.
    pub fn for_each_row(
        &self,
        sql: &str,
        params: &[SqlValue],
        mut f: impl FnMut(Row),
    ) -> Result<(), DatabaseError> {
        let sql = normalize_placeholders(sql);
        let started = Instant::now();
        let hump = self.inner.hump;
        let result = self.with_connection(|connection| {
            connection.query(&sql, params, |mut row| {
                if hump {
                    row.apply_hump();
                }
                f(row);
                true
            })
        });
        self.log_sql(&sql, params, started);
        result
    }

    /// Runs a DML statement and returns the affected row count. With
    /// `commit` unset the work stays pending until [`commit`](Self::commit)
    /// or [`rollback`](Self::rollback).
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Closed`] once the handle was closed, or the
    /// engine error when the statement fails.
    pub fn execute(
        &self,
        sql: &str,
        params: &[SqlValue],
        commit: bool,
    ) -> Result<usize, DatabaseError> {
        let sql = normalize_placeholders(sql);
        let started = Instant::now();
        let result = self.with_connection(|connection| {
            if !commit {
                connection.begin_if_needed()?;
            }
            let affected = connection.execute(&sql, params)?;
            if commit {
                connection.commit()?;
            }
            Ok(affected)
        });
        self.log_sql(&sql, params, started);
        result
    }

    /// [`execute`](Self::execute) under its update name.
    pub fn update(
        &self,
        sql: &str,
        params: &[SqlValue],
        commit: bool,
    ) -> Result<usize, DatabaseError> {
        self.execute(sql, params, commit)
    }

    /// [`execute`](Self::execute) under its delete name.
    pub fn delete(
        &self,
        sql: &str,
        params: &[SqlValue],
        commit: bool,
    ) -> Result<usize, DatabaseError> {
        self.execute(sql, params, commit)
    }

    /// [`execute`](Self::execute) for `REPLACE` statements.
    pub fn replace(
        &self,
        sql: &str,
        params: &[SqlValue],
        commit: bool,
    ) -> Result<usize, DatabaseError> {
        self.execute(sql, params, commit)
    }

    /// Inserts a row and returns the last insert id.
    pub fn insert(
        &self,
        sql: &str,
        params: &[SqlValue],
        commit: bool,
    ) -> Result<i64, DatabaseError> {
        let sql = normalize_placeholders(sql);
        let started = Instant::now();
        let result = self.with_connection(|connection| {
            if !commit {
                connection.begin_if_needed()?;
            }
            connection.execute(&sql, params)?;
            let id = connection.last_insert_id();
            if commit {
                connection.commit()?;
            }
            Ok(id)
        });
        self.log_sql(&sql, params, started);
        result
    }

    /// Runs one prepared statement once per parameter row, inside a single
    /// transaction. Returns the total affected row count.
    pub fn insert_batch(
        &self,
        sql: &str,
        rows: &[Vec<SqlValue>],
        commit: bool,
    ) -> Result<usize, DatabaseError> {
        let sql = normalize_placeholders(sql);
        let started = Instant::now();
        let result = self.with_connection(|connection| {
            connection.begin_if_needed()?;
            let affected = connection.execute_batch_rows(&sql, rows)?;
            if commit {
                connection.commit()?;
            }
            Ok(affected)
        });
        self.log_batch(&sql, rows.len(), started);
        result
    }

    /// [`insert_batch`](Self::insert_batch) for `REPLACE` statements.
    pub fn replace_batch(
        &self,
        sql: &str,
        rows: &[Vec<SqlValue>],
        commit: bool,
    ) -> Result<usize, DatabaseError> {
        self.insert_batch(sql, rows, commit)
    }

    /// Empties a table: `TRUNCATE` on MySQL, `DELETE FROM` on SQLite.
    pub fn clear(&self, table: &str, commit: bool) -> Result<usize, DatabaseError> {
        let sql = match self.backend() {
            Backend::Sqlite => format!("DELETE FROM {table}"),
            #[cfg(feature = "mysql")]
            Backend::Mysql => format!("TRUNCATE TABLE {table}"),
        };
        self.execute(&sql, &[], commit)
    }

    /// Drops a table if it exists.
    pub fn drop_table(&self, table: &str, commit: bool) -> Result<usize, DatabaseError> {
        self.execute(&format!("DROP TABLE IF EXISTS {table}"), &[], commit)
    }

    /// Row count of a table.
    pub fn count(&self, table: &str) -> Result<u64, DatabaseError> {
        self.count_where(table, "")
    }

    /// Row count of a table under an extra condition; a bare condition is
    /// prefixed with `WHERE`.
    pub fn count_where(&self, table: &str, where_sql: &str) -> Result<u64, DatabaseError> {
        let mut sql = format!("SELECT COUNT(1) AS cnt FROM {table}");
        let clause = where_sql.trim();
        if !clause.is_empty() {
            if clause.to_lowercase().contains("where ") {
                sql.push(' ');
                sql.push_str(clause);
            } else {
                sql.push_str(" WHERE ");
                sql.push_str(clause);
            }
        }
        let count = self.get_int(&sql, &[])?.unwrap_or(0);
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// First column of the first row.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Validation`] when the result carries several
    /// columns; use [`get_column_value`](Self::get_column_value) then.
    pub fn get_value(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<SqlValue>, DatabaseError> {
        let Some(row) = self.fetch_first(sql, params, false)? else {
            return Ok(None);
        };
        if row.len() > 1 {
            let names: Vec<&str> = row.names().collect();
            return Err(DatabaseError::Validation {
                message: format!("multiple columns in the result, name the wanted one: {names:?}")
                    .into(),
                context: None,
            });
        }
        Ok(row.into_iter().next().map(|(_, value)| value))
    }

    /// Named column of the first row.
    pub fn get_column_value(
        &self,
        sql: &str,
        params: &[SqlValue],
        column: &str,
    ) -> Result<Option<SqlValue>, DatabaseError> {
        Ok(self.select_one(sql, params)?.and_then(|row| row.get(column).cloned()))
    }

    /// Scalar integer query.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Validation`] when the value cannot be read
    /// as an integer.
    pub fn get_int(&self, sql: &str, params: &[SqlValue]) -> Result<Option<i64>, DatabaseError> {
        convert(self.get_value(sql, params)?, SqlValue::as_int, "integer")
    }

    /// Scalar float query.
    pub fn get_float(&self, sql: &str, params: &[SqlValue]) -> Result<Option<f64>, DatabaseError> {
        convert(self.get_value(sql, params)?, SqlValue::as_float, "float")
    }

    /// Scalar bool query; accepts `0`/`1` and `true`/`false` text.
    pub fn get_bool(&self, sql: &str, params: &[SqlValue]) -> Result<Option<bool>, DatabaseError> {
        convert(self.get_value(sql, params)?, SqlValue::as_bool, "bool")
    }

    /// Scalar string query.
    pub fn get_string(
        &self,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Option<String>, DatabaseError> {
        convert(self.get_value(sql, params)?, SqlValue::as_text, "string")
    }

    /// The engine this handle is connected to.
    #[must_use]
    pub fn backend(&self) -> Backend {
        self.inner.backend
    }

    /// Whether [`close`](Self::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.connection.lock().is_none()
    }

    /// Turns statement timing logs on.
    pub fn enable_debug(&self) {
        self.inner.debug.store(true, Ordering::Relaxed);
    }

    /// Turns statement timing logs off.
    pub fn disable_debug(&self) {
        self.inner.debug.store(false, Ordering::Relaxed);
    }

    /// Commits pending work. A no-op when nothing is pending or the handle
    /// is closed.
    pub fn commit(&self) -> Result<(), DatabaseError> {
        self.inner.connection.lock().as_mut().map_or(Ok(()), Connection::commit)
    }

    /// Rolls pending work back. A no-op when closed.
    pub fn rollback(&self) -> Result<(), DatabaseError> {
        self.inner.connection.lock().as_mut().map_or(Ok(()), Connection::rollback)
    }

    /// Commits and closes the connection. Every later operation fails with
    /// [`DatabaseError::Closed`].
    pub fn close(&self) -> Result<(), DatabaseError> {
        let mut guard = self.inner.connection.lock();
        if let Some(mut connection) = guard.take() {
            connection.commit()?;
            drop(connection);
            debug!("Database connection closed");
        }
        Ok(())
    }

    /// Direct access to the underlying SQLite connection for anything this
    /// surface lacks.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Validation`] on a MySQL handle and
    /// [`DatabaseError::Closed`] once the handle was closed.
    pub fn with_sqlite<T>(
        &self,
        f: impl FnOnce(&mut rusqlite::Connection) -> T,
    ) -> Result<T, DatabaseError> {
        self.with_connection(|connection| {
            connection.as_sqlite_mut().map(f).ok_or_else(|| DatabaseError::Validation {
                message: "not a SQLite connection".into(),
                context: None,
            })
        })
    }

    /// Direct access to the underlying MySQL connection.
    #[cfg(feature = "mysql")]
    pub fn with_mysql<T>(
        &self,
        f: impl FnOnce(&mut mysql::Conn) -> T,
    ) -> Result<T, DatabaseError> {
        self.with_connection(|connection| {
            connection.as_mysql_mut().map(f).ok_or_else(|| DatabaseError::Validation {
                message: "not a MySQL connection".into(),
                context: None,
            })
        })
    }

    /// Runs a multi-statement SQL script. SQLite only.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::Validation`] on a MySQL handle.
    pub fn execute_script(&self, script: &str, commit: bool) -> Result<(), DatabaseError> {
        let started = Instant::now();
        let result = self.with_connection(|connection| {
            connection.execute_script(script)?;
            if commit {
                connection.commit()?;
            }
            Ok(())
        });
        self.log_sql(script, &[], started);
        result
    }

    /// Runs a SQL script from a file; empty files are ignored.
    pub fn execute_script_file(
        &self,
        path: impl AsRef<Path>,
        commit: bool,
    ) -> Result<(), DatabaseError> {
        let path = path.as_ref();
        let script =
            std::fs::read_to_string(path).context(format!("Reading {}", path.display()))?;
        if script.trim().is_empty() {
            return Ok(());
        }
        self.execute_script(&script, commit)
    }

    /// Table names of the connected database.
    pub fn table_names(&self) -> Result<Vec<String>, DatabaseError> {
        match self.backend() {
            Backend::Sqlite => {
                let rows = self.select_unlimited(
                    "select distinct tbl_name from sqlite_master where type = 'table'",
                    &[],
                )?;
                Ok(rows.iter().filter_map(|row| row.get_string("tbl_name")).collect())
            }
            #[cfg(feature = "mysql")]
            Backend::Mysql => {
                let database = self.current_database()?;
                self.table_names_in(&database)
            }
        }
    }

    fn fetch_first(
        &self,
        sql: &str,
        params: &[SqlValue],
        hump: bool,
    ) -> Result<Option<Row>, DatabaseError> {
        let sql = inject_limit(&normalize_placeholders(sql), 1);
        Ok(self.fetch(&sql, params, Some(1), hump)?.into_iter().next())
    }

    fn fetch(
        &self,
        sql: &str,
        params: &[SqlValue],
        cap: Option<usize>,
        hump: bool,
    ) -> Result<Vec<Row>, DatabaseError> {
        let started = Instant::now();
        let mut rows = Vec::new();
        let result = self.with_connection(|connection| {
            connection.query(sql, params, |mut row| {
                if hump {
                    row.apply_hump();
                }
                rows.push(row);
                cap.is_none_or(|limit| rows.len() < limit)
            })
        });
        self.log_sql(sql, params, started);
        result.map(|()| rows)
    }

    fn with_connection<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, DatabaseError>,
    ) -> Result<T, DatabaseError> {
        let mut guard = self.inner.connection.lock();
        let connection = guard.as_mut().ok_or(DatabaseError::Closed { context: None })?;
        f(connection)
    }

    fn log_sql(&self, sql: &str, params: &[SqlValue], started: Instant) {
        if !self.inner.debug.load(Ordering::Relaxed) {
            return;
        }
        let cost = render_cost(started);
        if params.is_empty() {
            debug!(%cost, "SQL: {sql}");
        } else {
            debug!(%cost, "SQL: {sql}, params: {params:?}");
        }
    }

    fn log_batch(&self, sql: &str, rows: usize, started: Instant) {
        if !self.inner.debug.load(Ordering::Relaxed) {
            return;
        }
        let cost = render_cost(started);
        debug!(%cost, rows, "SQL batch: {sql}");
    }
}

#[cfg(feature = "mysql")]
impl Database {
    /// Names of every database on the server.
    pub fn database_names(&self) -> Result<Vec<String>, DatabaseError> {
        self.mysql_only()?;
        let rows = self.select_unlimited(
            "select distinct table_schema from information_schema.tables",
            &[],
        )?;
        Ok(rows.iter().filter_map(|row| row.get_string("table_schema")).collect())
    }

    /// Database names with the system schemas filtered out.
    pub fn business_database_names(&self) -> Result<Vec<String>, DatabaseError> {
        const SYSTEM_SCHEMAS: [&str; 5] =
            ["information_schema", "performance_schema", "mysql", "sys", "test"];
        let names = self.database_names()?;
        Ok(names.into_iter().filter(|name| !SYSTEM_SCHEMAS.contains(&name.as_str())).collect())
    }

    /// Switches the connection to another database.
    pub fn use_database(&self, database: &str) -> Result<(), DatabaseError> {
        self.mysql_only()?;
        self.execute(&format!("USE {database}"), &[], true)?;
        self.with_connection(|connection| {
            connection.set_mysql_database(database);
            Ok(())
        })
    }

    /// Table names of the given database.
    pub fn table_names_in(&self, database: &str) -> Result<Vec<String>, DatabaseError> {
        self.mysql_only()?;
        let sql = format!(
            "select table_name from information_schema.tables where table_schema = {}",
            quote_text(database)
        );
        let rows = self.select_unlimited(&sql, &[])?;
        Ok(rows.iter().filter_map(|row| row.get_string("table_name")).collect())
    }

    /// Column descriptions of a table, in ordinal order.
    pub fn table_columns(
        &self,
        table: &str,
        database: Option<&str>,
    ) -> Result<Vec<Row>, DatabaseError> {
        self.mysql_only()?;
        let database = self.database_or_current(database)?;
        let sql = format!(
            "select column_name,data_type,column_type,is_nullable,column_key,column_comment,\
             column_default,extra from information_schema.columns \
             where table_schema = {} and table_name = {} order by ordinal_position",
            quote_text(&database),
            quote_text(table)
        );
        self.select_unlimited(&sql, &[])
    }

    /// Description of a single column.
    pub fn column_info(
        &self,
        table: &str,
        column: &str,
        database: Option<&str>,
    ) -> Result<Option<Row>, DatabaseError> {
        self.mysql_only()?;
        let database = self.database_or_current(database)?;
        let sql = format!(
            "select column_name,data_type,column_type,is_nullable,column_key,column_comment,\
             column_default,extra from information_schema.columns \
             where table_schema = {} and table_name = {} and column_name = {}",
            quote_text(&database),
            quote_text(table),
            quote_text(column)
        );
        self.select_one(&sql, &[])
    }

    fn current_database(&self) -> Result<String, DatabaseError> {
        self.with_connection(|connection| {
            connection.mysql_database().ok_or(DatabaseError::Validation {
                message: "this operation requires a MySQL connection".into(),
                context: None,
            })
        })
    }

    fn database_or_current(&self, database: Option<&str>) -> Result<String, DatabaseError> {
        database.map_or_else(|| self.current_database(), |name| Ok(name.to_owned()))
    }

    fn mysql_only(&self) -> Result<(), DatabaseError> {
        if self.backend() == Backend::Mysql {
            Ok(())
        } else {
            Err(DatabaseError::Validation {
                message: "this operation requires a MySQL connection".into(),
                context: None,
            })
        }
    }
}

fn convert<T>(
    value: Option<SqlValue>,
    read: impl Fn(&SqlValue) -> Option<T>,
    wanted: &str,
) -> Result<Option<T>, DatabaseError> {
    let Some(value) = value else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    read(&value).map(Some).ok_or_else(|| DatabaseError::Validation {
        message: format!("cannot read {value:?} as {wanted}").into(),
        context: None,
    })
}

fn render_condition(column: &str, value: &SqlValue) -> Result<String, DatabaseError> {
    Ok(match value {
        SqlValue::Integer(i) => format!(" and {column} = {i}"),
        SqlValue::Real(f) => format!(" and {column} = {f}"),
        SqlValue::Text(t) => format!(" and {column} = {}", quote_text(t)),
        SqlValue::Null => format!(" and {column} is null"),
        SqlValue::Blob(_) => {
            return Err(DatabaseError::Validation {
                message: format!("blob values cannot be rendered into a condition: {column}")
                    .into(),
                context: None,
            });
        }
    })
}

fn render_cost(started: Instant) -> String {
    let elapsed = started.elapsed().as_secs_f64();
    if elapsed > 1.0 {
        format!("{elapsed:.3}s")
    } else {
        format!("{:.3}ms", elapsed * 1000.0)
    }
}

/// Rewrites `%s`/`%d` style binds to `?`, leaving string literals alone.
///
/// Doubled quotes re-enter the literal correctly; backslash escapes are not
/// tracked.
fn normalize_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();
    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            out.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => {
                quote = Some(ch);
                out.push(ch);
            }
            '%' if matches!(chars.peek(), Some('s' | 'd')) => {
                chars.next();
                out.push('?');
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Whether the statement carries a `LIMIT` keyword outside string literals.
fn has_limit_clause(sql: &str) -> bool {
    let mut quote: Option<char> = None;
    let mut word = String::new();
    for ch in sql.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => {
                quote = Some(ch);
                word.clear();
            }
            c if c.is_ascii_alphanumeric() || c == '_' => word.push(c.to_ascii_lowercase()),
            _ => {
                if word == "limit" {
                    return true;
                }
                word.clear();
            }
        }
    }
    word == "limit"
}

fn inject_limit(sql: &str, limit: usize) -> String {
    if has_limit_clause(sql) {
        return sql.to_owned();
    }
    let trimmed = sql.trim_end();
    trimmed.strip_suffix(';').map_or_else(
        || format!("{trimmed} LIMIT {limit}"),
        |body| format!("{body} LIMIT {limit};"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_translate_outside_literals() {
        assert_eq!(normalize_placeholders("select * from t where a = %s"), "select * from t where a = ?");
        assert_eq!(normalize_placeholders("update t set b = %d"), "update t set b = ?");
        assert_eq!(
            normalize_placeholders("select '%s' as tpl, \"100%d\" as pct where a = %s"),
            "select '%s' as tpl, \"100%d\" as pct where a = ?"
        );
        assert_eq!(normalize_placeholders("select '90%' from t"), "select '90%' from t");
        assert_eq!(normalize_placeholders("select 1 % 2"), "select 1 % 2");
    }

    #[test]
    fn limit_detection_is_word_based() {
        assert!(has_limit_clause("select * from t limit 5"));
        assert!(has_limit_clause("select * from t LIMIT 5;"));
        assert!(has_limit_clause("select * from t Limit\n5"));
        assert!(!has_limit_clause("select limitless from t"));
        assert!(!has_limit_clause("select * from t where note = 'limit '"));
        assert!(!has_limit_clause("select unlimited, sublimit from t"));
    }

    #[test]
    fn limit_injection_respects_terminators() {
        assert_eq!(inject_limit("select * from t", 10), "select * from t LIMIT 10");
        assert_eq!(inject_limit("select * from t;", 10), "select * from t LIMIT 10;");
        assert_eq!(inject_limit("select * from t limit 3", 10), "select * from t limit 3");
    }

    #[test]
    fn builder_requires_a_target() {
        let err = Database::builder().init().unwrap_err();
        assert!(matches!(err, DatabaseError::Validation { .. }));
    }
}
