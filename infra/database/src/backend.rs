use std::{fmt, path::Path};

#[cfg(feature = "mysql")]
use mysql::prelude::Queryable;

use crate::{DatabaseError, DatabaseErrorExt, Row, SqlValue};

/// Engine behind a [`Database`](crate::Database) handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    #[cfg(feature = "mysql")]
    Mysql,
}

/// MySQL connection parameters.
#[cfg(feature = "mysql")]
#[derive(Clone)]
pub struct MysqlOptions {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub charset: String,
}

#[cfg(feature = "mysql")]
impl Default for MysqlOptions {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 3306,
            username: "root".to_owned(),
            password: String::new(),
            database: "information_schema".to_owned(),
            charset: "utf8mb4".to_owned(),
        }
    }
}

#[cfg(feature = "mysql")]
impl fmt::Debug for MysqlOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MysqlOptions")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .field("charset", &self.charset)
            .finish()
    }
}

/// Live connection to one of the supported engines.
pub(crate) enum Connection {
    Sqlite(rusqlite::Connection),
    #[cfg(feature = "mysql")]
    Mysql { conn: mysql::Conn, database: String },
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(_) => f.write_str("Connection::Sqlite"),
            #[cfg(feature = "mysql")]
            Self::Mysql { database, .. } => {
                f.debug_struct("Connection::Mysql").field("database", database).finish()
            }
        }
    }
}

impl Connection {
    pub(crate) fn open_sqlite(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).context("Creating the database directory")?;
        }
        let conn = rusqlite::Connection::open(path).context("Opening SQLite database")?;
        Ok(Self::Sqlite(conn))
    }

    pub(crate) fn open_sqlite_memory() -> Result<Self, DatabaseError> {
        let conn = rusqlite::Connection::open_in_memory().context("Opening in-memory SQLite")?;
        Ok(Self::Sqlite(conn))
    }

    #[cfg(feature = "mysql")]
    pub(crate) fn connect_mysql(options: &MysqlOptions) -> Result<Self, DatabaseError> {
        // autocommit is turned off so the commit flags control transactions
        let opts = mysql::OptsBuilder::new()
            .ip_or_hostname(Some(options.host.clone()))
            .tcp_port(options.port)
            .user(Some(options.username.clone()))
            .pass(Some(options.password.clone()))
            .db_name(Some(options.database.clone()))
            .init(vec![format!("SET NAMES {}", options.charset), "SET autocommit=0".to_owned()]);
        let conn = mysql::Conn::new(opts).context("Connecting to MySQL")?;
        Ok(Self::Mysql { conn, database: options.database.clone() })
    }

    pub(crate) const fn backend(&self) -> Backend {
        match self {
            Self::Sqlite(_) => Backend::Sqlite,
            #[cfg(feature = "mysql")]
            Self::Mysql { .. } => Backend::Mysql,
        }
    }

    /// Runs a query and feeds each row to `on_row`; a `false` return stops
    /// the scan early.
    pub(crate) fn query(
        &mut self,
        sql: &str,
        params: &[SqlValue],
        mut on_row: impl FnMut(Row) -> bool,
    ) -> Result<(), DatabaseError> {
        match self {
            Self::Sqlite(conn) => {
                let mut stmt = conn.prepare(sql).context("Preparing statement")?;
                let names: Vec<String> =
                    stmt.column_names().iter().map(|name| (*name).to_owned()).collect();
                let mut rows = stmt
                    .query(rusqlite::params_from_iter(params.iter()))
                    .context("Executing query")?;
                while let Some(item) = rows.next().context("Reading row")? {
                    let mut row = Row::with_capacity(names.len());
                    for (index, name) in names.iter().enumerate() {
                        let value = item.get_ref(index).context("Reading column")?;
                        row.push(name.clone(), SqlValue::from(value));
                    }
                    if !on_row(row) {
                        break;
                    }
                }
                Ok(())
            }
            #[cfg(feature = "mysql")]
            Self::Mysql { conn, .. } => {
                let mut result =
                    conn.exec_iter(sql, mysql_params(params)).context("Executing query")?;
                for item in result.by_ref() {
                    let item = item.context("Reading row")?;
                    let mut row = Row::with_capacity(item.len());
                    for (index, column) in item.columns_ref().iter().enumerate() {
                        let value = item.as_ref(index).map_or(SqlValue::Null, SqlValue::from);
                        row.push(column.name_str().into_owned(), value);
                    }
                    if !on_row(row) {
                        break;
                    }
                }
                Ok(())
            }
        }
    }

    /// Runs a DML statement and returns the affected row count.
    pub(crate) fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<usize, DatabaseError> {
        match self {
            Self::Sqlite(conn) => conn
                .execute(sql, rusqlite::params_from_iter(params.iter()))
                .context("Executing statement"),
            #[cfg(feature = "mysql")]
            Self::Mysql { conn, .. } => {
                conn.exec_drop(sql, mysql_params(params)).context("Executing statement")?;
                Ok(usize::try_from(conn.affected_rows()).unwrap_or(usize::MAX))
            }
        }
    }

    /// Runs one prepared statement once per parameter row.
    pub(crate) fn execute_batch_rows(
        &mut self,
        sql: &str,
        rows: &[Vec<SqlValue>],
    ) -> Result<usize, DatabaseError> {
        match self {
            Self::Sqlite(conn) => {
                let mut stmt = conn.prepare(sql).context("Preparing batch")?;
                let mut affected = 0;
                for row in rows {
                    affected += stmt
                        .execute(rusqlite::params_from_iter(row.iter()))
                        .context("Executing batch row")?;
                }
                Ok(affected)
            }
            #[cfg(feature = "mysql")]
            Self::Mysql { conn, .. } => {
                let mut affected = 0;
                for row in rows {
                    conn.exec_drop(sql, mysql_params(row)).context("Executing batch row")?;
                    affected += usize::try_from(conn.affected_rows()).unwrap_or(usize::MAX);
                }
                Ok(affected)
            }
        }
    }

    /// Runs a multi-statement script. SQLite only.
    pub(crate) fn execute_script(&mut self, script: &str) -> Result<(), DatabaseError> {
        match self {
            Self::Sqlite(conn) => conn.execute_batch(script).context("Executing script"),
            #[cfg(feature = "mysql")]
            Self::Mysql { .. } => Err(DatabaseError::Validation {
                message: "SQL scripts are only supported on SQLite".into(),
                context: None,
            }),
        }
    }

    /// Opens a transaction when the engine would otherwise autocommit.
    pub(crate) fn begin_if_needed(&mut self) -> Result<(), DatabaseError> {
        match self {
            Self::Sqlite(conn) => {
                if conn.is_autocommit() {
                    conn.execute_batch("BEGIN").context("Opening transaction")?;
                }
                Ok(())
            }
            #[cfg(feature = "mysql")]
            Self::Mysql { .. } => Ok(()),
        }
    }

    pub(crate) fn commit(&mut self) -> Result<(), DatabaseError> {
        match self {
            Self::Sqlite(conn) => {
                if !conn.is_autocommit() {
                    conn.execute_batch("COMMIT").context("Committing")?;
                }
                Ok(())
            }
            #[cfg(feature = "mysql")]
            Self::Mysql { conn, .. } => conn.query_drop("COMMIT").context("Committing"),
        }
    }

    pub(crate) fn rollback(&mut self) -> Result<(), DatabaseError> {
        match self {
            Self::Sqlite(conn) => {
                if !conn.is_autocommit() {
                    conn.execute_batch("ROLLBACK").context("Rolling back")?;
                }
                Ok(())
            }
            #[cfg(feature = "mysql")]
            Self::Mysql { conn, .. } => conn.query_drop("ROLLBACK").context("Rolling back"),
        }
    }

    pub(crate) fn last_insert_id(&self) -> i64 {
        match self {
            Self::Sqlite(conn) => conn.last_insert_rowid(),
            #[cfg(feature = "mysql")]
            Self::Mysql { conn, .. } => conn.last_insert_id().cast_signed(),
        }
    }

    pub(crate) fn as_sqlite_mut(&mut self) -> Option<&mut rusqlite::Connection> {
        match self {
            Self::Sqlite(conn) => Some(conn),
            #[cfg(feature = "mysql")]
            Self::Mysql { .. } => None,
        }
    }

    #[cfg(feature = "mysql")]
    pub(crate) fn as_mysql_mut(&mut self) -> Option<&mut mysql::Conn> {
        match self {
            Self::Sqlite(_) => None,
            Self::Mysql { conn, .. } => Some(conn),
        }
    }

    #[cfg(feature = "mysql")]
    pub(crate) fn mysql_database(&self) -> Option<String> {
        match self {
            Self::Sqlite(_) => None,
            Self::Mysql { database, .. } => Some(database.clone()),
        }
    }

    #[cfg(feature = "mysql")]
    pub(crate) fn set_mysql_database(&mut self, name: &str) {
        if let Self::Mysql { database, .. } = self {
            *database = name.to_owned();
        }
    }
}

#[cfg(feature = "mysql")]
fn mysql_params(params: &[SqlValue]) -> mysql::Params {
    if params.is_empty() {
        mysql::Params::Empty
    } else {
        mysql::Params::Positional(params.iter().cloned().map(Into::into).collect())
    }
}
