use rusqlite::types::{ToSqlOutput, ValueRef};

use crate::DatabaseError;

/// A single SQL parameter or column value.
///
/// Booleans are deliberately absent: they bind differently per engine, so
/// callers coerce them to `0`/`1` or `"true"`/`"false"` explicitly.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SqlValue {
    #[default]
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Whether the value is SQL `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view: truncates reals and parses numeric text.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Real(value) => Some(*value as i64),
            Self::Text(text) => {
                let text = text.trim();
                text.parse::<i64>().ok().or_else(|| text.parse::<f64>().ok().map(|f| f as i64))
            }
            Self::Null | Self::Blob(_) => None,
        }
    }

    /// Float view: widens integers and parses numeric text.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Real(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
            Self::Null | Self::Blob(_) => None,
        }
    }

    /// Bool view: nonzero numbers are true; text accepts `0`/`1`,
    /// `true`/`True` and `false`/`False`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Integer(value) => Some(*value != 0),
            Self::Real(value) => Some(*value != 0.0),
            Self::Text(text) => match text.trim() {
                "1" | "true" | "True" => Some(true),
                "0" | "false" | "False" => Some(false),
                _ => None,
            },
            Self::Null | Self::Blob(_) => None,
        }
    }

    /// Display form: numbers render in decimal, blobs only when UTF-8.
    #[must_use]
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text.clone()),
            Self::Integer(value) => Some(value.to_string()),
            Self::Real(value) => Some(value.to_string()),
            Self::Blob(bytes) => String::from_utf8(bytes.clone()).ok(),
            Self::Null => None,
        }
    }
}

macro_rules! from_integer {
    ($($ty:ty),+) => {$(
        impl From<$ty> for SqlValue {
            fn from(value: $ty) -> Self {
                Self::Integer(i64::from(value))
            }
        }
    )+};
}

from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for SqlValue {
    fn from(value: f32) -> Self {
        Self::Real(f64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&[u8]> for SqlValue {
    fn from(value: &[u8]) -> Self {
        Self::Blob(value.to_vec())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(f) => Self::Real(f),
            ValueRef::Text(t) => Self::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Self::Blob(b.to_vec()),
        }
    }
}

impl rusqlite::ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Self::Integer(value) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*value)),
            Self::Real(value) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*value)),
            Self::Text(text) => ToSqlOutput::Borrowed(ValueRef::Text(text.as_bytes())),
            Self::Blob(bytes) => ToSqlOutput::Borrowed(ValueRef::Blob(bytes)),
        })
    }
}

#[cfg(feature = "mysql")]
impl From<SqlValue> for mysql::Value {
    fn from(value: SqlValue) -> Self {
        match value {
            SqlValue::Null => Self::NULL,
            SqlValue::Integer(i) => Self::Int(i),
            SqlValue::Real(f) => Self::Double(f),
            SqlValue::Text(t) => Self::Bytes(t.into_bytes()),
            SqlValue::Blob(b) => Self::Bytes(b),
        }
    }
}

#[cfg(feature = "mysql")]
impl From<&mysql::Value> for SqlValue {
    fn from(value: &mysql::Value) -> Self {
        match value {
            mysql::Value::NULL => Self::Null,
            mysql::Value::Int(i) => Self::Integer(*i),
            mysql::Value::UInt(u) => Self::Integer(u.cast_signed()),
            mysql::Value::Float(f) => Self::Real(f64::from(*f)),
            mysql::Value::Double(d) => Self::Real(*d),
            mysql::Value::Bytes(b) => String::from_utf8(b.clone())
                .map_or_else(|err| Self::Blob(err.into_bytes()), Self::Text),
            mysql::Value::Date(year, month, day, hour, minute, second, micros) => {
                Self::Text(if *micros > 0 {
                    format!(
                        "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}.{micros:06}"
                    )
                } else {
                    format!("{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")
                })
            }
            mysql::Value::Time(negative, days, hours, minutes, seconds, micros) => {
                let sign = if *negative { "-" } else { "" };
                let hours = u32::from(*hours) + days * 24;
                Self::Text(if *micros > 0 {
                    format!("{sign}{hours:02}:{minutes:02}:{seconds:02}.{micros:06}")
                } else {
                    format!("{sign}{hours:02}:{minutes:02}:{seconds:02}")
                })
            }
        }
    }
}

/// Renders a deduplicated ` IN (...)` fragment with SQL quoting for text.
///
/// First-seen order wins; `Null` and blob items are rejected.
///
/// # Errors
///
/// Returns [`DatabaseError::Validation`] for an empty list or an
/// unsupported item type.
pub fn in_sql(items: &[SqlValue]) -> Result<String, DatabaseError> {
    if items.is_empty() {
        return Err(DatabaseError::Validation {
            message: "in items is empty".into(),
            context: None,
        });
    }
    let mut seen: Vec<&SqlValue> = Vec::with_capacity(items.len());
    let mut rendered = Vec::with_capacity(items.len());
    for item in items {
        if seen.contains(&item) {
            continue;
        }
        seen.push(item);
        rendered.push(match item {
            SqlValue::Integer(value) => value.to_string(),
            SqlValue::Real(value) => value.to_string(),
            SqlValue::Text(text) => quote_text(text),
            SqlValue::Null | SqlValue::Blob(_) => {
                return Err(DatabaseError::Validation {
                    message: format!("in item type is not supported: {item:?}").into(),
                    context: None,
                });
            }
        });
    }
    Ok(format!(" IN ({}) ", rendered.join(",")))
}

pub(crate) fn quote_text(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Builds a parameter list from heterogeneous values.
///
/// ```
/// use shed_database::{SqlValue, sql_params};
///
/// let params = sql_params!["alice", 42, 1.5];
/// assert_eq!(params[1], SqlValue::Integer(42));
/// ```
#[macro_export]
macro_rules! sql_params {
    () => { Vec::<$crate::SqlValue>::new() };
    ($($value:expr),+ $(,)?) => { vec![$($crate::SqlValue::from($value)),+] };
}
