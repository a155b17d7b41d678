use rusqlite::types::{Null, ToSql, ToSqlOutput, ValueRef};

use crate::storage::dataset::Value;

pub fn value_from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Float(v),
        ValueRef::Text(v) => Value::String(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => Value::Blob(v.to_vec()),
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Integer(v) => ToSqlOutput::from(*v),
            Value::Float(v) => ToSqlOutput::from(*v),
            Value::String(v) => ToSqlOutput::from(v.as_str()),
            Value::Boolean(v) => ToSqlOutput::from(*v),
            Value::Blob(v) => ToSqlOutput::from(v.as_slice()),
            Value::Null => ToSqlOutput::from(Null),
        })
    }
}

/// Double-quotes an identifier for SQLite, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
