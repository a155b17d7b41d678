use rusqlite::Connection;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    /// Type as written in the table's CREATE statement; empty when none was given.
    pub declared_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableStructure {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableStructure {
    /// `(name, declared type)` pairs in column order.
    pub fn column_pairs(&self) -> Vec<(&str, &str)> {
        self.columns
            .iter()
            .map(|c| (c.name.as_str(), c.declared_type.as_str()))
            .collect()
    }
}

pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;

    let tables = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;

    Ok(tables)
}

pub fn table_columns(conn: &Connection, table_name: &str) -> Result<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare(
        "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid",
    )?;

    let columns = stmt
        .query_map([table_name], |row| {
            let not_null: i64 = row.get(2)?;
            let pk: i64 = row.get(3)?;
            Ok(ColumnInfo {
                name: row.get(0)?,
                declared_type: row.get(1)?,
                not_null: not_null != 0,
                primary_key: pk != 0,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(columns)
}

pub fn describe_all(conn: &Connection) -> Result<Vec<TableStructure>> {
    list_tables(conn)?
        .into_iter()
        .map(|name| {
            let columns = table_columns(conn, &name)?;
            Ok(TableStructure { name, columns })
        })
        .collect()
}
