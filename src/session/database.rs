use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params_from_iter, Connection, Transaction};
use tracing::{debug, info, warn};

use crate::chart::BarChartData;
use crate::error::{DeskError, Result};
use crate::storage::dataset::{Column, DataType, Dataset, Row, Schema};
use crate::storage::format::FormatRegistry;

use super::convert::{quote_ident, value_from_sql};
use super::schema::{self, TableStructure};

/// The open database plus the file formats it can exchange data with.
///
/// Holds at most one connection; `create` replaces it. Every operation that
/// needs a database fails with [`DeskError::NoDatabase`] until one is opened.
pub struct Session {
    conn: Option<Connection>,
    path: Option<PathBuf>,
    formats: FormatRegistry,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_formats(FormatRegistry::default())
    }

    pub fn with_formats(formats: FormatRegistry) -> Self {
        Self {
            conn: None,
            path: None,
            formats,
        }
    }

    /// Opens or creates the database at `path`, closing any previous one.
    pub fn create(&mut self, path: &Path) -> Result<()> {
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened database");
        self.conn = Some(conn);
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(DeskError::NoDatabase)
    }

    fn conn_mut(&mut self) -> Result<&mut Connection> {
        self.conn.as_mut().ok_or(DeskError::NoDatabase)
    }

    /// Runs SQL in autocommit mode. A failing statement leaves earlier work in place.
    pub fn execute(&self, sql: &str) -> Result<()> {
        let conn = self.conn()?;
        debug!(sql, "execute");
        conn.execute_batch(sql).map_err(|e| {
            warn!(sql, error = %e, "statement failed");
            DeskError::from(e)
        })
    }

    /// Whether the first statement in `sql` produces a result set.
    pub fn returns_rows(&self, sql: &str) -> Result<bool> {
        let stmt = self.conn()?.prepare(sql)?;
        Ok(stmt.column_count() > 0)
    }

    /// Runs a query and collects every row. Column types are inferred from the values.
    pub fn query(&self, sql: &str) -> Result<Dataset> {
        let conn = self.conn()?;
        debug!(sql, "query");
        let mut stmt = conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows = Vec::new();
        let mut result = stmt.query([])?;
        while let Some(row) = result.next()? {
            let values = (0..names.len())
                .map(|i| row.get_ref(i).map(value_from_sql))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.push(Row::new(values));
        }

        let columns = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let dtype = rows
                    .iter()
                    .filter_map(|r: &Row| r.get(i))
                    .fold(DataType::Null, |acc, v| acc.merge(&v.data_type()));
                let dtype = if dtype == DataType::Null {
                    DataType::String
                } else {
                    dtype
                };
                Column::new(name, dtype)
            })
            .collect();

        Ok(Dataset::with_rows("result", Schema::new(columns), rows))
    }

    pub fn table_names(&self) -> Result<Vec<String>> {
        schema::list_tables(self.conn()?)
    }

    /// Every user table with its columns in declaration order.
    pub fn list_table_structure(&self) -> Result<Vec<TableStructure>> {
        schema::describe_all(self.conn()?)
    }

    /// Reads a tabular file. The extension picks the format; nothing touches the database.
    pub fn import_file(&self, path: &Path) -> Result<Vec<Dataset>> {
        let format = self.formats.lookup(path)?;
        info!(path = %path.display(), format = format.name(), "reading file");
        format.read(path)
    }

    /// Writes one dataset to `path` in the format its extension names.
    pub fn export_file(&self, dataset: &Dataset, path: &Path) -> Result<()> {
        let format = self.formats.lookup(path)?;
        info!(path = %path.display(), format = format.name(), rows = dataset.row_count(), "writing file");
        format.write(std::slice::from_ref(dataset), path)?;
        Ok(())
    }

    /// Replaces the table named after the dataset with the dataset's rows.
    pub fn load_dataset(&mut self, dataset: &Dataset) -> Result<()> {
        if dataset.column_count() == 0 {
            return Err(DeskError::Conversion(format!(
                "{} has no columns",
                dataset.name
            )));
        }

        let tx = self.conn_mut()?.transaction()?;
        write_table(&tx, dataset)?;
        tx.commit()?;
        Ok(())
    }

    /// Imports a file and writes each of its datasets into its own table.
    /// Returns the names of the tables written.
    ///
    /// All tables are written in one transaction: either every dataset lands
    /// or the database is left as it was.
    pub fn import_into_database(&mut self, path: &Path) -> Result<Vec<String>> {
        let datasets = self.import_file(path)?;
        self.load_datasets(&datasets)
    }

    fn load_datasets(&mut self, datasets: &[Dataset]) -> Result<Vec<String>> {
        let tx = self.conn_mut()?.transaction()?;
        let mut tables = Vec::with_capacity(datasets.len());
        for dataset in datasets {
            if dataset.column_count() == 0 {
                warn!(table = %dataset.name, "skipping dataset without columns");
                continue;
            }
            write_table(&tx, dataset)?;
            tables.push(dataset.name.clone());
        }
        tx.commit()?;
        Ok(tables)
    }

    /// Exports the full contents of every table. Returns the files written.
    pub fn export_tables(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let format = self.formats.lookup(path)?;
        let names = self.table_names()?;
        if names.is_empty() {
            return Err(DeskError::NoTables);
        }

        let datasets = names
            .iter()
            .map(|name| {
                self.query(&format!("SELECT * FROM {}", quote_ident(name)))
                    .map(|d| d.renamed(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let written = format.write(&datasets, path)?;
        info!(tables = names.len(), files = written.len(), "exported tables");
        Ok(written)
    }

    /// Writes script text verbatim.
    pub fn save_sql_script(&self, text: &str, path: &Path) -> Result<()> {
        fs::write(path, text)?;
        info!(path = %path.display(), bytes = text.len(), "saved SQL script");
        Ok(())
    }

    /// Runs a query and turns its numeric columns into bar-chart series.
    pub fn run_visualization_query(&self, sql: &str) -> Result<BarChartData> {
        let dataset = self.query(sql)?;
        BarChartData::from_dataset(&dataset, sql.trim())
    }
}

/// Drops and recreates the dataset's table inside `tx`, then inserts its rows.
fn write_table(tx: &Transaction<'_>, dataset: &Dataset) -> Result<()> {
    let table = quote_ident(&dataset.name);
    let column_defs: Vec<String> = dataset
        .schema
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.data_type.sql_type()))
        .collect();
    let column_names: Vec<String> = dataset
        .schema
        .columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect();
    let placeholders: Vec<String> = (1..=dataset.column_count())
        .map(|i| format!("?{}", i))
        .collect();

    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} ({});",
        column_defs.join(", ")
    ))?;
    let mut stmt = tx.prepare(&format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        column_names.join(", "),
        placeholders.join(", ")
    ))?;
    for row in &dataset.rows {
        stmt.execute(params_from_iter(row.values.iter()))?;
    }

    info!(table = %dataset.name, rows = dataset.row_count(), "loaded dataset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::dataset::Value;

    fn memory_session() -> Session {
        let mut session = Session::new();
        session.create(Path::new(":memory:")).unwrap();
        session
    }

    #[test]
    fn test_operations_need_open_database() {
        let session = Session::new();
        assert!(!session.is_open());
        assert!(matches!(session.execute("SELECT 1"), Err(DeskError::NoDatabase)));
        assert!(matches!(session.table_names(), Err(DeskError::NoDatabase)));
    }

    #[test]
    fn test_query_collects_rows() {
        let session = memory_session();
        session
            .execute("CREATE TABLE t (a INTEGER, b TEXT); INSERT INTO t VALUES (1, 'x'), (2, NULL);")
            .unwrap();

        let result = session.query("SELECT a, b FROM t ORDER BY a").unwrap();
        assert_eq!(result.schema.column_names(), vec!["a", "b"]);
        assert_eq!(result.schema.columns[0].data_type, DataType::Integer);
        assert_eq!(result.schema.columns[1].data_type, DataType::String);
        assert_eq!(result.rows[1].values, vec![Value::Integer(2), Value::Null]);
    }

    #[test]
    fn test_returns_rows() {
        let session = memory_session();
        assert!(session.returns_rows("SELECT 1").unwrap());
        assert!(!session.returns_rows("CREATE TABLE t (a)").unwrap());
    }

    #[test]
    fn test_load_dataset_replaces_table() {
        let mut session = memory_session();
        session.execute("CREATE TABLE \"my data\" (old TEXT)").unwrap();

        let schema = Schema::new(vec![
            Column::new("id", DataType::Integer),
            Column::new("ok", DataType::Boolean),
        ]);
        let dataset = Dataset::with_rows(
            "my data",
            schema,
            vec![Row::new(vec![Value::Integer(1), Value::Boolean(true)])],
        );
        session.load_dataset(&dataset).unwrap();

        let structure = session.list_table_structure().unwrap();
        assert_eq!(
            structure[0].column_pairs(),
            vec![("id", "INTEGER"), ("ok", "INTEGER")]
        );
        let rows = session.query("SELECT * FROM \"my data\"").unwrap();
        assert_eq!(rows.rows[0].values, vec![Value::Integer(1), Value::Integer(1)]);
    }

    #[test]
    fn test_load_dataset_without_columns() {
        let mut session = memory_session();
        let dataset = Dataset::new("empty", Schema::new(Vec::new()));
        assert!(matches!(
            session.load_dataset(&dataset),
            Err(DeskError::Conversion(_))
        ));
    }

    #[test]
    fn test_load_datasets_skips_datasets_without_columns() {
        let mut session = memory_session();
        let data = Dataset::with_rows(
            "data",
            Schema::new(vec![Column::new("a", DataType::Integer)]),
            vec![Row::new(vec![Value::Integer(1)])],
        );
        let blank = Dataset::new("blank", Schema::new(Vec::new()));

        let tables = session.load_datasets(&[data, blank]).unwrap();
        assert_eq!(tables, vec!["data"]);
        assert_eq!(session.table_names().unwrap(), vec!["data"]);
    }

    #[test]
    fn test_failed_import_writes_no_tables() {
        let mut session = memory_session();
        session.execute("CREATE TABLE first (old TEXT)").unwrap();
        let good = Dataset::with_rows(
            "first",
            Schema::new(vec![Column::new("a", DataType::Integer)]),
            vec![Row::new(vec![Value::Integer(1)])],
        );
        // One value for a two-column insert fails the statement.
        let bad = Dataset::with_rows(
            "second",
            Schema::new(vec![
                Column::new("a", DataType::Integer),
                Column::new("b", DataType::Integer),
            ]),
            vec![Row::new(vec![Value::Integer(1)])],
        );

        assert!(session.load_datasets(&[good, bad]).is_err());
        assert_eq!(session.table_names().unwrap(), vec!["first"]);
        let kept = session.list_table_structure().unwrap();
        assert_eq!(kept[0].column_pairs(), vec![("old", "TEXT")]);
    }

    #[test]
    fn test_visualization_query() {
        let session = memory_session();
        session
            .execute("CREATE TABLE s (region TEXT, units INTEGER); INSERT INTO s VALUES ('n', 3), ('s', 5);")
            .unwrap();

        let chart = session
            .run_visualization_query("SELECT region, units FROM s ORDER BY region")
            .unwrap();
        assert_eq!(chart.series, vec!["units".to_string()]);
        assert_eq!(chart.groups[1].label, "s");
        assert_eq!(chart.max_value(), 5.0);

        assert!(session.run_visualization_query("SELECT nope FROM s").is_err());
    }

    #[test]
    fn test_export_without_tables() {
        let session = memory_session();
        assert!(matches!(
            session.export_tables(Path::new("out.csv")),
            Err(DeskError::NoTables)
        ));
    }
}
