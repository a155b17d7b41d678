use std::fs;
use std::path::{Path, PathBuf};

use tabledesk::designer::{create_table_sql, script, DeclaredType};
use tabledesk::{DeskError, Session, Value};

fn samples_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("samples")
}

fn open_session(dir: &Path) -> Session {
    let mut session = Session::new();
    session
        .create(&dir.join("test.db"))
        .expect("Failed to create database");
    session
}

#[test]
fn test_create_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.db");

    let mut session = Session::new();
    assert!(!session.is_open());
    session.create(&path).unwrap();
    session.execute("CREATE TABLE t (x INTEGER);").unwrap();

    assert!(session.is_open());
    assert!(path.exists());
    assert_eq!(session.path(), Some(path.as_path()));
}

#[test]
fn test_operations_need_open_database() {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new();

    assert!(matches!(session.execute("SELECT 1"), Err(DeskError::NoDatabase)));
    assert!(matches!(session.list_table_structure(), Err(DeskError::NoDatabase)));
    assert!(matches!(
        session.export_tables(&dir.path().join("out.csv")),
        Err(DeskError::NoDatabase)
    ));
}

#[test]
fn test_designed_table_structure() {
    let dir = tempfile::tempdir().unwrap();
    let session = open_session(dir.path());

    let sql = create_table_sql(
        "people",
        &[("name", DeclaredType::Text), ("age", DeclaredType::Integer)],
    )
    .unwrap();
    assert_eq!(sql, "CREATE TABLE IF NOT EXISTS people (name TEXT, age INTEGER);");
    session.execute(&sql).unwrap();

    let tables = session.list_table_structure().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].name, "people");
    assert_eq!(
        tables[0].column_pairs(),
        vec![("name", "TEXT"), ("age", "INTEGER")]
    );
}

#[test]
fn test_failed_statement_keeps_earlier_tables() {
    let dir = tempfile::tempdir().unwrap();
    let session = open_session(dir.path());

    let statements = [
        "CREATE TABLE IF NOT EXISTS a (x TEXT);",
        "CREATE TABLE IF NOT EXISTS (y TEXT);",
        "CREATE TABLE IF NOT EXISTS c (z REAL);",
    ];
    let failures: Vec<&str> = statements
        .iter()
        .filter(|sql| session.execute(sql).is_err())
        .copied()
        .collect();

    assert_eq!(failures, vec![statements[1]]);
    assert_eq!(session.table_names().unwrap(), vec!["a", "c"]);
}

#[test]
fn test_save_sql_script_is_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let session = open_session(dir.path());
    let path = dir.path().join("schema.sql");

    let text = script(&[
        "CREATE TABLE IF NOT EXISTS people (name TEXT, age INTEGER);".to_string(),
        "CREATE TABLE IF NOT EXISTS pets (name TEXT);".to_string(),
    ]);
    session.save_sql_script(&text, &path).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), text);
}

#[test]
fn test_import_sample_csv() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(dir.path());

    let tables = session
        .import_into_database(&samples_dir().join("people.csv"))
        .unwrap();
    assert_eq!(tables, vec!["people"]);

    let result = session
        .query("SELECT name, age, city FROM people ORDER BY age")
        .unwrap();
    assert_eq!(result.row_count(), 4);
    assert_eq!(result.rows[0].values[0], Value::String("Dan".to_string()));
    assert_eq!(result.rows[0].values[1], Value::Integer(19));
    assert_eq!(
        result.rows[3].values[0],
        Value::String("Carol \"CJ\" Jones".to_string())
    );
    assert_eq!(result.rows[3].values[2], Value::Null);
    assert_eq!(
        result.rows[2].values[2],
        Value::String("Portland, OR".to_string())
    );
}

#[test]
fn test_import_sample_tsv_declares_types() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(dir.path());

    session
        .import_into_database(&samples_dir().join("sales.txt"))
        .unwrap();

    let tables = session.list_table_structure().unwrap();
    assert_eq!(
        tables[0].column_pairs(),
        vec![("region", "TEXT"), ("units", "INTEGER"), ("revenue", "REAL")]
    );
}

#[test]
fn test_reimport_replaces_table() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(dir.path());
    let path = dir.path().join("items.csv");

    fs::write(&path, "id,label\n1,a\n2,b\n").unwrap();
    session.import_into_database(&path).unwrap();
    fs::write(&path, "id,label\n3,c\n").unwrap();
    session.import_into_database(&path).unwrap();

    let result = session.query("SELECT id FROM items").unwrap();
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.rows[0].values[0], Value::Integer(3));
}

#[test]
fn test_unsupported_format_leaves_database_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(dir.path());
    session.execute("CREATE TABLE kept (x TEXT);").unwrap();

    let path = dir.path().join("notes.doc");
    fs::write(&path, "name\nAlice\n").unwrap();

    match session.import_into_database(&path) {
        Err(DeskError::UnsupportedFormat(ext)) => assert_eq!(ext, ".doc"),
        other => panic!("expected unsupported format, got {:?}", other),
    }
    match session.export_tables(&dir.path().join("out.pdf")) {
        Err(DeskError::UnsupportedFormat(ext)) => assert_eq!(ext, ".pdf"),
        other => panic!("expected unsupported format, got {:?}", other),
    }
    assert!(!dir.path().join("out.pdf").exists());
    assert_eq!(session.table_names().unwrap(), vec!["kept"]);
}

#[test]
fn test_export_without_tables() {
    let dir = tempfile::tempdir().unwrap();
    let session = open_session(dir.path());

    assert!(matches!(
        session.export_tables(&dir.path().join("out.csv")),
        Err(DeskError::NoTables)
    ));
}

#[test]
fn test_visualization_query() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = open_session(dir.path());
    session
        .import_into_database(&samples_dir().join("sales.txt"))
        .unwrap();

    let chart = session
        .run_visualization_query("SELECT region, units FROM sales ORDER BY units DESC")
        .unwrap();
    assert_eq!(chart.series, vec!["units"]);
    assert_eq!(chart.groups.len(), 3);
    assert_eq!(chart.groups[0].label, "north");
    assert_eq!(chart.max_value(), 40.0);

    assert!(matches!(
        session.run_visualization_query("SELECT region FROM sales"),
        Err(DeskError::NothingToChart)
    ));
}
