use std::fs;
use std::path::Path;

use tabledesk::{Column, DataType, Dataset, Row, Schema, Session, Value};

fn session_with_people(dir: &Path) -> Session {
    let mut session = Session::new();
    session.create(&dir.join("source.db")).unwrap();
    session
        .execute(
            "CREATE TABLE people (name TEXT, age INTEGER, score REAL);
             INSERT INTO people VALUES ('Alice', 30, 4.5);
             INSERT INTO people VALUES ('Bob, Jr.', 25, NULL);
             INSERT INTO people VALUES ('Carol', 41, 3.25);",
        )
        .unwrap();
    session
}

fn people(session: &Session) -> Dataset {
    session
        .query("SELECT name, age, score FROM people ORDER BY name")
        .unwrap()
}

/// Exports `people`, imports the file into a fresh database and compares rows.
fn assert_round_trip(file_name: &str) {
    let dir = tempfile::tempdir().unwrap();
    let source = session_with_people(dir.path());
    let path = dir.path().join(file_name);

    let written = source.export_tables(&path).unwrap();
    assert_eq!(written, vec![path.clone()]);

    let mut target = Session::new();
    target.create(&dir.path().join("target.db")).unwrap();
    let tables = target.import_into_database(&path).unwrap();
    assert_eq!(tables, vec!["people"]);

    let before = people(&source);
    let after = people(&target);
    assert_eq!(after.schema.column_names(), before.schema.column_names());
    assert_eq!(after.rows, before.rows);
}

#[test]
fn test_csv_round_trip() {
    assert_round_trip("people.csv");
}

#[test]
fn test_tsv_round_trip() {
    assert_round_trip("people.txt");
}

#[test]
fn test_xlsx_round_trip() {
    assert_round_trip("people.xlsx");
}

#[test]
fn test_xls_round_trip() {
    assert_round_trip("people.xls");
}

#[test]
fn test_tsv_export_layout() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_with_people(dir.path());
    let path = dir.path().join("people.txt");

    session.export_tables(&path).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    let mut lines = text.lines();

    assert_eq!(lines.next(), Some("name\tage\tscore"));
    assert_eq!(lines.next(), Some("Alice\t30\t4.5"));
    assert_eq!(lines.next(), Some("Bob, Jr.\t25\t"));
}

#[test]
fn test_csv_export_of_several_tables() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_with_people(dir.path());
    session
        .execute("CREATE TABLE pets (name TEXT); INSERT INTO pets VALUES ('Rex');")
        .unwrap();

    let written = session.export_tables(&dir.path().join("dump.csv")).unwrap();
    assert_eq!(
        written,
        vec![
            dir.path().join("dump_people.csv"),
            dir.path().join("dump_pets.csv"),
        ]
    );
    assert!(!dir.path().join("dump.csv").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("dump_pets.csv")).unwrap(),
        "name\nRex\n"
    );
}

#[test]
fn test_excel_export_of_several_tables() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_with_people(dir.path());
    session
        .execute("CREATE TABLE pets (name TEXT, legs INTEGER); INSERT INTO pets VALUES ('Rex', 4);")
        .unwrap();
    let path = dir.path().join("dump.xlsx");

    session.export_tables(&path).unwrap();
    let sheets = session.import_file(&path).unwrap();

    let names: Vec<&str> = sheets.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["people", "pets"]);
    assert_eq!(sheets[1].rows[0].values, vec![Value::String("Rex".to_string()), Value::Integer(4)]);
}

#[test]
fn test_extension_is_case_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new();
    session.create(&dir.path().join("t.db")).unwrap();

    let path = dir.path().join("Scores.CSV");
    fs::write(&path, "player,points\nann,10\nben,7\n").unwrap();

    assert_eq!(session.import_into_database(&path).unwrap(), vec!["Scores"]);
    let result = session.query("SELECT SUM(points) FROM Scores").unwrap();
    assert_eq!(result.rows[0].values[0], Value::Integer(17));
}

#[test]
fn test_malformed_csv_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new();
    session.create(&dir.path().join("t.db")).unwrap();

    let path = dir.path().join("broken.csv");
    fs::write(&path, "a,b\n1,2,3\n").unwrap();

    assert!(session.import_into_database(&path).is_err());
    assert!(session.table_names().unwrap().is_empty());
}

#[test]
fn test_export_single_query_result() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_with_people(dir.path());
    let path = dir.path().join("adults.csv");

    let result = session
        .query("SELECT name FROM people WHERE age > 28 ORDER BY name")
        .unwrap();
    session.export_file(&result, &path).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "name\nAlice\nCarol\n");
    let reread = session.import_file(&path).unwrap();
    assert_eq!(reread[0].name, "adults");
    assert_eq!(reread[0].row_count(), 2);
}

fn text(s: &str) -> Value {
    Value::String(s.to_string())
}

/// Whole floats, nulls in every column and text that needs quoting.
fn measurements() -> Dataset {
    let schema = Schema::new(vec![
        Column::new("label", DataType::String),
        Column::new("weight", DataType::Float),
        Column::new("ratio", DataType::Float),
        Column::new("count", DataType::Integer),
    ]);
    Dataset::with_rows(
        "measurements",
        schema,
        vec![
            Row::new(vec![
                text("5\" screen, \"wide\""),
                Value::Float(2.0),
                Value::Float(0.5),
                Value::Integer(1),
            ]),
            Row::new(vec![text("plain"), Value::Float(10.0), Value::Null, Value::Null]),
            Row::new(vec![Value::Null, Value::Null, Value::Float(1.25), Value::Integer(3)]),
        ],
    )
}

/// Writes a dataset, reads it back, writes that and reads it again.
/// Returns both reads.
fn reread_twice(extension: &str) -> (Dataset, Dataset) {
    let dir = tempfile::tempdir().unwrap();
    let session = Session::new();

    let first_path = dir.path().join(format!("first.{}", extension));
    session.export_file(&measurements(), &first_path).unwrap();
    let first = session.import_file(&first_path).unwrap().remove(0);

    let second_path = dir.path().join(format!("second.{}", extension));
    session.export_file(&first, &second_path).unwrap();
    let second = session.import_file(&second_path).unwrap().remove(0);

    (first, second)
}

#[test]
fn test_csv_file_reads_back_unchanged() {
    let (first, second) = reread_twice("csv");
    let source = measurements();

    assert_eq!(first.schema, source.schema);
    assert_eq!(first.rows, source.rows);
    assert_eq!(second.schema, first.schema);
    assert_eq!(second.rows, first.rows);
}

#[test]
fn test_tsv_file_reads_back_unchanged() {
    let (first, second) = reread_twice("txt");
    let source = measurements();

    assert_eq!(first.schema, source.schema);
    assert_eq!(first.rows, source.rows);
    assert_eq!(second.schema, first.schema);
    assert_eq!(second.rows, first.rows);
}

/// Spreadsheets hold every number as a float, so an all-whole column settles
/// on INTEGER at the first read and stays there.
fn assert_workbook_is_stable(extension: &str) {
    let (first, second) = reread_twice(extension);

    let types: Vec<DataType> = first.schema.columns.iter().map(|c| c.data_type.clone()).collect();
    assert_eq!(
        types,
        vec![DataType::String, DataType::Integer, DataType::Float, DataType::Integer]
    );
    assert_eq!(first.rows[0].values[0], text("5\" screen, \"wide\""));
    assert_eq!(first.rows[1].values[1], Value::Integer(10));
    assert_eq!(first.rows[2].values[0], Value::Null);
    assert_eq!(second.schema, first.schema);
    assert_eq!(second.rows, first.rows);
}

#[test]
fn test_xlsx_file_is_stable_across_rereads() {
    assert_workbook_is_stable("xlsx");
}

#[test]
fn test_xls_file_is_stable_across_rereads() {
    assert_workbook_is_stable("xls");
}

#[test]
fn test_inch_marks_in_unquoted_csv_fields() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new();
    session.create(&dir.path().join("t.db")).unwrap();

    let path = dir.path().join("tvs.csv");
    fs::write(&path, "size,n\n5\" screen,1\n").unwrap();

    assert_eq!(session.import_into_database(&path).unwrap(), vec!["tvs"]);
    let result = session.query("SELECT size, n FROM tvs").unwrap();
    assert_eq!(result.rows[0].values, vec![text("5\" screen"), Value::Integer(1)]);
}

#[test]
fn test_workbook_with_blank_sheet_imports_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.xlsx");

    let mut workbook = rust_xlsxwriter::Workbook::new();
    let data = workbook.add_worksheet();
    data.set_name("data").unwrap();
    data.write_string(0, 0, "a").unwrap();
    data.write_number(1, 0, 1.0).unwrap();
    workbook.add_worksheet().set_name("notes").unwrap();
    workbook.save(&path).unwrap();

    let mut session = Session::new();
    session.create(&dir.path().join("t.db")).unwrap();

    assert_eq!(session.import_into_database(&path).unwrap(), vec!["data"]);
    assert_eq!(session.table_names().unwrap(), vec!["data"]);
    let result = session.query("SELECT a FROM data").unwrap();
    assert_eq!(result.rows[0].values, vec![Value::Integer(1)]);
}

#[test]
fn test_repeated_csv_headers_import() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new();
    session.create(&dir.path().join("t.db")).unwrap();

    let path = dir.path().join("pairs.csv");
    fs::write(&path, "a,a,\n1,2,3\n").unwrap();
    session.import_into_database(&path).unwrap();

    let tables = session.list_table_structure().unwrap();
    let names: Vec<&str> = tables[0].column_pairs().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["a", "a_1", "column3"]);
}
