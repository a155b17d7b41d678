use std::fs;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDateTime;
use rust_xlsxwriter::Workbook;
use thiserror::Error;

use tracing::debug;

use super::dataset::{unique_column_names, Column, DataType, Dataset, Row, Schema, Value};

#[derive(Error, Debug)]
pub enum ExcelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not read workbook: {0}")]
    Read(#[from] calamine::Error),
    #[error("Could not write workbook: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),
    #[error("Workbook has no sheets with data")]
    NoSheets,
    #[error("Sheet {sheet} is too large: {message}")]
    TooLarge { sheet: String, message: String },
}

/// Reads every non-empty worksheet of a workbook into its own dataset.
///
/// The container is recognised from its content, so both legacy `.xls` and
/// OOXML `.xlsx` files load regardless of which of the two extensions they carry.
pub fn read_workbook(path: &Path) -> Result<Vec<Dataset>, ExcelError> {
    let bytes = fs::read(path)?;
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let sheet_names = workbook.sheet_names();
    let mut datasets = Vec::with_capacity(sheet_names.len());
    for sheet in sheet_names {
        let range = workbook.worksheet_range(&sheet)?;
        let cells: Vec<Vec<Data>> = range.rows().map(|r| r.to_vec()).collect();
        if is_blank(&cells) {
            debug!(sheet = %sheet, "skipping empty worksheet");
            continue;
        }
        datasets.push(sheet_to_dataset(&sheet, &cells));
    }

    if datasets.is_empty() {
        return Err(ExcelError::NoSheets);
    }
    Ok(datasets)
}

fn is_blank(cells: &[Vec<Data>]) -> bool {
    cells.iter().flatten().all(|cell| matches!(cell, Data::Empty))
}

fn sheet_to_dataset(name: &str, cells: &[Vec<Data>]) -> Dataset {
    let Some((header, body)) = cells.split_first() else {
        return Dataset::new(name, Schema::new(Vec::new()));
    };

    let headers = unique_column_names(
        header
            .iter()
            .map(|cell| match cell {
                Data::Empty => String::new(),
                other => cell_to_value(other).to_string(),
            })
            .collect(),
    );

    let raw_rows: Vec<Vec<Value>> = body
        .iter()
        .map(|r| {
            (0..headers.len())
                .map(|i| r.get(i).map(cell_to_value).unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    let mut types = vec![DataType::Null; headers.len()];
    for row in &raw_rows {
        for (i, value) in row.iter().enumerate() {
            types[i] = types[i].merge(&value.data_type());
        }
    }

    // Spreadsheets store every number as a float; a column whose numbers are all
    // whole comes back as integers.
    for (i, dtype) in types.iter_mut().enumerate() {
        if *dtype == DataType::Float && raw_rows.iter().all(|r| is_whole(&r[i])) {
            *dtype = DataType::Integer;
        }
    }

    let rows = raw_rows
        .into_iter()
        .map(|row| {
            Row::new(
                row.into_iter()
                    .zip(types.iter())
                    .map(|(value, dtype)| coerce(value, dtype))
                    .collect(),
            )
        })
        .collect();

    let columns = headers
        .into_iter()
        .zip(types)
        .map(|(name, dtype)| {
            let dtype = if dtype == DataType::Null {
                DataType::String
            } else {
                dtype
            };
            Column::new(name, dtype)
        })
        .collect();

    Dataset::with_rows(name, Schema::new(columns), rows)
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::Integer(*i),
        Data::Float(f) => Value::Float(*f),
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Boolean(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) => Value::String(format_datetime(&ndt)),
            None => Value::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Error(e) => Value::String(format!("#{:?}", e)),
        Data::Empty => Value::Null,
    }
}

/// Spreadsheet dates are imported as text SQLite's date functions understand.
fn format_datetime(ndt: &NaiveDateTime) -> String {
    ndt.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn is_whole(value: &Value) -> bool {
    match value {
        Value::Float(f) => f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0,
        _ => true,
    }
}

fn coerce(value: Value, dtype: &DataType) -> Value {
    match (value, dtype) {
        (Value::Float(f), DataType::Integer) => Value::Integer(f as i64),
        (Value::Integer(i), DataType::Float) => Value::Float(i as f64),
        (Value::Null, _) => Value::Null,
        (value, DataType::String) => match value {
            Value::String(s) => Value::String(s),
            other => Value::String(other.to_string()),
        },
        (value, _) => value,
    }
}

/// Writes each dataset as one worksheet named after it. The workbook is always OOXML.
pub fn write_workbook(datasets: &[Dataset], path: &Path) -> Result<(), ExcelError> {
    let mut workbook = Workbook::new();

    for dataset in datasets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&dataset.name)?;

        for (col, column) in dataset.schema.columns.iter().enumerate() {
            let col = to_col(col, &dataset.name)?;
            worksheet.write_string(0, col, &column.name)?;
        }

        for (r, row) in dataset.rows.iter().enumerate() {
            let row_idx = u32::try_from(r + 1).map_err(|_| ExcelError::TooLarge {
                sheet: dataset.name.clone(),
                message: format!("{} rows", dataset.row_count()),
            })?;
            for (c, value) in row.values.iter().enumerate() {
                let col = to_col(c, &dataset.name)?;
                match value {
                    Value::Null => {}
                    Value::Integer(i) => {
                        worksheet.write_number(row_idx, col, *i as f64)?;
                    }
                    Value::Float(f) => {
                        worksheet.write_number(row_idx, col, *f)?;
                    }
                    Value::Boolean(b) => {
                        worksheet.write_boolean(row_idx, col, *b)?;
                    }
                    Value::String(s) => {
                        worksheet.write_string(row_idx, col, s)?;
                    }
                    other @ Value::Blob(_) => {
                        worksheet.write_string(row_idx, col, other.to_string())?;
                    }
                }
            }
        }
    }

    workbook.save(path)?;
    Ok(())
}

fn to_col(index: usize, sheet: &str) -> Result<u16, ExcelError> {
    u16::try_from(index).map_err(|_| ExcelError::TooLarge {
        sheet: sheet.to_string(),
        message: format!("column {}", index + 1),
    })
}
