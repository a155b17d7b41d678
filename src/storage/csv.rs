use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use super::dataset::{unique_column_names, Column, DataType, Dataset, Row, Schema, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Empty CSV file")]
    EmptyFile,
}

/// Reads comma- or tab-separated text with a header line.
pub struct CsvReader {
    delimiter: char,
}

impl Default for CsvReader {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvReader {
    pub fn new() -> Self {
        Self { delimiter: ',' }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn read_file(&self, path: &Path) -> Result<Dataset, CsvError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("table")
            .to_string();

        self.read_from_reader(reader, &name)
    }

    pub fn read_from_reader<R: BufRead>(&self, reader: R, name: &str) -> Result<Dataset, CsvError> {
        let records = self.split_records(reader)?;
        let mut records = records.into_iter();

        let (first_line, first_record) = records.next().ok_or(CsvError::EmptyFile)?;
        let header = self
            .parse_line(&first_record)
            .map_err(|message| CsvError::Parse {
                line: first_line,
                message,
            })?;
        let headers = unique_column_names(
            header.into_iter().map(|h| h.unwrap_or_default()).collect(),
        );

        let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();
        for (line, record) in records {
            let row = self
                .parse_line(&record)
                .map_err(|message| CsvError::Parse { line, message })?;
            if row.len() != headers.len() {
                return Err(CsvError::Parse {
                    line,
                    message: format!("expected {} fields, found {}", headers.len(), row.len()),
                });
            }
            raw_rows.push(row);
        }

        let types = infer_types(&raw_rows, headers.len());

        let columns: Vec<Column> = headers
            .iter()
            .zip(types.iter())
            .map(|(name, dtype)| Column::new(name.clone(), dtype.clone()))
            .collect();
        let schema = Schema::new(columns);

        // Convert raw strings to typed values
        let rows: Vec<Row> = raw_rows
            .iter()
            .map(|raw_row| {
                let values: Vec<Value> = raw_row
                    .iter()
                    .zip(types.iter())
                    .map(|(s, dtype)| parse_value(s.as_deref(), dtype))
                    .collect();
                Row::new(values)
            })
            .collect();

        Ok(Dataset::with_rows(name, schema, rows))
    }

    /// Groups physical lines into records, joining lines while a quoted field is still open.
    /// Each record carries the 1-based line number it starts on.
    fn split_records<R: BufRead>(&self, reader: R) -> Result<Vec<(usize, String)>, CsvError> {
        let mut records = Vec::new();
        let mut pending: Option<(usize, String)> = None;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.strip_suffix('\r').unwrap_or(&line).to_string();

            let (start, record) = match pending.take() {
                Some((start, mut record)) => {
                    record.push('\n');
                    record.push_str(&line);
                    (start, record)
                }
                None => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    (idx + 1, line)
                }
            };

            if self.split_fields(&record).1 {
                pending = Some((start, record));
            } else {
                records.push((start, record));
            }
        }

        if let Some((line, _)) = pending {
            return Err(CsvError::Parse {
                line,
                message: "Unclosed quote".to_string(),
            });
        }

        Ok(records)
    }

    /// Splits one record into fields. `None` marks an unquoted empty field.
    fn parse_line(&self, line: &str) -> Result<Vec<Option<String>>, String> {
        match self.split_fields(line) {
            (_, true) => Err("Unclosed quote".to_string()),
            (fields, false) => Ok(fields),
        }
    }

    /// Returns the fields and whether the text ends inside a quoted field.
    ///
    /// A quote only opens a quoted field as its first character; anywhere else
    /// it is an ordinary character, so `5" screen` stays a plain value.
    fn split_fields(&self, line: &str) -> (Vec<Option<String>>, bool) {
        let mut fields = Vec::new();
        let mut current_field = String::new();
        let mut quoted = false;
        let mut in_quotes = false;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            if in_quotes {
                if c == '"' {
                    // Check for escaped quote
                    if chars.peek() == Some(&'"') {
                        current_field.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    current_field.push(c);
                }
            } else if c == '"' && !quoted && current_field.is_empty() {
                in_quotes = true;
                quoted = true;
            } else if c == self.delimiter {
                fields.push(finish_field(&mut current_field, quoted));
                quoted = false;
            } else {
                current_field.push(c);
            }
        }

        fields.push(finish_field(&mut current_field, quoted));
        (fields, in_quotes)
    }
}

fn finish_field(field: &mut String, quoted: bool) -> Option<String> {
    let value = std::mem::take(field);
    if quoted {
        Some(value)
    } else {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

fn is_null_marker(value: &str) -> bool {
    value.eq_ignore_ascii_case("null") || value.eq_ignore_ascii_case("na") || value.eq_ignore_ascii_case("n/a")
}

fn infer_types(rows: &[Vec<Option<String>>], num_columns: usize) -> Vec<DataType> {
    let mut types = vec![DataType::Null; num_columns];

    for row in rows {
        for (i, value) in row.iter().enumerate().take(num_columns) {
            let inferred = infer_single_type(value.as_deref());
            types[i] = types[i].merge(&inferred);
        }
    }

    // Convert remaining Null types to String
    for dtype in &mut types {
        if *dtype == DataType::Null {
            *dtype = DataType::String;
        }
    }

    types
}

fn infer_single_type(value: Option<&str>) -> DataType {
    let value = match value {
        Some(v) if !v.is_empty() && !is_null_marker(v) => v,
        _ => return DataType::Null,
    };

    if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
        return DataType::Boolean;
    }

    if value.parse::<i64>().is_ok() {
        return DataType::Integer;
    }

    if value.parse::<f64>().is_ok() {
        return DataType::Float;
    }

    DataType::String
}

fn parse_value(value: Option<&str>, dtype: &DataType) -> Value {
    let value = match value {
        Some(v) if !v.is_empty() && !is_null_marker(v) => v,
        _ => return Value::Null,
    };

    match dtype {
        DataType::Integer => value.parse::<i64>().map(Value::Integer).unwrap_or(Value::Null),
        DataType::Float => value.parse::<f64>().map(Value::Float).unwrap_or(Value::Null),
        DataType::Boolean => Value::Boolean(value.eq_ignore_ascii_case("true")),
        DataType::String | DataType::Blob => Value::String(value.to_string()),
        DataType::Null => Value::Null,
    }
}

/// Writes a dataset as delimited text: one header line, then one line per row.
pub struct CsvWriter {
    delimiter: char,
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvWriter {
    pub fn new() -> Self {
        Self { delimiter: ',' }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn write_file(&self, dataset: &Dataset, path: &Path) -> Result<(), CsvError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(dataset, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write_to<W: Write>(&self, dataset: &Dataset, writer: &mut W) -> std::io::Result<()> {
        let sep = self.delimiter.to_string();

        let header: Vec<String> = dataset
            .schema
            .columns
            .iter()
            .map(|c| self.escape(&c.name))
            .collect();
        writeln!(writer, "{}", header.join(&sep))?;

        for row in &dataset.rows {
            let values: Vec<String> = row
                .values
                .iter()
                .map(|v| match v {
                    Value::Null => String::new(),
                    // `{:?}` keeps the fraction of whole floats ("2.0"), so they read back as floats.
                    Value::Float(f) => format!("{:?}", f),
                    other => self.escape(&other.to_string()),
                })
                .collect();
            writeln!(writer, "{}", values.join(&sep))?;
        }

        Ok(())
    }

    fn escape(&self, s: &str) -> String {
        if s.contains(self.delimiter)
            || s.contains('"')
            || s.contains('\n')
            || s.contains('\r')
            || s.trim() != s
        {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}
