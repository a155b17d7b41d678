pub mod csv;
pub mod dataset;
pub mod excel;
pub mod format;

pub use csv::{CsvReader, CsvWriter};
pub use dataset::{Column, DataType, Dataset, Row, Schema, Value};
pub use format::{DelimitedFormat, ExcelFormat, FormatRegistry, TabularFormat};
