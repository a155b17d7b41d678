pub mod chart;
pub mod cli;
pub mod designer;
pub mod error;
pub mod logging;
pub mod output;
pub mod session;
pub mod storage;
pub mod tui;

pub use chart::BarChartData;
pub use designer::{create_table_sql, DeclaredType};
pub use error::{DeskError, Result};
pub use session::{ColumnInfo, Session, TableStructure};
pub use storage::dataset::{Column, DataType, Dataset, Row, Schema, Value};
pub use storage::format::{FormatRegistry, TabularFormat};
