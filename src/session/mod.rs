mod convert;
mod database;
mod schema;

pub use convert::quote_ident;
pub use database::Session;
pub use schema::{ColumnInfo, TableStructure};
