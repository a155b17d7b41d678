use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tabledesk")]
#[command(author, version, about = "Design SQLite tables, move data between CSV/TSV/Excel files and SQLite, run SQL and chart the results")]
pub struct Cli {
    /// SQLite database file to open (created if missing)
    pub database: Option<PathBuf>,

    /// Execute a SQL query directly (non-interactive mode)
    #[arg(short, long, requires = "database")]
    pub query: Option<String>,

    /// Output format for --query
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,

    /// Import a .csv, .txt (tab-separated), .xls or .xlsx file into the database
    #[arg(long, value_name = "FILE", requires = "database")]
    pub import: Option<PathBuf>,

    /// Export every table to a .csv, .txt, .xls or .xlsx file
    #[arg(long, value_name = "FILE", requires = "database")]
    pub export: Option<PathBuf>,

    /// Print every table with its columns and declared types
    #[arg(long, requires = "database")]
    pub schema: bool,

    /// Print a bar chart of a query's numeric columns
    #[arg(long, value_name = "SQL", requires = "database")]
    pub chart: Option<String>,

    /// Write log output to this file (the interactive UI only logs when this is set)
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log filter, e.g. "info" or "tabledesk=debug" (falls back to RUST_LOG, then "warn")
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl Cli {
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// True when any flag asks for a one-shot action instead of the UI.
    pub fn is_batch(&self) -> bool {
        self.query.is_some()
            || self.import.is_some()
            || self.export.is_some()
            || self.schema
            || self.chart.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_mode() {
        let cli = Cli::try_parse_from(["tabledesk", "app.db", "-q", "SELECT 1", "-f", "json"]).unwrap();
        assert_eq!(cli.database, Some(PathBuf::from("app.db")));
        assert_eq!(cli.query.as_deref(), Some("SELECT 1"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.is_batch());
    }

    #[test]
    fn test_interactive_without_flags() {
        let cli = Cli::try_parse_from(["tabledesk"]).unwrap();
        assert!(cli.database.is_none());
        assert!(!cli.is_batch());
        assert_eq!(cli.format, OutputFormat::Table);
    }

    #[test]
    fn test_batch_flags_require_database() {
        assert!(Cli::try_parse_from(["tabledesk", "--schema"]).is_err());
        assert!(Cli::try_parse_from(["tabledesk", "--import", "a.csv"]).is_err());
    }
}
