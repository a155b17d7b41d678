use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{DeskError, Result};

use super::csv::{CsvReader, CsvWriter};
use super::dataset::Dataset;
use super::excel;

/// A file format that datasets can be read from and written to.
pub trait TabularFormat: Send + Sync {
    fn name(&self) -> &'static str;

    /// Reads every dataset contained in the file.
    fn read(&self, path: &Path) -> Result<Vec<Dataset>>;

    /// Writes the datasets and returns the files that were produced.
    fn write(&self, datasets: &[Dataset], path: &Path) -> Result<Vec<PathBuf>>;
}

/// Comma- or tab-separated text. One dataset per file.
pub struct DelimitedFormat {
    name: &'static str,
    delimiter: char,
}

impl DelimitedFormat {
    pub fn csv() -> Self {
        Self {
            name: "CSV",
            delimiter: ',',
        }
    }

    pub fn tsv() -> Self {
        Self {
            name: "Tab-separated text",
            delimiter: '\t',
        }
    }
}

impl TabularFormat for DelimitedFormat {
    fn name(&self) -> &'static str {
        self.name
    }

    fn read(&self, path: &Path) -> Result<Vec<Dataset>> {
        let reader = CsvReader::new().with_delimiter(self.delimiter);
        Ok(vec![reader.read_file(path)?])
    }

    /// A single dataset goes to `path` itself. Several datasets each get a sibling
    /// file named `<stem>_<dataset>.<ext>` so none overwrites another.
    fn write(&self, datasets: &[Dataset], path: &Path) -> Result<Vec<PathBuf>> {
        let writer = CsvWriter::new().with_delimiter(self.delimiter);

        if let [dataset] = datasets {
            writer.write_file(dataset, path)?;
            return Ok(vec![path.to_path_buf()]);
        }

        let mut written = Vec::with_capacity(datasets.len());
        for dataset in datasets {
            let target = sibling_path(path, &dataset.name);
            writer.write_file(dataset, &target)?;
            written.push(target);
        }
        Ok(written)
    }
}

/// Excel workbooks; every worksheet is a dataset.
pub struct ExcelFormat;

impl TabularFormat for ExcelFormat {
    fn name(&self) -> &'static str {
        "Excel"
    }

    fn read(&self, path: &Path) -> Result<Vec<Dataset>> {
        Ok(excel::read_workbook(path)?)
    }

    fn write(&self, datasets: &[Dataset], path: &Path) -> Result<Vec<PathBuf>> {
        excel::write_workbook(datasets, path)?;
        Ok(vec![path.to_path_buf()])
    }
}

/// Maps lower-cased file extensions to formats.
#[derive(Clone)]
pub struct FormatRegistry {
    formats: HashMap<String, Arc<dyn TabularFormat>>,
}

impl FormatRegistry {
    pub fn empty() -> Self {
        Self {
            formats: HashMap::new(),
        }
    }

    pub fn register(&mut self, extension: &str, format: Arc<dyn TabularFormat>) {
        self.formats
            .insert(extension.trim_start_matches('.').to_lowercase(), format);
    }

    pub fn lookup(&self, path: &Path) -> Result<&dyn TabularFormat> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase())
            .ok_or_else(|| DeskError::UnsupportedFormat("(none)".to_string()))?;

        self.formats
            .get(&extension)
            .map(|f| f.as_ref())
            .ok_or_else(|| DeskError::UnsupportedFormat(format!(".{}", extension)))
    }

    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.formats.keys().cloned().collect();
        extensions.sort();
        extensions
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        let excel: Arc<dyn TabularFormat> = Arc::new(ExcelFormat);
        registry.register("csv", Arc::new(DelimitedFormat::csv()));
        registry.register("txt", Arc::new(DelimitedFormat::tsv()));
        registry.register("xls", excel.clone());
        registry.register("xlsx", excel);
        registry
    }
}

fn sibling_path(path: &Path, dataset: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("export");
    let file_name = match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, dataset, ext),
        None => format!("{}_{}", stem, dataset),
    };
    path.with_file_name(file_name)
}
