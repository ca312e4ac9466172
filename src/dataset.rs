//! Tabular dataset storage for the consolidated training corpus.

use crate::error::{PipelineError, Result};
use crate::types::Record;
use std::fs;
use std::path::Path;
use tracing::debug;

/// An ordered, append-only collection of rows sharing one header.
///
/// Rows keep whatever columns they arrived with; a column seen for the first
/// time is appended to the header and reads back empty for older rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    header: Vec<String>,
    rows: Vec<Record>,
}

impl Dataset {
    /// Create an empty dataset with the given header.
    pub fn with_header(header: Vec<String>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    /// Build a dataset from rows, deriving the header in order of first
    /// appearance.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut dataset = Self::default();
        dataset.append(records);
        dataset
    }

    /// Append rows after the existing ones, preserving their order.
    ///
    /// No validation and no deduplication: the same row appended twice is
    /// stored twice.
    pub fn append(&mut self, records: Vec<Record>) {
        for record in &records {
            for column in record.keys() {
                if !self.header.iter().any(|h| h == column) {
                    self.header.push(column.clone());
                }
            }
        }
        self.rows.extend(records);
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the header contains `column`.
    pub fn has_column(&self, column: &str) -> bool {
        self.header.iter().any(|h| h == column)
    }

    /// Read a CSV file with a header row.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let wrap = |source| PipelineError::Dataset {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::Reader::from_path(path).map_err(wrap)?;
        let header: Vec<String> = reader
            .headers()
            .map_err(wrap)?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let row = result.map_err(wrap)?;
            let record: Record = header
                .iter()
                .cloned()
                .zip(row.iter().map(str::to_string))
                .collect();
            rows.push(record);
        }

        debug!(path = %path.display(), rows = rows.len(), columns = header.len(), "Dataset loaded");
        Ok(Self { header, rows })
    }

    /// Write the dataset as CSV, replacing `path` only once the new file is
    /// complete.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let wrap = |source| PipelineError::Dataset {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp).map_err(wrap)?;
            writer.write_record(&self.header).map_err(wrap)?;
            for row in &self.rows {
                let cells = self
                    .header
                    .iter()
                    .map(|column| row.get(column).map(String::as_str).unwrap_or(""));
                writer.write_record(cells).map_err(wrap)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;

        debug!(path = %path.display(), rows = self.rows.len(), "Dataset written");
        Ok(())
    }
}
