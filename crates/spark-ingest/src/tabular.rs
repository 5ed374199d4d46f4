//! Tabular input
//!
//! Reads CSV with a header row. Header names are lower-cased and trimmed;
//! cells are passed through untouched. The reader is flexible about row
//! length so that short or long rows surface as row errors during mapping
//! instead of aborting the whole read.

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::document::RowError;
use crate::error::{IngestError, IngestResult};

/// One data row with its position in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularRow {
    /// 1-based line number; the header is line 1
    pub line: u64,
    pub cells: Vec<String>,
}

impl TabularRow {
    pub fn new(line: u64, cells: Vec<impl Into<String>>) -> Self {
        Self {
            line,
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }
}

/// Normalize header names and reject unusable headers
pub fn normalize_headers<S: AsRef<str>>(raw: &[S]) -> IngestResult<Vec<String>> {
    let headers: Vec<String> = raw
        .iter()
        .map(|h| h.as_ref().trim().to_lowercase())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(IngestError::EmptyHeader);
    }

    let mut seen = HashSet::new();
    for header in &headers {
        if !seen.insert(header.as_str()) {
            return Err(IngestError::DuplicateColumn(header.clone()));
        }
    }

    Ok(headers)
}

/// CSV source with its header already consumed
pub struct TabularReader<R: Read> {
    headers: Vec<String>,
    records: StringRecordsIntoIter<R>,
}

impl TabularReader<File> {
    pub fn from_path(path: &Path) -> IngestResult<Self> {
        let file = File::open(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }
}

impl<R: Read> TabularReader<R> {
    pub fn from_reader(reader: R) -> IngestResult<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let raw: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let headers = normalize_headers(&raw)?;

        Ok(Self {
            headers,
            records: reader.into_records(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Split into the header and a one-pass iterator over the data rows
    pub fn into_parts(self) -> (Vec<String>, TabularRows<R>) {
        (
            self.headers,
            TabularRows {
                records: self.records,
                next_line: 2,
            },
        )
    }
}

/// Lazy, one-pass iterator over data rows
pub struct TabularRows<R: Read> {
    records: StringRecordsIntoIter<R>,
    next_line: u64,
}

fn record_line(record: &StringRecord, fallback: u64) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(fallback)
}

impl<R: Read> Iterator for TabularRows<R> {
    type Item = Result<TabularRow, RowError>;

    fn next(&mut self) -> Option<Self::Item> {
        let fallback = self.next_line;
        let item = match self.records.next()? {
            Ok(record) => {
                let line = record_line(&record, fallback);
                self.next_line = line + 1;
                Ok(TabularRow {
                    line,
                    cells: record.iter().map(str::to_string).collect(),
                })
            },
            Err(err) => {
                let line = err.position().map(|p| p.line()).unwrap_or(fallback);
                self.next_line = line + 1;
                Err(RowError::Unreadable {
                    line,
                    reason: err.to_string(),
                })
            },
        };
        Some(item)
    }
}
