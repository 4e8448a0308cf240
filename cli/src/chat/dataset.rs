//! # Reference Table Loading
//!
//! File: cli/src/chat/dataset.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Loads the CSV knowledge table that Statbot answers from. The file is read
//! exactly once at startup and the resulting `ReferenceTable` is shared
//! read-only for the lifetime of the process.
//!
//! Loading never fails the process. A missing or unreadable file is logged and
//! reported as "no table" (`None`); the prompt then carries no reference data.
//!
//! ## Format
//!
//! - UTF-8, with or without a leading byte-order mark
//! - comma separated, first record is the header row
//! - quoted fields may contain commas, line breaks and doubled quotes (`""`)
//! - short records are padded with empty cells; long records are rejected
//! - records whose cells are all empty are dropped
//!
use crate::core::error::StatbotError;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};

/// One record of the reference table, one text cell per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRow {
    cells: Vec<String>,
}

impl ReferenceRow {
    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    pub fn get(&self, column: usize) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }
}

/// The in-memory knowledge table. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTable {
    columns: Vec<String>,
    rows: Vec<ReferenceRow>,
}

impl ReferenceTable {
    /// Parses CSV text (BOM already stripped) into a table.
    pub fn parse(content: &str) -> Result<Self, String> {
        let mut records = parse_records(content)?.into_iter();
        let header = records
            .next()
            .ok_or_else(|| "no header row".to_string())?;
        let columns = unique_column_names(header);

        let mut rows = Vec::new();
        for (index, mut cells) in records.enumerate() {
            if cells.len() > columns.len() {
                return Err(format!(
                    "data record {} has {} fields, expected at most {}",
                    index + 1,
                    cells.len(),
                    columns.len()
                ));
            }
            if cells.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            cells.resize(columns.len(), String::new());
            rows.push(ReferenceRow { cells });
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[ReferenceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the header and the first `max_rows` rows as a fixed-width text table.
    ///
    /// Cells are right-aligned to the widest value of their column and columns
    /// are separated by two spaces. Line breaks inside cells become spaces so
    /// every row stays on one line.
    pub fn render(&self, max_rows: usize) -> String {
        let shown = &self.rows[..self.rows.len().min(max_rows)];
        let flatten = |text: &str| -> String {
            text.replace("\r\n", " ").replace(['\n', '\r'], " ")
        };

        let header: Vec<String> = self.columns.iter().map(|c| flatten(c)).collect();
        let body: Vec<Vec<String>> = shown
            .iter()
            .map(|row| row.cells.iter().map(|c| flatten(c)).collect())
            .collect();

        let widths: Vec<usize> = (0..header.len())
            .map(|col| {
                body.iter()
                    .map(|cells| cells[col].chars().count())
                    .chain(std::iter::once(header[col].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let format_line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:>width$}", cell, width = *width))
                .collect::<Vec<_>>()
                .join("  ")
        };

        let mut lines = Vec::with_capacity(body.len() + 1);
        lines.push(format_line(&header));
        lines.extend(body.iter().map(|cells| format_line(cells)));
        lines.join("\n")
    }
}

/// Reads and parses the reference table, reporting why it could not be loaded.
pub fn read_reference_table(path: &Path) -> Result<ReferenceTable, StatbotError> {
    let bytes = fs::read(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            StatbotError::DatasetNotFound {
                path: path.to_path_buf(),
            }
        } else {
            StatbotError::DatasetParse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        }
    })?;

    let text = String::from_utf8(bytes).map_err(|e| StatbotError::DatasetParse {
        path: path.to_path_buf(),
        reason: format!("file is not valid UTF-8 ({})", e.utf8_error()),
    })?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    ReferenceTable::parse(text).map_err(|reason| StatbotError::DatasetParse {
        path: path.to_path_buf(),
        reason,
    })
}

/// Startup loader: logs the outcome and degrades to `None` on any failure.
pub fn load_reference_table(path: &Path) -> Option<ReferenceTable> {
    match read_reference_table(path) {
        Ok(table) => {
            info!(
                "Loaded reference data from {}: {} rows, {} columns",
                path.display(),
                table.len(),
                table.columns().len()
            );
            info!("Columns: {:?}", table.columns());
            Some(table)
        }
        Err(StatbotError::DatasetNotFound { .. }) => {
            warn!(
                "Reference data file {} not found; answering without reference data.",
                path.display()
            );
            None
        }
        Err(e) => {
            warn!("{}; answering without reference data.", e);
            None
        }
    }
}

fn parse_records(content: &str) -> Result<Vec<Vec<String>>, String> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut field_quoted = false;
    let mut chars = content.chars().peekable();

    let finish_record = |record: &mut Vec<String>,
                         field: &mut String,
                         field_quoted: &mut bool,
                         records: &mut Vec<Vec<String>>| {
        let blank_line = record.is_empty() && field.is_empty() && !*field_quoted;
        record.push(std::mem::take(field));
        *field_quoted = false;
        let done = std::mem::take(record);
        if !blank_line {
            records.push(done);
        }
    };

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' if field.is_empty() && !field_quoted => {
                in_quotes = true;
                field_quoted = true;
            }
            ',' => {
                record.push(std::mem::take(&mut field));
                field_quoted = false;
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                finish_record(&mut record, &mut field, &mut field_quoted, &mut records);
            }
            '\n' => finish_record(&mut record, &mut field, &mut field_quoted, &mut records),
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    if !record.is_empty() || !field.is_empty() || field_quoted {
        finish_record(&mut record, &mut field, &mut field_quoted, &mut records);
    }
    Ok(records)
}

fn unique_column_names(header: Vec<String>) -> Vec<String> {
    let mut columns: Vec<String> = Vec::with_capacity(header.len());
    for (index, name) in header.into_iter().enumerate() {
        let base = if name.is_empty() {
            format!("Unnamed: {}", index)
        } else {
            name
        };
        let mut candidate = base.clone();
        let mut suffix = 1;
        while columns.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        columns.push(candidate);
    }
    columns
}
