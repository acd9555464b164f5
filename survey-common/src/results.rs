//! Per-questionnaire result logs
//!
//! One semicolon-delimited file per questionnaire. The header
//! (`date;user_id;user_name;user_email;<keys…>`) is written once, when the
//! file is created; rows are only ever appended.

use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing::{debug, warn};

use crate::questions::{Answers, Question};
use crate::Result;

/// Columns preceding the per-question columns
pub const FIXED_COLUMNS: [&str; 4] = ["date", "user_id", "user_name", "user_email"];

/// Field delimiter of result logs
pub const DELIMITER: u8 = b';';

/// Format of the `date` column
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Identity recorded with each row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitter {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// Parsed result log, as shown on the admin results page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultTable {
    pub fieldnames: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Header row for a question set
pub fn header_for(questions: &[Question]) -> Vec<String> {
    FIXED_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(questions.iter().map(|q| q.key.clone()))
        .collect()
}

/// Append one validated answer row
///
/// Creates the parent directory and writes the header when the file does
/// not exist yet. Missing answers become empty cells.
pub fn append_row(
    path: &Path,
    questions: &[Question],
    answers: &Answers,
    submitter: &Submitter,
    date: NaiveDate,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let header = header_for(questions);
    let file_exists = path.exists();

    if file_exists {
        if let Some(existing) = read_header(path)? {
            if existing != header {
                warn!(
                    "Result log {} was created for a different question set \
                     (header {:?}, current {:?})",
                    path.display(),
                    existing,
                    header
                );
            }
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .from_writer(file);

    if !file_exists {
        writer.write_record(&header)?;
    }

    let mut row = vec![
        date.format(DATE_FORMAT).to_string(),
        submitter.id.to_string(),
        submitter.name.clone(),
        submitter.email.clone(),
    ];
    row.extend(
        questions
            .iter()
            .map(|q| answers.get(&q.key).unwrap_or_default().to_string()),
    );

    writer.write_record(&row)?;
    writer.flush()?;

    debug!("Appended result row to {}", path.display());
    Ok(())
}

/// Read a result log; `None` when it does not exist
///
/// Rows are padded or truncated to the header width.
pub fn read_table(path: &Path) -> Result<Option<ResultTable>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .flexible(true)
        .from_path(path)?;

    let fieldnames: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let width = fieldnames.len();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row: Vec<String> = record.iter().take(width).map(str::to_string).collect();
        row.resize(width, String::new());
        rows.push(row);
    }

    Ok(Some(ResultTable { fieldnames, rows }))
}

fn read_header(path: &Path) -> Result<Option<Vec<String>>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(DELIMITER)
        .flexible(true)
        .from_path(path)?;
    let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    Ok((!header.is_empty()).then_some(header))
}
