/// Sample input parser
///
/// Turns the multi-sample KO text into `SampleRecord`s:
///
/// ```text
/// >Sample1
/// K00001
/// K00002
///
/// >Sample2
/// K00001
/// ```
///
/// A `>` line opens a sample, each `K<digits>` line adds one record to the
/// open sample, blank lines are skipped. Codes seen before the first header
/// are dropped without error. Anything else aborts with a format error that
/// quotes the offending line. Duplicates are kept.

use crate::column::{Column, ColumnType, ColumnValue};
use crate::config::{Config, INPUT_EXTENSION};
use crate::error::{Error, Result};
use crate::table::Table;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

/// One (sample, KO code) occurrence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SampleRecord {
    pub sample: String,
    pub code: String,
}

impl SampleRecord {
    pub fn new(sample: impl Into<String>, code: impl Into<String>) -> Self {
        SampleRecord {
            sample: sample.into(),
            code: code.into(),
        }
    }
}

/// Compiled line patterns
struct LinePatterns {
    header: Regex,
    code: Regex,
}

impl LinePatterns {
    fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::processing("Compiling sample line pattern", e))
        };
        Ok(LinePatterns {
            header: compile(r"^>(.+)$")?,
            code: compile(r"^K\d+$")?,
        })
    }
}

/// Parse sample text into records, in input order.
///
/// # Examples
///
/// ```
/// use biorempp::{parse_samples, SampleRecord};
///
/// let records = parse_samples(">S1\nK00001\nK00002\n>S2\nK00001").unwrap();
/// assert_eq!(records, vec![
///     SampleRecord::new("S1", "K00001"),
///     SampleRecord::new("S1", "K00002"),
///     SampleRecord::new("S2", "K00001"),
/// ]);
/// ```
pub fn parse_samples(text: &str) -> Result<Vec<SampleRecord>> {
    let patterns = LinePatterns::new()?;
    let mut records = Vec::new();
    let mut current_sample: Option<String> = None;

    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(caps) = patterns.header.captures(trimmed) {
            let name = caps.get(1).map_or("", |m| m.as_str().trim());
            if !name.is_empty() {
                log::debug!("line {}: sample '{}'", index + 1, name);
                current_sample = Some(name.to_string());
                continue;
            }
        } else if patterns.code.is_match(trimmed) {
            match &current_sample {
                Some(sample) => records.push(SampleRecord::new(sample.clone(), trimmed)),
                None => log::debug!("line {}: '{}' precedes any sample header, skipped", index + 1, trimmed),
            }
            continue;
        }

        let err = Error::format(format!(
            "Invalid format at line {}: '{}'. Expected '>' for sample ID or 'Kxxxxx' for KO entries.",
            index + 1,
            line
        ));
        log::error!("{}", err);
        return Err(err);
    }

    if records.is_empty() {
        let err = Error::format("No valid sample or KO entries found in the input.");
        log::error!("{}", err);
        return Err(err);
    }

    log::info!("Parsed {} KO records", records.len());
    Ok(records)
}

/// Read and parse a sample file.
///
/// The file must carry the `.txt` extension and must not exceed
/// `config.max_input_bytes`.
pub fn parse_sample_file(path: &Path, config: &Config) -> Result<Vec<SampleRecord>> {
    let has_txt_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext == INPUT_EXTENSION);
    if !has_txt_extension {
        return Err(Error::format(format!(
            "The file '{}' is not a .{} file.",
            path.display(),
            INPUT_EXTENSION
        )));
    }

    if !path.exists() {
        return Err(Error::FileAccess {
            path: path.to_path_buf(),
        });
    }

    let size = std::fs::metadata(path)
        .map_err(|e| Error::format_with(format!("Cannot read '{}'", path.display()), e))?
        .len();
    if size > config.max_input_bytes {
        return Err(Error::format(format!(
            "The file '{}' is {} bytes; the limit is {} bytes.",
            path.display(),
            size,
            config.max_input_bytes
        )));
    }

    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::format_with(format!("Cannot read '{}'", path.display()), e))?;
    parse_samples(&text)
}

/// Build the `sample, ko` base table of the join.
pub fn records_to_table(records: &[SampleRecord]) -> Result<Table> {
    let mut sample = Column::with_capacity("sample".to_string(), ColumnType::String, false, records.len());
    let mut ko = Column::with_capacity("ko".to_string(), ColumnType::String, false, records.len());

    for record in records {
        sample
            .append(ColumnValue::from(record.sample.as_str()))
            .map_err(|e| Error::processing("Building sample table", e))?;
        ko.append(ColumnValue::from(record.code.as_str()))
            .map_err(|e| Error::processing("Building sample table", e))?;
    }

    Table::from_columns("records".to_string(), vec![sample, ko])
        .map_err(|e| Error::processing("Building sample table", e))
}
