/// Reference table loading
///
/// Reads delimited text (`.csv`, `.tsv`, `.txt`) and, with the `spreadsheet`
/// feature, the first worksheet of `.xlsx`/`.xls`/`.xlsm`/`.ods` workbooks into
/// a `Table`. Column types are inferred from all non-empty cells; empty cells
/// are NULL and every loaded column is nullable.
///
/// The four production references are described by `ReferenceSource` and
/// loaded together by `ReferenceSet::load`.

use crate::column::{Column, ColumnType, ColumnValue};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::optimize;
use crate::table::Table;
use serde::Serialize;
use std::io::Read;
use std::path::Path;

/// Separator used by `load` for ad hoc files
pub const DEFAULT_SEPARATOR: u8 = b',';

/// The four production reference tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ReferenceSource {
    /// BioRemPP compound/KO annotation database
    Annotation,
    /// KEGG degradation pathways
    PathwayMap,
    /// HADEG degradation genes
    DegradationMap,
    /// ToxCSM toxicity predictions
    Toxicity,
}

impl ReferenceSource {
    pub fn all() -> [ReferenceSource; 4] {
        [
            ReferenceSource::Annotation,
            ReferenceSource::PathwayMap,
            ReferenceSource::DegradationMap,
            ReferenceSource::Toxicity,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReferenceSource::Annotation => "annotation",
            ReferenceSource::PathwayMap => "pathway_map",
            ReferenceSource::DegradationMap => "degradation_map",
            ReferenceSource::Toxicity => "toxicity",
        }
    }

    /// Column the source is joined on
    pub fn key_column(&self) -> &'static str {
        match self {
            ReferenceSource::Toxicity => "cpd",
            _ => "ko",
        }
    }

    /// Columns the pipeline reads from this source
    pub fn expected_columns(&self) -> &'static [&'static str] {
        match self {
            ReferenceSource::Annotation => &[
                "ko",
                "cpd",
                "desc",
                "compound",
                "compoundclass",
                "compoundname",
                "enzyme_activity",
                "genesymbol",
                "genename",
                "referenceAG",
            ],
            ReferenceSource::PathwayMap => &["ko", "pathname", "genesymbol"],
            ReferenceSource::DegradationMap => &["Gene", "ko", "Pathway", "compound_pathway"],
            ReferenceSource::Toxicity => &["cpd", "compoundname", "toxicity", "LD50"],
        }
    }

    pub fn default_file_name(&self) -> &'static str {
        match self {
            ReferenceSource::Annotation => "database.csv",
            ReferenceSource::PathwayMap => "kegg_degradation_pathways.csv",
            ReferenceSource::DegradationMap => "database_hadegDB.csv",
            ReferenceSource::Toxicity => "database_toxcsm.csv",
        }
    }
}

/// A loaded reference with its declared key column
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    source: ReferenceSource,
    table: Table,
}

impl ReferenceTable {
    /// Wrap a table as a reference, checking its key column.
    ///
    /// Absent expected columns are only reported; an absent key column is a
    /// schema error.
    pub fn new(source: ReferenceSource, table: Table) -> Result<Self> {
        let table = table.with_name(source.name());
        table.require(&[source.key_column()])?;

        let missing = table.schema().missing_columns(source.expected_columns());
        if !missing.is_empty() {
            log::warn!("Reference '{}' lacks columns: {}", source.name(), missing.join(", "));
        }

        Ok(ReferenceTable { source, table })
    }

    /// Load a reference from `path` with the given field separator.
    pub fn load(source: ReferenceSource, path: &Path, separator: u8) -> Result<Self> {
        let table = load_with(path, separator)?;
        ReferenceTable::new(source, table)
    }

    pub fn source(&self) -> ReferenceSource {
        self.source
    }

    pub fn key_column(&self) -> &'static str {
        self.source.key_column()
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Apply the source's categorical preset
    pub fn optimized(&self) -> ReferenceTable {
        ReferenceTable {
            source: self.source,
            table: optimize::optimize_source(&self.table, self.source),
        }
    }
}

/// All four references of a session
#[derive(Debug, Clone)]
pub struct ReferenceSet {
    pub annotation: ReferenceTable,
    pub pathway_map: ReferenceTable,
    pub degradation_map: ReferenceTable,
    pub toxicity: ReferenceTable,
}

impl ReferenceSet {
    /// Assemble a set from already loaded tables.
    pub fn from_tables(annotation: Table, pathway_map: Table, degradation_map: Table, toxicity: Table) -> Result<Self> {
        Ok(ReferenceSet {
            annotation: ReferenceTable::new(ReferenceSource::Annotation, annotation)?,
            pathway_map: ReferenceTable::new(ReferenceSource::PathwayMap, pathway_map)?,
            degradation_map: ReferenceTable::new(ReferenceSource::DegradationMap, degradation_map)?,
            toxicity: ReferenceTable::new(ReferenceSource::Toxicity, toxicity)?,
        })
    }

    /// Load the production references named by `config`.
    ///
    /// Applies the per-source optimizer preset when `config.optimize_types`
    /// is set.
    pub fn load(config: &Config) -> Result<Self> {
        let separator = config.separator_byte()?;
        let load_source = |source: ReferenceSource| {
            ReferenceTable::load(source, &config.reference_path(source), separator)
        };

        let set = ReferenceSet {
            annotation: load_source(ReferenceSource::Annotation)?,
            pathway_map: load_source(ReferenceSource::PathwayMap)?,
            degradation_map: load_source(ReferenceSource::DegradationMap)?,
            toxicity: load_source(ReferenceSource::Toxicity)?,
        };

        Ok(if config.optimize_types { set.optimized() } else { set })
    }

    pub fn optimized(&self) -> ReferenceSet {
        ReferenceSet {
            annotation: self.annotation.optimized(),
            pathway_map: self.pathway_map.optimized(),
            degradation_map: self.degradation_map.optimized(),
            toxicity: self.toxicity.optimized(),
        }
    }

    pub fn get(&self, source: ReferenceSource) -> &ReferenceTable {
        match source {
            ReferenceSource::Annotation => &self.annotation,
            ReferenceSource::PathwayMap => &self.pathway_map,
            ReferenceSource::DegradationMap => &self.degradation_map,
            ReferenceSource::Toxicity => &self.toxicity,
        }
    }
}

/// Load a table, using `,` for delimited text.
pub fn load(path: &Path) -> Result<Table> {
    load_with(path, DEFAULT_SEPARATOR)
}

/// Load a table, dispatching on the file extension.
pub fn load_with(path: &Path, separator: u8) -> Result<Table> {
    if !path.exists() {
        let err = Error::FileAccess {
            path: path.to_path_buf(),
        };
        log::error!("{}", err);
        return Err(err);
    }

    let name = table_name(path);
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let table = match extension.as_str() {
        "csv" | "txt" => read_file(path, &name, separator)?,
        "tsv" => read_file(path, &name, b'\t')?,
        "xlsx" | "xls" | "xlsm" | "ods" => read_spreadsheet(path, &name)?,
        other => {
            let err = Error::format(format!(
                "Unsupported file format '{}' for '{}'. Use .csv or .xlsx",
                other,
                path.display()
            ));
            log::error!("{}", err);
            return Err(err);
        }
    };

    log::info!(
        "Loaded '{}' from {} ({} rows, {} columns)",
        name,
        path.display(),
        table.len(),
        table.schema().len()
    );
    Ok(table)
}

fn table_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("table")
        .to_string()
}

fn read_file(path: &Path, name: &str, separator: u8) -> Result<Table> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::format_with(format!("Cannot open '{}'", path.display()), e))?;
    read_delimited(name, file, separator)
        .map_err(|e| match e {
            Error::Format { message, source } => Error::Format {
                message: format!("{} ({})", message, path.display()),
                source,
            },
            other => other,
        })
}

/// Read delimited text with a header row into a table.
pub fn read_delimited<R: Read>(name: &str, reader: R, separator: u8) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| Error::format_with(format!("Cannot read header of '{}'", name), e))?
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| Error::format_with(format!("Malformed row in '{}'", name), e))?;
        rows.push(record.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }

    build_table(name, headers, rows)
}

#[cfg(feature = "spreadsheet")]
fn read_spreadsheet(path: &Path, name: &str) -> Result<Table> {
    use calamine::{open_workbook_auto, Data, Reader};

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| Error::format_with(format!("Cannot open workbook '{}'", path.display()), e))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::format(format!("Workbook '{}' has no worksheet", path.display())))?
        .map_err(|e| Error::format_with(format!("Cannot read worksheet of '{}'", path.display()), e))?;

    let cell_text = |cell: &Data| match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    };

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(cell_text).collect(),
        None => return Ok(Table::empty(name)),
    };
    let data: Vec<Vec<String>> = rows.map(|row| row.iter().map(cell_text).collect()).collect();

    build_table(name, headers, data)
}

#[cfg(not(feature = "spreadsheet"))]
fn read_spreadsheet(path: &Path, _name: &str) -> Result<Table> {
    Err(Error::format(format!(
        "Cannot read '{}': spreadsheet support is disabled (enable the `spreadsheet` feature)",
        path.display()
    )))
}

/// Type and assemble raw text cells. A file without data rows yields a
/// table without columns.
fn build_table(name: &str, headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Table> {
    let rows: Vec<Vec<String>> = rows
        .into_iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .collect();

    if rows.is_empty() {
        log::warn!("'{}' has no data rows", name);
        return Ok(Table::empty(name));
    }

    let headers: Vec<String> = headers
        .into_iter()
        .enumerate()
        .map(|(i, h)| {
            let h = h.trim();
            if h.is_empty() {
                format!("Unnamed: {}", i)
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut columns = Vec::with_capacity(headers.len());
    for (i, header) in headers.iter().enumerate() {
        let cells = rows.iter().map(|row| row.get(i).map_or("", String::as_str));
        let column_type = ColumnType::infer(cells.clone());

        let mut column = Column::with_capacity(header.clone(), column_type, true, rows.len());
        for cell in cells {
            let value = ColumnValue::parse_text(cell, column_type).map_err(|message| {
                Error::format(format!("Column '{}' of '{}': {}", header, name, message))
            })?;
            column
                .append(value)
                .map_err(|e| Error::processing(format!("Loading '{}'", name), e))?;
        }
        columns.push(column);
    }

    Table::from_columns(name.to_string(), columns)
        .map_err(|e| Error::format_with(format!("Invalid header in '{}'", name), e))
}
