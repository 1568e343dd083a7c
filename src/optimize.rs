/// Type optimizer
///
/// Recasts low-cardinality string columns to categorical storage before the
/// join stage. Values and row order are untouched, so joins and aggregations
/// give the same results with or without it.

use crate::loader::ReferenceSource;
use crate::table::Table;

/// Annotation columns worth recasting
pub const GENERAL_COLUMNS: &[&str] = &[
    "ko",
    "genesymbol",
    "genename",
    "cpd",
    "compoundclass",
    "referenceAG",
    "compoundname",
    "enzyme_activity",
    "sample",
];

pub const PATHWAY_COLUMNS: &[&str] = &["ko", "pathname", "genesymbol", "sample"];

pub const DEGRADATION_COLUMNS: &[&str] = &["Gene", "ko", "Pathway", "compound_pathway", "sample"];

/// Toxicity columns worth recasting; every `label_*` column is added on top
pub const TOXICITY_COLUMNS: &[&str] = &["SMILES", "cpd", "ChEBI", "compoundname", "sample"];

/// Prefix of the toxicity label columns
pub const LABEL_PREFIX: &str = "label_";

/// Recast the named STRING columns to categorical storage.
///
/// Absent names and non-string columns are skipped.
pub fn optimize(table: &Table, columns: &[&str]) -> Table {
    let mut recast = Vec::new();
    let optimized: Vec<_> = table
        .columns()
        .iter()
        .map(|col| {
            if columns.contains(&col.name()) && !col.is_categorical() {
                let categorical = col.to_categorical();
                if let Some(dictionary) = categorical.dictionary() {
                    let stats = dictionary.stats();
                    recast.push(format!(
                        "{} ({} categories, {} rows, ~{} bytes)",
                        col.name(),
                        stats.unique_strings,
                        stats.total_references,
                        stats.memory_bytes
                    ));
                }
                categorical
            } else {
                col.clone()
            }
        })
        .collect();

    if recast.is_empty() {
        return table.clone();
    }

    log::debug!("'{}': categorical columns {}", table.name(), recast.join("; "));

    match Table::from_columns(table.name().to_string(), optimized) {
        Ok(result) => result,
        Err(e) => {
            // Recasting keeps names and lengths, so this only fires on a broken input table.
            log::warn!("'{}' left unoptimized: {}", table.name(), e);
            table.clone()
        }
    }
}

/// Column preset of a reference source
pub fn preset(table: &Table, source: ReferenceSource) -> Vec<String> {
    let base = match source {
        ReferenceSource::Annotation => GENERAL_COLUMNS,
        ReferenceSource::PathwayMap => PATHWAY_COLUMNS,
        ReferenceSource::DegradationMap => DEGRADATION_COLUMNS,
        ReferenceSource::Toxicity => TOXICITY_COLUMNS,
    };

    let mut columns: Vec<String> = base.iter().map(|c| c.to_string()).collect();
    if source == ReferenceSource::Toxicity {
        columns.extend(
            table
                .column_names()
                .into_iter()
                .filter(|name| name.starts_with(LABEL_PREFIX))
                .map(str::to_string),
        );
    }
    columns
}

/// Apply the preset of `source` to its table
pub fn optimize_source(table: &Table, source: ReferenceSource) -> Table {
    let columns = preset(table, source);
    let names: Vec<&str> = columns.iter().map(String::as_str).collect();
    optimize(table, &names)
}
