/// Dropdown option extraction
use crate::error::{processing_failure, Result};
use crate::table::Table;
use serde::Serialize;
use std::collections::BTreeSet;

/// One `{label, value}` entry of a selection list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropdownOption {
    pub label: String,
    pub value: String,
}

impl DropdownOption {
    pub fn new(value: &str) -> Self {
        DropdownOption {
            label: value.to_string(),
            value: value.to_string(),
        }
    }
}

/// Sorted, distinct, non-null values of `field`.
///
/// Values sort by their typed order, so numeric columns come out numerically.
/// An empty table or an absent field gives an empty list.
pub fn extract_categorical_values(table: &Table, field: &str) -> Result<Vec<String>> {
    if table.is_empty() || !table.has_column(field) {
        log::warn!("No '{}' values in '{}'", field, table.name());
        return Ok(Vec::new());
    }

    let context = format!("Extracting '{}' values", field);
    let column = table.column(field).map_err(processing_failure(context.clone()))?;

    let mut keys = BTreeSet::new();
    for i in 0..table.len() {
        let key = column.key(i).map_err(processing_failure(context.clone()))?;
        if !key.is_null() {
            keys.insert(key);
        }
    }
    Ok(keys.iter().map(|k| k.to_value().to_string()).collect())
}

/// Distinct compound classes, sorted
pub fn compound_classes(table: &Table) -> Result<Vec<String>> {
    extract_categorical_values(table, "compoundclass")
}

/// Sorted, distinct, non-null values of `field` as `{label, value}` pairs.
///
/// An empty table or an absent field gives an empty list.
pub fn dropdown_options(table: &Table, field: &str) -> Result<Vec<DropdownOption>> {
    Ok(extract_categorical_values(table, field)?
        .iter()
        .map(|v| DropdownOption::new(v))
        .collect())
}

/// Sample and gene option lists of the sample/gene view.
///
/// An empty table gives two empty lists; otherwise `sample` and `genesymbol`
/// are required.
pub fn sample_gene_options(table: &Table) -> Result<(Vec<DropdownOption>, Vec<DropdownOption>)> {
    if table.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }
    table.require(&["sample", "genesymbol"])?;
    Ok((dropdown_options(table, "sample")?, dropdown_options(table, "genesymbol")?))
}
