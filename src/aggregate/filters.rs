/// Membership filters and projections
use super::{cell_text, rows_equal};
use crate::column::{Column, ColumnType};
use crate::config::KEGG_GENE_COLUMN;
use crate::error::{processing_failure, Result};
use crate::table::Table;
use std::collections::{BTreeMap, HashSet};

/// Keep rows whose value in each filtered column is one of the given values.
///
/// Filters are ANDed. A filter with an empty value list puts no restriction
/// on its column; with no active filter the input comes back unchanged.
/// NULL cells never match.
pub fn filter_by_values(table: &Table, filters: &[(&str, &[String])]) -> Result<Table> {
    let active: Vec<(&str, &[String])> = filters.iter().filter(|(_, values)| !values.is_empty()).copied().collect();
    if active.is_empty() {
        return Ok(table.clone());
    }

    let required: Vec<&str> = active.iter().map(|(column, _)| *column).collect();
    table.require(&required)?;

    let context = format!("Filtering '{}' on {}", table.name(), required.join(", "));
    let mut checks: Vec<(&Column, HashSet<&str>)> = Vec::with_capacity(active.len());
    for (column, values) in &active {
        let col = table.column(column).map_err(processing_failure(context.clone()))?;
        checks.push((col, values.iter().map(String::as_str).collect()));
    }

    let filtered = table
        .filter(|i| {
            for (col, allowed) in &checks {
                match cell_text(col, i)? {
                    Some(text) if allowed.contains(&*text) => {}
                    _ => return Ok(false),
                }
            }
            Ok(true)
        })
        .map_err(processing_failure(context.clone()))?;

    log::info!("{}: {} of {} rows kept", context, filtered.len(), table.len());
    Ok(filtered)
}

/// Restrict to the selected compound names and/or gene symbols
pub fn filter_by_fields(table: &Table, compounds: Option<&[String]>, genes: Option<&[String]>) -> Result<Table> {
    filter_by_values(
        table,
        &[("compoundname", compounds.unwrap_or(&[])), ("genesymbol", genes.unwrap_or(&[]))],
    )
}

/// Restrict to the selected samples and/or gene symbols
pub fn filter_by_samples_and_genes(table: &Table, samples: Option<&[String]>, genes: Option<&[String]>) -> Result<Table> {
    filter_by_values(
        table,
        &[("sample", samples.unwrap_or(&[])), ("genesymbol", genes.unwrap_or(&[]))],
    )
}

/// Rows whose `compoundclass` equals `selected`.
///
/// An empty input or no selection gives an empty table with the input's
/// columns, whatever the table holds.
pub fn filter_by_category(table: &Table, selected: Option<&str>) -> Result<Table> {
    let selected = match selected {
        Some(value) if !table.is_empty() => value,
        _ => return Ok(table.empty_like()),
    };
    table.require(&["compoundclass"])?;
    rows_equal(table, "compoundclass", selected)
}

/// Distinct `(sample, genesymbol)` pairs on `pathway`.
///
/// Gene symbols come from the pathway map: its renamed `kegg_genesymbol`
/// column when the enriched table carries one, plain `genesymbol` otherwise.
/// An unknown pathway gives an empty table with exactly those two columns.
pub fn ko_per_sample_pathway(enriched: &Table, pathway: &str) -> Result<Table> {
    let gene_column = if enriched.has_column(KEGG_GENE_COLUMN) { KEGG_GENE_COLUMN } else { "genesymbol" };
    enriched.require(&["sample", gene_column, "pathname"])?;

    let on_pathway = rows_equal(enriched, "pathname", pathway)?;
    if on_pathway.is_empty() {
        log::warn!("No data for pathway '{}'", pathway);
        return empty_string_table("ko_per_sample_pathway", &["sample", "genesymbol"]);
    }

    let mut renames = BTreeMap::new();
    renames.insert(gene_column.to_string(), "genesymbol".to_string());
    let result = on_pathway
        .project(&["sample", gene_column])
        .and_then(|t| t.rename_columns(&renames))
        .and_then(|t| t.distinct())
        .map_err(processing_failure(format!("Projecting pathway '{}'", pathway)))?;
    log::info!("Pathway '{}': {} sample/gene pairs", pathway, result.len());
    Ok(result.with_name("ko_per_sample_pathway"))
}

/// Rows of the selected samples, unique on `(sample, ko)`
pub fn sample_ko_pairs(table: &Table, samples: &[String]) -> Result<Table> {
    table.require(&["sample", "ko"])?;
    let selected = filter_by_values(table, &[("sample", samples)])?;
    if samples.is_empty() {
        return Ok(selected.empty_like());
    }
    selected
        .distinct_on(&["sample", "ko"])
        .map_err(processing_failure("Dropping duplicate sample/KO pairs"))
}

/// Distinct `(genesymbol, compoundname)` pairs with both values present
pub fn gene_compound_pairs(table: &Table) -> Result<Table> {
    table.require(&["genesymbol", "compoundname"])?;
    let context = "Collecting gene/compound pairs";

    let pairs = table
        .project(&["genesymbol", "compoundname"])
        .map_err(processing_failure(context))?;
    let gene = pairs.column("genesymbol").map_err(processing_failure(context))?;
    let compound = pairs.column("compoundname").map_err(processing_failure(context))?;

    pairs
        .filter(|i| Ok(!gene.is_null_at(i) && !compound.is_null_at(i)))
        .and_then(|t| t.distinct())
        .map(|t| t.with_name("gene_compound_pairs"))
        .map_err(processing_failure(context))
}

fn empty_string_table(name: &str, columns: &[&str]) -> Result<Table> {
    let columns = columns
        .iter()
        .map(|c| Column::new(c.to_string(), ColumnType::String, false))
        .collect();
    Table::from_columns(name.to_string(), columns).map_err(processing_failure(format!("Building '{}'", name)))
}
