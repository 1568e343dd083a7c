/// Rankings: one distinct count per entity, largest first.
///
/// Ties keep key order since the sort is stable.
use super::{grouped_distinct_count, sort_descending};
use crate::error::Result;
use crate::table::Table;

fn rank(table: &Table, entity: &str, counted: &str, count_name: &str, output_name: &str) -> Result<Table> {
    table.require(&[entity, counted])?;
    let counts = grouped_distinct_count(table, &[entity], counted, count_name, output_name)?;
    sort_descending(counts, count_name)
}

/// Compounds by number of distinct samples (`num_samples`)
pub fn compound_ranking(table: &Table) -> Result<Table> {
    rank(table, "compoundname", "sample", "num_samples", "compound_ranking")
}

/// Compounds by number of distinct genes (`num_genes`)
pub fn compound_gene_ranking(table: &Table) -> Result<Table> {
    rank(table, "compoundname", "genesymbol", "num_genes", "compound_gene_ranking")
}

/// Samples by number of distinct compounds (`num_compounds`)
pub fn sample_ranking(table: &Table) -> Result<Table> {
    rank(table, "sample", "compoundname", "num_compounds", "sample_ranking")
}
