/// Aggregation layer
///
/// Stateless views over the enriched table and the toxicity projection:
/// dropdown options, membership filters, grouped distinct counts, rankings,
/// sample grouping, sample clustering and the long toxicity table. Every
/// operation checks its required columns before reading any row and fails
/// with `Error::Schema` naming all of the missing ones.
///
/// Grouping follows one convention throughout: groups come out ordered by
/// key, rows with a NULL grouping value are ignored, and distinct counts
/// skip NULLs.

pub mod clustering;
pub mod counts;
pub mod filters;
pub mod groups;
pub mod options;
pub mod rankings;
pub mod toxicity;

pub use clustering::{cluster_samples, sample_ko_matrix, DistanceMetric, Linkage, Merge, SampleClustering};
pub use counts::{
    enzyme_activity_counts, gene_sample_counts, ko_count_for_pathway, ko_count_per_pathway, ko_count_per_sample,
    pathway_compound_counts, sample_reference_matrix,
};
pub use filters::{
    filter_by_category, filter_by_fields, filter_by_samples_and_genes, filter_by_values, gene_compound_pairs,
    ko_per_sample_pathway, sample_ko_pairs,
};
pub use groups::{group_samples_by_class, minimize_groups};
pub use options::{dropdown_options, extract_categorical_values, sample_gene_options, DropdownOption};
pub use rankings::{compound_gene_ranking, compound_ranking, sample_ranking};
pub use toxicity::toxicity_heatmap;

use crate::column::{Column, ColumnType, ColumnValue, ValueKey};
use crate::error::{processing_failure, Result, TableError};
use crate::table::{SortKey, Table};
use std::borrow::Cow;
use std::collections::HashSet;

/// Text of a cell; NULL is None
pub(crate) fn cell_text(column: &Column, row: usize) -> std::result::Result<Option<Cow<'_, str>>, TableError> {
    Ok(match column.key(row)? {
        ValueKey::Null => None,
        ValueKey::Str(s) => Some(Cow::Borrowed(s)),
        other => Some(Cow::Owned(other.to_value().to_string())),
    })
}

/// Number of distinct non-null values of `column` over `rows`
pub(crate) fn count_distinct(column: &Column, rows: &[usize]) -> std::result::Result<usize, TableError> {
    let mut seen = HashSet::with_capacity(rows.len());
    for &row in rows {
        let key = column.key(row)?;
        if !key.is_null() {
            seen.insert(key);
        }
    }
    Ok(seen.len())
}

/// Group `table` by `group_columns` and count distinct non-null values of
/// `counted` per group into `count_name`.
///
/// Output columns are the grouping columns followed by the INT64 count,
/// one row per group in key order. An empty input gives an empty table with
/// the same columns.
pub(crate) fn grouped_distinct_count(
    table: &Table,
    group_columns: &[&str],
    counted: &str,
    count_name: &str,
    output_name: &str,
) -> Result<Table> {
    let context = format!("Counting distinct '{}' per {}", counted, group_columns.join(", "));
    let fail = || processing_failure(context.clone());

    let groups = table.group_by(group_columns).map_err(fail())?;
    let counted_col = table.column(counted).map_err(fail())?;

    let mut key_values: Vec<Vec<ColumnValue>> = vec![Vec::with_capacity(groups.len()); group_columns.len()];
    let mut counts = Vec::with_capacity(groups.len());
    for (key, rows) in &groups {
        for (slot, value) in key_values.iter_mut().zip(key.iter()) {
            slot.push(value.to_value());
        }
        counts.push(ColumnValue::Int64(count_distinct(counted_col, rows).map_err(fail())? as i64));
    }

    let mut columns = Vec::with_capacity(group_columns.len() + 1);
    for (name, values) in group_columns.iter().zip(key_values) {
        let column_type = table.column(name).map_err(fail())?.column_type();
        columns.push(Column::from_values(name, column_type, false, values).map_err(fail())?);
    }
    columns.push(Column::from_values(count_name, ColumnType::Int64, false, counts).map_err(fail())?);

    let result = Table::from_columns(output_name.to_string(), columns).map_err(fail())?;
    log::info!("{}: {} groups", context, result.len());
    Ok(result)
}

/// Stable descending sort on one count column
pub(crate) fn sort_descending(table: Table, column: &str) -> Result<Table> {
    table
        .sort_by(&[SortKey::descending(column)])
        .map_err(processing_failure(format!("Sorting '{}' by '{}'", table.name(), column)))
}

/// Rows whose `column` equals `value`
pub(crate) fn rows_equal(table: &Table, column: &str, value: &str) -> Result<Table> {
    let context = format!("Filtering '{}' on '{}'", table.name(), column);
    let col = table.column(column).map_err(processing_failure(context.clone()))?;
    table
        .filter(|i| Ok(cell_text(col, i)?.as_deref() == Some(value)))
        .map_err(processing_failure(context))
}

/// Empty table with the given STRING columns followed by one INT64 column
pub(crate) fn empty_counts(name: &str, keys: &[&str], count: &str) -> Result<Table> {
    let mut columns: Vec<Column> = keys
        .iter()
        .map(|k| Column::new(k.to_string(), ColumnType::String, false))
        .collect();
    columns.push(Column::new(count.to_string(), ColumnType::Int64, false));
    Table::from_columns(name.to_string(), columns).map_err(processing_failure(format!("Building '{}'", name)))
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::column::{ColumnType, ColumnValue};
    use crate::table::{Schema, Table};

    /// STRING table; empty cells are NULL
    pub fn table(name: &str, columns: &[&str], rows: &[&[&str]]) -> Table {
        let schema = Schema::new(
            columns
                .iter()
                .map(|c| (c.to_string(), ColumnType::String, true))
                .collect(),
        );
        let mut t = Table::new(name.to_string(), schema);
        for row in rows {
            t.append_values(
                row.iter()
                    .map(|v| if v.is_empty() { ColumnValue::Null } else { ColumnValue::from(*v) })
                    .collect(),
            )
            .unwrap();
        }
        t
    }

    /// Column as display strings, NULL as ""
    pub fn strings(table: &Table, column: &str) -> Vec<String> {
        let col = table.column(column).unwrap();
        (0..table.len()).map(|i| col.get(i).unwrap().to_string()).collect()
    }

    pub fn ints(table: &Table, column: &str) -> Vec<i64> {
        let col = table.column(column).unwrap();
        (0..table.len()).map(|i| col.get(i).unwrap().as_i64().unwrap()).collect()
    }
}
