/// Grouped distinct counts over the enriched table
use super::{count_distinct, empty_counts, grouped_distinct_count, rows_equal, sort_descending};
use crate::column::{Column, ColumnType, ColumnValue, ValueKey};
use crate::error::{processing_failure, Result};
use crate::table::Table;
use std::collections::{BTreeMap, BTreeSet};

/// Distinct KOs per `(sample, Gene, compound_pathway, Pathway)` as `ko_count`
pub fn gene_sample_counts(enriched: &Table) -> Result<Table> {
    let keys = ["sample", "Gene", "compound_pathway", "Pathway"];
    enriched.require(&["sample", "Gene", "compound_pathway", "Pathway", "ko"])?;
    grouped_distinct_count(enriched, &keys, "ko", "ko_count", "gene_sample_counts")
}

/// Distinct KOs per sample as `ko_count`, largest first
pub fn ko_count_per_sample(enriched: &Table) -> Result<Table> {
    enriched.require(&["sample", "ko"])?;
    let counts = grouped_distinct_count(enriched, &["sample"], "ko", "ko_count", "ko_count_per_sample")?;
    sort_descending(counts, "ko_count")
}

/// Distinct KOs per `(sample, pathname)` as `unique_ko_count`
pub fn ko_count_per_pathway(enriched: &Table) -> Result<Table> {
    enriched.require(&["sample", "pathname", "ko"])?;
    grouped_distinct_count(
        enriched,
        &["sample", "pathname"],
        "ko",
        "unique_ko_count",
        "ko_count_per_pathway",
    )
}

/// Distinct KOs per sample on one pathway, largest first.
///
/// An unknown pathway gives an empty `sample, unique_ko_count` table.
pub fn ko_count_for_pathway(enriched: &Table, pathway: &str) -> Result<Table> {
    enriched.require(&["sample", "pathname", "ko"])?;

    let on_pathway = rows_equal(enriched, "pathname", pathway)?;
    if on_pathway.is_empty() {
        log::warn!("No data for pathway '{}'", pathway);
        return empty_counts("ko_count_for_pathway", &["sample"], "unique_ko_count");
    }

    let counts = grouped_distinct_count(
        &on_pathway,
        &["sample"],
        "ko",
        "unique_ko_count",
        "ko_count_for_pathway",
    )?;
    sort_descending(counts, "unique_ko_count")
}

/// Distinct KOs per `(Pathway, compound_pathway, sample)` as `ko_count`
pub fn pathway_compound_counts(enriched: &Table) -> Result<Table> {
    enriched.require(&["Pathway", "compound_pathway", "sample", "ko"])?;
    grouped_distinct_count(
        enriched,
        &["Pathway", "compound_pathway", "sample"],
        "ko",
        "ko_count",
        "pathway_compound_counts",
    )
}

/// Distinct KOs per enzyme activity within one sample, largest first.
///
/// A sample with no rows gives an empty `enzyme_activity, unique_ko_count` table.
pub fn enzyme_activity_counts(enriched: &Table, sample: &str) -> Result<Table> {
    enriched.require(&["sample", "enzyme_activity", "ko"])?;

    let rows = rows_equal(enriched, "sample", sample)?;
    if rows.is_empty() {
        log::warn!("No data for sample '{}'", sample);
        return empty_counts("enzyme_activity_counts", &["enzyme_activity"], "unique_ko_count");
    }

    let counts = grouped_distinct_count(
        &rows,
        &["enzyme_activity"],
        "ko",
        "unique_ko_count",
        "enzyme_activity_counts",
    )?;
    sort_descending(counts, "unique_ko_count")
}

/// Pivot of distinct compound counts: one row per `referenceAG`, one INT64
/// column per sample, zero where a sample has no compound for that agency.
///
/// Rows and sample columns are both sorted.
pub fn sample_reference_matrix(enriched: &Table) -> Result<Table> {
    enriched.require(&["sample", "referenceAG", "compoundname"])?;
    let context = "Building the sample/reference matrix";
    let fail = || processing_failure(context);

    let groups = enriched.group_by(&["referenceAG", "sample"]).map_err(fail())?;
    let compounds = enriched.column("compoundname").map_err(fail())?;

    let mut samples: BTreeSet<ValueKey<'_>> = BTreeSet::new();
    let mut cells: BTreeMap<ValueKey<'_>, BTreeMap<ValueKey<'_>, i64>> = BTreeMap::new();
    for (key, rows) in &groups {
        let count = count_distinct(compounds, rows).map_err(fail())? as i64;
        samples.insert(key[1]);
        cells.entry(key[0]).or_default().insert(key[1], count);
    }

    let reference_type = enriched.column("referenceAG").map_err(fail())?.column_type();
    let references = cells.keys().map(ValueKey::to_value).collect();

    let mut columns = Vec::with_capacity(samples.len() + 1);
    columns.push(Column::from_values("referenceAG", reference_type, false, references).map_err(fail())?);
    for sample in &samples {
        let values = cells
            .values()
            .map(|row| ColumnValue::Int64(row.get(sample).copied().unwrap_or(0)))
            .collect();
        let name = sample.to_value().to_string();
        columns.push(Column::from_values(&name, ColumnType::Int64, false, values).map_err(fail())?);
    }

    let matrix = Table::from_columns("sample_reference_matrix".to_string(), columns).map_err(fail())?;
    log::info!("{}: {} agencies x {} samples", context, matrix.len(), samples.len());
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{ints, strings, table};
    use super::*;

    fn enriched() -> Table {
        table(
            "enriched",
            &["sample", "ko", "pathname", "enzyme_activity", "referenceAG", "compoundname"],
            &[
                &["S1", "K1", "Benzoate", "oxidase", "EPA", "benzene"],
                &["S1", "K2", "Benzoate", "oxidase", "EPA", "toluene"],
                &["S1", "K2", "Toluene", "reductase", "IARC", "toluene"],
                &["S2", "K1", "Benzoate", "oxidase", "EPA", "benzene"],
                &["S2", "K1", "Benzoate", "oxidase", "", "benzene"],
                &["S3", "K3", "Benzoate", "", "IARC", ""],
            ],
        )
    }

    #[test]
    fn test_gene_sample_counts_collapses_duplicate_ko() {
        let t = table(
            "enriched",
            &["sample", "Gene", "compound_pathway", "Pathway", "ko"],
            &[
                &["S1", "G1", "CP1", "P1", "K001"],
                &["S1", "G1", "CP1", "P1", "K001"],
                &["S1", "G1", "CP1", "P1", "K002"],
            ],
        );
        let counts = gene_sample_counts(&t).unwrap();
        assert_eq!(
            counts.column_names(),
            vec!["sample", "Gene", "compound_pathway", "Pathway", "ko_count"]
        );
        assert_eq!(counts.len(), 1);
        assert_eq!(ints(&counts, "ko_count"), vec![2]);
    }

    #[test]
    fn test_gene_sample_counts_names_every_missing_column() {
        let t = table("enriched", &["sample", "ko"], &[&["S1", "K1"]]);
        let err = gene_sample_counts(&t).unwrap_err();
        assert!(err.is_schema());
        let message = err.to_string();
        for column in ["Gene", "compound_pathway", "Pathway"] {
            assert!(message.contains(column), "{} not in {}", column, message);
        }
    }

    #[test]
    fn test_ko_count_per_sample_sorted_descending() {
        let counts = ko_count_per_sample(&enriched()).unwrap();
        assert_eq!(strings(&counts, "sample"), vec!["S1", "S2", "S3"]);
        assert_eq!(ints(&counts, "ko_count"), vec![2, 1, 1]);
    }

    #[test]
    fn test_ko_count_per_pathway() {
        let counts = ko_count_per_pathway(&enriched()).unwrap();
        assert_eq!(counts.column_names(), vec!["sample", "pathname", "unique_ko_count"]);
        assert_eq!(strings(&counts, "pathname"), vec!["Benzoate", "Toluene", "Benzoate", "Benzoate"]);
        assert_eq!(ints(&counts, "unique_ko_count"), vec![2, 1, 1, 1]);
    }

    #[test]
    fn test_ko_count_for_pathway() {
        let counts = ko_count_for_pathway(&enriched(), "Toluene").unwrap();
        assert_eq!(strings(&counts, "sample"), vec!["S1"]);

        let unknown = ko_count_for_pathway(&enriched(), "Nope").unwrap();
        assert!(unknown.is_empty());
        assert_eq!(unknown.column_names(), vec!["sample", "unique_ko_count"]);
    }

    #[test]
    fn test_pathway_compound_counts() {
        let t = table(
            "enriched",
            &["Pathway", "compound_pathway", "sample", "ko"],
            &[&["P1", "Aromatic", "S1", "K1"], &["P1", "Aromatic", "S1", "K2"], &["P1", "Aromatic", "S2", "K1"]],
        );
        let counts = pathway_compound_counts(&t).unwrap();
        assert_eq!(strings(&counts, "sample"), vec!["S1", "S2"]);
        assert_eq!(ints(&counts, "ko_count"), vec![2, 1]);
    }

    #[test]
    fn test_enzyme_activity_counts() {
        let counts = enzyme_activity_counts(&enriched(), "S1").unwrap();
        assert_eq!(strings(&counts, "enzyme_activity"), vec!["oxidase", "reductase"]);
        assert_eq!(ints(&counts, "unique_ko_count"), vec![2, 1]);

        let missing = enzyme_activity_counts(&enriched(), "S9").unwrap();
        assert!(missing.is_empty());
        assert_eq!(missing.column_names(), vec!["enzyme_activity", "unique_ko_count"]);
    }

    #[test]
    fn test_sample_reference_matrix_zero_fills() {
        let matrix = sample_reference_matrix(&enriched()).unwrap();
        assert_eq!(matrix.column_names(), vec!["referenceAG", "S1", "S2", "S3"]);
        assert_eq!(strings(&matrix, "referenceAG"), vec!["EPA", "IARC"]);
        assert_eq!(ints(&matrix, "S1"), vec![2, 1]);
        assert_eq!(ints(&matrix, "S2"), vec![1, 0]);
        assert_eq!(ints(&matrix, "S3"), vec![0, 0]);
    }

    #[test]
    fn test_counts_on_empty_input_keep_columns() {
        let t = table("enriched", &["sample", "ko"], &[]);
        let counts = ko_count_per_sample(&t).unwrap();
        assert!(counts.is_empty());
        assert_eq!(counts.column_names(), vec!["sample", "ko_count"]);
    }
}
