/// Join engine
///
/// Ordered inner hash joins of the parsed records against the reference
/// tables. Rows without a match are dropped, never null-filled; how many were
/// dropped at each stage is logged and returned in a `JoinReport`.
///
/// Right-hand columns are renamed through an explicit `RenameMap` before each
/// join. A name that still collides with a left-hand column is an error, so
/// the output schema is fixed by the inputs and the rename maps alone.

use crate::column::ValueKey;
use crate::config::Config;
use crate::error::{processing_failure as processing, Result, TableError};
use crate::table::Table;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::{Duration, Instant};

/// Old column name to new column name
pub type RenameMap = BTreeMap<String, String>;

/// Columns of the distinct projection joined against toxicity data
pub const TOXICITY_PROJECTION: &[&str] = &["sample", "compoundclass", "cpd", "ko"];

/// Telemetry of one join
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinStage {
    pub name: String,
    pub left_rows: usize,
    pub right_rows: usize,
    pub output_rows: usize,
    /// Left rows whose key had no match on the right
    pub unmatched_left_rows: usize,
    pub elapsed: Duration,
}

impl JoinStage {
    pub fn rows_dropped(&self) -> usize {
        self.unmatched_left_rows
    }
}

/// Per-stage telemetry of a join sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JoinReport {
    stages: Vec<JoinStage>,
}

impl JoinReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: JoinStage) {
        self.stages.push(stage);
    }

    pub fn stages(&self) -> &[JoinStage] {
        &self.stages
    }

    pub fn stage(&self, name: &str) -> Option<&JoinStage> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Left rows dropped across all stages
    pub fn rows_dropped(&self) -> usize {
        self.stages.iter().map(JoinStage::rows_dropped).sum()
    }

    pub fn total_elapsed(&self) -> Duration {
        self.stages.iter().map(|s| s.elapsed).sum()
    }
}

impl fmt::Display for JoinReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stage in &self.stages {
            writeln!(
                f,
                "{:<12} {:>8} x {:>8} -> {:>8} rows ({} unmatched, {:.2?})",
                stage.name, stage.left_rows, stage.right_rows, stage.output_rows, stage.unmatched_left_rows, stage.elapsed
            )?;
        }
        Ok(())
    }
}

/// Rename maps applied before the pathway and degradation joins
#[derive(Debug, Clone, PartialEq)]
pub struct JoinPlan {
    pub pathway_renames: RenameMap,
    pub degradation_renames: RenameMap,
}

impl Default for JoinPlan {
    fn default() -> Self {
        JoinPlan::from(&Config::default())
    }
}

impl From<&Config> for JoinPlan {
    fn from(config: &Config) -> Self {
        JoinPlan {
            pathway_renames: config.pathway_renames.clone(),
            degradation_renames: config.degradation_renames.clone(),
        }
    }
}

/// Inner join `left` with `right` on `key`.
///
/// Output rows follow left row order, then right row order within a key.
/// Output columns are all left columns followed by the renamed right columns
/// other than `key`. NULL keys never match.
pub fn inner_join(left: &Table, right: &Table, key: &str, renames: &RenameMap, name: &str) -> Result<(Table, JoinStage)> {
    let started = Instant::now();
    left.require(&[key])?;
    right.require(&[key])?;

    let renames: RenameMap = renames
        .iter()
        .filter(|(from, _)| from.as_str() != key)
        .map(|(from, to)| (from.clone(), to.clone()))
        .collect();
    let right = right
        .rename_columns(&renames)
        .map_err(processing(format!("Renaming '{}' columns", right.name())))?;

    let right_names: Vec<&str> = right.column_names().into_iter().filter(|c| *c != key).collect();
    if let Some(collision) = right_names.iter().find(|c| left.has_column(c)) {
        return Err(processing(format!("Joining '{}'", name))(TableError::DuplicateColumn(
            collision.to_string(),
        )));
    }

    let left_key = left.column(key).map_err(processing(format!("Joining '{}'", name)))?;
    let right_key = right.column(key).map_err(processing(format!("Joining '{}'", name)))?;
    if left_key.column_type() != right_key.column_type() {
        log::warn!(
            "Join '{}': key '{}' is {} on the left and {} on the right",
            name,
            key,
            left_key.column_type(),
            right_key.column_type()
        );
    }

    let mut index: HashMap<ValueKey<'_>, Vec<usize>> = HashMap::new();
    for (i, value) in right_key.iter().enumerate() {
        if !value.is_null() {
            index.entry(value).or_default().push(i);
        }
    }

    let mut left_rows = Vec::new();
    let mut right_rows = Vec::new();
    let mut unmatched = 0;
    for (i, value) in left_key.iter().enumerate() {
        match index.get(&value) {
            Some(matches) if !value.is_null() => {
                for &r in matches {
                    left_rows.push(i);
                    right_rows.push(r);
                }
            }
            _ => unmatched += 1,
        }
    }

    let mut columns = Vec::with_capacity(left.schema().len() + right_names.len());
    for col in left.columns() {
        columns.push(col.take(&left_rows).map_err(processing(format!("Joining '{}'", name)))?);
    }
    for col_name in &right_names {
        let col = right.column(col_name).map_err(processing(format!("Joining '{}'", name)))?;
        columns.push(col.take(&right_rows).map_err(processing(format!("Joining '{}'", name)))?);
    }

    let output = Table::from_columns(name.to_string(), columns).map_err(processing(format!("Joining '{}'", name)))?;

    let stage = JoinStage {
        name: name.to_string(),
        left_rows: left.len(),
        right_rows: right.len(),
        output_rows: output.len(),
        unmatched_left_rows: unmatched,
        elapsed: started.elapsed(),
    };
    log::info!(
        "Join '{}' on '{}': {} x {} -> {} rows, {} left rows unmatched ({:.2?})",
        name,
        key,
        stage.left_rows,
        stage.right_rows,
        stage.output_rows,
        stage.unmatched_left_rows,
        stage.elapsed
    );
    if stage.output_rows == 0 && stage.left_rows > 0 {
        log::warn!("Join '{}' matched no rows", name);
    }

    Ok((output, stage))
}

/// Join records with annotation, pathway map and degradation map on `ko`.
///
/// `records` needs `sample` and `ko`. The result is the enriched table and
/// one report stage per join.
pub fn build_enriched(
    records: &Table,
    annotation: &Table,
    pathway_map: &Table,
    degradation_map: &Table,
    plan: &JoinPlan,
) -> Result<(Table, JoinReport)> {
    records.require(&["sample", "ko"])?;

    let mut report = JoinReport::new();
    let (annotated, stage) = inner_join(records, annotation, "ko", &RenameMap::new(), "annotation")?;
    report.push(stage);
    let (mapped, stage) = inner_join(&annotated, pathway_map, "ko", &plan.pathway_renames, "pathway")?;
    report.push(stage);
    let (enriched, stage) = inner_join(&mapped, degradation_map, "ko", &plan.degradation_renames, "degradation")?;
    report.push(stage);

    log::info!(
        "Enriched table: {} rows from {} records, {} rows dropped by joins",
        enriched.len(),
        records.len(),
        report.rows_dropped()
    );
    Ok((enriched.with_name("enriched"), report))
}

/// Distinct `(sample, compoundclass, cpd, ko)` tuples joined with toxicity
/// data on `cpd`.
pub fn build_toxicity(enriched: &Table, toxicity: &Table) -> Result<(Table, JoinStage)> {
    build_toxicity_with(enriched, toxicity, &[])
}

/// Like `build_toxicity`, carrying `extra_columns` of the enriched table
/// into the projection.
pub fn build_toxicity_with(enriched: &Table, toxicity: &Table, extra_columns: &[&str]) -> Result<(Table, JoinStage)> {
    let mut projection: Vec<&str> = TOXICITY_PROJECTION.to_vec();
    for extra in extra_columns {
        if !projection.contains(extra) {
            projection.push(extra);
        }
    }

    enriched.require(&projection)?;
    toxicity.require(&["cpd"])?;

    let reduced = enriched
        .project(&projection)
        .and_then(|t| t.distinct())
        .map_err(processing("Projecting enriched table for toxicity"))?;

    let (joined, stage) = inner_join(&reduced, toxicity, "cpd", &RenameMap::new(), "toxicity")?;
    Ok((joined.with_name("toxicity_projection"), stage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnType, ColumnValue};
    use crate::error::Error;
    use crate::optimize::{optimize, DEGRADATION_COLUMNS, GENERAL_COLUMNS, PATHWAY_COLUMNS};
    use crate::table::Schema;
    use proptest::prelude::*;

    fn table(name: &str, columns: &[&str], rows: &[&[&str]]) -> Table {
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

    fn references() -> (Table, Table, Table) {
        let annotation = table(
            "annotation",
            &["ko", "cpd", "compoundclass", "compoundname", "genesymbol"],
            &[
                &["K1", "C1", "Aromatic", "benzene", "adh"],
                &["K1", "C2", "Metal", "cadmium", "adh"],
                &["K2", "C3", "Aromatic", "toluene", "tod"],
                &["K3", "C4", "Alkane", "hexane", "alk"],
            ],
        );
        let pathway = table(
            "pathway_map",
            &["ko", "pathname", "genesymbol"],
            &[&["K1", "Benzoate", "adhK"], &["K2", "Toluene", "todK"]],
        );
        let degradation = table(
            "degradation_map",
            &["Gene", "ko", "Pathway", "compound_pathway"],
            &[&["adhA", "K1", "P1", "Aromatics"], &["todA", "K2", "P2", "Aromatics"]],
        );
        (annotation, pathway, degradation)
    }

    #[test]
    fn test_inner_join_drops_unmatched_and_reports() {
        let left = table("records", &["sample", "ko"], &[&["S1", "K1"], &["S1", "K9"], &["S2", ""]]);
        let right = table("pathway_map", &["ko", "pathname"], &[&["K1", "A"], &["K1", "B"], &["", "N"]]);

        let (joined, stage) = inner_join(&left, &right, "ko", &RenameMap::new(), "pathway").unwrap();
        assert_eq!(joined.column_names(), vec!["sample", "ko", "pathname"]);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.get_value(1, "pathname").unwrap().as_string(), Some("B"));
        assert_eq!(stage.unmatched_left_rows, 2);
        assert_eq!(stage.output_rows, 2);
        assert_eq!(stage.left_rows, 3);
        assert_eq!(stage.right_rows, 3);
    }

    #[test]
    fn test_inner_join_collision_without_rename_is_error() {
        let left = table("l", &["ko", "genesymbol"], &[&["K1", "a"]]);
        let right = table("r", &["ko", "genesymbol"], &[&["K1", "b"]]);

        let err = inner_join(&left, &right, "ko", &RenameMap::new(), "pathway").unwrap_err();
        assert!(matches!(err, Error::Processing { .. }));
        assert!(err.to_string().contains("genesymbol"));

        let mut renames = RenameMap::new();
        renames.insert("genesymbol".to_string(), "kegg_genesymbol".to_string());
        renames.insert("ko".to_string(), "ignored".to_string());
        let (joined, _) = inner_join(&left, &right, "ko", &renames, "pathway").unwrap();
        assert_eq!(joined.column_names(), vec!["ko", "genesymbol", "kegg_genesymbol"]);
    }

    #[test]
    fn test_inner_join_missing_key_is_schema_error() {
        let left = table("l", &["sample"], &[]);
        let right = table("r", &["ko"], &[]);
        assert!(inner_join(&left, &right, "ko", &RenameMap::new(), "x").unwrap_err().is_schema());
    }

    #[test]
    fn test_build_enriched() {
        let (annotation, pathway, degradation) = references();
        let records = table(
            "records",
            &["sample", "ko"],
            &[&["S1", "K1"], &["S1", "K3"], &["S2", "K2"], &["S2", "K7"]],
        );

        let (enriched, report) =
            build_enriched(&records, &annotation, &pathway, &degradation, &JoinPlan::default()).unwrap();

        assert_eq!(enriched.name(), "enriched");
        assert_eq!(
            enriched.column_names(),
            vec![
                "sample",
                "ko",
                "cpd",
                "compoundclass",
                "compoundname",
                "genesymbol",
                "pathname",
                "kegg_genesymbol",
                "Gene",
                "Pathway",
                "compound_pathway"
            ]
        );
        // K1 matches two annotation rows, K2 one; K3 has no pathway, K7 no annotation.
        assert_eq!(enriched.len(), 3);

        let stages: Vec<&str> = report.stages().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(stages, vec!["annotation", "pathway", "degradation"]);
        assert_eq!(report.stage("annotation").unwrap().unmatched_left_rows, 1);
        assert_eq!(report.stage("pathway").unwrap().unmatched_left_rows, 1);
        assert_eq!(report.rows_dropped(), 2);
    }

    #[test]
    fn test_build_enriched_requires_sample() {
        let (annotation, pathway, degradation) = references();
        let records = table("records", &["ko"], &[&["K1"]]);
        let err = build_enriched(&records, &annotation, &pathway, &degradation, &JoinPlan::default()).unwrap_err();
        assert!(err.is_schema());
    }

    #[test]
    fn test_build_toxicity_uses_distinct_projection() {
        let enriched = table(
            "enriched",
            &["sample", "compoundclass", "cpd", "ko", "Gene"],
            &[
                &["S1", "Aromatic", "C1", "K1", "g1"],
                &["S1", "Aromatic", "C1", "K1", "g2"],
                &["S2", "Aromatic", "C1", "K1", "g1"],
                &["S2", "Metal", "C9", "K2", "g3"],
            ],
        );
        let toxicity = table(
            "toxicity",
            &["cpd", "compoundname", "label_NR_AR"],
            &[&["C1", "benzene", "Toxic"]],
        );

        let (projection, stage) = build_toxicity(&enriched, &toxicity).unwrap();
        assert_eq!(
            projection.column_names(),
            vec!["sample", "compoundclass", "cpd", "ko", "compoundname", "label_NR_AR"]
        );
        assert_eq!(projection.len(), 2);
        assert_eq!(stage.left_rows, 3);
        assert_eq!(stage.unmatched_left_rows, 1);

        let (with_gene, _) = build_toxicity_with(&enriched, &toxicity, &["Gene"]).unwrap();
        assert_eq!(with_gene.len(), 3);
        assert!(with_gene.has_column("Gene"));
    }

    #[test]
    fn test_build_toxicity_missing_projection_is_schema_error() {
        let enriched = table("enriched", &["sample", "cpd", "ko"], &[]);
        let toxicity = table("toxicity", &["cpd"], &[]);
        let err = build_toxicity(&enriched, &toxicity).unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("compoundclass"));
    }

    fn ko() -> impl Strategy<Value = String> {
        (1u32..6).prop_map(|n| format!("K{:05}", n))
    }

    fn build_records(pairs: &[(String, String)]) -> Table {
        let rows: Vec<Vec<&str>> = pairs.iter().map(|(s, k)| vec![s.as_str(), k.as_str()]).collect();
        let row_refs: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        table("records", &["sample", "ko"], &row_refs)
    }

    proptest! {
        #[test]
        fn prop_optimizer_is_result_neutral(
            pairs in prop::collection::vec(("S[1-3]", ko()), 0..20),
            annotated in prop::collection::vec((ko(), "C[1-4]", "(Aromatic|Metal)"), 0..10),
            mapped in prop::collection::vec((ko(), "(Benzoate|Toluene)"), 0..8),
            degraded in prop::collection::vec((ko(), "g[1-3]"), 0..8),
        ) {
            let records = build_records(&pairs);

            let rows: Vec<Vec<&str>> = annotated.iter().map(|(k, c, cc)| vec![k.as_str(), c.as_str(), cc.as_str()]).collect();
            let refs: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
            let annotation = table("annotation", &["ko", "cpd", "compoundclass"], &refs);

            let rows: Vec<Vec<&str>> = mapped.iter().map(|(k, p)| vec![k.as_str(), p.as_str()]).collect();
            let refs: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
            let pathway = table("pathway_map", &["ko", "pathname"], &refs);

            let rows: Vec<Vec<&str>> = degraded.iter().map(|(k, g)| vec![k.as_str(), g.as_str()]).collect();
            let refs: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
            let degradation = table("degradation_map", &["ko", "Gene"], &refs);

            let plan = JoinPlan::default();
            let (plain, _) = build_enriched(&records, &annotation, &pathway, &degradation, &plan).unwrap();
            let (fast, _) = build_enriched(
                &optimize(&records, GENERAL_COLUMNS),
                &optimize(&annotation, GENERAL_COLUMNS),
                &optimize(&pathway, PATHWAY_COLUMNS),
                &optimize(&degradation, DEGRADATION_COLUMNS),
                &plan,
            ).unwrap();

            prop_assert_eq!(plain.column_names(), fast.column_names());
            let plain_rows: Vec<_> = plain.iter_rows().collect();
            let fast_rows: Vec<_> = fast.iter_rows().collect();
            prop_assert_eq!(plain_rows, fast_rows);
        }
    }
}
