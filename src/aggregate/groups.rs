/// Sample grouping by compound profile
use super::{cell_text, rows_equal};
use crate::column::{Column, ColumnType, ColumnValue, ValueKey};
use crate::error::{processing_failure, Result};
use crate::table::Table;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Name of the group label column
pub const GROUP_COLUMN: &str = "group";

/// Rows of `compound_class` with a `group` label per row.
///
/// Samples are visited in first-seen order; samples whose compound sets
/// within the class are identical share one label, `"<class> - Group <n>"`.
/// Rows without a compound or sample stay unlabelled (NULL). A class with
/// no rows gives an empty table with the input columns plus `group`.
pub fn group_samples_by_class(table: &Table, compound_class: &str) -> Result<Table> {
    table.require(&["compoundclass", "sample", "compoundname"])?;
    let context = format!("Grouping samples of class '{}'", compound_class);
    let fail = || processing_failure(context.clone());

    let selected = rows_equal(table, "compoundclass", compound_class)?;
    let samples = selected.column("sample").map_err(fail())?;
    let compounds = selected.column("compoundname").map_err(fail())?;

    let mut order: Vec<ValueKey<'_>> = Vec::new();
    let mut profiles: HashMap<ValueKey<'_>, BTreeSet<ValueKey<'_>>> = HashMap::new();
    for i in 0..selected.len() {
        let sample = samples.key(i).map_err(fail())?;
        let compound = compounds.key(i).map_err(fail())?;
        if sample.is_null() || compound.is_null() {
            continue;
        }
        profiles
            .entry(sample)
            .or_insert_with(|| {
                order.push(sample);
                BTreeSet::new()
            })
            .insert(compound);
    }

    let mut groups: Vec<&BTreeSet<ValueKey<'_>>> = Vec::new();
    let mut labels: HashMap<ValueKey<'_>, String> = HashMap::with_capacity(order.len());
    for sample in &order {
        let profile = &profiles[sample];
        let index = match groups.iter().position(|g| *g == profile) {
            Some(index) => index,
            None => {
                groups.push(profile);
                groups.len() - 1
            }
        };
        labels.insert(*sample, format!("{} - Group {}", compound_class, index + 1));
    }

    let mut group_values = Vec::with_capacity(selected.len());
    for i in 0..selected.len() {
        let label = if compounds.is_null_at(i) {
            None
        } else {
            labels.get(&samples.key(i).map_err(fail())?)
        };
        group_values.push(label.map_or(ColumnValue::Null, |l| ColumnValue::String(l.clone())));
    }

    let mut columns = selected.columns().to_vec();
    columns.push(Column::from_values(GROUP_COLUMN, ColumnType::String, true, group_values).map_err(fail())?);
    let grouped = Table::from_columns("class_groups".to_string(), columns).map_err(fail())?;

    if grouped.is_empty() {
        log::warn!("No data for compound class '{}'", compound_class);
    } else {
        log::info!("{}: {} groups over {} samples", context, groups.len(), order.len());
    }
    Ok(grouped)
}

/// Greedy cover of every labelled compound by group labels.
///
/// Each round picks the group covering the most still-uncovered compounds;
/// ties go to the smallest label. Only rows with both a label and a compound
/// take part. An empty input gives an empty list.
pub fn minimize_groups(table: &Table) -> Result<Vec<String>> {
    if table.is_empty() {
        return Ok(Vec::new());
    }
    table.require(&[GROUP_COLUMN, "compoundname"])?;
    let fail = || processing_failure("Minimizing sample groups");

    let labels = table.column(GROUP_COLUMN).map_err(fail())?;
    let compounds = table.column("compoundname").map_err(fail())?;

    let mut coverage: BTreeMap<String, BTreeSet<ValueKey<'_>>> = BTreeMap::new();
    for i in 0..table.len() {
        let compound = compounds.key(i).map_err(fail())?;
        match cell_text(labels, i).map_err(fail())? {
            Some(label) if !compound.is_null() => {
                coverage.entry(label.into_owned()).or_default().insert(compound);
            }
            _ => {}
        }
    }

    let mut remaining: BTreeSet<ValueKey<'_>> = coverage.values().flatten().copied().collect();
    let mut selected = Vec::new();
    while !remaining.is_empty() {
        let mut best: Option<(&String, usize)> = None;
        for (label, covered) in &coverage {
            let gain = covered.intersection(&remaining).count();
            if gain > best.map_or(0, |(_, g)| g) {
                best = Some((label, gain));
            }
        }

        // Every remaining compound came from some group, so a best group always exists.
        let Some((label, _)) = best else { break };
        for compound in &coverage[label] {
            remaining.remove(compound);
        }
        log::debug!("Selected '{}', {} compounds remaining", label, remaining.len());
        selected.push(label.clone());
    }

    log::info!("{} of {} groups cover all compounds", selected.len(), coverage.len());
    Ok(selected)
}
