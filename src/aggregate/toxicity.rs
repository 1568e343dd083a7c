/// Long-form toxicity table for the faceted heatmap
use super::cell_text;
use crate::column::{Column, ColumnType, ColumnValue};
use crate::error::{processing_failure, Result};
use crate::table::Table;

const VALUE_PREFIX: &str = "value_";
const LABEL_PREFIX: &str = "label_";

const OUTPUT_COLUMNS: [(&str, ColumnType, bool); 5] = [
    ("compoundname", ColumnType::String, true),
    ("value", ColumnType::Float64, true),
    ("label", ColumnType::String, true),
    ("category", ColumnType::String, false),
    ("subcategory", ColumnType::String, false),
];

fn category(prefix: &str) -> Option<&'static str> {
    match prefix {
        "NR" => Some("Nuclear Response"),
        "SR" => Some("Stress Response"),
        "Gen" => Some("Genomic"),
        "Env" => Some("Environmental"),
        "Org" => Some("Organic"),
        _ => None,
    }
}

/// Numeric reading of a score cell; unparsable text is NULL
fn score(value: ColumnValue) -> ColumnValue {
    match value {
        ColumnValue::Int64(v) => ColumnValue::Float64(v as f64),
        ColumnValue::String(ref text) => text.trim().parse().map_or(ColumnValue::Null, ColumnValue::Float64),
        ColumnValue::Bool(_) => ColumnValue::Null,
        other => other,
    }
}

/// Unpivot every `value_<X>` / `label_<X>` pair into
/// `compoundname, value, label, category, subcategory` rows.
///
/// `<X>` is the subcategory and its leading `_`-separated token selects the
/// category. Pairs with an unknown prefix or no matching label column are
/// skipped. Output follows column order, then row order.
pub fn toxicity_heatmap(toxicity: &Table) -> Result<Table> {
    toxicity.require(&["compoundname"])?;
    let fail = || processing_failure("Building the toxicity heatmap table");

    let pairs: Vec<(&str, &str, String)> = toxicity
        .column_names()
        .into_iter()
        .filter_map(|name| {
            let subcategory = name.strip_prefix(VALUE_PREFIX)?;
            let prefix = subcategory.split('_').next().unwrap_or(subcategory);
            let Some(category) = category(prefix) else {
                log::debug!("Skipping '{}': unknown category '{}'", name, prefix);
                return None;
            };
            let label = format!("{}{}", LABEL_PREFIX, subcategory);
            if !toxicity.has_column(&label) {
                log::warn!("Skipping '{}': no '{}' column", name, label);
                return None;
            }
            Some((name, category, label))
        })
        .collect();

    let mut values: Vec<Vec<ColumnValue>> = vec![Vec::with_capacity(pairs.len() * toxicity.len()); OUTPUT_COLUMNS.len()];
    let compounds = toxicity.column("compoundname").map_err(fail())?;
    for (value_name, category, label_name) in &pairs {
        let subcategory = &value_name[VALUE_PREFIX.len()..];
        let value_col = toxicity.column(value_name).map_err(fail())?;
        let label_col = toxicity.column(label_name).map_err(fail())?;
        for i in 0..toxicity.len() {
            values[0].push(compounds.get(i).map_err(fail())?);
            values[1].push(score(value_col.get(i).map_err(fail())?));
            values[2].push(
                cell_text(label_col, i)
                    .map_err(fail())?
                    .map_or(ColumnValue::Null, |t| ColumnValue::String(t.into_owned())),
            );
            values[3].push(ColumnValue::from(*category));
            values[4].push(ColumnValue::from(subcategory));
        }
    }

    let mut columns = Vec::with_capacity(OUTPUT_COLUMNS.len());
    for ((name, column_type, nullable), cells) in OUTPUT_COLUMNS.iter().zip(values) {
        let cells = if *name == "compoundname" {
            cells.into_iter().map(text_value).collect()
        } else {
            cells
        };
        columns.push(Column::from_values(name, *column_type, *nullable, cells).map_err(fail())?);
    }

    let heatmap = Table::from_columns("toxicity_heatmap".to_string(), columns).map_err(fail())?;
    if pairs.is_empty() {
        log::warn!("No value/label column pairs in '{}'", toxicity.name());
    } else {
        log::info!("Toxicity heatmap: {} subcategories, {} rows", pairs.len(), heatmap.len());
    }
    Ok(heatmap)
}

fn text_value(value: ColumnValue) -> ColumnValue {
    match value {
        ColumnValue::Null | ColumnValue::String(_) => value,
        other => ColumnValue::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{strings, table};
    use super::*;

    fn toxicity() -> Table {
        table(
            "toxicity_projection",
            &["cpd", "compoundname", "value_NR_AR", "label_NR_AR", "value_XX_Y", "label_XX_Y", "value_SR_ARE", "label_SR_ARE"],
            &[
                &["C1", "benzene", "0.7", "High Toxicity", "1", "x", "0.2", "Low Toxicity"],
                &["C2", "toluene", "n/a", "", "1", "x", "0.5", "Medium Toxicity"],
            ],
        )
    }

    #[test]
    fn test_toxicity_heatmap_unpivots_known_categories() {
        let heatmap = toxicity_heatmap(&toxicity()).unwrap();
        assert_eq!(
            heatmap.column_names(),
            vec!["compoundname", "value", "label", "category", "subcategory"]
        );
        assert_eq!(heatmap.len(), 4);
        assert_eq!(strings(&heatmap, "compoundname"), vec!["benzene", "toluene", "benzene", "toluene"]);
        assert_eq!(
            strings(&heatmap, "category"),
            vec!["Nuclear Response", "Nuclear Response", "Stress Response", "Stress Response"]
        );
        assert_eq!(strings(&heatmap, "subcategory"), vec!["NR_AR", "NR_AR", "SR_ARE", "SR_ARE"]);
        assert_eq!(strings(&heatmap, "label")[1], "");

        let values = heatmap.column("value").unwrap();
        assert_eq!(values.get(0).unwrap(), ColumnValue::Float64(0.7));
        assert!(values.is_null_at(1));
    }

    #[test]
    fn test_toxicity_heatmap_without_pairs_is_empty() {
        let t = table("toxicity", &["cpd", "compoundname", "value_NR_AR"], &[&["C1", "benzene", "0.1"]]);
        let heatmap = toxicity_heatmap(&t).unwrap();
        assert!(heatmap.is_empty());
        assert_eq!(heatmap.column_names().len(), 5);
    }

    #[test]
    fn test_toxicity_heatmap_requires_compoundname() {
        let t = table("toxicity", &["cpd"], &[&["C1"]]);
        assert!(toxicity_heatmap(&t).unwrap_err().is_schema());
    }
}
