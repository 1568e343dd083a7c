/// BioRemPP - Bioremediation Potential Profiling
///
/// Parses multi-sample KO lists, joins them against the annotation, pathway,
/// degradation and toxicity references, and derives the counts, rankings and
/// filtered views a presentation layer draws from.
///
/// ```
/// use biorempp::{parse_samples, SampleRecord};
///
/// let records = parse_samples(">S1\nK00001\nK00002\n>S2\nK00001").unwrap();
/// assert_eq!(records[2], SampleRecord::new("S2", "K00001"));
/// ```

pub mod aggregate;
pub mod column;
pub mod config;
pub mod error;
pub mod interner;
pub mod join;
pub mod loader;
pub mod optimize;
pub mod parser;
pub mod session;
pub mod table;

pub use aggregate::DropdownOption;
pub use column::{Column, ColumnType, ColumnValue, ValueKey};
pub use config::Config;
pub use error::{Error, Result, TableError};
pub use interner::{InternerStats, StringId, StringInterner};
pub use join::{build_enriched, build_toxicity, build_toxicity_with, inner_join, JoinPlan, JoinReport, JoinStage, RenameMap};
pub use loader::{load, load_with, ReferenceSet, ReferenceSource, ReferenceTable};
pub use optimize::optimize;
pub use parser::{parse_sample_file, parse_samples, records_to_table, SampleRecord};
pub use session::Session;
pub use table::{Schema, SortKey, SortOrder, Table};

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write_references(dir: &Path) {
        fs::write(
            dir.join("database.csv"),
            "ko;cpd;compoundclass;compoundname;genesymbol;genename;enzyme_activity;referenceAG\n\
             K00001;C00001;Aromatic;benzene;adhA;alcohol dehydrogenase;oxidase;EPA\n\
             K00001;C00002;Aromatic;toluene;adhA;alcohol dehydrogenase;oxidase;IARC\n\
             K00002;C00003;Metal;cadmium;cadA;cadmium transporter;transporter;EPA\n\
             K00003;C00004;Chlorinated;chloroform;cfrA;chloroform reductase;reductase;ATSDR\n",
        )
        .unwrap();
        fs::write(
            dir.join("kegg_degradation_pathways.csv"),
            "ko;pathname;genesymbol\n\
             K00001;Benzoate;adh\n\
             K00002;Metals;cad\n\
             K00003;Chloroalkane;cfr\n",
        )
        .unwrap();
        fs::write(
            dir.join("database_hadegDB.csv"),
            "Gene;ko;Pathway;compound_pathway\n\
             adhA;K00001;Aromatics;Benzoate\n\
             cadA;K00002;Metals;Cadmium\n",
        )
        .unwrap();
        fs::write(
            dir.join("database_toxcsm.csv"),
            "cpd;compoundname;SMILES;value_NR_AR;label_NR_AR;value_SR_ARE;label_SR_ARE\n\
             C00001;benzene;c1ccccc1;0.71;High Toxicity;0.12;Low Toxicity\n\
             C00003;cadmium;[Cd];0.33;Medium Toxicity;0.81;High Toxicity\n",
        )
        .unwrap();
    }

    fn config(dir: &Path) -> Config {
        Config {
            data_dir: dir.to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn test_complete_workflow() {
        let dir = tempfile::tempdir().unwrap();
        write_references(dir.path());
        let input = dir.path().join("samples.txt");
        fs::write(&input, ">S1\nK00001\nK00002\nK00003\n\n>S2\nK00001\nK09999\n").unwrap();

        let config = config(dir.path());
        let records = parse_sample_file(&input, &config).unwrap();
        assert_eq!(records.len(), 5);

        let references = ReferenceSet::load(&config).unwrap();
        assert!(references.annotation.table().column("ko").unwrap().is_categorical());

        let session = Session::from_parts(records, &references, &config).unwrap();
        let enriched = session.enriched();

        // K00003 has no degradation entry, K09999 no annotation.
        assert_eq!(enriched.len(), 5);
        assert_eq!(session.report().stage("annotation").unwrap().rows_dropped(), 1);
        assert_eq!(session.report().stage("degradation").unwrap().rows_dropped(), 1);
        assert!(enriched.has_column("genesymbol"));
        assert!(enriched.has_column("kegg_genesymbol"));

        let ranking = aggregate::compound_ranking(enriched).unwrap();
        assert_eq!(ranking.get_value(0, "compoundname").unwrap(), ColumnValue::from("benzene"));
        assert_eq!(ranking.get_value(0, "num_samples").unwrap(), ColumnValue::Int64(2));

        let pairs = aggregate::ko_per_sample_pathway(enriched, "Benzoate").unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs.get_value(0, "genesymbol").unwrap(), ColumnValue::from("adh"));

        let counts = aggregate::gene_sample_counts(enriched).unwrap();
        assert!(counts.to_csv().unwrap().starts_with("sample,Gene,compound_pathway,Pathway,ko_count\n"));

        let options = aggregate::dropdown_options(enriched, "compoundname").unwrap();
        let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["benzene", "cadmium", "toluene"]);

        let toxicity = session.toxicity();
        assert_eq!(toxicity.len(), 3);
        let heatmap = aggregate::toxicity_heatmap(toxicity).unwrap();
        assert_eq!(heatmap.len(), 6);
    }

    #[test]
    fn test_open_from_text() {
        let dir = tempfile::tempdir().unwrap();
        write_references(dir.path());

        let session = Session::open(&config(dir.path()), ">S1\nK00002\n").unwrap();
        assert_eq!(session.enriched().len(), 1);
        assert_eq!(session.toxicity().len(), 1);

        let json = session.toxicity().to_json().unwrap();
        let back = Table::from_json("toxicity", &json).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.get_value(0, "label_SR_ARE").unwrap(), ColumnValue::from("High Toxicity"));
    }

    #[test]
    fn test_missing_reference_is_file_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Session::open(&config(dir.path()), ">S1\nK00001\n").unwrap_err();
        assert!(matches!(err, Error::FileAccess { .. }));
    }

    #[test]
    fn test_bad_input_is_reported_before_loading() {
        let dir = tempfile::tempdir().unwrap();
        let err = Session::open(&config(dir.path()), ">S1\nfoo\n").unwrap_err();
        assert!(err.is_format());
        assert!(err.to_string().contains("foo"));
    }
}
