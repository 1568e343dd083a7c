/// Analysis session
///
/// One parse, one load and one join sequence, frozen into a read-only
/// snapshot. Aggregations borrow the snapshot; nothing in it changes after
/// construction, so a `Session` can be shared between threads as is.

use crate::config::Config;
use crate::error::Result;
use crate::join::{build_enriched, build_toxicity, JoinPlan, JoinReport};
use crate::loader::ReferenceSet;
use crate::optimize::{optimize, GENERAL_COLUMNS};
use crate::parser::{parse_samples, records_to_table, SampleRecord};
use crate::table::Table;

#[derive(Debug, Clone)]
pub struct Session {
    records: Vec<SampleRecord>,
    enriched: Table,
    toxicity: Table,
    report: JoinReport,
}

impl Session {
    /// Parse `input`, load the references named by `config` and join.
    pub fn open(config: &Config, input: &str) -> Result<Session> {
        let records = parse_samples(input)?;
        let references = ReferenceSet::load(config)?;
        Session::from_parts(records, &references, config)
    }

    /// Join already parsed records against already loaded references.
    pub fn from_parts(records: Vec<SampleRecord>, references: &ReferenceSet, config: &Config) -> Result<Session> {
        let mut base = records_to_table(&records)?;
        if config.optimize_types {
            base = optimize(&base, GENERAL_COLUMNS);
        }

        let plan = JoinPlan::from(config);
        let (enriched, mut report) = build_enriched(
            &base,
            references.annotation.table(),
            references.pathway_map.table(),
            references.degradation_map.table(),
            &plan,
        )?;
        let (toxicity, stage) = build_toxicity(&enriched, references.toxicity.table())?;
        report.push(stage);

        log::info!(
            "Session ready: {} records, {} enriched rows, {} toxicity rows",
            records.len(),
            enriched.len(),
            toxicity.len()
        );
        log::debug!("Join stages:\n{}", report);

        Ok(Session {
            records,
            enriched,
            toxicity,
            report,
        })
    }

    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    /// Records joined with annotation, pathway map and degradation map
    pub fn enriched(&self) -> &Table {
        &self.enriched
    }

    /// Distinct `(sample, compoundclass, cpd, ko)` tuples with toxicity data
    pub fn toxicity(&self) -> &Table {
        &self.toxicity
    }

    pub fn report(&self) -> &JoinReport {
        &self.report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate;
    use crate::loader::read_delimited;
    use std::sync::Arc;
    use std::thread;

    fn references() -> ReferenceSet {
        let annotation = "ko;cpd;compoundclass;compoundname;genesymbol;enzyme_activity;referenceAG\n\
                          K00001;C1;Aromatic;benzene;adhA;oxidase;EPA\n\
                          K00002;C2;Metal;cadmium;cadA;reductase;IARC\n";
        let pathway = "ko;pathname;genesymbol\nK00001;Benzoate;adh\nK00002;Metals;cad\n";
        let degradation = "Gene;ko;Pathway;compound_pathway\nadhA;K00001;Aromatics;Benzoate\n";
        let toxicity = "cpd;compoundname;value_NR_AR;label_NR_AR\nC1;benzene;0.7;High Toxicity\n";

        ReferenceSet::from_tables(
            read_delimited("annotation", annotation.as_bytes(), b';').unwrap(),
            read_delimited("pathway_map", pathway.as_bytes(), b';').unwrap(),
            read_delimited("degradation_map", degradation.as_bytes(), b';').unwrap(),
            read_delimited("toxicity", toxicity.as_bytes(), b';').unwrap(),
        )
        .unwrap()
    }

    fn records() -> Vec<SampleRecord> {
        parse_samples(">S1\nK00001\nK00002\n>S2\nK00001\nK09999\n").unwrap()
    }

    #[test]
    fn test_session_from_parts() {
        let session = Session::from_parts(records(), &references(), &Config::default()).unwrap();

        assert_eq!(session.records().len(), 4);
        assert_eq!(session.enriched().name(), "enriched");
        assert_eq!(session.enriched().len(), 2);
        assert!(session.enriched().has_column("kegg_genesymbol"));
        assert_eq!(session.toxicity().len(), 2);

        let stages: Vec<&str> = session.report().stages().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(stages, vec!["annotation", "pathway", "degradation", "toxicity"]);
        assert_eq!(session.report().stage("annotation").unwrap().unmatched_left_rows, 1);
        assert_eq!(session.report().stage("degradation").unwrap().unmatched_left_rows, 1);
    }

    #[test]
    fn test_session_optimizer_is_result_neutral() {
        let plain = Config {
            optimize_types: false,
            ..Config::default()
        };
        let with = Session::from_parts(records(), &references().optimized(), &Config::default()).unwrap();
        let without = Session::from_parts(records(), &references(), &plain).unwrap();

        let rows = |t: &Table| t.iter_rows().collect::<Vec<_>>();
        assert_eq!(rows(with.enriched()), rows(without.enriched()));
        assert_eq!(rows(with.toxicity()), rows(without.toxicity()));
    }

    #[test]
    fn test_session_is_shared_across_threads() {
        let session = Arc::new(Session::from_parts(records(), &references(), &Config::default()).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let session = Arc::clone(&session);
                thread::spawn(move || aggregate::ko_count_per_sample(session.enriched()).unwrap().len())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 2);
        }
    }
}
