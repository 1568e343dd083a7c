/// Pipeline Example
///
/// This example demonstrates:
/// - Parsing a multi-sample KO list
/// - Loading the four reference tables from `;`-separated files
/// - The ordered inner joins and their per-stage report
/// - A handful of aggregated views
/// - Hierarchical clustering of the samples

use biorempp::aggregate::{self, DistanceMetric, Linkage};
use biorempp::{Config, ReferenceSet, Session};
use std::fs;

const ANNOTATION: &str = "\
ko;cpd;compoundclass;compoundname;genesymbol;enzyme_activity;referenceAG
K00001;C00001;Aromatic;benzene;adhA;oxidase;EPA
K00001;C00002;Aromatic;toluene;adhA;oxidase;IARC
K00002;C00003;Metal;cadmium;cadA;transporter;EPA
K00003;C00004;Chlorinated;chloroform;cfrA;reductase;ATSDR
";

const PATHWAYS: &str = "\
ko;pathname;genesymbol
K00001;Benzoate degradation;adh
K00002;Metal resistance;cad
K00003;Chloroalkane degradation;cfr
";

const DEGRADATION: &str = "\
Gene;ko;Pathway;compound_pathway
adhA;K00001;Aromatics;Benzoate
cadA;K00002;Metals;Cadmium
cfrA;K00003;Chlorinated;Chloroform
";

const TOXICITY: &str = "\
cpd;compoundname;value_NR_AR;label_NR_AR;value_SR_ARE;label_SR_ARE
C00001;benzene;0.71;High Toxicity;0.12;Low Toxicity
C00003;cadmium;0.33;Medium Toxicity;0.81;High Toxicity
";

const SAMPLES: &str = "\
>Soil_A
K00001
K00002
K00003

>Soil_B
K00001
K00042
";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== BioRemPP Pipeline Example ===\n");

    // 1. Reference files
    println!("1. Writing reference tables...");
    let dir = tempfile::tempdir()?;
    let config = Config {
        data_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    fs::write(dir.path().join(&config.annotation_file), ANNOTATION)?;
    fs::write(dir.path().join(&config.pathway_file), PATHWAYS)?;
    fs::write(dir.path().join(&config.degradation_file), DEGRADATION)?;
    fs::write(dir.path().join(&config.toxicity_file), TOXICITY)?;

    let references = ReferenceSet::load(&config)?;
    println!("   annotation has {} rows\n", references.annotation.table().len());

    // 2. Parse and join
    println!("2. Parsing samples and joining...");
    let session = Session::open(&config, SAMPLES)?;
    println!("   {} records, {} enriched rows", session.records().len(), session.enriched().len());
    print!("{}", session.report());
    println!("   {} rows dropped by joins\n", session.report().rows_dropped());

    // 3. Views
    println!("3. KO count per sample:");
    print!("{}", aggregate::ko_count_per_sample(session.enriched())?.to_csv()?);

    println!("\n4. Compound ranking:");
    print!("{}", aggregate::compound_ranking(session.enriched())?.to_csv()?);

    println!("\n5. Samples on 'Benzoate degradation':");
    print!("{}", aggregate::ko_per_sample_pathway(session.enriched(), "Benzoate degradation")?.to_csv()?);

    println!("\n6. Compound options:");
    for option in aggregate::dropdown_options(session.enriched(), "compoundname")? {
        println!("   {}", serde_json::to_string(&option)?);
    }

    println!("\n7. Toxicity heatmap rows:");
    print!("{}", aggregate::toxicity_heatmap(session.toxicity())?.to_csv()?);

    println!("\n8. Sample clustering (euclidean, average):");
    let clustering = aggregate::cluster_samples(session.enriched(), DistanceMetric::Euclidean, Linkage::Average)?;
    println!("   samples {:?}", clustering.samples());
    for row in clustering.linkage_matrix() {
        println!("   {:?}", row);
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
