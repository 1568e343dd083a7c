/// BioRemPP report
///
/// Parses a sample file, joins it against the reference tables and prints the
/// join report followed by a few aggregated views as CSV.
///
/// Usage: `biorempp <samples.txt>`; the input may also come from
/// `BIOREMPP_INPUT`. `BIOREMPP_CONFIG` names an optional JSON config file.

use biorempp::{aggregate, parse_sample_file, Config, ReferenceSet, ReferenceSource, Session};
use std::path::PathBuf;
use std::process::ExitCode;

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let input = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("BIOREMPP_INPUT").ok())
        .map(PathBuf::from)
        .ok_or("usage: biorempp <samples.txt>")?;

    let config = match std::env::var("BIOREMPP_CONFIG") {
        Ok(path) => Config::from_json_file(&PathBuf::from(path))?,
        Err(_) => Config::default(),
    }
    .with_env_overrides();
    for source in ReferenceSource::all() {
        log::debug!("{}: {}", source.name(), config.reference_path(source).display());
    }

    let records = parse_sample_file(&input, &config)?;
    let references = ReferenceSet::load(&config)?;
    let session = Session::from_parts(records, &references, &config)?;

    println!("# joins");
    print!("{}", session.report());
    println!("# ko_count_per_sample");
    print!("{}", aggregate::ko_count_per_sample(session.enriched())?.to_csv()?);
    println!("# compound_ranking");
    print!("{}", aggregate::compound_ranking(session.enriched())?.to_csv()?);
    println!("# sample_ranking");
    print!("{}", aggregate::sample_ranking(session.enriched())?.to_csv()?);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
