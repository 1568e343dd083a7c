/// Pipeline configuration
///
/// Where the reference tables live, how they are parsed, and the explicit
/// rename maps applied before each join. Built from defaults, optionally a
/// JSON file, then environment overrides.

use crate::error::{Error, Result};
use crate::loader::ReferenceSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Largest accepted sample input, in bytes
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 5 * 1024 * 1024;

/// Extension required for sample input files
pub const INPUT_EXTENSION: &str = "txt";

/// Name the pathway map's `genesymbol` takes in the enriched table
pub const KEGG_GENE_COLUMN: &str = "kegg_genesymbol";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub annotation_file: String,
    pub pathway_file: String,
    pub degradation_file: String,
    pub toxicity_file: String,
    /// Field separator of the production reference files
    pub separator: char,
    /// Recast low-cardinality string columns to categorical before joining
    pub optimize_types: bool,
    pub max_input_bytes: u64,
    /// Renames applied to the pathway map before it is joined
    pub pathway_renames: BTreeMap<String, String>,
    /// Renames applied to the degradation map before it is joined
    pub degradation_renames: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let mut pathway_renames = BTreeMap::new();
        pathway_renames.insert("genesymbol".to_string(), KEGG_GENE_COLUMN.to_string());

        Config {
            data_dir: PathBuf::from("data"),
            annotation_file: ReferenceSource::Annotation.default_file_name().to_string(),
            pathway_file: ReferenceSource::PathwayMap.default_file_name().to_string(),
            degradation_file: ReferenceSource::DegradationMap.default_file_name().to_string(),
            toxicity_file: ReferenceSource::Toxicity.default_file_name().to_string(),
            separator: ';',
            optimize_types: true,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            pathway_renames,
            degradation_renames: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Read a JSON config file. Absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(Error::FileAccess {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::format_with(format!("Cannot read config '{}'", path.display()), e))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::format_with(format!("Invalid config '{}'", path.display()), e))
    }

    /// Apply `BIOREMPP_DATA_DIR`, `BIOREMPP_SEPARATOR` and `BIOREMPP_OPTIMIZE`.
    pub fn with_env_overrides(self) -> Config {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Config
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("BIOREMPP_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Some(sep) = lookup("BIOREMPP_SEPARATOR") {
            let mut chars = sep.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => self.separator = c,
                _ => log::warn!("Ignoring BIOREMPP_SEPARATOR='{}': expected a single character", sep),
            }
        }

        if let Some(flag) = lookup("BIOREMPP_OPTIMIZE") {
            match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.optimize_types = true,
                "0" | "false" | "no" | "off" => self.optimize_types = false,
                other => log::warn!("Ignoring BIOREMPP_OPTIMIZE='{}': expected a boolean", other),
            }
        }

        self
    }

    /// Full path of a production reference file
    pub fn reference_path(&self, source: ReferenceSource) -> PathBuf {
        let file = match source {
            ReferenceSource::Annotation => &self.annotation_file,
            ReferenceSource::PathwayMap => &self.pathway_file,
            ReferenceSource::DegradationMap => &self.degradation_file,
            ReferenceSource::Toxicity => &self.toxicity_file,
        };
        self.data_dir.join(file)
    }

    /// Separator as a single byte for the CSV reader
    pub fn separator_byte(&self) -> Result<u8> {
        if self.separator.is_ascii() {
            Ok(self.separator as u8)
        } else {
            Err(Error::format(format!(
                "Separator '{}' is not a single-byte character",
                self.separator
            )))
        }
    }
}
