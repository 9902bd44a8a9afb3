use crate::cli::RankingArg;
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    Snapshot,
    Stream,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileEngineConfig {
    pub program: Option<PathBuf>,
    pub args: Option<Vec<String>>,
    pub shell_command: Option<String>,
    pub work_dir: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileOutputConfig {
    pub mode: Option<DeliveryMode>,
    pub log: Option<PathBuf>,
    pub update_file: Option<PathBuf>,
    pub scratch: Option<PathBuf>,
    pub solution_table: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSimulationConfig {
    pub generations: Option<u32>,
    pub rows_per_generation: Option<u32>,
    pub draw_frequency: Option<u32>,
    pub ready_ranking: Option<RankingArg>,
    pub flexible_dihedrals: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileLigandConfig {
    pub inp: Option<PathBuf>,
    pub ic: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileMonitorConfig {
    pub poll_interval_ms: Option<u64>,
    pub read_timeout_secs: Option<u64>,
}

/// The TOML configuration file. Every section and key is optional.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub engine: Option<FileEngineConfig>,
    pub output: Option<FileOutputConfig>,
    pub simulation: Option<FileSimulationConfig>,
    pub ligand: Option<FileLigandConfig>,
    pub monitor: Option<FileMonitorConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
