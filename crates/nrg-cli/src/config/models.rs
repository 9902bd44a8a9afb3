use nrgsuite::engine::config::{MonitorConfig, ParseConfig};
use std::path::PathBuf;

pub struct RunConfig {
    pub monitor: MonitorConfig,
    pub solution_table: Option<PathBuf>,
}

pub struct ReplayConfig {
    pub log_path: PathBuf,
    pub parse: ParseConfig,
    pub solution_table: Option<PathBuf>,
}
