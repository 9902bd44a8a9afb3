use crate::cli::RankingArg;
use directories::ProjectDirs;
use std::path::PathBuf;

pub struct DefaultsConfig {
    pub poll_interval_ms: u64,
    pub read_timeout_secs: u64,
    pub draw_frequency: u32,
    pub ready_ranking: RankingArg,
    pub log_file_name: &'static str,
    pub scratch_file_name: &'static str,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            read_timeout_secs: 60,
            draw_frequency: 1,
            ready_ranking: RankingArg::Energy,
            log_file_name: "flexaid.log",
            scratch_file_name: ".read",
        }
    }
}

/// Per-user cache directory holding scratch copies of the polled log.
pub fn default_scratch_dir() -> Option<PathBuf> {
    ProjectDirs::from("ca", "NRGlab", "NRGsuite").map(|dirs| dirs.cache_dir().to_path_buf())
}
