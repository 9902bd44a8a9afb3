mod builder;
mod defaults;
mod file;
mod models;

pub use builder::{build_replay_config, build_run_config};
