use super::{open_solution_table, summarize, with_solution_table};
use crate::cli::ReplayArgs;
use crate::config::build_replay_config;
use crate::error::Result;
use crate::ui::{CliProgressHandler, UiEvent};
use nrgsuite::engine::progress::ProgressReporter;
use nrgsuite::workflows;
use tokio::sync::mpsc;
use tokio::task;
use tracing::info;

pub async fn run(args: ReplayArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    info!("Building replay configuration...");
    let config = build_replay_config(&args)?;
    let table = open_solution_table(config.solution_table.as_deref())?;

    let progress_handler = CliProgressHandler::new(ui_sender);
    let callback = with_solution_table(progress_handler.get_callback(), table);

    info!("Replaying simulation log '{}'.", config.log_path.display());
    let state = task::block_in_place(|| {
        let reporter = ProgressReporter::with_callback(callback);
        workflows::replay::run(&config.log_path, &config.parse, &reporter)
    })?;

    println!("{}", summarize(&state));
    Ok(())
}
