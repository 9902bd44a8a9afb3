use super::{open_solution_table, summarize, with_solution_table};
use crate::cli::RunArgs;
use crate::config::build_run_config;
use crate::error::{CliError, Result};
use crate::ui::{CliProgressHandler, UiEvent};
use nrgsuite::engine::signals::RunSignals;
use nrgsuite::workflows;
use tokio::sync::mpsc;
use tokio::task::{self, JoinHandle};
use tracing::{info, warn};

pub async fn run(args: RunArgs, ui_sender: mpsc::Sender<UiEvent>) -> Result<()> {
    info!("Building monitor configuration...");
    let config = build_run_config(&args)?;
    let table = open_solution_table(config.solution_table.as_deref())?;

    let progress_handler = CliProgressHandler::new(ui_sender);
    let callback = with_solution_table(progress_handler.get_callback(), table);

    let signals = RunSignals::new();
    let watchers = spawn_signal_watchers(&signals);

    info!(
        "Launching docking engine '{}'.",
        config.monitor.command.program_name()
    );
    let worker = workflows::monitor::spawn_worker(config.monitor, callback, signals)?;
    let joined = task::spawn_blocking(move || worker.join())
        .await
        .map_err(|e| CliError::Other(anyhow::anyhow!("Monitor task failed: {}", e)));

    for watcher in watchers {
        watcher.abort();
    }

    let report = joined?
        .map_err(|_| CliError::Other(anyhow::anyhow!("Monitor worker panicked")))??;

    info!(
        "Docking engine exited with code {}.",
        report
            .exit_code
            .map_or_else(|| "unknown".to_string(), |c| c.to_string())
    );
    println!("{}", summarize(&report.state));
    Ok(())
}

/// Ctrl-C stops the run. On Unix, SIGUSR1 pauses it and SIGUSR2 resumes it.
fn spawn_signal_watchers(signals: &RunSignals) -> Vec<JoinHandle<()>> {
    let mut watchers = Vec::new();

    let stop = signals.clone();
    watchers.push(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping the docking engine...");
            stop.stop();
        }
    }));

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        for (kind, pause) in [
            (SignalKind::user_defined1(), true),
            (SignalKind::user_defined2(), false),
        ] {
            let signals = signals.clone();
            watchers.push(tokio::spawn(async move {
                let mut stream = match signal(kind) {
                    Ok(stream) => stream,
                    Err(e) => {
                        warn!("Could not install pause/resume signal handler: {}", e);
                        return;
                    }
                };
                while stream.recv().await.is_some() {
                    if pause {
                        info!("Pausing simulation monitor.");
                        signals.pause();
                    } else {
                        info!("Resuming simulation monitor.");
                        signals.resume();
                    }
                }
            }));
        }
    }

    watchers
}
