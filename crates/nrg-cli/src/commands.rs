pub mod replay;
pub mod run;

use crate::error::{CliError, Result};
use nrgsuite::core::io::table::SolutionTable;
use nrgsuite::engine::progress::{Progress, ProgressCallback};
use nrgsuite::engine::state::ParseState;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, warn};

pub(crate) fn open_solution_table(path: Option<&Path>) -> Result<Option<SolutionTable<File>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let table = SolutionTable::create(path).map_err(|e| {
        CliError::Other(
            anyhow::Error::new(e)
                .context(format!("Failed to create solution table '{}'", path.display())),
        )
    })?;
    info!("Writing ready generations to '{}'.", path.display());
    Ok(Some(table))
}

/// Wraps `forward` so every ready generation is also appended to `table`.
pub(crate) fn with_solution_table(
    forward: ProgressCallback<'static>,
    table: Option<SolutionTable<File>>,
) -> ProgressCallback<'static> {
    let Some(table) = table else {
        return forward;
    };
    let table = Mutex::new(table);
    Box::new(move |progress: Progress| {
        if let Progress::GenerationReady { generation, rows } = &progress {
            match table.lock() {
                Ok(mut table) => {
                    if let Err(e) = table.append_generation(*generation, rows) {
                        warn!("Failed to record generation {} in the solution table: {}", generation, e);
                    }
                }
                Err(_) => warn!("Solution table lock poisoned; generation {} not recorded.", generation),
            }
        }
        forward(progress);
    })
}

pub(crate) fn summarize(state: &ParseState) -> String {
    let mut lines = vec![format!(
        "Phase: {:?}, last generation: {}, ready windows: {}, unrecognized lines: {}",
        state.phase(),
        state
            .generation()
            .map_or_else(|| "none".to_string(), |g| g.to_string()),
        state.windows_closed(),
        state.unrecognized_lines(),
    )];
    if let Some(window) = state.last_ready_window() {
        lines.push(format!(
            "Generation {} ranked by {}:",
            window.generation, window.mode
        ));
        for row in &window.rows {
            lines.push(format!(
                "  #{:<3} value {:>10.3}  fitness {:>8.3}",
                row.rank, row.value, row.fitness
            ));
        }
    }
    if !state.rotamers().is_empty() {
        lines.push(format!("Flexible residues observed: {}", state.rotamers().len()));
    }
    lines.join("\n")
}
