use crate::core::log::classifier::classify;
use crate::engine::config::ParseConfig;
use crate::engine::demux::Demultiplexer;
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressReporter;
use crate::engine::state::ParseState;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, instrument};

/// Feeds a finished engine log through the classifier and demultiplexer.
///
/// Every line is applied, including a last line without a trailing newline.
/// A log that ends without an error settles as completed.
#[instrument(skip_all, name = "replay_workflow", fields(path = %path.as_ref().display()))]
pub fn run<P: AsRef<Path>>(
    path: P,
    config: &ParseConfig,
    reporter: &ProgressReporter,
) -> Result<ParseState, EngineError> {
    let file = File::open(path.as_ref())?;
    replay_from(BufReader::new(file), config, reporter)
}

pub fn replay_from(
    reader: impl BufRead,
    config: &ParseConfig,
    reporter: &ProgressReporter,
) -> Result<ParseState, EngineError> {
    let mut demux = Demultiplexer::new(config, false, reporter);
    let mut line_count = 0usize;

    for line in reader.split(b'\n') {
        let bytes = line?;
        let text = String::from_utf8_lossy(&bytes);
        demux.apply(classify(&text))?;
        line_count += 1;
    }

    demux.finish(0)?;
    info!(
        "Replayed {} line(s): {} window(s) closed, {} unrecognized.",
        line_count,
        demux.state().windows_closed(),
        demux.state().unrecognized_lines()
    );
    Ok(demux.into_state())
}
