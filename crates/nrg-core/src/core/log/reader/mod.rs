//! Incremental line sources for engine output.
//!
//! Both strategies deliver only newline-terminated lines, in producer order,
//! and never deliver a line twice. A reader blocks for at most one poll
//! interval when nothing new is available; transient I/O failures are retried
//! within the configured timeout before a [`ReadError`] is reported.

mod snapshot;
mod stream;

pub use snapshot::SnapshotReader;
pub use stream::StreamReader;

use std::io;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::trace;

/// What a single [`LogReader::next_batch`] call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Batch {
    /// Newly completed lines, possibly none if the producer has been quiet.
    Lines(Vec<String>),
    /// The producer closed its output; no further lines will arrive.
    EndOfStream,
}

/// The two well-known files the engine writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogSource {
    InitialLog,
    UpdateFile,
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Could not copy/read '{path}' within {waited:?}: {source}", path = path.display())]
    Timeout {
        path: PathBuf,
        waited: Duration,
        #[source]
        source: io::Error,
    },

    #[error("Could not remove consumed update file '{path}' within {waited:?}: {source}", path = path.display())]
    RecycleTimeout {
        path: PathBuf,
        waited: Duration,
        #[source]
        source: io::Error,
    },

    #[error("Could not prepare scratch location '{path}': {source}", path = path.display())]
    Scratch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Engine output stream failed: {0}")]
    Stream(#[source] io::Error),
}

/// A restartable, incremental source of complete engine output lines.
pub trait LogReader: Send {
    /// Returns the lines completed since the previous call.
    fn next_batch(&mut self) -> Result<Batch, ReadError>;

    /// Switches to another logical source. Sources without a file-level notion
    /// of "source" ignore the request.
    fn follow(&mut self, source: LogSource) -> Result<(), ReadError> {
        trace!("Reader ignores request to follow {:?}", source);
        Ok(())
    }

    /// Discards the consumed update file so the producer can write the next one.
    fn recycle(&mut self) -> Result<(), ReadError> {
        Ok(())
    }

    /// Whether the reader eventually yields [`Batch::EndOfStream`] once the
    /// producer is gone.
    fn reports_end_of_stream(&self) -> bool {
        false
    }
}

impl<R: LogReader + ?Sized> LogReader for Box<R> {
    fn next_batch(&mut self) -> Result<Batch, ReadError> {
        (**self).next_batch()
    }

    fn follow(&mut self, source: LogSource) -> Result<(), ReadError> {
        (**self).follow(source)
    }

    fn recycle(&mut self) -> Result<(), ReadError> {
        (**self).recycle()
    }

    fn reports_end_of_stream(&self) -> bool {
        (**self).reports_end_of_stream()
    }
}

/// Returns the newline-terminated lines of `text`, without their terminators.
/// A trailing fragment that is still being written is left out.
pub fn complete_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n')
        .filter_map(|line| line.strip_suffix('\n'))
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Runs `op` until it succeeds, sleeping `interval` between attempts. Gives up
/// with the last error once `timeout` has elapsed.
pub(crate) fn retry_within<T>(
    interval: Duration,
    timeout: Duration,
    mut op: impl FnMut() -> io::Result<T>,
) -> Result<T, (io::Error, Duration)> {
    let started = Instant::now();
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) => {
                let waited = started.elapsed();
                if waited >= timeout {
                    return Err((e, waited));
                }
                trace!("Transient I/O failure, retrying: {}", e);
                thread::sleep(interval);
            }
        }
    }
}
