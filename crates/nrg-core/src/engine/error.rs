use thiserror::Error;

use crate::core::log::reader::ReadError;

/// Prefix put in front of error lines forwarded from the engine.
pub const ENGINE_MESSAGE_PREFIX: &str = "*FlexAID ";

/// Breaches of the row-window contract the engine output must follow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("generation {generation}: expected rank {expected}, found rank {found}")]
    RankOutOfOrder {
        generation: u32,
        expected: u32,
        found: u32,
    },

    #[error("generation {generation}: rank {rank} exceeds the {rows_per_generation} rows declared per generation")]
    RowOverflow {
        generation: u32,
        rank: u32,
        rows_per_generation: u32,
    },

    #[error("generation {generation}: window closed after {received} of {expected} rows")]
    UnclosedWindow {
        generation: u32,
        received: u32,
        expected: u32,
    },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("could not execute the docking engine '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("*NRGsuite ERROR: could not copy/read temporary files: {source}")]
    ReadFailure {
        #[from]
        source: ReadError,
    },

    #[error("{message}")]
    EngineReported { message: String },

    #[error("the docking engine exited abnormally with code {code}")]
    AbnormalExit { code: i32 },

    #[error("unexpected engine output: {0}")]
    Protocol(#[from] ProtocolViolation),

    #[error("the simulation was stopped")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Builds the error for an `ERROR` line printed by the engine.
    pub fn engine_reported(line: &str) -> Self {
        Self::EngineReported {
            message: format!("{ENGINE_MESSAGE_PREFIX}{}", line.trim_end()),
        }
    }
}
