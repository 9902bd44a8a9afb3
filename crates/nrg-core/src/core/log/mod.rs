//! Engine output handling: line classification and incremental readers.
//!
//! [`classifier::classify`] turns one raw line into a [`event::ParseEvent`];
//! the [`reader`] strategies produce those lines from a growing log file or
//! from the engine's pipes.

pub mod classifier;
pub mod event;
pub mod reader;
