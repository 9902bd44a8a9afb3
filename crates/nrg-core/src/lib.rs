//! # NRGsuite Simulation Monitor
//!
//! Runs the FlexAID docking engine, follows its output while it runs and
//! turns it into typed events and notifications for a host application.
//!
//! ## Layers
//!
//! - **[`core`]: stateless pieces.** The line classifier and event model, the
//!   two log reader strategies, typed keys, ligand models and input files.
//!
//! - **[`engine`]: run state.** The demultiplexer and its [`engine::state::ParseState`],
//!   the process controller, configuration, errors and progress callbacks.
//!
//! - **[`workflows`]: entry points.** [`workflows::monitor`] for live runs and
//!   [`workflows::replay`] for finished logs.

pub mod core;
pub mod engine;
pub mod workflows;
