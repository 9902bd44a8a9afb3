//! # Core Module
//!
//! Stateless building blocks of the simulation monitor.
//!
//! - **Engine output** ([`log`]) - the line classifier, the typed event model and
//!   the two log reader strategies (snapshot polling and live streams)
//! - **Models** ([`models`]) - residue and atom-pair keys, ligand topology
//! - **File I/O** ([`io`]) - ligand `.inp`/`.ic` readers and the solution table
//! - **Utilities** ([`utils`]) - fixed-column text helpers
//!
//! Nothing in this layer holds run state; that lives in [`crate::engine`].

pub mod io;
pub mod log;
pub mod models;
pub mod utils;
