//! # Engine Module
//!
//! The stateful side of the monitor: everything that changes while a docking
//! run is in progress.
//!
//! - **Configuration** ([`config`]) - parsing and monitoring settings with builders
//! - **State Tracking** ([`state`]) - [`state::ParseState`], run phases and row windows
//! - **Event Demultiplexing** ([`demux`]) - applies classified lines and raises notifications
//! - **Process Control** ([`controller`]) - start, poll and terminate the docking engine
//! - **Run Signals** ([`signals`]) - pause and stop requests from the host
//! - **Progress Monitoring** ([`progress`]) - callback surface for host applications
//! - **Error Handling** ([`error`]) - the run failure taxonomy

pub mod config;
pub mod controller;
pub mod demux;
pub mod error;
pub mod progress;
pub mod signals;
pub mod state;
