//! # Workflows Module
//!
//! Top-level entry points that tie [`crate::core`] and [`crate::engine`]
//! together.
//!
//! - **Live monitoring** ([`monitor`]) - launch the docking engine and follow its
//!   output on a worker thread until the run completes, fails or is stopped
//! - **Replay** ([`replay`]) - run a finished log through the same parser offline

pub mod monitor;
pub mod replay;
