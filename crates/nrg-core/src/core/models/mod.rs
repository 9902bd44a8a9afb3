//! Typed identifiers and ligand models shared by the parser and its consumers.
//!
//! - [`keys`] - residue and atom-pair keys in the engine's printed form
//! - [`ligand`] - flexible bonds, neighbour records and internal coordinates

pub mod keys;
pub mod ligand;
