//! Readers for the ligand input files handed to the docking engine and the
//! CSV writer for ready generations.
//!
//! The `.inp` and `.ic` files are fixed-column text formats; both parsers
//! report the offending line and columns when a numeric field is malformed.

pub mod ic;
pub mod inp;
pub mod table;

use crate::core::models::ligand::LigandTopology;
use ic::{IcError, IcFile};
use inp::{InpError, InpFile};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LigandLoadError {
    #[error("Failed to read ligand input file: {0}")]
    Inp(#[from] InpError),
    #[error("Failed to read ligand internal coordinates: {0}")]
    Ic(#[from] IcError),
}

/// Loads the ligand topology from its `.inp` and `.ic` files.
pub fn load_ligand<P: AsRef<Path>, Q: AsRef<Path>>(
    inp_path: P,
    ic_path: Q,
) -> Result<LigandTopology, LigandLoadError> {
    let records = InpFile::read_from_path(inp_path)?;
    let internal_coordinates = IcFile::read_from_path(ic_path)?;
    Ok(LigandTopology {
        neighbours: records.neighbours,
        flex_bonds: records.flex_bonds,
        internal_coordinates,
    })
}
