use crate::core::models::keys::{AtomPairKey, ResidueKey};
use nalgebra::Point3;
use std::fmt;

/// Which scalar ordered the block of rows following a `best by` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankingMode {
    ByEnergy,
    ByFitness,
}

impl fmt::Display for RankingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankingMode::ByEnergy => f.write_str("energy"),
            RankingMode::ByFitness => f.write_str("fitness"),
        }
    }
}

/// One chromosome of a generation as printed by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionRow {
    pub rank: u32,
    pub genes: Vec<f64>,
    pub value: f64,
    pub fitness: f64,
}

/// A typed view of one engine output line.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseEvent {
    GridVertex {
        index: u32,
        position: Point3<f64>,
    },
    GenerationStart {
        number: u32,
    },
    RankingMode {
        mode: RankingMode,
    },
    /// `column_offset` is the byte column where the gene values start; the
    /// coordinate reconstruction slices fixed-width fields from there.
    SolutionRow {
        row: SolutionRow,
        column_offset: usize,
    },
    RotamerAnnouncement {
        residue: ResidueKey,
        dihedrals: Vec<f64>,
    },
    FlexDihedralShift {
        atoms: AtomPairKey,
        shift: f64,
    },
    ListedAtom {
        position: u32,
        atom_index: u32,
    },
    ProteinCentroid {
        center: Point3<f64>,
    },
    ClusteringStarted,
    Done,
    ReadySignal,
    FatalError {
        message: String,
    },
    Unrecognized {
        raw: String,
    },
}

impl ParseEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ParseEvent::GridVertex { .. } => "grid-vertex",
            ParseEvent::GenerationStart { .. } => "generation-start",
            ParseEvent::RankingMode { .. } => "ranking-mode",
            ParseEvent::SolutionRow { .. } => "solution-row",
            ParseEvent::RotamerAnnouncement { .. } => "rotamer",
            ParseEvent::FlexDihedralShift { .. } => "flex-dihedral-shift",
            ParseEvent::ListedAtom { .. } => "listed-atom",
            ParseEvent::ProteinCentroid { .. } => "protein-centroid",
            ParseEvent::ClusteringStarted => "clustering-started",
            ParseEvent::Done => "done",
            ParseEvent::ReadySignal => "ready",
            ParseEvent::FatalError { .. } => "fatal-error",
            ParseEvent::Unrecognized { .. } => "unrecognized",
        }
    }
}
