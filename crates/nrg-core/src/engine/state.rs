use crate::core::log::event::{RankingMode, SolutionRow};
use crate::core::models::keys::{AtomPairKey, ResidueKey};
use crate::core::models::ligand::FlexBond;
use nalgebra::{Point3, Vector3};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    AwaitingStart,
    Running,
    Paused,
    Completed,
    Failed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed)
    }
}

/// The block of ranked rows printed after one `best by` marker.
#[derive(Debug, Clone, PartialEq)]
pub struct RowWindow {
    pub generation: u32,
    pub mode: RankingMode,
    pub rows: Vec<SolutionRow>,
}

impl RowWindow {
    pub fn new(generation: u32, mode: RankingMode) -> Self {
        Self {
            generation,
            mode,
            rows: Vec::new(),
        }
    }

    pub fn next_rank(&self) -> u32 {
        self.rows.len() as u32
    }

    pub fn is_complete(&self, rows_per_generation: u32) -> bool {
        self.next_rank() >= rows_per_generation
    }
}

/// Side-chain dihedrals announced for each flexible residue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RotamerTable {
    dihedrals: BTreeMap<ResidueKey, Vec<f64>>,
    counts: BTreeMap<ResidueKey, usize>,
}

impl RotamerTable {
    /// Appends one announcement. The first announcement of a residue starts
    /// its list; every announcement adds one to its count.
    pub fn record(&mut self, residue: ResidueKey, dihedrals: &[f64]) {
        self.dihedrals
            .entry(residue.clone())
            .or_default()
            .extend_from_slice(dihedrals);
        *self.counts.entry(residue).or_insert(0) += 1;
    }

    pub fn dihedrals(&self, residue: &ResidueKey) -> Option<&[f64]> {
        self.dihedrals.get(residue).map(Vec::as_slice)
    }

    pub fn count(&self, residue: &ResidueKey) -> usize {
        self.counts.get(residue).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn residues(&self) -> impl Iterator<Item = &ResidueKey> {
        self.counts.keys()
    }
}

/// The protein centroid and two unit-offset points along X and Y.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFrame {
    pub origin: Point3<f64>,
    pub x_axis: Point3<f64>,
    pub y_axis: Point3<f64>,
}

impl ReferenceFrame {
    pub fn from_centroid(center: Point3<f64>) -> Self {
        Self {
            origin: center,
            x_axis: center + Vector3::x(),
            y_axis: center + Vector3::y(),
        }
    }
}

/// Everything learned from the engine output so far.
///
/// Only the demultiplexer writes to it; consumers get clones through
/// notifications or the final run report.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseState {
    pub(crate) phase: Phase,
    pub(crate) generation: Option<u32>,
    pub(crate) ranking_mode: Option<RankingMode>,
    pub(crate) top_rank: Option<u32>,
    pub(crate) window: Option<RowWindow>,
    pub(crate) last_ready: Option<RowWindow>,
    pub(crate) rotamers: RotamerTable,
    pub(crate) dihedral_shifts: BTreeMap<AtomPairKey, f64>,
    pub(crate) grid: BTreeMap<u32, Point3<f64>>,
    pub(crate) reference_frame: Option<ReferenceFrame>,
    pub(crate) listed_atoms: Vec<u32>,
    pub(crate) declared_atom_count: Option<usize>,
    pub(crate) flex_bonds: BTreeMap<u32, FlexBond>,
    pub(crate) atoms_ordered: bool,
    pub(crate) ready_seen: bool,
    pub(crate) pending_error: Option<String>,
    pub(crate) done: bool,
    pub(crate) windows_closed: usize,
    pub(crate) unrecognized_lines: usize,
}

impl ParseState {
    pub fn new(declared_atom_count: Option<usize>, flex_bonds: BTreeMap<u32, FlexBond>) -> Self {
        Self {
            phase: Phase::AwaitingStart,
            generation: None,
            ranking_mode: None,
            top_rank: None,
            window: None,
            last_ready: None,
            rotamers: RotamerTable::default(),
            dihedral_shifts: BTreeMap::new(),
            grid: BTreeMap::new(),
            reference_frame: None,
            listed_atoms: Vec::new(),
            declared_atom_count,
            flex_bonds,
            atoms_ordered: false,
            ready_seen: false,
            pending_error: None,
            done: false,
            windows_closed: 0,
            unrecognized_lines: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> Option<u32> {
        self.generation
    }

    pub fn ranking_mode(&self) -> Option<RankingMode> {
        self.ranking_mode
    }

    /// Highest rank seen in the current generation.
    pub fn top_rank(&self) -> Option<u32> {
        self.top_rank
    }

    pub fn open_window(&self) -> Option<&RowWindow> {
        self.window.as_ref()
    }

    pub fn last_ready_window(&self) -> Option<&RowWindow> {
        self.last_ready.as_ref()
    }

    pub fn rotamers(&self) -> &RotamerTable {
        &self.rotamers
    }

    pub fn dihedral_shifts(&self) -> &BTreeMap<AtomPairKey, f64> {
        &self.dihedral_shifts
    }

    pub fn grid(&self) -> &BTreeMap<u32, Point3<f64>> {
        &self.grid
    }

    pub fn reference_frame(&self) -> Option<&ReferenceFrame> {
        self.reference_frame.as_ref()
    }

    /// The atoms in engine construction order, once all of them are listed.
    pub fn listed_atoms(&self) -> Option<&[u32]> {
        match self.declared_atom_count {
            Some(count) if self.listed_atoms.len() == count => Some(&self.listed_atoms),
            _ => None,
        }
    }

    pub fn flex_bonds(&self) -> &BTreeMap<u32, FlexBond> {
        &self.flex_bonds
    }

    pub fn atoms_ordered(&self) -> bool {
        self.atoms_ordered
    }

    pub fn pending_error(&self) -> Option<&str> {
        self.pending_error.as_deref()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn windows_closed(&self) -> usize {
        self.windows_closed
    }

    pub fn unrecognized_lines(&self) -> usize {
        self.unrecognized_lines
    }
}
