use std::collections::{BTreeMap, HashSet};
use tracing::warn;

/// A rotatable ligand bond as declared by a `FLEDIH` record.
///
/// `atoms` lists the atom numbers that define the bond. Bonds defined by more
/// than one atom must follow the engine's construction order, which is only
/// known once the engine has listed the ligand atoms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlexBond {
    pub index: u32,
    pub atoms: Vec<u32>,
}

impl FlexBond {
    pub fn new(index: u32, atoms: Vec<u32>) -> Self {
        Self { index, atoms }
    }

    /// Reorders `atoms` to follow their first occurrence in `construction_order`.
    ///
    /// Returns `false` and leaves the bond untouched when some atom of the bond
    /// never appears in the construction order.
    pub fn reorder_by(&mut self, construction_order: &[u32]) -> bool {
        if self.atoms.len() <= 1 {
            return true;
        }

        let mut remaining: HashSet<u32> = self.atoms.iter().copied().collect();
        let mut sorted = Vec::with_capacity(self.atoms.len());
        for atom in construction_order {
            if remaining.remove(atom) {
                sorted.push(*atom);
                if remaining.is_empty() {
                    break;
                }
            }
        }

        if sorted.len() != self.atoms.len() {
            warn!(
                "Flexible bond {} references atoms missing from the listed order: {:?}",
                self.index, remaining
            );
            return false;
        }
        self.atoms = sorted;
        true
    }
}

/// Neighbours used to rebuild one ligand atom from internal coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtomNeighbours {
    pub atom_type: u32,
    pub neighbours: [u32; 3],
}

/// Distance, bond angle and dihedral of one ligand atom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InternalCoordinate {
    pub distance: f64,
    pub angle: f64,
    pub dihedral: f64,
}

/// Ligand topology assembled from the engine input files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LigandTopology {
    pub neighbours: BTreeMap<u32, AtomNeighbours>,
    pub flex_bonds: BTreeMap<u32, FlexBond>,
    pub internal_coordinates: BTreeMap<u32, InternalCoordinate>,
}

impl LigandTopology {
    /// Number of ligand atoms the engine will list (one per internal coordinate).
    pub fn atom_count(&self) -> usize {
        self.internal_coordinates.len()
    }

    /// The three anchor atoms whose reconstruction values need adjusting.
    ///
    /// Ordered as: the atom with no neighbour, the atom with one neighbour and
    /// the atom with two neighbours. Missing anchors are reported as `0`.
    pub fn variable_atoms(&self) -> [u32; 3] {
        let mut anchors = [0u32; 3];
        for (atom, entry) in &self.neighbours {
            match entry.neighbours {
                [0, 0, 0] => anchors[0] = *atom,
                [_, 0, 0] => anchors[1] = *atom,
                [_, _, 0] => anchors[2] = *atom,
                _ => {}
            }
        }
        anchors
    }
}
