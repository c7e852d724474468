use std::collections::BTreeMap;

use crate::cell::CellKind;
use crate::coords::LocalCoords;
use crate::geometry::Geometry;

/// A local coordinate frame tiled by cells. A lattice is also a universe: the
/// `Lattice` variant points at the entry registered under the same id in the
/// geometry's lattice registry.
#[derive(Debug, Clone)]
pub enum Universe {
    Simple(SimpleUniverse),
    Lattice(i32),
}

impl Universe {
    /// Creates an empty simple universe.
    pub fn new(id: i32) -> Self {
        Universe::Simple(SimpleUniverse::new(id))
    }

    pub fn id(&self) -> i32 {
        match self {
            Universe::Simple(universe) => universe.id,
            Universe::Lattice(id) => *id,
        }
    }
}

/// An unordered collection of cells covering a local frame. Point location is a
/// linear search through the cells in ascending id order, which also fixes the
/// FSR numbering.
#[derive(Debug, Clone)]
pub struct SimpleUniverse {
    pub id: i32,
    cells: Vec<i32>,               // cell ids, kept sorted ascending
    fsr_map: BTreeMap<i32, usize>, // cell id -> local FSR offset
}

impl SimpleUniverse {
    pub fn new(id: i32) -> Self {
        Self {
            id,
            cells: Vec::new(),
            fsr_map: BTreeMap::new(),
        }
    }

    pub fn cells(&self) -> &[i32] {
        &self.cells
    }

    pub(crate) fn add_cell(&mut self, cell_id: i32) {
        if let Err(position) = self.cells.binary_search(&cell_id) {
            self.cells.insert(position, cell_id);
        }
    }

    pub(crate) fn remove_cell(&mut self, cell_id: i32) {
        if let Ok(position) = self.cells.binary_search(&cell_id) {
            self.cells.remove(position);
        }
    }

    /// Number of FSRs contained in the cells preceding `cell_id`.
    pub fn fsr_offset(&self, cell_id: i32) -> usize {
        *self.fsr_map.get(&cell_id).unwrap_or_else(|| {
            panic!("universe {} has no FSR offset for cell {}", self.id, cell_id)
        })
    }

    pub(crate) fn set_fsr_map(&mut self, fsr_map: BTreeMap<i32, usize>) {
        self.fsr_map = fsr_map;
    }

    /// Finds the cell containing the point recorded at `level` of the chain,
    /// descending through fill cells. Records the matching cell on the chain
    /// and returns the innermost material cell id, or `None` when no cell
    /// contains the point.
    pub(crate) fn find_cell(
        &self,
        geometry: &Geometry,
        coords: &mut LocalCoords,
        level: usize,
    ) -> Option<i32> {
        let point = coords.node(level).point;
        for &cell_id in &self.cells {
            let cell = geometry.cell(cell_id);
            if !cell.contains(&point) {
                continue;
            }
            coords.set_cell(level, cell_id);
            return match cell.kind {
                CellKind::Material { .. } => Some(cell_id),
                CellKind::Fill { universe_id } => {
                    // descend into the fill universe; local frames of fill
                    // cells coincide with their parent's
                    coords.truncate_below(level);
                    coords.push_universe(universe_id, point);
                    geometry.find_cell_at(coords, level + 1)
                }
            };
        }
        None
    }
}
