use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info};

use crate::cell::{Cell, CellKind};
use crate::config::{FpPrecision, ROOT_UNIVERSE, TINY_MOVE};
use crate::coords::{CoordKind, LocalCoords};
use crate::lattice::Lattice;
use crate::material::Material;
use crate::surface::{BoundaryType, Surface};
use crate::track::{Segment, Track};
use crate::universe::Universe;


/// The orchestrator of the constructive solid geometry: owns every material,
/// surface, cell, universe and lattice, numbers the flat source regions, and
/// answers the point-location, traversal and segmentation queries that the
/// track sweep is built on.
///
/// Registries are append-only until `initialize_flat_source_regions`; after
/// that the geometry is immutable apart from the segment length statistics,
/// which are atomics so that `segmentize` may be called concurrently on a
/// shared reference.
pub struct Geometry {
    materials: BTreeMap<i32, Material>,
    surfaces: BTreeMap<i32, Surface>,
    cells: BTreeMap<i32, Cell>,
    universes: BTreeMap<i32, Universe>,
    lattices: BTreeMap<i32, Lattice>,

    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    left_bc: bool,
    right_bc: bool,
    top_bc: bool,
    bottom_bc: bool,

    num_fsrs: usize,
    num_groups: usize,
    fsrs_to_cells: Vec<i32>,
    fsrs_to_materials: Vec<i32>,

    max_seg_length: AtomicU64, // f64 bit patterns, updated with compare-and-swap
    min_seg_length: AtomicU64,
}

impl Geometry {
    pub fn new() -> Self {
        Self {
            materials: BTreeMap::new(),
            surfaces: BTreeMap::new(),
            cells: BTreeMap::new(),
            universes: BTreeMap::new(),
            lattices: BTreeMap::new(),
            x_min: f64::MAX,
            x_max: -f64::MAX,
            y_min: f64::MAX,
            y_max: -f64::MAX,
            left_bc: true,
            right_bc: true,
            top_bc: true,
            bottom_bc: true,
            num_fsrs: 0,
            num_groups: 0,
            fsrs_to_cells: Vec::new(),
            fsrs_to_materials: Vec::new(),
            max_seg_length: AtomicU64::new(0f64.to_bits()),
            min_seg_length: AtomicU64::new(f64::INFINITY.to_bits()),
        }
    }

    /// Adds a material, fixing the geometry's energy group count on first use
    /// and checking the new material against it afterwards.
    pub fn add_material(&mut self, material: Material) {
        if self.materials.contains_key(&material.id) {
            panic!("cannot add a second material with id = {}", material.id);
        }
        if material.num_energy_groups() == 0 {
            panic!("cannot add material {} with no nuclear data", material.id);
        }
        if self.num_groups == 0 {
            self.num_groups = material.num_energy_groups();
        } else if self.num_groups != material.num_energy_groups() {
            panic!(
                "cannot add material {} with {} energy groups to a geometry whose materials have {} energy groups",
                material.id,
                material.num_energy_groups(),
                self.num_groups
            );
        }
        material.check_sigma_t();
        debug!("added material with id = {} to the geometry", material.id);
        self.materials.insert(material.id, material);
    }

    /// Adds a surface and lets it grow the bounding box. A surface whose id is
    /// already registered is silently ignored: cells re-add their surfaces
    /// transitively through `add_cell`.
    pub fn add_surface(&mut self, surface: Surface) {
        if self.surfaces.contains_key(&surface.id) {
            return;
        }

        match surface.boundary {
            BoundaryType::Reflective | BoundaryType::Vacuum => {
                let reflective = surface.boundary == BoundaryType::Reflective;
                if surface.x_min() < self.x_min && surface.x_min().is_finite() {
                    self.x_min = surface.x_min();
                    self.left_bc = reflective;
                }
                if surface.x_max() > self.x_max && surface.x_max().is_finite() {
                    self.x_max = surface.x_max();
                    self.right_bc = reflective;
                }
                if surface.y_min() < self.y_min && surface.y_min().is_finite() {
                    self.y_min = surface.y_min();
                    self.bottom_bc = reflective;
                }
                if surface.y_max() > self.y_max && surface.y_max().is_finite() {
                    self.y_max = surface.y_max();
                    self.top_bc = reflective;
                }
            }
            BoundaryType::None => {}
        }

        debug!("added surface with id = {} to the geometry", surface.id);
        self.surfaces.insert(surface.id, surface);
    }

    /// Adds a cell, registering its surfaces and creating its universe on
    /// first use.
    pub fn add_cell(&mut self, cell: Cell) {
        if self.cells.contains_key(&cell.id) {
            panic!("cannot add a second cell with id = {}", cell.id);
        }
        if let CellKind::Material { material_id, .. } = cell.kind {
            if !self.materials.contains_key(&material_id) {
                panic!(
                    "cell {} is filled with material {} which does not exist",
                    cell.id, material_id
                );
            }
        }

        for halfspace in &cell.surfaces {
            self.add_surface(halfspace.surface.clone());
        }

        let cell_id = cell.id;
        let universe_id = cell.universe_id;
        debug!("added cell with id = {} to the geometry", cell_id);
        self.cells.insert(cell_id, cell);

        if !self.universes.contains_key(&universe_id) {
            debug!("created universe {}", universe_id);
            self.add_universe(Universe::new(universe_id));
        }
        match self.universes.get_mut(&universe_id).unwrap() {
            Universe::Simple(universe) => universe.add_cell(cell_id),
            Universe::Lattice(_) => panic!(
                "cannot add cell {} to universe {} which is a lattice",
                cell_id, universe_id
            ),
        }
    }

    /// Adds a universe.
    pub fn add_universe(&mut self, universe: Universe) {
        let id = universe.id();
        if self.universes.contains_key(&id) {
            panic!("cannot add a second universe with id = {}", id);
        }
        if let Universe::Lattice(lattice_id) = &universe {
            if !self.lattices.contains_key(lattice_id) {
                panic!(
                    "universe {} refers to lattice {} which does not exist",
                    id, lattice_id
                );
            }
        }
        debug!("added universe with id = {} to the geometry", id);
        self.universes.insert(id, universe);
    }

    /// Adds a lattice to both the lattice and universe registries, checking
    /// that every child universe it names exists.
    pub fn add_lattice(&mut self, lattice: Lattice) {
        if self.lattices.contains_key(&lattice.id) {
            panic!("cannot add a second lattice with id = {}", lattice.id);
        }
        if self.universes.contains_key(&lattice.id) {
            panic!("cannot add a second universe (lattice) with id = {}", lattice.id);
        }
        for y in 0..lattice.num_y {
            for x in 0..lattice.num_x {
                let universe_id = lattice.universe_id_at(x, y);
                if !self.universes.contains_key(&universe_id) {
                    panic!(
                        "lattice {} contains universe {} which does not exist",
                        lattice.id, universe_id
                    );
                }
            }
        }
        let id = lattice.id;
        debug!("added lattice with id = {} to the geometry", id);
        self.lattices.insert(id, lattice);
        self.add_universe(Universe::Lattice(id));
    }

    pub fn material(&self, id: i32) -> &Material {
        self.materials
            .get(&id)
            .unwrap_or_else(|| panic!("material with id = {} has not been declared", id))
    }

    pub fn surface(&self, id: i32) -> &Surface {
        self.surfaces
            .get(&id)
            .unwrap_or_else(|| panic!("surface with id = {} has not been declared", id))
    }

    pub fn cell(&self, id: i32) -> &Cell {
        self.cells
            .get(&id)
            .unwrap_or_else(|| panic!("cell with id = {} has not been declared", id))
    }

    pub fn universe(&self, id: i32) -> &Universe {
        self.universes
            .get(&id)
            .unwrap_or_else(|| panic!("universe with id = {} has not been declared", id))
    }

    pub fn lattice(&self, id: i32) -> &Lattice {
        self.lattices
            .get(&id)
            .unwrap_or_else(|| panic!("lattice with id = {} has not been declared", id))
    }

    pub fn num_materials(&self) -> usize {
        self.materials.len()
    }

    pub fn num_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    pub fn y_min(&self) -> f64 {
        self.y_min
    }

    pub fn y_max(&self) -> f64 {
        self.y_max
    }

    /// Boundary condition on the left edge: true is reflective, false vacuum.
    pub fn bc_left(&self) -> bool {
        self.left_bc
    }

    pub fn bc_right(&self) -> bool {
        self.right_bc
    }

    pub fn bc_top(&self) -> bool {
        self.top_bc
    }

    pub fn bc_bottom(&self) -> bool {
        self.bottom_bc
    }

    pub fn num_fsrs(&self) -> usize {
        self.num_fsrs
    }

    pub fn num_energy_groups(&self) -> usize {
        if self.materials.is_empty() {
            panic!("the geometry contains no materials so the number of energy groups is undefined");
        }
        self.num_groups
    }

    /// Map from FSR id to the id of its material cell.
    pub fn fsr_to_cell_map(&self) -> &[i32] {
        if self.num_fsrs == 0 {
            panic!("the FSR maps have not been initialized");
        }
        &self.fsrs_to_cells
    }

    /// Map from FSR id to the id of its material.
    pub fn fsr_to_material_map(&self) -> &[i32] {
        if self.num_fsrs == 0 {
            panic!("the FSR maps have not been initialized");
        }
        &self.fsrs_to_materials
    }

    pub fn max_segment_length(&self) -> f64 {
        f64::from_bits(self.max_seg_length.load(Ordering::Relaxed))
    }

    pub fn min_segment_length(&self) -> f64 {
        f64::from_bits(self.min_seg_length.load(Ordering::Relaxed))
    }

    /// Finds the innermost material cell containing the chain's point,
    /// rebuilding the chain from its head downward. Returns `None` when some
    /// level of the hierarchy has no cell containing the point.
    pub fn find_cell(&self, coords: &mut LocalCoords) -> Option<i32> {
        coords.reset_to_head();
        self.find_cell_at(coords, 0)
    }

    /// Descends from `level` of the chain, dispatching on the universe type.
    pub(crate) fn find_cell_at(&self, coords: &mut LocalCoords, level: usize) -> Option<i32> {
        let universe_id = coords.node(level).universe_id;
        match self.universe(universe_id) {
            Universe::Simple(universe) => universe.find_cell(self, coords, level),
            Universe::Lattice(id) => self.lattice(*id).find_cell(self, coords, level),
        }
    }

    /// Locates the cell a track starts in, nudging the start point forward
    /// along the trajectory so a track beginning exactly on a boundary is
    /// classified into the region it is entering.
    pub fn find_first_cell(&self, coords: &mut LocalCoords, angle: f64) -> Option<i32> {
        coords.adjust(TINY_MOVE * angle.cos(), TINY_MOVE * angle.sin());
        self.find_cell(coords)
    }

    /// Advances the chain to the next material cell crossed along `angle` and
    /// returns it, or `None` once the trajectory leaves the geometry.
    pub fn find_next_cell(&self, coords: &mut LocalCoords, angle: f64) -> Option<i32> {
        let cell_id = self.find_cell(coords)?;

        // distance to the nearest bounding surface of the current cell, in the
        // frame of the lowest chain level
        let lowest = coords.lowest().point;
        let (distance, intersection) = self.cell(cell_id).min_surface_dist(&lowest, angle);

        if distance.is_finite() {
            // move to the surface plus a nudge and re-locate from the root
            let saved = coords.clone();
            coords.update_most_local(&intersection);
            coords.adjust(TINY_MOVE * angle.cos(), TINY_MOVE * angle.sin());
            let next = self.find_cell(coords);

            if let Some(next_cell) = next {
                // a crossing into a different lattice cell must be handled by
                // lattice stepping so the chain stays consistent
                if !crossed_lattice_cell(&saved, coords) {
                    return Some(next_cell);
                }
            }
            if next.is_none() && !saved.has_lattice_level() {
                // the trajectory left through an outer surface; the chain
                // marks the exit point for the final segment
                return None;
            }
            *coords = saved;
        }

        // step through lattice cells, climbing a level each time the
        // trajectory runs off the current lattice
        loop {
            let Some(level) = coords.deepest_lattice_level() else {
                return None;
            };
            coords.truncate_below(level);
            let lattice_id = match &coords.node(level).kind {
                CoordKind::Lat { lattice, .. } => *lattice,
                CoordKind::Univ { .. } => unreachable!(),
            };
            match self
                .lattice(lattice_id)
                .find_next_lattice_cell(self, coords, level, angle)
            {
                Some(cell) => return Some(cell),
                None => coords.truncate(level),
            }
        }
    }

    /// Finds the material cell of a flat source region by walking the offset
    /// maps down from the root universe.
    pub fn find_cell_for_fsr(&self, fsr_id: usize) -> i32 {
        if fsr_id >= self.num_fsrs {
            panic!(
                "FSR id {} is out of range for a geometry with {} FSRs",
                fsr_id, self.num_fsrs
            );
        }
        self.fsr_search(ROOT_UNIVERSE, fsr_id)
    }

    /// Floor search: at each level take the child with the greatest FSR offset
    /// not exceeding the remaining id, subtract, and recurse.
    fn fsr_search(&self, universe_id: i32, fsr_id: usize) -> i32 {
        match self.universe(universe_id) {
            Universe::Simple(universe) => {
                let mut best: Option<(i32, usize)> = None;
                for &cell_id in universe.cells() {
                    let offset = universe.fsr_offset(cell_id);
                    if offset <= fsr_id && best.map_or(true, |(_, b)| offset >= b) {
                        best = Some((cell_id, offset));
                    }
                }
                let (cell_id, offset) = best.unwrap_or_else(|| {
                    panic!("no cell in universe {} for FSR id {}", universe_id, fsr_id)
                });
                let remainder = fsr_id - offset;
                match self.cell(cell_id).kind {
                    CellKind::Material { .. } => {
                        if remainder != 0 {
                            panic!(
                                "FSR id remainder {} is nonzero at material cell {}",
                                remainder, cell_id
                            );
                        }
                        cell_id
                    }
                    CellKind::Fill { universe_id: child } => self.fsr_search(child, remainder),
                }
            }
            Universe::Lattice(lattice_id) => {
                let lattice = self.lattice(*lattice_id);
                let mut best = (0, 0, 0usize);
                for y in 0..lattice.num_y {
                    for x in 0..lattice.num_x {
                        let offset = lattice.fsr_offset(x, y);
                        if offset <= fsr_id && offset >= best.2 {
                            best = (x, y, offset);
                        }
                    }
                }
                let (x, y, offset) = best;
                self.fsr_search(lattice.universe_id_at(x, y), fsr_id - offset)
            }
        }
    }

    /// Sums the FSR offsets contributed by every level of a completed chain,
    /// yielding the global id of the flat source region the chain points into.
    pub fn find_fsr_id(&self, coords: &LocalCoords) -> usize {
        let mut fsr_id = 0;
        for node in coords.iter() {
            match &node.kind {
                CoordKind::Lat {
                    lattice,
                    lattice_x,
                    lattice_y,
                } => {
                    fsr_id += self.lattice(*lattice).fsr_offset(*lattice_x, *lattice_y);
                }
                CoordKind::Univ { cell: Some(cell_id) } => match self.universe(node.universe_id) {
                    Universe::Simple(universe) => fsr_id += universe.fsr_offset(*cell_id),
                    Universe::Lattice(_) => panic!(
                        "coordinate chain records universe {} as simple but it is a lattice",
                        node.universe_id
                    ),
                },
                CoordKind::Univ { cell: None } => {
                    panic!("cannot compute an FSR id from an incomplete coordinate chain")
                }
            }
        }
        fsr_id
    }

    /// Verifies that every fill cell names a registered universe.
    fn initialize_cell_fill_pointers(&self) {
        for (id, cell) in &self.cells {
            if let CellKind::Fill { universe_id } = cell.kind {
                if !self.universes.contains_key(&universe_id) {
                    panic!(
                        "fill cell {} references universe {} which does not exist",
                        id, universe_id
                    );
                }
            }
        }
    }

    /// Replaces every material cell that requested rings or sectors with its
    /// subdivided counterparts. Fresh ids continue past the current maxima so
    /// the numbering stays reproducible.
    fn subdivide_cells(&mut self) {
        let mut next_surface_id = self.surfaces.keys().next_back().copied().unwrap_or(0) + 1;
        let mut next_cell_id = self.cells.keys().next_back().copied().unwrap_or(0) + 1;

        let cell_ids: Vec<i32> = self.cells.keys().copied().collect();
        for id in cell_ids {
            let Some((new_surfaces, new_cells)) =
                self.cells[&id].subdivide(&mut next_surface_id, &mut next_cell_id)
            else {
                continue;
            };
            debug!("subdivided cell {} into {} cells", id, new_cells.len());

            let universe_id = self.cells[&id].universe_id;
            self.cells.remove(&id);
            if let Universe::Simple(universe) = self.universes.get_mut(&universe_id).unwrap() {
                universe.remove_cell(id);
            }
            for surface in new_surfaces {
                self.add_surface(surface);
            }
            for cell in new_cells {
                let cell_id = cell.id;
                self.cells.insert(cell_id, cell);
                if let Universe::Simple(universe) = self.universes.get_mut(&universe_id).unwrap() {
                    universe.add_cell(cell_id);
                }
            }
        }
    }

    /// Recursively assigns each cell of each universe its local FSR offset and
    /// returns the total number of FSRs below `universe_id`.
    fn compute_fsr_maps(&mut self, universe_id: i32) -> usize {
        enum Plan {
            Simple(Vec<i32>),
            Lattice(i32),
        }
        let plan = match self.universe(universe_id) {
            Universe::Simple(universe) => Plan::Simple(universe.cells().to_vec()),
            Universe::Lattice(id) => Plan::Lattice(*id),
        };

        match plan {
            Plan::Simple(cell_ids) => {
                let mut offsets = BTreeMap::new();
                let mut count = 0;
                for cell_id in cell_ids {
                    offsets.insert(cell_id, count);
                    count += match self.cell(cell_id).kind {
                        CellKind::Material { .. } => 1,
                        CellKind::Fill { universe_id: child } => self.compute_fsr_maps(child),
                    };
                }
                if let Universe::Simple(universe) = self.universes.get_mut(&universe_id).unwrap() {
                    universe.set_fsr_map(offsets);
                }
                count
            }
            Plan::Lattice(lattice_id) => {
                let lattice = self.lattice(lattice_id);
                let (num_x, num_y) = (lattice.num_x, lattice.num_y);
                let children: Vec<Vec<i32>> = (0..num_y)
                    .map(|y| (0..num_x).map(|x| lattice.universe_id_at(x, y)).collect())
                    .collect();

                let mut offsets = vec![vec![0; num_x]; num_y];
                let mut count = 0;
                for y in 0..num_y {
                    for x in 0..num_x {
                        offsets[y][x] = count;
                        count += self.compute_fsr_maps(children[y][x]);
                    }
                }
                self.lattices
                    .get_mut(&lattice_id)
                    .unwrap()
                    .set_fsr_offsets(offsets);
                count
            }
        }
    }

    /// Finalizes the geometry: resolves fill references, subdivides cells,
    /// numbers the flat source regions from the root universe and builds the
    /// FSR-to-cell and FSR-to-material maps. Call exactly once, after all
    /// entities have been added.
    pub fn initialize_flat_source_regions(&mut self) {
        self.initialize_cell_fill_pointers();
        self.subdivide_cells();

        self.num_fsrs = self.compute_fsr_maps(ROOT_UNIVERSE);
        info!("number of flat source regions: {}", self.num_fsrs);

        let mut fsrs_to_cells = Vec::with_capacity(self.num_fsrs);
        let mut fsrs_to_materials = Vec::with_capacity(self.num_fsrs);
        for fsr_id in 0..self.num_fsrs {
            let cell_id = self.fsr_search(ROOT_UNIVERSE, fsr_id);
            let material_id = self.cell(cell_id).material_id().unwrap_or_else(|| {
                panic!("FSR {} resolved to fill cell {}", fsr_id, cell_id)
            });
            fsrs_to_cells.push(cell_id);
            fsrs_to_materials.push(material_id);
        }
        self.fsrs_to_cells = fsrs_to_cells;
        self.fsrs_to_materials = fsrs_to_materials;
    }

    /// Cuts a track into segments, one per flat source region crossed, and
    /// appends them to the track. Updates the geometry's segment length
    /// statistics. A track starting outside the geometry is fatal.
    pub fn segmentize(&self, track: &mut Track) {
        let start = track.start();
        let phi = track.phi();

        let mut segment_end = LocalCoords::new(start.x, start.y);
        let mut current = self.find_first_cell(&mut segment_end, phi);
        if current.is_none() {
            panic!(
                "could not find a cell containing the start point of track {}",
                track
            );
        }

        while let Some(previous) = current {
            let segment_start = segment_end.clone();
            current = self.find_next_cell(&mut segment_end, phi);

            let from = segment_start.head().point;
            let to = segment_end.head().point;
            if from == to {
                panic!(
                    "created a segment with the same start and end point: x = {}, y = {}",
                    from.x, from.y
                );
            }
            let length = nalgebra::distance(&from, &to);

            let material_id = self.cell(previous).material_id().unwrap_or_else(|| {
                panic!("segment attributed to fill cell {}", previous)
            });
            track.add_segment(Segment {
                length: length as FpPrecision,
                material_id,
                region_id: self.find_fsr_id(&segment_start),
            });
            self.update_segment_stats(length);
        }

        debug!("created {} segments for track {}", track.num_segments(), track);
        segment_end.prune();
    }

    fn update_segment_stats(&self, length: f64) {
        let _ = self
            .max_seg_length
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                (length > f64::from_bits(bits)).then(|| length.to_bits())
            });
        let _ = self
            .min_seg_length
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                (length < f64::from_bits(bits)).then(|| length.to_bits())
            });
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Geometry: width = {}, height = {}, bounding box = (({}, {}), ({}, {}))",
            self.width(),
            self.height(),
            self.x_min,
            self.y_min,
            self.x_max,
            self.y_max
        )?;
        writeln!(
            f,
            "  {} materials, {} surfaces, {} cells, {} universes, {} lattices",
            self.materials.len(),
            self.surfaces.len(),
            self.cells.len(),
            self.universes.len(),
            self.lattices.len()
        )?;
        write!(f, "  {} flat source regions", self.num_fsrs)
    }
}

/// Walks two chains upward in lockstep and reports whether a pair of lattice
/// levels disagrees on its lattice cell, which marks a lattice boundary
/// crossing that surface stepping is not allowed to make.
fn crossed_lattice_cell(saved: &LocalCoords, current: &LocalCoords) -> bool {
    let mut a = saved.len();
    let mut b = current.len();
    while a > 1 && b > 1 {
        a -= 1;
        b -= 1;
        if let (Some(cell_a), Some(cell_b)) =
            (saved.node(a).lattice_cell(), current.node(b).lattice_cell())
        {
            if cell_a != cell_b {
                return true;
            }
        }
    }
    false
}
