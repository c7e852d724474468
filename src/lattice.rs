use nalgebra::{Point2, Vector2};

use crate::config::TINY_MOVE;
use crate::coords::LocalCoords;
use crate::geometry::Geometry;

#[cfg(test)]
mod tests {

    use super::*;

    fn lattice_3x2() -> Lattice {
        Lattice::new(
            10,
            3,
            2,
            0.0,
            0.0,
            1.0,
            2.0,
            vec![vec![1, 2, 3], vec![4, 5, 6]],
        )
    }

    #[test]
    fn cell_centres_and_extent() {
        let lattice = lattice_3x2();
        assert_eq!(lattice.x_min(), -1.5);
        assert_eq!(lattice.y_min(), -2.0);
        let centre = lattice.cell_center(0, 0);
        assert!((centre.x + 1.0).abs() < 1e-12);
        assert!((centre.y + 1.0).abs() < 1e-12);
        let centre = lattice.cell_center(2, 1);
        assert!((centre.x - 1.0).abs() < 1e-12);
        assert!((centre.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn universe_table_is_row_major_from_the_bottom() {
        let lattice = lattice_3x2();
        assert_eq!(lattice.universe_id_at(0, 0), 1);
        assert_eq!(lattice.universe_id_at(2, 0), 3);
        assert_eq!(lattice.universe_id_at(0, 1), 4);
        assert_eq!(lattice.universe_id_at(2, 1), 6);
    }

    #[test]
    #[should_panic(expected = "table of universe ids")]
    fn mismatched_table_is_fatal() {
        let _ = Lattice::new(10, 3, 2, 0.0, 0.0, 1.0, 1.0, vec![vec![1, 2, 3]]);
    }
}

/// A rectangular tiling of child universes with uniform pitch, centred on its
/// origin. Lattice cell `(x, y)` has `x` increasing to the right and `y`
/// increasing upward, with `(0, 0)` in the lower-left corner.
#[derive(Debug, Clone)]
pub struct Lattice {
    pub id: i32,
    pub num_x: usize,
    pub num_y: usize,
    pub origin: Point2<f64>,
    pub width_x: f64,
    pub width_y: f64,
    universes: Vec<Vec<i32>>,      // indexed [y][x]
    fsr_offsets: Vec<Vec<usize>>,  // indexed [y][x], filled during FSR numbering
}

impl Lattice {
    pub fn new(
        id: i32,
        num_x: usize,
        num_y: usize,
        origin_x: f64,
        origin_y: f64,
        width_x: f64,
        width_y: f64,
        universes: Vec<Vec<i32>>,
    ) -> Self {
        if width_x <= 0.0 || width_y <= 0.0 {
            panic!("lattice {} must have positive pitch", id);
        }
        if universes.len() != num_y || universes.iter().any(|row| row.len() != num_x) {
            panic!(
                "lattice {} expected a {} x {} table of universe ids",
                id, num_x, num_y
            );
        }
        Self {
            id,
            num_x,
            num_y,
            origin: Point2::new(origin_x, origin_y),
            width_x,
            width_y,
            universes,
            fsr_offsets: vec![vec![0; num_x]; num_y],
        }
    }

    /// Id of the child universe in lattice cell `(x, y)`.
    pub fn universe_id_at(&self, x: usize, y: usize) -> i32 {
        self.universes[y][x]
    }

    /// Number of FSRs contained in lattice cells preceding `(x, y)` in
    /// row-major order from the bottom row.
    pub fn fsr_offset(&self, x: usize, y: usize) -> usize {
        self.fsr_offsets[y][x]
    }

    pub(crate) fn set_fsr_offsets(&mut self, offsets: Vec<Vec<usize>>) {
        self.fsr_offsets = offsets;
    }

    pub fn x_min(&self) -> f64 {
        self.origin.x - self.num_x as f64 * self.width_x / 2.0
    }

    pub fn y_min(&self) -> f64 {
        self.origin.y - self.num_y as f64 * self.width_y / 2.0
    }

    /// Centre of lattice cell `(x, y)` in the lattice frame.
    pub fn cell_center(&self, x: usize, y: usize) -> Point2<f64> {
        Point2::new(
            self.x_min() + (x as f64 + 0.5) * self.width_x,
            self.y_min() + (y as f64 + 0.5) * self.width_y,
        )
    }

    /// Locates the lattice cell holding the point recorded at `level`,
    /// converts that node into a lattice node with coordinates local to the
    /// cell centre, and descends into the child universe. Returns `None` when
    /// the point lies outside the lattice.
    pub(crate) fn find_cell(
        &self,
        geometry: &Geometry,
        coords: &mut LocalCoords,
        level: usize,
    ) -> Option<i32> {
        let point = coords.node(level).point;
        let x = ((point.x - self.x_min()) / self.width_x).floor();
        let y = ((point.y - self.y_min()) / self.width_y).floor();
        if x < 0.0 || x >= self.num_x as f64 || y < 0.0 || y >= self.num_y as f64 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);

        let centre = self.cell_center(x, y);
        let local = Point2::new(point.x - centre.x, point.y - centre.y);
        coords.set_lattice(level, self.id, x, y, local);
        coords.truncate_below(level);
        coords.push_universe(self.universes[y][x], local);
        geometry.find_cell_at(coords, level + 1)
    }

    /// Advances a lattice-level coordinate to the neighbouring lattice cell
    /// crossed first along `angle`, moving the whole chain just past the
    /// shared edge, and descends into the neighbour's universe. Returns `None`
    /// when the trajectory steps off the lattice; the chain is left at the
    /// crossing point either way.
    pub(crate) fn find_next_lattice_cell(
        &self,
        geometry: &Geometry,
        coords: &mut LocalCoords,
        level: usize,
        angle: f64,
    ) -> Option<i32> {
        let node = coords.node(level);
        let (lat_x, lat_y) = node
            .lattice_cell()
            .unwrap_or_else(|| panic!("lattice {} asked to step a non-lattice coordinate", self.id));
        let point = node.point; // local to the current cell centre
        let u = Vector2::new(angle.cos(), angle.sin());

        // forward distance to each of the four cell edges
        let half_x = self.width_x / 2.0;
        let half_y = self.width_y / 2.0;
        let mut distance = f64::INFINITY;
        let mut step = (0i64, 0i64);
        let candidates = [
            ((half_x - point.x) / u.x, (1, 0)),
            ((-half_x - point.x) / u.x, (-1, 0)),
            ((half_y - point.y) / u.y, (0, 1)),
            ((-half_y - point.y) / u.y, (0, -1)),
        ];
        for (t, s) in candidates {
            if t.is_finite() && t > 0.0 && t < distance {
                distance = t;
                step = s;
            }
        }
        if !distance.is_finite() {
            return None;
        }

        // move the whole chain just inside the neighbour
        coords.adjust((distance + TINY_MOVE) * u.x, (distance + TINY_MOVE) * u.y);

        let next_x = lat_x as i64 + step.0;
        let next_y = lat_y as i64 + step.1;
        if next_x < 0 || next_x >= self.num_x as i64 || next_y < 0 || next_y >= self.num_y as i64 {
            return None;
        }
        let (next_x, next_y) = (next_x as usize, next_y as usize);

        // re-express the local point relative to the neighbour's centre
        let moved = coords.node(level).point;
        let local = Point2::new(
            moved.x - step.0 as f64 * self.width_x,
            moved.y - step.1 as f64 * self.width_y,
        );
        coords.set_lattice(level, self.id, next_x, next_y, local);
        coords.truncate_below(level);
        coords.push_universe(self.universes[next_y][next_x], local);
        geometry.find_cell_at(coords, level + 1)
    }
}
