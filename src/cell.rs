use std::f64::consts::PI;

use nalgebra::Point2;

use crate::surface::{BoundaryType, Surface, SurfaceKind};

#[cfg(test)]
mod tests {

    use super::*;

    fn unit_circle(id: i32) -> Surface {
        Surface::new(
            id,
            SurfaceKind::Circle {
                x0: 0.0,
                y0: 0.0,
                radius: 1.0,
            },
            BoundaryType::None,
        )
    }

    #[test]
    fn contains_intersects_halfspaces() {
        let split = Surface::new(1, SurfaceKind::XPlane { x: 0.0 }, BoundaryType::None);
        let cell = Cell::material(
            1,
            0,
            1,
            vec![
                Halfspace::new(-1, split),
                Halfspace::new(-1, unit_circle(2)),
            ],
        );
        assert!(cell.contains(&Point2::new(-0.5, 0.0)));
        assert!(!cell.contains(&Point2::new(0.5, 0.0)));
        assert!(!cell.contains(&Point2::new(-2.0, 0.0)));
        // points exactly on a surface belong to both sides
        assert!(cell.contains(&Point2::new(0.0, 0.5)));
    }

    #[test]
    fn min_surface_dist_picks_nearest() {
        let cell = Cell::material(
            1,
            0,
            1,
            vec![
                Halfspace::new(1, Surface::new(1, SurfaceKind::XPlane { x: -1.0 }, BoundaryType::None)),
                Halfspace::new(-1, Surface::new(2, SurfaceKind::XPlane { x: 1.0 }, BoundaryType::None)),
            ],
        );
        let (d, p) = cell.min_surface_dist(&Point2::new(0.25, 0.0), 0.0);
        assert!((d - 0.75).abs() < 1e-12);
        assert!((p.x - 1.0).abs() < 1e-12);

        // a trajectory parallel to both planes never leaves
        let (d, _) = cell.min_surface_dist(&Point2::new(0.25, 0.0), PI / 2.0);
        assert!(d.is_infinite());
    }

    #[test]
    fn subdivision_partitions_the_cell() {
        let mut cell = Cell::material(1, 0, 7, vec![Halfspace::new(-1, unit_circle(1))]);
        cell.set_num_rings(2);
        cell.set_num_sectors(4);

        let mut next_surface_id = 2;
        let mut next_cell_id = 2;
        let (surfaces, cells) = cell
            .subdivide(&mut next_surface_id, &mut next_cell_id)
            .unwrap();

        // 4 sector planes plus 1 internal ring circle
        assert_eq!(surfaces.len(), 5);
        assert_eq!(cells.len(), 8);
        assert!(cells.iter().all(|c| c.material_id() == Some(7)));
        assert!(cells.iter().all(|c| c.universe_id == 0));

        // every interior point off the new boundaries lands in exactly one subcell
        for point in [
            Point2::new(0.3, 0.1),
            Point2::new(-0.2, 0.4),
            Point2::new(0.6, -0.55),
            Point2::new(-0.8, -0.1),
        ] {
            let hits = cells.iter().filter(|c| c.contains(&point)).count();
            assert_eq!(hits, 1, "point {:?} found in {} subcells", point, hits);
        }

        // outside the original cell nothing matches
        let outside = Point2::new(1.2, 0.0);
        assert!(cells.iter().all(|c| !c.contains(&outside)));
    }

    #[test]
    fn undivided_cells_are_left_alone() {
        let cell = Cell::material(1, 0, 7, vec![Halfspace::new(-1, unit_circle(1))]);
        let mut next_surface_id = 2;
        let mut next_cell_id = 2;
        assert!(cell.subdivide(&mut next_surface_id, &mut next_cell_id).is_none());
    }

    #[test]
    #[should_panic(expected = "circular surface")]
    fn subdividing_without_a_circle_is_fatal() {
        let split = Surface::new(1, SurfaceKind::XPlane { x: 0.0 }, BoundaryType::None);
        let mut cell = Cell::material(1, 0, 7, vec![Halfspace::new(-1, split)]);
        cell.set_num_sectors(4);
        let mut next_surface_id = 2;
        let mut next_cell_id = 2;
        let _ = cell.subdivide(&mut next_surface_id, &mut next_cell_id);
    }
}

/// One signed halfspace of a cell: the side of `surface` on which `evaluate`
/// matches `sign`. Each cell owns copies of the surfaces it was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct Halfspace {
    pub sign: i32,
    pub surface: Surface,
}

impl Halfspace {
    pub fn new(sign: i32, surface: Surface) -> Self {
        if sign == 0 {
            panic!("halfspace of surface {} must have a nonzero sign", surface.id);
        }
        Self {
            sign: sign.signum(),
            surface,
        }
    }
}

/// What occupies the interior of a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellKind {
    /// A terminal region of a single material, optionally refined into
    /// equal-area rings and equal-angle sectors during initialization.
    Material {
        material_id: i32,
        num_rings: u32,
        num_sectors: u32,
    },
    /// A region occupied by a nested universe.
    Fill { universe_id: i32 },
}

/// A region of a universe bounded by an intersection of signed halfspaces.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub id: i32,
    pub universe_id: i32,
    pub kind: CellKind,
    pub surfaces: Vec<Halfspace>,
}

impl Cell {
    /// Creates a material-filled cell.
    pub fn material(id: i32, universe_id: i32, material_id: i32, surfaces: Vec<Halfspace>) -> Self {
        Self {
            id,
            universe_id,
            kind: CellKind::Material {
                material_id,
                num_rings: 0,
                num_sectors: 0,
            },
            surfaces,
        }
    }

    /// Creates a cell filled by a nested universe.
    pub fn fill(id: i32, universe_id: i32, fill_universe_id: i32, surfaces: Vec<Halfspace>) -> Self {
        Self {
            id,
            universe_id,
            kind: CellKind::Fill {
                universe_id: fill_universe_id,
            },
            surfaces,
        }
    }

    pub fn material_id(&self) -> Option<i32> {
        match self.kind {
            CellKind::Material { material_id, .. } => Some(material_id),
            CellKind::Fill { .. } => None,
        }
    }

    pub fn fill_universe_id(&self) -> Option<i32> {
        match self.kind {
            CellKind::Material { .. } => None,
            CellKind::Fill { universe_id } => Some(universe_id),
        }
    }

    pub fn set_num_rings(&mut self, rings: u32) {
        match &mut self.kind {
            CellKind::Material { num_rings, .. } => *num_rings = rings,
            CellKind::Fill { .. } => panic!("only material cells can be subdivided into rings"),
        }
    }

    pub fn set_num_sectors(&mut self, sectors: u32) {
        match &mut self.kind {
            CellKind::Material { num_sectors, .. } => *num_sectors = sectors,
            CellKind::Fill { .. } => panic!("only material cells can be subdivided into sectors"),
        }
    }

    /// Tests whether a point satisfies every halfspace of the cell. Points
    /// exactly on a surface satisfy both of its halfspaces.
    pub fn contains(&self, point: &Point2<f64>) -> bool {
        self.surfaces.iter().all(|halfspace| {
            let value = halfspace.surface.evaluate(point);
            if halfspace.sign > 0 {
                value >= 0.0
            } else {
                value <= 0.0
            }
        })
    }

    /// Minimum forward distance from `point` along `angle` to any bounding
    /// surface of the cell, together with the intersection point. Returns
    /// infinity when the trajectory crosses none of them.
    pub fn min_surface_dist(&self, point: &Point2<f64>, angle: f64) -> (f64, Point2<f64>) {
        let mut min_dist = f64::INFINITY;
        let mut nearest = *point;
        for halfspace in &self.surfaces {
            if let Some((dist, intersection)) = halfspace.surface.min_distance(point, angle) {
                if dist < min_dist {
                    min_dist = dist;
                    nearest = intersection;
                }
            }
        }
        (min_dist, nearest)
    }

    /// Splits a material cell into equal-area rings and equal-angle sectors
    /// about the centre of one of its circular surfaces. Returns the freshly
    /// created surfaces and the replacement cells, or `None` when no
    /// refinement was requested. Ids are drawn from the two counters.
    pub(crate) fn subdivide(
        &self,
        next_surface_id: &mut i32,
        next_cell_id: &mut i32,
    ) -> Option<(Vec<Surface>, Vec<Cell>)> {
        let CellKind::Material {
            material_id,
            num_rings,
            num_sectors,
        } = self.kind
        else {
            return None;
        };
        if num_rings < 2 && num_sectors < 2 {
            return None;
        }

        // rings nest inside the outermost -circle halfspace; sectors pivot
        // about the same centre
        let outer = self.surfaces.iter().find_map(|hs| match hs.surface.kind {
            SurfaceKind::Circle { x0, y0, radius } if hs.sign < 0 => Some((x0, y0, radius)),
            _ => None,
        });
        let inner = self.surfaces.iter().find_map(|hs| match hs.surface.kind {
            SurfaceKind::Circle { radius, .. } if hs.sign > 0 => Some(radius),
            _ => None,
        });

        let (x0, y0) = match outer {
            Some((x0, y0, _)) => (x0, y0),
            None => {
                if num_rings >= 2 {
                    panic!("cell {} must be bounded by a circle to be split into rings", self.id);
                }
                match inner {
                    Some(_) => {
                        let SurfaceKind::Circle { x0, y0, .. } = self
                            .surfaces
                            .iter()
                            .find(|hs| matches!(hs.surface.kind, SurfaceKind::Circle { .. }))
                            .unwrap()
                            .surface
                            .kind
                        else {
                            unreachable!()
                        };
                        (x0, y0)
                    }
                    None => panic!(
                        "cell {} has no circular surface to subdivide about",
                        self.id
                    ),
                }
            }
        };

        let mut new_surfaces = Vec::new();

        let sector_planes: Vec<Surface> = if num_sectors >= 2 {
            (0..num_sectors)
                .map(|s| {
                    let phi = 2.0 * PI * s as f64 / num_sectors as f64;
                    // left-hand normal of the ray at angle phi through the centre
                    let a = -phi.sin();
                    let b = phi.cos();
                    let c = -(a * x0 + b * y0);
                    let plane = Surface::new(
                        *next_surface_id,
                        SurfaceKind::Plane { a, b, c },
                        BoundaryType::None,
                    );
                    *next_surface_id += 1;
                    plane
                })
                .collect()
        } else {
            Vec::new()
        };
        new_surfaces.extend(sector_planes.iter().cloned());

        // internal ring radii chosen so that each ring has equal area
        let ring_circles: Vec<Surface> = if num_rings >= 2 {
            let r_outer = outer.unwrap().2;
            let r_inner = inner.unwrap_or(0.0);
            (1..num_rings)
                .map(|k| {
                    let area_fraction = k as f64 / num_rings as f64;
                    let radius = (r_inner * r_inner
                        + area_fraction * (r_outer * r_outer - r_inner * r_inner))
                        .sqrt();
                    let circle = Surface::new(
                        *next_surface_id,
                        SurfaceKind::Circle { x0, y0, radius },
                        BoundaryType::None,
                    );
                    *next_surface_id += 1;
                    circle
                })
                .collect()
        } else {
            Vec::new()
        };
        new_surfaces.extend(ring_circles.iter().cloned());

        let rings = num_rings.max(1) as usize;
        let sectors = if num_sectors >= 2 { num_sectors as usize } else { 1 };
        let mut cells = Vec::with_capacity(rings * sectors);
        for ring in 0..rings {
            for sector in 0..sectors {
                let mut surfaces = self.surfaces.clone();
                if ring > 0 {
                    surfaces.push(Halfspace::new(1, ring_circles[ring - 1].clone()));
                }
                if ring < rings - 1 {
                    surfaces.push(Halfspace::new(-1, ring_circles[ring].clone()));
                }
                if sectors > 1 {
                    surfaces.push(Halfspace::new(1, sector_planes[sector].clone()));
                    surfaces.push(Halfspace::new(-1, sector_planes[(sector + 1) % sectors].clone()));
                }
                cells.push(Cell::material(*next_cell_id, self.universe_id, material_id, surfaces));
                *next_cell_id += 1;
            }
        }

        Some((new_surfaces, cells))
    }
}
