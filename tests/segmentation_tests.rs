use nalgebra::Point2;

use mocgeo::{
    BoundaryType, Cell, Geometry, Halfspace, Lattice, LocalCoords, Material, Surface, SurfaceKind,
    Track,
};

const TOL: f64 = 1e-6;

fn two_group_material(id: i32) -> Material {
    Material::new(
        id,
        vec![0.5, 1.0],
        vec![0.2, 0.8],
        vec![0.25, 0.05, 0.0, 0.2],
        vec![0.1, 0.3],
        vec![0.25, 0.75],
        vec![1.0, 0.0],
    )
}

fn xplane(id: i32, x: f64, boundary: BoundaryType) -> Surface {
    Surface::new(id, SurfaceKind::XPlane { x }, boundary)
}

fn yplane(id: i32, y: f64, boundary: BoundaryType) -> Surface {
    Surface::new(id, SurfaceKind::YPlane { y }, boundary)
}

fn reflective_box(half: f64) -> Vec<Halfspace> {
    vec![
        Halfspace::new(1, xplane(1, -half, BoundaryType::Reflective)),
        Halfspace::new(-1, xplane(2, half, BoundaryType::Reflective)),
        Halfspace::new(1, yplane(3, -half, BoundaryType::Reflective)),
        Halfspace::new(-1, yplane(4, half, BoundaryType::Reflective)),
    ]
}

/// One material cell bounded by a reflective circle of radius 1.
fn disk_geometry() -> Geometry {
    let mut geometry = Geometry::new();
    geometry.add_material(two_group_material(1));
    let circle = Surface::new(
        1,
        SurfaceKind::Circle {
            x0: 0.0,
            y0: 0.0,
            radius: 1.0,
        },
        BoundaryType::Reflective,
    );
    geometry.add_cell(Cell::material(1, 0, 1, vec![Halfspace::new(-1, circle)]));
    geometry.initialize_flat_source_regions();
    geometry
}

/// Two material cells splitting the box [-1, 1]^2 at x = 0.
fn half_plane_geometry() -> Geometry {
    let mut geometry = Geometry::new();
    geometry.add_material(two_group_material(1));
    geometry.add_material(two_group_material(2));
    let split = xplane(5, 0.0, BoundaryType::None);
    let mut left_surfaces = reflective_box(1.0);
    left_surfaces.push(Halfspace::new(-1, split.clone()));
    let mut right_surfaces = reflective_box(1.0);
    right_surfaces.push(Halfspace::new(1, split));
    geometry.add_cell(Cell::material(1, 0, 1, left_surfaces));
    geometry.add_cell(Cell::material(2, 0, 2, right_surfaces));
    geometry.initialize_flat_source_regions();
    geometry
}

/// A 3x3 lattice of unit cells, each holding a single unbounded material cell,
/// wrapped in a fill cell over a reflective box.
fn lattice_geometry() -> Geometry {
    let mut geometry = Geometry::new();
    geometry.add_material(two_group_material(1));
    // the pin universe: one cell with no bounding surfaces
    geometry.add_cell(Cell::material(1, 1, 1, vec![]));
    geometry.add_lattice(Lattice::new(
        10,
        3,
        3,
        0.0,
        0.0,
        1.0,
        1.0,
        vec![vec![1; 3]; 3],
    ));
    geometry.add_cell(Cell::fill(2, 0, 10, reflective_box(1.5)));
    geometry.initialize_flat_source_regions();
    geometry
}

/// A 2x2 lattice whose shared child universe holds two half-plane cells split
/// down the middle of each lattice cell.
fn nested_geometry() -> Geometry {
    let mut geometry = Geometry::new();
    geometry.add_material(two_group_material(1));
    geometry.add_material(two_group_material(2));
    let split = xplane(5, 0.0, BoundaryType::None);
    geometry.add_cell(Cell::material(10, 5, 1, vec![Halfspace::new(-1, split.clone())]));
    geometry.add_cell(Cell::material(11, 5, 2, vec![Halfspace::new(1, split)]));
    geometry.add_lattice(Lattice::new(
        20,
        2,
        2,
        0.0,
        0.0,
        1.0,
        1.0,
        vec![vec![5; 2]; 2],
    ));
    geometry.add_cell(Cell::fill(1, 0, 20, reflective_box(1.0)));
    geometry.initialize_flat_source_regions();
    geometry
}

/// A single subdivided fuel pin (2 rings, 4 sectors) in a moderator square.
fn pin_cell_geometry() -> Geometry {
    let mut geometry = Geometry::new();
    geometry.add_material(two_group_material(1));
    geometry.add_material(two_group_material(2));
    let circle = Surface::new(
        5,
        SurfaceKind::Circle {
            x0: 0.0,
            y0: 0.0,
            radius: 0.4,
        },
        BoundaryType::None,
    );
    let mut fuel = Cell::material(1, 0, 1, vec![Halfspace::new(-1, circle.clone())]);
    fuel.set_num_rings(2);
    fuel.set_num_sectors(4);
    let mut moderator_surfaces = reflective_box(0.63);
    moderator_surfaces.push(Halfspace::new(1, circle));
    let moderator = Cell::material(2, 0, 2, moderator_surfaces);
    geometry.add_cell(fuel);
    geometry.add_cell(moderator);
    geometry.initialize_flat_source_regions();
    geometry
}

fn segmentized(geometry: &Geometry, start: Point2<f64>, end: Point2<f64>) -> Track {
    let mut track = Track::new(start, end);
    geometry.segmentize(&mut track);
    track
}

#[test]
fn single_cell_disk() {
    let geometry = disk_geometry();
    assert_eq!(geometry.num_fsrs(), 1);
    assert_eq!(geometry.x_min(), -1.0);
    assert_eq!(geometry.x_max(), 1.0);
    assert!(geometry.bc_left() && geometry.bc_right());
    assert!(geometry.bc_top() && geometry.bc_bottom());

    let track = segmentized(&geometry, Point2::new(-1.0, 0.0), Point2::new(1.0, 0.0));
    assert_eq!(track.num_segments(), 1);
    let segment = track.segments()[0];
    assert!((segment.length as f64 - 2.0).abs() < TOL);
    assert_eq!(segment.material_id, 1);
    assert_eq!(segment.region_id, 0);
}

#[test]
fn two_half_planes() {
    let geometry = half_plane_geometry();
    assert_eq!(geometry.num_fsrs(), 2);

    let track = segmentized(&geometry, Point2::new(-1.0, 0.5), Point2::new(1.0, 0.5));
    assert_eq!(track.num_segments(), 2);
    for segment in track.segments() {
        assert!((segment.length as f64 - 1.0).abs() < TOL);
    }
    let materials: Vec<i32> = track.segments().iter().map(|s| s.material_id).collect();
    let regions: Vec<usize> = track.segments().iter().map(|s| s.region_id).collect();
    assert_eq!(materials, vec![1, 2]);
    assert_eq!(regions, vec![0, 1]);

    // the statistics cover both unit-length segments
    assert!((geometry.min_segment_length() - 1.0).abs() < TOL);
    assert!((geometry.max_segment_length() - 1.0).abs() < TOL);
}

#[test]
fn lattice_3x3_row_major_regions() {
    let geometry = lattice_geometry();
    assert_eq!(geometry.num_fsrs(), 9);

    let track = segmentized(&geometry, Point2::new(-1.5, 0.5), Point2::new(1.5, 0.5));
    assert_eq!(track.num_segments(), 3);
    for segment in track.segments() {
        assert!((segment.length as f64 - 1.0).abs() < TOL);
    }
    let regions: Vec<usize> = track.segments().iter().map(|s| s.region_id).collect();
    assert_eq!(regions, vec![6, 7, 8]);
}

#[test]
fn nested_fill_horizontal_and_vertical() {
    let geometry = nested_geometry();
    assert_eq!(geometry.num_fsrs(), 8);

    let track = segmentized(&geometry, Point2::new(-1.0, 0.5), Point2::new(1.0, 0.5));
    assert_eq!(track.num_segments(), 4);
    for segment in track.segments() {
        assert!((segment.length as f64 - 0.5).abs() < TOL);
    }
    let regions: Vec<usize> = track.segments().iter().map(|s| s.region_id).collect();
    let materials: Vec<i32> = track.segments().iter().map(|s| s.material_id).collect();
    assert_eq!(regions, vec![4, 5, 6, 7]);
    assert_eq!(materials, vec![1, 2, 1, 2]);

    let track = segmentized(&geometry, Point2::new(0.3, -1.0), Point2::new(0.3, 1.0));
    assert_eq!(track.num_segments(), 2);
    for segment in track.segments() {
        assert!((segment.length as f64 - 1.0).abs() < TOL);
    }
    let regions: Vec<usize> = track.segments().iter().map(|s| s.region_id).collect();
    assert_eq!(regions, vec![2, 6]);
}

#[test]
fn subdivided_pin_cell() {
    let geometry = pin_cell_geometry();
    // 2 rings x 4 sectors plus the moderator
    assert_eq!(geometry.num_fsrs(), 9);

    let track = segmentized(&geometry, Point2::new(-0.63, 0.13), Point2::new(0.63, 0.13));
    assert_eq!(track.num_segments(), 6);

    let total: f64 = track.segments().iter().map(|s| s.length as f64).sum();
    assert!((total - 1.26).abs() < TOL);

    let materials: Vec<i32> = track.segments().iter().map(|s| s.material_id).collect();
    assert_eq!(materials, vec![2, 1, 1, 1, 1, 2]);

    // the moderator is one FSR on both sides of the pin; the fuel crossings
    // are four distinct FSRs
    let regions: Vec<usize> = track.segments().iter().map(|s| s.region_id).collect();
    assert_eq!(regions[0], regions[5]);
    let mut fuel_regions = regions[1..5].to_vec();
    fuel_regions.sort_unstable();
    fuel_regions.dedup();
    assert_eq!(fuel_regions.len(), 4);
}

#[test]
fn grazing_start_on_the_outer_surface() {
    let geometry = disk_geometry();
    // starts exactly on the reflective boundary, aimed inward
    let track = segmentized(&geometry, Point2::new(-1.0, 0.0), Point2::new(1.0, 0.0));
    assert!(!track.segments().is_empty());
    for segment in track.segments() {
        assert!(segment.length as f64 > 0.0);
    }
}

#[test]
#[should_panic(expected = "does not exist")]
fn missing_fill_universe_aborts_initialization() {
    let mut geometry = Geometry::new();
    geometry.add_material(two_group_material(1));
    geometry.add_cell(Cell::fill(1, 0, 99, reflective_box(1.0)));
    geometry.initialize_flat_source_regions();
}

#[test]
#[should_panic(expected = "start point")]
fn track_starting_outside_is_fatal() {
    let geometry = disk_geometry();
    let _ = segmentized(&geometry, Point2::new(-3.0, 0.0), Point2::new(3.0, 0.0));
}

#[test]
fn partition_sweep() {
    let geometry = half_plane_geometry();
    for i in 0..19 {
        for j in 0..19 {
            let x = -0.93 + i as f64 * 0.1;
            let y = -0.93 + j as f64 * 0.1;
            let mut coords = LocalCoords::new(x, y);
            let cell = geometry.find_cell(&mut coords);
            assert!(cell.is_some(), "no cell found at ({}, {})", x, y);
        }
    }
}

#[test]
fn fsr_bijection() {
    let geometry = nested_geometry();
    for &x in &[-0.8, -0.3, 0.2, 0.7] {
        for &y in &[-0.7, -0.2, 0.3, 0.8] {
            let mut coords = LocalCoords::new(x, y);
            let cell_id = geometry.find_cell(&mut coords).unwrap();
            let fsr_id = geometry.find_fsr_id(&coords);
            assert!(fsr_id < geometry.num_fsrs());
            assert_eq!(geometry.fsr_to_cell_map()[fsr_id], cell_id);
            assert_eq!(geometry.find_cell_for_fsr(fsr_id), cell_id);
        }
    }
}

#[test]
fn inverse_maps_are_consistent() {
    for geometry in [
        disk_geometry(),
        half_plane_geometry(),
        lattice_geometry(),
        nested_geometry(),
        pin_cell_geometry(),
    ] {
        for fsr_id in 0..geometry.num_fsrs() {
            let cell_id = geometry.fsr_to_cell_map()[fsr_id];
            let material_id = geometry.fsr_to_material_map()[fsr_id];
            assert_eq!(geometry.cell(cell_id).material_id(), Some(material_id));
        }
    }
}

#[test]
fn segments_tile_a_slanted_track() {
    let geometry = lattice_geometry();
    let start = Point2::new(-1.5, -0.45);
    let end = Point2::new(1.5, 0.55);
    let track = segmentized(&geometry, start, end);

    let total: f64 = track.segments().iter().map(|s| s.length as f64).sum();
    assert!((total - nalgebra::distance(&start, &end)).abs() < TOL);
    for segment in track.segments() {
        assert!(segment.length as f64 > 0.0);
    }
}

#[test]
fn fsr_numbering_is_deterministic() {
    let first = lattice_geometry();
    let second = lattice_geometry();
    assert_eq!(first.num_fsrs(), second.num_fsrs());
    assert_eq!(first.fsr_to_cell_map(), second.fsr_to_cell_map());
    assert_eq!(first.fsr_to_material_map(), second.fsr_to_material_map());

    let first = pin_cell_geometry();
    let second = pin_cell_geometry();
    assert_eq!(first.fsr_to_cell_map(), second.fsr_to_cell_map());
    assert_eq!(first.fsr_to_material_map(), second.fsr_to_material_map());
}

#[test]
fn reversed_track_reverses_the_segments() {
    let geometry = half_plane_geometry();
    let forward = segmentized(&geometry, Point2::new(-1.0, 0.5), Point2::new(1.0, 0.5));
    let reverse = segmentized(&geometry, Point2::new(1.0, 0.5), Point2::new(-1.0, 0.5));

    assert_eq!(forward.num_segments(), reverse.num_segments());
    for (f, r) in forward
        .segments()
        .iter()
        .zip(reverse.segments().iter().rev())
    {
        assert!((f.length as f64 - r.length as f64).abs() < 1e-9);
        assert_eq!(f.material_id, r.material_id);
        assert_eq!(f.region_id, r.region_id);
    }
}
