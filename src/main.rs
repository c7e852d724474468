use std::f64::consts::PI;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use nalgebra::{Point2, Vector2};
use rayon::prelude::*;

use mocgeo::settings::{self, Settings};
use mocgeo::{BoundaryType, Cell, Geometry, Halfspace, Lattice, Material, Surface, SurfaceKind, Track};

fn main() -> Result<()> {
    let settings = settings::load_config()?;
    println!("{}", settings);

    let geometry = build_pin_lattice(&settings);
    println!("{}", geometry);

    let mut tracks = generate_tracks(&geometry, &settings);
    println!("segmentizing {} tracks...", tracks.len());

    let pb = ProgressBar::new(tracks.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>5}/{len:5} {msg}",
        )
        .unwrap()
        .progress_chars("█▇▆▅▄▃▂▁"),
    );
    pb.set_message("tracks".to_string());

    tracks.par_iter_mut().for_each(|track| {
        geometry.segmentize(track);
        pb.inc(1);
    });
    pb.finish_with_message("(done)".to_string());

    report(&geometry, &tracks);

    Ok(())
}

/// Builds an N x N pin-cell lattice: a fuel circle inside a moderator square,
/// repeated across a reflective box.
fn build_pin_lattice(settings: &Settings) -> Geometry {
    let mut geometry = Geometry::new();

    // 2-group data, roughly UO2 fuel and light water
    geometry.add_material(Material::new(
        1,
        vec![0.3779, 0.5371],
        vec![0.0966, 0.1047],
        vec![0.2630, 0.0183, 0.0, 0.4324],
        vec![0.0071, 0.1398],
        vec![0.0185, 0.3414],
        vec![1.0, 0.0],
    ));
    geometry.add_material(Material::new(
        2,
        vec![0.6405, 1.6920],
        vec![0.0382, 0.0181],
        vec![0.5550, 0.0473, 0.0, 1.6739],
        vec![0.0, 0.0],
        vec![0.0, 0.0],
        vec![1.0, 0.0],
    ));

    let half = settings.lattice_size as f64 * settings.pin_pitch / 2.0;
    let left = Surface::new(1, SurfaceKind::XPlane { x: -half }, BoundaryType::Reflective);
    let right = Surface::new(2, SurfaceKind::XPlane { x: half }, BoundaryType::Reflective);
    let bottom = Surface::new(3, SurfaceKind::YPlane { y: -half }, BoundaryType::Reflective);
    let top = Surface::new(4, SurfaceKind::YPlane { y: half }, BoundaryType::Reflective);
    let fuel_circle = Surface::new(
        5,
        SurfaceKind::Circle {
            x0: 0.0,
            y0: 0.0,
            radius: settings.fuel_radius,
        },
        BoundaryType::None,
    );

    // the pin universe: fuel inside the circle, moderator outside
    let mut fuel = Cell::material(1, 1, 1, vec![Halfspace::new(-1, fuel_circle.clone())]);
    fuel.set_num_rings(settings.num_rings);
    fuel.set_num_sectors(settings.num_sectors);
    let moderator = Cell::material(2, 1, 2, vec![Halfspace::new(1, fuel_circle)]);
    geometry.add_cell(fuel);
    geometry.add_cell(moderator);

    let n = settings.lattice_size;
    geometry.add_lattice(Lattice::new(
        10,
        n,
        n,
        0.0,
        0.0,
        settings.pin_pitch,
        settings.pin_pitch,
        vec![vec![1; n]; n],
    ));

    // the root universe holds one fill cell covering the whole box
    geometry.add_cell(Cell::fill(
        3,
        0,
        10,
        vec![
            Halfspace::new(1, left),
            Halfspace::new(-1, right),
            Halfspace::new(1, bottom),
            Halfspace::new(-1, top),
        ],
    ));

    geometry.initialize_flat_source_regions();
    geometry
}

/// Lays a fan of boundary-to-boundary tracks across the geometry: for each
/// azimuthal angle, parallel tracks enter through the bottom edge and through
/// the left or right edge depending on the direction of travel.
fn generate_tracks(geometry: &Geometry, settings: &Settings) -> Vec<Track> {
    let (x_min, x_max) = (geometry.x_min(), geometry.x_max());
    let (y_min, y_max) = (geometry.y_min(), geometry.y_max());
    let spacing = settings.track_spacing;

    let mut tracks = Vec::new();
    for a in 0..settings.num_azim {
        let phi = PI * (a as f64 + 0.5) / settings.num_azim as f64;

        // entries along the bottom edge
        let mut x = x_min + spacing / 2.0;
        while x < x_max {
            let start = Point2::new(x, y_min);
            tracks.push(Track::new(start, exit_point(geometry, &start, phi)));
            x += spacing;
        }

        // entries along the left or right edge
        if phi.cos().abs() > 1e-12 {
            let mut y = y_min + spacing / 2.0;
            while y < y_max {
                let start = if phi.cos() > 0.0 {
                    Point2::new(x_min, y)
                } else {
                    Point2::new(x_max, y)
                };
                tracks.push(Track::new(start, exit_point(geometry, &start, phi)));
                y += spacing;
            }
        }
    }
    tracks
}

/// Point where a ray from `start` along `phi` leaves the bounding box.
fn exit_point(geometry: &Geometry, start: &Point2<f64>, phi: f64) -> Point2<f64> {
    let u = Vector2::new(phi.cos(), phi.sin());
    let mut distance = f64::INFINITY;
    for t in [
        (geometry.x_min() - start.x) / u.x,
        (geometry.x_max() - start.x) / u.x,
        (geometry.y_min() - start.y) / u.y,
        (geometry.y_max() - start.y) / u.y,
    ] {
        // skip the edge the track starts on
        if t.is_finite() && t > 1e-9 && t < distance {
            distance = t;
        }
    }
    assert!(distance.is_finite(), "track never leaves the bounding box");
    start + u * distance
}

fn report(geometry: &Geometry, tracks: &[Track]) {
    let num_segments: usize = tracks.iter().map(|t| t.num_segments()).sum();

    let mut fsr_hits = vec![0usize; geometry.num_fsrs()];
    for track in tracks {
        for segment in track.segments() {
            fsr_hits[segment.region_id] += 1;
        }
    }
    let uncrossed = fsr_hits.iter().filter(|&&hits| hits == 0).count();

    println!(
        "created {} segments ({:.1} per track)",
        num_segments,
        num_segments as f64 / tracks.len() as f64
    );
    println!(
        "segment lengths: min = {:.6} cm, max = {:.6} cm",
        geometry.min_segment_length(),
        geometry.max_segment_length()
    );
    println!(
        "flat source regions crossed: {} of {} ({} uncrossed)",
        geometry.num_fsrs() - uncrossed,
        geometry.num_fsrs(),
        uncrossed
    );
}
