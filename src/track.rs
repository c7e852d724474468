use std::fmt;

use nalgebra::Point2;

use crate::config::FpPrecision;

/// The piece of a track crossing a single flat source region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub length: FpPrecision,
    pub material_id: i32,
    pub region_id: usize,
}

/// A characteristic ray through the geometry, discretized into segments by
/// `Geometry::segmentize`.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    start: Point2<f64>,
    end: Point2<f64>,
    phi: f64,
    segments: Vec<Segment>,
}

impl Track {
    pub fn new(start: Point2<f64>, end: Point2<f64>) -> Self {
        if start == end {
            panic!(
                "track endpoints coincide at ({}, {})",
                start.x, start.y
            );
        }
        let phi = (end.y - start.y).atan2(end.x - start.x);
        Self {
            start,
            end,
            phi,
            segments: Vec::new(),
        }
    }

    pub fn start(&self) -> Point2<f64> {
        self.start
    }

    pub fn end(&self) -> Point2<f64> {
        self.end
    }

    /// Azimuthal angle of the track in radians.
    pub fn phi(&self) -> f64 {
        self.phi
    }

    /// Euclidean distance between the track endpoints.
    pub fn length(&self) -> f64 {
        nalgebra::distance(&self.start, &self.end)
    }

    pub fn add_segment(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.6}, {:.6}) -> ({:.6}, {:.6}) at phi = {:.6}",
            self.start.x, self.start.y, self.end.x, self.end.y, self.phi
        )
    }
}
