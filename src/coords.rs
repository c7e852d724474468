//! Chains of local coordinates through the universe hierarchy.
//!
//! Locating a point in a nested geometry produces one coordinate record per
//! nesting level: which universe the point is in, which cell of that universe,
//! and where the point sits in that universe's local frame. Lattice levels
//! additionally record the lattice cell indices, with the point expressed
//! relative to that cell's centre.
//!
//! The chain is stored as a flat vector from the root universe down to the
//! innermost material cell, so copying is a clone and pruning is truncation.
//! Every frame in the hierarchy is a pure translation of the global frame,
//! which is what allows `adjust` to move the whole chain by a single delta.

use std::fmt;

use nalgebra::Point2;

use crate::config::ROOT_UNIVERSE;

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn adjust_moves_every_level() {
        let mut coords = LocalCoords::new(1.0, 2.0);
        coords.push_universe(5, Point2::new(0.25, -0.25));
        coords.adjust(0.5, -1.0);
        assert_eq!(coords.head().point, Point2::new(1.5, 1.0));
        assert_eq!(coords.lowest().point, Point2::new(0.75, -1.25));
    }

    #[test]
    fn update_most_local_applies_the_delta_to_the_chain() {
        let mut coords = LocalCoords::new(1.0, 2.0);
        coords.push_universe(5, Point2::new(0.25, -0.25));
        coords.update_most_local(&Point2::new(1.25, -0.25));
        assert_eq!(coords.lowest().point, Point2::new(1.25, -0.25));
        assert_eq!(coords.head().point, Point2::new(2.0, 2.0));
    }

    #[test]
    fn deepest_lattice_level_skips_the_head() {
        let mut coords = LocalCoords::new(0.0, 0.0);
        coords.push_universe(7, Point2::new(0.0, 0.0));
        coords.set_lattice(1, 7, 2, 1, Point2::new(0.1, 0.1));
        coords.push_universe(3, Point2::new(0.1, 0.1));
        assert_eq!(coords.deepest_lattice_level(), Some(1));
        assert!(coords.has_lattice_level());

        coords.truncate(1);
        assert_eq!(coords.deepest_lattice_level(), None);
        assert!(!coords.has_lattice_level());
    }

    #[test]
    fn reset_to_head_keeps_the_root_point() {
        let mut coords = LocalCoords::new(0.5, 0.5);
        coords.set_cell(0, 3);
        coords.push_universe(5, Point2::new(0.5, 0.5));
        coords.reset_to_head();
        assert_eq!(coords.len(), 1);
        assert_eq!(coords.head().point, Point2::new(0.5, 0.5));
        assert!(matches!(coords.head().kind, CoordKind::Univ { cell: None }));
    }
}

/// What a single level of the chain records besides its universe and point.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordKind {
    /// A level inside a simple universe, with the containing cell once known.
    Univ { cell: Option<i32> },
    /// A level inside a lattice, with the indices of the lattice cell.
    Lat {
        lattice: i32,
        lattice_x: usize,
        lattice_y: usize,
    },
}

/// One level of a coordinate chain.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordNode {
    pub universe_id: i32,
    pub point: Point2<f64>,
    pub kind: CoordKind,
}

impl CoordNode {
    pub fn is_lattice(&self) -> bool {
        matches!(self.kind, CoordKind::Lat { .. })
    }

    /// Lattice cell indices for a lattice node, `None` otherwise.
    pub fn lattice_cell(&self) -> Option<(usize, usize)> {
        match self.kind {
            CoordKind::Lat {
                lattice_x,
                lattice_y,
                ..
            } => Some((lattice_x, lattice_y)),
            CoordKind::Univ { .. } => None,
        }
    }
}

/// A parent-to-child chain of local coordinates, head at the root universe.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalCoords {
    nodes: Vec<CoordNode>,
}

impl LocalCoords {
    /// Creates a single-level chain at the root universe.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            nodes: vec![CoordNode {
                universe_id: ROOT_UNIVERSE,
                point: Point2::new(x, y),
                kind: CoordKind::Univ { cell: None },
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, level: usize) -> &CoordNode {
        &self.nodes[level]
    }

    pub fn head(&self) -> &CoordNode {
        &self.nodes[0]
    }

    /// The lowest (innermost) level of the chain.
    pub fn lowest(&self) -> &CoordNode {
        self.nodes.last().expect("coordinate chain is empty")
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CoordNode> {
        self.nodes.iter()
    }

    /// Translates every level of the chain by the same delta.
    pub fn adjust(&mut self, delta_x: f64, delta_y: f64) {
        for node in &mut self.nodes {
            node.point.x += delta_x;
            node.point.y += delta_y;
        }
    }

    /// Moves the lowest level to `point` and carries the same displacement
    /// through the rest of the chain.
    pub fn update_most_local(&mut self, point: &Point2<f64>) {
        let lowest = self.lowest().point;
        self.adjust(point.x - lowest.x, point.y - lowest.y);
    }

    /// Collapses the chain back to its head, forgetting any cell recorded
    /// there, in preparation for a fresh descent.
    pub(crate) fn reset_to_head(&mut self) {
        self.nodes.truncate(1);
        self.nodes[0].kind = CoordKind::Univ { cell: None };
    }

    pub(crate) fn push_universe(&mut self, universe_id: i32, point: Point2<f64>) {
        self.nodes.push(CoordNode {
            universe_id,
            point,
            kind: CoordKind::Univ { cell: None },
        });
    }

    pub(crate) fn set_cell(&mut self, level: usize, cell_id: i32) {
        match &mut self.nodes[level].kind {
            CoordKind::Univ { cell } => *cell = Some(cell_id),
            CoordKind::Lat { .. } => panic!("cannot record a cell on a lattice coordinate"),
        }
    }

    /// Turns the node at `level` into a lattice node with a point local to the
    /// centre of lattice cell `(x, y)`.
    pub(crate) fn set_lattice(
        &mut self,
        level: usize,
        lattice: i32,
        x: usize,
        y: usize,
        point: Point2<f64>,
    ) {
        let node = &mut self.nodes[level];
        node.point = point;
        node.kind = CoordKind::Lat {
            lattice,
            lattice_x: x,
            lattice_y: y,
        };
    }

    /// Drops every level below `level`.
    pub(crate) fn truncate_below(&mut self, level: usize) {
        self.nodes.truncate(level + 1);
    }

    /// Drops `level` and everything below it.
    pub(crate) fn truncate(&mut self, level: usize) {
        self.nodes.truncate(level);
    }

    /// Destroys all descendants of the head.
    pub fn prune(&mut self) {
        self.nodes.truncate(1);
    }

    /// Index of the deepest lattice level, excluding the head, which can never
    /// be stepped.
    pub(crate) fn deepest_lattice_level(&self) -> Option<usize> {
        (1..self.nodes.len()).rev().find(|&i| self.nodes[i].is_lattice())
    }

    pub(crate) fn has_lattice_level(&self) -> bool {
        self.deepest_lattice_level().is_some()
    }
}

impl fmt::Display for LocalCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            match &node.kind {
                CoordKind::Univ { cell } => write!(
                    f,
                    "universe {} cell {:?} at ({:.6}, {:.6})",
                    node.universe_id, cell, node.point.x, node.point.y
                )?,
                CoordKind::Lat {
                    lattice,
                    lattice_x,
                    lattice_y,
                } => write!(
                    f,
                    "lattice {} cell ({}, {}) at ({:.6}, {:.6})",
                    lattice, lattice_x, lattice_y, node.point.x, node.point.y
                )?,
            }
        }
        Ok(())
    }
}
