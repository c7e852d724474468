//! 2D constructive solid geometry engine for method-of-characteristics
//! neutron transport.
//!
//! A reactor cross section is described as a hierarchy of surfaces, cells,
//! universes and lattices owned by a [`Geometry`]. Once the hierarchy is
//! complete, [`Geometry::initialize_flat_source_regions`] assigns a dense id
//! to every innermost material region, and [`Geometry::segmentize`] cuts
//! characteristic tracks into segments annotated with their length, material
//! and flat source region.

pub mod cell;
pub mod config;
pub mod coords;
pub mod geometry;
pub mod lattice;
pub mod material;
pub mod settings;
pub mod surface;
pub mod track;
pub mod universe;

pub use cell::{Cell, CellKind, Halfspace};
pub use coords::LocalCoords;
pub use geometry::Geometry;
pub use lattice::Lattice;
pub use material::Material;
pub use surface::{BoundaryType, Surface, SurfaceKind};
pub use track::{Segment, Track};
pub use universe::Universe;
