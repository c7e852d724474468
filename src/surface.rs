use nalgebra::{Point2, Vector2};


/// Physical boundary condition carried by a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryType {
    Reflective,
    Vacuum,
    None,
}

/// Algebraic form of a surface in the xy plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SurfaceKind {
    /// The plane `a*x + b*y + c = 0`.
    Plane { a: f64, b: f64, c: f64 },
    /// The plane `x = x0`.
    XPlane { x: f64 },
    /// The plane `y = y0`.
    YPlane { y: f64 },
    /// The circle `(x - x0)^2 + (y - y0)^2 = radius^2`.
    Circle { x0: f64, y0: f64, radius: f64 },
}

/// An oriented algebraic boundary. The sign of `evaluate` splits the plane into
/// the two halfspaces that cells are built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub id: i32,
    pub kind: SurfaceKind,
    pub boundary: BoundaryType,
}

impl Surface {
    pub fn new(id: i32, kind: SurfaceKind, boundary: BoundaryType) -> Self {
        if id <= 0 {
            panic!("surface ids must be positive, got {}", id);
        }
        if let SurfaceKind::Circle { radius, .. } = kind {
            if radius <= 0.0 {
                panic!("surface {} has non-positive radius {}", id, radius);
            }
        }
        Self { id, kind, boundary }
    }

    /// Evaluates the defining expression of the surface at a point. The sign
    /// of the result selects the halfspace the point lies in; it is zero for
    /// points on the surface.
    pub fn evaluate(&self, point: &Point2<f64>) -> f64 {
        match self.kind {
            SurfaceKind::Plane { a, b, c } => a * point.x + b * point.y + c,
            SurfaceKind::XPlane { x } => point.x - x,
            SurfaceKind::YPlane { y } => point.y - y,
            SurfaceKind::Circle { x0, y0, radius } => {
                let dx = point.x - x0;
                let dy = point.y - y0;
                dx * dx + dy * dy - radius * radius
            }
        }
    }

    /// Finds the nearest intersection of the surface with a ray cast from
    /// `point` along `angle`, looking only in the forward direction. Returns
    /// the distance and the intersection point, or `None` if the ray never
    /// crosses the surface.
    pub fn min_distance(&self, point: &Point2<f64>, angle: f64) -> Option<(f64, Point2<f64>)> {
        let u = Vector2::new(angle.cos(), angle.sin());
        let t = match self.kind {
            SurfaceKind::Plane { a, b, c } => {
                let denom = a * u.x + b * u.y;
                if denom == 0.0 {
                    return None;
                }
                -(a * point.x + b * point.y + c) / denom
            }
            SurfaceKind::XPlane { x } => {
                if u.x == 0.0 {
                    return None;
                }
                (x - point.x) / u.x
            }
            SurfaceKind::YPlane { y } => {
                if u.y == 0.0 {
                    return None;
                }
                (y - point.y) / u.y
            }
            SurfaceKind::Circle { x0, y0, radius } => {
                let d = point - Point2::new(x0, y0);
                let b = d.dot(&u);
                let disc = b * b - (d.norm_squared() - radius * radius);
                if disc < 0.0 {
                    return None;
                }
                let sqrt_disc = disc.sqrt();
                // the nearer root first, falling back to the far side of the
                // circle when the ray starts inside
                if -b - sqrt_disc > 0.0 {
                    -b - sqrt_disc
                } else {
                    -b + sqrt_disc
                }
            }
        };

        (t.is_finite() && t > 0.0).then(|| (t, point + u * t))
    }

    /// Minimum x coordinate reached by the surface, possibly -inf.
    pub fn x_min(&self) -> f64 {
        match self.kind {
            SurfaceKind::XPlane { x } => x,
            SurfaceKind::Circle { x0, radius, .. } => x0 - radius,
            _ => f64::NEG_INFINITY,
        }
    }

    /// Maximum x coordinate reached by the surface, possibly +inf.
    pub fn x_max(&self) -> f64 {
        match self.kind {
            SurfaceKind::XPlane { x } => x,
            SurfaceKind::Circle { x0, radius, .. } => x0 + radius,
            _ => f64::INFINITY,
        }
    }

    /// Minimum y coordinate reached by the surface, possibly -inf.
    pub fn y_min(&self) -> f64 {
        match self.kind {
            SurfaceKind::YPlane { y } => y,
            SurfaceKind::Circle { y0, radius, .. } => y0 - radius,
            _ => f64::NEG_INFINITY,
        }
    }

    /// Maximum y coordinate reached by the surface, possibly +inf.
    pub fn y_max(&self) -> f64 {
        match self.kind {
            SurfaceKind::YPlane { y } => y,
            SurfaceKind::Circle { y0, radius, .. } => y0 + radius,
            _ => f64::INFINITY,
        }
    }
}
