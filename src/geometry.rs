//! Triangle geometry shared by the stiffness and mass assemblies.
//!
//! Functions that are undefined on collinear input return `None`; callers turn that into a zero
//! contribution and a diagnostic.

use nalgebra::Point3;

/// `sin(angle)` below this (relative to the edge lengths) counts as collinear.
const COLLINEAR_EPS: f64 = 1e-12;

pub fn triangle_area(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    0.5 * (b - a).cross(&(c - a)).norm()
}

pub fn midpoint(a: &Point3<f64>, b: &Point3<f64>) -> Point3<f64> {
    nalgebra::center(a, b)
}

pub fn is_collinear(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> bool {
    let u = b - a;
    let v = c - a;
    let scale = u.norm() * v.norm();
    scale == 0.0 || u.cross(&v).norm() <= COLLINEAR_EPS * scale
}

/// Cotangent of the angle at `apex` in the triangle `(p, apex, q)`.
pub fn cotangent(p: &Point3<f64>, apex: &Point3<f64>, q: &Point3<f64>) -> Option<f64> {
    let u = p - apex;
    let v = q - apex;
    let scale = u.norm() * v.norm();
    let sine = u.cross(&v).norm();
    if scale == 0.0 || sine <= COLLINEAR_EPS * scale {
        return None;
    }
    Some(u.dot(&v) / sine)
}

/// True when the angle at `vertex` in the triangle `(p, vertex, q)` exceeds 90 degrees.
pub fn is_obtuse_at(p: &Point3<f64>, vertex: &Point3<f64>, q: &Point3<f64>) -> bool {
    (p - vertex).dot(&(q - vertex)) < 0.0
}

pub fn circumcenter(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Point3<f64>> {
    if is_collinear(a, b, c) {
        return None;
    }
    let u = b - a;
    let v = c - a;
    let w = u.cross(&v);
    let offset = (v.cross(&w) * u.norm_squared() + w.cross(&u) * v.norm_squared())
        / (2.0 * w.norm_squared());
    Some(a + offset)
}
