//! Triangle geometry and local coordinate frames.
//!
//! Each discontinuity element is a flat triangle carrying a local
//! orthonormal frame in the Okada convention:
//! - x = outward unit normal
//! - y = strike direction (horizontal, ẑ × n̂)
//! - z = dip direction (in the plane of n̂ and ẑ, pointing upward for
//!   non-horizontal triangles)
//!
//! Burgers vectors are stored in this frame; conversion to the global
//! frame is always explicit. Burgers and traction vectors transform
//! contravariantly, i.e. with the same rotation.

use crate::error::{Error, Result};
use crate::types::{Point3, StrainTensor, StressTensor, Vec3};
use nalgebra::Matrix3;

/// Relative tolerance below which a triangle counts as degenerate.
const DEGENERATE_AREA_TOL: f64 = 1e-14;

/// A flat triangular dislocation element with cached derived geometry.
#[derive(Debug, Clone)]
pub struct Triangle {
    vertices: [Point3; 3],
    centroid: Point3,
    normal: Vec3,
    strike: Vec3,
    dip: Vec3,
    area: f64,
}

impl Triangle {
    /// Build a triangle from three vertices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Geometry`] for a degenerate (zero-area) triangle.
    pub fn new(v0: Point3, v1: Point3, v2: Point3) -> Result<Self> {
        let cross = (v1 - v0).cross(&(v2 - v0));
        let cross_norm = cross.norm();
        let scale = (v1 - v0).norm().max((v2 - v0).norm());
        if cross_norm <= DEGENERATE_AREA_TOL * scale * scale {
            return Err(Error::Geometry(
                "degenerate triangle with zero area".to_string(),
            ));
        }
        let normal = cross / cross_norm;
        let (strike, dip) = local_frame(&normal);
        Ok(Self {
            vertices: [v0, v1, v2],
            centroid: (v0 + v1 + v2) / 3.0,
            normal,
            strike,
            dip,
            area: 0.5 * cross_norm,
        })
    }

    /// The three vertices in construction order.
    pub fn vertices(&self) -> &[Point3; 3] {
        &self.vertices
    }

    /// Centroid of the triangle.
    pub fn centroid(&self) -> Point3 {
        self.centroid
    }

    /// Unit outward normal ê_n.
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Unit strike vector ê_s (horizontal).
    pub fn strike(&self) -> Vec3 {
        self.strike
    }

    /// Unit dip vector ê_d (ê_d·ẑ ≥ 0 for non-horizontal triangles).
    pub fn dip(&self) -> Vec3 {
        self.dip
    }

    /// Triangle area (always positive).
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Characteristic length, the square root of the area.
    pub fn size(&self) -> f64 {
        self.area.sqrt()
    }

    /// Rotation matrix taking global components to local (n, s, d) components.
    ///
    /// Rows are the local basis vectors, so `R * v_global = v_local`.
    pub fn rotation_to_local(&self) -> Matrix3<f64> {
        Matrix3::from_rows(&[
            self.normal.transpose(),
            self.strike.transpose(),
            self.dip.transpose(),
        ])
    }

    /// Vector components from global to the local (n, s, d) frame.
    pub fn to_local(&self, v: &Vec3) -> Vec3 {
        Vec3::new(self.normal.dot(v), self.strike.dot(v), self.dip.dot(v))
    }

    /// Vector components from the local (n, s, d) frame to global.
    pub fn to_global(&self, v: &Vec3) -> Vec3 {
        v.x * self.normal + v.y * self.strike + v.z * self.dip
    }

    /// Symmetric tensor from global to local components: ε' = R ε Rᵀ.
    pub fn strain_to_local(&self, e: &StrainTensor) -> StrainTensor {
        let r = self.rotation_to_local();
        StrainTensor::from_gradient(&(r * e.to_matrix() * r.transpose()))
    }

    /// Symmetric stress tensor from global to local components.
    pub fn stress_to_local(&self, s: &StressTensor) -> StressTensor {
        let r = self.rotation_to_local();
        StressTensor::from_matrix(&(r * s.to_matrix() * r.transpose()))
    }

    /// Signed distance of a point from the triangle plane.
    pub fn plane_distance(&self, p: &Point3) -> f64 {
        self.normal.dot(&(p - self.vertices[0]))
    }

    /// True if `p` lies within `tol` of one of the triangle's edge lines
    /// while also lying in the triangle plane within `tol`.
    ///
    /// Field evaluation at such points hits the kernel's singular lines;
    /// callers fall back to the principal-value limit and warn.
    pub fn near_edge(&self, p: &Point3, tol: f64) -> bool {
        if self.plane_distance(p).abs() > tol {
            return false;
        }
        for i in 0..3 {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % 3];
            let ab = b - a;
            let t = (p - a).dot(&ab) / ab.norm_squared();
            let t = t.clamp(0.0, 1.0);
            if (p - (a + ab * t)).norm() <= tol {
                return true;
            }
        }
        false
    }

    /// Dihedral angle between this triangle and another, in radians.
    ///
    /// Used by divergence diagnostics to point at nearly folded element
    /// pairs.
    pub fn dihedral_angle(&self, other: &Triangle) -> f64 {
        self.normal.dot(&other.normal).clamp(-1.0, 1.0).acos()
    }

    /// True if the two triangles share exactly two vertices (an edge),
    /// within a relative tolerance.
    pub fn shares_edge(&self, other: &Triangle) -> bool {
        let tol = 1e-9 * (self.size() + other.size()).max(f64::MIN_POSITIVE);
        let mut shared = 0;
        for a in &self.vertices {
            for b in &other.vertices {
                if (a - b).norm() <= tol {
                    shared += 1;
                    break;
                }
            }
        }
        shared == 2
    }
}

/// Local (strike, dip) directions for a unit normal.
///
/// Strike is ẑ × n̂ normalized; for horizontal triangles (where that
/// degenerates) strike falls back to ŷ·sign(n_z). Dip completes the
/// right-handed (n, s, d) triple: ê_d = ê_n × ê_s, which points upward
/// (ê_d·ẑ ≥ 0) for non-horizontal triangles.
fn local_frame(normal: &Vec3) -> (Vec3, Vec3) {
    let e_z = Vec3::z();
    let mut strike = e_z.cross(normal);
    if strike.norm() < 1e-12 {
        strike = Vec3::y() * normal.z;
    }
    strike.normalize_mut();
    let dip = normal.cross(&strike);
    (strike, dip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dipping_triangle(dip_deg: f64) -> Triangle {
        // Plane through the origin striking along y, dipping `dip_deg`
        // from horizontal.
        let d = dip_deg.to_radians();
        let v0 = Point3::new(0.0, 0.0, 0.0);
        let v1 = Point3::new(0.0, 1.0, 0.0);
        let v2 = Point3::new(d.cos(), 0.0, -d.sin());
        Triangle::new(v0, v1, v2).unwrap()
    }

    #[test]
    fn test_rejects_degenerate() {
        let p = Point3::new(1.0, 1.0, 1.0);
        assert!(Triangle::new(p, p, Point3::new(2.0, 2.0, 2.0)).is_err());
        // Collinear vertices
        assert!(Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        )
        .is_err());
    }

    #[test]
    fn test_area_and_centroid() {
        let t = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(t.area(), 0.5, epsilon = 1e-15);
        assert_relative_eq!(t.centroid().x, 2.0 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(t.centroid().y, 1.0 / 3.0, epsilon = 1e-15);
    }

    #[test]
    fn test_frame_orthonormal() {
        for dip in [0.0, 15.0, 45.0, 60.0, 89.0] {
            let t = dipping_triangle(dip);
            assert_relative_eq!(t.normal().norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(t.strike().norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(t.dip().norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(t.normal().dot(&t.strike()), 0.0, epsilon = 1e-12);
            assert_relative_eq!(t.normal().dot(&t.dip()), 0.0, epsilon = 1e-12);
            assert_relative_eq!(t.strike().dot(&t.dip()), 0.0, epsilon = 1e-12);
            // Strike is horizontal, dip points upward.
            assert_relative_eq!(t.strike().z, 0.0, epsilon = 1e-12);
            assert!(t.dip().z >= -1e-12, "dip must not point down: {dip}");
        }
    }

    #[test]
    fn test_frame_right_handed() {
        let t = dipping_triangle(60.0);
        let d = t.normal().cross(&t.strike());
        assert_relative_eq!((d - t.dip()).norm(), 0.0, epsilon = 1e-12);
        let s = t.dip().cross(&t.normal());
        assert_relative_eq!((s - t.strike()).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_local_global_round_trip() {
        let t = dipping_triangle(37.0);
        let v = Vec3::new(0.3, -1.2, 2.5);
        let back = t.to_global(&t.to_local(&v));
        assert_relative_eq!((back - v).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_tensor_rotation_preserves_invariants() {
        let t = dipping_triangle(52.0);
        let s = StressTensor::new([1.0, 0.4, -0.2, 2.0, 0.1, -3.0]);
        let local = t.stress_to_local(&s);
        assert_relative_eq!(local.mean(), s.mean(), epsilon = 1e-12);
        assert_relative_eq!(local.von_mises(), s.von_mises(), epsilon = 1e-9);
    }

    #[test]
    fn test_near_edge() {
        let t = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        )
        .unwrap();
        assert!(t.near_edge(&Point3::new(0.5, 0.0, 0.0), 1e-9));
        assert!(!t.near_edge(&Point3::new(0.25, 0.25, 0.0), 1e-9));
        // Off-plane points are never edge hits.
        assert!(!t.near_edge(&Point3::new(0.5, 0.0, 0.1), 1e-9));
    }

    #[test]
    fn test_shares_edge_and_dihedral() {
        let a = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        )
        .unwrap();
        let b = Triangle::new(
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.5),
        )
        .unwrap();
        assert!(a.shares_edge(&b));
        assert!(a.dihedral_angle(&b) > 0.0);
        assert_relative_eq!(a.dihedral_angle(&a), 0.0, epsilon = 1e-12);
    }
}
