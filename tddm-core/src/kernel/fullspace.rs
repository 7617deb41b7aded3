//! Triangular dislocation fields in an elastic full space.
//!
//! A triangle with uniform Burgers vector is superposed from three
//! angular dislocations anchored at its vertices, following the
//! artefact-free configuration rules: the barycentric position of the
//! projected observation point selects which of the two equivalent
//! angular decompositions is free of spurious branch discontinuities.
//! The displacement additionally carries the solid-angle (Burgers
//! function) term of the whole triangle.
//!
//! Observation points that fall exactly on an edge line of the element
//! hit the kernel's singular support; those are resolved as the
//! principal value, the average of the two one-sided limits across the
//! element plane.

use super::angular::{angular_displacement, angular_strain, AngStrain};
use crate::geometry::Triangle;
use crate::types::{Point3, StrainTensor, Vec3};
use nalgebra::Matrix3;

/// Artefact-free configuration selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TriMode {
    /// Configuration I.
    Positive,
    /// Configuration II.
    Negative,
    /// On an edge line within the element plane: principal value needed.
    OnEdge,
}

/// Displacement at `obs` due to Burgers `b_local` (normal, strike, dip)
/// on `tri`, in global coordinates.
pub(crate) fn displacement(tri: &Triangle, obs: &Point3, b_local: &Vec3, nu: f64) -> Vec3 {
    let setup = TdSetup::new(tri, obs);
    if setup.mode == TriMode::OnEdge {
        // Principal value: average of the one-sided limits.
        let delta = 1e-8 * tri.size();
        let up = displacement(tri, &(obs + tri.normal() * delta), b_local, nu);
        let um = displacement(tri, &(obs - tri.normal() * delta), b_local, nu);
        return (up + um) / 2.0;
    }

    let (bx, by, bz) = (b_local.x, b_local.y, b_local.z);
    let mut u = Vec3::zeros();
    for side in setup.sides() {
        u += td_setup_displacement(&setup.obs, side, bx, by, bz, nu);
    }

    // Solid-angle term of the whole triangle.
    let fi = setup.solid_angle();
    u += Vec3::new(bx * fi, by * fi, bz * fi);

    // Back to global components.
    setup.rot.transpose() * u
}

/// Strain at `obs` due to Burgers `b_local` on `tri`, global components.
pub(crate) fn strain(tri: &Triangle, obs: &Point3, b_local: &Vec3, nu: f64) -> StrainTensor {
    let setup = TdSetup::new(tri, obs);
    if setup.mode == TriMode::OnEdge {
        let delta = 1e-8 * tri.size();
        let ep = strain(tri, &(obs + tri.normal() * delta), b_local, nu);
        let em = strain(tri, &(obs - tri.normal() * delta), b_local, nu);
        return StrainTensor((ep.0 + em.0) / 2.0);
    }

    let (bx, by, bz) = (b_local.x, b_local.y, b_local.z);
    let mut e = Matrix3::zeros();
    for side in setup.sides() {
        e += td_setup_strain(&setup.obs, side, bx, by, bz, nu);
    }

    // Back to global components: ε_g = Rᵀ ε_l R.
    let rt = setup.rot.transpose();
    StrainTensor::from_gradient(&(rt * e * setup.rot))
}

/// One angular dislocation leg of the decomposition.
struct Side {
    /// Apex of the angular dislocation, local (TDCS) coordinates.
    vertex: Vec3,
    /// Interior wedge angle at the apex.
    angle: f64,
    /// Unit side vector in the TDCS (x component ≈ 0).
    direction: Vec3,
}

/// Shared geometry for one (triangle, observation point) pair, in the
/// triangle coordinate system (x = normal, y = strike, z = dip).
struct TdSetup {
    rot: Matrix3<f64>,
    obs: Vec3,
    p1: Vec3,
    p3: Vec3,
    e12: Vec3,
    e13: Vec3,
    e23: Vec3,
    angle_a: f64,
    angle_b: f64,
    angle_c: f64,
    mode: TriMode,
}

impl TdSetup {
    fn new(tri: &Triangle, obs: &Point3) -> Self {
        let rot = tri.rotation_to_local();
        let [v1, v2, v3] = tri.vertices();
        // The second vertex is the local origin.
        let obs_l = rot * (obs - v2);
        let p1 = rot * (v1 - v2);
        let p3 = rot * (v3 - v2);

        let e12 = -p1 / p1.norm();
        let e13 = (p3 - p1).normalize();
        let e23 = p3 / p3.norm();

        let angle_a = e12.dot(&e13).clamp(-1.0, 1.0).acos();
        let angle_b = (-e12.dot(&e23)).clamp(-1.0, 1.0).acos();
        let angle_c = e23.dot(&e13).clamp(-1.0, 1.0).acos();

        let mode = trimode(
            (obs_l.y, obs_l.z),
            obs_l.x,
            (p1.y, p1.z),
            (0.0, 0.0),
            (p3.y, p3.z),
        );

        Self {
            rot,
            obs: obs_l,
            p1,
            p3,
            e12,
            e13,
            e23,
            angle_a,
            angle_b,
            angle_c,
            mode,
        }
    }

    /// The three angular dislocation legs for the active configuration.
    fn sides(&self) -> [Side; 3] {
        let origin = Vec3::zeros();
        match self.mode {
            TriMode::Positive => [
                Side {
                    vertex: self.p1,
                    angle: self.angle_a,
                    direction: -self.e13,
                },
                Side {
                    vertex: origin,
                    angle: self.angle_b,
                    direction: self.e12,
                },
                Side {
                    vertex: self.p3,
                    angle: self.angle_c,
                    direction: self.e23,
                },
            ],
            _ => [
                Side {
                    vertex: self.p1,
                    angle: self.angle_a,
                    direction: self.e13,
                },
                Side {
                    vertex: origin,
                    angle: self.angle_b,
                    direction: -self.e12,
                },
                Side {
                    vertex: self.p3,
                    angle: self.angle_c,
                    direction: -self.e23,
                },
            ],
        }
    }

    /// Solid angle of the triangle seen from the observation point,
    /// normalized by 4π (Van Oosterom & Strackee).
    fn solid_angle(&self) -> f64 {
        let o = self.obs;
        let a = Vec3::new(-o.x, self.p1.y - o.y, self.p1.z - o.z);
        let b = -o;
        let c = Vec3::new(-o.x, self.p3.y - o.y, self.p3.z - o.z);
        let (na, nb, nc) = (a.norm(), b.norm(), c.norm());
        let num = a.dot(&b.cross(&c));
        let den = na * nb * nc + a.dot(&b) * nc + a.dot(&c) * nb + b.dot(&c) * na;
        -2.0 * num.atan2(den) / (4.0 * std::f64::consts::PI)
    }
}

/// Displacement of one angular dislocation leg, in TDCS components.
fn td_setup_displacement(obs: &Vec3, side: Side, bx: f64, by: f64, bz: f64, nu: f64) -> Vec3 {
    // In-plane rotation from TDCS into the leg's ADCS.
    let a11 = side.direction.z;
    let a12 = side.direction.y;

    let y1 = a11 * (obs.y - side.vertex.y) + a12 * (obs.z - side.vertex.z);
    let z1 = -a12 * (obs.y - side.vertex.y) + a11 * (obs.z - side.vertex.z);
    let by1 = a11 * by + a12 * bz;
    let bz1 = -a12 * by + a11 * bz;

    let u = angular_displacement(
        obs.x,
        y1,
        z1,
        side.angle - std::f64::consts::PI,
        bx,
        by1,
        bz1,
        nu,
    );

    // Rotate the in-plane components back into the TDCS.
    Vec3::new(u.x, a11 * u.y - a12 * u.z, a12 * u.y + a11 * u.z)
}

/// Strain of one angular dislocation leg, as a TDCS matrix.
fn td_setup_strain(obs: &Vec3, side: Side, bx: f64, by: f64, bz: f64, nu: f64) -> Matrix3<f64> {
    let a11 = side.direction.z;
    let a12 = side.direction.y;

    let y1 = a11 * (obs.y - side.vertex.y) + a12 * (obs.z - side.vertex.z);
    let z1 = -a12 * (obs.y - side.vertex.y) + a11 * (obs.z - side.vertex.z);
    let by1 = a11 * by + a12 * bz;
    let bz1 = -a12 * by + a11 * bz;

    let e = angular_strain(
        obs.x,
        y1,
        z1,
        side.angle - std::f64::consts::PI,
        bx,
        by1,
        bz1,
        nu,
    );

    // ε_TDCS = B ε_ADCS Bᵀ with B = [[1, 0, 0], [0, a11, -a12], [0, a12, a11]].
    let b = Matrix3::new(1.0, 0.0, 0.0, 0.0, a11, -a12, 0.0, a12, a11);
    b * ang_strain_matrix(&e) * b.transpose()
}

fn ang_strain_matrix(e: &AngStrain) -> Matrix3<f64> {
    let [exx, eyy, ezz, exy, exz, eyz] = *e;
    Matrix3::new(exx, exy, exz, exy, eyy, eyz, exz, eyz, ezz)
}

/// Artefact-free configuration from normalized barycentric coordinates
/// of the observation point projected onto the element plane.
fn trimode(
    p: (f64, f64),
    normal_dist: f64,
    p1: (f64, f64),
    p2: (f64, f64),
    p3: (f64, f64),
) -> TriMode {
    let den = (p2.1 - p3.1) * (p1.0 - p3.0) + (p3.0 - p2.0) * (p1.1 - p3.1);
    let a = ((p2.1 - p3.1) * (p.0 - p3.0) + (p3.0 - p2.0) * (p.1 - p3.1)) / den;
    let b = ((p3.1 - p1.1) * (p.0 - p3.0) + (p1.0 - p3.0) * (p.1 - p3.1)) / den;
    let c = 1.0 - a - b;

    let mut mode = TriMode::Positive;
    if (a < 0.0 && b > c && c > a)
        || (b < 0.0 && c > a && a > b)
        || (c < 0.0 && a > b && b > c)
    {
        mode = TriMode::Negative;
    }
    if (a == 0.0 && b >= 0.0 && c >= 0.0)
        || (a >= 0.0 && b == 0.0 && c >= 0.0)
        || (a >= 0.0 && b >= 0.0 && c == 0.0)
    {
        mode = TriMode::OnEdge;
    }
    if mode == TriMode::OnEdge && normal_dist != 0.0 {
        mode = TriMode::Positive;
    }
    mode
}
