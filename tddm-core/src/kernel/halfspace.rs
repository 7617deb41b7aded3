//! Triangular dislocation fields in an elastic half-space.
//!
//! The half-space solution superposes three parts:
//! 1. the real source in a full space,
//! 2. an image source mirrored across the free surface z = 0,
//! 3. a harmonic free-surface correction built from angular dislocation
//!    pairs along the triangle sides, which cancels the residual
//!    tractions so that σ·ẑ = 0 on z = 0.
//!
//! The correction displacement is fully analytic. Its contribution to
//! the strain is evaluated by central differences of that analytic
//! displacement: the correction is harmonic and smooth everywhere below
//! the free surface (its singular support lies on the mirrored geometry
//! above z = 0), so the differences converge at solver tolerance.

use super::fullspace;
use crate::geometry::Triangle;
use crate::types::{Point3, StrainTensor, Vec3};
use nalgebra::Matrix3;
use std::f64::consts::PI;

/// Displacement at `obs` (z ≤ 0) due to Burgers `b_local` on `tri`.
pub(crate) fn displacement(tri: &Triangle, obs: &Point3, b_local: &Vec3, nu: f64) -> Vec3 {
    let main = fullspace::displacement(tri, obs, b_local, nu);
    let correction = harmonic_displacement(tri, obs, b_local, nu);

    let image = image_triangle(tri);
    let mut img = fullspace::displacement(&image, obs, b_local, nu);
    if on_free_surface(tri) {
        img.z = -img.z;
    }

    main + img + correction
}

/// Strain at `obs` (z ≤ 0) due to Burgers `b_local` on `tri`.
pub(crate) fn strain(tri: &Triangle, obs: &Point3, b_local: &Vec3, nu: f64) -> StrainTensor {
    let main = fullspace::strain(tri, obs, b_local, nu);

    let image = image_triangle(tri);
    let mut img = fullspace::strain(&image, obs, b_local, nu);
    if on_free_surface(tri) {
        // xz and yz components of the image flip for a source lying
        // exactly on the free surface.
        img.0[2] = -img.0[2];
        img.0[4] = -img.0[4];
    }

    let correction = harmonic_strain(tri, obs, b_local, nu);
    main + img + correction
}

/// The source triangle mirrored across z = 0.
fn image_triangle(tri: &Triangle) -> Triangle {
    let [v1, v2, v3] = tri.vertices();
    let mirror = |v: &Point3| Point3::new(v.x, v.y, -v.z);
    // The mirrored triangle has the same area; construction cannot fail.
    Triangle::new(mirror(v1), mirror(v2), mirror(v3)).expect("mirrored triangle is degenerate")
}

fn on_free_surface(tri: &Triangle) -> bool {
    tri.vertices().iter().all(|v| v.z == 0.0)
}

/// Analytic harmonic free-surface correction to the displacement.
fn harmonic_displacement(tri: &Triangle, obs: &Point3, b_local: &Vec3, nu: f64) -> Vec3 {
    // Slip vector in global components for the side-pair corrections.
    let b_global = tri.to_global(b_local);
    let [v1, v2, v3] = tri.vertices();
    angular_pair_correction(obs, &b_global, v1, v2, nu)
        + angular_pair_correction(obs, &b_global, v2, v3, nu)
        + angular_pair_correction(obs, &b_global, v3, v1, nu)
}

/// Free-surface correction strain by central differences of the
/// analytic correction displacement.
fn harmonic_strain(tri: &Triangle, obs: &Point3, b_local: &Vec3, nu: f64) -> StrainTensor {
    let h = 1e-5 * tri.size();
    let mut grad = Matrix3::zeros();
    for j in 0..3 {
        let mut dp = *obs;
        let mut dm = *obs;
        dp[j] += h;
        dm[j] -= h;
        // Keep the stencil inside the physical domain.
        dp.z = dp.z.min(0.0);
        dm.z = dm.z.min(0.0);
        let span = dp[j] - dm[j];
        let up = harmonic_displacement(tri, &dp, b_local, nu);
        let um = harmonic_displacement(tri, &dm, b_local, nu);
        for i in 0..3 {
            grad[(i, j)] = (up[i] - um[i]) / span;
        }
    }
    StrainTensor::from_gradient(&grad)
}

/// Correction of one angular dislocation pair along the side PA→PB.
fn angular_pair_correction(
    obs: &Point3,
    b_global: &Vec3,
    pa: &Point3,
    pb: &Point3,
    nu: f64,
) -> Vec3 {
    let side = pb - pa;
    let beta = (-side.normalize().dot(&Vec3::z())).clamp(-1.0, 1.0).acos();
    if beta.abs() < 1e-14 || (PI - beta).abs() < 1e-14 {
        // Vertical side: the pair cancels exactly.
        return Vec3::zeros();
    }

    // ADCS basis: ey1 along the horizontal projection of the side,
    // ey3 pointing down, ey2 completing the triple.
    let ey1 = Vec3::new(side.x, side.y, 0.0).normalize();
    let ey3 = -Vec3::z();
    let ey2 = ey3.cross(&ey1);

    let to_adcs = |v: &Vec3| Vec3::new(ey1.dot(v), ey2.dot(v), ey3.dot(v));

    let ya = to_adcs(&(obs - pa));
    let yab = to_adcs(&side);
    let yb = ya - yab;
    let b = to_adcs(b_global);

    // Artefact-free configuration near the free surface.
    let angle = if ya.x >= 0.0 { beta - PI } else { beta };

    let va = angular_harmonic(ya.x, ya.y, ya.z, angle, b.x, b.y, b.z, nu, -pa.z);
    let vb = angular_harmonic(yb.x, yb.y, yb.z, angle, b.x, b.y, b.z, nu, -pb.z);
    let v = vb - va;

    // Back to global components.
    v.x * ey1 + v.y * ey2 + v.z * ey3
}

/// Harmonic-function correction displacement of a single angular
/// dislocation at depth `a` below the free surface, ADCS components.
#[allow(clippy::too_many_arguments)]
fn angular_harmonic(
    y1: f64,
    y2: f64,
    y3: f64,
    beta: f64,
    b1: f64,
    b2: f64,
    b3: f64,
    nu: f64,
    a: f64,
) -> Vec3 {
    let sin_b = beta.sin();
    let cos_b = beta.cos();
    let cot_b = cos_b / sin_b;
    let cot_b2 = (beta / 2.0).cos() / (beta / 2.0).sin();

    let y3b = y3 + 2.0 * a;
    let z1b = y1 * cos_b + y3b * sin_b;
    let z3b = -y1 * sin_b + y3b * cos_b;
    let rb2 = y1 * y1 + y2 * y2 + y3b * y3b;
    let rb = rb2.sqrt();
    let rb3 = rb * rb2;

    // The Burgers function of the image wedge.
    let fib = 2.0 * (-y2 / (-(rb + y3b) * cot_b2 + y1)).atan();

    let n1 = 1.0 - 2.0 * nu;
    let c4 = 1.0 / (4.0 * PI * (1.0 - nu));

    let v1cb1 = b1 * c4
        * (-2.0 * (1.0 - nu) * n1 * fib * cot_b * cot_b
            + n1 * y2 / (rb + y3b)
                * ((n1 - a / rb) * cot_b - y1 / (rb + y3b) * (nu + a / rb))
            + n1 * y2 * cos_b * cot_b / (rb + z3b) * (cos_b + a / rb)
            + a * y2 * (y3b - a) * cot_b / rb3
            + y2 * (y3b - a) / (rb * (rb + y3b))
                * (-n1 * cot_b + y1 / (rb + y3b) * (2.0 * nu + a / rb) + a * y1 / rb2)
            + y2 * (y3b - a) / (rb * (rb + z3b))
                * (cos_b / (rb + z3b)
                    * ((rb * cos_b + y3b) * (n1 * cos_b - a / rb) * cot_b
                        + 2.0 * (1.0 - nu) * (rb * sin_b - y1) * cos_b)
                    - a * y3b * cos_b * cot_b / rb2));

    let v2cb1 = b1 * c4
        * (n1
            * ((2.0 * (1.0 - nu) * cot_b * cot_b - nu) * (rb + y3b).ln()
                - (2.0 * (1.0 - nu) * cot_b * cot_b + n1) * cos_b * (rb + z3b).ln())
            - n1 / (rb + y3b)
                * (y1 * cot_b * (n1 - a / rb) + nu * y3b - a
                    + y2 * y2 / (rb + y3b) * (nu + a / rb))
            - n1 * z1b * cot_b / (rb + z3b) * (cos_b + a / rb)
            - a * y1 * (y3b - a) * cot_b / rb3
            + (y3b - a) / (rb + y3b)
                * (-2.0 * nu
                    + 1.0 / rb * (n1 * y1 * cot_b - a)
                    + y2 * y2 / (rb * (rb + y3b)) * (2.0 * nu + a / rb)
                    + a * y2 * y2 / rb3)
            + (y3b - a) / (rb + z3b)
                * (cos_b * cos_b
                    - 1.0 / rb * (n1 * z1b * cot_b + a * cos_b)
                    + a * y3b * z1b * cot_b / rb3
                    - 1.0 / (rb * (rb + z3b))
                        * (y2 * y2 * cos_b * cos_b
                            - a * z1b * cot_b / rb * (rb * cos_b + y3b))));

    let v3cb1 = b1 * c4
        * (2.0 * (1.0 - nu)
            * (n1 * fib * cot_b + y2 / (rb + y3b) * (2.0 * nu + a / rb)
                - y2 * cos_b / (rb + z3b) * (cos_b + a / rb))
            + y2 * (y3b - a) / rb * (2.0 * nu / (rb + y3b) + a / rb2)
            + y2 * (y3b - a) * cos_b / (rb * (rb + z3b))
                * (1.0 - 2.0 * nu
                    - (rb * cos_b + y3b) / (rb + z3b) * (cos_b + a / rb)
                    - a * y3b / rb2));

    let v1cb2 = b2 * c4
        * (n1
            * ((2.0 * (1.0 - nu) * cot_b * cot_b + nu) * (rb + y3b).ln()
                - (2.0 * (1.0 - nu) * cot_b * cot_b + 1.0) * cos_b * (rb + z3b).ln())
            + n1 / (rb + y3b)
                * (-n1 * y1 * cot_b + nu * y3b - a
                    + a * y1 * cot_b / rb
                    + y1 * y1 / (rb + y3b) * (nu + a / rb))
            - n1 * cot_b / (rb + z3b) * (z1b * cos_b - a * (rb * sin_b - y1) / (rb * cos_b))
            - a * y1 * (y3b - a) * cot_b / rb3
            + (y3b - a) / (rb + y3b)
                * (2.0 * nu + 1.0 / rb * (n1 * y1 * cot_b + a)
                    - y1 * y1 / (rb * (rb + y3b)) * (2.0 * nu + a / rb)
                    - a * y1 * y1 / rb3)
            + (y3b - a) * cot_b / (rb + z3b)
                * (-cos_b * sin_b
                    + a * y1 * y3b / (rb3 * cos_b)
                    + (rb * sin_b - y1) / rb
                        * (2.0 * (1.0 - nu) * cos_b
                            - (rb * cos_b + y3b) / (rb + z3b) * (1.0 + a / (rb * cos_b)))));

    let v2cb2 = b2 * c4
        * (2.0 * (1.0 - nu) * n1 * fib * cot_b * cot_b
            + n1 * y2 / (rb + y3b)
                * (-(n1 - a / rb) * cot_b + y1 / (rb + y3b) * (nu + a / rb))
            - n1 * y2 * cot_b / (rb + z3b) * (1.0 + a / (rb * cos_b))
            - a * y2 * (y3b - a) * cot_b / rb3
            + y2 * (y3b - a) / (rb * (rb + y3b))
                * (n1 * cot_b - 2.0 * nu * y1 / (rb + y3b)
                    - a * y1 / rb * (1.0 / rb + 1.0 / (rb + y3b)))
            + y2 * (y3b - a) * cot_b / (rb * (rb + z3b))
                * (-2.0 * (1.0 - nu) * cos_b
                    + (rb * cos_b + y3b) / (rb + z3b) * (1.0 + a / (rb * cos_b))
                    + a * y3b / (rb2 * cos_b)));

    let v3cb2 = b2 * c4
        * (-2.0 * (1.0 - nu) * n1 * cot_b * ((rb + y3b).ln() - cos_b * (rb + z3b).ln())
            - 2.0 * (1.0 - nu) * y1 / (rb + y3b) * (2.0 * nu + a / rb)
            + 2.0 * (1.0 - nu) * z1b / (rb + z3b) * (cos_b + a / rb)
            + (y3b - a) / rb
                * (n1 * cot_b - 2.0 * nu * y1 / (rb + y3b) - a * y1 / rb2)
            - (y3b - a) / (rb + z3b)
                * (cos_b * sin_b
                    + (rb * cos_b + y3b) * cot_b / rb
                        * (2.0 * (1.0 - nu) * cos_b - (rb * cos_b + y3b) / (rb + z3b))
                    + a / rb
                        * (sin_b - y3b * z1b / rb2
                            - z1b * (rb * cos_b + y3b) / (rb * (rb + z3b)))));

    let v1cb3 = b3 * c4
        * (n1
            * (y2 / (rb + y3b) * (1.0 + a / rb)
                - y2 * cos_b / (rb + z3b) * (cos_b + a / rb))
            - y2 * (y3b - a) / rb * (a / rb2 + 1.0 / (rb + y3b))
            + y2 * (y3b - a) * cos_b / (rb * (rb + z3b))
                * ((rb * cos_b + y3b) / (rb + z3b) * (cos_b + a / rb) + a * y3b / rb2));

    let v2cb3 = b3 * c4
        * (n1
            * (-sin_b * (rb + z3b).ln() - y1 / (rb + y3b) * (1.0 + a / rb)
                + z1b / (rb + z3b) * (cos_b + a / rb))
            + y1 * (y3b - a) / rb * (a / rb2 + 1.0 / (rb + y3b))
            - (y3b - a) / (rb + z3b)
                * (sin_b * (cos_b - a / rb)
                    + z1b / rb * (1.0 + a * y3b / rb2)
                    - 1.0 / (rb * (rb + z3b))
                        * (y2 * y2 * cos_b * sin_b
                            - a * z1b / rb * (rb * cos_b + y3b))));

    let v3cb3 = b3 * c4
        * (2.0 * (1.0 - nu) * fib
            + 2.0 * (1.0 - nu) * y2 * sin_b / (rb + z3b) * (cos_b + a / rb)
            + y2 * (y3b - a) * sin_b / (rb * (rb + z3b))
                * (1.0 + (rb * cos_b + y3b) / (rb + z3b) * (cos_b + a / rb)
                    + a * y3b / rb2));

    Vec3::new(v1cb1 + v1cb2 + v1cb3, v2cb1 + v2cb2 + v2cb3, v3cb1 + v3cb2 + v3cb3)
}
