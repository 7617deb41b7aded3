//! Angular dislocation primitives in an elastic full space.
//!
//! An angular dislocation is the elementary solution from which the
//! triangular element is superposed: each triangle is the sum of three
//! angular dislocations anchored at its vertices. The displacement
//! returned here is "incomplete": the solid-angle (Burgers function)
//! term of the full triangle is added by the caller, while the strain
//! expressions already carry the Burgers-function derivatives.
//!
//! Coordinates are in the angular dislocation coordinate system (ADCS):
//! x along the dislocation line normal, the dislocation occupying the
//! wedge of angle `alpha` in the y-z plane. Slip components `(bx, by,
//! bz)` are (tensile, along-y shear, along-z shear) in the same frame.

use crate::types::Vec3;

/// Strain components `[exx, eyy, ezz, exy, exz, eyz]` in the ADCS.
pub(crate) type AngStrain = [f64; 6];

/// Displacement of an angular dislocation, without the solid-angle term.
#[allow(clippy::too_many_arguments)]
pub(crate) fn angular_displacement(
    x: f64,
    y: f64,
    z: f64,
    alpha: f64,
    bx: f64,
    by: f64,
    bz: f64,
    nu: f64,
) -> Vec3 {
    let cos_a = alpha.cos();
    let sin_a = alpha.sin();
    let eta = y * cos_a - z * sin_a;
    let zeta = y * sin_a + z * cos_a;
    let r = (x * x + y * y + z * z).sqrt();

    // Keep the logarithm arguments real on the wedge boundary.
    let zeta = zeta.min(r);
    let z = z.min(r);

    let c = 1.0 / (8.0 * std::f64::consts::PI * (1.0 - nu));
    let k = 1.0 - 2.0 * nu;

    let ux = bx * c * (x * y / (r * (r - z)) - x * eta / (r * (r - zeta)));
    let vx = bx
        * c
        * (eta * sin_a / (r - zeta) - y * eta / (r * (r - zeta))
            + y * y / (r * (r - z))
            + k * (cos_a * (r - zeta).ln() - (r - z).ln()));
    let wx = bx
        * c
        * (eta * cos_a / (r - zeta) - y / r - eta * z / (r * (r - zeta))
            - k * sin_a * (r - zeta).ln());

    let uy = by
        * c
        * (x * x * cos_a / (r * (r - zeta)) - x * x / (r * (r - z))
            - k * (cos_a * (r - zeta).ln() - (r - z).ln()));
    let vy = by * x * c
        * (y * cos_a / (r * (r - zeta)) - sin_a * cos_a / (r - zeta) - y / (r * (r - z)));
    let wy = by * x * c
        * (z * cos_a / (r * (r - zeta)) - cos_a * cos_a / (r - zeta) + 1.0 / r);

    let uz = bz * sin_a * c * (k * (r - zeta).ln() - x * x / (r * (r - zeta)));
    let vz = bz * x * sin_a * c * (sin_a / (r - zeta) - y / (r * (r - zeta)));
    let wz = bz * x * sin_a * c * (cos_a / (r - zeta) - z / (r * (r - zeta)));

    Vec3::new(ux + uy + uz, vx + vy + vz, wx + wy + wz)
}

/// Strain of an angular dislocation in a full space.
#[allow(clippy::too_many_arguments)]
pub(crate) fn angular_strain(
    x: f64,
    y: f64,
    z: f64,
    alpha: f64,
    bx: f64,
    by: f64,
    bz: f64,
    nu: f64,
) -> AngStrain {
    use std::f64::consts::PI;

    let sin_a = alpha.sin();
    let cos_a = alpha.cos();
    let eta = y * cos_a - z * sin_a;
    let zeta = y * sin_a + z * cos_a;

    let x2 = x * x;
    let y2 = y * y;
    let z2 = z * z;
    let r2 = x2 + y2 + z2;
    let r = r2.sqrt();
    let r3 = r * r2;
    let rz = r * (r - z);
    let r2z2 = r2 * (r - z) * (r - z);
    let r3z = r3 * (r - z);

    let w = zeta - r;
    let w2 = w * w;
    let wr = w * r;
    let wr3 = w * r3;
    let w2r = w2 * r;
    let w2r2 = w2 * r2;

    let big_c = (r * cos_a - z) / wr;
    let big_s = (r * sin_a - y) / wr;

    // Partial derivatives of the Burgers function.
    let fi_rx = (eta / r / (r - zeta) - y / r / (r - z)) / (4.0 * PI);
    let fi_ry = (x / r / (r - z) - cos_a * x / r / (r - zeta)) / (4.0 * PI);
    let fi_rz = (sin_a * x / r / (r - zeta)) / (4.0 * PI);

    let c8 = 1.0 / (8.0 * PI * (1.0 - nu));
    let k = 2.0 * nu + 1.0;

    let exx = bx * fi_rx
        + bx * c8
            * (eta / wr + eta * x2 / w2r2 - eta * x2 / wr3 + y / rz
                - x2 * y / r2z2
                - x2 * y / r3z)
        - by * x * c8
            * ((k / wr + x2 / w2r2 - x2 / wr3) * cos_a + k / rz - x2 / r2z2 - x2 / r3z)
        + bz * x * sin_a * c8 * (k / wr + x2 / w2r2 - x2 / wr3);

    let eyy = by * fi_ry
        + bx * c8
            * ((1.0 / wr + big_s * big_s - y2 / wr3) * eta + k * y / rz
                - y * y2 / r2z2
                - y * y2 / r3z
                - 2.0 * nu * cos_a * big_s)
        - by * x * c8
            * (1.0 / rz - y2 / r2z2 - y2 / r3z
                + (1.0 / wr + big_s * big_s - y2 / wr3) * cos_a)
        + bz * x * sin_a * c8 * (1.0 / wr + big_s * big_s - y2 / wr3);

    let ezz = bz * fi_rz
        + bx * c8
            * (eta / w / r + eta * big_c * big_c - eta * z2 / wr3 + y * z / r3
                + 2.0 * nu * sin_a * big_c)
        - by * x * c8 * ((1.0 / wr + big_c * big_c - z2 / wr3) * cos_a + z / r3)
        + bz * x * sin_a * c8 * (1.0 / wr + big_c * big_c - z2 / wr3);

    let exy = bx * fi_ry / 2.0 + by * fi_rx / 2.0
        - bx * c8
            * (x * y2 / r2z2 - nu * x / rz + x * y2 / r3z - nu * x * cos_a / wr
                + eta * x * big_s / wr
                + eta * x * y / wr3)
        + by * c8
            * (x2 * y / r2z2 - nu * y / rz + x2 * y / r3z + nu * cos_a * big_s
                + x2 * y * cos_a / wr3
                + x2 * cos_a * big_s / wr)
        - bz * sin_a * c8 * (nu * big_s + x2 * big_s / wr + x2 * y / wr3);

    let exz = bx * fi_rz / 2.0 + bz * fi_rx / 2.0
        - bx * c8
            * (-x * y / r3 + nu * x * sin_a / wr + eta * x * big_c / wr + eta * x * z / wr3)
        + by * c8
            * (-x2 / r3 + nu / r + nu * cos_a * big_c
                + x2 * z * cos_a / wr3
                + x2 * cos_a * big_c / wr)
        - bz * sin_a * c8 * (nu * big_c + x2 * big_c / wr + x2 * z / wr3);

    let eyz = by * fi_rz / 2.0 + bz * fi_ry / 2.0
        + bx * c8
            * (y2 / r3 - nu / r - nu * cos_a * big_c + nu * sin_a * big_s
                - eta * sin_a * cos_a / wr
                - eta * (y * cos_a + z * sin_a) / wr * big_s
                - eta * y * z / wr3)
        - by * x * c8
            * (y / r3 + sin_a * cos_a * cos_a / wr
                - cos_a * (y * cos_a + z * sin_a) / wr * big_s
                - y * z * cos_a / wr3)
        + bz * x * sin_a * c8
            * (y * z / wr3 - sin_a * cos_a / wr + (y * cos_a + z * sin_a) / wr * big_s);

    [exx, eyy, ezz, exy, exz, eyz]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const NU: f64 = 0.25;

    #[test]
    fn test_displacement_linear_in_slip() {
        let (x, y, z) = (0.3, -0.7, 1.1);
        let alpha = -std::f64::consts::PI + 0.9;
        let u1 = angular_displacement(x, y, z, alpha, 1.0, 0.5, -0.2, NU);
        let u2 = angular_displacement(x, y, z, alpha, 2.0, 1.0, -0.4, NU);
        assert_relative_eq!((u2 - u1 * 2.0).norm(), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_strain_matches_displacement_gradient() {
        // Central differences of the incomplete displacement plus the
        // analytic Burgers-function derivatives must reproduce the strain
        // expressions at a generic off-wedge point.
        let (x, y, z) = (0.41, -0.63, 0.87);
        let alpha = -std::f64::consts::PI + 1.1;
        let (bx, by, bz) = (0.7, -0.3, 0.5);
        let h = 1e-6;

        // The incomplete displacement omits b*Fi; its contribution to the
        // gradient is b_i * dFi/dx_j, available in closed form below.
        let fi_grad = |x: f64, y: f64, z: f64| {
            let cos_a = alpha.cos();
            let sin_a = alpha.sin();
            let eta = y * cos_a - z * sin_a;
            let zeta = y * sin_a + z * cos_a;
            let r = (x * x + y * y + z * z).sqrt();
            let p = 4.0 * std::f64::consts::PI;
            [
                (eta / r / (r - zeta) - y / r / (r - z)) / p,
                (x / r / (r - z) - cos_a * x / r / (r - zeta)) / p,
                (sin_a * x / r / (r - zeta)) / p,
            ]
        };

        let mut grad = [[0.0_f64; 3]; 3];
        for j in 0..3 {
            let mut dp = [x, y, z];
            let mut dm = [x, y, z];
            dp[j] += h;
            dm[j] -= h;
            let up = angular_displacement(dp[0], dp[1], dp[2], alpha, bx, by, bz, NU);
            let um = angular_displacement(dm[0], dm[1], dm[2], alpha, bx, by, bz, NU);
            for i in 0..3 {
                grad[i][j] = (up[i] - um[i]) / (2.0 * h);
            }
        }
        let fg = fi_grad(x, y, z);
        let b = [bx, by, bz];
        for i in 0..3 {
            for j in 0..3 {
                grad[i][j] += b[i] * fg[j];
            }
        }

        let e = angular_strain(x, y, z, alpha, bx, by, bz, NU);
        let e_fd = [
            grad[0][0],
            grad[1][1],
            grad[2][2],
            0.5 * (grad[0][1] + grad[1][0]),
            0.5 * (grad[0][2] + grad[2][0]),
            0.5 * (grad[1][2] + grad[2][1]),
        ];
        for i in 0..6 {
            assert_relative_eq!(e[i], e_fd[i], epsilon = 1e-7, max_relative = 1e-5);
        }
    }
}
