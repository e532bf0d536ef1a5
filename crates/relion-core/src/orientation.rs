//! Orientation math contract and the RELION Euler convention.

/// Rotation building and vector angle measurement.
///
/// The three angles follow the RELION column order: rotation, tilt, psi.
pub trait OrientationModel {
    /// Rotation matrix for the given Euler angles.
    fn rotation_matrix(&self, rot: f64, tilt: f64, psi: f64, degrees: bool) -> [[f64; 3]; 3];

    /// Angle between two vectors in radians.
    fn angle_between(&self, a: [f64; 3], b: [f64; 3]) -> f64;
}

/// The ZYZ Euler convention RELION uses for particle orientations.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelionAngles;

impl OrientationModel for RelionAngles {
    fn rotation_matrix(&self, rot: f64, tilt: f64, psi: f64, degrees: bool) -> [[f64; 3]; 3] {
        let (rot, tilt, psi) = if degrees {
            (rot.to_radians(), tilt.to_radians(), psi.to_radians())
        } else {
            (rot, tilt, psi)
        };
        let (ca, sa) = (rot.cos(), rot.sin());
        let (cb, sb) = (tilt.cos(), tilt.sin());
        let (cg, sg) = (psi.cos(), psi.sin());
        [
            [cg * cb * ca - sg * sa, cg * cb * sa + sg * ca, -cg * sb],
            [-sg * cb * ca - cg * sa, -sg * cb * sa + cg * ca, sg * sb],
            [sb * ca, sb * sa, cb],
        ]
    }

    fn angle_between(&self, a: [f64; 3], b: [f64; 3]) -> f64 {
        let na = (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt();
        let nb = (b[0] * b[0] + b[1] * b[1] + b[2] * b[2]).sqrt();
        if na == 0.0 || nb == 0.0 {
            return 0.0;
        }
        let dot = (a[0] * b[0] + a[1] * b[1] + a[2] * b[2]) / (na * nb);
        dot.clamp(-1.0, 1.0).acos()
    }
}

pub fn transpose(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    [
        [m[0][0], m[1][0], m[2][0]],
        [m[0][1], m[1][1], m[2][1]],
        [m[0][2], m[1][2], m[2][2]],
    ]
}

pub fn apply(m: &[[f64; 3]; 3], v: [f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}
