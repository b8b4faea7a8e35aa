//! Attitude conversions between Euler angles, quaternions and rotation matrices.
//!
//! Euler angles follow the fixed-axis XYZ convention: the body is rotated about the
//! reference x axis by roll, then about the reference y axis by pitch, then about the
//! reference z axis by yaw, i.e. `R = Rz(yaw) * Ry(pitch) * Rx(roll)`.
//! Quaternions are `(w, x, y, z)` with the scalar part first.
use nalgebra::{Matrix3, Quaternion};

/// Converts fixed-axis XYZ Euler angles to a unit quaternion
/// # Arguments
/// * `roll` - Rotation about the x axis in radians
/// * `pitch` - Rotation about the y axis in radians
/// * `yaw` - Rotation about the z axis in radians
/// # Returns
/// * The quaternion `(w, x, y, z)`
/// # Example
/// ```
/// use flight_replay::attitude::euler_to_quaternion;
/// let q = euler_to_quaternion(0.0, 0.0, 0.0);
/// assert_eq!((q.w, q.i, q.j, q.k), (1.0, 0.0, 0.0, 0.0));
/// ```
pub fn euler_to_quaternion(roll: f64, pitch: f64, yaw: f64) -> Quaternion<f64> {
    let (sg, cg) = (roll / 2.0).sin_cos();
    let (sb, cb) = (pitch / 2.0).sin_cos();
    let (sa, ca) = (yaw / 2.0).sin_cos();
    Quaternion::new(
        cg * cb * ca + sg * sb * sa,
        sg * cb * ca - cg * sb * sa,
        cg * sb * ca + sg * cb * sa,
        cg * cb * sa - sg * sb * ca,
    )
}

/// Converts a unit quaternion to a rotation matrix
/// # Arguments
/// * `q` - A unit quaternion; the result is not a rotation for other inputs
/// # Returns
/// * The 3x3 rotation matrix mapping body-frame vectors into the reference frame
pub fn quaternion_to_rotation_matrix(q: &Quaternion<f64>) -> Matrix3<f64> {
    let (q0, q1, q2, q3) = (q.w, q.i, q.j, q.k);
    Matrix3::new(
        q0 * q0 + q1 * q1 - q2 * q2 - q3 * q3,
        2.0 * (q1 * q2 - q0 * q3),
        2.0 * (q1 * q3 + q0 * q2),
        2.0 * (q1 * q2 + q0 * q3),
        q0 * q0 - q1 * q1 + q2 * q2 - q3 * q3,
        2.0 * (q2 * q3 - q0 * q1),
        2.0 * (q1 * q3 - q0 * q2),
        2.0 * (q2 * q3 + q0 * q1),
        q0 * q0 - q1 * q1 - q2 * q2 + q3 * q3,
    )
}

/// Recovers a quaternion from a rotation matrix
///
/// Component magnitudes come from the diagonal. The largest one is taken as pivot with a
/// positive sign and the others are solved from the off-diagonal terms, so `q` and `-q`
/// are never distinguished. Used for diagnostics only.
/// # Arguments
/// * `r` - An orthogonal matrix with determinant 1
/// # Returns
/// * A unit quaternion reproducing `r`, up to global sign
pub fn rotation_matrix_to_quaternion(r: &Matrix3<f64>) -> Quaternion<f64> {
    let (r00, r11, r22) = (r[(0, 0)], r[(1, 1)], r[(2, 2)]);
    let magnitudes = [
        0.5 * (1.0 + r00 + r11 + r22).max(0.0).sqrt(),
        0.5 * (1.0 + r00 - r11 - r22).max(0.0).sqrt(),
        0.5 * (1.0 - r00 + r11 - r22).max(0.0).sqrt(),
        0.5 * (1.0 - r00 - r11 + r22).max(0.0).sqrt(),
    ];
    let pivot = (0..4)
        .max_by(|&a, &b| magnitudes[a].total_cmp(&magnitudes[b]))
        .unwrap_or(0);
    let m = magnitudes[pivot];
    let d = 4.0 * m;
    let w_x = r[(2, 1)] - r[(1, 2)];
    let w_y = r[(0, 2)] - r[(2, 0)];
    let w_z = r[(1, 0)] - r[(0, 1)];
    let x_y = r[(0, 1)] + r[(1, 0)];
    let x_z = r[(0, 2)] + r[(2, 0)];
    let y_z = r[(1, 2)] + r[(2, 1)];
    match pivot {
        0 => Quaternion::new(m, w_x / d, w_y / d, w_z / d),
        1 => Quaternion::new(w_x / d, m, x_y / d, x_z / d),
        2 => Quaternion::new(w_y / d, x_y / d, m, y_z / d),
        _ => Quaternion::new(w_z / d, x_z / d, y_z / d, m),
    }
}

/// Builds the rotation matrix `Rz(yaw) * Ry(pitch) * Rx(roll)` directly
/// # Arguments
/// * `roll` - Rotation about the x axis in radians
/// * `pitch` - Rotation about the y axis in radians
/// * `yaw` - Rotation about the z axis in radians
/// # Returns
/// * The 3x3 rotation matrix
pub fn euler_to_rotation_matrix(roll: f64, pitch: f64, yaw: f64) -> Matrix3<f64> {
    let (sg, cg) = roll.sin_cos();
    let (sb, cb) = pitch.sin_cos();
    let (sa, ca) = yaw.sin_cos();
    Matrix3::new(
        ca * cb,
        ca * sb * sg - sa * cg,
        ca * sb * cg + sa * sg,
        sa * cb,
        sa * sb * sg + ca * cg,
        sa * sb * cg - ca * sg,
        -sb,
        cb * sg,
        cb * cg,
    )
}

/// Tests for the all-zero quaternion.
///
/// Logs write `(0, 0, 0, 0)` when the quaternion was not populated. It is never a valid
/// rotation, so it is safe to use as a magic "not logged" value.
pub fn is_zero_quaternion(q: &Quaternion<f64>) -> bool {
    q.coords.iter().all(|c| *c == 0.0)
}
