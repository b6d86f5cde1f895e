use glam::{Mat4, Vec3, Vec4};

/// Matrix product `a * b`: applies `b` first, then `a`.
pub fn multiply(a: &Mat4, b: &Mat4) -> Mat4 {
    *a * *b
}

/// Multiply a column vector by `m`.
pub fn transform(m: &Mat4, v: Vec4) -> Vec4 {
    *m * v
}

/// Translation by `offset`.
pub fn translate(offset: Vec3) -> Mat4 {
    Mat4::from_cols(
        Vec4::X,
        Vec4::Y,
        Vec4::Z,
        Vec4::new(offset.x, offset.y, offset.z, 1.0),
    )
}

/// Counter-clockwise rotation of `angle` radians about the unit vector `axis`
/// (Rodrigues' formula).
pub fn rotate(axis: Vec3, angle: f32) -> Mat4 {
    let (s, c) = angle.sin_cos();
    let i = 1.0 - c;
    let Vec3 { x, y, z } = axis;
    Mat4::from_cols(
        Vec4::new(i * x * x + c, i * x * y + z * s, i * x * z - y * s, 0.0),
        Vec4::new(i * x * y - z * s, i * y * y + c, i * y * z + x * s, 0.0),
        Vec4::new(i * x * z + y * s, i * y * z - x * s, i * z * z + c, 0.0),
        Vec4::W,
    )
}

/// Right-handed perspective projection with depth in `[0, 1]`.
///
/// `fov` is the vertical field of view in radians.
pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let f = 1.0 / (fov * 0.5).tan();
    let range = near - far;
    Mat4::from_cols(
        Vec4::new(f / aspect, 0.0, 0.0, 0.0),
        Vec4::new(0.0, f, 0.0, 0.0),
        Vec4::new(0.0, 0.0, far / range, -1.0),
        Vec4::new(0.0, 0.0, near * far / range, 0.0),
    )
}

/// Right-handed orthographic projection with depth in `[0, 1]`.
pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let width = right - left;
    let height = top - bottom;
    let range = near - far;
    Mat4::from_cols(
        Vec4::new(2.0 / width, 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 / height, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0 / range, 0.0),
        Vec4::new(
            -(right + left) / width,
            -(top + bottom) / height,
            near / range,
            1.0,
        ),
    )
}

/// General inverse by cofactor expansion.
///
/// The determinant is not checked: a singular input yields non-finite
/// entries. View-projection matrices of a non-degenerate camera are always
/// invertible.
pub fn inverse(m: &Mat4) -> Mat4 {
    let a = m.to_cols_array_2d();

    // 2×2 minors of the first two and last two columns.
    let s0 = a[0][0] * a[1][1] - a[1][0] * a[0][1];
    let s1 = a[0][0] * a[1][2] - a[1][0] * a[0][2];
    let s2 = a[0][0] * a[1][3] - a[1][0] * a[0][3];
    let s3 = a[0][1] * a[1][2] - a[1][1] * a[0][2];
    let s4 = a[0][1] * a[1][3] - a[1][1] * a[0][3];
    let s5 = a[0][2] * a[1][3] - a[1][2] * a[0][3];

    let c5 = a[2][2] * a[3][3] - a[3][2] * a[2][3];
    let c4 = a[2][1] * a[3][3] - a[3][1] * a[2][3];
    let c3 = a[2][1] * a[3][2] - a[3][1] * a[2][2];
    let c2 = a[2][0] * a[3][3] - a[3][0] * a[2][3];
    let c1 = a[2][0] * a[3][2] - a[3][0] * a[2][2];
    let c0 = a[2][0] * a[3][1] - a[3][0] * a[2][1];

    let det = s0 * c5 - s1 * c4 + s2 * c3 + s3 * c2 - s4 * c1 + s5 * c0;
    let inv = 1.0 / det;

    #[rustfmt::skip]
    let b = [
        [
            ( a[1][1] * c5 - a[1][2] * c4 + a[1][3] * c3) * inv,
            (-a[0][1] * c5 + a[0][2] * c4 - a[0][3] * c3) * inv,
            ( a[3][1] * s5 - a[3][2] * s4 + a[3][3] * s3) * inv,
            (-a[2][1] * s5 + a[2][2] * s4 - a[2][3] * s3) * inv,
        ],
        [
            (-a[1][0] * c5 + a[1][2] * c2 - a[1][3] * c1) * inv,
            ( a[0][0] * c5 - a[0][2] * c2 + a[0][3] * c1) * inv,
            (-a[3][0] * s5 + a[3][2] * s2 - a[3][3] * s1) * inv,
            ( a[2][0] * s5 - a[2][2] * s2 + a[2][3] * s1) * inv,
        ],
        [
            ( a[1][0] * c4 - a[1][1] * c2 + a[1][3] * c0) * inv,
            (-a[0][0] * c4 + a[0][1] * c2 - a[0][3] * c0) * inv,
            ( a[3][0] * s4 - a[3][1] * s2 + a[3][3] * s0) * inv,
            (-a[2][0] * s4 + a[2][1] * s2 - a[2][3] * s0) * inv,
        ],
        [
            (-a[1][0] * c3 + a[1][1] * c1 - a[1][2] * c0) * inv,
            ( a[0][0] * c3 - a[0][1] * c1 + a[0][2] * c0) * inv,
            (-a[3][0] * s3 + a[3][1] * s1 - a[3][2] * s0) * inv,
            ( a[2][0] * s3 - a[2][1] * s1 + a[2][2] * s0) * inv,
        ],
    ];
    Mat4::from_cols_array_2d(&b)
}

/// Map a normalized-device point back to world space through an inverse
/// view-projection, including the perspective divide.
pub fn unproject(inverse: &Mat4, ndc: Vec3) -> Vec3 {
    let p = transform(inverse, ndc.extend(1.0));
    p.truncate() / p.w
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    fn assert_mat_near(a: &Mat4, b: &Mat4, eps: f32) {
        let (a, b) = (a.to_cols_array(), b.to_cols_array());
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert!((x - y).abs() <= eps, "element {i}: {x} vs {y}");
        }
    }

    #[test]
    fn translate_moves_points() {
        let m = translate(Vec3::new(1.0, -2.0, 3.0));
        let p = transform(&m, Vec4::new(4.0, 4.0, 4.0, 1.0));
        assert_eq!(p, Vec4::new(5.0, 2.0, 7.0, 1.0));
        // Directions are unaffected.
        let d = transform(&m, Vec4::new(1.0, 0.0, 0.0, 0.0));
        assert_eq!(d, Vec4::new(1.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn rotate_matches_axis_angle() {
        let axis = Vec3::new(1.0, 2.0, -0.5).normalize();
        for angle in [-2.5f32, -0.3, 0.0, 0.7, 1.9, std::f32::consts::PI] {
            assert_mat_near(&rotate(axis, angle), &Mat4::from_axis_angle(axis, angle), EPSILON);
        }
    }

    #[test]
    fn rotate_quarter_turn_about_y() {
        let m = rotate(Vec3::Y, std::f32::consts::FRAC_PI_2);
        let p = transform(&m, Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert!((p - Vec4::new(0.0, 0.0, -1.0, 1.0)).abs().max_element() < EPSILON);
    }

    #[test]
    fn perspective_matches_glam() {
        let expected = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 1.0, 1000.0);
        assert_mat_near(
            &perspective(60f32.to_radians(), 16.0 / 9.0, 1.0, 1000.0),
            &expected,
            EPSILON,
        );
    }

    #[test]
    fn perspective_maps_near_and_far_to_unit_depth() {
        let m = perspective(1.0, 1.5, 2.0, 500.0);
        let near = transform(&m, Vec4::new(0.0, 0.0, -2.0, 1.0));
        let far = transform(&m, Vec4::new(0.0, 0.0, -500.0, 1.0));
        assert!((near.z / near.w).abs() < EPSILON);
        assert!((far.z / far.w - 1.0).abs() < EPSILON);
    }

    #[test]
    fn ortho_matches_glam() {
        let expected = Mat4::orthographic_rh(-256.0, 256.0, -144.0, 144.0, -1000.0, 1000.0);
        assert_mat_near(
            &ortho(-256.0, 256.0, -144.0, 144.0, -1000.0, 1000.0),
            &expected,
            EPSILON,
        );
    }

    #[test]
    fn screen_ortho_maps_corners() {
        let m = ortho(0.0, 512.0, 0.0, 288.0, -1.0, 1.0);
        let corner = transform(&m, Vec4::new(512.0, 288.0, 0.0, 1.0));
        assert!((corner.x - 1.0).abs() < EPSILON);
        assert!((corner.y - 1.0).abs() < EPSILON);
        let origin = transform(&m, Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert!((origin.x + 1.0).abs() < EPSILON);
        assert!((origin.y + 1.0).abs() < EPSILON);
    }

    #[test]
    fn inverse_of_rigid_transform_is_identity() {
        let rigid = multiply(
            &translate(Vec3::new(12.0, -3.5, 40.0)),
            &multiply(
                &rotate(Vec3::Y, 0.8),
                &rotate(Vec3::new(0.6, 0.0, 0.8), -1.1),
            ),
        );
        assert_mat_near(&multiply(&inverse(&rigid), &rigid), &Mat4::IDENTITY, EPSILON);
        assert_mat_near(&multiply(&rigid, &inverse(&rigid)), &Mat4::IDENTITY, EPSILON);
    }

    #[test]
    fn inverse_matches_glam_for_view_projection() {
        let view = multiply(
            &rotate(Vec3::X, 0.785),
            &translate(Vec3::new(-10.0, -350.0, -350.0)),
        );
        let vp = multiply(&perspective(1.047, 512.0 / 288.0, 1.0, 1000.0), &view);
        let ours = inverse(&vp);
        let reference = vp.inverse();
        for (x, y) in ours.to_cols_array().iter().zip(reference.to_cols_array().iter()) {
            assert!((x - y).abs() <= 1e-3 * y.abs().max(1.0), "{x} vs {y}");
        }
    }

    #[test]
    fn inverse_of_singular_matrix_is_not_finite() {
        let singular = Mat4::from_cols(Vec4::X, Vec4::X, Vec4::Z, Vec4::W);
        assert!(!inverse(&singular).is_finite());
    }

    #[test]
    fn unproject_reverses_projection() {
        let vp = multiply(
            &perspective(1.0, 1.0, 1.0, 100.0),
            &translate(Vec3::new(0.0, 0.0, -10.0)),
        );
        let world = Vec3::new(1.5, -2.0, -20.0);
        let clip = transform(&vp, world.extend(1.0));
        let ndc = clip.truncate() / clip.w;
        let back = unproject(&inverse(&vp), ndc);
        assert!((back - world).abs().max_element() < 1e-3);
    }
}
