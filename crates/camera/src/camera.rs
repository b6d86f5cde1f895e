use glam::{Mat4, Vec2, Vec3};
use tilescape_common::{FIELD_OF_VIEW_DEGREES, GroundRect, MODEL_MAX_HEIGHT};
use tilescape_kernel::{inverse, multiply, ortho, perspective, rotate, translate, unproject};

/// How the camera projects view space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    /// Perspective view of the world; the only kind that supports unprojection.
    Perspective,
    /// Screen-space overlay covering `[0, width] × [0, height]`.
    Ortho2d,
    /// Parallel projection of the world (shadow/sun views).
    Ortho3d,
}

/// Screen corners in NDC. Top corners are cut at the ground, bottom corners
/// at the tallest model top.
const CORNERS: [Vec2; 4] = [
    Vec2::new(-1.0, 1.0),
    Vec2::new(-1.0, -1.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(1.0, -1.0),
];

/// Camera hovering at a fixed height, looking down at `pitch` and turned by `yaw`.
///
/// Mutations (`set_target`, `set_viewport`) only take effect on the next
/// `update()`, which eases the position toward the target and rebuilds every
/// derived matrix.
#[derive(Debug, Clone)]
pub struct Camera {
    kind: ProjectionKind,
    position: Vec3,
    target: Vec2,
    pitch: f32,
    yaw: f32,
    viewport: Vec2,
    fov: f32,
    near: f32,
    far: f32,
    smoothing: f32,
    max_height: f32,
    view: Mat4,
    projection: Mat4,
    combined: Mat4,
    inverse: Mat4,
    corners: [Vec2; 4],
}

impl Camera {
    /// Create a camera at the origin, `height` units above the ground.
    ///
    /// `smoothing` is the fraction of the remaining distance to the target
    /// covered by each `update()`; 1.0 snaps immediately.
    ///
    /// A perspective camera must look down far enough that the top edge of
    /// the screen stays below the horizon.
    pub fn new(
        kind: ProjectionKind,
        height: f32,
        viewport: Vec2,
        pitch: f32,
        yaw: f32,
        smoothing: f32,
    ) -> Self {
        let fov = FIELD_OF_VIEW_DEGREES.to_radians();
        if kind == ProjectionKind::Perspective {
            assert!(
                -std::f32::consts::FRAC_PI_2 < pitch && pitch < -fov / 2.0,
                "pitch must keep the horizon above the screen"
            );
        }
        Self {
            kind,
            position: Vec3::new(0.0, height, 0.0),
            target: Vec2::ZERO,
            pitch,
            yaw,
            viewport,
            fov,
            near: 1.0,
            far: 1000.0,
            smoothing,
            max_height: MODEL_MAX_HEIGHT,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            combined: Mat4::IDENTITY,
            inverse: Mat4::IDENTITY,
            corners: [Vec2::ZERO; 4],
        }
    }

    /// Ease toward the target and recompute every derived matrix.
    pub fn update(&mut self) {
        let (width, height) = (self.viewport.x, self.viewport.y);
        if self.kind == ProjectionKind::Ortho2d {
            self.view = Mat4::IDENTITY;
            self.projection = ortho(0.0, width, 0.0, height, -1.0, 1.0);
            self.combined = self.projection;
            return;
        }

        self.position.x += (self.target.x - self.position.x) * self.smoothing;
        self.position.z += (self.target.y - self.position.z) * self.smoothing;

        let (s, c) = self.yaw.sin_cos();
        let right = Vec3::new(c, 0.0, s);
        let pitched = multiply(&rotate(right, -self.pitch), &translate(-self.position));
        self.view = multiply(&rotate(Vec3::Y, self.yaw), &pitched);

        self.projection = if self.kind == ProjectionKind::Perspective {
            perspective(self.fov, width / height, self.near, self.far)
        } else {
            ortho(
                -width / 2.0,
                width / 2.0,
                -height / 2.0,
                height / 2.0,
                -self.far,
                self.far,
            )
        };
        self.combined = multiply(&self.projection, &self.view);

        if self.kind != ProjectionKind::Perspective {
            return;
        }
        self.inverse = inverse(&self.combined);
        self.corners = CORNERS.map(|ndc| {
            let plane = if ndc.y < 0.0 { self.max_height } else { 0.0 };
            self.project(ndc, plane)
        });
    }

    /// Aim the camera so that it centres on the ground point `(x, z)`.
    ///
    /// For a perspective camera the target position is set back along the
    /// view direction so the centre ray meets the ground at `(x, z)`.
    pub fn set_target(&mut self, x: f32, z: f32) {
        if self.kind == ProjectionKind::Perspective {
            let h = self.position.y / self.pitch.tan();
            let (s, c) = self.yaw.sin_cos();
            self.target = Vec2::new(x + h * s, z - h * c);
        } else {
            self.target = Vec2::new(x, z);
        }
    }

    /// Move straight to the target without smoothing. Matrices still need `update()`.
    pub fn jump_to_target(&mut self) {
        self.position.x = self.target.x;
        self.position.z = self.target.y;
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        assert!(width > 0.0, "viewport width must be positive");
        assert!(height > 0.0, "viewport height must be positive");
        tracing::debug!(width, height, "camera viewport resized");
        self.viewport = Vec2::new(width, height);
    }

    /// Height of the tallest model, used to extend the visible area so
    /// models standing just off the bottom edge stay loaded.
    pub fn set_max_height(&mut self, max_height: f32) {
        assert!(
            (0.0..self.position.y).contains(&max_height),
            "max_height must lie below the camera"
        );
        self.max_height = max_height;
    }

    /// Unit forward direction for the current pitch and yaw.
    pub fn forward(&self) -> Vec3 {
        let c = self.pitch.cos();
        let heading = self.yaw - 90f32.to_radians();
        Vec3::new(heading.cos() * c, self.pitch.sin(), heading.sin() * c)
    }

    /// Unproject a normalized-device point onto the horizontal plane at height `y`.
    ///
    /// The ray runs from the near plane to the far plane through `ndc`; the
    /// returned value holds the world x and z where it crosses the plane.
    /// Only valid for perspective cameras, after `update()`.
    pub fn project(&self, ndc: Vec2, y: f32) -> Vec2 {
        assert_eq!(
            self.kind,
            ProjectionKind::Perspective,
            "project requires a perspective camera"
        );
        let near = unproject(&self.inverse, ndc.extend(0.0));
        let far = unproject(&self.inverse, ndc.extend(1.0));
        let direction = far - near;
        let t = (y - near.y) / direction.y;
        Vec2::new(near.x + t * direction.x, near.z + t * direction.z)
    }

    /// Axis-aligned ground rectangle enclosing the visible area computed by
    /// the last `update()`. Only valid for perspective cameras.
    pub fn bounds(&self) -> GroundRect {
        assert_eq!(
            self.kind,
            ProjectionKind::Perspective,
            "bounds requires a perspective camera"
        );
        GroundRect::enclosing(&self.corners)
    }

    /// Convert a window pixel position to normalized device coordinates (y up).
    pub fn screen_to_ndc(pixel: Vec2, window: Vec2) -> Vec2 {
        Vec2::new(
            2.0 * pixel.x / window.x - 1.0,
            1.0 - 2.0 * pixel.y / window.y,
        )
    }

    pub fn kind(&self) -> ProjectionKind {
        self.kind
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Target position on the x/z plane.
    pub fn target(&self) -> Vec2 {
        self.target
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    pub fn projection(&self) -> &Mat4 {
        &self.projection
    }

    /// Projection × view: world space to clip space.
    pub fn combined(&self) -> &Mat4 {
        &self.combined
    }

    /// Inverse of the combined matrix (perspective only).
    pub fn inverse(&self) -> &Mat4 {
        &self.inverse
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    fn perspective_camera(pitch_deg: f32, yaw_deg: f32) -> Camera {
        Camera::new(
            ProjectionKind::Perspective,
            100.0,
            Vec2::new(512.0, 288.0),
            pitch_deg.to_radians(),
            yaw_deg.to_radians(),
            1.0,
        )
    }

    fn to_ndc(camera: &Camera, world: Vec3) -> Vec3 {
        let clip = *camera.combined() * world.extend(1.0);
        clip.truncate() / clip.w
    }

    #[test]
    fn forward_points_down_and_ahead() {
        let cam = perspective_camera(-45.0, 0.0);
        let f = cam.forward();
        assert!((f.length() - 1.0).abs() < 1e-5);
        assert!(f.x.abs() < 1e-5);
        assert!((f.y + 45f32.to_radians().sin()).abs() < 1e-5);
        assert!(f.z < 0.0);
    }

    #[test]
    fn forward_follows_yaw() {
        let cam = perspective_camera(-40.0, 90.0);
        let f = cam.forward();
        assert!(f.x > 0.8);
        assert!(f.z.abs() < 1e-5);
    }

    #[test]
    fn view_looks_along_forward() {
        let mut cam = perspective_camera(-45.0, 30.0);
        cam.set_target(20.0, -40.0);
        cam.update();
        let ahead = cam.position() + cam.forward() * 50.0;
        let eye_space = *cam.view() * ahead.extend(1.0);
        assert!(eye_space.x.abs() < 1e-3);
        assert!(eye_space.y.abs() < 1e-3);
        assert!((eye_space.z + 50.0).abs() < 1e-3);
    }

    #[test]
    fn target_centres_ground_point() {
        let mut cam = perspective_camera(-45.0, 0.0);
        cam.set_target(0.0, 0.0);
        cam.update();
        // Looking down 45° from height 100 puts the camera 100 units behind.
        assert!((cam.position() - Vec3::new(0.0, 100.0, 100.0)).length() < 1e-3);
        let centre = cam.project(Vec2::ZERO, 0.0);
        assert!(centre.length() < 1e-2, "centre ray hit {centre}");
    }

    #[test]
    fn target_centres_ground_point_with_yaw() {
        let mut cam = perspective_camera(-60.0, -35.0);
        cam.set_target(48.0, -16.0);
        cam.update();
        let centre = cam.project(Vec2::ZERO, 0.0);
        assert!((centre - Vec2::new(48.0, -16.0)).length() < 1e-2, "hit {centre}");
    }

    #[test]
    fn position_eases_toward_target() {
        let mut cam = Camera::new(
            ProjectionKind::Ortho3d,
            10.0,
            Vec2::new(100.0, 100.0),
            -1.0,
            0.0,
            0.25,
        );
        cam.set_target(100.0, -40.0);
        cam.update();
        assert!((cam.position().x - 25.0).abs() < 1e-4);
        assert!((cam.position().z + 10.0).abs() < 1e-4);
        cam.update();
        assert!((cam.position().x - 43.75).abs() < 1e-4);
        assert_eq!(cam.position().y, 10.0);
    }

    #[test]
    fn jump_skips_smoothing() {
        let mut cam = perspective_camera(-45.0, 0.0);
        cam.smoothing = 0.05;
        cam.set_target(160.0, 0.0);
        cam.jump_to_target();
        cam.update();
        assert_eq!(cam.position().x, 160.0);
    }

    #[test]
    fn combined_is_projection_times_view() {
        let mut cam = perspective_camera(-50.0, 15.0);
        cam.update();
        let expected = *cam.projection() * *cam.view();
        for (a, b) in cam.combined().to_cols_array().iter().zip(expected.to_cols_array().iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn inverse_undoes_combined() {
        let mut cam = perspective_camera(-45.0, 20.0);
        cam.set_target(35.0, 70.0);
        cam.update();
        let product = *cam.inverse() * *cam.combined();
        for (a, b) in product.to_cols_array().iter().zip(Mat4::IDENTITY.to_cols_array().iter()) {
            assert!((a - b).abs() < 1e-3, "{a} vs {b}");
        }
    }

    #[test]
    fn project_round_trips_through_combined() {
        let mut cam = perspective_camera(-45.0, 12.0);
        cam.set_target(-64.0, 128.0);
        cam.update();
        for ndc in [
            Vec2::ZERO,
            Vec2::new(0.5, -0.25),
            Vec2::new(-0.9, 0.8),
            Vec2::new(1.0, -1.0),
        ] {
            let hit = cam.project(ndc, 0.0);
            let back = to_ndc(&cam, Vec3::new(hit.x, 0.0, hit.y));
            assert!((back.truncate() - ndc).length() < 1e-3, "{ndc} -> {back}");
        }
    }

    #[test]
    fn project_onto_raised_plane() {
        let mut cam = perspective_camera(-45.0, 0.0);
        cam.update();
        let hit = cam.project(Vec2::new(0.3, 0.2), 32.0);
        let back = to_ndc(&cam, Vec3::new(hit.x, 32.0, hit.y));
        assert!((back.x - 0.3).abs() < 1e-3);
        assert!((back.y - 0.2).abs() < 1e-3);
    }

    #[test]
    fn bounds_are_ordered_for_any_yaw() {
        for pitch in [-89.0f32, -70.0, -45.0, -35.0, -31.0] {
            for yaw in [0.0f32, 45.0, 90.0, 135.0, 180.0, -60.0, 270.0] {
                let mut cam = perspective_camera(pitch, yaw);
                cam.set_target(10.0, -20.0);
                cam.update();
                let b = cam.bounds();
                assert!(b.x1 <= b.x2, "pitch {pitch} yaw {yaw}: {b:?}");
                assert!(b.z1 <= b.z2, "pitch {pitch} yaw {yaw}: {b:?}");
                assert!(b.width().is_finite() && b.depth().is_finite());
                assert!(b.contains(10.0, -20.0), "pitch {pitch} yaw {yaw}: {b:?}");
            }
        }
    }

    #[test]
    fn oblique_bounds_are_symmetric_and_foreshortened() {
        let mut cam = perspective_camera(-45.0, 0.0);
        cam.set_target(0.0, 0.0);
        cam.update();
        let b = cam.bounds();

        assert!((b.x1 + b.x2).abs() < 1e-2, "not symmetric about x=0: {b:?}");
        assert!(b.contains(0.0, 0.0));

        // Top edge ray is 15° below the horizon, bottom edge 75°.
        let far = 100.0 - 100.0 / 15f32.to_radians().tan();
        let near = 100.0 - (100.0 - MODEL_MAX_HEIGHT) / 75f32.to_radians().tan();
        assert!((b.z1 - far).abs() < 0.5, "far edge {} vs {far}", b.z1);
        assert!((b.z2 - near).abs() < 0.5, "near edge {} vs {near}", b.z2);
        // Ground ahead of the focus point stretches further than behind it.
        assert!(-b.z1 > 3.0 * b.z2);
    }

    #[test]
    #[should_panic(expected = "pitch must keep the horizon above the screen")]
    fn rejects_pitch_at_half_fov() {
        perspective_camera(-30.0, 0.0);
    }

    #[test]
    #[should_panic(expected = "pitch must keep the horizon above the screen")]
    fn rejects_shallow_pitch() {
        perspective_camera(-20.0, 0.0);
    }

    #[test]
    fn shallow_pitch_bounds_stay_in_front() {
        let mut cam = perspective_camera(-31.0, 0.0);
        cam.set_target(0.0, 0.0);
        cam.update();
        let b = cam.bounds();
        // The camera sits 100/tan(31°) behind the focus; top rays descend
        // 1° below the horizon, so they land far ahead but finite.
        let far = 100.0 / 31f32.to_radians().tan() - 100.0 / 1f32.to_radians().tan();
        assert!((b.z1 - far).abs() < 60.0, "far edge {} vs {far}", b.z1);
        assert!(b.contains(0.0, 0.0));
    }

    #[test]
    fn max_height_pulls_near_edge_back() {
        let mut cam = perspective_camera(-45.0, 0.0);
        cam.set_max_height(0.0);
        cam.update();
        let flat = cam.bounds();
        cam.set_max_height(64.0);
        cam.update();
        let tall = cam.bounds();
        assert!(tall.z2 > flat.z2 + 1.0, "{tall:?} vs {flat:?}");
        assert_eq!(tall.z1, flat.z1);
    }

    #[test]
    fn ortho_2d_covers_viewport() {
        let mut cam = Camera::new(
            ProjectionKind::Ortho2d,
            0.0,
            Vec2::new(640.0, 360.0),
            0.0,
            0.0,
            1.0,
        );
        cam.set_target(500.0, 500.0);
        cam.update();
        // No 3D pose is computed for screen-space cameras.
        assert_eq!(cam.position(), Vec3::ZERO);
        let corner = *cam.combined() * Vec4::new(640.0, 360.0, 0.0, 1.0);
        assert!((corner.x - 1.0).abs() < 1e-5);
        assert!((corner.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn ortho_3d_keeps_world_centred() {
        let mut cam = Camera::new(
            ProjectionKind::Ortho3d,
            150.0,
            Vec2::new(1024.0, 576.0),
            -45f32.to_radians(),
            -10f32.to_radians(),
            1.0,
        );
        cam.set_target(32.0, 64.0);
        cam.update();
        let p = cam.position();
        let clip = *cam.combined() * p.extend(1.0);
        assert!(clip.x.abs() < 1e-3 && clip.y.abs() < 1e-3);
        assert!((0.0..=1.0).contains(&clip.z));
    }

    #[test]
    fn set_viewport_changes_aspect() {
        let mut cam = perspective_camera(-45.0, 0.0);
        cam.update();
        let wide = cam.bounds();
        cam.set_viewport(288.0, 288.0);
        cam.update();
        let square = cam.bounds();
        assert!(square.width() < wide.width());
    }

    #[test]
    #[should_panic(expected = "viewport width must be positive")]
    fn set_viewport_rejects_zero_width() {
        let mut cam = perspective_camera(-45.0, 0.0);
        cam.set_viewport(0.0, 100.0);
    }

    #[test]
    #[should_panic(expected = "project requires a perspective camera")]
    fn project_rejects_ortho() {
        let mut cam = Camera::new(
            ProjectionKind::Ortho3d,
            10.0,
            Vec2::new(10.0, 10.0),
            -1.0,
            0.0,
            1.0,
        );
        cam.update();
        cam.project(Vec2::ZERO, 0.0);
    }

    #[test]
    fn screen_to_ndc_flips_y() {
        let window = Vec2::new(800.0, 600.0);
        assert_eq!(Camera::screen_to_ndc(Vec2::ZERO, window), Vec2::new(-1.0, 1.0));
        assert_eq!(Camera::screen_to_ndc(window, window), Vec2::new(1.0, -1.0));
        assert_eq!(Camera::screen_to_ndc(window / 2.0, window), Vec2::ZERO);
    }
}
