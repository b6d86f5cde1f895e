use glam::{Vec2, Vec3};
use tilescape_common::{CameraSettings, GroundRect, WorldSettings};

use crate::camera::{Camera, ProjectionKind};

const SUN_HEIGHT: f32 = 150.0;
const SUN_PITCH_DEGREES: f32 = -45.0;
const SUN_YAW_DEGREES: f32 = -10.0;

/// The viewer's cameras: the perspective main camera and an orthographic
/// sun camera that follows the visible area for lighting.
#[derive(Debug, Clone)]
pub struct CameraRig {
    main: Camera,
    sun: Camera,
    tile_size: f32,
}

impl CameraRig {
    pub fn new(settings: &CameraSettings, world: &WorldSettings) -> Self {
        let tile_size = world.tile_size;
        assert!(tile_size > 0.0, "tile_size must be positive");
        let viewport = Vec2::new(settings.viewport_width, settings.viewport_height);
        let mut main = Camera::new(
            ProjectionKind::Perspective,
            settings.height,
            viewport,
            settings.pitch_degrees.to_radians(),
            settings.yaw_degrees.to_radians(),
            settings.smoothing,
        );
        let sun = Camera::new(
            ProjectionKind::Ortho3d,
            SUN_HEIGHT,
            viewport * 2.0,
            SUN_PITCH_DEGREES.to_radians(),
            SUN_YAW_DEGREES.to_radians(),
            1.0,
        );
        main.set_max_height(world.max_height);
        // `track` unprojects through the previous frame's matrices.
        main.update();
        Self {
            main,
            sun,
            tile_size,
        }
    }

    /// Focus the main camera on `(x, z)` and advance both cameras one frame.
    ///
    /// The sun follows the ground point under the screen centre, snapped to
    /// the tile grid so shadows do not swim as the view scrolls.
    pub fn track(&mut self, x: f32, z: f32) {
        self.main.set_target(x, z);
        let centre = self.main.project(Vec2::ZERO, 0.0);
        let snap = |a: f32| (a / self.tile_size).trunc() * self.tile_size;
        self.sun.set_target(snap(centre.x), snap(centre.y));
        self.main.update();
        self.sun.update();
    }

    /// Move the main camera straight onto `(x, z)`, skipping smoothing.
    pub fn warp(&mut self, x: f32, z: f32) {
        self.main.set_target(x, z);
        self.main.jump_to_target();
        self.main.update();
        self.track(x, z);
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.main.set_viewport(width, height);
        self.sun.set_viewport(width * 2.0, height * 2.0);
    }

    /// Visible ground area of the main camera.
    pub fn bounds(&self) -> GroundRect {
        self.main.bounds()
    }

    /// Direction the sunlight travels.
    pub fn sun_direction(&self) -> Vec3 {
        self.sun.forward()
    }

    pub fn main(&self) -> &Camera {
        &self.main
    }

    pub fn sun(&self) -> &Camera {
        &self.sun
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rig(smoothing: f32) -> CameraRig {
        let settings = CameraSettings {
            smoothing,
            ..CameraSettings::default()
        };
        CameraRig::new(&settings, &WorldSettings::default())
    }

    #[test]
    fn initial_matrices_are_usable() {
        let rig = rig(0.05);
        assert!(rig.main().inverse().is_finite());
        let b = rig.bounds();
        assert!(b.x1 < b.x2 && b.z1 < b.z2);
    }

    #[test]
    fn track_converges_on_focus() {
        let mut rig = rig(0.5);
        for _ in 0..60 {
            rig.track(320.0, -160.0);
        }
        let centre = rig.main().project(Vec2::ZERO, 0.0);
        assert!((centre - Vec2::new(320.0, -160.0)).length() < 0.1, "{centre}");
        assert!(rig.bounds().contains(320.0, -160.0));
    }

    #[test]
    fn sun_target_snaps_to_tiles() {
        let mut rig = rig(1.0);
        rig.warp(100.0, 37.0);
        rig.track(100.0, 37.0);
        let target = rig.sun().target();
        assert_eq!(target.x % 16.0, 0.0);
        assert_eq!(target.y % 16.0, 0.0);
        assert!((target.x - 96.0).abs() < f32::EPSILON);
        assert!((target.y - 32.0).abs() < f32::EPSILON);
    }

    #[test]
    fn warp_skips_smoothing() {
        let mut rig = rig(0.05);
        rig.warp(800.0, 800.0);
        let centre = rig.main().project(Vec2::ZERO, 0.0);
        assert!((centre - Vec2::new(800.0, 800.0)).length() < 0.5, "{centre}");
    }

    #[test]
    fn sun_shines_downwards() {
        let rig = rig(1.0);
        let dir = rig.sun_direction();
        assert!(dir.y < 0.0);
        assert!((dir.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn world_max_height_reaches_main_camera() {
        let world = WorldSettings {
            max_height: 100.0,
            ..WorldSettings::default()
        };
        let mut tall = CameraRig::new(&CameraSettings::default(), &world);
        tall.warp(0.0, 0.0);
        let mut flat = rig(1.0);
        flat.warp(0.0, 0.0);
        assert_eq!(tall.main().max_height(), 100.0);
        assert!(tall.bounds().z2 > flat.bounds().z2);
    }

    #[test]
    fn viewport_resize_reaches_both_cameras() {
        let mut rig = rig(1.0);
        rig.set_viewport(1280.0, 720.0);
        assert_eq!(rig.main().viewport(), Vec2::new(1280.0, 720.0));
        assert_eq!(rig.sun().viewport(), Vec2::new(2560.0, 1440.0));
    }
}
