use std::fmt::Write;

use glam::{Mat4, Vec3};
use tilescape_camera::CameraRig;
use tilescape_common::{CellCoord, CellRect, GroundRect, Model};
use tilescape_stream::TileStore;

/// Everything a renderer needs for one frame, apart from device buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameView {
    /// World to clip space of the main camera.
    pub view_proj: Mat4,
    pub eye: Vec3,
    /// World to clip space of the sun camera, for the shadow map.
    pub sun_view_proj: Mat4,
    /// Direction the sunlight travels.
    pub sun_direction: Vec3,
    pub bounds: GroundRect,
    pub window: CellRect,
    pub tile_size: f32,
    pub instance_counts: [u32; Model::COUNT],
    pub light_count: u32,
    pub highlight: Option<CellCoord>,
    pub selected: Model,
}

impl FrameView {
    pub fn capture<B>(rig: &CameraRig, store: &TileStore<B>) -> Self {
        let main = rig.main();
        Self {
            view_proj: *main.combined(),
            eye: main.position(),
            sun_view_proj: *rig.sun().combined(),
            sun_direction: rig.sun_direction(),
            bounds: rig.bounds(),
            window: store.window(),
            tile_size: store.tile_size(),
            instance_counts: Model::ALL.map(|m| store.instance_count(m) as u32),
            light_count: store.light_count() as u32,
            highlight: None,
            selected: Model::default(),
        }
    }

    pub fn with_highlight(mut self, cell: Option<CellCoord>) -> Self {
        self.highlight = cell;
        self
    }

    pub fn with_selected(mut self, model: Model) -> Self {
        self.selected = model;
        self
    }

    pub fn total_instances(&self) -> u32 {
        self.instance_counts.iter().sum()
    }
}

/// Renderer-agnostic interface for frame consumers that need no device.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    fn render(&self, frame: &FrameView) -> Self::Output;
}

/// Produces a human-readable summary of a frame.
/// Useful for CLI output, logging, and testing the render interface.
#[derive(Debug, Default)]
pub struct DebugTextRenderer;

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self
    }

    /// One character per window cell, rows along z, columns along x.
    /// The default model prints as `.`, others by the first letter of their name.
    pub fn cell_map<B>(store: &TileStore<B>) -> String {
        let window = store.window();
        let mut out = String::new();
        for z in window.min.z..window.max.z {
            for x in window.min.x..window.max.x {
                let c = match store.model_at(CellCoord::new(x, z)) {
                    Some(Model::Dirt) | None => '.',
                    Some(model) => model.name().chars().next().unwrap_or('?'),
                };
                out.push(c);
            }
            out.push('\n');
        }
        out
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, frame: &FrameView) -> String {
        let w = frame.window;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Frame (window {}x{} at ({}, {})) ===",
            w.width(),
            w.height(),
            w.min.x,
            w.min.z
        );
        let _ = writeln!(
            out,
            "Camera: eye=({:.1}, {:.1}, {:.1}) sun=({:.2}, {:.2}, {:.2})",
            frame.eye.x,
            frame.eye.y,
            frame.eye.z,
            frame.sun_direction.x,
            frame.sun_direction.y,
            frame.sun_direction.z
        );
        let b = frame.bounds;
        let _ = writeln!(
            out,
            "Bounds: x [{:.1}, {:.1}] z [{:.1}, {:.1}]",
            b.x1, b.x2, b.z1, b.z2
        );
        let highlight = frame
            .highlight
            .map_or_else(|| "none".to_owned(), |c| format!("({}, {})", c.x, c.z));
        let _ = writeln!(out, "Selected: {}  Highlight: {highlight}", frame.selected);
        let _ = writeln!(
            out,
            "Instances: {}  Lights: {}",
            frame.total_instances(),
            frame.light_count
        );
        for (model, count) in Model::ALL.iter().zip(frame.instance_counts) {
            if count > 0 {
                let _ = writeln!(out, "  {:<10} {count:>6}", model.name());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilescape_common::{CameraSettings, TilePersistence, TileRecord, WorldSettings};
    use tilescape_persist::MemoryTiles;
    use tilescape_stream::{BufferRole, BufferWrite, DeviceError, InstanceDevice};

    struct NullDevice;

    impl InstanceDevice for NullDevice {
        type Buffer = ();

        fn create_buffer(&mut self, _: BufferRole, _: u64, _: &str) -> Result<(), DeviceError> {
            Ok(())
        }

        fn release(&mut self, _: ()) {}

        fn upload(&mut self, _: &[BufferWrite<'_, ()>]) -> Result<(), DeviceError> {
            Ok(())
        }
    }

    fn scene() -> (CameraRig, TileStore<()>) {
        let mut rig = CameraRig::new(&CameraSettings::default(), &WorldSettings::default());
        rig.warp(0.0, 0.0);
        let mut store = TileStore::new(16.0);
        let mut tiles = MemoryTiles::new();
        tiles.upsert_tile(TileRecord::new(Model::Lava, 0, 0)).unwrap();
        store
            .reconcile(&rig.bounds(), &mut tiles, &mut NullDevice)
            .unwrap();
        (rig, store)
    }

    #[test]
    fn capture_reflects_store_and_camera() {
        let (rig, store) = scene();
        let frame = FrameView::capture(&rig, &store);
        assert_eq!(frame.window, store.window());
        assert_eq!(frame.instance_counts[Model::Lava.index()], 1);
        assert_eq!(frame.light_count, 1);
        assert_eq!(frame.total_instances() as usize, store.window().area());
        assert_eq!(frame.view_proj, *rig.main().combined());
        assert_eq!(frame.sun_view_proj, *rig.sun().combined());
        assert_ne!(frame.sun_view_proj, frame.view_proj);
    }

    #[test]
    fn debug_render_lists_buckets() {
        let (rig, store) = scene();
        let frame = FrameView::capture(&rig, &store)
            .with_selected(Model::Grass)
            .with_highlight(Some(CellCoord::new(0, 0)));
        let output = DebugTextRenderer::new().render(&frame);

        assert!(output.contains("Selected: GRASS"));
        assert!(output.contains("Highlight: (0, 0)"));
        assert!(output.contains("Lights: 1"));
        assert!(output.contains("LAVA"));
        assert!(!output.contains("WATER"));
    }

    #[test]
    fn cell_map_marks_placed_tiles() {
        let (_, store) = scene();
        let map = DebugTextRenderer::cell_map(&store);
        let window = store.window();
        assert_eq!(map.lines().count(), window.height() as usize);
        assert_eq!(map.matches('L').count(), 1);
        let row = (0 - window.min.z) as usize;
        let col = (0 - window.min.x) as usize;
        assert_eq!(map.lines().nth(row).unwrap().chars().nth(col), Some('L'));
    }
}
