use glam::Vec3;

use crate::camera::{Camera, OrbitControls};
use crate::scene::Scene;
use crate::scenes::SceneHandles;

/// Scroll-to-camera mapping. Position is an exact function of the
/// accumulated offset, not an integration of deltas.
pub const SCROLL_CAMERA_Z: f32 = -0.01;
pub const SCROLL_CAMERA_XY: f32 = -0.0002;

/// Fixed per-scroll-event rotation nudges. These scale with event count,
/// not scroll distance: rapid wheel events spin the meshes faster. That is
/// the intended behavior, not an accident of the input mapping.
pub const MOON_SCROLL_STEP: Vec3 = Vec3::new(0.05, 0.075, 0.05);
pub const CUBE_SCROLL_STEP: Vec3 = Vec3::new(0.0, 0.01, 0.01);

/// Per-frame torus spin.
pub const TORUS_FRAME_STEP: Vec3 = Vec3::new(0.01, 0.005, 0.01);

/// Wheel line deltas converted to the pixel offset the mapping expects.
pub const PIXELS_PER_SCROLL_LINE: f32 = 40.0;

/// Everything the event loop mutates: the scene, the camera, the orbit
/// controls, and the accumulated scroll offset. Owned by the app and passed
/// by reference to the frame and scroll paths.
pub struct AppState {
    pub scene: Scene,
    pub camera: Camera,
    pub orbit: OrbitControls,
    pub handles: SceneHandles,
    scroll_offset: f32,
}

impl AppState {
    pub fn new(scene: Scene, camera: Camera, handles: SceneHandles) -> Self {
        Self {
            scene,
            camera,
            orbit: OrbitControls::new(Vec3::ZERO),
            handles,
            scroll_offset: 0.0,
        }
    }

    /// Offset grows positive as the user scrolls down.
    pub fn scroll_offset(&self) -> f32 {
        self.scroll_offset
    }

    /// Accumulate a wheel delta (already in pixels) and fire the scroll
    /// handler once, mirroring one DOM scroll event.
    pub fn scroll_by(&mut self, delta_pixels: f32) {
        self.scroll_offset += delta_pixels;
        self.on_scroll(self.scroll_offset);
    }

    /// The scroll handler. Camera position is a pure function of `t`; the
    /// moon and cube get their fixed per-event nudges.
    pub fn on_scroll(&mut self, t: f32) {
        self.camera.position.z = t * SCROLL_CAMERA_Z;
        self.camera.position.x = t * SCROLL_CAMERA_XY;
        self.camera.position.y = t * SCROLL_CAMERA_XY;

        self.scene.node_mut(self.handles.moon).transform.rotation += MOON_SCROLL_STEP;
        self.scene.node_mut(self.handles.cube).transform.rotation += CUBE_SCROLL_STEP;
    }

    /// One animation tick of the render loop: spin the torus, then let the
    /// orbit controls reconcile accumulated pointer input.
    pub fn advance_frame(&mut self, rotate_delta: (f32, f32), dolly_delta: f32) {
        self.scene.node_mut(self.handles.torus).transform.rotation += TORUS_FRAME_STEP;
        self.orbit.update(&mut self.camera, rotate_delta, dolly_delta);
    }
}
