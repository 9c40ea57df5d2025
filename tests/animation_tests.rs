use std::path::Path;

use glam::Vec3;
use space_scene::camera::Camera;
use space_scene::scenes::create_portfolio_scene;
use space_scene::state::AppState;

#[cfg(test)]
mod animation_tests {
    use super::*;

    const NO_POINTER: ((f32, f32), f32) = ((0.0, 0.0), 0.0);

    fn build_state() -> AppState {
        let (scene, handles) = create_portfolio_scene(Path::new("missing-assets"));
        AppState::new(scene, Camera::new(75.0, 16.0 / 9.0), handles)
    }

    #[test]
    fn test_torus_rotation_after_n_frames() {
        for n in [1_u32, 10, 60, 240] {
            let mut state = build_state();
            for _ in 0..n {
                state.advance_frame(NO_POINTER.0, NO_POINTER.1);
            }
            let rotation = state.scene.node(state.handles.torus).transform.rotation;
            let expected = Vec3::new(0.01, 0.005, 0.01) * n as f32;
            assert!(
                rotation.abs_diff_eq(expected, 1e-4),
                "after {n} frames expected {expected}, got {rotation}"
            );
        }
    }

    #[test]
    fn test_scenario_100_frames_from_rest() {
        let mut state = build_state();
        for _ in 0..100 {
            state.advance_frame(NO_POINTER.0, NO_POINTER.1);
        }
        let rotation = state.scene.node(state.handles.torus).transform.rotation;
        assert!(rotation.abs_diff_eq(Vec3::new(1.0, 0.5, 1.0), 1e-4));
    }

    #[test]
    fn test_frames_leave_moon_and_cube_alone() {
        let mut state = build_state();
        for _ in 0..50 {
            state.advance_frame(NO_POINTER.0, NO_POINTER.1);
        }
        assert_eq!(
            state.scene.node(state.handles.moon).transform.rotation,
            Vec3::ZERO
        );
        assert_eq!(
            state.scene.node(state.handles.cube).transform.rotation,
            Vec3::ZERO
        );
    }

    #[test]
    fn test_frames_preserve_scrolled_camera_without_pointer_input() {
        let mut state = build_state();
        state.on_scroll(1000.0);
        for _ in 0..10 {
            state.advance_frame(NO_POINTER.0, NO_POINTER.1);
        }
        assert_eq!(state.camera.position, Vec3::new(-0.2, -0.2, -10.0));
    }

    #[test]
    fn test_pointer_drag_orbits_at_constant_radius() {
        let mut state = build_state();
        let radius = state.camera.position.length();

        state.advance_frame((30.0, -12.0), 0.0);

        assert!((state.camera.position.length() - radius).abs() < 1e-3);
        assert!(state.camera.position.is_finite());
    }

    #[test]
    fn test_scroll_between_frames_composes() {
        let mut state = build_state();
        state.advance_frame(NO_POINTER.0, NO_POINTER.1);
        state.on_scroll(500.0);
        state.advance_frame(NO_POINTER.0, NO_POINTER.1);

        // Two frames of torus spin, one scroll event's worth of camera move.
        let torus = state.scene.node(state.handles.torus).transform.rotation;
        assert!(torus.abs_diff_eq(Vec3::new(0.02, 0.01, 0.02), 1e-6));
        assert_eq!(state.camera.position.z, -5.0);
    }
}
