use glam::{Mat4, Vec3};

pub const ORBIT_ROTATE_SPEED: f32 = 0.005;
pub const ORBIT_DOLLY_SPEED: f32 = 0.05;
pub const MIN_ORBIT_RADIUS: f32 = 0.5;

/// Keep the polar angle away from the poles so the view basis stays valid.
const POLAR_LIMIT: f32 = 0.01;

/// Perspective camera. Projection parameters are fixed at creation except for
/// the aspect ratio, which follows the window; the position is rewritten by
/// the scroll controller and the orbit controls.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_y_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(fov_y_degrees: f32, aspect: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 30.0),
            target: Vec3::ZERO,
            fov_y_degrees,
            aspect,
            near: 0.1,
            far: 1000.0,
        }
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn view(&self) -> Mat4 {
        // A scroll offset of zero parks the camera exactly on the target;
        // fall back to looking down -Z instead of producing a NaN basis.
        let target = if (self.target - self.position).length_squared() < 1e-12 {
            self.position - Vec3::Z
        } else {
            self.target
        };
        Mat4::look_at_rh(self.position, target, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}

/// Pointer-driven orbit around a fixed target.
///
/// `update` starts from the camera's current position every frame, so
/// positions written externally (the scroll controller) survive frames with
/// no pointer input untouched.
#[derive(Debug, Clone, Copy)]
pub struct OrbitControls {
    pub target: Vec3,
    pub rotate_speed: f32,
    pub dolly_speed: f32,
    pub min_radius: f32,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            rotate_speed: ORBIT_ROTATE_SPEED,
            dolly_speed: ORBIT_DOLLY_SPEED,
            min_radius: MIN_ORBIT_RADIUS,
        }
    }

    /// Apply pointer drag accumulated since the last frame. `rotate_delta`
    /// is the left-drag pixel delta, `dolly_delta` the right-drag vertical
    /// pixel delta.
    pub fn update(&self, camera: &mut Camera, rotate_delta: (f32, f32), dolly_delta: f32) {
        camera.target = self.target;

        if rotate_delta == (0.0, 0.0) && dolly_delta == 0.0 {
            return;
        }

        let offset = camera.position - self.target;
        let mut radius = offset.length();

        // Degenerate when the camera sits on the target; restart the orbit
        // from the minimum radius on the horizon.
        let (mut theta, mut phi) = if radius < 1e-6 {
            radius = self.min_radius;
            (0.0, std::f32::consts::FRAC_PI_2)
        } else {
            (
                offset.x.atan2(offset.z),
                (offset.y / radius).clamp(-1.0, 1.0).acos(),
            )
        };

        theta -= rotate_delta.0 * self.rotate_speed;
        phi -= rotate_delta.1 * self.rotate_speed;
        phi = phi.clamp(POLAR_LIMIT, std::f32::consts::PI - POLAR_LIMIT);

        radius = (radius + dolly_delta * self.dolly_speed).max(self.min_radius);

        camera.position = self.target
            + Vec3::new(
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
                radius * phi.sin() * theta.cos(),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_input_preserves_external_position() {
        let mut camera = Camera::new(75.0, 16.0 / 9.0);
        camera.position = Vec3::new(-0.2, -0.2, -10.0);

        let controls = OrbitControls::new(Vec3::ZERO);
        controls.update(&mut camera, (0.0, 0.0), 0.0);

        assert_eq!(camera.position, Vec3::new(-0.2, -0.2, -10.0));
    }

    #[test]
    fn drag_keeps_orbit_radius() {
        let mut camera = Camera::new(75.0, 1.0);
        camera.position = Vec3::new(0.0, 0.0, 30.0);

        let controls = OrbitControls::new(Vec3::ZERO);
        controls.update(&mut camera, (40.0, 25.0), 0.0);

        assert!((camera.position.length() - 30.0).abs() < 1e-3);
        assert!(camera.position.is_finite());
    }

    #[test]
    fn dolly_respects_minimum_radius() {
        let mut camera = Camera::new(75.0, 1.0);
        camera.position = Vec3::new(0.0, 0.0, 1.0);

        let controls = OrbitControls::new(Vec3::ZERO);
        controls.update(&mut camera, (0.0, 0.0), -1000.0);

        assert!((camera.position.length() - controls.min_radius).abs() < 1e-4);
    }

    #[test]
    fn camera_on_target_recovers() {
        let mut camera = Camera::new(75.0, 1.0);
        camera.position = Vec3::ZERO;

        let controls = OrbitControls::new(Vec3::ZERO);
        controls.update(&mut camera, (5.0, 0.0), 0.0);

        assert!(camera.position.is_finite());
        assert!((camera.position.length() - controls.min_radius).abs() < 1e-4);
    }

    #[test]
    fn view_is_finite_with_camera_on_target() {
        let mut camera = Camera::new(75.0, 1.0);
        camera.position = Vec3::ZERO;
        camera.target = Vec3::ZERO;

        let view = camera.view();
        assert!(view.to_cols_array().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn aspect_ignores_zero_sizes() {
        let mut camera = Camera::new(75.0, 2.0);
        camera.set_aspect(0, 600);
        assert_eq!(camera.aspect, 2.0);
        camera.set_aspect(800, 600);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
    }
}
