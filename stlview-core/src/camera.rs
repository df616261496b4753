/// Orbit (arc-rotate) camera
use nalgebra::{Matrix4, Point3, Vector3};

const MIN_BETA: f32 = 0.01;
const MIN_RADIUS: f32 = 0.05;

/// A camera orbiting a target point on a sphere.
///
/// `alpha` is the longitudinal angle around the up axis, `beta` the polar
/// angle measured from the up axis, `radius` the distance to the target.
/// The eye position is derived, never stored.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub alpha: f32,
    pub beta: f32,
    pub radius: f32,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub allow_panning: bool,
}

impl OrbitCamera {
    pub fn new(alpha: f32, beta: f32, radius: f32, target: Point3<f32>) -> Self {
        Self {
            alpha,
            beta: beta.clamp(MIN_BETA, std::f32::consts::PI - MIN_BETA),
            radius: radius.max(MIN_RADIUS),
            target,
            up: Vector3::y(),
            fov: std::f32::consts::PI / 4.0, // 45 degrees
            near: 0.1,
            far: 100.0,
            allow_panning: false,
        }
    }

    /// Re-aim the camera without changing its orbit angles
    pub fn set_target(&mut self, target: Point3<f32>) {
        self.target = target;
    }

    /// Eye position derived from the spherical coordinates
    pub fn eye(&self) -> Point3<f32> {
        let offset = Vector3::new(
            self.beta.sin() * self.alpha.cos(),
            self.beta.cos(),
            self.beta.sin() * self.alpha.sin(),
        ) * self.radius;
        self.target + offset
    }

    /// Rotate around the target; beta is kept away from the poles
    pub fn orbit(&mut self, d_alpha: f32, d_beta: f32) {
        self.alpha += d_alpha;
        self.beta = (self.beta + d_beta).clamp(MIN_BETA, std::f32::consts::PI - MIN_BETA);
    }

    /// Move toward or away from the target
    pub fn zoom(&mut self, d_radius: f32) {
        self.radius = (self.radius + d_radius).max(MIN_RADIUS);
    }

    /// Translate the target in the view plane. Ignored unless panning was
    /// enabled when the camera was attached.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        if !self.allow_panning {
            return;
        }
        let forward = (self.target - self.eye()).normalize();
        let right = forward.cross(&self.up).normalize();
        let up = right.cross(&forward);
        self.target += right * dx + up * dy;
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.eye(), &self.target, &self.up)
    }

    /// Create the perspective projection matrix
    pub fn projection_matrix(&self, aspect: f32) -> Matrix4<f32> {
        Matrix4::new_perspective(aspect, self.fov, self.near, self.far)
    }

    /// Project a 3D point to 2D screen space. `aspect` is passed separately
    /// from the pixel size so callers can correct for non-square pixels
    /// (terminal cells are roughly twice as tall as they are wide).
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        model_matrix: &Matrix4<f32>,
        aspect: f32,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let mvp = self.projection_matrix(aspect) * self.view_matrix() * model_matrix;

        // transform_point performs the perspective divide
        let ndc = mvp.transform_point(point);

        // Clip test
        if !(-1.0..=1.0).contains(&ndc.x)
            || !(-1.0..=1.0).contains(&ndc.y)
            || !(-1.0..=1.0).contains(&ndc.z)
        {
            return None;
        }

        // Convert to screen space
        let screen_x = (ndc.x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc.y) * 0.5 * height as f32;

        Some((screen_x, screen_y, ndc.z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_sits_on_the_orbit_sphere() {
        let camera = OrbitCamera::new(1.5, 1.0, 2.0, Point3::new(0.0, 5.0, -10.0));
        let distance = (camera.eye() - camera.target).norm();
        assert!((distance - 2.0).abs() < 1e-5);
    }

    #[test]
    fn retarget_keeps_orbit_angles() {
        let mut camera = OrbitCamera::new(1.5, 1.0, 2.0, Point3::new(0.0, 5.0, -10.0));
        camera.set_target(Point3::origin());
        assert_eq!(camera.alpha, 1.5);
        assert_eq!(camera.beta, 1.0);
        assert!(((camera.eye() - Point3::origin()).norm() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn beta_is_clamped_away_from_poles() {
        let mut camera = OrbitCamera::new(0.0, 1.0, 2.0, Point3::origin());
        camera.orbit(0.0, 10.0);
        assert!(camera.beta < std::f32::consts::PI);
        camera.orbit(0.0, -20.0);
        assert!(camera.beta > 0.0);
    }

    #[test]
    fn pan_is_a_no_op_without_permission() {
        let mut camera = OrbitCamera::new(1.5, 1.0, 2.0, Point3::origin());
        camera.pan(1.0, 1.0);
        assert_eq!(camera.target, Point3::origin());

        camera.allow_panning = true;
        camera.pan(1.0, 0.0);
        assert!(camera.target != Point3::origin());
    }

    #[test]
    fn projects_target_to_screen_center() {
        let mut camera = OrbitCamera::new(1.5, 1.0, 2.0, Point3::origin());
        camera.set_target(Point3::origin());
        let (x, y, _depth) = camera
            .project_to_screen(&Point3::origin(), &Matrix4::identity(), 2.0, 1400, 700)
            .unwrap();
        assert!((x - 700.0).abs() < 1.0);
        assert!((y - 350.0).abs() < 1.0);
    }

    #[test]
    fn point_behind_camera_is_clipped() {
        let camera = OrbitCamera::new(0.0, std::f32::consts::FRAC_PI_2, 2.0, Point3::origin());
        // Eye is at roughly (2, 0, 0) looking at the origin; a point far
        // beyond the eye on +x is behind the camera.
        let behind = Point3::new(10.0, 0.0, 0.0);
        assert!(camera
            .project_to_screen(&behind, &Matrix4::identity(), 1.0, 100, 100)
            .is_none());
    }
}
