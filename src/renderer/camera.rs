use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};

use crate::mesh::Bounds;

/// Longest time step applied to keyboard movement in one frame.
const MAX_STEP_SECONDS: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraMode {
    Free,
    Orbital,
}

impl CameraMode {
    pub fn toggled(self) -> Self {
        match self {
            CameraMode::Free => CameraMode::Orbital,
            CameraMode::Orbital => CameraMode::Free,
        }
    }
}

pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,

    pub target: Vec3,
    pub orbital_distance: f32,

    pub mode: CameraMode,

    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,

    pub move_speed: f32,
    pub mouse_sensitivity: f32,
    pub zoom_speed: f32,

    /// Radius of the framed mesh; every distance above scales with it.
    pub scene_radius: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            yaw: 90.0_f32.to_radians(),
            pitch: 0.0,

            target: Vec3::ZERO,
            orbital_distance: 5.0,

            mode: CameraMode::Orbital,

            fov: 45.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.01,
            far: 1000.0,

            move_speed: 1.0,
            mouse_sensitivity: 0.005,
            zoom_speed: 0.1,

            scene_radius: 1.0,
        }
    }
}

impl Camera {
    /// Looks at `bounds` from +Z, far enough back that the bounding sphere
    /// fits the vertical field of view.
    pub fn frame(&mut self, bounds: &Bounds) {
        let radius = bounds.radius();

        self.scene_radius = radius;
        self.target = bounds.center();
        self.orbital_distance = radius / (self.fov * 0.5).sin() * 1.1;
        self.near = radius * 1e-3;
        self.far = radius * 1e3;
        self.move_speed = radius;
        self.zoom_speed = radius * 0.1;

        self.mode = CameraMode::Orbital;
        self.yaw = 90.0_f32.to_radians();
        self.pitch = 0.0;
        self.update_orbital_position();
    }

    pub fn front(&self) -> Vec3 {
        Vec3::new(
            self.yaw.cos() * self.pitch.cos(),
            self.pitch.sin(),
            self.yaw.sin() * self.pitch.cos(),
        )
        .normalize()
    }

    pub fn right(&self) -> Vec3 {
        self.front().cross(Vec3::Y).normalize()
    }

    pub fn view_matrix(&self) -> Mat4 {
        match self.mode {
            CameraMode::Free => {
                Mat4::look_at_rh(self.position, self.position + self.front(), Vec3::Y)
            }
            CameraMode::Orbital => Mat4::look_at_rh(self.position, self.target, Vec3::Y),
        }
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// World position to pixel coordinates (origin top-left), plus the
    /// clip-space depth. `None` when the point is behind the camera.
    pub fn project(&self, point: Vec3, viewport: Vec2) -> Option<(Vec2, f32)> {
        let clip = self.view_projection_matrix() * point.extend(1.0);
        if clip.w <= self.near {
            return None;
        }

        let ndc = clip.xyz() / clip.w;
        let pixel = Vec2::new(
            (ndc.x * 0.5 + 0.5) * viewport.x,
            (0.5 - ndc.y * 0.5) * viewport.y,
        );
        Some((pixel, ndc.z))
    }

    pub fn process_keyboard(&mut self, forward: f32, right: f32, up: f32, dt: f32) {
        if self.mode != CameraMode::Free {
            return;
        }

        let speed = self.move_speed * dt.min(MAX_STEP_SECONDS);
        let front = self.front();
        let right_vec = self.right();

        self.position += front * forward * speed;
        self.position += right_vec * right * speed;
        self.position.y += up * speed;
    }

    pub fn process_mouse_movement(&mut self, delta: Vec2) {
        let dx = delta.x * self.mouse_sensitivity;
        let dy = delta.y * self.mouse_sensitivity;

        match self.mode {
            CameraMode::Free => {
                self.yaw += dx;
                self.pitch -= dy;
            }
            CameraMode::Orbital => {
                self.yaw += dx;
                self.pitch += dy;
            }
        }

        let max_pitch = 89.0_f32.to_radians();
        self.pitch = self.pitch.clamp(-max_pitch, max_pitch);

        if self.mode == CameraMode::Orbital {
            self.update_orbital_position();
        }
    }

    pub fn process_scroll(&mut self, delta: f32) {
        let r = self.scene_radius;
        match self.mode {
            CameraMode::Free => {
                self.move_speed = (self.move_speed + delta * self.zoom_speed).clamp(r * 0.05, r * 50.0);
            }
            CameraMode::Orbital => {
                self.orbital_distance =
                    (self.orbital_distance - delta * self.zoom_speed).clamp(r * 0.05, r * 50.0);
                self.update_orbital_position();
            }
        }
    }

    pub fn set_mode(&mut self, mode: CameraMode) {
        if self.mode == mode {
            return;
        }

        match mode {
            CameraMode::Free => {
                let dir = (self.target - self.position).normalize();
                self.yaw = dir.z.atan2(dir.x);
                self.pitch = dir.y.asin();
                self.mode = CameraMode::Free;
            }
            CameraMode::Orbital => {
                self.mode = CameraMode::Orbital;
                self.orbital_distance = self.position.distance(self.target).max(self.near);

                let dir = (self.position - self.target).normalize();
                self.yaw = dir.z.atan2(dir.x);
                self.pitch = dir.y.asin();

                self.update_orbital_position();
            }
        }
    }

    fn update_orbital_position(&mut self) {
        self.position = self.target
            + Vec3::new(
                self.orbital_distance * self.yaw.cos() * self.pitch.cos(),
                self.orbital_distance * self.pitch.sin(),
                self.orbital_distance * self.yaw.sin() * self.pitch.cos(),
            );
    }

    pub fn set_aspect(&mut self, width: f32, height: f32) {
        if height > 0.0 {
            self.aspect = width / height;
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub _padding: f32,
    pub viewport: [f32; 2],
    pub _padding2: [f32; 2],
}

impl CameraUniform {
    pub fn from_camera(camera: &Camera, viewport: Vec2) -> Self {
        Self {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            _padding: 0.0,
            viewport: viewport.to_array(),
            _padding2: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn framed() -> Camera {
        let mut camera = Camera::default();
        camera.set_aspect(800.0, 600.0);
        camera.frame(&Bounds {
            min: Vec3::new(-1.0, -1.0, -1.0),
            max: Vec3::new(3.0, 1.0, 1.0),
        });
        camera
    }

    #[test]
    fn frame_centers_on_bounds() {
        let camera = framed();
        assert_eq!(camera.target, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(camera.mode, CameraMode::Orbital);
        assert_relative_eq!(camera.position.distance(camera.target), camera.orbital_distance, epsilon = 1e-4);
        assert!(camera.position.z > camera.target.z);
    }

    #[test]
    fn target_projects_to_viewport_center() {
        let camera = framed();
        let (pixel, depth) = camera.project(camera.target, Vec2::new(800.0, 600.0)).unwrap();
        assert_relative_eq!(pixel.x, 400.0, epsilon = 1e-2);
        assert_relative_eq!(pixel.y, 300.0, epsilon = 1e-2);
        assert!((0.0..1.0).contains(&depth));
    }

    #[test]
    fn up_is_up_on_screen() {
        let camera = framed();
        let viewport = Vec2::new(800.0, 600.0);
        let (above, _) = camera.project(camera.target + Vec3::Y * 0.5, viewport).unwrap();
        assert!(above.y < 300.0);
    }

    #[test]
    fn points_behind_are_not_projected() {
        let camera = framed();
        let behind = camera.position + (camera.position - camera.target);
        assert!(camera.project(behind, Vec2::new(800.0, 600.0)).is_none());
    }

    #[test]
    fn zoom_is_clamped_to_scene_scale() {
        let mut camera = framed();
        for _ in 0..1000 {
            camera.process_scroll(10.0);
        }
        assert_relative_eq!(camera.orbital_distance, camera.scene_radius * 0.05);
    }

    #[test]
    fn orbital_drag_keeps_distance() {
        let mut camera = framed();
        let before = camera.orbital_distance;
        camera.process_mouse_movement(Vec2::new(120.0, -40.0));
        assert_relative_eq!(camera.position.distance(camera.target), before, epsilon = 1e-4);
    }

    #[test]
    fn switching_to_free_keeps_looking_at_target() {
        let mut camera = framed();
        camera.set_mode(CameraMode::Free);
        let dir = (camera.target - camera.position).normalize();
        assert_relative_eq!(camera.front().dot(dir), 1.0, epsilon = 1e-4);
    }

    #[test]
    fn long_idle_frame_moves_at_most_one_step() {
        let mut camera = framed();
        camera.set_mode(CameraMode::Free);
        let start = camera.position;

        camera.process_keyboard(1.0, 0.0, 0.0, 30.0);

        let moved = camera.position.distance(start);
        assert_relative_eq!(moved, camera.move_speed * MAX_STEP_SECONDS, epsilon = 1e-4);
        assert!(moved < camera.scene_radius);
    }
}
