//! Camera state and the gesture state machine that drives it.
//!
//! One `CameraController` per mounted view. Renderers and picking only read
//! the state; every mutation goes through the controller. The profile
//! decides what "zoom" means: a magnification for the projected canvas, a
//! dolly distance for the orbit camera.

use crate::math::{wrap_angle, yaw_pitch_matrix};
use crate::scene::Framing;
use nalgebra::{Isometry3, Matrix3, Matrix4, Perspective3, Point3, Vector2, Vector3};
use std::f64::consts::FRAC_PI_2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ZoomBehavior {
    /// Additive magnification step.
    Magnify { step: f64 },
    /// Multiplicative distance factor (< 1 moves closer).
    Dolly { factor: f64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraProfile {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub default_zoom: f64,
    pub zoom: ZoomBehavior,
    /// Radians per pixel of drag.
    pub drag_sensitivity: f64,
    pub pitch_limit: f64,
    pub default_yaw: f64,
    pub default_pitch: f64,
    pub default_target: Vector3<f64>,
    /// Radians per second.
    pub auto_rotate_rate: f64,
    /// Auto-rotate state after `reset`; `None` leaves it unchanged.
    pub auto_rotate_on_reset: Option<bool>,
    pub allows_pan: bool,
    pub fov_y: f64,
    pub near: f64,
    pub far: f64,
}

impl CameraProfile {
    pub fn projected() -> Self {
        Self {
            min_zoom: 0.3,
            max_zoom: 3.0,
            default_zoom: 1.0,
            zoom: ZoomBehavior::Magnify { step: 0.1 },
            drag_sensitivity: 0.01,
            pitch_limit: FRAC_PI_2,
            default_yaw: 0.0,
            default_pitch: 0.0,
            default_target: Vector3::zeros(),
            auto_rotate_rate: 0.3,
            auto_rotate_on_reset: Some(true),
            allows_pan: false,
            fov_y: 0.8,
            near: 0.01,
            far: 1.0e6,
        }
    }

    /// Orbit camera sized to the populated region of a scene.
    pub fn orbit(framing: &Framing) -> Self {
        let r = framing.view_radius.max(1e-3);
        let default_zoom = r * 2.5;
        let max_zoom = (framing.star_shell.max(r) * 0.8).max(default_zoom);
        Self {
            min_zoom: r * 0.05,
            max_zoom,
            default_zoom,
            zoom: ZoomBehavior::Dolly { factor: 0.85 },
            drag_sensitivity: 0.005,
            pitch_limit: 89f64.to_radians(),
            default_yaw: -FRAC_PI_2,
            default_pitch: 0.5,
            default_target: Vector3::zeros(),
            auto_rotate_rate: 0.1,
            auto_rotate_on_reset: None,
            allows_pan: true,
            fov_y: 45f64.to_radians(),
            near: r * 1e-3,
            far: framing.star_shell.max(max_zoom) * 2.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CameraState {
    pub yaw: f64,
    pub pitch: f64,
    pub zoom: f64,
    pub target: Vector3<f64>,
    pub auto_rotate: bool,
    pub dragging: bool,
    last_pointer: Option<Vector2<f64>>,
}

pub struct CameraController {
    profile: CameraProfile,
    state: CameraState,
}

impl CameraController {
    pub fn new(profile: CameraProfile, auto_rotate: bool) -> Self {
        Self {
            state: CameraState {
                yaw: profile.default_yaw,
                pitch: profile.default_pitch,
                zoom: profile.default_zoom,
                target: profile.default_target,
                auto_rotate,
                dragging: false,
                last_pointer: None,
            },
            profile,
        }
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn profile(&self) -> &CameraProfile {
        &self.profile
    }

    pub fn begin_drag(&mut self, pointer: Vector2<f64>) {
        self.state.auto_rotate = false;
        self.state.dragging = true;
        self.state.last_pointer = Some(pointer);
    }

    pub fn update_drag(&mut self, pointer: Vector2<f64>) {
        if !self.state.dragging {
            return;
        }
        let Some(last) = self.state.last_pointer else {
            self.state.last_pointer = Some(pointer);
            return;
        };
        let delta = pointer - last;
        let s = self.profile.drag_sensitivity;
        let limit = self.profile.pitch_limit;
        self.state.yaw = wrap_angle(self.state.yaw + delta.x * s);
        self.state.pitch = (self.state.pitch + delta.y * s).clamp(-limit, limit);
        self.state.last_pointer = Some(pointer);
    }

    pub fn end_drag(&mut self) {
        self.state.dragging = false;
        self.state.last_pointer = None;
    }

    /// Moves the target in the screen plane by `delta_px`, scaled by distance.
    pub fn pan(&mut self, delta_px: Vector2<f64>) {
        if !self.profile.allows_pan {
            return;
        }
        let forward = (self.state.target - self.eye()).normalize();
        let right = forward.cross(&Vector3::z());
        let right = if right.norm() > 1e-9 { right.normalize() } else { Vector3::x() };
        let up = right.cross(&forward);
        let scale = self.state.zoom * 0.0015;
        self.state.target += (-right * delta_px.x + up * delta_px.y) * scale;
    }

    pub fn zoom_in(&mut self) {
        let zoom = match self.profile.zoom {
            ZoomBehavior::Magnify { step } => self.state.zoom + step,
            ZoomBehavior::Dolly { factor } => self.state.zoom * factor,
        };
        self.set_zoom(zoom);
    }

    pub fn zoom_out(&mut self) {
        let zoom = match self.profile.zoom {
            ZoomBehavior::Magnify { step } => self.state.zoom - step,
            ZoomBehavior::Dolly { factor } => self.state.zoom / factor,
        };
        self.set_zoom(zoom);
    }

    /// Continuous zoom from a wheel delta in points; positive zooms in.
    pub fn scroll(&mut self, delta: f64) {
        let factor = (1.0 + delta * 0.001).max(0.1);
        let zoom = match self.profile.zoom {
            ZoomBehavior::Magnify { .. } => self.state.zoom * factor,
            ZoomBehavior::Dolly { .. } => self.state.zoom / factor,
        };
        self.set_zoom(zoom);
    }

    fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.state.zoom = zoom.clamp(self.profile.min_zoom, self.profile.max_zoom);
        }
    }

    pub fn reset(&mut self) {
        self.state.yaw = self.profile.default_yaw;
        self.state.pitch = self.profile.default_pitch;
        self.state.zoom = self.profile.default_zoom;
        self.state.target = self.profile.default_target;
        self.state.dragging = false;
        self.state.last_pointer = None;
        if let Some(auto) = self.profile.auto_rotate_on_reset {
            self.state.auto_rotate = auto;
        }
    }

    pub fn set_profile(&mut self, profile: CameraProfile) {
        self.profile = profile;
        self.reset();
    }

    /// Adopts new limits for the same view, keeping yaw, zoom and target
    /// and clamping them into the new range.
    pub fn set_limits(&mut self, profile: CameraProfile) {
        self.profile = profile;
        let limit = self.profile.pitch_limit;
        self.state.pitch = self.state.pitch.clamp(-limit, limit);
        self.set_zoom(self.state.zoom);
    }

    pub fn toggle_auto_rotate(&mut self) {
        self.state.auto_rotate = !self.state.auto_rotate;
    }

    pub fn tick(&mut self, dt: f64) {
        if self.state.auto_rotate && !self.state.dragging {
            self.state.yaw = wrap_angle(self.state.yaw + self.profile.auto_rotate_rate * dt);
        }
    }

    /// Yaw about z, then pitch about the screen x axis.
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        yaw_pitch_matrix(self.state.yaw, self.state.pitch)
    }

    pub fn eye(&self) -> Vector3<f64> {
        let (sy, cy) = self.state.yaw.sin_cos();
        let (sp, cp) = self.state.pitch.sin_cos();
        self.state.target + Vector3::new(cp * cy, cp * sy, sp) * self.state.zoom
    }

    pub fn view_matrix(&self) -> Matrix4<f64> {
        let eye = Point3::from(self.eye());
        let target = Point3::from(self.state.target);
        Isometry3::look_at_rh(&eye, &target, &Vector3::z()).to_homogeneous()
    }

    pub fn projection_matrix(&self, aspect: f64) -> Matrix4<f64> {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        Perspective3::new(aspect, self.profile.fov_y, self.profile.near, self.profile.far).to_homogeneous()
    }

    pub fn view_projection(&self, aspect: f64) -> Matrix4<f64> {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    fn framing() -> Framing {
        Framing {
            view_radius: 20.0,
            star_shell: 80.0,
        }
    }

    #[rstest]
    #[case(CameraProfile::projected())]
    #[case(CameraProfile::orbit(&framing()))]
    fn zoom_is_always_clamped(#[case] profile: CameraProfile) {
        let mut cam = CameraController::new(profile, false);
        for i in 0..200 {
            if (i / 37) % 2 == 0 {
                cam.zoom_in();
            } else {
                cam.zoom_out();
            }
            if i % 11 == 0 {
                cam.scroll(if i % 2 == 0 { 5000.0 } else { -5000.0 });
            }
            let z = cam.state().zoom;
            assert!(z >= profile.min_zoom && z <= profile.max_zoom, "step {i}: {z}");
        }
        for _ in 0..100 {
            cam.zoom_in();
        }
        let expected_max = match profile.zoom {
            ZoomBehavior::Magnify { .. } => profile.max_zoom,
            ZoomBehavior::Dolly { .. } => profile.min_zoom,
        };
        assert_abs_diff_eq!(cam.state().zoom, expected_max, epsilon = 1e-12);
    }

    #[rstest]
    #[case(20.0, 20.0)]
    #[case(20.0, 40.0)]
    #[case(5.0, 1.0)]
    #[case(20.0, 80.0)]
    fn orbit_defaults_lie_within_limits(#[case] view_radius: f64, #[case] star_shell: f64) {
        let profile = CameraProfile::orbit(&Framing {
            view_radius,
            star_shell,
        });
        assert!(profile.min_zoom <= profile.default_zoom && profile.default_zoom <= profile.max_zoom);
        assert!(profile.far > profile.max_zoom);

        let mut cam = CameraController::new(profile, false);
        cam.zoom_out();
        cam.reset();
        let z = cam.state().zoom;
        assert!(z >= profile.min_zoom && z <= profile.max_zoom);
        assert_eq!(z, profile.default_zoom);
    }

    #[test]
    fn new_limits_keep_the_view_but_clamp_it() {
        let mut cam = CameraController::new(CameraProfile::orbit(&framing()), false);
        cam.begin_drag(Vector2::new(0.0, 0.0));
        cam.update_drag(Vector2::new(60.0, 20.0));
        cam.end_drag();
        for _ in 0..5 {
            cam.zoom_out();
        }
        let before = cam.state().clone();

        cam.set_limits(CameraProfile::orbit(&framing()));
        assert_eq!(cam.state(), &before);

        let tight = CameraProfile::orbit(&Framing {
            view_radius: 2.0,
            star_shell: 8.0,
        });
        cam.set_limits(tight);
        let s = cam.state();
        assert_eq!((s.yaw, s.pitch), (before.yaw, before.pitch));
        assert_abs_diff_eq!(s.zoom, tight.max_zoom, epsilon = 1e-12);
    }

    #[test]
    fn drag_disables_auto_rotate_until_re_enabled() {
        let mut cam = CameraController::new(CameraProfile::projected(), true);
        cam.begin_drag(Vector2::new(10.0, 10.0));
        assert!(!cam.state().auto_rotate);
        assert!(cam.state().dragging);
        cam.update_drag(Vector2::new(30.0, 10.0));
        assert_abs_diff_eq!(cam.state().yaw, 0.2, epsilon = 1e-12);
        cam.end_drag();
        assert!(!cam.state().dragging);
        assert!(!cam.state().auto_rotate);
        cam.toggle_auto_rotate();
        assert!(cam.state().auto_rotate);
    }

    #[test]
    fn update_without_drag_is_ignored() {
        let mut cam = CameraController::new(CameraProfile::projected(), false);
        cam.update_drag(Vector2::new(500.0, 500.0));
        assert_eq!(cam.state().yaw, 0.0);
        assert_eq!(cam.state().pitch, 0.0);
    }

    #[rstest]
    #[case(CameraProfile::projected())]
    #[case(CameraProfile::orbit(&framing()))]
    fn pitch_is_clamped(#[case] profile: CameraProfile) {
        let mut cam = CameraController::new(profile, false);
        cam.begin_drag(Vector2::new(0.0, 0.0));
        cam.update_drag(Vector2::new(0.0, 10_000.0));
        assert_abs_diff_eq!(cam.state().pitch, profile.pitch_limit, epsilon = 1e-12);
        cam.update_drag(Vector2::new(0.0, -30_000.0));
        assert_abs_diff_eq!(cam.state().pitch, -profile.pitch_limit, epsilon = 1e-12);
    }

    #[test]
    fn yaw_is_unclamped_but_wrapped() {
        let mut cam = CameraController::new(CameraProfile::projected(), false);
        cam.begin_drag(Vector2::new(0.0, 0.0));
        for i in 1..=50 {
            cam.update_drag(Vector2::new(i as f64 * 100.0, 0.0));
        }
        let yaw = cam.state().yaw;
        assert!((-std::f64::consts::PI..std::f64::consts::PI).contains(&yaw));
        assert_abs_diff_eq!(yaw, wrap_angle(50.0), epsilon = 1e-9);
    }

    #[test]
    fn tick_only_rotates_when_idle() {
        let mut cam = CameraController::new(CameraProfile::projected(), true);
        cam.tick(1.0);
        assert_abs_diff_eq!(cam.state().yaw, 0.3, epsilon = 1e-12);

        cam.begin_drag(Vector2::new(0.0, 0.0));
        cam.toggle_auto_rotate();
        let before = cam.state().yaw;
        cam.tick(1.0);
        assert_eq!(cam.state().yaw, before);
    }

    #[test]
    fn projected_reset_restores_defaults_and_auto_rotate() {
        let mut cam = CameraController::new(CameraProfile::projected(), false);
        cam.begin_drag(Vector2::new(0.0, 0.0));
        cam.update_drag(Vector2::new(40.0, 25.0));
        cam.zoom_in();
        cam.reset();
        let s = cam.state();
        assert_eq!((s.yaw, s.pitch, s.zoom), (0.0, 0.0, 1.0));
        assert!(s.auto_rotate);
        assert!(!s.dragging);
    }

    #[test]
    fn orbit_reset_keeps_auto_rotate() {
        let mut cam = CameraController::new(CameraProfile::orbit(&framing()), false);
        cam.pan(Vector2::new(100.0, 0.0));
        assert!(cam.state().target.norm() > 0.0);
        cam.reset();
        assert_eq!(cam.state().target, Vector3::zeros());
        assert!(!cam.state().auto_rotate);
    }

    #[test]
    fn pan_is_ignored_by_projected_profile() {
        let mut cam = CameraController::new(CameraProfile::projected(), false);
        cam.pan(Vector2::new(100.0, 50.0));
        assert_eq!(cam.state().target, Vector3::zeros());
    }

    #[test]
    fn view_matrix_looks_at_target() {
        let cam = CameraController::new(CameraProfile::orbit(&framing()), false);
        let d = cam.state().zoom;
        assert_abs_diff_eq!((cam.eye() - cam.state().target).norm(), d, epsilon = 1e-9);
        let t = cam.view_matrix() * cam.state().target.push(1.0);
        assert_abs_diff_eq!(t.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(t.y, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(t.z, -d, epsilon = 1e-9);
    }
}
