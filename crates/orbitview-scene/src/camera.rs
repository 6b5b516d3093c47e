//! Camera rig and orbit navigation

use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit};
use bevy::math::DVec3;
use bevy::prelude::*;
use orbitview_core::config::OrbitConfig;
use orbitview_core::{CameraParameters, FitCamera, FitOrbit};

/// Pixels per wheel "line" for pixel-based scroll deltas (browsers)
const PIXELS_PER_LINE: f32 = 100.0;

/// Keeps the camera off the poles so `look_at` has a stable up vector
const MAX_ELEVATION: f32 = 1.55;

/// Closest the camera may get to the target
const MIN_DISTANCE_FLOOR: f32 = 1e-4;

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Orbit controller state: spherical coordinates around `target`, Y up.
///
/// Azimuth 0 and elevation 0 put the camera on +Z looking at the target.
#[derive(Debug, Clone, Resource)]
pub struct OrbitController {
    pub distance: f32,
    pub target_distance: f32,
    pub azimuth: f32,
    pub target_azimuth: f32,
    pub elevation: f32,
    pub target_elevation: f32,
    pub target: Vec3,
    pub target_focus: Vec3,
    pub min_distance: f32,
    pub max_distance: f32,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub damping: bool,
    pub smooth_factor: f32,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::from_config(&OrbitConfig::default())
    }
}

impl OrbitController {
    pub fn from_config(config: &OrbitConfig) -> Self {
        Self {
            distance: 3.0,
            target_distance: 3.0,
            azimuth: 0.0,
            target_azimuth: 0.0,
            elevation: 0.0,
            target_elevation: 0.0,
            target: Vec3::ZERO,
            target_focus: Vec3::ZERO,
            min_distance: (config.min_distance as f32).max(MIN_DISTANCE_FLOOR),
            max_distance: f32::INFINITY,
            sensitivity: config.rotate_speed as f32,
            zoom_speed: config.zoom_speed as f32,
            damping: config.damping,
            smooth_factor: config.damping_factor as f32,
        }
    }

    /// Camera translation for the current (damped) state
    pub fn translation(&self) -> Vec3 {
        self.target + orbit_offset(self.azimuth, self.elevation, self.distance)
    }

    /// Re-derive the spherical coordinates from a camera position,
    /// snapping both current and goal values (no damping).
    pub fn sync_to_position(&mut self, position: Vec3) {
        let offset = position - self.target_focus;
        let distance = offset.length();
        if distance > 0.0 {
            self.azimuth = offset.x.atan2(offset.z);
            self.elevation = (offset.y / distance).clamp(-1.0, 1.0).asin();
        }
        self.distance = self.clamp_distance(distance);
        self.target = self.target_focus;
        self.target_distance = self.distance;
        self.target_azimuth = self.azimuth;
        self.target_elevation = self.elevation;
    }

    pub fn clamp_distance(&self, distance: f32) -> f32 {
        let max = self.max_distance.max(self.min_distance);
        distance.clamp(self.min_distance, max)
    }

    pub fn rotate(&mut self, delta: Vec2) {
        self.target_azimuth -= delta.x * self.sensitivity;
        self.target_elevation =
            (self.target_elevation + delta.y * self.sensitivity).clamp(-MAX_ELEVATION, MAX_ELEVATION);
    }

    /// Pan the target in the camera's view plane; the scene follows the pointer
    pub fn pan(&mut self, delta: Vec2) {
        let right = Vec3::new(self.azimuth.cos(), 0.0, -self.azimuth.sin());
        let up = Vec3::Y;
        let pan_speed = self.distance * 0.002;
        self.target_focus -= right * delta.x * pan_speed;
        self.target_focus += up * delta.y * pan_speed;
    }

    pub fn zoom(&mut self, factor: f32) {
        self.target_distance = self.clamp_distance(self.target_distance * factor);
    }

    /// Move current values toward their goals
    pub fn advance(&mut self, dt: f32) {
        let lerp_factor = if self.damping {
            1.0 - (-self.smooth_factor * 60.0 * dt).exp()
        } else {
            1.0
        };
        self.distance += (self.target_distance - self.distance) * lerp_factor;
        self.azimuth += (self.target_azimuth - self.azimuth) * lerp_factor;
        self.elevation += (self.target_elevation - self.elevation) * lerp_factor;
        self.target += (self.target_focus - self.target) * lerp_factor;
    }
}

impl FitOrbit for OrbitController {
    fn set_target(&mut self, target: DVec3) {
        self.target_focus = target.as_vec3();
        self.target = self.target_focus;
    }

    fn set_max_distance(&mut self, max_distance: f64) {
        self.max_distance = max_distance as f32;
    }
}

/// Offset from the target for the given spherical coordinates (Y up)
pub fn orbit_offset(azimuth: f32, elevation: f32, distance: f32) -> Vec3 {
    Vec3::new(
        distance * elevation.cos() * azimuth.sin(),
        distance * elevation.sin(),
        distance * elevation.cos() * azimuth.cos(),
    )
}

/// Multiplicative zoom for a wheel delta in lines, bounded per frame
pub fn zoom_factor(lines: f32, zoom_speed: f32) -> f32 {
    (1.0 - lines * zoom_speed * 0.3).clamp(0.5, 2.0)
}

/// Camera transform and projection borrowed together for fitting
pub struct CameraRig<'a> {
    pub transform: &'a mut Transform,
    pub projection: &'a mut Projection,
}

impl FitCamera for CameraRig<'_> {
    fn parameters(&self) -> CameraParameters {
        match &*self.projection {
            Projection::Perspective(p) => CameraParameters {
                field_of_view_degrees: (p.fov as f64).to_degrees(),
                aspect_ratio: p.aspect_ratio as f64,
            },
            // Not a perspective camera: reported as invalid so the fit is rejected
            _ => CameraParameters {
                field_of_view_degrees: 0.0,
                aspect_ratio: 0.0,
            },
        }
    }

    fn set_position(&mut self, position: DVec3) {
        self.transform.translation = position.as_vec3();
        self.transform.look_at(Vec3::ZERO, Vec3::Y);
    }

    fn set_far(&mut self, far: f64) {
        if let Projection::Perspective(p) = &mut *self.projection {
            p.far = far as f32;
        }
    }
}

/// Plugin for camera controls
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<OrbitController>()
            .add_systems(Update, update_camera);
    }
}

fn update_camera(
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
    mut orbit: ResMut<OrbitController>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    time: Res<Time>,
    mut contexts: bevy_egui::EguiContexts,
) {
    // Don't steer the camera while the pointer is over the panel
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input() || ctx.is_pointer_over_area())
        .unwrap_or(false);

    if !egui_wants_pointer {
        let motion = mouse_motion.delta;
        if mouse_button.pressed(MouseButton::Left) {
            orbit.rotate(motion);
        }
        if mouse_button.pressed(MouseButton::Right) {
            orbit.pan(motion);
        }

        let lines = match mouse_scroll.unit {
            MouseScrollUnit::Line => mouse_scroll.delta.y,
            MouseScrollUnit::Pixel => mouse_scroll.delta.y / PIXELS_PER_LINE,
        };
        if lines != 0.0 {
            let factor = zoom_factor(lines, orbit.zoom_speed);
            orbit.zoom(factor);
        }

        // One finger rotates
        if touch_input.iter().count() == 1 {
            for touch in touch_input.iter() {
                let delta = touch.delta();
                if delta != Vec2::ZERO {
                    orbit.rotate(delta);
                }
            }
        }
    }

    // Pinch to zoom
    if touch_input.iter().count() == 2 {
        let touches: Vec<_> = touch_input.iter().collect();
        if let (Some(t1), Some(t2)) = (touches.first(), touches.get(1)) {
            let curr_dist = t1.position().distance(t2.position());
            let prev_dist = (t1.position() - t1.delta()).distance(t2.position() - t2.delta());
            orbit.zoom(prev_dist / curr_dist.max(1.0));
        }
    }

    orbit.advance(time.delta_secs());

    if let Ok(mut transform) = camera_query.single_mut() {
        transform.translation = orbit.translation();
        transform.look_at(orbit.target, Vec3::Y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_orbit_offset_front() {
        let offset = orbit_offset(0.0, 0.0, 5.0);
        assert_relative_eq!(offset.x, 0.0);
        assert_relative_eq!(offset.y, 0.0);
        assert_relative_eq!(offset.z, 5.0);
    }

    #[test]
    fn test_sync_round_trips_position() {
        let mut orbit = OrbitController::default();
        let position = Vec3::new(1.0, 2.0, 3.0);
        orbit.sync_to_position(position);

        let back = orbit.translation();
        assert_relative_eq!(back.x, position.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, position.y, epsilon = 1e-5);
        assert_relative_eq!(back.z, position.z, epsilon = 1e-5);
        assert_eq!(orbit.target_distance, orbit.distance);
    }

    #[test]
    fn test_fit_sets_target_and_limit() {
        let mut orbit = OrbitController::default();
        orbit.target_focus = Vec3::new(4.0, 0.0, 0.0);
        orbit.set_target(DVec3::ZERO);
        orbit.set_max_distance(10.0);
        assert_eq!(orbit.target, Vec3::ZERO);
        assert_eq!(orbit.max_distance, 10.0);

        orbit.zoom(100.0);
        assert_eq!(orbit.target_distance, 10.0);
    }

    #[test]
    fn test_zoom_respects_min_distance() {
        let mut orbit = OrbitController::default();
        for _ in 0..200 {
            orbit.zoom(0.5);
        }
        assert!(orbit.target_distance >= MIN_DISTANCE_FLOOR);
    }

    #[test]
    fn test_zoom_factor_bounded() {
        assert_relative_eq!(zoom_factor(1.0, 0.1), 0.97);
        assert_eq!(zoom_factor(1000.0, 0.1), 0.5);
        assert_eq!(zoom_factor(-1000.0, 0.1), 2.0);
    }

    #[test]
    fn test_advance_without_damping_snaps() {
        let mut orbit = OrbitController::from_config(&OrbitConfig {
            damping: false,
            ..OrbitConfig::default()
        });
        orbit.target_distance = 7.0;
        orbit.target_azimuth = 1.0;
        orbit.advance(0.016);
        assert_eq!(orbit.distance, 7.0);
        assert_eq!(orbit.azimuth, 1.0);
    }

    #[test]
    fn test_advance_with_damping_moves_partway() {
        let mut orbit = OrbitController::default();
        orbit.target_distance = 7.0;
        orbit.advance(1.0 / 60.0);
        assert!(orbit.distance > 3.0 && orbit.distance < 7.0);
    }

    #[test]
    fn test_rotate_clamps_elevation() {
        let mut orbit = OrbitController::default();
        orbit.rotate(Vec2::new(0.0, 1.0e6));
        assert_eq!(orbit.target_elevation, MAX_ELEVATION);
    }

    #[test]
    fn test_camera_rig_applies_fit() {
        let mut transform = Transform::default();
        let mut projection = Projection::Perspective(PerspectiveProjection {
            fov: 75.0_f32.to_radians(),
            aspect_ratio: 1.0,
            ..default()
        });
        let mut orbit = OrbitController::default();
        let bounds = orbitview_core::BoundingBox::centered(DVec3::new(2.0, 2.0, 2.0));

        let result = {
            let mut rig = CameraRig {
                transform: &mut transform,
                projection: &mut projection,
            };
            orbitview_core::apply_fit(&mut rig, &bounds, Some(2.0), Some(&mut orbit)).unwrap()
        };

        assert_relative_eq!(transform.translation.z, result.camera_distance as f32, epsilon = 1e-4);
        match projection {
            Projection::Perspective(p) => {
                assert_relative_eq!(p.far, result.far_plane_distance as f32, epsilon = 1e-3)
            }
            _ => unreachable!(),
        }
        assert_relative_eq!(orbit.max_distance, result.max_orbit_distance as f32, epsilon = 1e-3);
    }

    #[test]
    fn test_orthographic_camera_rejected() {
        let mut transform = Transform::default();
        let mut projection = Projection::Orthographic(OrthographicProjection::default_3d());
        let mut rig = CameraRig {
            transform: &mut transform,
            projection: &mut projection,
        };
        let bounds = orbitview_core::BoundingBox::centered(DVec3::ONE);
        assert!(orbitview_core::apply_fit(&mut rig, &bounds, None, None).is_err());
    }
}
