//! Camera fitting
//!
//! Places a perspective camera on the +Z axis at a distance where an
//! axis-aligned bounding box fills the view, and derives a far plane and
//! orbit limit that keep the whole box in range. The box is expected to be
//! centered on the origin by the caller.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bounds::BoundingBox;

/// Far plane distance as a multiple of the camera-to-far-edge distance
pub const FAR_PLANE_MULTIPLIER: f64 = 3.0;

/// Orbit max distance as a multiple of the camera-to-far-edge distance
pub const ORBIT_DISTANCE_MULTIPLIER: f64 = 2.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    #[error("Field of view must be within (0, 180) degrees, got {0}")]
    InvalidFieldOfView(f64),
    #[error("Aspect ratio must be positive and finite, got {0}")]
    InvalidAspectRatio(f64),
    #[error("Bounding box is empty or not finite")]
    InvalidBoundingBox,
    #[error("Fit produced non-finite values (distance {camera_distance}, far {far_plane_distance})")]
    NonFinite {
        camera_distance: f64,
        far_plane_distance: f64,
    },
}

/// Perspective camera inputs to the fit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraParameters {
    /// Vertical field of view in degrees
    pub field_of_view_degrees: f64,
    /// Viewport width / height
    pub aspect_ratio: f64,
}

impl CameraParameters {
    /// Validated constructor; use struct syntax to skip validation.
    pub fn new(field_of_view_degrees: f64, aspect_ratio: f64) -> Result<Self, FitError> {
        if !(field_of_view_degrees > 0.0 && field_of_view_degrees < 180.0) {
            return Err(FitError::InvalidFieldOfView(field_of_view_degrees));
        }
        if !(aspect_ratio > 0.0 && aspect_ratio.is_finite()) {
            return Err(FitError::InvalidAspectRatio(aspect_ratio));
        }
        Ok(Self {
            field_of_view_degrees,
            aspect_ratio,
        })
    }

    /// Vertical field of view in radians
    pub fn vertical_fov(&self) -> f64 {
        self.field_of_view_degrees.to_radians()
    }

    /// Horizontal field of view in radians, derived from the vertical one
    pub fn horizontal_fov(&self) -> f64 {
        2.0 * ((self.vertical_fov() / 2.0).tan() * self.aspect_ratio).atan()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Camera position along +Z
    pub camera_distance: f64,
    pub far_plane_distance: f64,
    /// Upper zoom limit for orbit controls
    pub max_orbit_distance: f64,
}

impl FitResult {
    pub fn camera_position(&self) -> DVec3 {
        DVec3::new(0.0, 0.0, self.camera_distance)
    }

    pub fn is_finite(&self) -> bool {
        self.camera_distance.is_finite()
            && self.far_plane_distance.is_finite()
            && self.max_orbit_distance.is_finite()
    }
}

/// Compute the camera distance and far plane that frame `bounds`.
///
/// `offset` of `None` or `0` means no padding. Inputs are not validated:
/// a field of view outside (0, 180) or a non-positive aspect ratio yields
/// non-finite numbers. See [`fit_checked`] for the validating variant.
pub fn fit_camera_to_bounding_box(
    field_of_view_degrees: f64,
    aspect_ratio: f64,
    bounds: &BoundingBox,
    offset: Option<f64>,
) -> FitResult {
    let size = bounds.size();
    let camera = CameraParameters {
        field_of_view_degrees,
        aspect_ratio,
    };
    let fov_v = camera.vertical_fov();
    let fov_h = camera.horizontal_fov();

    // Fit against the near face, not the center
    let dx = size.z / 2.0 + (size.x / 2.0 / (fov_h / 2.0).tan()).abs();
    let dy = size.z / 2.0 + (size.y / 2.0 / (fov_v / 2.0).tan()).abs();
    let mut camera_distance = dx.max(dy);

    if let Some(offset) = offset.filter(|o| *o != 0.0) {
        camera_distance *= offset;
    }

    let min_z = if bounds.is_empty() { 0.0 } else { bounds.min.z };
    let camera_to_far_edge = camera_distance - min_z;

    FitResult {
        camera_distance,
        far_plane_distance: camera_to_far_edge * FAR_PLANE_MULTIPLIER,
        max_orbit_distance: camera_to_far_edge * ORBIT_DISTANCE_MULTIPLIER,
    }
}

/// Validating fit: rejects bad camera parameters, empty boxes and
/// non-finite results.
pub fn fit_checked(
    camera: &CameraParameters,
    bounds: &BoundingBox,
    offset: Option<f64>,
) -> Result<FitResult, FitError> {
    let camera = CameraParameters::new(camera.field_of_view_degrees, camera.aspect_ratio)?;
    if bounds.is_empty() || !bounds.min.is_finite() || !bounds.max.is_finite() {
        return Err(FitError::InvalidBoundingBox);
    }

    let result = fit_camera_to_bounding_box(
        camera.field_of_view_degrees,
        camera.aspect_ratio,
        bounds,
        offset,
    );

    if !result.is_finite() {
        return Err(FitError::NonFinite {
            camera_distance: result.camera_distance,
            far_plane_distance: result.far_plane_distance,
        });
    }

    tracing::debug!(
        "Fit: distance={:.4} far={:.4} max_orbit={:.4}",
        result.camera_distance,
        result.far_plane_distance,
        result.max_orbit_distance
    );

    Ok(result)
}

/// A camera the fit can be applied to
pub trait FitCamera {
    fn parameters(&self) -> CameraParameters;
    fn set_position(&mut self, position: DVec3);
    fn set_far(&mut self, far: f64);
}

/// Orbit-style controls the fit can be applied to
pub trait FitOrbit {
    fn set_target(&mut self, target: DVec3);
    fn set_max_distance(&mut self, max_distance: f64);
}

/// Fit `bounds` and write the result into the camera and, if given, the controls.
///
/// Nothing is written when the fit fails.
pub fn apply_fit(
    camera: &mut dyn FitCamera,
    bounds: &BoundingBox,
    offset: Option<f64>,
    orbit: Option<&mut dyn FitOrbit>,
) -> Result<FitResult, FitError> {
    let parameters = camera.parameters();
    let result = fit_checked(&parameters, bounds, offset)?;

    camera.set_position(result.camera_position());
    camera.set_far(result.far_plane_distance);

    if let Some(orbit) = orbit {
        orbit.set_target(DVec3::ZERO);
        orbit.set_max_distance(result.max_orbit_distance);
    }

    Ok(result)
}
