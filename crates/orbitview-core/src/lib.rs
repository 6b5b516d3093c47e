//! Orbitview Core - Camera fitting and viewer model types
//!
//! This crate provides the renderer-independent pieces of the viewer:
//! - Axis-aligned bounding boxes measured from loaded geometry
//! - The camera fit that frames a bounding box in a perspective view
//! - State for the generated position / scale / visibility controls
//! - Model file format detection
//! - Viewer configuration from TOML, JSON, or URL query parameters

pub mod bounds;
pub mod config;
pub mod controls;
pub mod fit;
pub mod format;

pub use bounds::BoundingBox;
pub use config::{ConfigError, ViewerConfig};
pub use controls::ModelControls;
pub use fit::{
    apply_fit, fit_camera_to_bounding_box, fit_checked, CameraParameters, FitCamera, FitError,
    FitOrbit, FitResult,
};
pub use format::{FormatError, ModelFormat};
