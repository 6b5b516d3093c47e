//! Viewer configuration
//!
//! Loaded from TOML, then overridden by already-decoded URL query parameters.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub fit: FitConfig,
    #[serde(default)]
    pub orbit: OrbitConfig,
    #[serde(default)]
    pub panel: PanelConfig,
    /// Max tracing level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Model URL to fetch at startup
    #[serde(default)]
    pub model_url: Option<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            fit: FitConfig::default(),
            orbit: OrbitConfig::default(),
            panel: PanelConfig::default(),
            log_level: default_log_level(),
            model_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    #[serde(default = "default_fov")]
    pub field_of_view_degrees: f64,
    #[serde(default = "default_near")]
    pub near: f64,
    /// Far plane before the first model is fitted
    #[serde(default = "default_far")]
    pub far: f64,
    /// Camera z before the first model is fitted
    #[serde(default = "default_initial_distance")]
    pub initial_distance: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            field_of_view_degrees: default_fov(),
            near: default_near(),
            far: default_far(),
            initial_distance: default_initial_distance(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    /// Padding multiplier on the fitted distance (0 means none)
    #[serde(default = "default_offset")]
    pub offset: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            offset: default_offset(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitConfig {
    #[serde(default = "default_true")]
    pub damping: bool,
    /// Fraction of the remaining motion applied per 60 Hz frame
    #[serde(default = "default_damping_factor")]
    pub damping_factor: f64,
    /// Radians per pixel of drag
    #[serde(default = "default_rotate_speed")]
    pub rotate_speed: f64,
    #[serde(default = "default_zoom_speed")]
    pub zoom_speed: f64,
    #[serde(default)]
    pub min_distance: f64,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            damping: true,
            damping_factor: default_damping_factor(),
            rotate_speed: default_rotate_speed(),
            zoom_speed: default_zoom_speed(),
            min_distance: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_panel_width")]
    pub width: f32,
    #[serde(default = "default_position_step")]
    pub position_step: f64,
    #[serde(default = "default_scale_max")]
    pub scale_max: f64,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            width: default_panel_width(),
            position_step: default_position_step(),
            scale_max: default_scale_max(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_fov() -> f64 {
    75.0
}

fn default_near() -> f64 {
    0.1
}

fn default_far() -> f64 {
    1.0e12
}

fn default_initial_distance() -> f64 {
    3.0
}

fn default_offset() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

fn default_damping_factor() -> f64 {
    0.05
}

fn default_rotate_speed() -> f64 {
    0.005
}

fn default_zoom_speed() -> f64 {
    0.1
}

fn default_title() -> String {
    "Model viewer".to_string()
}

fn default_panel_width() -> f32 {
    500.0
}

fn default_position_step() -> f64 {
    0.01
}

fn default_scale_max() -> f64 {
    4.0
}

impl ViewerConfig {
    /// Query parameters understood by [`ViewerConfig::apply_overrides`]
    pub const QUERY_KEYS: [&'static str; 7] =
        ["fov", "offset", "near", "damping", "title", "log", "model"];

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fov = self.camera.field_of_view_degrees;
        if !(fov > 0.0 && fov < 180.0) {
            return Err(invalid("fov", fov));
        }
        if !(self.camera.near > 0.0 && self.camera.near.is_finite()) {
            return Err(invalid("near", self.camera.near));
        }
        if !(self.camera.far > self.camera.near) {
            return Err(invalid("far", self.camera.far));
        }
        if !(self.fit.offset >= 0.0 && self.fit.offset.is_finite()) {
            return Err(invalid("offset", self.fit.offset));
        }
        if !(self.orbit.damping_factor > 0.0 && self.orbit.damping_factor <= 1.0) {
            return Err(invalid("damping_factor", self.orbit.damping_factor));
        }
        if !(self.panel.scale_max > 0.0) {
            return Err(invalid("scale_max", self.panel.scale_max));
        }
        Ok(())
    }

    /// Apply `(key, value)` overrides, typically URL query parameters that
    /// the caller has already percent-decoded.
    ///
    /// Keys are listed in [`ViewerConfig::QUERY_KEYS`]; others are ignored.
    /// The config is left unchanged if any recognized value is invalid.
    pub fn apply_overrides<I, K, V>(&mut self, pairs: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut updated = self.clone();

        for (key, value) in pairs {
            let key = key.as_ref();
            let value: String = value.into();

            match key {
                "fov" => updated.camera.field_of_view_degrees = parse_number(key, &value)?,
                "offset" => updated.fit.offset = parse_number(key, &value)?,
                "near" => updated.camera.near = parse_number(key, &value)?,
                "damping" => {
                    updated.orbit.damping = match value.as_str() {
                        "" | "1" | "true" | "on" => true,
                        "0" | "false" | "off" => false,
                        _ => {
                            return Err(ConfigError::InvalidValue {
                                key: key.to_string(),
                                value,
                            })
                        }
                    }
                }
                "title" => updated.panel.title = value,
                "log" => updated.log_level = value,
                "model" if !value.is_empty() => updated.model_url = Some(value),
                _ => tracing::debug!("Ignoring query parameter '{}'", key),
            }
        }

        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Parsed `log_level`, defaulting to WARN
    pub fn tracing_level(&self) -> tracing::Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "info" => tracing::Level::INFO,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::WARN,
        }
    }
}

fn invalid(key: &str, value: f64) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.parse::<f64>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.camera.field_of_view_degrees, 75.0);
        assert_eq!(config.camera.near, 0.1);
        assert_eq!(config.camera.initial_distance, 3.0);
        assert_eq!(config.fit.offset, 2.0);
        assert!(config.orbit.damping);
        assert_eq!(config.panel.title, "Model viewer");
        assert_eq!(config.panel.width, 500.0);
        assert_eq!(config.panel.scale_max, 4.0);
        assert_eq!(config.tracing_level(), tracing::Level::WARN);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
log_level = "info"

[camera]
field_of_view_degrees = 50.0

[fit]
offset = 1.25
"#;
        let config = ViewerConfig::from_toml(toml).unwrap();
        assert_eq!(config.camera.field_of_view_degrees, 50.0);
        assert_eq!(config.camera.near, 0.1);
        assert_eq!(config.fit.offset, 1.25);
        assert_eq!(config.tracing_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_invalid_file_values() {
        let err = ViewerConfig::from_toml("[camera]\nfield_of_view_degrees = 180.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "fov"));

        assert!(matches!(
            ViewerConfig::from_toml("[camera\n"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = ViewerConfig::default();
        config
            .apply_overrides([
                ("fov", "60"),
                ("offset", "1.5"),
                ("damping", "off"),
                ("title", "My Model!"),
                ("log", "debug"),
                ("unknown", "1"),
            ])
            .unwrap();
        assert_eq!(config.camera.field_of_view_degrees, 60.0);
        assert_eq!(config.fit.offset, 1.5);
        assert!(!config.orbit.damping);
        assert_eq!(config.panel.title, "My Model!");
        assert_eq!(config.tracing_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_apply_overrides_keeps_values_verbatim() {
        // Values arrive decoded; escape-like text must not be decoded again
        let mut config = ViewerConfig::default();
        config
            .apply_overrides([("title", "100%+5"), ("model", "https://example.com/a%20b.glb")])
            .unwrap();
        assert_eq!(config.panel.title, "100%+5");
        assert!(config.panel.title.bytes().all(|b| !b.is_ascii_control()));
        assert_eq!(config.model_url.as_deref(), Some("https://example.com/a%20b.glb"));
    }

    #[test]
    fn test_apply_overrides_empty_model_is_ignored() {
        let mut config = ViewerConfig::default();
        config.apply_overrides([("model", String::new())]).unwrap();
        assert_eq!(config.model_url, None);
    }

    #[test]
    fn test_apply_overrides_rejects_invalid_atomically() {
        let mut config = ViewerConfig::default();
        assert!(config.apply_overrides([("offset", "3"), ("fov", "abc")]).is_err());
        assert!(config.apply_overrides([("fov", "0")]).is_err());
        assert!(config.apply_overrides([("offset", "-1")]).is_err());
        assert!(config.apply_overrides([("damping", "maybe")]).is_err());
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn test_query_keys_are_recognized() {
        for key in ViewerConfig::QUERY_KEYS {
            let mut config = ViewerConfig::default();
            let result = config.apply_overrides([(key, "not-a-number")]);
            if matches!(key, "fov" | "offset" | "near" | "damping") {
                assert!(result.is_err(), "{} accepted garbage", key);
            } else {
                assert!(result.is_ok());
                assert_ne!(config, ViewerConfig::default(), "{} had no effect", key);
            }
        }
    }

    #[test]
    fn test_bundled_defaults_match() {
        let config = ViewerConfig::from_toml("").unwrap();
        assert_eq!(config, ViewerConfig::default());
    }
}
