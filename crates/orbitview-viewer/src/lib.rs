//! Orbitview Viewer - glTF model viewer for the browser
//!
//! Pick a .glb/.gltf file, and the camera frames it with orbit controls
//! and a small panel for position, scale, and visibility.

mod app;
mod file_picker;

use orbitview_core::ViewerConfig;
use wasm_bindgen::prelude::*;

/// Defaults shipped with the viewer, overridden by URL parameters
const BUNDLED_CONFIG: &str = include_str!("../viewer.toml");

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    let (mut config, file_result) = match ViewerConfig::from_toml(BUNDLED_CONFIG) {
        Ok(config) => (config, Ok(())),
        Err(e) => (ViewerConfig::default(), Err(e)),
    };
    let query_result = config.apply_overrides(file_picker::location_query_pairs());

    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(config.tracing_level())
            .build(),
    );

    if let Err(e) = file_result {
        tracing::warn!("Ignoring bundled viewer.toml: {}", e);
    }
    if let Err(e) = query_result {
        tracing::warn!("Ignoring URL parameters: {}", e);
    }

    app::run(config);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_config_parses() {
        let config = ViewerConfig::from_toml(BUNDLED_CONFIG).unwrap();
        assert_eq!(config.camera.field_of_view_degrees, 75.0);
        assert_eq!(config.fit.offset, 2.0);
        assert_eq!(config.panel.title, "Model viewer");
        assert_eq!(config.tracing_level(), tracing::Level::WARN);
    }
}
