//! Orbitview Scene - Bevy side of the model viewer
//!
//! Camera rig with orbit controls, model loading from uploaded bytes,
//! camera fitting on load, and the generated model control panel.

pub mod camera;
pub mod model;
pub mod panel;
pub mod scene;

use bevy::prelude::*;
use orbitview_core::ViewerConfig;

/// Viewer configuration shared by all plugins
#[derive(Debug, Clone, Resource, Default)]
pub struct ViewerSettings(pub ViewerConfig);

/// Plugin that sets up the camera, scene, model pipeline, and panel.
///
/// [`model::ModelStore::register`] must run before `DefaultPlugins`.
pub struct OrbitviewScenePlugin {
    pub config: ViewerConfig,
}

impl Plugin for OrbitviewScenePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ViewerSettings(self.config.clone()))
            .insert_resource(camera::OrbitController::from_config(&self.config.orbit))
            .add_plugins(camera::CameraPlugin)
            .add_plugins(scene::SceneSetupPlugin)
            .add_plugins(model::ModelPlugin)
            .add_plugins(panel::PanelPlugin);
    }
}

pub use camera::{MainCamera, OrbitController};
pub use model::{
    ControlledNode, FileDialogRequest, LoadedModel, ModelFile, ModelLoadState, ModelStore, ModelUploads,
};
pub use panel::ActiveControls;
