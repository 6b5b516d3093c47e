//! Bevy application setup

use bevy::asset::AssetMetaCheck;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;
use orbitview_core::ViewerConfig;
use orbitview_scene::{ModelStore, OrbitviewScenePlugin};

use crate::file_picker::FilePickerPlugin;

/// Run the Bevy application
pub fn run(config: ViewerConfig) {
    let mut app = App::new();

    // Must precede AssetPlugin (part of DefaultPlugins)
    ModelStore::register(&mut app);

    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: config.panel.title.clone(),
                    canvas: Some("#app".to_string()),
                    fit_canvas_to_parent: true,
                    transparent: true,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                file_path: "".to_string(),
                // Uploaded files never have .meta siblings
                meta_check: AssetMetaCheck::Never,
                ..default()
            }),
    )
    // Picking must be added before EguiPlugin so egui can claim pointer input
    .add_plugins(DefaultPickingPlugins)
    .add_plugins(EguiPlugin::default())
    .add_plugins(OrbitviewScenePlugin { config })
    .add_plugins(FilePickerPlugin)
    .run();
}
