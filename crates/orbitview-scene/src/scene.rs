//! Scene setup - camera and lighting

use bevy::prelude::*;

use crate::camera::{MainCamera, OrbitController};
use crate::ViewerSettings;

/// Plugin for scene setup
pub struct SceneSetupPlugin;

impl Plugin for SceneSetupPlugin {
    fn build(&self, app: &mut App) {
        // Transparent so the page background shows through the canvas
        app.insert_resource(ClearColor(Color::NONE))
            .add_systems(Startup, setup_scene);
    }
}

fn setup_scene(
    mut commands: Commands,
    settings: Res<ViewerSettings>,
    mut orbit: ResMut<OrbitController>,
) {
    let camera = &settings.0.camera;
    let position = Vec3::new(0.0, 0.0, camera.initial_distance as f32);

    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: (camera.field_of_view_degrees as f32).to_radians(),
            near: camera.near as f32,
            far: camera.far as f32,
            ..default()
        }),
        Transform::from_translation(position).looking_at(Vec3::ZERO, Vec3::Y),
        // Flat white light, the only light in the scene
        AmbientLight {
            color: Color::WHITE,
            brightness: 1000.0,
            ..default()
        },
        MainCamera,
    ));

    orbit.sync_to_position(position);

    tracing::info!(
        "Camera ready: fov={}deg near={} z={}",
        camera.field_of_view_degrees,
        camera.near,
        camera.initial_distance
    );
}
