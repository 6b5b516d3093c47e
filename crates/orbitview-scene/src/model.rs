//! Model loading, bounds measurement, and camera fitting
//!
//! Uploaded bytes are written to an in-memory asset source and loaded as
//! glTF through the regular asset server. Each upload gets a fresh path so
//! the asset server never hands back a cached handle for an older file.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bevy::asset::io::memory::{Dir, MemoryAssetReader};
use bevy::asset::io::{AssetSource, AssetSourceId};
use bevy::asset::{AssetApp, LoadState, RecursiveDependencyLoadState};
use bevy::gltf::Gltf;
use bevy::prelude::*;
use bevy::camera::primitives::MeshAabb;
use bevy::math::DVec3;
use bevy::scene::{SceneInstance, SceneSpawner};
use orbitview_core::{apply_fit, BoundingBox, FitResult, ModelControls, ModelFormat};

use crate::camera::{CameraRig, MainCamera, OrbitController};
use crate::panel::ActiveControls;
use crate::ViewerSettings;

/// Asset source name for uploaded models
pub const MODEL_SOURCE: &str = "upload";

/// Plugin for the load / spawn / fit pipeline
pub struct ModelPlugin;

impl Plugin for ModelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ModelUploads>()
            .init_resource::<ModelLoadState>()
            .init_resource::<FileDialogRequest>()
            .add_systems(
                Update,
                (
                    receive_uploads,
                    spawn_loaded_model,
                    fit_ready_model,
                    apply_model_controls,
                )
                    .chain(),
            );
    }
}

/// A model file read by the browser
#[derive(Debug, Clone)]
pub struct ModelFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Files (or read errors) pushed from JavaScript callbacks
#[derive(Resource, Default, Clone)]
pub struct ModelUploads(pub Arc<Mutex<VecDeque<Result<ModelFile, String>>>>);

impl ModelUploads {
    pub fn push(&self, upload: Result<ModelFile, String>) {
        if let Ok(mut queue) = self.0.lock() {
            queue.push_back(upload);
        }
    }
}

/// Set by the panel when the user asks to pick a file
#[derive(Resource, Default)]
pub struct FileDialogRequest(pub bool);

/// Marker for the root entity of the loaded model
#[derive(Component)]
pub struct LoadedModel;

/// Marker for the node the panel controls act on: the first top-level
/// node of the glTF scene that is not a camera
#[derive(Component)]
pub struct ControlledNode;

/// In-memory asset directory backing [`MODEL_SOURCE`]
#[derive(Resource)]
pub struct ModelStore {
    dir: Dir,
    generation: u64,
    current: Option<PathBuf>,
}

impl ModelStore {
    /// Register the upload asset source and insert the store.
    ///
    /// Asset sources are read when `AssetPlugin` builds, so this has to be
    /// called before `DefaultPlugins` are added.
    pub fn register(app: &mut App) {
        let dir = Dir::default();
        let reader_root = dir.clone();
        app.register_asset_source(
            AssetSourceId::from(MODEL_SOURCE),
            AssetSource::build().with_reader(move || {
                Box::new(MemoryAssetReader {
                    root: reader_root.clone(),
                })
            }),
        );
        app.insert_resource(ModelStore {
            dir,
            generation: 0,
            current: None,
        });
    }

    /// Replace the stored model and return its asset path
    pub fn store(&mut self, format: ModelFormat, bytes: Vec<u8>) -> String {
        if let Some(previous) = self.current.take() {
            self.dir.remove_asset(&previous);
        }
        self.generation += 1;
        let path = PathBuf::from(format!("model-{}.{}", self.generation, format.extension()));
        self.dir.insert_asset(&path, bytes);
        let asset_path = format!("{}://{}", MODEL_SOURCE, path.display());
        self.current = Some(path);
        asset_path
    }
}

/// Where the current model is in the load pipeline
#[derive(Debug, Default)]
pub enum ModelPhase {
    #[default]
    Empty,
    /// Waiting on the asset server
    Loading(Handle<Gltf>),
    /// Scene spawned, waiting for the instance to be ready
    Spawning(Entity),
    Ready(Entity),
}

#[derive(Debug, Resource, Default)]
pub struct ModelLoadState {
    pub phase: ModelPhase,
    /// File name of the current model
    pub name: Option<String>,
    pub error: Option<String>,
    pub last_fit: Option<FitResult>,
}

impl ModelLoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, ModelPhase::Loading(_) | ModelPhase::Spawning(_))
    }
}

/// Take uploaded files, drop the previous model, and start loading
fn receive_uploads(
    mut commands: Commands,
    uploads: Res<ModelUploads>,
    mut store: ResMut<ModelStore>,
    mut state: ResMut<ModelLoadState>,
    mut controls: ResMut<ActiveControls>,
    asset_server: Res<AssetServer>,
    models: Query<Entity, With<LoadedModel>>,
) {
    let pending: Vec<_> = match uploads.0.lock() {
        Ok(mut queue) => queue.drain(..).collect(),
        Err(_) => return,
    };

    // Only the newest valid upload is loaded
    let mut latest = None;
    for upload in pending {
        let file = match upload {
            Ok(file) => file,
            Err(e) => {
                tracing::error!("Model read failed: {}", e);
                state.error = Some(e);
                continue;
            }
        };
        match ModelFormat::detect(&file.name, &file.bytes) {
            Ok(format) => latest = Some((file, format)),
            Err(e) => {
                tracing::error!("Rejected {}: {}", file.name, e);
                state.error = Some(e.to_string());
            }
        }
    }

    let Some((file, format)) = latest else { return };

    for entity in &models {
        commands.entity(entity).despawn();
    }
    controls.0 = None;

    let bytes = file.bytes.len();
    let path = store.store(format, file.bytes);
    tracing::info!("Loading model {} ({} bytes) as {}", file.name, bytes, path);

    let handle: Handle<Gltf> = asset_server.load(path);
    state.phase = ModelPhase::Loading(handle);
    state.name = Some(file.name);
    state.error = None;
    state.last_fit = None;
}

/// Spawn the glTF's scene once the asset and its dependencies are loaded
fn spawn_loaded_model(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    gltfs: Res<Assets<Gltf>>,
    mut state: ResMut<ModelLoadState>,
) {
    let ModelPhase::Loading(handle) = &state.phase else {
        return;
    };
    let handle = handle.clone();

    if let Some(message) = load_failure(
        asset_server.get_load_state(handle.id()).as_ref(),
        asset_server
            .get_recursive_dependency_load_state(handle.id())
            .as_ref(),
    ) {
        tracing::error!("{}", message);
        state.phase = ModelPhase::Empty;
        state.error = Some(message);
        return;
    }

    if !asset_server.is_loaded_with_dependencies(handle.id()) {
        return;
    }
    let Some(gltf) = gltfs.get(&handle) else {
        return;
    };

    let Some(scene) = gltf
        .default_scene
        .clone()
        .or_else(|| gltf.scenes.first().cloned())
    else {
        tracing::error!("Model has no scenes");
        state.phase = ModelPhase::Empty;
        state.error = Some("Model has no scenes".to_string());
        return;
    };

    let entity = commands
        .spawn((
            SceneRoot(scene),
            Transform::default(),
            Visibility::default(),
            LoadedModel,
        ))
        .id();
    state.phase = ModelPhase::Spawning(entity);
}

/// Error message if the model or any of its dependencies failed to load
pub fn load_failure(
    root: Option<&LoadState>,
    dependencies: Option<&RecursiveDependencyLoadState>,
) -> Option<String> {
    match (root, dependencies) {
        (Some(LoadState::Failed(err)), _) => Some(format!("Error loading model: {}", err)),
        (_, Some(RecursiveDependencyLoadState::Failed(err))) => {
            Some(format!("Error loading model dependency: {}", err))
        }
        _ => None,
    }
}

/// Once the scene instance is ready, fit the camera and build the controls
#[allow(clippy::too_many_arguments)]
fn fit_ready_model(
    mut state: ResMut<ModelLoadState>,
    mut controls: ResMut<ActiveControls>,
    mut orbit: ResMut<OrbitController>,
    settings: Res<ViewerSettings>,
    mut commands: Commands,
    spawner: Res<SceneSpawner>,
    roots: Query<&SceneInstance, With<LoadedModel>>,
    children: Query<&Children>,
    cameras: Query<(), With<Camera>>,
    nodes: Query<(&Transform, Option<&Visibility>), Without<MainCamera>>,
    mesh_query: Query<(&Mesh3d, &GlobalTransform)>,
    meshes: Res<Assets<Mesh>>,
    mut camera_query: Query<(&mut Transform, &mut Projection), With<MainCamera>>,
) {
    let ModelPhase::Spawning(entity) = state.phase else {
        return;
    };
    let Ok(instance) = roots.get(entity) else {
        return;
    };
    if !spawner.instance_is_ready(**instance) {
        return;
    }

    // The whole scene is framed; the panel only drives one node
    let bounds = measure_bounds(entity, &children, &mesh_query, &meshes);
    tracing::info!(
        "Model bounds: min={:?} max={:?} size={:?}",
        bounds.min,
        bounds.max,
        bounds.size()
    );

    let config = &settings.0;
    if let Ok((mut transform, mut projection)) = camera_query.single_mut() {
        let mut rig = CameraRig {
            transform: &mut transform,
            projection: &mut projection,
        };
        match apply_fit(&mut rig, &bounds, Some(config.fit.offset), Some(&mut *orbit)) {
            Ok(result) => {
                orbit.sync_to_position(transform.translation);
                tracing::info!(
                    "Camera fitted: distance={:.3} far={:.3}",
                    result.camera_distance,
                    result.far_plane_distance
                );
                state.last_fit = Some(result);
            }
            Err(e) => tracing::warn!("Camera fit skipped: {}", e),
        }
    }

    let node = controlled_node(entity, &children, |e| cameras.contains(e));
    let node_bounds = measure_bounds(node, &children, &mesh_query, &meshes);
    let (position, scale, visible) = match nodes.get(node) {
        Ok((transform, visibility)) => (
            transform.translation.as_dvec3(),
            transform.scale.x as f64,
            visibility != Some(&Visibility::Hidden),
        ),
        Err(_) => (DVec3::ZERO, 1.0, true),
    };
    commands.entity(node).insert(ControlledNode);

    controls.0 = Some(ModelControls::for_model(
        &node_bounds,
        position,
        scale,
        visible,
        config.panel.position_step,
        config.panel.scale_max,
    ));
    state.phase = ModelPhase::Ready(entity);
}

/// Node the panel controls for a spawned scene.
///
/// The glTF loader puts a single scene root under the `SceneRoot` entity;
/// its first child that is not a camera is chosen. Falls back to the scene
/// root, then to `root`, when the scene has no such child.
pub fn controlled_node(
    root: Entity,
    children: &Query<&Children>,
    is_camera: impl Fn(Entity) -> bool,
) -> Entity {
    let scene = children
        .get(root)
        .ok()
        .and_then(|c| first_non_camera(c, &is_camera))
        .unwrap_or(root);
    children
        .get(scene)
        .ok()
        .and_then(|c| first_non_camera(c, &is_camera))
        .unwrap_or(scene)
}

fn first_non_camera(nodes: &[Entity], is_camera: impl Fn(Entity) -> bool) -> Option<Entity> {
    nodes.iter().copied().find(|&e| !is_camera(e))
}

/// Write panel values to the controlled node
fn apply_model_controls(
    controls: Res<ActiveControls>,
    mut models: Query<(&mut Transform, &mut Visibility), (With<ControlledNode>, Without<MainCamera>)>,
) {
    if !controls.is_changed() {
        return;
    }
    let Some(values) = &controls.0 else {
        return;
    };

    for (mut transform, mut visibility) in &mut models {
        transform.translation = values.position().as_vec3();
        transform.scale = values.scale().as_vec3();
        *visibility = if values.visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }
}

/// World-space bounds of every mesh under `root`, from the eight corners of
/// each mesh's local box after its global transform.
pub fn measure_bounds(
    root: Entity,
    children: &Query<&Children>,
    mesh_query: &Query<(&Mesh3d, &GlobalTransform)>,
    meshes: &Assets<Mesh>,
) -> BoundingBox {
    std::iter::once(root)
        .chain(children.iter_descendants(root))
        .filter_map(|entity| mesh_query.get(entity).ok())
        .filter_map(|(mesh, global)| meshes.get(&mesh.0).map(|mesh| (mesh, global)))
        .map(|(mesh, global)| {
            local_bounds(mesh).transformed(|p| global.transform_point(p.as_vec3()).as_dvec3())
        })
        .fold(BoundingBox::EMPTY, |acc, b| acc.union(&b))
}

/// Bounds of a mesh's vertex positions in its own space
pub fn local_bounds(mesh: &Mesh) -> BoundingBox {
    mesh.compute_aabb()
        .map(|aabb| {
            let center = Vec3::from(aabb.center).as_dvec3();
            let half = Vec3::from(aabb.half_extents).as_dvec3();
            BoundingBox::new(center - half, center + half)
        })
        .unwrap_or(BoundingBox::EMPTY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bevy::asset::{AssetLoadError, AssetPath, RenderAssetUsages};
    use bevy::ecs::system::SystemState;
    use bevy::render::render_resource::PrimitiveTopology;
    use std::sync::Arc;

    #[test]
    fn test_local_bounds_from_positions() {
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
        mesh.insert_attribute(
            Mesh::ATTRIBUTE_POSITION,
            vec![[-1.0_f32, 0.0, 2.0], [3.0, -2.0, 0.5], [0.0, 1.0, -1.0]],
        );
        let bounds = local_bounds(&mesh);
        assert_eq!(bounds.min, DVec3::new(-1.0, -2.0, -1.0));
        assert_eq!(bounds.max, DVec3::new(3.0, 1.0, 2.0));
    }

    #[test]
    fn test_local_bounds_without_positions() {
        let mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
        assert!(local_bounds(&mesh).is_empty());
    }

    #[test]
    fn test_measure_bounds_transforms_corners() {
        let mut world = World::new();
        let mut meshes = Assets::<Mesh>::default();
        let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
        mesh.insert_attribute(
            Mesh::ATTRIBUTE_POSITION,
            vec![[-0.5_f32, -0.5, -0.5], [0.5, 0.5, 0.5]],
        );
        let handle = meshes.add(mesh);
        world.insert_resource(meshes);

        let rotated = Transform::from_xyz(2.0, 0.0, 0.0)
            .with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_4));
        let child = world
            .spawn((Mesh3d(handle), GlobalTransform::from(rotated)))
            .id();
        let root = world.spawn_empty().add_children(&[child]).id();

        let mut state: SystemState<(
            Query<&Children>,
            Query<(&Mesh3d, &GlobalTransform)>,
            Res<Assets<Mesh>>,
        )> = SystemState::new(&mut world);
        let (children, mesh_query, meshes) = state.get(&world);
        let bounds = measure_bounds(root, &children, &mesh_query, &meshes);

        let half_diagonal = 0.5 * std::f64::consts::SQRT_2;
        assert_relative_eq!(bounds.min.x, 2.0 - half_diagonal, epsilon = 1e-5);
        assert_relative_eq!(bounds.max.x, 2.0 + half_diagonal, epsilon = 1e-5);
        assert_relative_eq!(bounds.min.y, -0.5, epsilon = 1e-6);
        assert_relative_eq!(bounds.max.z, half_diagonal, epsilon = 1e-5);

        assert!(measure_bounds(child, &children, &mesh_query, &meshes).max.x > 2.0);
    }

    #[test]
    fn test_load_failure_reports_dependencies() {
        let err = || {
            Arc::new(AssetLoadError::CannotLoadProcessedAsset {
                path: AssetPath::from("upload://model-1.bin"),
            })
        };

        assert!(load_failure(Some(&LoadState::Loading), None).is_none());
        assert!(load_failure(
            Some(&LoadState::Loaded),
            Some(&RecursiveDependencyLoadState::Loading)
        )
        .is_none());

        let root = load_failure(Some(&LoadState::Failed(err())), None).unwrap();
        assert!(root.starts_with("Error loading model:"));

        let dependency = load_failure(
            Some(&LoadState::Loaded),
            Some(&RecursiveDependencyLoadState::Failed(err())),
        )
        .unwrap();
        assert!(dependency.starts_with("Error loading model dependency:"));
    }

    #[test]
    fn test_controlled_node_skips_cameras() {
        let mut world = World::new();
        let camera = world.spawn_empty().id();
        let first = world.spawn_empty().id();
        let second = world.spawn_empty().id();
        let scene = world.spawn_empty().add_children(&[camera, first, second]).id();
        let root = world.spawn_empty().add_children(&[scene]).id();

        let mut state: SystemState<Query<&Children>> = SystemState::new(&mut world);
        let children = state.get(&world);

        assert_eq!(controlled_node(root, &children, |e| e == camera), first);
        assert_eq!(controlled_node(root, &children, |_| false), camera);
    }

    #[test]
    fn test_controlled_node_falls_back_to_scene_root() {
        let mut world = World::new();
        let scene = world.spawn_empty().id();
        let root = world.spawn_empty().add_children(&[scene]).id();
        let lonely = world.spawn_empty().id();

        let mut state: SystemState<Query<&Children>> = SystemState::new(&mut world);
        let children = state.get(&world);

        assert_eq!(controlled_node(root, &children, |_| false), scene);
        assert_eq!(controlled_node(lonely, &children, |_| false), lonely);
    }

    #[test]
    fn test_loading_phases() {
        let mut state = ModelLoadState::default();
        assert!(!state.is_loading());
        state.phase = ModelPhase::Spawning(Entity::PLACEHOLDER);
        assert!(state.is_loading());
        state.phase = ModelPhase::Ready(Entity::PLACEHOLDER);
        assert!(!state.is_loading());
    }

    #[test]
    fn test_uploads_queue() {
        let uploads = ModelUploads::default();
        uploads.push(Err("Read error".to_string()));
        uploads.push(Ok(ModelFile {
            name: "cube.glb".to_string(),
            bytes: vec![1, 2, 3],
        }));
        let queue = uploads.0.lock().unwrap();
        assert_eq!(queue.len(), 2);
        assert!(queue[0].is_err());
    }
}
