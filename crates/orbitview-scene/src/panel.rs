//! Model viewer panel using bevy_egui

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use orbitview_core::controls::Axis;
use orbitview_core::ModelControls;

use crate::model::{FileDialogRequest, ModelLoadState};
use crate::ViewerSettings;

/// Controls generated for the current model; `None` until one is ready
#[derive(Debug, Clone, Resource, Default)]
pub struct ActiveControls(pub Option<ModelControls>);

pub struct PanelPlugin;

impl Plugin for PanelPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ActiveControls>()
            .add_systems(EguiPrimaryContextPass, panel_system);
    }
}

fn panel_system(
    mut contexts: EguiContexts,
    settings: Res<ViewerSettings>,
    state: Res<ModelLoadState>,
    mut controls: ResMut<ActiveControls>,
    mut dialog: ResMut<FileDialogRequest>,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };
    let panel = &settings.0.panel;

    // Edit a copy so change detection only fires on real edits
    let mut edited = controls.0.clone();

    egui::Window::new(panel.title.as_str())
        .anchor(egui::Align2::RIGHT_TOP, egui::vec2(0.0, 0.0))
        .default_width(panel.width)
        .resizable(false)
        .show(ctx, |ui| {
            egui::CollapsingHeader::new("Load")
                .default_open(true)
                .show(ui, |ui| {
                    // A new file replaces any load still in progress
                    if ui.button("Load file").clicked() {
                        dialog.0 = true;
                    }
                    load_status(ui, &state);
                });

            if let Some(values) = edited.as_mut() {
                model_sections(ui, values);
            }
        });

    if edited != controls.0 {
        controls.0 = edited;
    }
}

fn load_status(ui: &mut egui::Ui, state: &ModelLoadState) {
    if let Some(error) = &state.error {
        ui.label(egui::RichText::new(error).color(egui::Color32::from_rgb(255, 100, 100)));
    } else if state.is_loading() {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label(state.name.as_deref().unwrap_or("Loading..."));
        });
    } else if let Some(name) = &state.name {
        ui.label(egui::RichText::new(name).color(egui::Color32::GRAY));
    } else {
        ui.label(egui::RichText::new("Select a .glb or .gltf file").color(egui::Color32::GRAY));
    }
}

fn model_sections(ui: &mut egui::Ui, values: &mut ModelControls) {
    egui::CollapsingHeader::new("Position")
        .default_open(true)
        .show(ui, |ui| {
            for axis in Axis::PANEL_ORDER {
                let ranged = values.axis_mut(axis);
                let mut value = ranged.value;
                let slider = egui::Slider::new(&mut value, ranged.min..=ranged.max)
                    .step_by(ranged.step)
                    .text(axis.label());
                if ui.add(slider).changed() {
                    ranged.set(value);
                }
            }
        });

    egui::CollapsingHeader::new("Scale")
        .default_open(true)
        .show(ui, |ui| {
            let mut scale = values.scale.value;
            let slider = egui::Slider::new(&mut scale, values.scale.min..=values.scale.max).text("Scale");
            if ui.add(slider).changed() {
                values.set_scale(scale);
            }
        });

    egui::CollapsingHeader::new("Display")
        .default_open(true)
        .show(ui, |ui| {
            ui.checkbox(&mut values.visible, "visible");
        });
}
