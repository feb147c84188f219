//! Viewer chrome: model picker, info box, selection indicator and update notice.
//!
//! The info box and selection indicator only appear when the mounted viewer
//! was constructed with the matching option.

use bevy::math::Isometry3d;
use bevy::prelude::*;
use bevy_egui::{EguiContexts, EguiPlugin, EguiPrimaryContextPass, egui};

use crate::catalog::ModelCatalog;
use crate::clock::ViewerClock;
use crate::floating_origin::{FloatingOrigin, WorldPosition};
use crate::models::{ModelRequests, NOMINAL_MODEL_RADIUS, PlacedModel, SelectedEntity, TrackedEntity};
use crate::mount::ViewerInstance;
use crate::update_check::{CURRENT_VERSION, UpdateStatus};

/// Plugin for the viewer's egui overlay and selection gizmo.
pub struct ViewerUiPlugin;

impl Plugin for ViewerUiPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(EguiPlugin::default())
            .add_systems(EguiPrimaryContextPass, (model_picker_system, info_box_system))
            .add_systems(Update, draw_selection_indicator);
    }
}

/// Format a height in meters for display.
fn format_height(meters: f64) -> String {
    if meters.abs() >= 1_000.0 {
        format!("{:.1} km", meters / 1_000.0)
    } else {
        format!("{meters:.0} m")
    }
}

/// Rows shown in the info box for a placed model.
fn describe_model(model: &PlacedModel) -> Vec<(&'static str, String)> {
    vec![
        ("Latitude", format!("{:.5}°", model.position.latitude)),
        ("Longitude", format!("{:.5}°", model.position.longitude)),
        ("Height", format_height(model.position.height)),
        (
            "Heading",
            format!("{:.0}°", model.orientation.heading.to_degrees()),
        ),
        ("Model", model.model.clone()),
    ]
}

#[allow(clippy::needless_pass_by_value, clippy::too_many_arguments)]
fn model_picker_system(
    mut contexts: EguiContexts,
    catalog: Res<ModelCatalog>,
    mut requests: ResMut<ModelRequests>,
    mut tracked: ResMut<TrackedEntity>,
    mut clock: ResMut<ViewerClock>,
    status: Res<UpdateStatus>,
    viewers: Query<&ViewerInstance>,
    models: Query<&PlacedModel>,
) -> Result {
    let ctx = contexts.ctx_mut()?;
    let mounted = !viewers.is_empty();

    egui::Window::new("Models")
        .default_pos([10.0, 10.0])
        .show(ctx, |ui| {
            if !mounted {
                ui.label("Viewer not mounted");
                return;
            }

            for entry in catalog.iter() {
                if ui.button(entry.label.as_str()).clicked() {
                    requests.request_place(entry.label.clone());
                }
            }

            ui.separator();
            match tracked.0.and_then(|entity| models.get(entity).ok()) {
                Some(model) => {
                    ui.label(format!("Tracking: {}", model.label));
                    if ui.button("Stop tracking").clicked() {
                        tracked.0 = None;
                    }
                }
                None => {
                    ui.label("Drag to rotate, scroll to zoom");
                }
            }

            ui.separator();
            let hours = clock.utc_hours();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let (h, m) = (hours as u32, (hours.fract() * 60.0) as u32);
            ui.label(format!("UTC {h:02}:{m:02}"));
            ui.add(
                egui::Slider::new(&mut clock.multiplier, 1.0..=3600.0)
                    .logarithmic(true)
                    .text("Speed"),
            );

            if let UpdateStatus::Available { version } = status.as_ref() {
                ui.separator();
                ui.colored_label(
                    egui::Color32::LIGHT_GREEN,
                    format!("Version {version} is available (running {CURRENT_VERSION})"),
                );
            }
        });

    Ok(())
}

#[allow(clippy::needless_pass_by_value)]
fn info_box_system(
    mut contexts: EguiContexts,
    selected: Res<SelectedEntity>,
    viewers: Query<&ViewerInstance>,
    models: Query<&PlacedModel>,
) -> Result {
    let Ok(viewer) = viewers.single() else {
        return Ok(());
    };
    if !viewer.options.info_box {
        return Ok(());
    }
    let Some(model) = selected.0.and_then(|entity| models.get(entity).ok()) else {
        return Ok(());
    };

    let ctx = contexts.ctx_mut()?;
    egui::Window::new(model.label.as_str())
        .id(egui::Id::new("info_box"))
        .anchor(egui::Align2::RIGHT_TOP, [-10.0, 10.0])
        .resizable(false)
        .show(ctx, |ui| {
            egui::Grid::new("info_box_grid").show(ui, |ui| {
                for (name, value) in describe_model(model) {
                    ui.label(name);
                    ui.label(value);
                    ui.end_row();
                }
            });
        });

    Ok(())
}

#[allow(clippy::needless_pass_by_value)]
fn draw_selection_indicator(
    mut gizmos: Gizmos,
    origin: Res<FloatingOrigin>,
    selected: Res<SelectedEntity>,
    viewers: Query<&ViewerInstance>,
    models: Query<(&WorldPosition, &Transform), With<PlacedModel>>,
) {
    let Ok(viewer) = viewers.single() else {
        return;
    };
    if !viewer.options.selection_indicator {
        return;
    }
    let Some((world_position, transform)) = selected.0.and_then(|entity| models.get(entity).ok())
    else {
        return;
    };

    let center = (world_position.position - origin.position).as_vec3();
    #[allow(clippy::cast_possible_truncation)]
    let radius = NOMINAL_MODEL_RADIUS as f32 * transform.scale.max_element() * 1.5;
    gizmos.sphere(
        Isometry3d::from_translation(center),
        radius,
        Color::srgb(0.2, 1.0, 0.2),
    );
}
