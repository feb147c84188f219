//! 3D globe viewer with a catalog of placeable glTF models, using Bevy.
//!
//! [`GlobeViewerPlugin`] is the root viewer component: it mounts one viewer
//! instance into the primary window, keeps it for as long as it is mounted
//! and releases it on exit. [`run`] builds and runs the whole application.

pub mod async_runtime;
pub mod camera;
pub mod catalog;
pub mod clock;
pub mod error;
pub mod floating_origin;
pub mod geodesy;
pub mod globe;
pub mod launch_params;
pub mod models;
pub mod mount;
pub mod options;
pub mod ui;
pub mod update_check;

use bevy::prelude::*;

use async_runtime::AsyncRuntimePlugin;
use camera::CameraControllerPlugin;
use catalog::ModelCatalog;
use clock::ClockPlugin;
use floating_origin::FloatingOriginPlugin;
use globe::GlobePlugin;
use launch_params::LaunchParams;
use models::{ModelPlugin, ModelRequests, ModelScenePlugin};
use mount::ViewerLifecyclePlugin;
use ui::ViewerUiPlugin;
use update_check::{UpdateCheckConfig, UpdateCheckPlugin};

/// The root viewer component and everything the mounted viewer needs,
/// including the background runtime used by the update check.
///
/// Configure it by inserting [`options::ViewerConfig`], [`ModelCatalog`] and
/// [`UpdateCheckConfig`] before the first update; defaults are used otherwise.
pub struct GlobeViewerPlugin;

impl Plugin for GlobeViewerPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            AsyncRuntimePlugin,
            FloatingOriginPlugin,
            ViewerLifecyclePlugin,
            ModelPlugin,
            ModelScenePlugin,
            CameraControllerPlugin,
            ClockPlugin,
            GlobePlugin,
            ViewerUiPlugin,
            UpdateCheckPlugin,
        ));
    }
}

/// Pick the model catalog for `params`, falling back to the built-in one.
pub fn load_catalog(params: &LaunchParams) -> ModelCatalog {
    let Some(path) = &params.catalog else {
        return ModelCatalog::builtin();
    };

    match ModelCatalog::load(path) {
        Ok(catalog) => {
            tracing::info!("Loaded {} models from {}", catalog.len(), path.display());
            catalog
        }
        Err(e) => {
            tracing::error!("{e}; using the built-in catalog");
            ModelCatalog::builtin()
        }
    }
}

/// Build and run the viewer application.
pub fn run(params: LaunchParams) -> AppExit {
    let catalog = load_catalog(&params);

    let mut app = App::new();

    #[allow(unused_mut)]
    let mut window = Window {
        title: "Globe Viewer".to_string(),
        resolution: (1280, 720).into(),
        position: WindowPosition::Centered(MonitorSelection::Primary),
        ..Default::default()
    };

    // WASM: keep the browser from handling input meant for the viewer.
    #[cfg(target_family = "wasm")]
    {
        window.prevent_default_event_handling = true;
    }

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(window),
        ..Default::default()
    }))
    .insert_resource(params.config)
    .insert_resource(catalog)
    .insert_resource(UpdateCheckConfig {
        manifest_url: params.update_url,
    })
    .add_plugins(GlobeViewerPlugin);

    if let Some(label) = params.model {
        app.world_mut()
            .resource_mut::<ModelRequests>()
            .request_place(label);
    }

    app.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_catalog_falls_back_to_builtin() {
        let params = LaunchParams {
            catalog: Some("/nonexistent/catalog.json".into()),
            ..Default::default()
        };
        assert_eq!(load_catalog(&params).len(), ModelCatalog::builtin().len());
    }

    #[test]
    fn test_catalog_file_replaces_builtin() {
        let path = std::env::temp_dir().join(format!(
            "globe-viewer-catalog-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"[{ "label": "Tower", "position": { "latitude": 1.0, "longitude": 2.0 }, "model": "tower.glb" }]"#,
        )
        .unwrap();

        let params = LaunchParams {
            catalog: Some(path.clone()),
            ..Default::default()
        };
        let catalog = load_catalog(&params);
        std::fs::remove_file(&path).unwrap();

        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("Tower").is_some());
    }
}
