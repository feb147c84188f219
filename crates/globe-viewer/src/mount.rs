//! Viewer lifecycle: mounting one viewer instance into the primary window.
//!
//! The root viewer component owns a single viewer instance for as long as it
//! is mounted. A viewer instance is an entity hierarchy (root, camera, sun,
//! globe) bound to the primary window, which acts as its mount point.
//!
//! ## Lifecycle
//!
//! ```text
//! Unmounted --mount--> Mounted --unmount/exit--> Unmounted
//!                      Mounted --mount--> Mounted (declined, no new instance)
//! ```
//!
//! Mount and unmount requests go through [`ViewerRequests`] and are applied
//! by one exclusive system at the start of each frame. Construction is
//! scoped: if any step fails, everything spawned so far is despawned before
//! the error is returned.

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use crate::camera::GlobeCamera;
use crate::clock::Sun;
use crate::error::{Result, ViewerError};
use crate::floating_origin::{FloatingOriginCamera, WorldPosition};
use crate::globe::Globe;
use crate::options::{ViewerConfig, ViewerOptions};

/// Plugin for the viewer mount lifecycle.
///
/// Requests an initial mount on startup and releases the viewer on exit.
pub struct ViewerLifecyclePlugin;

impl Plugin for ViewerLifecyclePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ViewerConfig>()
            .init_resource::<ViewerMount>()
            .init_resource::<ViewerRequests>()
            .init_resource::<ViewerLifecycleStats>()
            .add_systems(Startup, request_initial_mount)
            .add_systems(PreUpdate, process_viewer_requests)
            .add_systems(Last, release_on_exit);
    }
}

// ============================================================================
// Components and resources
// ============================================================================

/// Marker for the root entity of a viewer instance.
#[derive(Component)]
pub struct ViewerRoot;

/// A constructed viewer instance.
#[derive(Component, Debug, Clone, Copy)]
pub struct ViewerInstance {
    /// The window the viewer is bound to.
    pub mount_point: Entity,
    /// Options the viewer was constructed with.
    pub options: ViewerOptions,
    /// Whether the viewer fills its mount point.
    pub fill: bool,
    /// Logical size of the drawing surface at construction time.
    pub surface: Vec2,
}

/// The currently mounted viewer, if any.
#[derive(Resource, Default, Debug)]
pub struct ViewerMount {
    root: Option<Entity>,
}

impl ViewerMount {
    /// Root entity of the mounted viewer.
    pub fn root(&self) -> Option<Entity> {
        self.root
    }

    pub fn is_mounted(&self) -> bool {
        self.root.is_some()
    }
}

/// Counts of viewer constructions and releases over the app's lifetime.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerLifecycleStats {
    pub constructed: u32,
    pub released: u32,
}

/// A requested lifecycle change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerRequest {
    Mount,
    Unmount,
}

/// Pending lifecycle requests, applied in order at the start of the frame.
#[derive(Resource, Default)]
pub struct ViewerRequests {
    pending: Vec<ViewerRequest>,
}

impl ViewerRequests {
    /// Request that the viewer be mounted. Ignored if already mounted.
    pub fn request_mount(&mut self) {
        self.pending.push(ViewerRequest::Mount);
    }

    /// Request that the mounted viewer be released.
    pub fn request_unmount(&mut self) {
        self.pending.push(ViewerRequest::Unmount);
    }

    fn take(&mut self) -> Vec<ViewerRequest> {
        std::mem::take(&mut self.pending)
    }
}

// ============================================================================
// Scoped construction
// ============================================================================

/// Despawns every entity it spawned unless committed.
struct SpawnGuard<'w> {
    world: &'w mut World,
    spawned: Vec<Entity>,
}

impl<'w> SpawnGuard<'w> {
    fn new(world: &'w mut World) -> Self {
        Self {
            world,
            spawned: Vec::new(),
        }
    }

    fn spawn(&mut self, bundle: impl Bundle) -> Entity {
        let entity = self.world.spawn(bundle).id();
        self.spawned.push(entity);
        entity
    }

    fn world(&mut self) -> &mut World {
        self.world
    }

    /// Keep everything spawned so far.
    fn commit(mut self) {
        self.spawned.clear();
    }
}

impl Drop for SpawnGuard<'_> {
    fn drop(&mut self) {
        for entity in self.spawned.drain(..).rev() {
            // Children go with their parent, so later entities may already be gone.
            if self.world.get_entity(entity).is_ok() {
                self.world.despawn(entity);
            }
        }
    }
}

// ============================================================================
// Mount / unmount
// ============================================================================

/// Mount the viewer into the primary window.
///
/// Returns the root of the mounted viewer. If a viewer is already mounted it
/// is returned unchanged and nothing new is constructed.
pub fn mount_viewer(world: &mut World) -> Result<Entity> {
    if let Some(root) = world.resource::<ViewerMount>().root {
        tracing::debug!("Viewer already mounted, declining remount");
        return Ok(root);
    }

    let config = world
        .get_resource::<ViewerConfig>()
        .copied()
        .unwrap_or_default();

    let mount_point = world
        .query_filtered::<Entity, (With<Window>, With<PrimaryWindow>)>()
        .iter(world)
        .next()
        .ok_or(ViewerError::MissingMountPoint)?;

    let mut guard = SpawnGuard::new(world);
    let root = guard.spawn((
        ViewerRoot,
        Name::new("Globe Viewer"),
        Transform::default(),
        Visibility::default(),
    ));

    let surface = surface_size(guard.world(), mount_point, config.fill)?;
    guard.world().entity_mut(root).insert(ViewerInstance {
        mount_point,
        options: config.options,
        fill: config.fill,
        surface,
    });

    let camera = GlobeCamera::default();
    guard.spawn((
        Name::new("Viewer Camera"),
        camera,
        FloatingOriginCamera::new(camera.eye()),
        Transform::default(),
        ChildOf(root),
    ));
    guard.spawn((
        Name::new("Sun"),
        Sun {
            shadows: config.options.shadows,
        },
        Transform::default(),
        ChildOf(root),
    ));
    guard.spawn((
        Name::new("Globe"),
        Globe,
        WorldPosition::default(),
        Transform::default(),
        Visibility::default(),
        ChildOf(root),
    ));

    guard.commit();

    world.resource_mut::<ViewerMount>().root = Some(root);
    world.resource_mut::<ViewerLifecycleStats>().constructed += 1;
    tracing::info!(
        "Mounted viewer ({}x{}, shadows: {}, animate: {})",
        surface.x,
        surface.y,
        config.options.shadows,
        config.options.should_animate
    );
    Ok(root)
}

/// Release the mounted viewer and everything it owns.
///
/// Returns `false` if nothing was mounted.
pub fn unmount_viewer(world: &mut World) -> bool {
    let Some(root) = world.resource_mut::<ViewerMount>().root.take() else {
        return false;
    };

    if world.get_entity(root).is_ok() {
        world.despawn(root);
    }
    world.resource_mut::<ViewerLifecycleStats>().released += 1;
    tracing::info!("Released viewer");
    true
}

/// Size of the mount point's drawable area, applying the fill flag.
fn surface_size(world: &mut World, mount_point: Entity, fill: bool) -> Result<Vec2> {
    let Some(mut window) = world.get_mut::<Window>(mount_point) else {
        return Err(ViewerError::MissingMountPoint);
    };

    let (width, height) = (window.width(), window.height());
    if width <= 0.0 || height <= 0.0 {
        return Err(ViewerError::EmptyMountPoint { width, height });
    }

    if fill {
        #[cfg(target_family = "wasm")]
        {
            window.fit_canvas_to_parent = true;
        }
        #[cfg(not(target_family = "wasm"))]
        window.set_maximized(true);
    }
    Ok(Vec2::new(width, height))
}

// ============================================================================
// Systems
// ============================================================================

fn request_initial_mount(mut requests: ResMut<ViewerRequests>) {
    requests.request_mount();
}

/// Apply pending mount/unmount requests.
fn process_viewer_requests(world: &mut World) {
    let pending = world.resource_mut::<ViewerRequests>().take();
    for request in pending {
        match request {
            ViewerRequest::Mount => {
                if let Err(e) = mount_viewer(world) {
                    tracing::error!("Failed to mount viewer: {e}");
                }
            }
            ViewerRequest::Unmount => {
                if !unmount_viewer(world) {
                    tracing::debug!("Unmount requested with no viewer mounted");
                }
            }
        }
    }
}

/// Release the viewer when the app exits.
fn release_on_exit(mut exit: MessageReader<AppExit>, mut commands: Commands) {
    if exit.read().next().is_some() {
        commands.queue(|world: &mut World| {
            unmount_viewer(world);
        });
    }
}

#[cfg(test)]
mod tests {
    use bevy::window::WindowResolution;

    use super::*;

    fn app_with_mount_point(width: u32, height: u32) -> App {
        let mut app = App::new();
        app.add_plugins(ViewerLifecyclePlugin);
        app.world_mut().spawn((
            Window {
                resolution: WindowResolution::new(width, height),
                ..Default::default()
            },
            PrimaryWindow,
        ));
        app
    }

    fn count<F: bevy::ecs::query::QueryFilter>(app: &mut App) -> usize {
        app.world_mut()
            .query_filtered::<Entity, F>()
            .iter(app.world())
            .count()
    }

    #[test]
    fn test_mount_constructs_one_viewer_with_default_options() {
        let mut app = app_with_mount_point(800, 600);
        app.update();

        let stats = *app.world().resource::<ViewerLifecycleStats>();
        assert_eq!(stats.constructed, 1);
        assert_eq!(count::<With<ViewerRoot>>(&mut app), 1);

        let root = app.world().resource::<ViewerMount>().root().unwrap();
        let instance = app.world().get::<ViewerInstance>(root).unwrap();
        assert_eq!(
            instance.options,
            ViewerOptions {
                info_box: false,
                selection_indicator: false,
                shadows: true,
                should_animate: true,
            }
        );
        assert_eq!(instance.surface, Vec2::new(800.0, 600.0));
        assert!(instance.fill);

        let sun = app
            .world_mut()
            .query::<&Sun>()
            .single(app.world())
            .unwrap();
        assert!(sun.shadows);
        assert_eq!(count::<With<Globe>>(&mut app), 1);
        assert_eq!(count::<With<GlobeCamera>>(&mut app), 1);
    }

    #[test]
    fn test_remount_is_declined() {
        let mut app = app_with_mount_point(800, 600);
        app.update();
        let first_root = app.world().resource::<ViewerMount>().root();

        for _ in 0..3 {
            app.world_mut()
                .resource_mut::<ViewerRequests>()
                .request_mount();
            app.update();
        }

        assert_eq!(app.world().resource::<ViewerLifecycleStats>().constructed, 1);
        assert_eq!(app.world().resource::<ViewerMount>().root(), first_root);
        assert_eq!(count::<With<ViewerRoot>>(&mut app), 1);
    }

    #[test]
    fn test_unmount_releases_the_viewer() {
        let mut app = app_with_mount_point(800, 600);
        app.update();

        app.world_mut()
            .resource_mut::<ViewerRequests>()
            .request_unmount();
        app.update();

        let stats = *app.world().resource::<ViewerLifecycleStats>();
        assert_eq!(
            stats,
            ViewerLifecycleStats {
                constructed: 1,
                released: 1
            }
        );
        assert!(!app.world().resource::<ViewerMount>().is_mounted());
        assert_eq!(count::<With<ViewerRoot>>(&mut app), 0);
        assert_eq!(count::<With<Globe>>(&mut app), 0);
        assert_eq!(count::<With<Sun>>(&mut app), 0);
        assert_eq!(count::<With<GlobeCamera>>(&mut app), 0);

        // A second unmount has nothing to release.
        app.world_mut()
            .resource_mut::<ViewerRequests>()
            .request_unmount();
        app.update();
        assert_eq!(app.world().resource::<ViewerLifecycleStats>().released, 1);
    }

    #[test]
    fn test_remount_after_unmount_constructs_a_new_viewer() {
        let mut app = app_with_mount_point(800, 600);
        app.update();

        let mut requests = app.world_mut().resource_mut::<ViewerRequests>();
        requests.request_unmount();
        requests.request_mount();
        app.update();

        let stats = *app.world().resource::<ViewerLifecycleStats>();
        assert_eq!(stats.constructed, 2);
        assert_eq!(stats.released, 1);
        assert_eq!(count::<With<ViewerRoot>>(&mut app), 1);
    }

    #[test]
    fn test_missing_mount_point() {
        let mut world = World::new();
        world.init_resource::<ViewerMount>();
        world.init_resource::<ViewerLifecycleStats>();

        let result = mount_viewer(&mut world);
        assert!(matches!(result, Err(ViewerError::MissingMountPoint)));
        assert_eq!(world.resource::<ViewerLifecycleStats>().constructed, 0);
        assert_eq!(
            world
                .query_filtered::<Entity, With<ViewerRoot>>()
                .iter(&world)
                .count(),
            0
        );
    }

    #[test]
    fn test_failed_construction_leaves_nothing_behind() {
        let mut app = app_with_mount_point(800, 0);
        app.world_mut().resource_mut::<ViewerConfig>().fill = false;
        app.update();

        assert!(!app.world().resource::<ViewerMount>().is_mounted());
        assert_eq!(app.world().resource::<ViewerLifecycleStats>().constructed, 0);
        assert_eq!(count::<With<ViewerRoot>>(&mut app), 0);
        assert_eq!(count::<With<GlobeCamera>>(&mut app), 0);
    }

    fn take_maximize_request(app: &mut App) -> Option<bool> {
        app.world_mut()
            .query_filtered::<&mut Window, With<PrimaryWindow>>()
            .single_mut(app.world_mut())
            .unwrap()
            .internal
            .take_maximize_request()
    }

    #[test]
    fn test_failed_construction_leaves_mount_point_untouched() {
        let mut app = app_with_mount_point(800, 0);
        app.update();

        assert!(!app.world().resource::<ViewerMount>().is_mounted());
        assert_eq!(take_maximize_request(&mut app), None);
    }

    #[cfg(not(target_family = "wasm"))]
    #[test]
    fn test_fill_maximizes_mount_point() {
        let mut app = app_with_mount_point(800, 600);
        app.update();

        assert!(app.world().resource::<ViewerMount>().is_mounted());
        assert_eq!(take_maximize_request(&mut app), Some(true));
    }

    #[test]
    fn test_exit_releases_the_viewer() {
        let mut app = app_with_mount_point(800, 600);
        app.update();

        app.world_mut().write_message(AppExit::Success);
        app.update();

        assert_eq!(app.world().resource::<ViewerLifecycleStats>().released, 1);
        assert_eq!(count::<With<ViewerRoot>>(&mut app), 0);
    }
}
