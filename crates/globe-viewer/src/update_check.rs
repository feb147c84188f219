//! Background check for a newer viewer release.
//!
//! The check is registered once per process at startup, however many times
//! the viewer is mounted. If a manifest URL is configured, one background
//! request fetches `{ "version": "x.y.z" }` and the result is compared with
//! the running package version. Failures are logged and otherwise ignored.

use bevy::prelude::*;
use serde::Deserialize;

use crate::async_runtime::BackgroundTasks;
use crate::error::{Result, ViewerError};

/// User agent for update requests.
const USER_AGENT: &str = concat!("globe-viewer/", env!("CARGO_PKG_VERSION"));

/// Version of the running viewer.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Plugin for the startup update check.
pub struct UpdateCheckPlugin;

impl Plugin for UpdateCheckPlugin {
    fn build(&self, app: &mut App) {
        match reqwest::Client::builder().user_agent(USER_AGENT).build() {
            Ok(client) => {
                app.insert_resource(HttpClient(client));
            }
            Err(e) => tracing::error!("Failed to create HTTP client, update check disabled: {e}"),
        }

        app.init_resource::<UpdateCheckConfig>()
            .init_resource::<UpdateCheckRegistration>()
            .init_resource::<UpdateCheckChannel>()
            .init_resource::<UpdateStatus>()
            .add_systems(Startup, register_update_check)
            .add_systems(
                Update,
                (
                    dispatch_update_check
                        .run_if(resource_exists::<HttpClient>.and(update_check_pending)),
                    poll_update_check,
                ),
            );
    }
}

// ============================================================================
// Resources
// ============================================================================

/// Shared HTTP client for update requests.
#[derive(Resource, Clone)]
pub struct HttpClient(reqwest::Client);

/// Where to look for the latest release manifest.
#[derive(Resource, Default, Debug, Clone)]
pub struct UpdateCheckConfig {
    pub manifest_url: Option<String>,
}

/// Tracks registration of the update check.
#[derive(Resource, Default, Debug)]
pub struct UpdateCheckRegistration {
    registrations: u32,
    pending_url: Option<String>,
}

impl UpdateCheckRegistration {
    /// Register the check. Returns `false` if it was already registered.
    pub fn register(&mut self, manifest_url: Option<String>) -> bool {
        if self.registrations > 0 {
            return false;
        }
        self.registrations += 1;
        self.pending_url = manifest_url;
        true
    }

    /// Number of times the check has been registered.
    pub fn registrations(&self) -> u32 {
        self.registrations
    }

    /// Whether a request is waiting to be sent.
    pub fn is_pending(&self) -> bool {
        self.pending_url.is_some()
    }
}

/// Outcome of the update check.
#[derive(Resource, Default, Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    #[default]
    NotChecked,
    Checking,
    UpToDate,
    Available {
        version: String,
    },
    Failed,
}

/// Carries the fetched version back from the background task.
#[derive(Resource)]
pub struct UpdateCheckChannel {
    tx: async_channel::Sender<Result<String>>,
    rx: async_channel::Receiver<Result<String>>,
}

impl Default for UpdateCheckChannel {
    fn default() -> Self {
        let (tx, rx) = async_channel::bounded(1);
        Self { tx, rx }
    }
}

/// Release manifest served at the update URL.
#[derive(Debug, Deserialize)]
struct VersionManifest {
    version: String,
}

// ============================================================================
// Versions
// ============================================================================

/// Parse a dotted numeric version such as `1.2.3` or `v0.4`.
pub fn parse_version(version: &str) -> Result<Vec<u64>> {
    let trimmed = version.trim();
    let digits = trimmed.strip_prefix('v').unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(ViewerError::InvalidVersion {
            version: version.to_string(),
        });
    }

    digits
        .split('.')
        .map(|part| {
            part.parse::<u64>().map_err(|_| ViewerError::InvalidVersion {
                version: version.to_string(),
            })
        })
        .collect()
}

/// Whether `candidate` is a later version than `current`.
///
/// Missing trailing components count as zero, so `1.2` equals `1.2.0`.
pub fn is_newer(candidate: &str, current: &str) -> Result<bool> {
    let candidate = parse_version(candidate)?;
    let current = parse_version(current)?;

    let len = candidate.len().max(current.len());
    let component = |parts: &[u64], i: usize| parts.get(i).copied().unwrap_or(0);
    for i in 0..len {
        let (a, b) = (component(&candidate, i), component(&current, i));
        if a != b {
            return Ok(a > b);
        }
    }
    Ok(false)
}

async fn fetch_latest_version(client: &reqwest::Client, url: &str) -> Result<String> {
    let to_error = |e: reqwest::Error| ViewerError::UpdateCheck {
        url: url.to_string(),
        message: e.to_string(),
    };

    let manifest: VersionManifest = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(to_error)?
        .json()
        .await
        .map_err(to_error)?;
    Ok(manifest.version)
}

// ============================================================================
// Systems
// ============================================================================

#[allow(clippy::needless_pass_by_value)]
fn register_update_check(
    mut registration: ResMut<UpdateCheckRegistration>,
    config: Res<UpdateCheckConfig>,
) {
    if !registration.register(config.manifest_url.clone()) {
        return;
    }
    match &config.manifest_url {
        Some(url) => tracing::info!("Registered update check against {url}"),
        None => tracing::debug!("No update URL configured, skipping update check"),
    }
}

fn update_check_pending(registration: Res<UpdateCheckRegistration>) -> bool {
    registration.is_pending()
}

#[allow(clippy::needless_pass_by_value)]
fn dispatch_update_check(
    mut registration: ResMut<UpdateCheckRegistration>,
    mut status: ResMut<UpdateStatus>,
    client: Res<HttpClient>,
    channel: Res<UpdateCheckChannel>,
    tasks: BackgroundTasks,
) {
    let Some(url) = registration.pending_url.take() else {
        return;
    };

    *status = UpdateStatus::Checking;
    let client = client.0.clone();
    tasks.deliver("update check", channel.tx.clone(), async move {
        fetch_latest_version(&client, &url).await
    });
}

#[allow(clippy::needless_pass_by_value)]
fn poll_update_check(channel: Res<UpdateCheckChannel>, mut status: ResMut<UpdateStatus>) {
    let Ok(result) = channel.rx.try_recv() else {
        return;
    };

    *status = match result.and_then(|latest| Ok((is_newer(&latest, CURRENT_VERSION)?, latest))) {
        Ok((true, version)) => {
            tracing::info!("Update available: {version} (running {CURRENT_VERSION})");
            UpdateStatus::Available { version }
        }
        Ok((false, version)) => {
            tracing::debug!("Viewer is up to date (latest {version})");
            UpdateStatus::UpToDate
        }
        Err(e) => {
            tracing::warn!("Update check failed: {e}");
            UpdateStatus::Failed
        }
    };
}
