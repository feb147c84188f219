//! Viewer construction options.

use bevy::prelude::*;

/// Feature toggles applied when a viewer instance is constructed.
///
/// These are the only options the viewer recognises; anything else about
/// the scene is fixed by the viewer itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerOptions {
    /// Show the info box describing the selected entity.
    pub info_box: bool,
    /// Draw a marker around the selected entity.
    pub selection_indicator: bool,
    /// Cast shadows from the sun.
    pub shadows: bool,
    /// Advance the viewer clock every frame.
    pub should_animate: bool,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            info_box: false,
            selection_indicator: false,
            shadows: true,
            should_animate: true,
        }
    }
}

/// Configuration for the root viewer component.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Options passed to the viewer instance.
    pub options: ViewerOptions,
    /// Size the viewer surface to fill its mount point.
    pub fill: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            options: ViewerOptions::default(),
            fill: true,
        }
    }
}
