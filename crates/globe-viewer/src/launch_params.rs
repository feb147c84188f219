//! Launch parameters for the viewer.
//!
//! Native builds read them from the command line with clap. WASM builds have
//! no command line and always use the defaults.

use std::path::PathBuf;

use crate::options::{ViewerConfig, ViewerOptions};

/// Launch parameters for the viewer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchParams {
    /// Configuration of the root viewer component.
    pub config: ViewerConfig,
    /// Catalog label of a model to place once the viewer is mounted.
    pub model: Option<String>,
    /// JSON catalog replacing the built-in one.
    pub catalog: Option<PathBuf>,
    /// Release manifest to check for updates.
    pub update_url: Option<String>,
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    #[command(about = "3D globe viewer with a catalog of placeable models")]
    struct CliArgs {
        /// Show the info box for the selected model.
        #[arg(long)]
        info_box: bool,

        /// Draw a marker around the selected model.
        #[arg(long)]
        selection_indicator: bool,

        /// Disable sun shadows.
        #[arg(long)]
        no_shadows: bool,

        /// Start with the clock paused.
        #[arg(long)]
        paused: bool,

        /// Keep the window at its initial size instead of filling the screen.
        #[arg(long)]
        no_fill: bool,

        /// Catalog label of a model to place at startup.
        #[arg(long)]
        model: Option<String>,

        /// JSON model catalog to use instead of the built-in one.
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// URL of a `{ "version": "x.y.z" }` release manifest.
        #[arg(long)]
        update_url: Option<String>,
    }

    impl From<CliArgs> for LaunchParams {
        fn from(args: CliArgs) -> Self {
            LaunchParams {
                config: ViewerConfig {
                    options: ViewerOptions {
                        info_box: args.info_box,
                        selection_indicator: args.selection_indicator,
                        shadows: !args.no_shadows,
                        should_animate: !args.paused,
                    },
                    fill: !args.no_fill,
                },
                model: args.model,
                catalog: args.catalog,
                update_url: args.update_url,
            }
        }
    }

    pub fn parse() -> LaunchParams {
        CliArgs::parse().into()
    }

    #[cfg(test)]
    pub fn try_parse_from<I, T>(args: I) -> Result<LaunchParams, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        CliArgs::try_parse_from(args).map(Into::into)
    }
}

/// Parse launch parameters from CLI args (native) or use defaults (WASM).
pub fn parse() -> LaunchParams {
    #[cfg(not(target_family = "wasm"))]
    {
        native::parse()
    }
    #[cfg(target_family = "wasm")]
    {
        LaunchParams::default()
    }
}
