use clap::Parser;
use std::path::PathBuf;

use crate::settings::LauncherSettings;

/// Launch the game, updating it first when a newer build is published.
#[derive(Debug, Parser)]
#[command(name = "hatch", version, about)]
pub struct Cli {
    /// Settings file to read instead of the per-user one
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Directory holding the repository and the installed artifact
    #[arg(long, value_name = "DIR")]
    pub run_dir: Option<PathBuf>,

    /// Directory holding the bundled fallback resources
    #[arg(long, value_name = "DIR")]
    pub assets_dir: Option<PathBuf>,

    /// Host OS identifier to resolve instead of the detected one
    #[arg(long, value_name = "NAME")]
    pub os: Option<String>,

    /// Base URL of the per-platform release folders
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Log at debug level
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Command-line flags win over values read from the settings file.
    pub fn apply(&self, settings: &mut LauncherSettings) {
        if let Some(run_dir) = &self.run_dir {
            settings.run_dir = Some(run_dir.clone());
        }
        if let Some(assets_dir) = &self.assets_dir {
            settings.assets_dir = Some(assets_dir.clone());
        }
        if let Some(base_url) = &self.base_url {
            settings.release_base_url.clone_from(base_url);
        }
        if self.debug {
            settings.debug_logging = true;
        }
    }
}
