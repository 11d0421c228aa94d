//! Installer Configuration
//!
//! Run-wide settings shared by the environment manager, the package
//! installer and the post-install tasks. Built once in `main` and passed
//! down by reference.

use std::path::PathBuf;
use std::time::Duration;

use log::debug;
use once_cell::sync::Lazy;

/// Environment name used when none is given.
pub const DEFAULT_ENV_NAME: &str = "geo-distro";

/// Python version pinned when creating the environment.
pub const DEFAULT_PYTHON_VERSION: &str = "3.9";

/// Channel used for package-manager-native installs.
pub const DEFAULT_CHANNEL: &str = "conda-forge";

/// Package managers to probe, fastest first.
pub const DEFAULT_MANAGER_CANDIDATES: &[&str] = &["mamba", "conda"];

/// Pause between categories, as a courtesy to the package index.
pub const DEFAULT_CATEGORY_PAUSE: Duration = Duration::from_secs(1);

/// Jupyter Lab extensions installed after the packages.
pub const DEFAULT_JUPYTER_EXTENSIONS: &[&str] = &["jupyterlab-geojson", "jupyterlab-kernelspy"];

/// Lazily-resolved per-user directory for launcher shortcuts.
pub static DEFAULT_SHORTCUTS_DIR: Lazy<PathBuf> = Lazy::new(|| {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());

    let dir = PathBuf::from(home).join("GeoDistribution");
    debug!("Using shortcuts directory: {}", dir.display());
    dir
});

/// Settings for one installer run.
#[derive(Debug, Clone)]
pub struct InstallConfig {
    /// Package-manager binaries to probe, in preference order
    pub manager_candidates: Vec<String>,

    /// Python version for `create ... python=<version>`
    pub python_version: String,

    /// Extra channel for package-manager-native installs
    pub channel: String,

    /// Sleep between categories (zero disables)
    pub category_pause: Duration,

    /// Kill external commands running longer than this
    pub command_timeout: Option<Duration>,

    /// Where launcher shortcuts are written
    pub shortcuts_dir: PathBuf,

    /// Jupyter Lab extensions to install after the packages
    pub jupyter_extensions: Vec<String>,

    /// Stream child output to the terminal instead of capturing it
    pub verbose: bool,

    /// Draw per-category progress bars (ignored when verbose)
    pub show_progress: bool,
}

impl InstallConfig {
    /// Whether child process output should be captured.
    pub fn capture_output(&self) -> bool {
        !self.verbose
    }

    /// Whether progress bars should be drawn.
    pub fn progress_enabled(&self) -> bool {
        self.show_progress && !self.verbose
    }
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            manager_candidates: DEFAULT_MANAGER_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            python_version: DEFAULT_PYTHON_VERSION.to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            category_pause: DEFAULT_CATEGORY_PAUSE,
            command_timeout: None,
            shortcuts_dir: DEFAULT_SHORTCUTS_DIR.clone(),
            jupyter_extensions: DEFAULT_JUPYTER_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            verbose: false,
            show_progress: true,
        }
    }
}
