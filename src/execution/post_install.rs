//! Best-Effort Post-Install Tasks
//!
//! Convenience steps run after the packages are in place: Jupyter Lab
//! extensions and a launcher script. A failing task is reported as a
//! warning on the install report and never fails the run.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use crate::environment::{Environment, PackageManager, Platform};

use super::runner::CommandRunner;

/// Why a post-install task did not complete.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error("could not write {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Everything a task may need from the finished install.
pub struct TaskContext<'a> {
    pub runner: &'a dyn CommandRunner,
    pub manager: &'a PackageManager,
    pub environment: &'a Environment,
    pub capture_output: bool,
}

/// A step run once after all categories are installed.
pub trait PostInstallTask {
    /// Short label used in logs and warnings.
    fn name(&self) -> String;

    fn run(&self, ctx: &TaskContext<'_>) -> Result<(), TaskError>;
}

/// Installs a Jupyter Lab extension inside the environment.
#[derive(Debug, Clone)]
pub struct JupyterExtension {
    extension: String,
}

impl JupyterExtension {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
        }
    }
}

impl PostInstallTask for JupyterExtension {
    fn name(&self) -> String {
        format!("jupyter extension {}", self.extension)
    }

    fn run(&self, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        let command = ctx
            .manager
            .run_in(&ctx.environment.name, "jupyter")
            .args(["labextension", "install", self.extension.as_str()]);

        let outcome = ctx.runner.run(&command, ctx.capture_output);
        if outcome.succeeded {
            debug!("Installed Jupyter extension {}", self.extension);
            Ok(())
        } else {
            Err(TaskError::CommandFailed(outcome.diagnostic()))
        }
    }
}

/// Writes a script that activates the environment and starts Jupyter Lab.
#[derive(Debug, Clone)]
pub struct LauncherShortcut {
    dir: PathBuf,
}

impl LauncherShortcut {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Launcher file name for a platform.
    pub fn file_name(platform: Platform) -> &'static str {
        match platform {
            Platform::Windows => "GeoJupyterLab.bat",
            Platform::Linux | Platform::Darwin => "geojupyterlab.sh",
        }
    }

    /// Launcher script body for a platform.
    pub fn script_content(platform: Platform, env_name: &str) -> String {
        match platform {
            Platform::Windows => format!(
                "@echo off\r\ncall conda activate {}\r\njupyter lab\r\npause\r\n",
                env_name
            ),
            Platform::Linux | Platform::Darwin => format!(
                "#!/bin/bash\n# Geo Distribution - Jupyter Lab\nconda activate {}\njupyter lab\n",
                env_name
            ),
        }
    }

    /// Where the launcher for `platform` is written.
    pub fn path_for(&self, platform: Platform) -> PathBuf {
        self.dir.join(Self::file_name(platform))
    }

    fn write(&self, path: &Path, content: &str) -> Result<(), TaskError> {
        let io_err = |source: io::Error| TaskError::Io {
            path: path.to_path_buf(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(|source| TaskError::Io {
            path: self.dir.clone(),
            source,
        })?;
        fs::write(path, content).map_err(io_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(io_err)?;
        }

        Ok(())
    }
}

impl PostInstallTask for LauncherShortcut {
    fn name(&self) -> String {
        "launcher shortcut".to_string()
    }

    fn run(&self, ctx: &TaskContext<'_>) -> Result<(), TaskError> {
        let platform = ctx.environment.platform;
        let path = self.path_for(platform);

        self.write(&path, &Self::script_content(platform, &ctx.environment.name))?;

        info!("Created launcher: {}", path.display());
        Ok(())
    }
}
