//! Package Manager Detection and Environment Lifecycle
//!
//! Finds a usable conda-compatible package manager and creates or removes
//! the named environment the distribution is installed into.
//!
//! # Manager Resolution Order
//!
//! Candidates are probed with `<candidate> --version` in the configured
//! order (by default `mamba` before `conda`). The first one that answers
//! successfully is used for the rest of the run.

use std::fmt;

use log::{debug, error, info, warn};
use once_cell::unsync::OnceCell;
use serde::Serialize;

use crate::config::InstallConfig;
use crate::execution::runner::{CommandLine, CommandRunner};

/// Operating system family the environment lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    Darwin,
}

impl Platform {
    /// Platform this binary was compiled for.
    pub fn current() -> Self {
        match std::env::consts::OS {
            "windows" => Self::Windows,
            "macos" => Self::Darwin,
            _ => Self::Linux,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Darwin => "darwin",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The isolated installation target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub name: String,
    pub exists: bool,
    pub platform: Platform,
}

impl Environment {
    pub fn new(name: impl Into<String>, exists: bool) -> Self {
        Self {
            name: name.into(),
            exists,
            platform: Platform::current(),
        }
    }
}

/// A detected conda-compatible package manager binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageManager {
    pub name: String,
}

impl PackageManager {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Starts a command line invoking this manager.
    pub fn command(&self) -> CommandLine {
        CommandLine::new(&self.name)
    }

    /// `<manager> run -n <env> <program>`: runs a program from inside the
    /// environment without shell activation.
    pub fn run_in(&self, env_name: &str, program: &str) -> CommandLine {
        self.command().args(["run", "-n", env_name, program])
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Detects the package manager and manages environments with it.
pub struct EnvironmentManager<'a> {
    runner: &'a dyn CommandRunner,
    candidates: Vec<String>,
    python_version: String,
    capture_output: bool,
    detected: OnceCell<Option<PackageManager>>,
}

impl<'a> EnvironmentManager<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &InstallConfig) -> Self {
        Self {
            runner,
            candidates: config.manager_candidates.clone(),
            python_version: config.python_version.clone(),
            capture_output: config.capture_output(),
            detected: OnceCell::new(),
        }
    }

    /// Candidates probed by [`detect_manager`](Self::detect_manager), in order.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Returns the first candidate that answers `--version`.
    ///
    /// Probing happens once; later calls return the cached result.
    pub fn detect_manager(&self) -> Option<&PackageManager> {
        self.detected
            .get_or_init(|| self.probe_candidates())
            .as_ref()
    }

    fn probe_candidates(&self) -> Option<PackageManager> {
        for candidate in &self.candidates {
            let outcome = self
                .runner
                .run(&CommandLine::new(candidate).arg("--version"), true);

            if outcome.succeeded {
                info!(
                    "Found {} ({})",
                    candidate,
                    outcome.stdout_last_line().unwrap_or("version unknown")
                );
                return Some(PackageManager::new(candidate));
            }

            debug!("{} not usable: {}", candidate, outcome.diagnostic());
        }

        warn!("No conda-compatible package manager found");
        warn!("  Searched: {}", self.candidates.join(", "));
        warn!("  Download from: https://docs.conda.io/en/latest/miniconda.html");
        None
    }

    /// Creates the environment with the pinned Python version.
    ///
    /// Returns false if no package manager is available or the create
    /// command fails. Whether an existing environment counts as success is
    /// up to the package manager.
    pub fn ensure_environment(&self, name: &str) -> bool {
        let Some(manager) = self.detect_manager() else {
            error!("Cannot create environment '{}': no package manager", name);
            return false;
        };

        info!(
            "Creating environment '{}' (python={})",
            name, self.python_version
        );

        let command = manager.command().args([
            "create".to_string(),
            "-n".to_string(),
            name.to_string(),
            format!("python={}", self.python_version),
            "-y".to_string(),
        ]);

        let outcome = self.runner.run(&command, self.capture_output);

        if outcome.succeeded {
            info!("Environment '{}' ready", name);
        } else {
            error!(
                "Failed to create environment '{}': {}",
                name,
                outcome.diagnostic()
            );
        }

        outcome.succeeded
    }

    /// Removes the environment and everything installed in it.
    pub fn remove_environment(&self, name: &str) -> bool {
        let Some(manager) = self.detect_manager() else {
            error!("Cannot remove environment '{}': no package manager", name);
            return false;
        };

        let command = manager.command().args(["remove", "-n", name, "--all", "-y"]);
        let outcome = self.runner.run(&command, self.capture_output);

        if outcome.succeeded {
            info!("Environment '{}' removed", name);
        } else {
            error!(
                "Failed to remove environment '{}': {}",
                name,
                outcome.diagnostic()
            );
        }

        outcome.succeeded
    }

    /// Describes the environment on the current platform.
    pub fn environment(&self, name: &str, exists: bool) -> Environment {
        Environment::new(name, exists)
    }
}
