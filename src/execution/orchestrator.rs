//! Install Orchestration
//!
//! Drives a complete install run:
//! 1. Detects the package manager
//! 2. Creates the environment
//! 3. Installs every catalog category in order
//! 4. Runs best-effort post-install tasks (Jupyter extensions, launcher)
//!
//! Only steps 1 and 2 can fail the run. Package failures are recorded in
//! the report and post-install failures become report warnings.

use std::thread;
use std::time::Instant;

use chrono::Local;
use log::{error, info, warn};
use thiserror::Error;

use crate::catalog::PackageCatalog;
use crate::config::InstallConfig;
use crate::environment::EnvironmentManager;
use crate::monitoring::InstallTimeline;

use super::installer::PackageInstaller;
use super::post_install::{JupyterExtension, LauncherShortcut, PostInstallTask, TaskContext};
use super::report::InstallReport;
use super::runner::CommandRunner;

/// Conditions that abort an install run.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("no usable package manager found (tried: {})", .0.join(", "))]
    NoPackageManager(Vec<String>),

    #[error("failed to create environment '{0}'")]
    EnvironmentCreation(String),
}

/// Runs the whole installation against a catalog.
///
/// # Example
///
/// ```rust,no_run
/// use geodistro::catalog::PackageCatalog;
/// use geodistro::config::InstallConfig;
/// use geodistro::execution::{InstallOrchestrator, SystemRunner};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let runner = SystemRunner::new();
///     let catalog = PackageCatalog::default();
///     let config = InstallConfig::default();
///
///     let report = InstallOrchestrator::new(&runner, &catalog, &config)
///         .install_all("geo-distro", true)?;
///     println!("{}", report);
///     Ok(())
/// }
/// ```
pub struct InstallOrchestrator<'a> {
    runner: &'a dyn CommandRunner,
    catalog: &'a PackageCatalog,
    config: &'a InstallConfig,
}

impl<'a> InstallOrchestrator<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        catalog: &'a PackageCatalog,
        config: &'a InstallConfig,
    ) -> Self {
        Self {
            runner,
            catalog,
            config,
        }
    }

    /// Installs the full catalog into `env_name`.
    ///
    /// Returns a report once the environment exists, however many packages
    /// failed. Errors only when no package manager is usable or the
    /// environment could not be created; in both cases nothing else runs.
    pub fn install_all(
        &self,
        env_name: &str,
        make_shortcuts: bool,
    ) -> Result<InstallReport, InstallError> {
        let started_at = Local::now();
        let start = Instant::now();

        info!("Starting installation into '{}'", env_name);

        let environments = EnvironmentManager::new(self.runner, self.config);

        let manager = environments.detect_manager().cloned().ok_or_else(|| {
            error!("Aborting: no package manager available");
            InstallError::NoPackageManager(environments.candidates().to_vec())
        })?;

        if !environments.ensure_environment(env_name) {
            return Err(InstallError::EnvironmentCreation(env_name.to_string()));
        }

        let environment = environments.environment(env_name, true);
        let installer = PackageInstaller::new(self.runner, &manager, self.config);
        let mut timeline = InstallTimeline::new();
        let mut categories = Vec::with_capacity(self.catalog.len());

        for (index, category) in self.catalog.categories().iter().enumerate() {
            if index > 0 && !self.config.category_pause.is_zero() {
                thread::sleep(self.config.category_pause);
            }

            let summary = installer.install_category(&environment, category);
            timeline.record_category(&summary);
            categories.push(summary);
        }

        let ctx = TaskContext {
            runner: self.runner,
            manager: &manager,
            environment: &environment,
            capture_output: self.config.capture_output(),
        };

        let mut warnings = Vec::new();
        for task in self.post_install_tasks(make_shortcuts) {
            info!("Running post-install step: {}", task.name());

            if let Err(e) = task.run(&ctx) {
                warn!("{} failed: {}", task.name(), e);
                warnings.push(format!("{}: {}", task.name(), e));
            }
        }

        Ok(InstallReport {
            environment,
            manager,
            categories,
            warnings,
            started_at,
            elapsed: start.elapsed(),
            timeline,
        })
    }

    /// Post-install tasks in execution order.
    fn post_install_tasks(&self, make_shortcuts: bool) -> Vec<Box<dyn PostInstallTask>> {
        let mut tasks: Vec<Box<dyn PostInstallTask>> = self
            .config
            .jupyter_extensions
            .iter()
            .map(|ext| Box::new(JupyterExtension::new(ext)) as Box<dyn PostInstallTask>)
            .collect();

        if make_shortcuts {
            tasks.push(Box::new(LauncherShortcut::new(&self.config.shortcuts_dir)));
        }

        tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{InstallMethod, PackageCategory};
    use crate::execution::runner::scripted::ScriptedRunner;
    use crate::execution::runner::{CommandLine, CommandOutcome};
    use crate::environment::Platform;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;

    fn config(shortcuts_dir: &Path) -> InstallConfig {
        InstallConfig {
            category_pause: Duration::ZERO,
            shortcuts_dir: shortcuts_dir.to_path_buf(),
            show_progress: false,
            ..InstallConfig::default()
        }
    }

    fn scenario_catalog() -> PackageCatalog {
        PackageCatalog::from_categories(vec![
            PackageCategory::new("A", InstallMethod::PackageManagerNative, &["pkg1", "pkg2"]),
            PackageCategory::new("B", InstallMethod::PipFallback, &["pkg3"]),
        ])
        .unwrap()
    }

    /// mamba present, conda absent, pkg2 fails both ways.
    fn scenario_runner(cmd: &CommandLine) -> CommandOutcome {
        if cmd.has_arg("--version") {
            return if cmd.program == "mamba" {
                CommandOutcome::success("mamba 1.5.8")
            } else {
                CommandOutcome::failure("executable not found: conda")
            };
        }
        if cmd.has_arg("pkg2") {
            return CommandOutcome::failure("PackagesNotFoundError: pkg2");
        }
        CommandOutcome::success("")
    }

    #[test]
    fn test_partial_failure_scenario() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::new(scenario_runner);
        let catalog = scenario_catalog();
        let config = config(dir.path());

        let report = InstallOrchestrator::new(&runner, &catalog, &config)
            .install_all("x", true)
            .unwrap();

        let a = report.summary_for("A").unwrap();
        assert_eq!(a.successful, vec!["pkg1"]);
        assert_eq!(a.failed, vec!["pkg2"]);

        let b = report.summary_for("B").unwrap();
        assert_eq!(b.successful, vec!["pkg3"]);
        assert!(b.failed.is_empty());

        assert_eq!(report.manager.name, "mamba");
        assert!(report.warnings.is_empty());
        assert_eq!(report.timeline.get_events().len(), 3);
    }

    #[test]
    fn test_category_counts_match_catalog() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::new(scenario_runner);
        let catalog = PackageCatalog::default();
        let config = config(dir.path());

        let report = InstallOrchestrator::new(&runner, &catalog, &config)
            .install_all("geo", false)
            .unwrap();

        assert_eq!(report.categories.len(), catalog.len());
        for (summary, category) in report.categories.iter().zip(catalog.categories()) {
            assert_eq!(summary.category, category.name);
            assert_eq!(summary.total(), category.len());
        }
    }

    #[test]
    fn test_no_package_manager_aborts_before_create() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::new(|_: &CommandLine| {
            CommandOutcome::failure("executable not found")
        });
        let catalog = scenario_catalog();
        let config = config(dir.path());

        let result = InstallOrchestrator::new(&runner, &catalog, &config).install_all("x", true);

        assert!(matches!(result, Err(InstallError::NoPackageManager(ref tried)) if tried.len() == 2));
        assert_eq!(runner.count_with_arg("create"), 0);
        assert!(runner.calls().iter().all(|c| c.has_arg("--version")));
    }

    #[test]
    fn test_no_package_manager_writes_no_shortcut() {
        let dir = tempdir().unwrap();
        let shortcuts = dir.path().join("GeoDistribution");
        let runner = ScriptedRunner::new(|_: &CommandLine| CommandOutcome::failure("missing"));
        let catalog = scenario_catalog();
        let config = config(&shortcuts);

        let result = InstallOrchestrator::new(&runner, &catalog, &config).install_all("x", true);

        assert!(result.is_err());
        assert!(!shortcuts.exists());
    }

    #[test]
    fn test_environment_creation_failure_is_fatal() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::new(|cmd: &CommandLine| {
            if cmd.has_arg("create") {
                CommandOutcome::failure("CondaHTTPError")
            } else {
                CommandOutcome::success("conda 23.1.0")
            }
        });
        let catalog = scenario_catalog();
        let config = config(dir.path());

        let result = InstallOrchestrator::new(&runner, &catalog, &config).install_all("x", true);

        assert!(matches!(result, Err(InstallError::EnvironmentCreation(ref name)) if name == "x"));
        assert_eq!(runner.count_with_arg("install"), 0);
    }

    #[test]
    fn test_shortcut_written_when_requested() {
        let dir = tempdir().unwrap();
        let shortcuts = dir.path().join("GeoDistribution");
        let runner = ScriptedRunner::new(scenario_runner);
        let catalog = scenario_catalog();
        let config = config(&shortcuts);

        InstallOrchestrator::new(&runner, &catalog, &config)
            .install_all("x", true)
            .unwrap();

        let launcher = shortcuts.join(LauncherShortcut::file_name(Platform::current()));
        assert!(launcher.exists());
    }

    #[test]
    fn test_shortcut_skipped_when_disabled() {
        let dir = tempdir().unwrap();
        let shortcuts = dir.path().join("GeoDistribution");
        let runner = ScriptedRunner::new(scenario_runner);
        let catalog = scenario_catalog();
        let config = config(&shortcuts);

        InstallOrchestrator::new(&runner, &catalog, &config)
            .install_all("x", false)
            .unwrap();

        assert!(!shortcuts.exists());
    }

    #[test]
    fn test_post_install_failures_become_warnings() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::new(|cmd: &CommandLine| {
            if cmd.has_arg("labextension") {
                CommandOutcome::failure("Please install Node.js")
            } else {
                CommandOutcome::success("")
            }
        });
        let catalog = scenario_catalog();
        let config = config(dir.path());

        let report = InstallOrchestrator::new(&runner, &catalog, &config)
            .install_all("x", false)
            .unwrap();

        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].contains("jupyterlab-geojson"));
        assert!(report.warnings[0].contains("Please install Node.js"));
        assert!(report.failed_packages().is_empty());
    }

    #[test]
    fn test_every_package_failing_still_completes() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::new(|cmd: &CommandLine| {
            if cmd.has_arg("--version") || cmd.has_arg("create") {
                CommandOutcome::success("")
            } else {
                CommandOutcome::failure("network unreachable")
            }
        });
        let catalog = scenario_catalog();
        let config = config(dir.path());

        let report = InstallOrchestrator::new(&runner, &catalog, &config)
            .install_all("x", false)
            .unwrap();

        assert_eq!(report.total_successful(), 0);
        assert_eq!(report.failed_packages(), vec!["pkg1", "pkg2", "pkg3"]);
    }
}
