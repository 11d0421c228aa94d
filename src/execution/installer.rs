//! Per-Category Package Installation
//!
//! Installs every package of a category into the environment, one at a
//! time, recording success or failure for each. A failing package never
//! stops the loop: every package is attempted exactly once.
//!
//! # Install Commands
//!
//! - Native: `<manager> install -c <channel> -n <env> <package> -y`,
//!   falling back to pip on failure
//! - Pip: `<manager> run -n <env> python -m pip install <package>`

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use serde::Serialize;

use crate::catalog::{InstallMethod, PackageCategory};
use crate::config::InstallConfig;
use crate::environment::{Environment, PackageManager};

use super::runner::{CommandLine, CommandRunner};

/// Result of installing a single package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallResult {
    /// Package name as listed in the catalog
    pub package: String,
    /// Whether any install attempt succeeded
    pub succeeded: bool,
    /// Last error line of each failed attempt
    pub error_detail: Option<String>,
    /// Time spent on all attempts
    pub elapsed: Duration,
}

/// Partition of a category's packages into installed and failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    /// Category name
    pub category: String,
    /// Installed packages, in install order
    pub successful: Vec<String>,
    /// Packages that could not be installed
    pub failed: Vec<String>,
    /// Per-package details
    pub results: Vec<InstallResult>,
}

impl CategorySummary {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Self::default()
        }
    }

    /// Adds one package result to the summary.
    pub fn record(&mut self, result: InstallResult) {
        if result.succeeded {
            self.successful.push(result.package.clone());
        } else {
            self.failed.push(result.package.clone());
        }
        self.results.push(result);
    }

    /// Number of packages visited.
    pub fn total(&self) -> usize {
        self.successful.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// Error detail recorded for a failed package.
    pub fn error_for(&self, package: &str) -> Option<&str> {
        self.results
            .iter()
            .find(|r| r.package == package)
            .and_then(|r| r.error_detail.as_deref())
    }
}

/// Installs the packages of a category into an environment.
pub struct PackageInstaller<'a> {
    runner: &'a dyn CommandRunner,
    manager: &'a PackageManager,
    channel: String,
    capture_output: bool,
    show_progress: bool,
}

impl<'a> PackageInstaller<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        manager: &'a PackageManager,
        config: &InstallConfig,
    ) -> Self {
        Self {
            runner,
            manager,
            channel: config.channel.clone(),
            capture_output: config.capture_output(),
            show_progress: config.progress_enabled(),
        }
    }

    /// Installs every package in `category`, in declaration order.
    ///
    /// Always visits every package; the returned summary partitions all
    /// of them into successful and failed.
    pub fn install_category(
        &self,
        env: &Environment,
        category: &PackageCategory,
    ) -> CategorySummary {
        info!(
            "Installing {} packages ({} via {})",
            category.name,
            category.len(),
            category.install_method
        );

        let progress = self.progress_bar(category);
        let mut summary = CategorySummary::new(&category.name);

        for package in &category.packages {
            progress.set_message(package.clone());

            let result = self.install_package(env, category.install_method, package);

            if result.succeeded {
                debug!("Installed {} in {:.1?}", package, result.elapsed);
            } else {
                let detail = result.error_detail.as_deref().unwrap_or("unknown error");
                progress.suspend(|| warn!("Failed to install {}: {}", package, detail));
            }

            summary.record(result);
            progress.inc(1);
        }

        progress.finish_and_clear();

        if !summary.successful.is_empty() {
            info!(
                "Installed {}/{} {} packages",
                summary.successful.len(),
                category.len(),
                category.name
            );
        }
        if !summary.failed.is_empty() {
            warn!("Failed to install: {}", summary.failed.join(", "));
        }

        summary
    }

    /// Installs one package, trying the pip fallback for native categories.
    fn install_package(
        &self,
        env: &Environment,
        method: InstallMethod,
        package: &str,
    ) -> InstallResult {
        let started = Instant::now();

        let error_detail = match method {
            InstallMethod::PackageManagerNative => {
                let native = self
                    .runner
                    .run(&self.native_install(env, package), self.capture_output);

                if native.succeeded {
                    None
                } else {
                    debug!(
                        "{} could not install {}, trying pip: {}",
                        self.manager,
                        package,
                        native.diagnostic()
                    );

                    let pip = self
                        .runner
                        .run(&self.pip_install(env, package), self.capture_output);

                    if pip.succeeded {
                        None
                    } else {
                        Some(format!(
                            "{}: {}; pip: {}",
                            self.manager,
                            native.diagnostic(),
                            pip.diagnostic()
                        ))
                    }
                }
            }
            InstallMethod::PipFallback => {
                let pip = self
                    .runner
                    .run(&self.pip_install(env, package), self.capture_output);

                if pip.succeeded {
                    None
                } else {
                    Some(format!("pip: {}", pip.diagnostic()))
                }
            }
        };

        InstallResult {
            package: package.to_string(),
            succeeded: error_detail.is_none(),
            error_detail,
            elapsed: started.elapsed(),
        }
    }

    fn native_install(&self, env: &Environment, package: &str) -> CommandLine {
        self.manager.command().args([
            "install",
            "-c",
            self.channel.as_str(),
            "-n",
            env.name.as_str(),
            package,
            "-y",
        ])
    }

    fn pip_install(&self, env: &Environment, package: &str) -> CommandLine {
        self.manager
            .run_in(&env.name, "python")
            .args(["-m", "pip", "install", package])
    }

    fn progress_bar(&self, category: &PackageCategory) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new(category.len() as u64);
        match ProgressStyle::with_template("{prefix:>20} [{bar:30}] {pos}/{len} {msg}") {
            Ok(style) => progress.set_style(style.progress_chars("=> ")),
            Err(e) => debug!("Progress template rejected: {}", e),
        }
        progress.set_prefix(category.name.clone());
        progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::runner::scripted::ScriptedRunner;
    use crate::execution::runner::CommandOutcome;

    fn config() -> InstallConfig {
        InstallConfig {
            show_progress: false,
            ..InstallConfig::default()
        }
    }

    fn env() -> Environment {
        Environment::new("geo", true)
    }

    fn failing(packages: &'static [&'static str]) -> impl Fn(&CommandLine) -> CommandOutcome {
        move |cmd: &CommandLine| {
            if packages.iter().any(|p| cmd.has_arg(p)) {
                CommandOutcome::failure("ERROR: No matching distribution found")
            } else {
                CommandOutcome::success("Successfully installed")
            }
        }
    }

    #[test]
    fn test_category_summary_record() {
        let mut summary = CategorySummary::new("core");
        summary.record(InstallResult {
            package: "gdal".to_string(),
            succeeded: true,
            error_detail: None,
            elapsed: Duration::ZERO,
        });
        summary.record(InstallResult {
            package: "proj".to_string(),
            succeeded: false,
            error_detail: Some("boom".to_string()),
            elapsed: Duration::ZERO,
        });

        assert_eq!(summary.successful, vec!["gdal"]);
        assert_eq!(summary.failed, vec!["proj"]);
        assert_eq!(summary.total(), 2);
        assert!(!summary.all_succeeded());
        assert_eq!(summary.error_for("proj"), Some("boom"));
        assert_eq!(summary.error_for("gdal"), None);
    }

    #[test]
    fn test_every_package_visited_despite_failures() {
        let runner = ScriptedRunner::new(failing(&["b", "d"]));
        let manager = PackageManager::new("mamba");
        let config = config();
        let installer = PackageInstaller::new(&runner, &manager, &config);

        let category =
            PackageCategory::new("pip", InstallMethod::PipFallback, &["a", "b", "c", "d", "e"]);
        let summary = installer.install_category(&env(), &category);

        assert_eq!(summary.total(), category.len());
        assert_eq!(summary.successful, vec!["a", "c", "e"]);
        assert_eq!(summary.failed, vec!["b", "d"]);
        assert_eq!(runner.calls().len(), 5);
    }

    #[test]
    fn test_all_packages_failing_still_visits_all() {
        let runner = ScriptedRunner::new(|_: &CommandLine| CommandOutcome::failure("offline"));
        let manager = PackageManager::new("conda");
        let config = config();
        let installer = PackageInstaller::new(&runner, &manager, &config);

        let category = PackageCategory::new("c", InstallMethod::PipFallback, &["x", "y", "z"]);
        let summary = installer.install_category(&env(), &category);

        assert_eq!(summary.failed.len(), 3);
        assert!(summary.successful.is_empty());
        assert_eq!(summary.error_for("y"), Some("pip: offline"));
    }

    #[test]
    fn test_native_install_command() {
        let runner = ScriptedRunner::new(failing(&[]));
        let manager = PackageManager::new("mamba");
        let config = config();
        let installer = PackageInstaller::new(&runner, &manager, &config);

        let category = PackageCategory::new("core", InstallMethod::PackageManagerNative, &["gdal"]);
        let summary = installer.install_category(&env(), &category);

        assert!(summary.all_succeeded());
        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "mamba");
        assert_eq!(
            calls[0].args,
            vec!["install", "-c", "conda-forge", "-n", "geo", "gdal", "-y"]
        );
    }

    #[test]
    fn test_native_failure_falls_back_to_pip() {
        let runner = ScriptedRunner::new(|cmd: &CommandLine| {
            if cmd.has_arg("-c") {
                CommandOutcome::failure("PackagesNotFoundError: geotiff")
            } else {
                CommandOutcome::success("Successfully installed geotiff")
            }
        });
        let manager = PackageManager::new("conda");
        let config = config();
        let installer = PackageInstaller::new(&runner, &manager, &config);

        let category =
            PackageCategory::new("core", InstallMethod::PackageManagerNative, &["geotiff"]);
        let summary = installer.install_category(&env(), &category);

        assert_eq!(summary.successful, vec!["geotiff"]);

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1].args,
            vec!["run", "-n", "geo", "python", "-m", "pip", "install", "geotiff"]
        );
    }

    #[test]
    fn test_native_and_pip_failure_keeps_both_details() {
        let runner = ScriptedRunner::new(|cmd: &CommandLine| {
            if cmd.has_arg("-c") {
                CommandOutcome::failure("PackagesNotFoundError")
            } else {
                CommandOutcome::failure("No matching distribution")
            }
        });
        let manager = PackageManager::new("mamba");
        let config = config();
        let installer = PackageInstaller::new(&runner, &manager, &config);

        let category = PackageCategory::new("core", InstallMethod::PackageManagerNative, &["x"]);
        let summary = installer.install_category(&env(), &category);

        assert_eq!(summary.failed, vec!["x"]);
        assert_eq!(
            summary.error_for("x"),
            Some("mamba: PackagesNotFoundError; pip: No matching distribution")
        );
    }

    #[test]
    fn test_pip_category_never_uses_native_install() {
        let runner = ScriptedRunner::new(failing(&[]));
        let manager = PackageManager::new("mamba");
        let config = config();
        let installer = PackageInstaller::new(&runner, &manager, &config);

        let category = PackageCategory::new("web", InstallMethod::PipFallback, &["folium", "dash"]);
        installer.install_category(&env(), &category);

        assert_eq!(runner.count_with_arg("pip"), 2);
        assert_eq!(runner.count_with_arg("-c"), 0);
    }

    #[test]
    fn test_packages_installed_in_declaration_order() {
        let runner = ScriptedRunner::new(failing(&[]));
        let manager = PackageManager::new("mamba");
        let config = config();
        let installer = PackageInstaller::new(&runner, &manager, &config);

        let category =
            PackageCategory::new("web", InstallMethod::PipFallback, &["plotly", "keplergl", "dash"]);
        installer.install_category(&env(), &category);

        let order: Vec<String> = runner
            .calls()
            .into_iter()
            .filter_map(|c| c.args.last().cloned())
            .collect();
        assert_eq!(order, vec!["plotly", "keplergl", "dash"]);
    }
}
