//! Installation Verification
//!
//! Imports each expected library inside the environment's interpreter and
//! records whether it loaded and which version it reports. Every library
//! is checked even after a failure.

use std::fmt;

use colored::Colorize;
use log::{debug, info, warn};
use serde::Serialize;

use crate::environment::PackageManager;
use crate::execution::runner::CommandRunner;

/// Reported when a module loads but has no version attribute.
pub const UNKNOWN_VERSION: &str = "unknown version";

/// Attribute read when none is specified.
pub const DEFAULT_VERSION_ATTR: &str = "__version__";

/// Imports `sys.argv[1]` and prints its `sys.argv[2]` attribute.
const PROBE_SCRIPT: &str = "import importlib, sys
module = importlib.import_module(sys.argv[1])
version = getattr(module, sys.argv[2], None)
print(version if version is not None else 'unknown version')";

/// One library to probe: the import name and its version attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryCheck {
    pub library: &'static str,
    pub version_attr: &'static str,
}

impl LibraryCheck {
    pub const fn new(library: &'static str) -> Self {
        Self {
            library,
            version_attr: DEFAULT_VERSION_ATTR,
        }
    }
}

/// Libraries a complete installation must be able to import, in check order.
pub const EXPECTED_LIBRARIES: &[LibraryCheck] = &[
    LibraryCheck::new("geopandas"),
    LibraryCheck::new("rasterio"),
    LibraryCheck::new("fiona"),
    LibraryCheck::new("shapely"),
    LibraryCheck::new("pyproj"),
    LibraryCheck::new("folium"),
    LibraryCheck::new("googlemaps"),
    LibraryCheck::new("geopy"),
    LibraryCheck::new("cartopy"),
    LibraryCheck::new("osmnx"),
    LibraryCheck::new("contextily"),
    LibraryCheck::new("ipyleaflet"),
    LibraryCheck::new("pysal"),
    LibraryCheck::new("sklearn"),
    LibraryCheck::new("jupyter"),
];

/// Outcome of probing one library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    /// Import name that was probed
    pub library: String,
    /// Whether the import succeeded
    pub succeeded: bool,
    /// Reported version on success, last error line on failure
    pub version_or_error: String,
}

/// All probe results plus the all-or-nothing verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    /// Environment the probes ran in
    pub environment: String,
    /// True only if every library imported
    pub all_ok: bool,
    /// One result per library, in check order
    pub results: Vec<VerificationResult>,
}

impl VerificationReport {
    pub fn failed(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results.iter().filter(|r| !r.succeeded)
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);

        writeln!(f, "Verifying installation in '{}'", self.environment)?;
        writeln!(f, "{}", rule)?;

        for result in &self.results {
            let mark = if result.succeeded {
                "✓".green()
            } else {
                "✗".red()
            };
            writeln!(f, "{} {:20} {}", mark, result.library, result.version_or_error)?;
        }

        writeln!(f, "{}", rule)?;
        if self.all_ok {
            write!(f, "{}", "All libraries imported successfully!".green().bold())
        } else {
            write!(
                f,
                "{}",
                "Some libraries failed to import. Check the installation.".yellow()
            )
        }
    }
}

/// Probes libraries inside a named environment.
pub struct Verifier<'a> {
    runner: &'a dyn CommandRunner,
    manager: &'a PackageManager,
    env_name: String,
    checks: Vec<LibraryCheck>,
}

impl<'a> Verifier<'a> {
    /// Creates a verifier for the standard library table.
    pub fn new(
        runner: &'a dyn CommandRunner,
        manager: &'a PackageManager,
        env_name: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            manager,
            env_name: env_name.into(),
            checks: EXPECTED_LIBRARIES.to_vec(),
        }
    }

    /// Replaces the library table.
    pub fn with_checks(mut self, checks: Vec<LibraryCheck>) -> Self {
        self.checks = checks;
        self
    }

    pub fn checks(&self) -> &[LibraryCheck] {
        &self.checks
    }

    /// Imports `library` and reads its `__version__`.
    pub fn check_library(&self, library: &str) -> VerificationResult {
        self.check_library_with(library, DEFAULT_VERSION_ATTR)
    }

    /// Imports `library` and reads `version_attr` from it.
    pub fn check_library_with(&self, library: &str, version_attr: &str) -> VerificationResult {
        let command = self
            .manager
            .run_in(&self.env_name, "python")
            .args(["-c", PROBE_SCRIPT, library, version_attr]);

        let outcome = self.runner.run(&command, true);

        // Import-time warnings go to stderr; only stdout carries the version.
        let version_or_error = if outcome.succeeded {
            outcome
                .stdout_last_line()
                .unwrap_or(UNKNOWN_VERSION)
                .to_string()
        } else {
            outcome.diagnostic()
        };

        debug!(
            "Probe {}: {} ({})",
            library,
            if outcome.succeeded { "ok" } else { "failed" },
            version_or_error
        );

        VerificationResult {
            library: library.to_string(),
            succeeded: outcome.succeeded,
            version_or_error,
        }
    }

    /// Checks every library in the table; true only if all of them import.
    pub fn verify_installation(&self) -> VerificationReport {
        info!(
            "Verifying {} libraries in '{}'",
            self.checks.len(),
            self.env_name
        );

        let results: Vec<VerificationResult> = self
            .checks
            .iter()
            .map(|check| self.check_library_with(check.library, check.version_attr))
            .collect();

        let all_ok = results.iter().all(|r| r.succeeded);
        if !all_ok {
            let failed: Vec<&str> = results
                .iter()
                .filter(|r| !r.succeeded)
                .map(|r| r.library.as_str())
                .collect();
            warn!("Failed to import: {}", failed.join(", "));
        }

        VerificationReport {
            environment: self.env_name.clone(),
            all_ok,
            results,
        }
    }
}
