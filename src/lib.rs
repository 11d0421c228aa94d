//! GeoDistro - Geospatial Distribution Installer
//!
//! Sets up a curated collection of geospatial Python libraries in an
//! isolated conda/mamba environment, then verifies that each one imports.
//!
//! # Architecture
//!
//! The library is organized into five main modules:
//!
//! - [`catalog`]: Package categories and how each is installed
//! - [`environment`]: Package-manager detection and environment lifecycle
//! - [`execution`]: Command runner, per-category installer and orchestrator
//! - [`verification`]: Import probes for the installed libraries
//! - [`monitoring`]: Per-package install timing
//!
//! # Example
//!
//! ```rust,no_run
//! use geodistro::{InstallConfig, InstallOrchestrator, PackageCatalog, SystemRunner};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runner = SystemRunner::new();
//!     let catalog = PackageCatalog::default();
//!     let config = InstallConfig::default();
//!
//!     // Fails only if no package manager exists or the environment can't be created
//!     let report = InstallOrchestrator::new(&runner, &catalog, &config)
//!         .install_all("geo-distro", true)?;
//!
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod environment;
pub mod execution;
pub mod monitoring;
pub mod verification;

// Re-export commonly used types
pub use catalog::{load_catalog, PackageCatalog, PackageCategory};
pub use config::InstallConfig;
pub use environment::{EnvironmentManager, PackageManager};
pub use execution::{InstallError, InstallOrchestrator, InstallReport, SystemRunner};
pub use verification::{VerificationReport, Verifier};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "GeoDistro";
