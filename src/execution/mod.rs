//! Installation Execution Module
//!
//! Runs the external package-manager commands that make up an install,
//! strictly one at a time.
//!
//! # Architecture
//!
//! - [`runner`]: Spawning external commands and capturing their outcome
//! - [`installer`]: Installing every package of one category
//! - [`orchestrator`]: The full install sequence across all categories
//! - [`post_install`]: Best-effort steps after the packages are in place
//! - [`report`]: The summary returned by a completed install

pub mod installer;
pub mod orchestrator;
pub mod post_install;
pub mod report;
pub mod runner;

pub use installer::{CategorySummary, InstallResult, PackageInstaller};
pub use orchestrator::{InstallError, InstallOrchestrator};
pub use post_install::{PostInstallTask, TaskError};
pub use report::InstallReport;
pub use runner::{CommandLine, CommandOutcome, CommandRunner, SystemRunner};
