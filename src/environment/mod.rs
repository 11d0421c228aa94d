//! Environment Management Module
//!
//! Handles integration with conda/mamba for creating the isolated
//! environment the distribution is installed into.

pub mod manager;

pub use manager::{Environment, EnvironmentManager, PackageManager, Platform};
