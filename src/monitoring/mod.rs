//! Install Monitoring Module
//!
//! Tracks per-package install durations during a run.
//!
//! - [`InstallTimeline`]: install durations, slowest packages, duration chart

pub mod timeline;

pub use timeline::{EventType, InstallTimeline, TimelineEvent};
