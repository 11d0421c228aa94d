//! Installation Report
//!
//! The value returned by a completed install and its human-readable
//! summary: per-category results, best-effort warnings and next steps.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use colored::Colorize;

use crate::environment::{Environment, PackageManager};
use crate::monitoring::InstallTimeline;

use super::installer::CategorySummary;

/// Number of slow packages listed in the summary.
const SLOWEST_SHOWN: usize = 3;

/// Outcome of an install run that got past environment creation.
#[derive(Debug, Clone)]
pub struct InstallReport {
    /// Environment the packages went into
    pub environment: Environment,
    /// Package manager that ran the installs
    pub manager: PackageManager,
    /// One summary per category, in install order
    pub categories: Vec<CategorySummary>,
    /// Post-install tasks that failed
    pub warnings: Vec<String>,
    /// Wall-clock start of the run
    pub started_at: DateTime<Local>,
    /// Total run duration
    pub elapsed: Duration,
    /// Per-package install durations
    pub timeline: InstallTimeline,
}

impl InstallReport {
    pub fn summary_for(&self, category: &str) -> Option<&CategorySummary> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn total_packages(&self) -> usize {
        self.categories.iter().map(CategorySummary::total).sum()
    }

    pub fn total_successful(&self) -> usize {
        self.categories.iter().map(|c| c.successful.len()).sum()
    }

    /// Every failed package across categories, in install order.
    pub fn failed_packages(&self) -> Vec<&str> {
        self.categories
            .iter()
            .flat_map(|c| c.failed.iter().map(String::as_str))
            .collect()
    }

    /// True when every package installed and every post-install task ran.
    pub fn is_clean(&self) -> bool {
        self.failed_packages().is_empty() && self.warnings.is_empty()
    }
}

impl fmt::Display for InstallReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(50);

        writeln!(f)?;
        writeln!(
            f,
            "Installation Summary ({})",
            self.started_at.format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(f, "{}", rule)?;
        writeln!(
            f,
            "Environment: {} ({}, via {})",
            self.environment.name, self.environment.platform, self.manager
        )?;

        for summary in &self.categories {
            writeln!(f)?;
            writeln!(
                f,
                "{}: {}/{} installed in {:.1?}",
                summary.category.bold(),
                summary.successful.len(),
                summary.total(),
                self.timeline.category_duration(&summary.category)
            )?;

            if !summary.successful.is_empty() {
                writeln!(f, "  {} {}", "✓".green(), summary.successful.join(", "))?;
            }
            for package in &summary.failed {
                let detail = summary.error_for(package).unwrap_or("unknown error");
                writeln!(f, "  {} {} ({})", "✗".red(), package, detail)?;
            }
        }

        let slowest = self.timeline.slowest(SLOWEST_SHOWN);
        if !slowest.is_empty() {
            writeln!(f)?;
            writeln!(f, "Slowest packages:")?;
            for event in slowest {
                writeln!(f, "  {:<24} {:.1?}", event.package, event.duration)?;
            }
        }

        if !self.warnings.is_empty() {
            writeln!(f)?;
            writeln!(f, "{}", "Warnings:".yellow())?;
            for warning in &self.warnings {
                writeln!(f, "  {} {}", "⚠".yellow(), warning)?;
            }
        }

        let headline = if self.is_clean() {
            "Installation complete!".green().bold()
        } else {
            "Installation complete with problems.".yellow().bold()
        };

        writeln!(f)?;
        writeln!(
            f,
            "{} {}/{} packages installed in {:.1?}",
            headline,
            self.total_successful(),
            self.total_packages(),
            self.elapsed
        )?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "To activate:")?;
        writeln!(f, "  conda activate {}", self.environment.name)?;
        writeln!(f, "To start Jupyter Lab:")?;
        write!(f, "  jupyter lab")
    }
}
