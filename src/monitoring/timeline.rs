//! Installation Timeline
//!
//! Records how long each package install took so the final report can
//! point out slow packages and draw a simple duration chart.

use std::time::Duration;

use crate::execution::installer::CategorySummary;

/// Width of the longest bar in [`InstallTimeline::chart`].
const CHART_WIDTH: usize = 50;

/// Outcome of a recorded install attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Package installed (directly or through the pip fallback)
    Completed,
    /// Every install attempt failed
    Failed,
}

/// A single package install in the timeline.
#[derive(Debug, Clone)]
pub struct TimelineEvent {
    /// Category the package belongs to
    pub category: String,
    /// Package name
    pub package: String,
    /// Whether the install succeeded
    pub event_type: EventType,
    /// Time spent on all attempts for this package
    pub duration: Duration,
}

/// Tracks per-package install durations for one run.
#[derive(Debug, Clone)]
pub struct InstallTimeline {
    events: Vec<TimelineEvent>,
}

impl InstallTimeline {
    /// Creates an empty timeline.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Records one install attempt.
    pub fn add_event(
        &mut self,
        category: impl Into<String>,
        package: impl Into<String>,
        event_type: EventType,
        duration: Duration,
    ) {
        self.events.push(TimelineEvent {
            category: category.into(),
            package: package.into(),
            event_type,
            duration,
        });
    }

    /// Records every result of a finished category.
    pub fn record_category(&mut self, summary: &CategorySummary) {
        for result in &summary.results {
            let event_type = if result.succeeded {
                EventType::Completed
            } else {
                EventType::Failed
            };
            self.add_event(&summary.category, &result.package, event_type, result.elapsed);
        }
    }

    /// Returns all recorded events in install order.
    pub fn get_events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Sum of install durations for one category.
    pub fn category_duration(&self, category: &str) -> Duration {
        self.events
            .iter()
            .filter(|e| e.category == category)
            .map(|e| e.duration)
            .sum()
    }

    /// The `n` longest installs, longest first.
    pub fn slowest(&self, n: usize) -> Vec<&TimelineEvent> {
        let mut sorted: Vec<&TimelineEvent> = self.events.iter().collect();
        sorted.sort_by(|a, b| b.duration.cmp(&a.duration));
        sorted.truncate(n);
        sorted
    }

    /// ASCII bar chart of install durations, scaled to the longest install.
    pub fn chart(&self) -> String {
        let mut output = String::from("\nInstall Timeline:\n\n");

        let longest = self
            .events
            .iter()
            .map(|e| e.duration.as_millis())
            .max()
            .unwrap_or(0);

        if longest == 0 {
            return output;
        }

        let scale = CHART_WIDTH as f64 / longest as f64;
        let name_width = self
            .events
            .iter()
            .map(|e| e.package.len())
            .max()
            .unwrap_or(0);

        for event in &self.events {
            let millis = event.duration.as_millis();
            let width = ((millis as f64 * scale) as usize).max(1);
            let mark = match event.event_type {
                EventType::Completed => '#',
                EventType::Failed => 'x',
            };

            output.push_str(&format!(
                "{:<name_width$} |{} {}ms\n",
                event.package,
                mark.to_string().repeat(width),
                millis,
                name_width = name_width
            ));
        }

        output
    }
}

impl Default for InstallTimeline {
    fn default() -> Self {
        Self::new()
    }
}
