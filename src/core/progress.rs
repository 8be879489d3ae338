use serde::Serialize;

use crate::core::install::InstallStage;

/// One observation of a run's progress, on the 0-100 scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub percent: f64,
    pub message: String,
    pub stage: InstallStage,
}

/// Slice of the overall 0-100 scale assigned to one stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRange {
    pub start: f64,
    pub end: f64,
}

impl ProgressRange {
    pub const fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Maps a stage-local fraction onto the overall scale.
    /// Fractions outside `[0, 1]` are clamped.
    pub fn at(&self, fraction: f64) -> f64 {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.start + (self.end - self.start) * fraction
    }

    /// The `index`-th of `parts` equal sub-ranges.
    pub fn part(&self, index: usize, parts: usize) -> ProgressRange {
        let parts = parts.max(1) as f64;
        let width = (self.end - self.start) / parts;
        let start = self.start + width * index as f64;
        ProgressRange::new(start, start + width)
    }
}

/// Delivers events to the caller and keeps the percentage from going backwards.
pub struct ProgressReporter<'a> {
    sink: &'a mut (dyn FnMut(ProgressEvent) + Send),
    last_percent: f64,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: &'a mut (dyn FnMut(ProgressEvent) + Send)) -> Self {
        Self {
            sink,
            last_percent: 0.0,
        }
    }

    pub fn report(&mut self, stage: InstallStage, percent: f64, message: impl Into<String>) {
        let percent = percent.clamp(0.0, 100.0).max(self.last_percent);
        self.last_percent = percent;
        (self.sink)(ProgressEvent {
            percent,
            message: message.into(),
            stage,
        });
    }

    /// Terminal event for a run that will not continue. Always reported at 0%.
    pub fn halt(&mut self, stage: InstallStage, message: impl Into<String>) {
        self.last_percent = 0.0;
        (self.sink)(ProgressEvent {
            percent: 0.0,
            message: message.into(),
            stage,
        });
    }
}
