use serde::{Deserialize, Serialize};

/// Event emitted while a firmware update is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum UpdateEvent {
    /// Human readable description of the current step.
    Status(String),
    /// Overall progress in percent (0..=100).
    Progress(f64),
}

impl UpdateEvent {
    pub fn status(message: impl Into<String>) -> Self {
        UpdateEvent::Status(message.into())
    }

    pub fn progress(percent: f64) -> Self {
        UpdateEvent::Progress(clamp_percent(percent))
    }
}

/// Latest known state of an update, built by folding events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateSnapshot {
    pub status: Option<String>,
    pub percent: f64,
    pub events: usize,
}

impl UpdateSnapshot {
    pub fn apply(&mut self, event: &UpdateEvent) {
        self.events += 1;
        match event {
            UpdateEvent::Status(message) => self.status = Some(message.clone()),
            UpdateEvent::Progress(percent) => self.percent = clamp_percent(*percent),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.percent >= 100.0
    }
}

pub fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        return 0.0;
    }
    percent.clamp(0.0, 100.0)
}
