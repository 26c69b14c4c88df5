//! Rolling window of recent step attempts.
//!
//! The window is the blackhole detector's only input: one record per
//! actuator attempt (retries and successes included), bounded at a fixed
//! capacity with FIFO eviction. It lives and dies with its session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Fixed capacity of the detection window.
pub const WINDOW_CAPACITY: usize = 10;

/// One recorded actuator attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub step_index: u32,
    pub instruction: String,
    /// `None` for successful attempts.
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn is_failure(&self) -> bool {
        self.error_message.is_some()
    }
}

/// Bounded FIFO deque of recent attempts.
#[derive(Debug, Clone)]
pub struct ErrorDetectionWindow {
    entries: VecDeque<AttemptRecord>,
    capacity: usize,
}

impl ErrorDetectionWindow {
    pub fn new() -> Self {
        Self::with_capacity(WINDOW_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record one attempt, evicting the oldest entry when full.
    pub fn record(&mut self, step_index: u32, instruction: &str, error_message: Option<&str>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(AttemptRecord {
            step_index,
            instruction: instruction.to_string(),
            error_message: error_message.map(str::to_string),
            timestamp: Utc::now(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest-to-newest iteration over the whole window.
    pub fn iter(&self) -> impl Iterator<Item = &AttemptRecord> {
        self.entries.iter()
    }

    /// The `count` most recent entries, oldest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &AttemptRecord> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip)
    }
}

impl Default for ErrorDetectionWindow {
    fn default() -> Self {
        Self::new()
    }
}
