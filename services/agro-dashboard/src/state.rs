//! Shared state for the demonstration view

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// One synthetic reading, labelled with the local wall-clock time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub time: String,
    pub soil_moisture: f64,
    pub air_humidity: f64,
    pub temperature: f64,
}

/// Most recent readings, oldest first, capped at `capacity`
#[derive(Debug, Clone)]
pub struct RollingHistory {
    points: VecDeque<HistoryPoint>,
    capacity: usize,
}

impl RollingHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a point, evicting the oldest once the cap is exceeded
    pub fn push(&mut self, point: HistoryPoint) {
        if self.capacity == 0 {
            return;
        }
        if self.points.len() >= self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&HistoryPoint> {
        self.points.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    pub fn to_vec(&self) -> Vec<HistoryPoint> {
        self.points.iter().cloned().collect()
    }
}

/// State shared by the synthetic generator and the dashboard
#[derive(Debug)]
pub struct SharedState {
    pub history: RollingHistory,
    /// Readings generated since startup, including evicted ones
    pub ticks: u64,
}

impl SharedState {
    pub fn new(history_size: usize) -> Self {
        Self {
            history: RollingHistory::new(history_size),
            ticks: 0,
        }
    }

    /// Record one generator tick
    pub fn record(&mut self, point: HistoryPoint) {
        self.ticks += 1;
        self.history.push(point);
    }

    /// Current synthetic values
    pub fn current(&self) -> Option<&HistoryPoint> {
        self.history.latest()
    }
}

/// Thread-safe shared state handle
pub type StateHandle = Arc<RwLock<SharedState>>;

pub fn new_state_handle(history_size: usize) -> StateHandle {
    Arc::new(RwLock::new(SharedState::new(history_size)))
}
