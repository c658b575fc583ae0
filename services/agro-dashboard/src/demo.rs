//! Synthetic data generator for the demonstration view

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::state::{HistoryPoint, StateHandle};

/// Produces one random reading per interval into the shared history
pub struct SyntheticGenerator {
    interval: Duration,
    rng: StdRng,
}

impl SyntheticGenerator {
    pub fn new(interval: Duration) -> Self {
        Self::with_rng(interval, StdRng::from_entropy())
    }

    pub fn with_rng(interval: Duration, rng: StdRng) -> Self {
        Self { interval, rng }
    }

    /// Draw one reading labelled with the local time
    pub fn sample(&mut self) -> HistoryPoint {
        HistoryPoint {
            time: chrono::Local::now().format("%H:%M:%S").to_string(),
            soil_moisture: self.rng.gen_range(0.0..100.0),
            air_humidity: self.rng.gen_range(0.0..100.0),
            temperature: self.rng.gen_range(0.0..40.0),
        }
    }

    /// Run until `cancel` fires. The first reading is taken immediately.
    pub fn spawn(self, state: StateHandle, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(state, cancel))
    }

    async fn run(mut self, state: StateHandle, cancel: CancellationToken) {
        tracing::debug!("Synthetic generator started ({:?} interval)", self.interval);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let point = self.sample();
            let mut guard = state.write().await;
            if cancel.is_cancelled() {
                break;
            }
            guard.record(point);
        }
        tracing::debug!("Synthetic generator stopped");
    }
}
