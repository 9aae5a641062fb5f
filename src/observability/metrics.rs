//! Cube Metrics
//!
//! Call, exception and duration counters around cube builds.

use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Telemetry sink injected into the cube
pub trait CubeTelemetry: Send + Sync {
    fn record_call(&self);
    fn record_exception(&self);
    fn record_duration(&self, elapsed: Duration);
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl CubeTelemetry for NoopTelemetry {
    fn record_call(&self) {}
    fn record_exception(&self) {}
    fn record_duration(&self, _elapsed: Duration) {}
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CubeCounters {
    pub calls: u64,
    pub exceptions: u64,
    pub duration_nanos: u128,
}

/// Counter-backed telemetry; clones share the same counters
#[derive(Debug, Clone, Default)]
pub struct CubeMetrics {
    counters: Arc<Mutex<CubeCounters>>,
}

impl CubeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CubeCounters {
        *self.lock()
    }

    pub fn calls(&self) -> u64 {
        self.lock().calls
    }

    pub fn exceptions(&self) -> u64 {
        self.lock().exceptions
    }

    pub fn total_duration(&self) -> Duration {
        let nanos = self.lock().duration_nanos;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CubeCounters> {
        // counters stay consistent even if a holder panicked
        self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CubeTelemetry for CubeMetrics {
    fn record_call(&self) {
        self.lock().calls += 1;
    }

    fn record_exception(&self) {
        self.lock().exceptions += 1;
    }

    fn record_duration(&self, elapsed: Duration) {
        self.lock().duration_nanos += elapsed.as_nanos();
    }
}
