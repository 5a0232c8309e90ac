// Request analytics aggregator
// Accumulates completed HTTP requests and downstream model calls
// and derives snapshots and the health verdict from them
//
// Numan Thabit 2025 Nov

use crate::analytics::snapshot::{percent, round2, FeatureCounts, FeatureTag, HealthStatus, Metrics};
use crate::errors::AnalyticsError;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Running count and sum so latency tracking stays constant-size
#[derive(Debug, Clone, Copy, Default)]
struct RunningMean {
    count: u64,
    sum: f64,
}

impl RunningMean {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
    }

    fn rounded(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            round2(self.sum / self.count as f64)
        }
    }
}

#[derive(Debug, Default)]
struct CounterState {
    total_requests: u64,
    total_errors: u64,
    response_times: RunningMean,
    external_call_total: u64,
    external_call_errors: u64,
    external_call_times: RunningMean,
    unique_users: HashSet<String>,
    feature_counts: FeatureCounts,
}

/// Process-lifetime request analytics, shared behind an `Arc`
#[derive(Debug)]
pub struct RequestAnalyticsAggregator {
    state: Mutex<CounterState>,
    started_at: Instant,
}

impl Default for RequestAnalyticsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestAnalyticsAggregator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CounterState::default()),
            started_at: Instant::now(),
        }
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Record one completed request/response cycle.
    ///
    /// Only the exact routes known to [`FeatureTag::from_endpoint`] bump a
    /// feature counter; other endpoints are counted but left uncategorized.
    pub fn record_request(
        &self,
        endpoint: &str,
        method: &str,
        elapsed_millis: f64,
        status_code: u16,
    ) -> Result<(), AnalyticsError> {
        validate_elapsed(elapsed_millis)?;
        if !(100..=599).contains(&status_code) {
            return Err(AnalyticsError::invalid(format!(
                "status code {status_code} outside 100-599 for {method} {endpoint}"
            )));
        }

        let mut state = self.lock();
        state.total_requests += 1;
        state.response_times.push(elapsed_millis);
        if status_code >= 400 {
            state.total_errors += 1;
        }
        if let Some(tag) = FeatureTag::from_endpoint(endpoint) {
            state.feature_counts.increment(tag);
        }
        Ok(())
    }

    /// Record one attempt against the downstream model service.
    pub fn record_external_call(
        &self,
        succeeded: bool,
        elapsed_millis: f64,
    ) -> Result<(), AnalyticsError> {
        validate_elapsed(elapsed_millis)?;

        let mut state = self.lock();
        state.external_call_total += 1;
        if !succeeded {
            state.external_call_errors += 1;
        }
        state.external_call_times.push(elapsed_millis);
        Ok(())
    }

    pub fn record_user(&self, user_id: &str) {
        let mut state = self.lock();
        if !state.unique_users.contains(user_id) {
            state.unique_users.insert(user_id.to_string());
        }
    }

    pub fn snapshot(&self) -> Metrics {
        let state = self.lock();
        Metrics {
            uptime_millis: u64::try_from(self.started_at.elapsed().as_millis())
                .unwrap_or(u64::MAX),
            requests: state.total_requests,
            errors: state.total_errors,
            error_rate_percent: percent(state.total_errors, state.total_requests).unwrap_or(0.0),
            avg_response_time_millis: state.response_times.rounded(),
            external_calls: state.external_call_total,
            external_call_errors: state.external_call_errors,
            // No observations yet counts as fully successful.
            external_call_success_rate_percent: percent(
                state.external_call_total - state.external_call_errors,
                state.external_call_total,
            )
            .unwrap_or(100.0),
            avg_external_call_millis: state.external_call_times.rounded(),
            active_users: state.unique_users.len(),
            features: state.feature_counts,
        }
    }

    pub fn health_verdict(&self) -> HealthStatus {
        self.snapshot().health_verdict()
    }

    fn lock(&self) -> MutexGuard<'_, CounterState> {
        // Every mutation completes before the guard drops, so a poisoned lock
        // still holds consistent counters.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_elapsed(elapsed_millis: f64) -> Result<(), AnalyticsError> {
    if elapsed_millis.is_finite() && elapsed_millis >= 0.0 {
        Ok(())
    } else {
        Err(AnalyticsError::invalid(format!(
            "elapsed time {elapsed_millis}ms must be a non-negative finite number"
        )))
    }
}
