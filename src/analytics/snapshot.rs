// Snapshot types for request analytics
// Point-in-time summaries derived from the aggregator counters,
// plus the feature-tag table and the downstream health verdict
//
// Numan Thabit 2025 Nov

use serde::Serialize;
use std::fmt;

pub const CHAT_ROUTE: &str = "/api/chat";
pub const HEALTH_ROUTE: &str = "/api/health";
pub const DIAGNOSTIC_ROUTE: &str = "/api/ollama-test";

/// Success rate (percent) the downstream model must strictly exceed to be healthy
pub const HEALTHY_SUCCESS_RATE_PERCENT: f64 = 90.0;

/// Route category used to bucket request counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureTag {
    Chat,
    Health,
    Diagnostic,
}

impl FeatureTag {
    /// Exact match against the recognized routes; anything else is uncategorized.
    pub fn from_endpoint(endpoint: &str) -> Option<Self> {
        match endpoint {
            CHAT_ROUTE => Some(Self::Chat),
            HEALTH_ROUTE => Some(Self::Health),
            DIAGNOSTIC_ROUTE => Some(Self::Diagnostic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeatureCounts {
    pub chat: u64,
    pub health: u64,
    pub diagnostic: u64,
}

impl FeatureCounts {
    pub(crate) fn increment(&mut self, tag: FeatureTag) {
        match tag {
            FeatureTag::Chat => self.chat += 1,
            FeatureTag::Health => self.health += 1,
            FeatureTag::Diagnostic => self.diagnostic += 1,
        }
    }

    pub fn get(&self, tag: FeatureTag) -> u64 {
        match tag {
            FeatureTag::Chat => self.chat,
            FeatureTag::Health => self.health,
            FeatureTag::Diagnostic => self.diagnostic,
        }
    }
}

/// Immutable summary returned by `RequestAnalyticsAggregator::snapshot`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub uptime_millis: u64,
    pub requests: u64,
    pub errors: u64,
    pub error_rate_percent: f64,
    pub avg_response_time_millis: f64,
    pub external_calls: u64,
    pub external_call_errors: u64,
    pub external_call_success_rate_percent: f64,
    pub avg_external_call_millis: f64,
    pub active_users: usize,
    pub features: FeatureCounts,
}

impl Metrics {
    pub fn health_verdict(&self) -> HealthStatus {
        if self.external_call_success_rate_percent > HEALTHY_SUCCESS_RATE_PERCENT {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        }
    }
}

/// Classification of the downstream model service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round to two decimals, half-up for the non-negative values used here.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `100 * part / whole`, rounded; `None` when `whole` is zero.
pub(crate) fn percent(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(round2(100.0 * part as f64 / whole as f64))
    }
}
