// Analytics module - request and downstream-call accounting
// This file wires the aggregator and its snapshot types
//
// Numan Thabit 2025 Nov

pub mod aggregator;
pub mod snapshot;

pub use aggregator::RequestAnalyticsAggregator;
pub use snapshot::{FeatureCounts, FeatureTag, HealthStatus, Metrics};
