// Error types and error handling module
// This file defines custom error types and error conversion logic
// for the breathe-backend project
//
// Numan Thabit 2025 Nov

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AnalyticsError {
    #[error("invalid observation: {reason}")]
    InvalidObservation { reason: String },
}

impl AnalyticsError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidObservation {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("provider error: {0}")]
    Provider(String),
    #[error("decode error: {0}")]
    Decode(String),
}
