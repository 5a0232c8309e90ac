// Library root module for breathe-backend
// This file defines the public API and module structure for the backend
// library: request analytics, the HTTP API, and the model proxy
//
// Numan Thabit 2025 Nov

pub mod analytics;
pub mod config;
pub mod errors;
pub mod knowledge;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod state;
pub mod transport;
