// Transport layer for downstream services
//
// Numan Thabit 2025 Nov

pub mod ollama;

pub use ollama::{GenerateOptions, OllamaClient};
