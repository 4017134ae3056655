// Core modules
pub mod api;
pub mod config;
pub mod indicators;
pub mod models;
pub mod notify;
pub mod scanner;
pub mod strategy;

// Re-export commonly used types
pub use models::*;
pub use strategy::{detect, DetectionParams, SignalStateStore};

// Error handling
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
