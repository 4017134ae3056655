// Signal detection module
pub mod crossover;
pub mod state;

pub use crossover::{detect, DetectionParams};
pub use state::SignalStateStore;
