//! Structured errors for `lineage-core`.
//!
//! Graph data never produces an error: unknown ids and ambiguous links only
//! change chain shape. The fallible surface is configuration.

/// A layout configuration value outside its valid domain.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("cost weight `{name}` must be finite and non-negative, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },

    #[error("initial temperature must be positive and finite, got {0}")]
    InvalidTemperature(f64),

    #[error("cooling rate must lie strictly between 0 and 1, got {0}")]
    InvalidCoolingRate(f64),

    #[error("max group size must be at least 1")]
    EmptyGroupSize,

    #[error("phase `{0}` lists no strategies")]
    EmptyPhase(String),
}
