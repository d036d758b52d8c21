//! Core types, configuration and ambient plumbing

pub mod config;
pub mod error;
pub mod log;
pub mod rates;

// Re-export main types for cleaner imports
pub use config::AppConfig;
pub use error::UpstreamError;
pub use rates::{ConversionProvider, ConversionResult, RateProvider, RateSet, SymbolSet};
