//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (config loading, argument conversion)
//! - `encode` - Feature encoding and rule-based risk breakdown
//! - `generate` - Synthetic sample generation and CSV export
//! - `train` - Training runs and transaction assessment
//! - `config` - Effective configuration display

pub mod config;
pub mod core;
pub mod encode;
pub mod generate;
pub mod train;

// Re-export command functions for main.rs
pub use config::*;
pub use core::*;
pub use encode::*;
pub use generate::*;
pub use train::*;

/// Format an optional ratio as a percentage
pub fn format_percent(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "n/a".to_string(),
    }
}
