//! Metrics for accord bots.
//!
//! Library crates record through the `metrics` facade, which is a no-op until
//! a recorder is installed. With the `prometheus` feature, [`init_metrics`]
//! installs a Prometheus recorder and serves it over HTTP.
//!
//! ```rust,ignore
//! use accord_metrics::{commands, counter, labels};
//!
//! counter!(commands::EXECUTED_TOTAL, labels::COMMAND => "ping").increment(1);
//! ```

mod definitions;
mod recorder;

pub use {
    definitions::*,
    recorder::{MetricsHandle, MetricsRecorderConfig, init_metrics},
};

pub use metrics::{counter, histogram};
