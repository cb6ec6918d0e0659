// Observability: metrics recorder and per-stage metric helpers

pub mod metrics;

pub use metrics::{init, render};
