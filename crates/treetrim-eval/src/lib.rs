//! Batch evaluation of pruned completions and threshold calibration.

pub mod calibration;
mod config;
pub mod pac;
mod pipeline;

pub use config::{ConfigError, PipelineConfig};
pub use pipeline::{Batch, Pipeline, Record, Sample, SampleError, Skipped};
