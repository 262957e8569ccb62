//! CLI command implementations.

pub mod commands;

pub use commands::{convert, inspect, validate, ConvertOptions, OutputMode};
