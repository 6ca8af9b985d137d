//! Process-wide logging setup.

/// Install the default subscriber (JSON, `RUST_LOG` filter, `info` fallback).
///
/// Safe to call more than once; only the first call installs anything.
pub fn init() {
    tracing::init(tracing::LogFormat::from_env());
}

pub mod tracing;
