//! Shared utilities for the canopy workspace

pub mod tracing;
