//! Observability setup for Suasion.

pub mod genai_attrs;
pub mod tracing_setup;
