//! Shared domain types for Suasion.
//!
//! This crate holds the data shapes exchanged between the orchestration
//! engine (`suasion-core`), the adapters (`suasion-infra`), and the CLI.
//! It depends only on serde/uuid/chrono/thiserror -- never on IO crates.

pub mod config;
pub mod conversation;
pub mod error;
pub mod event;
pub mod llm;
pub mod retrieval;
