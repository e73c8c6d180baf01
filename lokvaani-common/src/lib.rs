//! # LokVaani Common Library
//!
//! Shared code for the LokVaani comment pipeline:
//! - SQLite schema, seed data and row models
//! - Statistic event types and the EventBus
//! - Bootstrap configuration loading
//! - SSE helpers for dashboard streams

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod sse;

pub use error::{Error, Result};
