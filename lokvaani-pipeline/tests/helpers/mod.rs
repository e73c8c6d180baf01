//! Test Helper Utilities
//!
//! Shared utilities for testing lokvaani-pipeline

#![allow(dead_code)]

pub mod db_utils;
pub mod fakes;

pub use db_utils::{analyze_comment, category_id, create_test_db, seed_comment};
pub use fakes::{
    FakeAnalyzer, FakeAnswerer, FakeEmbedder, FakeGenerator, FakeSummarizer,
};

use lokvaani_pipeline::services::Services;
use std::sync::Arc;

/// Fake service set with default behaviour everywhere
pub fn fake_services() -> Services {
    Services {
        generator: Arc::new(FakeGenerator::default()),
        analyzer: Arc::new(FakeAnalyzer::positive()),
        embedder: Arc::new(FakeEmbedder::default()),
        answerer: Arc::new(FakeAnswerer::default()),
        summarizer: Arc::new(FakeSummarizer::default()),
    }
}
