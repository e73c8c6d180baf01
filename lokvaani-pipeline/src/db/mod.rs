//! Comment store queries
//!
//! Free functions over `&SqlitePool`. Every comment mutation touches one row
//! and overwrites derived fields, so re-running a step is harmless.

pub mod categories;
pub mod comments;
pub mod posts;
pub mod summaries;
pub mod vectors;
