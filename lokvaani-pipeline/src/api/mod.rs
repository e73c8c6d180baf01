//! HTTP API handlers for lokvaani-pipeline

pub mod agent;
pub mod health;
pub mod intake;
pub mod posts;
pub mod sse;
pub mod stats;
pub mod summaries;

pub use agent::agent_routes;
pub use health::health_routes;
pub use intake::intake_routes;
pub use posts::post_routes;
pub use sse::event_routes;
pub use stats::stats_routes;
pub use summaries::summary_routes;
