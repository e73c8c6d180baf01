//! lokvaani-pipeline library interface
//!
//! Exposes the workers, services and HTTP router for the binary and for
//! integration tests.

pub mod aggregation;
pub mod api;
pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod intake;
pub mod rag;
pub mod services;
pub mod utils;
pub mod workers;

pub use crate::error::{ApiError, ApiResult};

use crate::aggregation::AggregationEngine;
use crate::broadcast::BroadcastService;
use crate::config::PipelineConfig;
use crate::intake::{CompletionRegistry, IntakeService};
use crate::rag::RagService;
use crate::services::Services;
use axum::Router;
use chrono::{DateTime, Utc};
use lokvaani_common::events::EventBus;
use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub aggregation: AggregationEngine,
    pub broadcast: BroadcastService,
    pub rag: RagService,
    pub intake: IntakeService,
    /// Attempt ceiling, reported by the health endpoint's quarantine count
    pub max_processing_attempts: i64,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Fired on shutdown; stops background tasks and ends open SSE streams
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(db: SqlitePool, services: &Services, config: &PipelineConfig) -> Self {
        let aggregation = AggregationEngine::new(
            db.clone(),
            services.summarizer.clone(),
            config.narrative_policy,
        );
        let broadcast = BroadcastService::new(
            aggregation.clone(),
            EventBus::new(config.event_capacity),
            config.broadcast_interval,
        );
        let rag = RagService::new(
            db.clone(),
            services.embedder.clone(),
            services.answerer.clone(),
            config.rag.clone(),
        );
        let intake = IntakeService::new(db.clone(), CompletionRegistry::new(), config.intake_timeout);

        Self {
            db,
            aggregation,
            broadcast,
            rag,
            intake,
            max_processing_attempts: config.analysis.max_attempts,
            startup_time: Utc::now(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Registry the analysis worker resolves manual submissions through
    pub fn completion_registry(&self) -> CompletionRegistry {
        self.intake.registry().clone()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::event_routes())
        .merge(api::stats_routes())
        .merge(api::post_routes())
        .merge(api::summary_routes())
        .merge(api::intake_routes())
        .merge(api::agent_routes())
        // Dashboards connect from other origins
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
