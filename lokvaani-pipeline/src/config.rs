//! Runtime configuration resolved from the bootstrap TOML
//!
//! `TomlConfig` stores plain seconds and counts; this module turns them into
//! the `Duration`s, retry policies and per-component settings the workers and
//! services are constructed with.

use crate::rag::{ChunkingConfig, RagConfig};
use crate::utils::{Backoff, RetryPolicy};
use crate::workers::analysis::AnalysisSettings;
use lokvaani_common::config::TomlConfig;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub ingestion_interval: Duration,
    pub comments_per_run: usize,
    pub generator_policy: RetryPolicy,
    pub analysis: AnalysisSettings,
    pub analyzer_policy: RetryPolicy,
    pub narrative_policy: RetryPolicy,
    pub broadcast_interval: Duration,
    pub event_capacity: usize,
    pub health_interval: Duration,
    pub intake_timeout: Duration,
    pub rag: RagConfig,
}

impl PipelineConfig {
    pub fn from_toml(config: &TomlConfig) -> Self {
        let workers = &config.workers;
        let agent = &config.agent;

        Self {
            ingestion_interval: Duration::from_secs(workers.ingestion_interval_secs.max(1)),
            comments_per_run: workers.comments_per_run,
            generator_policy: RetryPolicy::new(
                workers.generator_max_attempts,
                Duration::from_secs(workers.generator_timeout_secs),
            )
            .with_backoff(match workers.generator_backoff_ms {
                0 => Backoff::None,
                ms => Backoff::Fixed(Duration::from_millis(ms)),
            }),
            analysis: AnalysisSettings {
                batch_size: workers.analysis_batch_size,
                max_attempts: workers.max_processing_attempts,
                lease_timeout: Duration::from_secs(workers.lease_timeout_secs),
                interval: Duration::from_secs(workers.analysis_interval_secs.max(1)),
            },
            analyzer_policy: RetryPolicy::once(Duration::from_secs(workers.analyzer_timeout_secs)),
            narrative_policy: RetryPolicy::once(Duration::from_secs(workers.summarizer_timeout_secs)),
            broadcast_interval: Duration::from_secs(config.broadcast.interval_secs.max(1)),
            event_capacity: config.broadcast.channel_capacity,
            health_interval: Duration::from_secs(workers.health_interval_secs.max(1)),
            intake_timeout: Duration::from_secs(workers.intake_timeout_secs),
            rag: RagConfig {
                chunking: ChunkingConfig {
                    chunk_size: agent.chunk_size,
                    overlap: agent.chunk_overlap,
                    min_chars: agent.min_chunk_chars,
                },
                embed_max_chars: agent.embed_max_chars,
                chunk_delay: Duration::from_millis(agent.chunk_delay_ms),
                comment_batch_size: agent.comment_batch_size,
                batch_delay: Duration::from_millis(agent.batch_delay_ms),
                comment_sync_limit: agent.comment_sync_limit,
                top_k_chunks: agent.top_k_chunks,
                top_k_comments: agent.top_k_comments,
                embedding_policy: RetryPolicy::once(Duration::from_secs(agent.embedding_timeout_secs)),
                answer_policy: RetryPolicy::once(Duration::from_secs(agent.answer_timeout_secs)),
            },
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_toml(&TomlConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_call_sites() {
        let config = PipelineConfig::default();

        assert_eq!(config.generator_policy.max_attempts, 3);
        assert_eq!(config.generator_policy.per_attempt_timeout, Duration::from_secs(15));
        assert_eq!(config.generator_policy.backoff, Backoff::None);
        assert_eq!(config.analyzer_policy.max_attempts, 1);
        assert_eq!(config.analyzer_policy.per_attempt_timeout, Duration::from_secs(60));
        assert_eq!(config.narrative_policy.per_attempt_timeout, Duration::from_secs(600));
        assert_eq!(config.rag.embedding_policy.per_attempt_timeout, Duration::from_secs(30));
        assert_eq!(config.rag.answer_policy.per_attempt_timeout, Duration::from_secs(120));
        assert_eq!(config.analysis.lease_timeout, Duration::from_secs(300));
        assert_eq!(config.broadcast_interval, Duration::from_secs(15));
        assert_eq!(config.rag.chunking.step(), 600);
    }

    #[test]
    fn test_toml_overrides_flow_through() {
        let toml: TomlConfig = toml::from_str(
            r#"
            [workers]
            comments_per_run = 5
            max_processing_attempts = 4
            generator_backoff_ms = 250

            [agent]
            chunk_size = 400
            chunk_overlap = 100
            "#,
        )
        .unwrap();

        let config = PipelineConfig::from_toml(&toml);
        assert_eq!(config.comments_per_run, 5);
        assert_eq!(config.analysis.max_attempts, 4);
        assert_eq!(
            config.generator_policy.backoff,
            Backoff::Fixed(Duration::from_millis(250))
        );
        assert_eq!(config.rag.chunking.step(), 300);
    }
}
