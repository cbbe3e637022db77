//! Retrieval over archived cases.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::domains::jobs::repository;

/// One prior case handed to the planner as context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedCase {
    pub case_id: String,
    pub task_summary: String,
    pub tags: Vec<String>,
    pub failure_reason: Option<String>,
    pub fix_strategy: Option<String>,
    pub score: f64,
}

/// Read-only retrieval seam. A vector index lives behind this same trait;
/// the in-repo implementation is lexical.
#[async_trait]
pub trait CaseRetriever: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedCase>>;
}

/// Token-overlap retrieval over the most recent archived cases.
pub struct LexicalCaseRetriever {
    pool: PgPool,
    scan_limit: i64,
}

impl LexicalCaseRetriever {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            scan_limit: 200,
        }
    }
}

#[async_trait]
impl CaseRetriever for LexicalCaseRetriever {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedCase>> {
        let rows = repository::list_recent_cases(&self.pool, self.scan_limit).await?;

        let query_tokens: HashSet<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let mut ranked: Vec<RetrievedCase> = rows
            .into_iter()
            .map(|case| {
                let text = format!("{} {}", case.task_summary, case.tags.join(" ")).to_lowercase();
                let tokens: HashSet<&str> = text.split_whitespace().collect();
                let overlap = query_tokens
                    .iter()
                    .filter(|token| tokens.contains(token.as_str()))
                    .count();
                let score = overlap as f64 / query_tokens.len().max(1) as f64;

                RetrievedCase {
                    case_id: case.id.to_string(),
                    task_summary: case.task_summary,
                    tags: case.tags,
                    failure_reason: case.failure_reason,
                    fix_strategy: case.fix_strategy,
                    score,
                }
            })
            .collect();

        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(top_k);
        Ok(ranked)
    }
}
