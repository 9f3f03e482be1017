//! NL query pipeline: draft -> review -> execute.
//!
//! Sequences generation and execution around a session record, persisting
//! every status change to the injected store. Failures are recorded on the
//! session before being surfaced to the caller.

use std::sync::Arc;

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::{error, info};

use crate::draft::{DraftQuery, DraftService};
use crate::error::{NlqError, Result};
use crate::executor::{QueryExecutor, QueryResult};
use crate::session::{
    QuerySession, QuerySessionStatus, ResultSummary, ReviewFindings, SafetyChecks, SessionStore,
};

lazy_static! {
    static ref LIMIT_CLAUSE: Regex = Regex::new(r"(?i)\bLIMIT\s+\d+").unwrap();
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    pub session: QuerySession,
    pub results: Option<QueryResult>,
}

pub struct QueryPipeline {
    drafts: DraftService,
    executor: QueryExecutor,
    sessions: Arc<dyn SessionStore>,
}

impl QueryPipeline {
    pub fn new(
        drafts: DraftService,
        executor: QueryExecutor,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            drafts,
            executor,
            sessions,
        }
    }

    /// Process a natural language query through the full pipeline. On
    /// failure the terminal session state is persisted before the error is
    /// returned; callers can read it back from the store by id.
    pub async fn process_query(
        &self,
        natural_language_query: &str,
        user_id: &str,
        session_id: &str,
    ) -> Result<PipelineOutcome> {
        info!(
            "Processing NL query for session {} (user {}): {}",
            session_id, user_id, natural_language_query
        );

        let draft = self.drafts.generate_draft(natural_language_query).await;

        let mut session = QuerySession::new(session_id, user_id, natural_language_query);
        session.draft_query = Some(draft.sql.clone());
        self.sessions.put(&session)?;

        session.advance(QuerySessionStatus::Reviewing)?;
        session.review_findings = Some(review_draft(&draft));
        self.sessions.put(&session)?;

        // An empty draft is the one thing review declines outright; every
        // other safety decision belongs to the executor.
        if draft.sql.trim().is_empty() {
            session.advance(QuerySessionStatus::Rejected)?;
            self.sessions.put(&session)?;
            error!("Rejecting session {}: draft query is empty", session_id);
            return Err(NlqError::Validation("Draft query is empty".to_string()));
        }

        session.advance(QuerySessionStatus::Executing)?;
        self.sessions.put(&session)?;

        match self.executor.execute_query(&draft.sql).await {
            Ok(results) => {
                session.advance(QuerySessionStatus::Executed)?;
                session.final_query = Some(draft.sql.clone());
                session.executed_at = Some(Utc::now());
                session.result_summary = Some(ResultSummary {
                    row_count: results.row_count,
                    key_aggregates: serde_json::Map::new(),
                });
                self.sessions.put(&session)?;

                info!(
                    "Query pipeline completed for session {}: {} rows",
                    session_id, results.row_count
                );

                Ok(PipelineOutcome {
                    session,
                    results: Some(results),
                })
            }
            Err(e) => {
                session.advance(QuerySessionStatus::Failed)?;
                self.sessions.put(&session)?;
                error!("Query pipeline failed for session {}: {}", session_id, e);
                Err(e)
            }
        }
    }
}

/// Advisory review of a draft before execution.
fn review_draft(draft: &DraftQuery) -> ReviewFindings {
    let is_read_only = QueryExecutor::validate(&draft.sql).is_ok();
    let has_row_limit = LIMIT_CLAUSE.is_match(&draft.sql);
    let has_time_filter = draft.filters.contains_key("timeRange");

    let mut flags = Vec::new();
    if !is_read_only {
        flags.push("Draft is not a read-only SELECT".to_string());
    }
    if !has_row_limit {
        flags.push("Draft has no explicit row limit".to_string());
    }

    ReviewFindings {
        flags,
        adjustments: Vec::new(),
        defaults_applied: Vec::new(),
        safety_checks: SafetyChecks {
            is_read_only,
            has_row_limit,
            has_time_filter,
        },
    }
}
