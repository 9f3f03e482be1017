//! Query session lifecycle.
//!
//! A session records one natural-language-to-result attempt:
//! `Drafted -> Reviewing -> (Rejected | Executing) -> (Executed | Failed)`.
//! Sessions are held in an injected `SessionStore`; implementations own
//! their synchronization.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{NlqError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuerySessionStatus {
    Drafted,
    Reviewing,
    Rejected,
    Executing,
    Executed,
    Failed,
}

impl QuerySessionStatus {
    /// Legal edges of the session state machine.
    pub fn can_transition(self, next: QuerySessionStatus) -> bool {
        use QuerySessionStatus::*;
        matches!(
            (self, next),
            (Drafted, Reviewing)
                | (Reviewing, Rejected)
                | (Reviewing, Executing)
                | (Executing, Executed)
                | (Executing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            QuerySessionStatus::Rejected | QuerySessionStatus::Executed | QuerySessionStatus::Failed
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyChecks {
    pub is_read_only: bool,
    pub has_row_limit: bool,
    pub has_time_filter: bool,
}

impl Default for SafetyChecks {
    fn default() -> Self {
        Self {
            is_read_only: true,
            has_row_limit: false,
            has_time_filter: false,
        }
    }
}

/// Findings recorded by the pipeline's review stage. Advisory: enforcement
/// of the read-only contract stays in the executor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFindings {
    pub flags: Vec<String>,
    pub adjustments: Vec<String>,
    pub defaults_applied: Vec<String>,
    pub safety_checks: SafetyChecks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub row_count: usize,
    pub key_aggregates: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySession {
    pub id: String,
    pub user_id: String,
    pub natural_language_query: String,
    pub draft_query: Option<String>,
    pub review_findings: Option<ReviewFindings>,
    pub final_query: Option<String>,
    pub status: QuerySessionStatus,
    pub executed_at: Option<DateTime<Utc>>,
    pub result_summary: Option<ResultSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuerySession {
    pub fn new(id: &str, user_id: &str, natural_language_query: &str) -> Self {
        let now = Utc::now();
        Self {
            id: id.to_string(),
            user_id: user_id.to_string(),
            natural_language_query: natural_language_query.to_string(),
            draft_query: None,
            review_findings: None,
            final_query: None,
            status: QuerySessionStatus::Drafted,
            executed_at: None,
            result_summary: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance the state machine, refreshing `updated_at`. Transitions
    /// outside the machine are rejected so a session can never skip review
    /// or leave a terminal state.
    pub fn advance(&mut self, next: QuerySessionStatus) -> Result<()> {
        if !self.status.can_transition(next) {
            return Err(NlqError::Session(format!(
                "Invalid session transition: {:?} -> {:?}",
                self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Storage abstraction for sessions. The pipeline persists every status
/// change through this, so a concurrent reader never observes a torn
/// status/timestamp pair.
pub trait SessionStore: Send + Sync {
    fn put(&self, session: &QuerySession) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<QuerySession>>;
}

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, QuerySession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn put(&self, session: &QuerySession) -> Result<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| NlqError::Session("Session store lock poisoned".to_string()))?;
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<QuerySession>> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| NlqError::Session("Session store lock poisoned".to_string()))?;
        Ok(sessions.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        use QuerySessionStatus::*;

        assert!(Drafted.can_transition(Reviewing));
        assert!(Reviewing.can_transition(Rejected));
        assert!(Reviewing.can_transition(Executing));
        assert!(Executing.can_transition(Executed));
        assert!(Executing.can_transition(Failed));

        // no skipping review, no leaving terminal states
        assert!(!Drafted.can_transition(Executing));
        assert!(!Drafted.can_transition(Executed));
        assert!(!Executed.can_transition(Executing));
        assert!(!Rejected.can_transition(Reviewing));
        assert!(!Failed.can_transition(Drafted));
    }

    #[test]
    fn test_terminal_states() {
        use QuerySessionStatus::*;
        assert!(Rejected.is_terminal());
        assert!(Executed.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Drafted.is_terminal());
        assert!(!Reviewing.is_terminal());
        assert!(!Executing.is_terminal());
    }

    #[test]
    fn test_advance_refreshes_updated_at() {
        let mut session = QuerySession::new("s-1", "u-1", "low stock items");
        let before = session.updated_at;

        session.advance(QuerySessionStatus::Reviewing).unwrap();
        assert_eq!(session.status, QuerySessionStatus::Reviewing);
        assert!(session.updated_at >= before);
    }

    #[test]
    fn test_advance_rejects_illegal_transition() {
        let mut session = QuerySession::new("s-1", "u-1", "low stock items");

        let err = session.advance(QuerySessionStatus::Executed).unwrap_err();
        assert!(matches!(err, NlqError::Session(_)));
        assert_eq!(session.status, QuerySessionStatus::Drafted);
    }

    #[test]
    fn test_in_memory_store_round_trip() {
        let store = InMemorySessionStore::new();
        let session = QuerySession::new("s-1", "u-1", "top sellers");

        store.put(&session).unwrap();
        let loaded = store.get("s-1").unwrap().unwrap();
        assert_eq!(loaded.user_id, "u-1");
        assert_eq!(loaded.status, QuerySessionStatus::Drafted);

        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_session_serializes_camel_case() {
        let session = QuerySession::new("s-1", "u-1", "top sellers");
        let json = serde_json::to_value(&session).unwrap();

        assert!(json.get("naturalLanguageQuery").is_some());
        assert!(json.get("userId").is_some());
        assert_eq!(json["status"], "drafted");
    }
}
