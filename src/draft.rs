//! Draft query generation with a reflection pass.
//!
//! The completion-backed path runs draft -> critique -> revise (one pass,
//! never iterated) before handing the draft to the pipeline. Every failure
//! along that path degrades to the keyword fallback, so `generate_draft`
//! cannot fail. Safety of the produced SQL is NOT guaranteed here - the
//! executor re-validates every statement independently.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::OpenAiConfig;
use crate::dialect;
use crate::error::Result;
use crate::fallback;
use crate::llm::{ChatApi, LlmClient};
use crate::schema::{CANONICAL_ENTITY, DATABASE_SCHEMA};

/// Critique sentinel recorded when the review pass found nothing.
pub const NO_ISSUES: &str = "No issues found";

/// A candidate SQL query plus generation metadata, before safety
/// validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftQuery {
    pub sql: String,
    pub intent: String,
    pub entities: Vec<String>,
    pub filters: serde_json::Map<String, Value>,
    pub reasoning: String,
    pub critique: Option<String>,
    pub revised: bool,
}

#[derive(Debug, Clone, Default)]
struct Critique {
    needs_revision: bool,
    issues: Vec<String>,
}

/// How drafts are produced. Fixed once at construction: either the
/// completion service (with keyword fallback behind it) or keywords alone.
pub enum DraftBackend {
    Completion(Box<dyn ChatApi>),
    Keyword,
}

pub struct DraftService {
    backend: DraftBackend,
}

impl DraftService {
    pub fn new(backend: DraftBackend) -> Self {
        match &backend {
            DraftBackend::Completion(_) => info!("Completion-backed draft generation enabled"),
            DraftBackend::Keyword => warn!("Completion service disabled - using keyword-based fallback"),
        }
        Self { backend }
    }

    /// Select the backend from configuration.
    pub fn from_config(config: &OpenAiConfig) -> Result<Self> {
        if config.is_configured() {
            let client = LlmClient::new(
                config.api_key.clone(),
                config.model.clone(),
                config.base_url.clone(),
                std::time::Duration::from_secs(config.timeout_secs),
            )?;
            Ok(Self::new(DraftBackend::Completion(Box::new(client))))
        } else {
            Ok(Self::new(DraftBackend::Keyword))
        }
    }

    /// Generate a draft query from natural language. Never fails: any
    /// error on the completion path falls back to keyword generation on
    /// the original request text.
    pub async fn generate_draft(&self, natural_language_query: &str) -> DraftQuery {
        info!("Generating draft query: {}", natural_language_query);

        match &self.backend {
            DraftBackend::Completion(api) => {
                match generate_with_completion(api.as_ref(), natural_language_query).await {
                    Ok(draft) => draft,
                    Err(e) => {
                        error!("Completion generation failed, falling back to keywords: {}", e);
                        fallback::generate(natural_language_query)
                    }
                }
            }
            DraftBackend::Keyword => fallback::generate(natural_language_query),
        }
    }
}

async fn generate_with_completion(api: &dyn ChatApi, query: &str) -> Result<DraftQuery> {
    let draft = draft_stage(api, query).await?;
    let critique = critique_stage(api, query, &draft).await?;

    if critique.needs_revision {
        info!("Draft needs revision: {}", critique.issues.join("; "));
        let revised_draft = revise_stage(api, query, &draft, &critique.issues).await?;
        return Ok(DraftQuery {
            critique: Some(critique.issues.join("; ")),
            revised: true,
            ..revised_draft
        });
    }

    Ok(DraftQuery {
        critique: Some(NO_ISSUES.to_string()),
        revised: false,
        ..draft
    })
}

/// Step 1: initial draft from the completion service.
async fn draft_stage(api: &dyn ChatApi, query: &str) -> Result<DraftQuery> {
    let system = format!(
        r#"You are an expert SQL query generator for an inventory management system.

{}

Your task:
1. Convert natural language queries to SELECT-only SQL queries
2. Use proper JOINs to include category and location names
3. Apply appropriate filters, sorting, and limits
4. Return results in JSON format with:
   - sql: The SQL query
   - intent: The query intent (e.g., 'top_sellers', 'low_stock', 'list_items')
   - filters: Object with detected filters (e.g., {{"category": "Electronics"}})
   - reasoning: Brief explanation of your approach

Security Rules:
- ONLY SELECT queries are allowed
- NO INSERT, UPDATE, DELETE, DROP, ALTER, CREATE, or other modification statements
- Validate all inputs"#,
        DATABASE_SCHEMA
    );

    let response = api.chat_json(&system, query, 0.3).await?;

    let sql = response.get("sql").and_then(Value::as_str).unwrap_or_default();
    let intent = response
        .get("intent")
        .and_then(Value::as_str)
        .unwrap_or("unknown");

    info!("Completion generated SQL for intent '{}': {}", intent, sql);

    Ok(DraftQuery {
        sql: dialect::to_sqlite(sql),
        intent: intent.to_string(),
        entities: vec![CANONICAL_ENTITY.to_string()],
        filters: response
            .get("filters")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        reasoning: response
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        critique: None,
        revised: false,
    })
}

/// Step 2: self-review against the security/correctness/performance/intent
/// rubric. Malformed responses degrade to "no revision needed".
async fn critique_stage(api: &dyn ChatApi, query: &str, draft: &DraftQuery) -> Result<Critique> {
    let system = format!(
        r#"You are a SQL query reviewer. Review the SQL query for:

1. **Security**: Ensure it's SELECT-only, no dangerous operations
2. **Correctness**: Check syntax, table/column names, JOINs
3. **Performance**: Verify appropriate indexes are used, LIMIT clauses exist
4. **Intent Alignment**: Ensure query matches the user's request

{}

Return JSON with:
- needsRevision: boolean
- issues: array of strings (empty if no issues)
- suggestions: array of improvements (if any)"#,
        DATABASE_SCHEMA
    );

    let user = format!(
        "User Query: \"{}\"\n\nGenerated SQL:\n{}\n\nReview this query and identify any issues.",
        query, draft.sql
    );

    let response = api.chat_json(&system, &user, 0.2).await?;

    Ok(Critique {
        needs_revision: response
            .get("needsRevision")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        issues: response
            .get("issues")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    })
}

/// Step 3: corrected draft. Fields missing from the response fall back to
/// the original draft field by field.
async fn revise_stage(
    api: &dyn ChatApi,
    query: &str,
    draft: &DraftQuery,
    issues: &[String],
) -> Result<DraftQuery> {
    let system = format!(
        r#"You are an expert SQL query generator. Revise the SQL query to address the identified issues.

{}

Return JSON with the corrected query in the same format as before."#,
        DATABASE_SCHEMA
    );

    let user = format!(
        "User Query: \"{}\"\n\nOriginal SQL:\n{}\n\nIssues Found:\n{}\n\nGenerate a corrected SQL query that addresses these issues.",
        query,
        draft.sql,
        issues.join("\n")
    );

    let response = api.chat_json(&system, &user, 0.3).await?;

    Ok(DraftQuery {
        sql: response
            .get("sql")
            .and_then(Value::as_str)
            .map(dialect::to_sqlite)
            .unwrap_or_else(|| draft.sql.clone()),
        intent: response
            .get("intent")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| draft.intent.clone()),
        entities: vec![CANONICAL_ENTITY.to_string()],
        filters: response
            .get("filters")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_else(|| draft.filters.clone()),
        reasoning: response
            .get("reasoning")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| draft.reasoning.clone()),
        critique: None,
        revised: false,
    })
}
