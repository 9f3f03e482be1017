//! Keyword-based draft generation.
//!
//! Used when no completion service is configured and whenever the
//! completion path fails. Pure function of the request text: the same
//! input always produces byte-identical SQL, and generation here cannot
//! fail.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::draft::DraftQuery;
use crate::schema::{
    select_columns, CANONICAL_ENTITY, DEFAULT_LIMIT, MAX_LIMIT, TOP_SELLERS_LIMIT,
};

lazy_static! {
    static ref FIRST_NUMBER: Regex = Regex::new(r"(\d+)").unwrap();
}

/// Generate a draft from keywords alone.
pub fn generate(natural_language_query: &str) -> DraftQuery {
    let query = natural_language_query.to_lowercase();
    let query = query.trim();

    let mut filters = serde_json::Map::new();

    if query.contains("electronics") || query.contains("electronic") {
        filters.insert("category".to_string(), Value::from("Electronics"));
    } else if query.contains("clothing") || query.contains("clothes") || query.contains("apparel") {
        filters.insert("category".to_string(), Value::from("Clothing"));
    } else if query.contains("home") || query.contains("garden") {
        filters.insert("category".to_string(), Value::from("Home & Garden"));
    }

    if query.contains("last 30 days") || query.contains("30 days") {
        filters.insert("timeRange".to_string(), Value::from("30 days"));
    }

    let (intent, sql) = if query.contains("top") || query.contains("best") || query.contains("selling") {
        ("top_sellers", top_sellers_sql(query, &filters))
    } else if query.contains("low stock") || query.contains("out of stock") || query.contains("reorder") {
        ("low_stock", low_stock_sql(&filters))
    } else {
        ("list_items", list_sql(query, &filters))
    };

    DraftQuery {
        sql,
        intent: intent.to_string(),
        entities: vec![CANONICAL_ENTITY.to_string()],
        filters,
        reasoning: "Generated using keyword-based fallback".to_string(),
        critique: None,
        revised: false,
    }
}

fn category_predicate(filters: &serde_json::Map<String, Value>) -> Option<String> {
    filters
        .get("category")
        .and_then(Value::as_str)
        .map(|category| format!("c.name = '{}'", category))
}

fn top_sellers_sql(query: &str, filters: &serde_json::Map<String, Value>) -> String {
    let limit = extract_limit(query).unwrap_or(TOP_SELLERS_LIMIT);

    let mut where_clauses = vec!["i.recent_sales_volume > 0".to_string()];
    if let Some(predicate) = category_predicate(filters) {
        where_clauses.push(predicate);
    }

    format!(
        "SELECT\n{}\nFROM inventory_items i\nLEFT JOIN product_categories c ON i.category_id = c.id\nWHERE {}\nORDER BY i.recent_sales_volume DESC\nLIMIT {}",
        select_columns(),
        where_clauses.join(" AND "),
        limit
    )
}

fn low_stock_sql(filters: &serde_json::Map<String, Value>) -> String {
    let mut where_clauses = vec!["i.current_stock <= i.reorder_threshold".to_string()];
    if let Some(predicate) = category_predicate(filters) {
        where_clauses.push(predicate);
    }

    format!(
        "SELECT\n{}\nFROM inventory_items i\nLEFT JOIN product_categories c ON i.category_id = c.id\nWHERE {}\nORDER BY i.current_stock ASC, i.recent_sales_volume DESC\nLIMIT {}",
        select_columns(),
        where_clauses.join(" AND "),
        MAX_LIMIT
    )
}

fn list_sql(query: &str, filters: &serde_json::Map<String, Value>) -> String {
    let limit = extract_limit(query).unwrap_or(DEFAULT_LIMIT);

    let where_clause = match category_predicate(filters) {
        Some(predicate) => format!("WHERE {}\n", predicate),
        None => String::new(),
    };

    format!(
        "SELECT\n{}\nFROM inventory_items i\nLEFT JOIN product_categories c ON i.category_id = c.id\n{}ORDER BY i.updated_at DESC\nLIMIT {}",
        select_columns(),
        where_clause,
        limit
    )
}

/// First digit run in the request, clamped to the schema maximum.
fn extract_limit(query: &str) -> Option<usize> {
    FIRST_NUMBER
        .find(query)
        .and_then(|m| m.as_str().parse::<usize>().ok())
        .map(|n| n.min(MAX_LIMIT))
}
