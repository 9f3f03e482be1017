//! SQL dialect normalization.
//!
//! The completion service tends to produce PostgreSQL-flavored SQL. The
//! store speaks SQLite, so generated statements are rewritten before they
//! are executed: double-quoted identifiers become bare identifiers and
//! `NOW()` becomes `CURRENT_TIMESTAMP`.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref QUOTED_IDENTIFIER: Regex = Regex::new(r#""([^"]+)""#).unwrap();
    static ref NOW_CALL: Regex = Regex::new(r"(?i)NOW\(\)").unwrap();
}

/// Rewrite a statement into SQLite-accepted syntax. Idempotent.
pub fn to_sqlite(sql: &str) -> String {
    let unquoted = QUOTED_IDENTIFIER.replace_all(sql, "$1");
    NOW_CALL.replace_all(&unquoted, "CURRENT_TIMESTAMP").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_quoted_identifiers() {
        let sql = r#"SELECT i.current_stock as "currentStock" FROM inventory_items i"#;
        assert_eq!(
            to_sqlite(sql),
            "SELECT i.current_stock as currentStock FROM inventory_items i"
        );
    }

    #[test]
    fn test_rewrites_now() {
        let sql = "SELECT * FROM inventory_items WHERE updated_at < now()";
        assert_eq!(
            to_sqlite(sql),
            "SELECT * FROM inventory_items WHERE updated_at < CURRENT_TIMESTAMP"
        );
    }

    #[test]
    fn test_idempotent() {
        let sql = r#"SELECT "id", NOW() FROM inventory_items"#;
        let once = to_sqlite(sql);
        assert_eq!(to_sqlite(&once), once);
    }
}
