//! Inventory schema knowledge shared across the crate: the prompt text fed
//! to the completion service and the canonical column set result rows are
//! mapped onto.

/// Entity tag attached to every generated draft.
pub const CANONICAL_ENTITY: &str = "InventoryItem";

/// Default row limit for list-style queries.
pub const DEFAULT_LIMIT: usize = 50;

/// Default row limit for top-seller queries.
pub const TOP_SELLERS_LIMIT: usize = 10;

/// Hard cap on rows any generated query may request.
pub const MAX_LIMIT: usize = 100;

/// One canonical result column: the camelCase name the API exposes and the
/// snake_case spelling the store may return instead. Numeric columns
/// default to zero when absent, the rest to null.
pub struct ResultColumn {
    pub camel: &'static str,
    pub snake: &'static str,
    pub numeric: bool,
}

/// Canonical result columns in output order.
pub const RESULT_COLUMNS: &[ResultColumn] = &[
    ResultColumn { camel: "id", snake: "id", numeric: false },
    ResultColumn { camel: "sku", snake: "sku", numeric: false },
    ResultColumn { camel: "name", snake: "name", numeric: false },
    ResultColumn { camel: "categoryId", snake: "category_id", numeric: false },
    ResultColumn { camel: "locationId", snake: "location_id", numeric: false },
    ResultColumn { camel: "currentStock", snake: "current_stock", numeric: true },
    ResultColumn { camel: "reorderThreshold", snake: "reorder_threshold", numeric: true },
    ResultColumn { camel: "recentSalesVolume", snake: "recent_sales_volume", numeric: true },
    ResultColumn { camel: "createdAt", snake: "created_at", numeric: false },
    ResultColumn { camel: "updatedAt", snake: "updated_at", numeric: false },
];

/// Schema description embedded in every generation prompt.
pub const DATABASE_SCHEMA: &str = r#"Database Schema for SQLite:

Table: inventory_items
Columns:
- id TEXT PRIMARY KEY
- sku TEXT NOT NULL (Stock Keeping Unit)
- name TEXT NOT NULL (Product name)
- category_id TEXT (Foreign key to product_categories.id)
- location_id TEXT (Foreign key to locations.id)
- current_stock INTEGER (Current quantity in stock)
- reorder_threshold INTEGER (Minimum stock level before reordering)
- recent_sales_volume INTEGER (Sales volume for recent period)
- created_at TEXT (Timestamp)
- updated_at TEXT (Timestamp)

Table: product_categories
Columns:
- id TEXT PRIMARY KEY
- name TEXT NOT NULL (Category name: 'Electronics', 'Clothing', 'Home & Garden')
- parent_category_id TEXT (For hierarchical categories)

Table: locations
Columns:
- id TEXT PRIMARY KEY
- name TEXT NOT NULL (Location name: 'Main Warehouse', 'Store Downtown', 'Store Uptown')
- type TEXT (Location type: 'warehouse', 'store')
- parent_location_id TEXT (For hierarchical locations)

CRITICAL SQL Rules for SQLite:
1. ONLY SELECT queries allowed - NO modifications
2. Use simple table aliases: i for inventory_items, c for product_categories, l for locations
3. Always use LEFT JOIN for optional relationships
4. Column aliases MUST use camelCase: current_stock as currentStock
5. WHERE clauses must use exact column names from schema
6. Category filter example: WHERE c.name = 'Electronics'
7. Always include these columns in SELECT: i.id, i.sku, i.name, i.category_id as categoryId, i.location_id as locationId, i.current_stock as currentStock, i.reorder_threshold as reorderThreshold, i.recent_sales_volume as recentSalesVolume
8. Default LIMIT 50, Maximum LIMIT 100
9. SQLite syntax only - no PostgreSQL-specific functions

Example Query:
SELECT i.id, i.sku, i.name, i.category_id as categoryId, i.current_stock as currentStock
FROM inventory_items i
LEFT JOIN product_categories c ON i.category_id = c.id
WHERE c.name = 'Electronics'
ORDER BY i.recent_sales_volume DESC
LIMIT 10;"#;

/// Render the canonical SELECT list with camelCase aliases, `i.` qualified.
pub fn select_columns() -> String {
    RESULT_COLUMNS
        .iter()
        .map(|col| {
            if col.camel == col.snake {
                format!("    i.{}", col.snake)
            } else {
                format!("    i.{} as {}", col.snake, col.camel)
            }
        })
        .collect::<Vec<_>>()
        .join(",\n")
}
