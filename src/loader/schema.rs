//! Database schema definitions

use rusqlite::Connection;

/// SQL schema for the catalog database
pub const SCHEMA_SQL: &str = r#"
-- Product categories, resolved relationally by name
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    slug TEXT NOT NULL UNIQUE
);

-- One row per product; reloading the sink updates in place
CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    name TEXT NOT NULL,
    category_id INTEGER REFERENCES categories(id),
    description TEXT,
    specs TEXT NOT NULL DEFAULT '{}',
    images TEXT NOT NULL DEFAULT '[]',
    scraped_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_id);
CREATE INDEX IF NOT EXISTS idx_products_url ON products(url);
"#;

/// Initializes the database schema
///
/// Idempotent: every statement is `IF NOT EXISTS`.
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
