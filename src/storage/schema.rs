//! Database schema and migrations.

use rusqlite::Connection;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS analyses (
            analysis_id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            source_format TEXT NOT NULL,
            logs_count INTEGER NOT NULL,
            overall_risk_score TEXT NOT NULL,
            risk_summary TEXT NOT NULL,
            result_json TEXT NOT NULL,
            logs_json TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_analyses_created ON analyses(created_at);

        INSERT OR IGNORE INTO schema_version (version) VALUES (1);",
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM analyses", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_fresh_table_has_source_format_column() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let columns: i64 = conn
            .query_row(
                "SELECT count(*) FROM pragma_table_info('analyses') WHERE name = 'source_format'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(columns, 1);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap(); // Should not error
    }
}
