//! Database schema.

use anyhow::Result;
use rusqlite::Connection;

/// Create the `test_results` table and its indexes if they do not exist.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS test_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project TEXT NOT NULL,
            spec TEXT NOT NULL,
            browser TEXT NOT NULL,
            status TEXT NOT NULL,
            pipeline_id TEXT NOT NULL,
            job_id TEXT NOT NULL,
            job_url TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_project ON test_results(project);
        CREATE INDEX IF NOT EXISTS idx_status ON test_results(status);
        CREATE INDEX IF NOT EXISTS idx_created_at ON test_results(created_at);",
    )?;

    Ok(())
}
