use rusqlite::Connection;

/// Initialize the widget store schema
///
/// Dashboards group widgets; widgets keep their configuration verbatim as JSON.
/// Deletion is a flag flip on `active`, rows are never removed.
pub fn init_store_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS dashboards (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            active BOOLEAN NOT NULL DEFAULT 1,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS widgets (
            id TEXT PRIMARY KEY,
            dashboard_id TEXT NOT NULL,
            name TEXT NOT NULL,
            widget_type TEXT NOT NULL,
            config TEXT NOT NULL,
            active BOOLEAN NOT NULL DEFAULT 1,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL,
            FOREIGN KEY (dashboard_id) REFERENCES dashboards(id)
        );
        CREATE INDEX IF NOT EXISTS idx_widgets_dashboard ON widgets(dashboard_id, active);
        "#,
    )
}
