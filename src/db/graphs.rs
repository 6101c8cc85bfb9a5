//! Graph table operations.
//!
//! The table name comes from configuration and is interpolated into the SQL
//! text, so callers must pass a name that went through
//! [`IntakeConfig::new`](crate::config::IntakeConfig::new).

use crate::error::Result;
use crate::model::{GraphRecord, GraphStatus};

impl super::Db {
    /// Create the graph table if it does not exist yet.
    pub async fn ensure_graph_table(&self, table: &str) -> Result<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                release_name  TEXT PRIMARY KEY,
                current_state TEXT NOT NULL,
                created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at    TIMESTAMPTZ NOT NULL DEFAULT now()
             )"
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a record unless one with the same name exists.
    ///
    /// The primary key makes this a single atomic check-and-insert: of two
    /// concurrent calls for the same name exactly one gets `true`.
    pub async fn insert_graph_if_absent(&self, table: &str, record: &GraphRecord) -> Result<bool> {
        let inserted: Option<(String,)> = sqlx::query_as(&format!(
            "INSERT INTO {table} (release_name, current_state, created_at, updated_at)
             VALUES ($1, $2, $3, $3)
             ON CONFLICT (release_name) DO NOTHING
             RETURNING release_name"
        ))
        .bind(&record.release_name)
        .bind(record.current_state.as_str())
        .bind(record.created_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(inserted.is_some())
    }

    /// Get a graph record by its normalized name.
    pub async fn get_graph(&self, table: &str, release_name: &str) -> Result<Option<GraphRecord>> {
        let row: Option<GraphRow> = sqlx::query_as(&format!(
            "SELECT release_name, current_state, created_at FROM {table} WHERE release_name = $1"
        ))
        .bind(release_name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(GraphRow::try_into_record).transpose()
    }

    /// Delete a record only while it is still in `state`. Returns whether a
    /// row was removed.
    pub async fn delete_graph_if_state(
        &self,
        table: &str,
        release_name: &str,
        state: GraphStatus,
    ) -> Result<bool> {
        let rows_affected = sqlx::query(&format!(
            "DELETE FROM {table} WHERE release_name = $1 AND current_state = $2"
        ))
        .bind(release_name)
        .bind(state.as_str())
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(rows_affected > 0)
    }

    /// List graph records, newest first.
    pub async fn list_graphs(&self, table: &str, limit: i64) -> Result<Vec<GraphRecord>> {
        let rows: Vec<GraphRow> = sqlx::query_as(&format!(
            "SELECT release_name, current_state, created_at FROM {table}
             ORDER BY created_at DESC
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(GraphRow::try_into_record).collect()
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct GraphRow {
    release_name: String,
    current_state: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl GraphRow {
    fn try_into_record(self) -> Result<GraphRecord> {
        Ok(GraphRecord {
            release_name: self.release_name,
            current_state: self.current_state.parse()?,
            created_at: self.created_at,
        })
    }
}
