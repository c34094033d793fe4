use super::types::Database;
use crate::pagination::PageWindow;
use crate::search::{CompiledQuery, SqlValue};
use anyhow::Result;
use sqlx::postgres::PgRow;

/// Binds compiled values in placeholder order
macro_rules! bind_sql_values {
    ($query:expr, $values:expr) => {{
        let mut query = $query;
        for value in $values {
            query = match value {
                SqlValue::String(s) => query.bind(s.clone()),
                SqlValue::Integer(i) => query.bind(*i),
                SqlValue::Uuid(u) => query.bind(*u),
            };
        }
        query
    }};
}

impl Database {
    /// Runs the COUNT and the page SELECT built from the same compiled
    /// statement. The two run without a shared transaction, so the total may
    /// drift from the page under concurrent writes.
    pub(crate) async fn fetch_page<T>(
        &self,
        table: &str,
        query: &CompiledQuery,
        order_sql: &str,
        window: PageWindow,
    ) -> Result<(Vec<T>, i64)>
    where
        T: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin,
    {
        tracing::debug!(
            table = %table,
            joins = query.joins.len(),
            binds = query.values.len(),
            limit = window.limit,
            offset = window.offset,
            "running list query"
        );

        let count_sql = query.count_sql(table);
        let total: i64 = bind_sql_values!(sqlx::query_scalar::<_, i64>(&count_sql), &query.values)
            .fetch_one(&self.pool)
            .await?;

        let (select_sql, values) = query.select_sql(table, order_sql, window.limit, window.offset);
        let rows = bind_sql_values!(sqlx::query_as::<_, T>(&select_sql), &values)
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }
}
