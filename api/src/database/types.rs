use sqlx::PgPool;

#[derive(Clone)]
pub struct Database {
    pub(crate) pool: PgPool,
}

/// Connection pool limits, process-wide
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_open_connections: u32,
    pub max_idle_connections: u32,
    pub idle_timeout_secs: u64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_open_connections: 10,
            max_idle_connections: 2,
            idle_timeout_secs: 300,
        }
    }
}
