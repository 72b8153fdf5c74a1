//! 存储引擎的连接参数、启动错误与健康状态

use crate::config::DatabaseConfig;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// 按配置构造连接池参数，连接由 `PgStore::connect` 建立
pub fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections.min(config.max_connections))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
}

/// 存储启动失败，进程不以降级模式运行
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("credential store unreachable: {0}")]
    Unreachable(#[source] sqlx::Error),

    #[error("schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// 存储健康状态，由 `/ready` 返回
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}
