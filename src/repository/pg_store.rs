//! PostgreSQL 存储引擎

use super::Store;
use crate::{
    config::DatabaseConfig,
    db::{self, HealthStatus, StoreError},
    error::AppError,
};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::error;

/// 基于单个连接池的存储实现，同时满足所有能力接口
#[derive(Clone)]
pub struct PgStore {
    pub(crate) db: PgPool,
}

impl PgStore {
    /// 建立连接池并执行内嵌迁移，任一步失败都不返回存储
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let db = db::pool_options(config)
            .connect(config.url.expose_secret())
            .await
            .map_err(StoreError::Unreachable)?;

        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Store pool connected"
        );

        let store = Self::new(db);
        store.migrate().await?;
        Ok(store)
    }

    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.db).await?;
        tracing::info!("Store schema up to date");
        Ok(())
    }

    pub(crate) async fn begin(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::internal_error("Failed to begin transaction")
        })
    }

    pub(crate) async fn commit(tx: Transaction<'static, Postgres>) -> Result<(), AppError> {
        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            AppError::internal_error("Failed to commit transaction")
        })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> HealthStatus {
        match sqlx::query("SELECT 1").execute(&self.db).await {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => {
                tracing::warn!(error = %e, "Store health check failed");
                HealthStatus::Unhealthy("store unreachable".to_string())
            }
        }
    }
}
