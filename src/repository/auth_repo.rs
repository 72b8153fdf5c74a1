//! Revocation ledger repository (会话吊销数据访问)

use super::{PgStore, RevocationLedger};
use crate::{error::AppError, models::auth::RevokedToken};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
impl RevocationLedger for PgStore {
    async fn insert_revocation(&self, entry: &RevokedToken) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (id, token, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (token) DO NOTHING
            "#,
        )
        .bind(entry.id)
        .bind(&entry.token)
        .bind(entry.expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn exists(&self, token: &str) -> Result<bool, AppError> {
        let found: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE token = $1)")
                .bind(token)
                .fetch_one(&self.db)
                .await?;

        Ok(found)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
