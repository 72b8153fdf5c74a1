//! User repository (用户与注册数据访问)

use super::{CredentialStore, PgStore};
use crate::{
    error::AppError,
    models::{membership::Membership, organization::Organization, user::User},
};
use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

impl PgStore {
    async fn insert_user(tx: &mut Transaction<'static, Postgres>, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, secret_hash, created_at, deleted_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.secret_hash)
        .bind(user.created_at)
        .bind(user.deleted_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn insert_membership(
        tx: &mut Transaction<'static, Postgres>,
        membership: &Membership,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO memberships (user_id, organization_id, default_role, status, joined_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(membership.user_id)
        .bind(membership.organization_id)
        .bind(membership.default_role)
        .bind(membership.status)
        .bind(membership.joined_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn create_user_with_org(
        &self,
        org: &Organization,
        user: &User,
        membership: &Membership,
    ) -> Result<(), AppError> {
        let mut tx = self.begin().await?;

        sqlx::query("INSERT INTO organizations (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(org.id)
            .bind(&org.name)
            .bind(org.created_at)
            .execute(&mut *tx)
            .await?;

        Self::insert_user(&mut tx, user).await?;
        Self::insert_membership(&mut tx, membership).await?;

        // 任一步失败时 tx 被 drop，自动回滚
        Self::commit(tx).await
    }

    async fn create_user_with_membership(
        &self,
        user: &User,
        membership: &Membership,
    ) -> Result<(), AppError> {
        let mut tx = self.begin().await?;

        Self::insert_user(&mut tx, user).await?;
        Self::insert_membership(&mut tx, membership).await?;

        Self::commit(tx).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }
}
