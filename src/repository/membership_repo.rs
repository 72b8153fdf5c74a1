//! Membership repository (组织成员数据访问)

use super::{MembershipStore, PgStore};
use crate::{
    error::AppError,
    models::membership::{MemberStatus, MemberSummary, Membership},
};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
impl MembershipStore for PgStore {
    async fn add_membership(&self, membership: &Membership) -> Result<(), AppError> {
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
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn find_membership(
        &self,
        user_id: Uuid,
        org_id: Uuid,
    ) -> Result<Option<Membership>, AppError> {
        let membership = sqlx::query_as::<_, Membership>(
            "SELECT * FROM memberships WHERE user_id = $1 AND organization_id = $2",
        )
        .bind(user_id)
        .bind(org_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(membership)
    }

    async fn list_memberships_for_user(&self, user_id: Uuid) -> Result<Vec<Membership>, AppError> {
        let memberships = sqlx::query_as::<_, Membership>(
            "SELECT * FROM memberships WHERE user_id = $1 ORDER BY joined_at, organization_id",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(memberships)
    }

    async fn list_staff(&self, org_id: Uuid) -> Result<Vec<MemberSummary>, AppError> {
        let staff = sqlx::query_as::<_, MemberSummary>(
            r#"
            SELECT
                m.user_id,
                u.email,
                m.default_role AS role,
                m.status,
                m.joined_at
            FROM memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.organization_id = $1
            ORDER BY m.joined_at, m.user_id
            "#,
        )
        .bind(org_id)
        .fetch_all(&self.db)
        .await?;

        Ok(staff)
    }

    async fn update_membership_status(
        &self,
        user_id: Uuid,
        org_id: Uuid,
        status: MemberStatus,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE memberships SET status = $3 WHERE user_id = $1 AND organization_id = $2",
        )
        .bind(user_id)
        .bind(org_id)
        .bind(status)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
