use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::MembershipRepository;
use crate::error::{constraint_violation, AppError, ConstraintViolation};
use crate::models::{Group, GroupMembership, User};

pub struct SqliteMembershipRepository {
    pool: SqlitePool,
}

impl SqliteMembershipRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for SqliteMembershipRepository {
    async fn add_member(&self, group_id: i64, user_id: i64) -> Result<GroupMembership, AppError> {
        let joined_at = Utc::now();
        sqlx::query("INSERT INTO group_users (group_id, user_id, joined_at) VALUES (?, ?, ?)")
            .bind(group_id)
            .bind(user_id)
            .bind(joined_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match constraint_violation(&e) {
                Some(ConstraintViolation::Unique) => AppError::conflict(format!(
                    "user {} is already a member of group {}",
                    user_id, group_id
                )),
                Some(ConstraintViolation::ForeignKey) => {
                    AppError::not_found(format!("group {} or user {}", group_id, user_id))
                }
                None => e.into(),
            })?;

        tracing::info!(group_id = %group_id, user_id = %user_id, "Member added to group");
        Ok(GroupMembership {
            group_id,
            user_id,
            joined_at,
        })
    }

    async fn remove_member(&self, group_id: i64, user_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM group_users WHERE group_id = ? AND user_id = ?")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            tracing::info!(group_id = %group_id, user_id = %user_id, "Member removed from group");
        }
        Ok(())
    }

    async fn list_members_of(&self, group_id: i64) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.username, u.password_hash, u.created_at, u.updated_at
            FROM users u
            JOIN group_users gu ON gu.user_id = u.id
            WHERE gu.group_id = ?
            ORDER BY u.id
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn list_groups_of(&self, user_id: i64) -> Result<Vec<Group>, AppError> {
        let groups = sqlx::query_as::<_, Group>(
            r#"
            SELECT g.id, g.name, g.created_at, g.updated_at
            FROM groups g
            JOIN group_users gu ON gu.group_id = g.id
            WHERE gu.user_id = ?
            ORDER BY g.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;
    use crate::error::DatabaseError;
    use crate::repository::test_support::{insert_group, insert_user};

    #[tokio::test]
    async fn test_add_and_list_members() {
        let pool = database::in_memory().await.unwrap();
        let alice = insert_user(&pool, "alice").await;
        let bob = insert_user(&pool, "bob").await;
        let family = insert_group(&pool, "Family").await;
        let repo = SqliteMembershipRepository::new(pool);

        repo.add_member(family, bob).await.expect("Failed to add bob");
        repo.add_member(family, alice).await.expect("Failed to add alice");

        let members: Vec<i64> = repo
            .list_members_of(family)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(members, vec![alice, bob]);

        let groups = repo.list_groups_of(alice).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Family");
    }

    #[tokio::test]
    async fn test_duplicate_membership_is_conflict() {
        let pool = database::in_memory().await.unwrap();
        let alice = insert_user(&pool, "alice").await;
        let family = insert_group(&pool, "Family").await;
        let repo = SqliteMembershipRepository::new(pool);

        repo.add_member(family, alice).await.unwrap();
        let again = repo.add_member(family, alice).await;

        assert!(matches!(again, Err(AppError::Database(DatabaseError::Conflict(_)))));
        assert_eq!(repo.list_members_of(family).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_parent_is_not_found() {
        let pool = database::in_memory().await.unwrap();
        let alice = insert_user(&pool, "alice").await;
        let family = insert_group(&pool, "Family").await;
        let repo = SqliteMembershipRepository::new(pool);

        assert!(matches!(
            repo.add_member(999, alice).await,
            Err(AppError::Database(DatabaseError::NotFound(_)))
        ));
        assert!(matches!(
            repo.add_member(family, 999).await,
            Err(AppError::Database(DatabaseError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_remove_member_is_idempotent() {
        let pool = database::in_memory().await.unwrap();
        let alice = insert_user(&pool, "alice").await;
        let family = insert_group(&pool, "Family").await;
        let repo = SqliteMembershipRepository::new(pool);

        repo.add_member(family, alice).await.unwrap();
        repo.remove_member(family, alice).await.unwrap();
        repo.remove_member(family, alice).await.unwrap();

        assert!(repo.list_members_of(family).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_associations() {
        let pool = database::in_memory().await.unwrap();
        let repo = SqliteMembershipRepository::new(pool);

        assert!(repo.list_members_of(1).await.unwrap().is_empty());
        assert!(repo.list_groups_of(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_group_cascades_to_memberships() {
        let pool = database::in_memory().await.unwrap();
        let alice = insert_user(&pool, "alice").await;
        let family = insert_group(&pool, "Family").await;
        let repo = SqliteMembershipRepository::new(pool.clone());
        repo.add_member(family, alice).await.unwrap();

        sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(family)
            .execute(&pool)
            .await
            .unwrap();

        assert!(repo.list_groups_of(alice).await.unwrap().is_empty());
    }
}
