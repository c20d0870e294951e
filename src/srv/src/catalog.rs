//! Skill definitions and per-user skill assignments

use crate::{
    data::{Skill, SkillAssignment, SkillId, SkillUpdate, UserId, UserSkill, UserSummary},
    error::{self, StoreError},
    store::Store,
};
use chrono::Utc;

/// Repository over skill definitions and the assignments linking them to
/// users.
///
/// Assignments double as the update feed: every create or update refreshes
/// the record's recency, and [`update_feed`](Self::update_feed) reads them
/// back newest first.
#[derive(Debug, Clone)]
pub struct SkillCatalog {
    store: Store,
}

impl SkillCatalog {
    /// Open the catalog over the shared store.
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Insert a new skill.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateSkillName`] if a skill already holds `name`.
    pub async fn add_skill(&self, name: &str) -> Result<SkillId, StoreError> {
        let id = sqlx::query_scalar::<_, SkillId>(
            "INSERT INTO skills (name) VALUES (?1) RETURNING id",
        )
        .bind(name)
        .fetch_one(self.store.pool())
        .await
        .map_err(|e| error::unique(e, StoreError::DuplicateSkillName))?;
        tracing::info!(skill = %id, name, "skill created");
        Ok(id)
    }

    /// Skill holding `name`, if any.
    pub async fn find_skill_by_name(&self, name: &str) -> Result<Option<Skill>, StoreError> {
        Ok(
            sqlx::query_as::<_, Skill>("SELECT id, name FROM skills WHERE name = ?1")
                .bind(name)
                .fetch_optional(self.store.pool())
                .await?,
        )
    }

    /// Create or refresh the assignment for the `(user, skill)` pair.
    ///
    /// Re-assigning an existing pair overwrites its interest flag and level
    /// rather than duplicating the record, and moves it back to the front of
    /// the update feed.
    ///
    /// # Errors
    ///
    /// [`StoreError::ForeignKeyViolation`] when the user or the skill does
    /// not exist.
    pub async fn assign_skill(&self, assignment: SkillAssignment) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO user_skills (user_id, skill_id, interested, level, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, skill_id) DO UPDATE SET
                interested = excluded.interested,
                level      = excluded.level,
                updated_at = excluded.updated_at",
        )
        .bind(assignment.user_id)
        .bind(assignment.skill_id)
        .bind(assignment.interested)
        .bind(assignment.level)
        .bind(Utc::now().timestamp_micros())
        .execute(self.store.pool())
        .await
        .map_err(error::reference)?;
        tracing::debug!(
            user = %assignment.user_id,
            skill = %assignment.skill_id,
            level = assignment.level,
            "skill assigned"
        );
        Ok(())
    }

    /// Every assignment held by `user`, ordered by skill name.
    pub async fn user_skills(&self, user: UserId) -> Result<Vec<UserSkill>, StoreError> {
        Ok(sqlx::query_as::<_, UserSkill>(
            "SELECT s.name AS skill_name, us.interested, us.level
             FROM user_skills us
             JOIN skills s ON s.id = us.skill_id
             WHERE us.user_id = ?1
             ORDER BY s.name",
        )
        .bind(user)
        .fetch_all(self.store.pool())
        .await?)
    }

    /// Every user holding `skill`, projected to `{name, email}`, in id
    /// order.
    pub async fn users_with_skill(&self, skill: SkillId) -> Result<Vec<UserSummary>, StoreError> {
        Ok(sqlx::query_as::<_, UserSummary>(
            "SELECT u.name, u.email
             FROM user_skills us
             JOIN users u ON u.id = us.user_id
             WHERE us.skill_id = ?1
             ORDER BY u.id",
        )
        .bind(skill)
        .fetch_all(self.store.pool())
        .await?)
    }

    /// Assignment create/update events, most recent first.
    pub async fn update_feed(&self) -> Result<Vec<SkillUpdate>, StoreError> {
        Ok(sqlx::query_as::<_, SkillUpdate>(
            "SELECT us.level AS skill_level, s.name AS skill_name,
                    u.email AS user_email, u.name AS user_name
             FROM user_skills us
             JOIN skills s ON s.id = us.skill_id
             JOIN users u ON u.id = us.user_id
             ORDER BY us.updated_at DESC, us.id DESC",
        )
        .fetch_all(self.store.pool())
        .await?)
    }
}
