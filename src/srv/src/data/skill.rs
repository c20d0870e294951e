//! See [`Skill`]

use crate::data::user::UserId;
use serde::{Deserialize, Serialize};

super::id_type!(
    /// Code uniquely identifying a skill
    SkillId as "s"
);

/// Metadata regarding a skill.
///
/// Skills are created once and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Skill {
    /// Engine-assigned identifier.
    pub id: SkillId,
    /// Display name of the skill, unique across the catalog.
    pub name: String,
}

/// Link between one user and one skill.
///
/// At most one assignment exists per `(user, skill)` pair; re-assigning the
/// pair updates the existing record in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillAssignment {
    /// The skill being assigned.
    pub skill_id: SkillId,
    /// The user holding the skill.
    pub user_id: UserId,
    /// Whether the user wants to keep working with the skill.
    pub interested: bool,
    /// Proficiency level. Opaque integer, no enforced range.
    pub level: i64,
}

/// A user's view of one of their assignments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSkill {
    /// Display name of the skill.
    pub skill_name: String,
    /// Whether the user wants to keep working with the skill.
    pub interested: bool,
    /// Proficiency level.
    pub level: i64,
}

/// Denormalized feed entry recording an assignment create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SkillUpdate {
    /// Proficiency level at the time of the update.
    pub skill_level: i64,
    /// Display name of the skill.
    pub skill_name: String,
    /// Email of the user the assignment belongs to.
    pub user_email: String,
    /// Display name of the user the assignment belongs to.
    pub user_name: String,
}
