//! See [`User`]

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

super::id_type!(
    /// Code uniquely identifying a user
    UserId as "u"
);

/// A member of the company directory.
///
/// This is the projection every read operation returns: the stored
/// credential is never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Engine-assigned identifier.
    pub id: UserId,

    /// Email address, unique across the directory (case-sensitive).
    pub email: String,

    /// Display name. Can be changed without changing the user's id.
    pub name: String,

    /// Postal address. Absent until filled in.
    pub address: Option<String>,

    /// Date the user's diploma was obtained.
    pub diploma: Option<NaiveDate>,

    /// Phone number.
    pub phone: Option<String>,

    /// Date the user started at the company.
    pub employee_date: Option<NaiveDate>,

    /// The user's manager, if any. At most one, and never the user itself.
    pub manager_id: Option<UserId>,
}

impl User {
    /// URL-safe slug of the display name.
    ///
    /// Computed on demand, never stored; only as unique as the names it is
    /// derived from.
    #[inline]
    pub fn readable_id(&self) -> String {
        readable_id(&self.name)
    }
}

/// Slug a display name: lowercased, spaces replaced by hyphens
/// (`"Firstname Lastname"` becomes `"firstname-lastname"`).
pub fn readable_id(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}

/// A partial profile update: only the supplied fields are written, the rest
/// keep their stored values.
///
/// Unknown fields are unrepresentable here, and the serialized form rejects
/// them too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPatch {
    /// Replacement display name.
    pub name: Option<String>,
    /// Replacement email address. Subject to the uniqueness constraint.
    pub email: Option<String>,
    /// Replacement postal address.
    pub address: Option<String>,
    /// Replacement diploma date.
    pub diploma: Option<NaiveDate>,
    /// Replacement phone number.
    pub phone: Option<String>,
}

/// The `{name, email}` projection the web views consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

/// One row of the management projection.
///
/// Manager fields are null for top-level users; every user appears in
/// exactly one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ManagementRow {
    /// Id of the user's manager, if any.
    pub manager_id: Option<UserId>,
    /// Display name of the user's manager, if any.
    pub manager_name: Option<String>,
    /// Id of the user the row describes.
    pub user_id: UserId,
    /// Display name of the user the row describes.
    pub user_name: String,
}
