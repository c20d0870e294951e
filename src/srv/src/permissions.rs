//! Client-side permission checks over the cached session user
//!
//! Pure predicates over an already-fetched record; nothing here touches the
//! store.

use serde::{Deserialize, Serialize};

/// Section reachable when the role of the same name is held.
pub const SKILLS: &str = "skills";
/// Section reachable when the role of the same name is held.
pub const USERS: &str = "users";
/// Section reachable when the role of the same name is held.
pub const MANAGEMENT: &str = "management";
/// Section reachable when the role of the same name is held.
pub const SETTINGS: &str = "settings";
/// Section reachable when the role of the same name is held.
pub const CARD: &str = "card";

/// Role granting access to the manager-facing sections.
pub const MANAGER: &str = "manager";

/// The locally cached record of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Role labels granted to the user.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Whether `me` holds `role`.
///
/// The requested role may arrive as a route path, so a leading `/` is
/// stripped before comparing; the comparison itself is case-insensitive.
/// No cached record means no roles, which is never authorized.
pub fn has_role(me: Option<&CurrentUser>, role: &str) -> bool {
    let wanted = role.trim_start_matches('/');
    me.is_some_and(|me| me.roles.iter().any(|held| held.eq_ignore_ascii_case(wanted)))
}
