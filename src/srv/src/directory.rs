//! Lookup and mutation of the user directory

use crate::{
    credential::{Argon2Hasher, PasswordHasher},
    data::{ManagementRow, User, UserId, UserPatch, UserSummary},
    error::{self, StoreError},
    store::Store,
};
use chrono::NaiveDate;
use std::sync::Arc;

/// Columns of the profile projection. The stored credential is never
/// selected.
const PROFILE: &str = "id, email, name, address, diploma, phone, employee_date, manager_id";

/// Repository over user identity records: profiles, credentials, roles, and
/// the manager relationship.
///
/// Every operation is one unit of work against the shared [`Store`]; either
/// it fully applies (including cascades) or it fails and leaves state
/// unchanged.
#[derive(Clone)]
pub struct UserDirectory {
    store: Store,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserDirectory {
    /// Open the directory with the default Argon2id credential derivation.
    pub fn new(store: Store) -> Self {
        Self::with_hasher(store, Arc::new(Argon2Hasher))
    }

    /// Open the directory with a caller-supplied credential derivation.
    pub fn with_hasher(store: Store, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { store, hasher }
    }

    /// Insert a new user, deriving the stored credential from `password`.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateEmail`] if another user already holds `email`.
    pub async fn add_user(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<UserId, StoreError> {
        let hashed = self.hasher.hash(password)?;
        let id = sqlx::query_scalar::<_, UserId>(
            "INSERT INTO users (email, name, password) VALUES (?1, ?2, ?3) RETURNING id",
        )
        .bind(email)
        .bind(name)
        .bind(&hashed)
        .fetch_one(self.store.pool())
        .await
        .map_err(|e| error::unique(e, StoreError::DuplicateEmail))?;
        tracing::info!(user = %id, "user created");
        Ok(id)
    }

    /// All profiles, in id order.
    pub async fn get_users(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {PROFILE} FROM users ORDER BY id");
        Ok(sqlx::query_as::<_, User>(&sql)
            .fetch_all(self.store.pool())
            .await?)
    }

    /// Profile holding `email`, if any.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {PROFILE} FROM users WHERE email = ?1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.store.pool())
            .await?)
    }

    /// Profile with the given id, if any.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {PROFILE} FROM users WHERE id = ?1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.store.pool())
            .await?)
    }

    /// First user (by ascending id) whose [readable id](User::readable_id)
    /// matches `slug`.
    ///
    /// Slugs are derived from display names, so two users can share one; the
    /// id ordering makes the winner deterministic.
    pub async fn find_by_readable_id(&self, slug: &str) -> Result<Option<User>, StoreError> {
        let users = self.get_users().await?;
        Ok(users.into_iter().find(|user| user.readable_id() == slug))
    }

    /// Merge the supplied fields into an existing profile.
    ///
    /// Fields the patch leaves out keep their stored values. Changing the
    /// email is subject to the uniqueness constraint.
    pub async fn update_user(&self, id: UserId, patch: &UserPatch) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE users SET
                name    = COALESCE(?2, name),
                email   = COALESCE(?3, email),
                address = COALESCE(?4, address),
                diploma = COALESCE(?5, diploma),
                phone   = COALESCE(?6, phone)
             WHERE id = ?1",
        )
        .bind(id)
        .bind(patch.name.as_deref())
        .bind(patch.email.as_deref())
        .bind(patch.address.as_deref())
        .bind(patch.diploma)
        .bind(patch.phone.as_deref())
        .execute(self.store.pool())
        .await
        .map_err(|e| error::unique(e, StoreError::DuplicateEmail))?;
        Ok(())
    }

    /// Replace a user's phone number.
    pub async fn update_phone(&self, id: UserId, phone: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET phone = ?2 WHERE id = ?1")
            .bind(id)
            .bind(phone)
            .execute(self.store.pool())
            .await?;
        Ok(())
    }

    /// Replace a user's postal address. The value is stored verbatim.
    pub async fn update_address(&self, id: UserId, address: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET address = ?2 WHERE id = ?1")
            .bind(id)
            .bind(address)
            .execute(self.store.pool())
            .await?;
        Ok(())
    }

    /// Record the date a user started at the company.
    pub async fn update_employee_date(
        &self,
        id: UserId,
        date: NaiveDate,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET employee_date = ?2 WHERE id = ?1")
            .bind(id)
            .bind(date)
            .execute(self.store.pool())
            .await?;
        Ok(())
    }

    /// Delete a user.
    ///
    /// Their skill assignments and role links go with them; users they
    /// managed fall back to having no manager.
    pub async fn delete_user_by_id(&self, id: UserId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(self.store.pool())
            .await?;
        tracing::info!(user = %id, "user deleted");
        Ok(())
    }

    /// Profile for `email` when `password` matches the stored credential.
    ///
    /// Mismatch and unknown email both come back as [`None`]; the caller
    /// cannot tell which it was.
    pub async fn find_by_email_and_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, StoreError> {
        let stored = sqlx::query_scalar::<_, String>("SELECT password FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(self.store.pool())
            .await?;
        let Some(hash) = stored else {
            return Ok(None);
        };
        if !self.hasher.verify(password, &hash)? {
            return Ok(None);
        }
        self.find_by_email(email).await
    }

    /// Profile for `id` when `password` matches the stored credential.
    ///
    /// Same shape as [`find_by_email_and_password`](Self::find_by_email_and_password).
    pub async fn find_by_id_and_password(
        &self,
        id: UserId,
        password: &str,
    ) -> Result<Option<User>, StoreError> {
        let stored = sqlx::query_scalar::<_, String>("SELECT password FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.store.pool())
            .await?;
        let Some(hash) = stored else {
            return Ok(None);
        };
        if !self.hasher.verify(password, &hash)? {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    /// Replace the stored credential after verifying the current one.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidCredentials`] when `old` does not match the
    /// stored credential (or the user does not exist).
    pub async fn update_password(
        &self,
        id: UserId,
        old: &str,
        new: &str,
    ) -> Result<(), StoreError> {
        let hash = sqlx::query_scalar::<_, String>("SELECT password FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(self.store.pool())
            .await?
            .ok_or(StoreError::InvalidCredentials)?;
        if !self.hasher.verify(old, &hash)? {
            return Err(StoreError::InvalidCredentials);
        }
        let hashed = self.hasher.hash(new)?;
        sqlx::query("UPDATE users SET password = ?2 WHERE id = ?1")
            .bind(id)
            .bind(&hashed)
            .execute(self.store.pool())
            .await?;
        tracing::info!(user = %id, "password updated");
        Ok(())
    }

    /// Attach a role to a user, creating the role label on first use.
    ///
    /// Adding a role the user already holds is a no-op.
    pub async fn add_role(&self, user: UserId, role: &str) -> Result<(), StoreError> {
        let mut tx = self.store.pool().begin().await?;
        sqlx::query("INSERT INTO roles (name) VALUES (?1) ON CONFLICT(name) DO NOTHING")
            .bind(role)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id)
             SELECT ?1, id FROM roles WHERE name = ?2
             ON CONFLICT(user_id, role_id) DO NOTHING",
        )
        .bind(user)
        .bind(role)
        .execute(&mut *tx)
        .await
        .map_err(error::reference)?;
        tx.commit().await?;
        tracing::debug!(user = %user, role, "role attached");
        Ok(())
    }

    /// All users holding `role`, full profile projection, in id order.
    pub async fn users_with_role(&self, role: &str) -> Result<Vec<User>, StoreError> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT u.id, u.email, u.name, u.address, u.diploma, u.phone,
                    u.employee_date, u.manager_id
             FROM users u
             JOIN user_roles ur ON ur.user_id = u.id
             JOIN roles r ON r.id = ur.role_id
             WHERE r.name = ?1
             ORDER BY u.id",
        )
        .bind(role)
        .fetch_all(self.store.pool())
        .await?)
    }

    /// Same membership as [`users_with_role`](Self::users_with_role), but
    /// projected down to the `{name, email}` pairs the web views show.
    pub async fn web_users_with_role(&self, role: &str) -> Result<Vec<UserSummary>, StoreError> {
        Ok(sqlx::query_as::<_, UserSummary>(
            "SELECT u.name, u.email
             FROM users u
             JOIN user_roles ur ON ur.user_id = u.id
             JOIN roles r ON r.id = ur.role_id
             WHERE r.name = ?1
             ORDER BY u.id",
        )
        .bind(role)
        .fetch_all(self.store.pool())
        .await?)
    }

    /// Point `user` at `manager`.
    ///
    /// # Errors
    ///
    /// [`StoreError::ForeignKeyViolation`] on self-assignment, on unknown
    /// users, and on any assignment that would close a cycle in the
    /// management forest.
    pub async fn assign_manager(&self, user: UserId, manager: UserId) -> Result<(), StoreError> {
        // Walk the proposed manager's chain; reaching `user` would close a
        // cycle. The chain is acyclic going in, so the walk terminates.
        let mut next = Some(manager);
        while let Some(current) = next {
            if current == user {
                return Err(StoreError::ForeignKeyViolation);
            }
            next = sqlx::query_scalar::<_, Option<UserId>>(
                "SELECT manager_id FROM users WHERE id = ?1",
            )
            .bind(current)
            .fetch_optional(self.store.pool())
            .await?
            .flatten();
        }

        let result = sqlx::query("UPDATE users SET manager_id = ?2 WHERE id = ?1")
            .bind(user)
            .bind(manager)
            .execute(self.store.pool())
            .await
            .map_err(error::reference)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::ForeignKeyViolation);
        }
        tracing::debug!(user = %user, manager = %manager, "manager assigned");
        Ok(())
    }

    /// One row per user with their manager's id and name (null for top-level
    /// users).
    ///
    /// Managed users come before top-level users, each group in id order, so
    /// a manager's own row trails the rows of the people they manage.
    pub async fn management(&self) -> Result<Vec<ManagementRow>, StoreError> {
        Ok(sqlx::query_as::<_, ManagementRow>(
            "SELECT u.manager_id, m.name AS manager_name, u.id AS user_id, u.name AS user_name
             FROM users u
             LEFT JOIN users m ON m.id = u.manager_id
             ORDER BY u.manager_id IS NULL, u.id",
        )
        .fetch_all(self.store.pool())
        .await?)
    }
}

#[cfg(test)]
mod directory_tests {
    use super::*;
    use crate::{
        catalog::SkillCatalog,
        data::{SkillAssignment, UserPatch},
    };

    async fn store() -> Store {
        Store::open_in_memory().await.unwrap()
    }

    async fn directory() -> UserDirectory {
        UserDirectory::new(store().await)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn add_new_user_and_get_it() {
        let dir = directory().await;
        dir.add_user("email", "name", "password").await.unwrap();

        let users = dir.get_users().await.unwrap();
        let matching = users
            .iter()
            .filter(|user| user.name == "name" && user.email == "email")
            .count();
        assert_eq!(matching, 1);
    }

    #[tokio::test]
    async fn add_new_user_and_find_it_by_email_and_by_id() {
        let dir = directory().await;
        dir.add_user("email", "name", "password").await.unwrap();

        let user = dir.find_by_email("email").await.unwrap().unwrap();
        let user = dir.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(user.name, "name");
        assert_eq!(user.email, "email");
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let dir = directory().await;
        dir.add_user("email", "name", "password").await.unwrap();

        let err = dir.add_user("email", "other", "password").await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn delete_user_removes_profile_and_assignments() {
        let store = store().await;
        let dir = UserDirectory::new(store.clone());
        let catalog = SkillCatalog::new(store);

        let user_id = dir.add_user("email", "name", "password").await.unwrap();
        let skill_id = catalog.add_skill("skill1").await.unwrap();
        catalog
            .assign_skill(SkillAssignment {
                skill_id,
                user_id,
                interested: true,
                level: 2,
            })
            .await
            .unwrap();

        let names: Vec<_> = catalog
            .user_skills(user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.skill_name)
            .collect();
        assert_eq!(names, ["skill1"]);

        dir.delete_user_by_id(user_id).await.unwrap();

        assert!(dir.find_by_email("email").await.unwrap().is_none());
        assert!(catalog.user_skills(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_a_manager_orphans_subordinates() {
        let dir = directory().await;
        let manager = dir.add_user("m@x.fr", "Manager", "password").await.unwrap();
        let user = dir.add_user("u@x.fr", "User", "password").await.unwrap();
        dir.assign_manager(user, manager).await.unwrap();

        dir.delete_user_by_id(manager).await.unwrap();

        let user = dir.find_by_id(user).await.unwrap().unwrap();
        assert_eq!(user.manager_id, None);
    }

    #[tokio::test]
    async fn update_user_merges_only_supplied_fields() {
        let dir = directory().await;
        let id = dir.add_user("email", "name", "password").await.unwrap();

        dir.update_user(
            id,
            &UserPatch {
                diploma: Some(date(2015, 1, 1)),
                ..UserPatch::default()
            },
        )
        .await
        .unwrap();

        let user = dir.find_by_email("email").await.unwrap().unwrap();
        assert_eq!(user.diploma, Some(date(2015, 1, 1)));
        assert_eq!(user.name, "name");
        assert_eq!(user.email, "email");
        assert_eq!(user.address, None);
        assert_eq!(user.phone, None);
    }

    #[test]
    fn unknown_patch_fields_are_rejected_by_the_wire_form() {
        let err = serde_json::from_str::<UserPatch>(r#"{"shoe_size": 43}"#);
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn managers_are_listed_by_role() {
        let dir = directory().await;
        let id = dir.add_user("email", "name", "password").await.unwrap();
        dir.add_role(id, "Manager").await.unwrap();

        let users = dir.users_with_role("Manager").await.unwrap();
        assert_eq!(users[0].email, "email");
    }

    #[tokio::test]
    async fn web_projection_lists_name_and_email() {
        let dir = directory().await;
        let id = dir.add_user("email", "name", "password").await.unwrap();
        dir.add_role(id, "Manager").await.unwrap();

        let users = dir.web_users_with_role("Manager").await.unwrap();
        assert_eq!(
            users,
            [UserSummary {
                name: "name".to_string(),
                email: "email".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn adding_a_held_role_twice_is_a_no_op() {
        let dir = directory().await;
        let id = dir.add_user("email", "name", "password").await.unwrap();
        dir.add_role(id, "Manager").await.unwrap();
        dir.add_role(id, "Manager").await.unwrap();

        assert_eq!(dir.users_with_role("Manager").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn role_for_unknown_user_is_a_reference_error() {
        let dir = directory().await;
        let err = dir.add_role(UserId(999), "Manager").await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation));
    }

    #[tokio::test]
    async fn user_is_found_by_readable_id() {
        let dir = directory().await;
        dir.add_user("email", "Firstname Lastname", "password")
            .await
            .unwrap();

        let user = dir
            .find_by_readable_id("firstname-lastname")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.name, "Firstname Lastname");
        assert!(dir.find_by_readable_id("someone-else").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn management_lists_every_user_once() {
        let dir = directory().await;
        let manager = dir
            .add_user("jsmadja@xebia.fr", "Julien Smadja", "password")
            .await
            .unwrap();
        dir.add_role(manager, "Manager").await.unwrap();
        let managed = dir
            .add_user("blacroix@xebia.fr", "Benjamin Lacroix", "password")
            .await
            .unwrap();
        dir.assign_manager(managed, manager).await.unwrap();

        let management = dir.management().await.unwrap();
        assert_eq!(
            management,
            [
                ManagementRow {
                    manager_id: Some(manager),
                    manager_name: Some("Julien Smadja".to_string()),
                    user_id: managed,
                    user_name: "Benjamin Lacroix".to_string(),
                },
                ManagementRow {
                    manager_id: None,
                    manager_name: None,
                    user_id: manager,
                    user_name: "Julien Smadja".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn self_management_is_rejected() {
        let dir = directory().await;
        let id = dir.add_user("email", "name", "password").await.unwrap();

        let err = dir.assign_manager(id, id).await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation));
    }

    #[tokio::test]
    async fn dangling_manager_reference_is_rejected() {
        let dir = directory().await;
        let id = dir.add_user("email", "name", "password").await.unwrap();

        let err = dir.assign_manager(id, UserId(999)).await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation));

        let err = dir
            .assign_manager(UserId(999), id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation));
    }

    #[tokio::test]
    async fn management_cycles_are_rejected() {
        let dir = directory().await;
        let a = dir.add_user("a@x.fr", "A", "password").await.unwrap();
        let b = dir.add_user("b@x.fr", "B", "password").await.unwrap();
        let c = dir.add_user("c@x.fr", "C", "password").await.unwrap();
        dir.assign_manager(b, a).await.unwrap();
        dir.assign_manager(c, b).await.unwrap();

        let err = dir.assign_manager(a, c).await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation));
    }

    #[tokio::test]
    async fn find_user_by_email_and_password() {
        let dir = directory().await;
        let id = dir
            .add_user("jsmadja@xebia.fr", "Julien Smadja", "password")
            .await
            .unwrap();

        let user = dir
            .find_by_email_and_password("jsmadja@xebia.fr", "password")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            user,
            User {
                id,
                email: "jsmadja@xebia.fr".to_string(),
                name: "Julien Smadja".to_string(),
                address: None,
                diploma: None,
                phone: None,
                employee_date: None,
                manager_id: None,
            }
        );

        assert!(
            dir.find_by_email_and_password("jsmadja@xebia.fr", "wrong")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            dir.find_by_email_and_password("nobody@xebia.fr", "password")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn find_user_by_id_and_password() {
        let dir = directory().await;
        let id = dir
            .add_user("jsmadja@xebia.fr", "Julien Smadja", "password")
            .await
            .unwrap();

        let user = dir
            .find_by_id_and_password(id, "password")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.name, "Julien Smadja");
        assert_eq!(user.email, "jsmadja@xebia.fr");

        assert!(
            dir.find_by_id_and_password(id, "wrong")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn update_password_rotates_the_credential() {
        let dir = directory().await;
        let id = dir
            .add_user("jsmadja@xebia.fr", "Julien Smadja", "password")
            .await
            .unwrap();

        dir.update_password(id, "password", "newpassword")
            .await
            .unwrap();

        assert!(
            dir.find_by_email_and_password("jsmadja@xebia.fr", "newpassword")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            dir.find_by_email_and_password("jsmadja@xebia.fr", "password")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn update_password_verifies_the_old_one_first() {
        let dir = directory().await;
        let id = dir.add_user("email", "name", "password").await.unwrap();

        let err = dir
            .update_password(id, "wrong", "newpassword")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidCredentials));
    }

    #[tokio::test]
    async fn update_phone() {
        let dir = directory().await;
        let id = dir.add_user("email", "name", "password").await.unwrap();

        dir.update_phone(id, "01.23.45.67.89").await.unwrap();

        let user = dir.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.phone.as_deref(), Some("01.23.45.67.89"));
        assert_eq!(user.address, None);
    }

    #[tokio::test]
    async fn update_address_stores_the_raw_string() {
        let dir = directory().await;
        let id = dir.add_user("email", "name", "password").await.unwrap();

        dir.update_address(id, "1 rue du yaourt").await.unwrap();

        let user = dir.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.address.as_deref(), Some("1 rue du yaourt"));
    }

    #[tokio::test]
    async fn update_employee_date() {
        let dir = directory().await;
        let id = dir.add_user("email", "name", "password").await.unwrap();

        dir.update_employee_date(id, date(2016, 3, 7)).await.unwrap();

        let user = dir.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.employee_date, Some(date(2016, 3, 7)));
    }
}
