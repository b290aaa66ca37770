//! The permission engine.
//!
//! Resolves a user id to a permission set via group membership and enforces
//! allow/deny decisions. Membership mutations referencing a group name
//! outside the fixed valid set are silent no-ops.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use knockgate_core::{Config, Group, Permission, UserId};
use knockgate_store::{Container, Store, TableKind, TableValue};

use crate::error::{PermsError, Result};

/// Name of the persisted membership table (user id → list of group names).
pub const PERMISSIONS_TABLE: &str = "permissions";

/// Resolves and mutates user permissions over a [`Store`].
pub struct PermissionEngine<S: Store> {
    store: Arc<S>,
    allow_list: Vec<String>,
    deny_list: Vec<String>,
    system_account: String,
    admin_users: Vec<String>,
}

impl<S: Store> PermissionEngine<S> {
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        Self {
            store,
            allow_list: config.allow_list.clone(),
            deny_list: config.deny_list.clone(),
            system_account: config.system_account.clone(),
            admin_users: config.admin_users.clone(),
        }
    }

    /// Create the membership table if absent. Idempotent across restarts.
    pub async fn init(&self) -> Result<()> {
        self.store
            .open_table(PERMISSIONS_TABLE, TableKind::Mapping)
            .await?;
        Ok(())
    }

    /// Grant admin to the reserved system account and every configured
    /// administrator. Idempotent: re-adding dedups to a no-op.
    pub async fn bootstrap_admins(&self) -> Result<()> {
        let ids: Vec<String> = std::iter::once(self.system_account.clone())
            .chain(self.admin_users.iter().cloned())
            .collect();
        for id in ids {
            self.add_user_to_group(&UserId::new(id), Group::Admin.as_str())
                .await?;
        }
        Ok(())
    }

    /// Decide whether `user` may perform an action requiring `required`.
    ///
    /// A non-empty allow-list excludes everyone not on it; the deny-list
    /// excludes its members unconditionally. Otherwise the check passes iff
    /// `required` is a subset of the union of the user's group permissions.
    /// An empty `required` set passes for every caller, including users with
    /// no stored membership.
    pub async fn allow(&self, user: &UserId, required: &[Permission]) -> Result<bool> {
        if !self.allow_list.is_empty() && !self.allow_list.iter().any(|u| u == user.as_str()) {
            return Ok(false);
        }
        if self.deny_list.iter().any(|u| u == user.as_str()) {
            return Ok(false);
        }

        let held = self.permissions_of(user).await?;
        Ok(required.iter().all(|p| held.contains(p)))
    }

    /// Union of the permission sets of every group the user belongs to.
    pub async fn permissions_of(&self, user: &UserId) -> Result<BTreeSet<Permission>> {
        let mut held = BTreeSet::new();
        for group in self.groups_of(user).await? {
            held.extend(group.permissions().iter().copied());
        }
        Ok(held)
    }

    /// The groups `user` belongs to; empty for unknown users.
    ///
    /// Persisted names that no longer parse are skipped with a warning
    /// rather than failing the check.
    pub async fn groups_of(&self, user: &UserId) -> Result<Vec<Group>> {
        let Some(value) = self.store.read(PERMISSIONS_TABLE, user.as_str()).await? else {
            return Ok(Vec::new());
        };
        let names = value
            .as_text_list()
            .ok_or_else(|| {
                PermsError::InvalidData(format!("membership of {} is not a list", user))
            })?
            .to_vec();

        let mut groups = Vec::new();
        for name in names {
            match Group::parse(&name) {
                Some(group) => groups.push(group),
                None => warn!(user = %user, group = %name, "skipping unknown persisted group"),
            }
        }
        Ok(groups)
    }

    /// Whether the user has a membership entry at all.
    pub async fn user_exists(&self, user: &UserId) -> Result<bool> {
        Ok(self.store.key_exists(PERMISSIONS_TABLE, user.as_str()).await?)
    }

    /// Add `user` to the named group.
    ///
    /// Silent no-op if the name is not a valid group. Creates the user if
    /// absent; the persisted list is deduplicated, preserving order.
    pub async fn add_user_to_group(&self, user: &UserId, group: &str) -> Result<()> {
        let Some(group) = Group::parse(group) else {
            debug!(user = %user, group, "ignoring mutation with invalid group");
            return Ok(());
        };

        let mut names = self.raw_membership(user).await?;
        names.push(group.as_str().to_string());
        dedup_preserving_order(&mut names);

        self.store
            .merge_entry(
                PERMISSIONS_TABLE,
                user.as_str(),
                TableValue::TextList(names),
            )
            .await?;
        info!(user = %user, group = %group, "user added to group");
        Ok(())
    }

    /// Remove `user` from the named group.
    ///
    /// Silent no-op if the name is not a valid group, or if the user was not
    /// a member. An unknown user stays unknown; no entry is created.
    pub async fn remove_user_from_group(&self, user: &UserId, group: &str) -> Result<()> {
        let Some(group) = Group::parse(group) else {
            debug!(user = %user, group, "ignoring mutation with invalid group");
            return Ok(());
        };

        if !self.user_exists(user).await? {
            return Ok(());
        }

        let mut names = self.raw_membership(user).await?;
        names.retain(|name| name != group.as_str());

        self.store
            .merge_entry(
                PERMISSIONS_TABLE,
                user.as_str(),
                TableValue::TextList(names),
            )
            .await?;
        info!(user = %user, group = %group, "user removed from group");
        Ok(())
    }

    /// Every user whose membership contains `group`, in key order.
    pub async fn group_members(&self, group: Group) -> Result<Vec<UserId>> {
        let container = self.store.read_table(PERMISSIONS_TABLE).await?;
        let Container::Mapping(entries) = container else {
            return Err(PermsError::InvalidData(
                "permissions table is not a mapping".to_string(),
            ));
        };

        let mut members = Vec::new();
        for (user, value) in entries {
            if let Some(names) = value.as_text_list() {
                if names.iter().any(|name| name == group.as_str()) {
                    members.push(UserId::new(user));
                }
            }
        }
        Ok(members)
    }

    async fn raw_membership(&self, user: &UserId) -> Result<Vec<String>> {
        match self.store.read(PERMISSIONS_TABLE, user.as_str()).await? {
            Some(value) => value
                .as_text_list()
                .map(<[String]>::to_vec)
                .ok_or_else(|| {
                    PermsError::InvalidData(format!("membership of {} is not a list", user))
                }),
            None => Ok(Vec::new()),
        }
    }
}

fn dedup_preserving_order(names: &mut Vec<String>) {
    let mut seen = BTreeSet::new();
    names.retain(|name| seen.insert(name.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use knockgate_store::MemoryStore;

    async fn engine(config: Config) -> PermissionEngine<MemoryStore> {
        let engine = PermissionEngine::new(Arc::new(MemoryStore::new()), &config);
        engine.init().await.unwrap();
        engine
    }

    fn user(id: &str) -> UserId {
        UserId::new(id)
    }

    #[tokio::test]
    async fn unknown_users_hold_only_none() {
        let engine = engine(Config::default()).await;
        let u = user("stranger");

        assert!(engine.allow(&u, &[]).await.unwrap());
        for perm in Permission::ALL {
            assert!(!engine.allow(&u, &[perm]).await.unwrap());
        }
    }

    #[tokio::test]
    async fn admin_grant_and_revoke_round_trip() {
        let engine = engine(Config::default()).await;
        let u = user("alice");

        engine.add_user_to_group(&u, "admin").await.unwrap();
        assert!(engine.allow(&u, &Permission::ALL).await.unwrap());

        engine.remove_user_from_group(&u, "admin").await.unwrap();
        for perm in Permission::ALL {
            assert!(!engine.allow(&u, &[perm]).await.unwrap());
        }
    }

    #[tokio::test]
    async fn membership_never_duplicates() {
        let engine = engine(Config::default()).await;
        let u = user("alice");

        engine.add_user_to_group(&u, "member").await.unwrap();
        engine.add_user_to_group(&u, "member").await.unwrap();

        assert_eq!(engine.groups_of(&u).await.unwrap(), vec![Group::Member]);
    }

    #[tokio::test]
    async fn invalid_group_mutations_are_no_ops() {
        let engine = engine(Config::default()).await;
        let u = user("alice");

        engine.add_user_to_group(&u, "root").await.unwrap();
        assert!(!engine.user_exists(&u).await.unwrap());

        engine.add_user_to_group(&u, "member").await.unwrap();
        engine.remove_user_from_group(&u, "root").await.unwrap();
        assert_eq!(engine.groups_of(&u).await.unwrap(), vec![Group::Member]);
    }

    #[tokio::test]
    async fn removing_from_unknown_user_creates_nothing() {
        let engine = engine(Config::default()).await;
        let u = user("ghost");

        engine.remove_user_from_group(&u, "member").await.unwrap();
        assert!(!engine.user_exists(&u).await.unwrap());
    }

    #[tokio::test]
    async fn allow_list_excludes_everyone_else() {
        let config = Config {
            allow_list: vec!["alice".to_string()],
            ..Config::default()
        };
        let engine = engine(config).await;

        engine.add_user_to_group(&user("bob"), "admin").await.unwrap();
        // Even an admin outside the allow-list is denied, including "none".
        assert!(!engine.allow(&user("bob"), &[]).await.unwrap());
        assert!(engine.allow(&user("alice"), &[]).await.unwrap());
    }

    #[tokio::test]
    async fn deny_list_overrides_membership() {
        let config = Config {
            deny_list: vec!["mallory".to_string()],
            ..Config::default()
        };
        let engine = engine(config).await;

        engine
            .add_user_to_group(&user("mallory"), "admin")
            .await
            .unwrap();
        assert!(!engine.allow(&user("mallory"), &[]).await.unwrap());
    }

    #[tokio::test]
    async fn bootstrap_is_idempotent() {
        let config = Config {
            admin_users: vec!["alice".to_string()],
            ..Config::default()
        };
        let engine = engine(config).await;

        engine.bootstrap_admins().await.unwrap();
        engine.bootstrap_admins().await.unwrap();

        assert_eq!(
            engine.groups_of(&user("alice")).await.unwrap(),
            vec![Group::Admin]
        );
        assert_eq!(
            engine.groups_of(&user("1")).await.unwrap(),
            vec![Group::Admin]
        );
    }

    #[tokio::test]
    async fn group_members_lists_only_that_group() {
        let engine = engine(Config::default()).await;

        engine.add_user_to_group(&user("alice"), "manager").await.unwrap();
        engine.add_user_to_group(&user("bob"), "member").await.unwrap();
        engine.add_user_to_group(&user("carol"), "manager").await.unwrap();

        let managers = engine.group_members(Group::Manager).await.unwrap();
        assert_eq!(managers, vec![user("alice"), user("carol")]);
        assert!(engine.group_members(Group::Admin).await.unwrap().is_empty());
    }
}
