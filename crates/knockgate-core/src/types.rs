//! Identity, role, and sequence types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque chat user identifier.
///
/// Transport user ids are numeric on some platforms; they are carried as
/// strings everywhere past the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Broadcast endpoint identifier (a chat the bot can post into).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A single capability a command may require.
///
/// The empty required set acts as the "none" permission: it is satisfied by
/// every caller, including users with no stored membership at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    /// Can manage new and old sequences.
    ManageSequences,
    /// Can take measures that have a direct impact on the bot's behaviour.
    ModifyBotBehaviour,
    /// Can take drastic measures that can affect the whole system.
    AdminAccess,
}

impl Permission {
    pub const ALL: [Permission; 3] = [
        Permission::ManageSequences,
        Permission::ModifyBotBehaviour,
        Permission::AdminAccess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageSequences => "manage_sequences",
            Permission::ModifyBotBehaviour => "modify_bot_behaviour",
            Permission::AdminAccess => "admin_access",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, statically defined bundle of permissions assignable to users.
///
/// Groups and their permission sets are configuration, not persisted data;
/// only membership is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Group {
    Guest,
    Member,
    Manager,
    Admin,
}

impl Group {
    pub const ALL: [Group; 4] = [Group::Guest, Group::Member, Group::Manager, Group::Admin];

    /// The permission set this group carries.
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Group::Guest => &[],
            Group::Member => &[Permission::ManageSequences],
            Group::Manager => &[Permission::ManageSequences, Permission::ModifyBotBehaviour],
            Group::Admin => &[
                Permission::ManageSequences,
                Permission::ModifyBotBehaviour,
                Permission::AdminAccess,
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Guest => "guest",
            Group::Member => "member",
            Group::Manager => "manager",
            Group::Admin => "admin",
        }
    }

    /// Parse a persisted or user-supplied group name.
    ///
    /// Names outside the fixed set yield `None`; mutations built on such a
    /// name are rejected upstream.
    pub fn parse(name: &str) -> Option<Group> {
        match name {
            "guest" => Some(Group::Guest),
            "member" => Some(Group::Member),
            "manager" => Some(Group::Manager),
            "admin" => Some(Group::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of the external knock daemon wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Stopped,
    Running,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Stopped => f.write_str("Stopped"),
            ServiceState::Running => f.write_str("Running"),
        }
    }
}

/// An ordered list of TCP ports that must each receive a SYN, in order,
/// to trigger the daemon's firewall rule change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnockSequence(Vec<u16>);

impl KnockSequence {
    pub fn new(ports: Vec<u16>) -> Self {
        Self(ports)
    }

    pub fn ports(&self) -> &[u16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u16>> for KnockSequence {
    fn from(ports: Vec<u16>) -> Self {
        Self(ports)
    }
}

impl fmt::Display for KnockSequence {
    /// Comma-joined decimal ports, the form both the daemon configuration
    /// and chat replies use.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for port in &self.0 {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}", port)?;
            first = false;
        }
        Ok(())
    }
}
