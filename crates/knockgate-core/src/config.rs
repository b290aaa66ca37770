//! Runtime configuration.
//!
//! One immutable [`Config`] value is constructed at startup (defaults, or a
//! JSON file named on the command line) and passed by reference to every
//! component that needs it. Nothing mutates it afterwards.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Names accepted by attribute lookup, in presentation order.
pub const ATTRIBUTE_NAMES: &[&str] = &[
    "bot_token",
    "admin_users",
    "allow_list",
    "deny_list",
    "system_account",
    "sequence_length",
    "port_range_start",
    "port_range_end",
    "port_blacklist",
    "use_open_sequence",
    "open_sequence",
    "target_port",
    "network_interface",
    "knockd_config_path",
    "knockd_log_path",
    "knockd_unit",
    "database_path",
    "poll_timeout_secs",
    "max_message_age_secs",
    "rotation_interval_secs",
];

const REDACTED: &str = "<redacted>";

/// Global configuration for the bot and the daemon it drives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat transport API token. Redacted from every printout.
    pub bot_token: String,

    /// User ids granted the admin group at startup, alongside the reserved
    /// system account.
    pub admin_users: Vec<String>,

    /// If non-empty, only these user ids may pass any permission check.
    pub allow_list: Vec<String>,

    /// User ids denied unconditionally, whatever their memberships.
    pub deny_list: Vec<String>,

    /// Reserved system account id, always bootstrapped into the admin group.
    pub system_account: String,

    /// Number of ports in a generated knock sequence.
    pub sequence_length: usize,

    /// Inclusive lower bound of the acceptable port range.
    pub port_range_start: u16,

    /// Inclusive upper bound of the acceptable port range.
    pub port_range_end: u16,

    /// Ports that must never appear in a sequence.
    pub port_blacklist: Vec<u16>,

    /// Use the fixed open sequence instead of generating one. Testing aid.
    pub use_open_sequence: bool,

    /// The fixed sequence applied when `use_open_sequence` is set.
    pub open_sequence: Vec<u16>,

    /// The protected port the daemon's firewall rules open and close.
    pub target_port: u16,

    /// Interface the daemon listens on.
    pub network_interface: String,

    /// Where the rendered daemon configuration is written.
    pub knockd_config_path: PathBuf,

    /// Log file path handed to the daemon.
    pub knockd_log_path: PathBuf,

    /// Service unit name used for start/stop.
    pub knockd_unit: String,

    /// SQLite database holding the `permissions` and `channels` tables.
    pub database_path: PathBuf,

    /// Long-poll timeout for the transport, in seconds.
    pub poll_timeout_secs: u64,

    /// Inbound messages older than this are ignored, in seconds.
    pub max_message_age_secs: i64,

    /// Interval between periodic rotations, in seconds.
    pub rotation_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            admin_users: Vec::new(),
            allow_list: Vec::new(),
            deny_list: Vec::new(),
            system_account: "1".to_string(),
            sequence_length: 3,
            port_range_start: 1024,
            port_range_end: 65535,
            port_blacklist: vec![1080, 8080],
            use_open_sequence: false,
            open_sequence: vec![7000, 8000, 9000],
            target_port: 22,
            network_interface: "any".to_string(),
            knockd_config_path: PathBuf::from("/etc/knockd.conf"),
            knockd_log_path: PathBuf::from("/var/log/knockd.log"),
            knockd_unit: "knockd".to_string(),
            database_path: PathBuf::from("db/knockgate.db"),
            poll_timeout_secs: 30,
            max_message_age_secs: 30,
            rotation_interval_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// Absent fields fall back to their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Look up a single attribute by name, rendered for display.
    ///
    /// Returns `None` for names outside [`ATTRIBUTE_NAMES`].
    pub fn attribute(&self, name: &str) -> Option<String> {
        let value = match name {
            "bot_token" => REDACTED.to_string(),
            "admin_users" => self.admin_users.join(", "),
            "allow_list" => self.allow_list.join(", "),
            "deny_list" => self.deny_list.join(", "),
            "system_account" => self.system_account.clone(),
            "sequence_length" => self.sequence_length.to_string(),
            "port_range_start" => self.port_range_start.to_string(),
            "port_range_end" => self.port_range_end.to_string(),
            "port_blacklist" => join_ports(&self.port_blacklist),
            "use_open_sequence" => self.use_open_sequence.to_string(),
            "open_sequence" => join_ports(&self.open_sequence),
            "target_port" => self.target_port.to_string(),
            "network_interface" => self.network_interface.clone(),
            "knockd_config_path" => self.knockd_config_path.display().to_string(),
            "knockd_log_path" => self.knockd_log_path.display().to_string(),
            "knockd_unit" => self.knockd_unit.clone(),
            "database_path" => self.database_path.display().to_string(),
            "poll_timeout_secs" => self.poll_timeout_secs.to_string(),
            "max_message_age_secs" => self.max_message_age_secs.to_string(),
            "rotation_interval_secs" => self.rotation_interval_secs.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Render every attribute, one `name = value` line per attribute.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for name in ATTRIBUTE_NAMES {
            // Names come from the same table attribute() matches on.
            if let Some(value) = self.attribute(name) {
                let _ = writeln!(out, "{} = {}", name, value);
            }
        }
        out
    }
}

fn join_ports(ports: &[u16]) -> String {
    ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let config = Config::default();
        assert!(config.port_range_start < config.port_range_end);
        assert_eq!(config.sequence_length, 3);
        assert_eq!(config.open_sequence.len(), config.sequence_length);
    }

    #[test]
    fn attribute_lookup_covers_every_name() {
        let config = Config::default();
        for name in ATTRIBUTE_NAMES {
            assert!(config.attribute(name).is_some(), "missing attribute {name}");
        }
        assert!(config.attribute("no_such_attribute").is_none());
    }

    #[test]
    fn token_is_redacted() {
        let config = Config {
            bot_token: "123456:secret".to_string(),
            ..Config::default()
        };
        assert_eq!(config.attribute("bot_token").unwrap(), REDACTED);
        assert!(!config.dump().contains("secret"));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"target_port": 2222, "sequence_length": 5}"#).unwrap();
        assert_eq!(config.target_port, 2222);
        assert_eq!(config.sequence_length, 5);
        assert_eq!(config.knockd_unit, "knockd");
    }
}
