//! knockd configuration rendering.
//!
//! One global options stanza and one knock stanza. The daemon substitutes
//! `%IP%` with the knocker's source address when it fires the firewall
//! commands.

use knockgate_core::{Config, KnockSequence};

/// Seconds the daemon allows between the first and last knock of a sequence.
pub const SEQ_TIMEOUT_SECS: u64 = 60;

/// Seconds the opened rule stays in place before the stop command fires.
pub const CMD_TIMEOUT_SECS: u64 = 60;

/// Render the daemon configuration for `sequence`.
///
/// The interface is bound from configuration rather than hard-wired to
/// `any`, so a host with several interfaces can restrict where knocks are
/// accepted.
pub fn render_config(sequence: &KnockSequence, config: &Config) -> String {
    format!(
        r#"[options]
    logfile     = {logfile}
    interface   = {interface}

[openclose]
    sequence                = {sequence}
    seq_timeout             = {seq_timeout}
    start_command           = /sbin/iptables -I INPUT -s %IP% -p tcp --dport {target_port} -j ACCEPT
    tcpflags                = syn
    cmd_timeout             = {cmd_timeout}
    stop_command            = /sbin/iptables -D INPUT -s %IP% -p tcp --dport {target_port} -j ACCEPT
"#,
        logfile = config.knockd_log_path.display(),
        interface = config.network_interface,
        sequence = sequence,
        seq_timeout = SEQ_TIMEOUT_SECS,
        cmd_timeout = CMD_TIMEOUT_SECS,
        target_port = config.target_port,
    )
}
