//! Command routing.
//!
//! A static registry maps command tokens to handler kind, expected argument
//! count, required permission set, and a help line. Dispatch checks the
//! argument count, then runs the permission guard, then invokes the
//! handler. Unknown commands fall through to the silent `invalid` entry.

use std::sync::Arc;

use tracing::info;

use knockgate_core::{ChannelId, Permission, UserId};
use knockgate_knockd::ServiceRunner;
use knockgate_perms::PermissionEngine;
use knockgate_store::Store;

use crate::commands::CommandHandlers;
use crate::error::Result;

/// Fixed reply for callers that fail the permission guard.
pub const FORBIDDEN: &str = "Action forbidden ; insufficient rights.";

/// What a handler asks the caller to do with its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Send this text back to the originating channel.
    Reply(String),
    /// Nothing to send.
    Silent,
    /// Terminate the main processing loop cleanly. No reply is delivered
    /// for the triggering command.
    Shutdown,
}

/// Who issued the command, and from where. Passed explicitly to every
/// handler instead of being captured at registration time.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub user: UserId,
    pub channel: ChannelId,
}

/// Identifies a handler body in [`CommandHandlers`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Generate,
    Start,
    Stop,
    Forget,
    Shutdown,
    ListGroupsMembers,
    AddPerm,
    RemovePerm,
    Help,
    Status,
    PrintConfig,
    PrintBroadcastList,
    Rotate,
    CancelRotation,
    Invalid,
}

/// One registry entry.
#[derive(Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub kind: CommandKind,
    pub arity: usize,
    pub required: &'static [Permission],
    pub help: &'static str,
}

/// The command registry, built once. Lookup is case-sensitive on the token
/// before the first `@`.
pub const REGISTRY: &[CommandSpec] = &[
    CommandSpec {
        name: "/generate",
        kind: CommandKind::Generate,
        arity: 0,
        required: &[Permission::ManageSequences],
        help: "Generate a fresh knock sequence and apply it to the daemon.",
    },
    CommandSpec {
        name: "/start",
        kind: CommandKind::Start,
        arity: 0,
        required: &[Permission::ModifyBotBehaviour],
        help: "Start the knock daemon.",
    },
    CommandSpec {
        name: "/stop",
        kind: CommandKind::Stop,
        arity: 0,
        required: &[Permission::ModifyBotBehaviour],
        help: "Stop the knock daemon.",
    },
    CommandSpec {
        name: "/forget",
        kind: CommandKind::Forget,
        arity: 0,
        required: &[Permission::ModifyBotBehaviour],
        help: "Remove the current channel from the broadcast list.",
    },
    CommandSpec {
        name: "/shutdown",
        kind: CommandKind::Shutdown,
        arity: 0,
        required: &[Permission::ModifyBotBehaviour, Permission::AdminAccess],
        help: "Stop the daemon and terminate the bot.",
    },
    CommandSpec {
        name: "/list_groups_members",
        kind: CommandKind::ListGroupsMembers,
        arity: 0,
        required: &[Permission::ModifyBotBehaviour],
        help: "List every group and its members.",
    },
    CommandSpec {
        name: "/add_perm",
        kind: CommandKind::AddPerm,
        arity: 2,
        required: &[Permission::ModifyBotBehaviour, Permission::AdminAccess],
        help: "Add a user to a group: /add_perm <user> <group>.",
    },
    CommandSpec {
        name: "/remove_perm",
        kind: CommandKind::RemovePerm,
        arity: 2,
        required: &[Permission::ModifyBotBehaviour, Permission::AdminAccess],
        help: "Remove a user from a group: /remove_perm <user> <group>.",
    },
    CommandSpec {
        name: "/help",
        kind: CommandKind::Help,
        arity: 0,
        required: &[],
        help: "Show this list.",
    },
    CommandSpec {
        name: "/status",
        kind: CommandKind::Status,
        arity: 0,
        required: &[Permission::AdminAccess],
        help: "Report whether the daemon is running.",
    },
    CommandSpec {
        name: "/print_config",
        kind: CommandKind::PrintConfig,
        arity: 1,
        required: &[Permission::AdminAccess],
        help: "Print a configuration attribute: /print_config <attribute|all|help>.",
    },
    CommandSpec {
        name: "/print_broadcast_list",
        kind: CommandKind::PrintBroadcastList,
        arity: 0,
        required: &[Permission::AdminAccess],
        help: "List the channels currently receiving broadcasts.",
    },
    CommandSpec {
        name: "/rotate",
        kind: CommandKind::Rotate,
        arity: 0,
        required: &[Permission::ManageSequences],
        help: "Subscribe to periodic sequence rotation, starting it if needed.",
    },
    CommandSpec {
        name: "/cancel_rotation",
        kind: CommandKind::CancelRotation,
        arity: 0,
        required: &[Permission::ManageSequences],
        help: "Stop periodic sequence rotation.",
    },
];

/// The entry unknown commands resolve to: no arguments, no permissions,
/// no reply.
static INVALID: CommandSpec = CommandSpec {
    name: "(invalid)",
    kind: CommandKind::Invalid,
    arity: 0,
    required: &[],
    help: "",
};

/// Resolve a command token against the registry.
pub fn lookup(token: &str) -> &'static CommandSpec {
    REGISTRY
        .iter()
        .find(|spec| spec.name == token)
        .unwrap_or(&INVALID)
}

/// Split a message into its command token and positional arguments.
///
/// The token is the first whitespace-delimited word, with any `@suffix`
/// stripped (group chats address commands as `/cmd@botname`).
pub fn parse_message(text: &str) -> (String, Vec<String>) {
    let mut words = text.split_whitespace();
    let token = words
        .next()
        .unwrap_or("")
        .split('@')
        .next()
        .unwrap_or("")
        .to_string();
    let args = words.map(str::to_string).collect();
    (token, args)
}

fn arity_message(expected: usize, found: usize) -> String {
    let direction = if found > expected {
        "Too many"
    } else {
        "Too few"
    };
    format!(
        "{direction} arguments: expected {expected}, got {found}. Please refer to \"/help\"."
    )
}

/// Routes inbound command text to handlers, enforcing arity and the
/// permission guard on the way in.
pub struct Router<S: Store, R: ServiceRunner + 'static> {
    engine: Arc<PermissionEngine<S>>,
    handlers: CommandHandlers<S, R>,
}

impl<S: Store, R: ServiceRunner + 'static> Router<S, R> {
    pub fn new(engine: Arc<PermissionEngine<S>>, handlers: CommandHandlers<S, R>) -> Self {
        Self { engine, handlers }
    }

    /// Dispatch one command message.
    ///
    /// The argument-count check runs before anything else; a mismatch
    /// replies without invoking the handler or mutating any state. The
    /// permission guard then wraps the handler uniformly: a denial replies
    /// with the fixed forbidden message and logs the attempt.
    pub async fn dispatch(&self, ctx: &CommandContext, text: &str) -> Result<CommandOutcome> {
        let (token, args) = parse_message(text);
        let spec = lookup(&token);

        if args.len() != spec.arity {
            return Ok(CommandOutcome::Reply(arity_message(spec.arity, args.len())));
        }

        if !self.engine.allow(&ctx.user, spec.required).await? {
            info!(user = %ctx.user, command = spec.name, "action forbidden");
            return Ok(CommandOutcome::Reply(FORBIDDEN.to_string()));
        }

        self.handlers.invoke(spec.kind, ctx, &args).await
    }
}
