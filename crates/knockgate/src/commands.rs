//! Command handler bodies.
//!
//! The router resolves a message to a [`CommandKind`](crate::router::CommandKind)
//! and invokes it here, after the argument-count check and the permission
//! guard have both passed.

use std::fmt::Write as _;
use std::sync::Arc;

use tracing::warn;

use knockgate_core::config::ATTRIBUTE_NAMES;
use knockgate_core::{next_sequence, Config, Group, KnockSequence, UserId};
use knockgate_knockd::{KnockController, ServiceRunner, Transition};
use knockgate_perms::PermissionEngine;
use knockgate_store::Store;

use crate::channels::ChannelRegistry;
use crate::error::Result;
use crate::rotation::RotationScheduler;
use crate::router::{CommandContext, CommandKind, CommandOutcome, REGISTRY};

/// The reply line a freshly applied sequence produces, shared between
/// `/generate` and the rotation task.
pub(crate) fn sequence_reply(sequence: &KnockSequence) -> String {
    format!("New sequence: {sequence}")
}

/// All command implementations, holding the components they act on.
pub struct CommandHandlers<S: Store, R: ServiceRunner + 'static> {
    config: Arc<Config>,
    engine: Arc<PermissionEngine<S>>,
    channels: Arc<ChannelRegistry<S>>,
    controller: Arc<KnockController<R>>,
    rotation: Arc<RotationScheduler<R>>,
}

impl<S: Store, R: ServiceRunner + 'static> CommandHandlers<S, R> {
    pub fn new(
        config: Arc<Config>,
        engine: Arc<PermissionEngine<S>>,
        channels: Arc<ChannelRegistry<S>>,
        controller: Arc<KnockController<R>>,
        rotation: Arc<RotationScheduler<R>>,
    ) -> Self {
        Self {
            config,
            engine,
            channels,
            controller,
            rotation,
        }
    }

    pub(crate) async fn invoke(
        &self,
        kind: CommandKind,
        ctx: &CommandContext,
        args: &[String],
    ) -> Result<CommandOutcome> {
        match kind {
            CommandKind::Generate => self.generate().await,
            CommandKind::Start => self.start().await,
            CommandKind::Stop => self.stop().await,
            CommandKind::Forget => self.forget(ctx).await,
            CommandKind::Shutdown => self.shutdown().await,
            CommandKind::ListGroupsMembers => self.list_groups_members().await,
            CommandKind::AddPerm => self.add_perm(&args[0], &args[1]).await,
            CommandKind::RemovePerm => self.remove_perm(&args[0], &args[1]).await,
            CommandKind::Help => self.help(),
            CommandKind::Status => self.status().await,
            CommandKind::PrintConfig => self.print_config(&args[0]),
            CommandKind::PrintBroadcastList => self.print_broadcast_list().await,
            CommandKind::Rotate => self.rotate(ctx).await,
            CommandKind::CancelRotation => self.cancel_rotation().await,
            CommandKind::Invalid => Ok(CommandOutcome::Silent),
        }
    }

    /// `/generate`: apply a fresh sequence (or the configured open one).
    async fn generate(&self) -> Result<CommandOutcome> {
        let sequence = next_sequence(&self.config);
        let reply = match self.controller.apply_sequence(&sequence).await {
            Ok(()) => sequence_reply(&sequence),
            Err(e) => format!("Could not apply the new sequence: {e}."),
        };
        Ok(CommandOutcome::Reply(reply))
    }

    /// `/start`: bring the daemon up.
    async fn start(&self) -> Result<CommandOutcome> {
        let reply = match self.controller.start().await {
            Ok(Transition::Changed) => "Started knockd.".to_string(),
            Ok(Transition::AlreadyInState) => "knockd already running.".to_string(),
            Err(e) => format!("Could not start knockd: {e}."),
        };
        Ok(CommandOutcome::Reply(reply))
    }

    /// `/stop`: take the daemon down.
    async fn stop(&self) -> Result<CommandOutcome> {
        let reply = match self.controller.stop().await {
            Ok(Transition::Changed) => "Stopped knockd.".to_string(),
            Ok(Transition::AlreadyInState) => "knockd already stopped.".to_string(),
            Err(e) => format!("Could not stop knockd: {e}."),
        };
        Ok(CommandOutcome::Reply(reply))
    }

    /// `/forget`: drop the current channel from the broadcast list.
    async fn forget(&self, ctx: &CommandContext) -> Result<CommandOutcome> {
        self.channels.deactivate(&ctx.channel).await?;
        Ok(CommandOutcome::Silent)
    }

    /// `/shutdown`: stop the daemon, then end the processing loop.
    async fn shutdown(&self) -> Result<CommandOutcome> {
        if let Err(e) = self.controller.stop().await {
            warn!(error = %e, "daemon did not stop cleanly during shutdown");
        }
        Ok(CommandOutcome::Shutdown)
    }

    /// `/list_groups_members`: every group with its members.
    async fn list_groups_members(&self) -> Result<CommandOutcome> {
        let mut reply = String::new();
        for group in Group::ALL {
            let members = self.engine.group_members(group).await?;
            let names: Vec<&str> = members.iter().map(UserId::as_str).collect();
            let _ = writeln!(reply, "{}: {}", group, names.join(", "));
        }
        Ok(CommandOutcome::Reply(reply))
    }

    /// `/add_perm <user> <group>`.
    async fn add_perm(&self, user: &str, group: &str) -> Result<CommandOutcome> {
        if Group::parse(group).is_none() {
            return Ok(CommandOutcome::Reply(format!("Group {group} is invalid !")));
        }
        self.engine
            .add_user_to_group(&UserId::from(user), group)
            .await?;
        Ok(CommandOutcome::Reply(format!(
            "User {user} successfully added to group {group} !"
        )))
    }

    /// `/remove_perm <user> <group>`.
    async fn remove_perm(&self, user: &str, group: &str) -> Result<CommandOutcome> {
        if Group::parse(group).is_none() {
            return Ok(CommandOutcome::Reply(format!("Group {group} is invalid !")));
        }
        self.engine
            .remove_user_from_group(&UserId::from(user), group)
            .await?;
        Ok(CommandOutcome::Reply(format!(
            "User {user} successfully removed from group {group} !"
        )))
    }

    /// `/help`: the registry, one line per command.
    fn help(&self) -> Result<CommandOutcome> {
        let mut reply = String::from("Commands available:\n\n");
        for spec in REGISTRY {
            let _ = writeln!(reply, "{}: {}", spec.name, spec.help);
        }
        Ok(CommandOutcome::Reply(reply))
    }

    /// `/status`: Running or Stopped.
    async fn status(&self) -> Result<CommandOutcome> {
        Ok(CommandOutcome::Reply(
            self.controller.state().await.to_string(),
        ))
    }

    /// `/print_config <attribute|all|help>`.
    fn print_config(&self, attr: &str) -> Result<CommandOutcome> {
        let reply = match attr {
            "help" => format!("Available attributes: all, {}", ATTRIBUTE_NAMES.join(", ")),
            "all" => self.config.dump(),
            name => match self.config.attribute(name) {
                Some(value) => format!("{name} = {value}"),
                None => "This attribute does not exist. Use \"/print_config help\" or \
                         \"/help\" for more information."
                    .to_string(),
            },
        };
        Ok(CommandOutcome::Reply(reply))
    }

    /// `/print_broadcast_list`: the active channels.
    async fn print_broadcast_list(&self) -> Result<CommandOutcome> {
        let channels = self.channels.list_active().await?;
        let names: Vec<&str> = channels.iter().map(|c| c.as_str()).collect();
        Ok(CommandOutcome::Reply(names.join(", ")))
    }

    /// `/rotate`: subscribe to periodic rotation, starting it if inactive.
    async fn rotate(&self, ctx: &CommandContext) -> Result<CommandOutcome> {
        let reply = self
            .rotation
            .request_rotation(&ctx.user, &ctx.channel)
            .await;
        Ok(CommandOutcome::Reply(reply))
    }

    /// `/cancel_rotation`: stop periodic rotation if it is running.
    async fn cancel_rotation(&self) -> Result<CommandOutcome> {
        let reply = if self.rotation.cancel().await {
            "Periodic rotation cancelled."
        } else {
            "No periodic rotation is running."
        };
        Ok(CommandOutcome::Reply(reply.to_string()))
    }
}
