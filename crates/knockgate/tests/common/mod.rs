//! Shared fixture for the integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use knockgate::{
    ChannelRegistry, ChatTransport, CommandContext, CommandHandlers, RotationScheduler, Router,
};
use knockgate_core::{ChannelId, Config, UserId};
use knockgate_knockd::KnockController;
use knockgate_perms::PermissionEngine;
use knockgate_store::MemoryStore;
use knockgate_testkit::{test_config, FakeRunner, FakeTransport};

/// The admin id `test_config` bootstraps.
pub const ADMIN: &str = "100";

pub struct Fixture {
    pub config: Arc<Config>,
    pub engine: Arc<PermissionEngine<MemoryStore>>,
    pub channels: Arc<ChannelRegistry<MemoryStore>>,
    pub controller: Arc<KnockController<FakeRunner>>,
    pub rotation: Arc<RotationScheduler<FakeRunner>>,
    pub router: Router<MemoryStore, FakeRunner>,
    pub transport: Arc<FakeTransport>,
    pub runner: FakeRunner,
    _dir: tempfile::TempDir,
}

pub async fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let config = Arc::new(test_config(dir.path()));

    let store = Arc::new(MemoryStore::new());
    let engine = Arc::new(PermissionEngine::new(store.clone(), &config));
    engine.init().await.unwrap();
    engine.bootstrap_admins().await.unwrap();

    let transport = Arc::new(FakeTransport::new());
    let channels = Arc::new(ChannelRegistry::new(
        store,
        transport.clone() as Arc<dyn ChatTransport>,
    ));
    channels.init().await.unwrap();

    let runner = FakeRunner::new();
    let controller = Arc::new(KnockController::new(runner.clone(), &config));
    let rotation = Arc::new(RotationScheduler::new(
        config.clone(),
        controller.clone(),
        transport.clone() as Arc<dyn ChatTransport>,
    ));

    let handlers = CommandHandlers::new(
        config.clone(),
        engine.clone(),
        channels.clone(),
        controller.clone(),
        rotation.clone(),
    );
    let router = Router::new(engine.clone(), handlers);

    Fixture {
        config,
        engine,
        channels,
        controller,
        rotation,
        router,
        transport,
        runner,
        _dir: dir,
    }
}

pub fn ctx(user: &str, channel: &str) -> CommandContext {
    CommandContext {
        user: UserId::from(user),
        channel: ChannelId::from(channel),
    }
}
