//! End-to-end dispatch tests: parsing, arity, the permission guard, and
//! handler behavior over real components (memory store, fake transport,
//! fake service runner).

mod common;

use knockgate::CommandOutcome;
use knockgate_core::{ChannelId, ServiceState, UserId};

use common::{ctx, fixture, ADMIN};

fn reply(outcome: CommandOutcome) -> String {
    match outcome {
        CommandOutcome::Reply(text) => text,
        other => panic!("expected a reply, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_commands_are_silent() {
    let f = fixture().await;

    let outcome = f.router.dispatch(&ctx(ADMIN, "c1"), "/bogus").await.unwrap();
    assert_eq!(outcome, CommandOutcome::Silent);

    // Extra words still hit the arity check of the invalid entry first.
    let outcome = f
        .router
        .dispatch(&ctx(ADMIN, "c1"), "/bogus now")
        .await
        .unwrap();
    assert_eq!(
        reply(outcome),
        "Too many arguments: expected 0, got 1. Please refer to \"/help\"."
    );
}

#[tokio::test]
async fn arity_mismatch_blocks_the_mutation() {
    let f = fixture().await;

    let outcome = f
        .router
        .dispatch(&ctx(ADMIN, "c1"), "/add_perm alice manager extra")
        .await
        .unwrap();
    assert_eq!(
        reply(outcome),
        "Too many arguments: expected 2, got 3. Please refer to \"/help\"."
    );

    // The handler never ran; alice gained nothing.
    assert!(f
        .engine
        .groups_of(&UserId::from("alice"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn permission_guard_blocks_strangers() {
    let f = fixture().await;

    let outcome = f
        .router
        .dispatch(&ctx("999", "c1"), "/generate")
        .await
        .unwrap();
    assert_eq!(reply(outcome), "Action forbidden ; insufficient rights.");
    assert!(f.runner.calls().is_empty());
}

#[tokio::test]
async fn admin_grants_then_member_generates() {
    let f = fixture().await;

    let outcome = f
        .router
        .dispatch(&ctx(ADMIN, "c1"), "/add_perm alice member")
        .await
        .unwrap();
    assert_eq!(
        reply(outcome),
        "User alice successfully added to group member !"
    );

    // The open sequence is configured, so the applied ports are fixed.
    let outcome = f
        .router
        .dispatch(&ctx("alice", "c1"), "/generate")
        .await
        .unwrap();
    assert_eq!(reply(outcome), "New sequence: 7000, 8000, 9000");

    assert_eq!(f.controller.state().await, ServiceState::Running);
    let written = std::fs::read_to_string(&f.config.knockd_config_path).unwrap();
    assert!(written.contains("sequence                = 7000, 8000, 9000"));
}

#[tokio::test]
async fn invalid_group_is_reported_but_not_stored() {
    let f = fixture().await;

    let outcome = f
        .router
        .dispatch(&ctx(ADMIN, "c1"), "/add_perm alice root")
        .await
        .unwrap();
    assert_eq!(reply(outcome), "Group root is invalid !");
    assert!(!f.engine.user_exists(&UserId::from("alice")).await.unwrap());
}

#[tokio::test]
async fn forget_deactivates_the_current_channel() {
    let f = fixture().await;
    let channel = ChannelId::from("c9");

    f.channels.register(&channel).await.unwrap();
    let outcome = f.router.dispatch(&ctx(ADMIN, "c9"), "/forget").await.unwrap();
    assert_eq!(outcome, CommandOutcome::Silent);
    assert!(f.channels.list_active().await.unwrap().is_empty());

    // Speaking again reactivates.
    f.channels.register(&channel).await.unwrap();
    assert_eq!(f.channels.list_active().await.unwrap(), vec![channel]);
}

#[tokio::test]
async fn help_is_open_to_everyone() {
    let f = fixture().await;

    let text = reply(f.router.dispatch(&ctx("999", "c1"), "/help").await.unwrap());
    assert!(text.contains("/add_perm"));
    assert!(text.contains("/rotate"));
}

#[tokio::test]
async fn status_and_print_config_are_admin_only() {
    let f = fixture().await;

    f.router
        .dispatch(&ctx(ADMIN, "c1"), "/add_perm bob member")
        .await
        .unwrap();
    let outcome = f.router.dispatch(&ctx("bob", "c1"), "/status").await.unwrap();
    assert_eq!(reply(outcome), "Action forbidden ; insufficient rights.");

    assert_eq!(
        reply(f.router.dispatch(&ctx(ADMIN, "c1"), "/status").await.unwrap()),
        "Stopped"
    );
    assert_eq!(
        reply(
            f.router
                .dispatch(&ctx(ADMIN, "c1"), "/print_config target_port")
                .await
                .unwrap()
        ),
        "target_port = 22"
    );
    assert_eq!(
        reply(
            f.router
                .dispatch(&ctx(ADMIN, "c1"), "/print_config bot_token")
                .await
                .unwrap()
        ),
        "bot_token = <redacted>"
    );
    assert!(reply(
        f.router
            .dispatch(&ctx(ADMIN, "c1"), "/print_config no_such_attr")
            .await
            .unwrap()
    )
    .contains("does not exist"));
    assert!(reply(
        f.router
            .dispatch(&ctx(ADMIN, "c1"), "/print_config help")
            .await
            .unwrap()
    )
    .starts_with("Available attributes: all,"));
}

#[tokio::test]
async fn print_broadcast_list_shows_active_channels() {
    let f = fixture().await;

    f.channels.register(&ChannelId::from("c1")).await.unwrap();
    f.channels.register(&ChannelId::from("c2")).await.unwrap();
    f.channels.deactivate(&ChannelId::from("c2")).await.unwrap();

    assert_eq!(
        reply(
            f.router
                .dispatch(&ctx(ADMIN, "c1"), "/print_broadcast_list")
                .await
                .unwrap()
        ),
        "c1"
    );
}

#[tokio::test]
async fn list_groups_members_covers_every_group() {
    let f = fixture().await;

    f.router
        .dispatch(&ctx(ADMIN, "c1"), "/add_perm alice manager")
        .await
        .unwrap();

    let text = reply(
        f.router
            .dispatch(&ctx(ADMIN, "c1"), "/list_groups_members")
            .await
            .unwrap(),
    );
    assert!(text.contains("manager: alice"));
    // Bootstrapped admins: the system account and the configured admin.
    assert!(text.contains("admin: 1, 100"));
    assert!(text.contains("guest: "));
}

#[tokio::test]
async fn shutdown_stops_the_daemon_and_signals() {
    let f = fixture().await;

    f.router.dispatch(&ctx(ADMIN, "c1"), "/start").await.unwrap();
    assert_eq!(f.controller.state().await, ServiceState::Running);

    let outcome = f.router.dispatch(&ctx(ADMIN, "c1"), "/shutdown").await.unwrap();
    assert_eq!(outcome, CommandOutcome::Shutdown);
    assert_eq!(f.controller.state().await, ServiceState::Stopped);
}

#[tokio::test]
async fn start_and_stop_report_noop_repeats() {
    let f = fixture().await;

    assert_eq!(
        reply(f.router.dispatch(&ctx(ADMIN, "c1"), "/start").await.unwrap()),
        "Started knockd."
    );
    assert_eq!(
        reply(f.router.dispatch(&ctx(ADMIN, "c1"), "/start").await.unwrap()),
        "knockd already running."
    );
    assert_eq!(
        reply(f.router.dispatch(&ctx(ADMIN, "c1"), "/stop").await.unwrap()),
        "Stopped knockd."
    );
    assert_eq!(
        reply(f.router.dispatch(&ctx(ADMIN, "c1"), "/stop").await.unwrap()),
        "knockd already stopped."
    );
}
