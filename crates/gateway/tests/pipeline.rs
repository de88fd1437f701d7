//! End-to-end: module files on disk through to dispatch and sync.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use {
    accord_config::{AccordConfig, ModulesConfig},
    accord_gateway::{
        Bot, CommandDispatcher, DispatchOutcome, EventBus, SyncScope, register_events,
        sync_commands,
        testing::{FakeCommandApi, FakeInteraction},
    },
    accord_modules::{ActionTable, FileDiscoverer, FsModuleSource, ModuleLoader, load_modules},
    serde_json::json,
};

/// Builtins plus `count` (command) and `tally` (event), both bumping `hits`,
/// and `never`, a cooldown that always blocks.
fn loader(hits: &Arc<AtomicUsize>) -> ModuleLoader {
    let mut actions = ActionTable::with_builtins();
    let command_hits = Arc::clone(hits);
    let event_hits = Arc::clone(hits);
    actions
        .register_command("count", move |_, _| {
            let hits = Arc::clone(&command_hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .register_event("tally", move |_, _| {
            let hits = Arc::clone(&event_hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .register_cooldown("never", |_, _| false);
    ModuleLoader::new(actions)
}

fn source(root: &Path, hits: &Arc<AtomicUsize>) -> FsModuleSource {
    let discoverer = FileDiscoverer::from_config(&ModulesConfig::default()).unwrap();
    FsModuleSource::new(root, discoverer, loader(hits))
}

fn write(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

#[tokio::test]
async fn single_command_file_dispatches_exactly_once() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "commands/ping.toml",
        r#"
tag = "command"

[payload.data]
name = "ping"
description = "Replies with pong"

[payload.execute]
"$action" = "count"
"#,
    );
    let hits = Arc::new(AtomicUsize::new(0));

    let loaded = load_modules(&source(tmp.path(), &hits)).await.unwrap();
    let dispatcher = CommandDispatcher::new(loaded.commands).unwrap();
    assert_eq!(dispatcher.command_names(), vec!["ping"]);

    let outcome = dispatcher
        .dispatch(FakeInteraction::command("ping").shared())
        .await;
    assert_eq!(outcome, DispatchOutcome::Executed);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_entry_in_a_list_is_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "events/messages.json",
        r#"[
  {"tag": "event", "payload": {"name": "messageCreate", "once": false, "execute": {"$action": "tally"}}},
  {"tag": "event", "payload": {"name": "messageDelete", "once": false}}
]"#,
    );
    let hits = Arc::new(AtomicUsize::new(0));

    let loaded = load_modules(&source(tmp.path(), &hits)).await.unwrap();
    assert_eq!(loaded.events.len(), 1);
    assert_eq!(loaded.events[0].origin.index, 0);
    assert_eq!(loaded.failures.len(), 1);
    assert_eq!(loaded.failures[0].index, 1);
    assert!(loaded.failures[0].reason.contains("execute"));

    let bus = EventBus::new();
    register_events(&bus, &loaded.events);
    bus.emit("messageCreate", vec![json!({"content": "hi"})])
        .await;
    assert_eq!(bus.emit("messageDelete", vec![json!({})]).await, 0);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn guild_sync_issues_clear_then_replace_per_guild() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "commands.toml",
        r#"
[[default]]
tag = "command"
payload.data = { name = "ping", description = "Ping" }
payload.execute = { "$action" = "count" }

[[default]]
tag = "command"
payload.data = { name = "echo", description = "Echo" }
payload.execute = { "$action" = "reply", content = "echo" }

[[default]]
tag = "command"
payload.data = { name = "roll", description = "Roll" }
payload.execute = { "$action" = "defer" }
"#,
    );
    let hits = Arc::new(AtomicUsize::new(0));
    let loaded = load_modules(&source(tmp.path(), &hits)).await.unwrap();
    assert_eq!(loaded.commands.len(), 3);

    let api = FakeCommandApi::new();
    let guilds = vec!["G1".to_string(), "G2".to_string()];
    let report = sync_commands(&api, &loaded.command_metadata(), Some(guilds.as_slice())).await;
    assert!(report.is_success());

    let calls: Vec<_> = api
        .calls()
        .into_iter()
        .map(|c| (c.scope, c.commands.len()))
        .collect();
    assert_eq!(calls, vec![
        (SyncScope::Guild("G1".into()), 0),
        (SyncScope::Guild("G1".into()), 3),
        (SyncScope::Guild("G2".into()), 0),
        (SyncScope::Guild("G2".into()), 3),
    ]);

    // A second run leaves the registry unchanged.
    let before = api.remote(&SyncScope::Guild("G1".into()));
    sync_commands(&api, &loaded.command_metadata(), Some(guilds.as_slice())).await;
    assert_eq!(api.remote(&SyncScope::Guild("G1".into())), before);
    assert_eq!(before, loaded.command_metadata());
}

#[tokio::test]
async fn cooldown_that_always_blocks_never_executes() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "commands/locked.yaml",
        r#"
tag: command
payload:
  data:
    name: locked
    description: Never runs
  execute:
    $action: count
  cooldown:
    $action: never
"#,
    );
    let hits = Arc::new(AtomicUsize::new(0));
    let loaded = load_modules(&source(tmp.path(), &hits)).await.unwrap();
    let dispatcher = CommandDispatcher::new(loaded.commands).unwrap();

    let interaction = FakeInteraction::command("locked").shared();
    let outcome = dispatcher.dispatch(interaction.clone()).await;

    assert_eq!(outcome, DispatchOutcome::CoolingDown);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(dispatcher.cooldowns().is_empty());
    assert!(interaction.replies().is_empty());
}

#[tokio::test]
async fn bot_prepares_from_the_filesystem() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "commands/ping.json",
        r#"{"default": {"tag": "command", "payload": {
            "data": {"name": "ping", "description": "Ping"},
            "execute": {"$action": "reply", "content": "pong, {user}!"},
            "cooldown": 5
        }}}"#,
    );
    write(
        tmp.path(),
        "events/ready.toml",
        r#"
tag = "event"
payload = { name = "ready", once = true, execute = { "$action" = "log", message = "up" } }
"#,
    );
    write(tmp.path(), "(drafts)/wip.toml", "tag = \"nope\"");

    let mut config = AccordConfig::default();
    config.dev.enabled = true;
    config.dev.guild_ids = vec!["G1".into()];
    let hits = Arc::new(AtomicUsize::new(0));
    let bus = Arc::new(EventBus::new());
    let api = FakeCommandApi::new();

    let bot = Bot::prepare(&config, &source(tmp.path(), &hits), bus.clone(), &api)
        .await
        .unwrap();

    assert!(bot.failures().is_empty());
    assert_eq!(api.remote(&SyncScope::Guild("G1".into())).len(), 1);
    assert_eq!(bus.listener_count("ready"), 1);

    let interaction = FakeInteraction::command("ping").shared();
    bus.dispatch_interaction(interaction.clone()).await;
    assert_eq!(interaction.replies().len(), 1);
    assert_eq!(interaction.replies()[0].content, "pong, tester!");

    bus.emit("ready", vec![]).await;
    assert_eq!(bus.listener_count("ready"), 0);
}
