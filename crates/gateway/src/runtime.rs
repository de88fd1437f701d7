//! Wiring: pipeline, sync, event registration, dispatcher.

use std::{fmt, sync::Arc};

use {
    accord_config::AccordConfig,
    accord_modules::{LoadedModules, ModuleSource, ValidationFailure, load_modules},
    secrecy::{ExposeSecret, Secret},
    tracing::{info, warn},
};

use crate::{
    client::GatewayClient,
    dispatch::CommandDispatcher,
    error::{Error, Result},
    events::{RegistrationHandle, register_events},
    sync::{CommandApi, SyncReport, sync_commands},
};

/// Entry point for assembling a bot.
pub struct Bot;

impl Bot {
    /// Load modules, sync commands, then bind events and the dispatcher to
    /// `client`. Nothing is bound until every module is loaded.
    ///
    /// Dev mode syncs to `dev.guild_ids`; otherwise commands go global. A
    /// failed sync is logged and kept in [`PreparedBot::sync_report`].
    pub async fn prepare(
        config: &AccordConfig,
        source: &dyn ModuleSource,
        client: Arc<dyn GatewayClient>,
        api: &dyn CommandApi,
    ) -> Result<PreparedBot> {
        let guild_ids = config.sync_guilds();
        if guild_ids.is_some_and(<[String]>::is_empty) {
            return Err(Error::config(
                "dev mode needs at least one guild id in `dev.guild_ids`",
            ));
        }

        let LoadedModules {
            events,
            commands,
            failures,
        } = load_modules(source).await?;

        let metadata: Vec<_> = commands.iter().map(|c| c.data.as_json().clone()).collect();
        let sync_report = sync_commands(api, &metadata, guild_ids).await;
        if !sync_report.is_success() {
            warn!(
                failed = sync_report.failed_scopes().len(),
                "command sync incomplete; continuing with local commands"
            );
        }

        let handles = register_events(client.as_ref(), &events);
        let dispatcher = Arc::new(
            CommandDispatcher::new(commands)?
                .with_failure_message(config.dispatch.failure_message.clone()),
        );
        dispatcher.bind(client.as_ref());

        info!(
            events = handles.len(),
            commands = dispatcher.len(),
            dev = config.dev.enabled,
            "bot prepared"
        );

        Ok(PreparedBot {
            client,
            token: config.token().map(|t| Secret::new(t.to_string())),
            dispatcher,
            handles,
            failures,
            sync_report,
        })
    }
}

/// A bot with every module bound, ready to log in.
pub struct PreparedBot {
    client: Arc<dyn GatewayClient>,
    token: Option<Secret<String>>,
    dispatcher: Arc<CommandDispatcher>,
    handles: Vec<RegistrationHandle>,
    failures: Vec<ValidationFailure>,
    sync_report: SyncReport,
}

impl fmt::Debug for PreparedBot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedBot")
            .field("dispatcher", &self.dispatcher)
            .field("handles", &self.handles)
            .field("failures", &self.failures.len())
            .field("sync_report", &self.sync_report)
            .finish_non_exhaustive()
    }
}

impl PreparedBot {
    pub fn dispatcher(&self) -> &Arc<CommandDispatcher> {
        &self.dispatcher
    }

    pub fn handles(&self) -> &[RegistrationHandle] {
        &self.handles
    }

    /// Candidates the pipeline rejected.
    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    pub fn sync_report(&self) -> &SyncReport {
        &self.sync_report
    }

    /// Remove every event listener this bot registered. Returns how many
    /// were still bound.
    pub fn unbind_events(&mut self) -> usize {
        let client = self.client.as_ref();
        self.handles
            .drain(..)
            .filter(|handle| handle.unbind(client))
            .count()
    }

    /// Log in and run until the gateway connection ends.
    pub async fn run(&self) -> Result<()> {
        let token = self
            .token
            .as_ref()
            .ok_or_else(|| Error::config("no bot token configured"))?;
        info!("logging in");
        self.client.login(token.expose_secret()).await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            client::EventBus,
            sync::SyncScope,
            testing::{FakeCommandApi, FakeInteraction},
        },
        accord_modules::{Callable, ModuleValue, StaticModuleSource},
        serde_json::json,
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    fn command(name: &str, calls: &Arc<AtomicUsize>) -> ModuleValue {
        let calls = Arc::clone(calls);
        ModuleValue::object([
            ("tag", "command".into()),
            (
                "payload",
                ModuleValue::object([
                    ("data", json!({"name": name, "description": "test"}).into()),
                    (
                        "execute",
                        Callable::command(move |_| {
                            let calls = Arc::clone(&calls);
                            async move {
                                calls.fetch_add(1, Ordering::SeqCst);
                                Ok(())
                            }
                        })
                        .into(),
                    ),
                ]),
            ),
        ])
    }

    fn event(name: &str) -> ModuleValue {
        ModuleValue::object([
            ("tag", "event".into()),
            (
                "payload",
                ModuleValue::object([
                    ("name", name.into()),
                    ("once", false.into()),
                    ("execute", Callable::event(|_| async { Ok(()) }).into()),
                ]),
            ),
        ])
    }

    #[tokio::test]
    async fn prepare_binds_everything_and_syncs_globally() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = StaticModuleSource::default()
            .with("./ping.toml", command("ping", &calls))
            .with("./ready.toml", event("ready"));
        let bus = Arc::new(EventBus::new());
        let api = FakeCommandApi::new();

        let bot = Bot::prepare(&AccordConfig::default(), &source, bus.clone(), &api)
            .await
            .unwrap();

        assert!(bot.failures().is_empty(), "{:?}", bot.failures());
        assert!(bot.sync_report().is_success());
        assert_eq!(api.remote(&SyncScope::Global).len(), 1);
        assert_eq!(bus.listener_count("ready"), 1);
        assert_eq!(bot.dispatcher().command_names(), vec!["ping"]);

        bus.dispatch_interaction(FakeInteraction::command("ping").shared())
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dev_mode_syncs_each_guild() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = StaticModuleSource::default().with("./ping.toml", command("ping", &calls));
        let mut cfg = AccordConfig::default();
        cfg.dev.enabled = true;
        cfg.dev.guild_ids = vec!["G1".into(), "G2".into()];
        let api = FakeCommandApi::new();

        let bot = Bot::prepare(&cfg, &source, Arc::new(EventBus::new()), &api)
            .await
            .unwrap();

        assert_eq!(bot.sync_report().scopes.len(), 2);
        assert!(api.remote(&SyncScope::Global).is_empty());
        assert_eq!(api.remote(&SyncScope::Guild("G2".into())).len(), 1);
    }

    #[tokio::test]
    async fn dev_mode_without_guilds_is_rejected() {
        let mut cfg = AccordConfig::default();
        cfg.dev.enabled = true;
        let api = FakeCommandApi::new();

        let err = Bot::prepare(
            &cfg,
            &StaticModuleSource::default(),
            Arc::new(EventBus::new()),
            &api,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Config(_)), "{err}");
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_sync_does_not_stop_preparation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = StaticModuleSource::default().with("./ping.toml", command("ping", &calls));
        let api = FakeCommandApi::new().failing_for(SyncScope::Global);

        let bot = Bot::prepare(&AccordConfig::default(), &source, Arc::new(EventBus::new()), &api)
            .await
            .unwrap();

        assert!(!bot.sync_report().is_success());
        assert_eq!(bot.dispatcher().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_commands_abort_before_sync() {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = StaticModuleSource::default()
            .with("./a.toml", command("ping", &calls))
            .with("./b.toml", command("ping", &calls));
        let api = FakeCommandApi::new();

        let err = Bot::prepare(&AccordConfig::default(), &source, Arc::new(EventBus::new()), &api)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("ping"), "{err}");
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn unbind_events_detaches_listeners() {
        let source = StaticModuleSource::default()
            .with("./ready.toml", event("ready"))
            .with("./message.toml", event("messageCreate"));
        let bus = Arc::new(EventBus::new());

        let mut bot = Bot::prepare(
            &AccordConfig::default(),
            &source,
            bus.clone(),
            &FakeCommandApi::new(),
        )
        .await
        .unwrap();

        assert!(bot.failures().is_empty(), "{:?}", bot.failures());
        assert_eq!(bot.handles().len(), 2);
        assert_eq!(bus.event_names(), vec!["messageCreate", "ready"]);
        assert_eq!(bot.unbind_events(), 2);
        assert!(bus.event_names().is_empty());
        assert!(bot.handles().is_empty());
    }

    #[tokio::test]
    async fn run_requires_a_token() {
        let bus = Arc::new(EventBus::new());
        let bot = Bot::prepare(
            &AccordConfig::default(),
            &StaticModuleSource::default(),
            bus.clone(),
            &FakeCommandApi::new(),
        )
        .await
        .unwrap();
        assert!(matches!(bot.run().await, Err(Error::Config(_))));
        assert!(!bus.is_logged_in());

        let mut cfg = AccordConfig::default();
        cfg.token = Some(Secret::new("t0ken".into()));
        let bot = Bot::prepare(&cfg, &StaticModuleSource::default(), bus.clone(), &FakeCommandApi::new())
            .await
            .unwrap();
        bot.run().await.unwrap();
        assert!(bus.is_logged_in());
    }
}
