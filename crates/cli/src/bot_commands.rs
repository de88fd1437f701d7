//! `accord dev`, `accord start` and `accord deploy`.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    accord_config::{
        AccordConfig, Severity, ValidateFor, ValidationResult, discover_and_load, validate_for,
    },
    accord_discord::SerenityGateway,
    accord_gateway::{Bot, RestCommandApi, sync_commands},
    accord_modules::{
        EmbeddedModuleSource, FileDiscoverer, FsModuleSource, ModuleLoader, ModuleSource,
        load_modules,
    },
    anyhow::{Context, Result},
    include_dir::{Dir, include_dir},
    tracing::{error, info, warn},
};

/// Modules compiled into the binary for `accord start`.
pub static EMBEDDED_MODULES: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/modules");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Dev,
    Production,
}

pub fn load_config(explicit: Option<&Path>) -> Result<AccordConfig> {
    let cwd = std::env::current_dir()?;
    let loaded = discover_and_load(&cwd, explicit)?;
    if let Some(path) = &loaded.path {
        info!(path = %path.display(), "loaded config");
    }
    Ok(loaded.config)
}

/// Log every diagnostic; fail when any is an error.
pub fn check_diagnostics(result: &ValidationResult) -> Result<()> {
    for diagnostic in &result.diagnostics {
        match diagnostic.severity {
            Severity::Error => error!(path = %diagnostic.path, "{}", diagnostic.message),
            Severity::Warning => {
                warn!(path = %diagnostic.path, "{}", diagnostic.message)
            },
        }
    }
    if result.has_errors() {
        anyhow::bail!("invalid configuration ({} error(s))", result.errors().len());
    }
    Ok(())
}

fn source_dir(config: &AccordConfig, explicit: Option<&Path>) -> Result<PathBuf> {
    let dir = explicit.map_or_else(|| config.modules.source_dir.clone(), Path::to_path_buf);
    if dir.is_absolute() {
        Ok(dir)
    } else {
        Ok(std::env::current_dir()?.join(dir))
    }
}

/// Filesystem modules in dev mode or whenever `--source` is given; the
/// embedded set otherwise.
pub fn module_source(
    config: &AccordConfig,
    mode: Mode,
    explicit: Option<&Path>,
) -> Result<Box<dyn ModuleSource>> {
    let discoverer =
        FileDiscoverer::from_config(&config.modules).context("invalid module name pattern")?;
    let loader = ModuleLoader::default();
    if mode == Mode::Dev || explicit.is_some() {
        let root = source_dir(config, explicit)?;
        Ok(Box::new(FsModuleSource::new(root, discoverer, loader)))
    } else {
        Ok(Box::new(EmbeddedModuleSource::new(
            &EMBEDDED_MODULES,
            discoverer,
            loader,
        )))
    }
}

#[cfg(feature = "metrics")]
fn init_metrics(config: &AccordConfig) -> Result<accord_metrics::MetricsHandle> {
    let listen: Option<std::net::SocketAddr> = if config.metrics.enabled {
        Some(
            config
                .metrics
                .listen
                .parse()
                .with_context(|| format!("invalid metrics.listen '{}'", config.metrics.listen))?,
        )
    } else {
        None
    };
    accord_metrics::init_metrics(accord_metrics::MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        listen,
        global_labels: vec![("service".into(), "accord".into())],
    })
}

/// Prepare the bot and stay connected until SIGINT/SIGTERM.
pub async fn run(mode: Mode, config_path: Option<&Path>, source: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path)?;
    config.dev.enabled = mode == Mode::Dev;
    check_diagnostics(&validate_for(&config, ValidateFor {
        needs_token: true,
        needs_client_id: true,
    }))?;

    #[cfg(feature = "metrics")]
    let _metrics = init_metrics(&config)?;

    let source = module_source(&config, mode, source)?;
    let api = RestCommandApi::from_config(&config)?;
    let gateway = Arc::new(SerenityGateway::new());

    let bot = Bot::prepare(&config, source.as_ref(), gateway.clone(), &api).await?;
    for failure in bot.failures() {
        warn!(path = %failure.path, index = failure.index, "module skipped: {}", failure.reason);
    }

    let closer = Arc::clone(&gateway);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received, stopping bot");
        closer.shutdown().await;
    });

    bot.run().await?;
    info!("bot has shut down cleanly");
    Ok(())
}

/// Sync commands and exit.
pub async fn deploy(config_path: Option<&Path>, source: Option<&Path>, global: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    if global {
        config.dev.enabled = false;
    }
    check_diagnostics(&validate_for(&config, ValidateFor {
        needs_token: true,
        needs_client_id: true,
    }))?;

    let mode = if config.dev.enabled {
        Mode::Dev
    } else {
        Mode::Production
    };
    let source = module_source(&config, mode, source)?;
    let loaded = load_modules(source.as_ref()).await?;
    let api = RestCommandApi::from_config(&config)?;

    let report = sync_commands(&api, &loaded.command_metadata(), config.sync_guilds()).await;
    for outcome in &report.scopes {
        match &outcome.result {
            Ok(count) => println!("  {}: {count} command(s) registered", outcome.scope),
            Err(e) => println!("  {}: failed: {e}", outcome.scope),
        }
    }
    report.into_result()?;
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
