//! Routes chat-input interactions to command descriptors.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
};

use {
    accord_common::{CooldownState, Interaction, Reply},
    accord_config::schema::DEFAULT_FAILURE_MESSAGE,
    accord_modules::{CommandDescriptor, Executable},
    chrono::{DateTime, Utc},
    tracing::{debug, error, warn},
};

#[cfg(feature = "metrics")]
use accord_metrics::{commands as command_metrics, counter, histogram, labels};

use crate::{
    client::GatewayClient,
    cooldown::{CooldownDecision, cooldown_notice, evaluate},
    error::Result,
};

/// How one interaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a chat-input command.
    Ignored,
    /// No loaded command has that name.
    Unmatched,
    /// The command's handler declined the interaction.
    Filtered,
    CoolingDown,
    Executed,
    /// The executor returned an error; the user got the failure message.
    Failed,
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ignored => "ignored",
            Self::Unmatched => "unmatched",
            Self::Filtered => "filtered",
            Self::CoolingDown => "cooling_down",
            Self::Executed => "executed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Owns the command table and the cooldown state.
pub struct CommandDispatcher {
    commands: HashMap<String, CommandDescriptor>,
    cooldowns: Mutex<CooldownState>,
    failure_message: String,
}

impl fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("commands", &self.command_names())
            .finish_non_exhaustive()
    }
}

impl CommandDispatcher {
    /// Build the lookup table. Two commands with one name are an error.
    pub fn new(commands: Vec<CommandDescriptor>) -> Result<Self> {
        let mut table: HashMap<String, CommandDescriptor> = HashMap::with_capacity(commands.len());
        for command in commands {
            if let Some(first) = table.get(command.name()) {
                return Err(accord_modules::Error::DuplicateCommand {
                    name: command.name().to_string(),
                    first: first.origin.to_string(),
                    second: command.origin.to_string(),
                }
                .into());
            }
            table.insert(command.name().to_string(), command);
        }
        Ok(Self {
            commands: table,
            cooldowns: Mutex::new(CooldownState::new()),
            failure_message: DEFAULT_FAILURE_MESSAGE.to_string(),
        })
    }

    /// Text of the ephemeral reply sent when an executor fails.
    #[must_use]
    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }

    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.get(name)
    }

    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Copy of the current cooldown bookkeeping.
    pub fn cooldowns(&self) -> CooldownState {
        self.lock_cooldowns().clone()
    }

    /// Drop cooldown timestamps older than `cutoff`. Nothing calls this on
    /// its own; long-running bots can schedule it.
    pub fn evict_cooldowns_before(&self, cutoff: DateTime<Utc>) -> usize {
        self.lock_cooldowns().evict_before(cutoff)
    }

    fn lock_cooldowns(&self) -> std::sync::MutexGuard<'_, CooldownState> {
        self.cooldowns.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Route every interaction `client` receives through this dispatcher.
    pub fn bind(self: &Arc<Self>, client: &dyn GatewayClient) {
        let dispatcher = Arc::clone(self);
        client.on_interaction(Arc::new(move |interaction| {
            let dispatcher = Arc::clone(&dispatcher);
            Box::pin(async move {
                dispatcher.dispatch(interaction).await;
            })
        }));
    }

    /// Run one interaction through lookup, handler, cooldown and execution.
    pub async fn dispatch(&self, interaction: Arc<dyn Interaction>) -> DispatchOutcome {
        if !interaction.kind().is_chat_input_command() {
            debug!(kind = %interaction.kind(), "ignoring non-command interaction");
            return DispatchOutcome::Ignored;
        }

        let name = interaction.command_name();
        let Some(command) = self.commands.get(name) else {
            error!(command = name, "no command matching the interaction was found");
            #[cfg(feature = "metrics")]
            counter!(command_metrics::UNMATCHED_TOTAL).increment(1);
            return DispatchOutcome::Unmatched;
        };

        debug!(
            command = name,
            user = interaction.user_name(),
            user_id = interaction.user_id(),
            "command invoked"
        );

        if let Some(handler) = &command.handler {
            let view = interaction.to_value();
            if handler(&view).is_none_or(|v| v.is_null()) {
                debug!(command = name, "interaction filtered by handler");
                return DispatchOutcome::Filtered;
            }
        }

        if let Some(cooldown) = &command.cooldown {
            // Decide and record under one lock, without awaiting.
            let decision = {
                let mut state = self.lock_cooldowns();
                let decision = evaluate(cooldown, &state, interaction.as_ref(), name);
                if decision == CooldownDecision::Pass {
                    state.record(interaction.user_id(), name, interaction.created_at());
                }
                decision
            };

            if let CooldownDecision::Blocked { retry_at } = decision {
                debug!(command = name, user_id = interaction.user_id(), "command on cooldown");
                #[cfg(feature = "metrics")]
                counter!(command_metrics::COOLDOWN_BLOCKED_TOTAL, labels::COMMAND => name.to_string())
                    .increment(1);
                if let Some(retry_at) = retry_at
                    && let Err(e) = interaction
                        .reply(Reply::ephemeral(cooldown_notice(name, retry_at)))
                        .await
                {
                    warn!(command = name, error = %e, "failed to send cooldown notice");
                }
                return DispatchOutcome::CoolingDown;
            }
        }

        #[cfg(feature = "metrics")]
        let started = std::time::Instant::now();
        let result = command.execute(Arc::clone(&interaction)).await;
        #[cfg(feature = "metrics")]
        histogram!(command_metrics::DURATION_SECONDS, labels::COMMAND => name.to_string())
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                #[cfg(feature = "metrics")]
                counter!(command_metrics::EXECUTED_TOTAL, labels::COMMAND => name.to_string())
                    .increment(1);
                DispatchOutcome::Executed
            },
            Err(e) => {
                error!(command = name, origin = %command.origin, error = %e, "command executor failed");
                #[cfg(feature = "metrics")]
                counter!(command_metrics::FAILED_TOTAL, labels::COMMAND => name.to_string())
                    .increment(1);
                self.send_failure(interaction.as_ref()).await;
                DispatchOutcome::Failed
            },
        }
    }

    async fn send_failure(&self, interaction: &dyn Interaction) {
        let reply = Reply::ephemeral(self.failure_message.clone());
        let sent = if interaction.replied() || interaction.deferred() {
            interaction.follow_up(reply).await
        } else {
            interaction.reply(reply).await
        };
        if let Err(e) = sent {
            warn!(
                command = interaction.command_name(),
                error = %e,
                "failed to send failure message"
            );
        }
    }
}
