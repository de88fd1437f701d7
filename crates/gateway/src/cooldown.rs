//! Cooldown evaluation.

use {
    accord_common::{CooldownState, Interaction},
    accord_modules::{Cooldown, CooldownCheck},
    chrono::{DateTime, TimeDelta, Utc},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    Pass,
    /// `retry_at` is known for second-based cooldowns only.
    Blocked { retry_at: Option<DateTime<Utc>> },
}

/// Decide whether `interaction` may run `command` now. Never mutates `state`.
///
/// A second-based cooldown blocks while strictly less than `n` seconds have
/// passed since the user's last use; exactly `n` passes.
pub fn evaluate(
    cooldown: &Cooldown,
    state: &CooldownState,
    interaction: &dyn Interaction,
    command: &str,
) -> CooldownDecision {
    let last_use = state.last_use_or_epoch(interaction.user_id(), command);
    let now = interaction.created_at();

    match cooldown {
        Cooldown::Seconds(secs) => {
            let window = i64::try_from(*secs)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .unwrap_or(TimeDelta::MAX);
            if now.signed_duration_since(last_use) < window {
                CooldownDecision::Blocked {
                    retry_at: last_use.checked_add_signed(window),
                }
            } else {
                CooldownDecision::Pass
            }
        },
        Cooldown::Custom(check) => {
            let allowed = check(&CooldownCheck {
                last_use,
                now,
                state,
                interaction,
            });
            if allowed {
                CooldownDecision::Pass
            } else {
                CooldownDecision::Blocked { retry_at: None }
            }
        },
    }
}

/// Ephemeral notice sent when a second-based cooldown blocks.
pub fn cooldown_notice(command: &str, retry_at: DateTime<Utc>) -> String {
    format!(
        "You will be able to reuse the `/{command}` command **<t:{}:R>**",
        retry_at.timestamp()
    )
}
