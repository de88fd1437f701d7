//! Per-user, per-command last-invocation bookkeeping.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Mapping `user_id -> (command_name -> last invocation)`.
///
/// Grows for the lifetime of the process; [`CooldownState::evict_before`] is
/// the hook for callers that want to bound it.
#[derive(Debug, Default, Clone)]
pub struct CooldownState {
    users: HashMap<String, HashMap<String, DateTime<Utc>>>,
}

impl CooldownState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last recorded use of `command` by `user_id`, if any.
    pub fn last_use(&self, user_id: &str, command: &str) -> Option<DateTime<Utc>> {
        self.users.get(user_id)?.get(command).copied()
    }

    /// Last use, or the Unix epoch when the user never ran the command.
    pub fn last_use_or_epoch(&self, user_id: &str, command: &str) -> DateTime<Utc> {
        self.last_use(user_id, command)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn record(&mut self, user_id: &str, command: &str, at: DateTime<Utc>) {
        self.users
            .entry(user_id.to_string())
            .or_default()
            .insert(command.to_string(), at);
    }

    /// Drop every timestamp older than `cutoff`. Returns how many were removed.
    pub fn evict_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.users.retain(|_, commands| {
            let before = commands.len();
            commands.retain(|_, at| *at >= cutoff);
            removed += before - commands.len();
            !commands.is_empty()
        });
        removed
    }

    /// Number of users with at least one recorded invocation.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
