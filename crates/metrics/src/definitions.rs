//! Metric names and label keys used across accord.

/// Command dispatch
pub mod commands {
    /// Invocations whose executor returned `Ok`
    pub const EXECUTED_TOTAL: &str = "accord_commands_executed_total";
    /// Invocations whose executor returned an error
    pub const FAILED_TOTAL: &str = "accord_commands_failed_total";
    /// Invocations blocked by a cooldown
    pub const COOLDOWN_BLOCKED_TOTAL: &str = "accord_commands_cooldown_blocked_total";
    /// Interactions naming a command that is not loaded
    pub const UNMATCHED_TOTAL: &str = "accord_commands_unmatched_total";
    /// Executor run time in seconds
    pub const DURATION_SECONDS: &str = "accord_command_duration_seconds";
}

/// Gateway events
pub mod events {
    /// Event occurrences handed to an executor
    pub const DISPATCHED_TOTAL: &str = "accord_events_dispatched_total";
}

/// Remote command registry
pub mod sync {
    /// PUT requests issued, clears included
    pub const REQUESTS_TOTAL: &str = "accord_sync_requests_total";
    pub const FAILURES_TOTAL: &str = "accord_sync_failures_total";
}

/// Module pipeline
pub mod modules {
    /// Candidates dropped by validation
    pub const REJECTED_TOTAL: &str = "accord_modules_rejected_total";
}

pub mod labels {
    pub const COMMAND: &str = "command";
    pub const EVENT: &str = "event";
    pub const SCOPE: &str = "scope";
}

/// Histogram buckets
pub mod buckets {
    /// Command executors are mostly a reply round trip; deferred ones run longer.
    pub const COMMAND_DURATION: [f64; 10] = [0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 15.0];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_share_the_prefix() {
        for name in [
            commands::EXECUTED_TOTAL,
            commands::FAILED_TOTAL,
            commands::COOLDOWN_BLOCKED_TOTAL,
            commands::UNMATCHED_TOTAL,
            commands::DURATION_SECONDS,
            events::DISPATCHED_TOTAL,
            sync::REQUESTS_TOTAL,
            sync::FAILURES_TOTAL,
            modules::REJECTED_TOTAL,
        ] {
            assert!(name.starts_with("accord_"), "{name}");
        }
    }

    #[test]
    fn buckets_are_sorted() {
        assert!(buckets::COMMAND_DURATION.windows(2).all(|w| w[0] < w[1]));
    }
}
