// ABOUTME: Metric names and recording helpers for synchronization and outbound calls
// ABOUTME: Emits through the `metrics` facade; the binary decides whether an exporter is installed

pub const EVENTS_TOTAL: &str = "machine_events_total";
pub const CACHE_USERS: &str = "machine_cache_users";
pub const CACHE_CHANNELS: &str = "machine_cache_channels";
pub const FULL_SYNC_SECONDS: &str = "machine_full_sync_seconds";
pub const OUTBOUND_TOTAL: &str = "machine_outbound_total";

fn outcome(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "error"
    }
}

pub fn record_event(kind: &'static str, ok: bool) {
    ::metrics::counter!(EVENTS_TOTAL, "kind" => kind, "outcome" => outcome(ok)).increment(1);
}

pub fn record_cache_sizes(users: usize, channels: usize) {
    ::metrics::gauge!(CACHE_USERS).set(users as f64);
    ::metrics::gauge!(CACHE_CHANNELS).set(channels as f64);
}

pub fn record_full_sync(seconds: f64) {
    ::metrics::histogram!(FULL_SYNC_SECONDS).record(seconds);
}

pub fn record_outbound(action: &'static str, ok: bool) {
    ::metrics::counter!(OUTBOUND_TOTAL, "action" => action, "outcome" => outcome(ok)).increment(1);
}

/// Register descriptions with whatever recorder is installed
pub fn describe_metrics() {
    ::metrics::describe_counter!(EVENTS_TOTAL, "Lifecycle events handled, by kind and outcome");
    ::metrics::describe_gauge!(CACHE_USERS, "Users currently held in the entity cache");
    ::metrics::describe_gauge!(CACHE_CHANNELS, "Channels currently held in the entity cache");
    ::metrics::describe_histogram!(
        FULL_SYNC_SECONDS,
        ::metrics::Unit::Seconds,
        "Duration of the connect-time full sync"
    );
    ::metrics::describe_counter!(OUTBOUND_TOTAL, "Outbound Web API actions, by action and outcome");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        describe_metrics();
        record_event("team_join", true);
        record_cache_sizes(3, 2);
        record_full_sync(0.25);
        record_outbound("send", false);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(outcome(true), "ok");
        assert_eq!(outcome(false), "error");
    }
}
