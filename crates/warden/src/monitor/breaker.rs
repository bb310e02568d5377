//! Report governor — dedup quiet period plus per-container circuit breaker.
//!
//! The breaker opens when a container accumulates `max_restart_attempts`
//! accepted reports inside `window_seconds`, and stays open for another
//! window. `cooldown_seconds` doubles as the dedup quiet period between
//! accepted reports; this is one knob by design, not two.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, info, warn};

use crate::conf::model::CircuitBreakerConfig;

pub struct ReportGovernor {
    max_reports: usize,
    window: Duration,
    cooldown: Duration,
    last_report: HashMap<String, DateTime<Utc>>,
    history: HashMap<String, Vec<DateTime<Utc>>>,
    breaker_until: HashMap<String, DateTime<Utc>>,
}

impl ReportGovernor {
    pub fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            max_reports: config.max_restart_attempts,
            window: Duration::seconds(config.window_seconds as i64),
            cooldown: Duration::seconds(config.cooldown_seconds as i64),
            last_report: HashMap::new(),
            history: HashMap::new(),
            breaker_until: HashMap::new(),
        }
    }

    /// May this container report at `now`? Time is injected so the state
    /// machine is testable without clocks.
    pub fn should_report(&mut self, name: &str, now: DateTime<Utc>) -> bool {
        // 1. breaker open?
        if let Some(until) = self.breaker_until.get(name).copied() {
            if now < until {
                warn!(
                    container = name,
                    remaining_secs = (until - now).num_seconds(),
                    "circuit breaker open, report suppressed"
                );
                return false;
            }
            // cooled off: close the breaker and forget the history
            self.breaker_until.remove(name);
            self.history.insert(name.to_string(), Vec::new());
            info!(container = name, "circuit breaker closed, reports resume");
        }

        // 2. dedup quiet period since the last accepted report
        if let Some(last) = self.last_report.get(name).copied() {
            if now - last < self.cooldown {
                debug!(
                    container = name,
                    elapsed_secs = (now - last).num_seconds(),
                    "within dedup quiet period, report suppressed"
                );
                return false;
            }
        }

        // 3. prune accepted reports to the breaker window
        let window_start = now - self.window;
        let history = self.history.entry(name.to_string()).or_default();
        history.retain(|t| *t > window_start);

        // 4. too many inside the window opens the breaker
        if history.len() >= self.max_reports {
            self.breaker_until.insert(name.to_string(), now + self.window);
            error!(
                container = name,
                reports = history.len(),
                window_secs = self.window.num_seconds(),
                "report storm, circuit breaker opened"
            );
            return false;
        }

        true
    }

    /// Record an accepted report. Updates both the dedup timestamp and
    /// the breaker window history.
    pub fn record_report(&mut self, name: &str, now: DateTime<Utc>) {
        self.last_report.insert(name.to_string(), now);
        self.history.entry(name.to_string()).or_default().push(now);
    }

    pub fn breaker_open(&self, name: &str, now: DateTime<Utc>) -> bool {
        self.breaker_until
            .get(name)
            .is_some_and(|until| now < *until)
    }
}
