//! COMMIT — forensic snapshot with cooldown, runtime dump, and isolation.
//!
//! Sequence: dump runtime state into the container's filesystem (so the
//! snapshot image carries post-mortem data), `docker commit` to a tagged
//! image, then STOP to isolate. A per-container cooldown arms on every
//! attempt — success or failure — so a flapping diagnosis cannot turn
//! commits into a denial of service.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use super::model::ActionResult;
use super::Executor;

const COMMIT_COOLDOWN_SECS: i64 = 3600;
const DUMP_TIMEOUT: Duration = Duration::from_secs(10);

/// Capture processes, sockets, and environment into the container before
/// snapshotting. Each section degrades gracefully when the tool is absent.
const DUMP_SCRIPT: &str = "\
echo '=== PROCESSES ===' > /tmp/forensics_dump.txt && \
(ps auxf >> /tmp/forensics_dump.txt || ps -ef >> /tmp/forensics_dump.txt || echo 'ps failed' >> /tmp/forensics_dump.txt) && \
echo '=== NETWORK ===' >> /tmp/forensics_dump.txt && \
(netstat -anp >> /tmp/forensics_dump.txt || ss -anp >> /tmp/forensics_dump.txt || echo 'netstat failed' >> /tmp/forensics_dump.txt) && \
echo '=== ENV ===' >> /tmp/forensics_dump.txt && \
env >> /tmp/forensics_dump.txt";

impl Executor {
    pub(super) async fn commit_forensics(&self, name: &str) -> ActionResult {
        let now = Utc::now();

        if let Some(last) = self.commit_cooldowns.get(name) {
            let elapsed = (now - *last).num_seconds();
            if elapsed < COMMIT_COOLDOWN_SECS {
                let remaining = COMMIT_COOLDOWN_SECS - elapsed;
                let mut result = ActionResult::base("COMMIT", name);
                result.error = Some(format!(
                    "commit cooling down, {remaining} seconds remaining"
                ));
                return result;
            }
        }
        // arm the cooldown before attempting anything
        self.commit_cooldowns.insert(name.to_string(), now);

        // 1. runtime dump — failure does not block the snapshot
        let dump_argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            DUMP_SCRIPT.to_string(),
        ];
        match self.runtime.exec(name, &dump_argv, DUMP_TIMEOUT).await {
            Ok(out) if out.ok() => debug!(container = name, "runtime dump captured"),
            Ok(out) => debug!(container = name, stderr = %out.stderr, "runtime dump incomplete"),
            Err(e) => debug!(container = name, "runtime dump failed: {e}"),
        }

        // 2. snapshot
        let image_name = format!("forensics_{name}_{}", now.format("%Y%m%d_%H%M%S"));
        let commit = match self.runtime.commit(name, &image_name).await {
            Ok(out) => out,
            Err(e) => {
                let mut result = ActionResult::base("COMMIT", name);
                result.error = Some(e.to_string());
                return result;
            }
        };

        // 3. isolate
        let stop_result = self.execute_stop(name).await;
        info!(container = name, image = %image_name, ok = commit.ok, "forensic snapshot finished");

        let mut result = ActionResult::base("COMMIT", name);
        result.success = commit.ok;
        result.output = Some(commit.output);
        if commit.ok {
            result.image_name = Some(image_name);
        }
        result.stop_result = Some(Box::new(stop_result));
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::tests::config_with;
    use super::super::Executor;
    use crate::client::fake::FakeRuntime;
    use crate::client::runtime::ContainerRuntime;
    use crate::docker::inventory::ContainerInfo;

    fn compromised(name: &str) -> ContainerInfo {
        ContainerInfo {
            name: name.to_string(),
            status: "running".to_string(),
            running: true,
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn commit_dumps_snapshots_and_stops() {
        let runtime = Arc::new(FakeRuntime::new());
        runtime.put_container(compromised("pwned"));

        let executor = Executor::new(
            Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
            config_with(&["COMMIT", "STOP"], vec![]),
        );

        let result = executor.execute("COMMIT", "pwned").await;
        assert!(result.success);
        assert!(result.image_name.as_ref().unwrap().starts_with("forensics_pwned_"));
        let stop = result.stop_result.unwrap();
        assert!(stop.verification.unwrap().is_stopped);

        let calls = runtime.calls();
        assert!(calls.iter().any(|c| c.starts_with("exec pwned")));
        assert_eq!(runtime.call_count("commit"), 1);
        assert_eq!(runtime.call_count("stop"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn second_commit_within_cooldown_is_denied() {
        let runtime = Arc::new(FakeRuntime::new());
        runtime.put_container(compromised("pwned"));

        let executor = Executor::new(
            Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
            config_with(&["COMMIT", "STOP"], vec![]),
        );

        let first = executor.execute("COMMIT", "pwned").await;
        assert!(first.success);

        let second = executor.execute("COMMIT", "pwned").await;
        assert!(!second.success);
        assert!(second.error.unwrap().contains("remaining"));

        // the runtime saw exactly one commit across both calls
        assert_eq!(runtime.call_count("commit"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_commit_still_arms_the_cooldown() {
        let runtime = Arc::new(FakeRuntime::new());
        runtime.put_container(compromised("pwned"));
        runtime.fail_commit();

        let executor = Executor::new(
            Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
            config_with(&["COMMIT", "STOP"], vec![]),
        );

        let first = executor.execute("COMMIT", "pwned").await;
        assert!(!first.success);
        assert!(first.image_name.is_none());

        let second = executor.execute("COMMIT", "pwned").await;
        assert!(second.error.unwrap().contains("remaining"));
        assert_eq!(runtime.call_count("commit"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldowns_are_per_container() {
        let runtime = Arc::new(FakeRuntime::new());
        runtime.put_container(compromised("a"));
        runtime.put_container(compromised("b"));

        let executor = Executor::new(
            Arc::clone(&runtime) as Arc<dyn ContainerRuntime>,
            config_with(&["COMMIT", "STOP"], vec![]),
        );

        assert!(executor.execute("COMMIT", "a").await.success);
        assert!(executor.execute("COMMIT", "b").await.success);
        assert_eq!(runtime.call_count("commit"), 2);
    }
}
