//! Application context — constructs and owns the long-lived subsystems.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::runtime::ContainerRuntime;
use crate::conf::WardenConfig;
use crate::diagnosis::{DiagnosisGraph, LlmClient};
use crate::docker::client::DockerCli;
use crate::executor::Executor;
use crate::http::ApiState;
use crate::journal::Journal;
use crate::monitor::Monitor;
use crate::notify::{Mailer, Notify};
use crate::queue::TaskQueue;
use crate::security::SecurityRules;

/// Default journal location, relative to the working directory.
pub const JOURNAL_PATH: &str = "data/history.jsonl";

/// Diagnosis workers in the task queue pool.
const QUEUE_WORKERS: usize = 1;

pub struct Warden {
    pub config: Arc<WardenConfig>,
    pub notifier: Arc<dyn Notify>,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub executor: Arc<Executor>,
    pub graph: Arc<DiagnosisGraph>,
    pub queue: Arc<TaskQueue>,
    pub monitor: Arc<Monitor>,
    pub journal: Arc<Journal>,
    pub stop: CancellationToken,
}

impl Warden {
    /// Wire the subsystems in dependency order:
    /// config → notifier → runtime adapter → executor → graph → queue →
    /// monitor.
    pub fn bootstrap(config: WardenConfig, rules: SecurityRules, docker: DockerCli) -> Self {
        let config = Arc::new(config);
        let stop = CancellationToken::new();

        let notifier: Arc<dyn Notify> =
            Arc::new(Mailer::new(config.notification.email.clone()));
        let runtime: Arc<dyn ContainerRuntime> = Arc::new(docker);
        let executor = Arc::new(Executor::new(Arc::clone(&runtime), Arc::clone(&config)));
        let chat = Arc::new(LlmClient::new(config.llm.clone()));
        let graph = Arc::new(DiagnosisGraph::new(
            chat,
            Arc::clone(&executor),
            Arc::clone(&notifier),
        ));
        let journal = Arc::new(Journal::new(JOURNAL_PATH));
        let queue = Arc::new(TaskQueue::new(
            Arc::clone(&graph),
            Arc::clone(&journal),
            QUEUE_WORKERS,
        ));
        let monitor = Monitor::new(
            Arc::clone(&config),
            Arc::clone(&runtime),
            rules,
            Arc::clone(&queue),
            stop.clone(),
        );

        Self {
            config,
            notifier,
            runtime,
            executor,
            graph,
            queue,
            monitor,
            journal,
            stop,
        }
    }

    pub fn api_state(&self) -> Arc<ApiState> {
        Arc::new(ApiState {
            executor: Arc::clone(&self.executor),
            notifier: Arc::clone(&self.notifier),
        })
    }

    /// Start the queue workers and both monitor loops.
    pub fn start(&self) {
        self.queue.start();
        self.monitor.start();
    }

    /// Stop the monitor first so no new evidence is enqueued, then drain
    /// the queue workers.
    pub async fn shutdown(&self) {
        self.monitor.shutdown().await;
        self.queue.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_wires_the_context() {
        let warden = Warden::bootstrap(
            WardenConfig::default(),
            SecurityRules::defaults(),
            DockerCli::new(""),
        );
        assert!(!warden.queue.is_running());

        warden.start();
        assert!(warden.queue.is_running());

        warden.shutdown().await;
        assert!(!warden.queue.is_running());
    }
}
