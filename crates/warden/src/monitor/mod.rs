//! Monitor — liveness/resource polling, event stream, report governor.

pub mod breaker;
pub mod events;
pub mod poll;
pub mod trend;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::client::runtime::ContainerRuntime;
use crate::conf::WardenConfig;
use crate::evidence::health::HealthChecker;
use crate::evidence::model::FaultKind;
use crate::evidence::Collector;
use crate::queue::TaskQueue;
use crate::security::{SecurityProbes, SecurityRules};

use breaker::ReportGovernor;
use trend::TrendTracker;

pub struct Monitor {
    config: Arc<WardenConfig>,
    runtime: Arc<dyn ContainerRuntime>,
    collector: Collector,
    probes: Arc<SecurityProbes>,
    health: HealthChecker,
    queue: Arc<TaskQueue>,
    stop: CancellationToken,
    /// Names under watch; O(1) membership test for the event loop.
    monitored: HashSet<String>,
    governor: Mutex<ReportGovernor>,
    trend: Mutex<TrendTracker>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Monitor {
    pub fn new(
        config: Arc<WardenConfig>,
        runtime: Arc<dyn ContainerRuntime>,
        rules: SecurityRules,
        queue: Arc<TaskQueue>,
        stop: CancellationToken,
    ) -> Arc<Self> {
        let probes = Arc::new(SecurityProbes::new(rules, Arc::clone(&runtime)));
        let collector = Collector::new(
            Arc::clone(&runtime),
            Arc::clone(&probes),
            Arc::clone(&config),
        );
        let health = HealthChecker::new(Arc::clone(&runtime));
        let monitored = config.containers.iter().map(|c| c.name.clone()).collect();

        Arc::new(Self {
            governor: Mutex::new(ReportGovernor::new(&config.circuit_breaker)),
            trend: Mutex::new(TrendTracker::new()),
            handles: Mutex::new(Vec::new()),
            config,
            runtime,
            collector,
            probes,
            health,
            queue,
            stop,
            monitored,
        })
    }

    /// Spawn the polling and event workers.
    pub fn start(self: &Arc<Self>) {
        info!(containers = self.monitored.len(), "starting container monitor");
        let mut handles = self.lock_handles();

        let poller = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            poller.poll_loop().await;
        }));

        let watcher = Arc::clone(self);
        handles.push(tokio::spawn(async move {
            watcher.events_loop().await;
        }));
    }

    /// Fire the stop signal and wait for both workers to exit.
    pub async fn shutdown(&self) {
        info!("stopping container monitor");
        self.stop.cancel();
        let handles: Vec<JoinHandle<()>> = self.lock_handles().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    fn lock_handles(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        match self.handles.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(crate) fn is_monitored(&self, name: &str) -> bool {
        self.monitored.contains(name)
    }

    /// Funnel one detected anomaly toward diagnosis. The governor's
    /// dedup/breaker gate runs first; on acceptance the evidence bundle
    /// is collected and enqueued. Returns whether the report was
    /// admitted.
    pub(crate) async fn report_issue(&self, name: &str, fault: FaultKind) -> bool {
        {
            let mut governor = match self.governor.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !governor.should_report(name, Utc::now()) {
                return false;
            }
        }

        info!(container = name, fault = %fault, "triggering diagnosis");
        let evidence = self.collector.collect(name, fault).await;
        self.queue.submit(evidence, None);

        match self.governor.lock() {
            Ok(mut guard) => guard.record_report(name, Utc::now()),
            Err(poisoned) => poisoned.into_inner().record_report(name, Utc::now()),
        }
        true
    }

    /// Visible for the loop bodies; exceptions never cross this line.
    pub(crate) fn log_pass_error(&self, what: &str, container: &str, e: impl std::fmt::Display) {
        error!(container, "{what} failed: {e}");
    }
}
