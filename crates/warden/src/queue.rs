//! Task queue — asynchronous diagnosis off the monitor's hot path.
//!
//! Multi-producer/multi-consumer FIFO. Admission control lives upstream
//! in the monitor's dedup/breaker, so the channel itself is unbounded.
//! Workers pop with a one-second wait and re-check the running flag, so
//! stop takes effect promptly while in-flight tasks complete.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::diagnosis::{DiagnosisGraph, DiagnosisOutcome};
use crate::evidence::Evidence;
use crate::journal::{HistoryRecord, Journal};

const POP_WAIT: Duration = Duration::from_secs(1);

pub type DiagnosisCallback = Box<dyn FnOnce(&DiagnosisOutcome) + Send>;

struct Task {
    evidence: Evidence,
    callback: Option<DiagnosisCallback>,
    submitted_at: DateTime<Utc>,
}

pub struct TaskQueue {
    tx: mpsc::UnboundedSender<Task>,
    rx: Mutex<mpsc::UnboundedReceiver<Task>>,
    running: AtomicBool,
    workers: std::sync::Mutex<Vec<JoinHandle<()>>>,
    graph: Arc<DiagnosisGraph>,
    journal: Arc<Journal>,
    max_workers: usize,
}

impl TaskQueue {
    pub fn new(graph: Arc<DiagnosisGraph>, journal: Arc<Journal>, max_workers: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            running: AtomicBool::new(false),
            workers: std::sync::Mutex::new(Vec::new()),
            graph,
            journal,
            max_workers: max_workers.max(1),
        }
    }

    /// Enqueue one evidence bundle for diagnosis.
    pub fn submit(&self, evidence: Evidence, callback: Option<DiagnosisCallback>) {
        let task = Task {
            evidence,
            callback,
            submitted_at: Utc::now(),
        };
        if self.tx.send(task).is_err() {
            error!("task queue channel closed, dropping diagnosis task");
        }
    }

    /// Spawn the worker pool. Idempotent; a second start is ignored.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(workers = self.max_workers, "starting diagnosis task queue");

        let mut workers = match self.workers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for id in 0..self.max_workers {
            let queue = Arc::clone(self);
            workers.push(tokio::spawn(async move {
                queue.worker_loop(id).await;
            }));
        }
    }

    async fn worker_loop(self: Arc<Self>, id: usize) {
        debug!(worker = id, "diagnosis worker started");
        while self.running.load(Ordering::SeqCst) {
            let task = {
                let mut rx = self.rx.lock().await;
                match tokio::time::timeout(POP_WAIT, rx.recv()).await {
                    Ok(Some(task)) => task,
                    Ok(None) => break,
                    Err(_) => continue, // wait expired, re-check running
                }
                // receiver lock dropped here so other workers can pop
            };
            self.process(task).await;
        }
        debug!(worker = id, "diagnosis worker stopped");
    }

    /// One task. Failures are logged and swallowed — a bad task must
    /// never take the worker down with it.
    async fn process(&self, task: Task) {
        let container = task.evidence.container_name().to_string();
        let queued_for = Utc::now() - task.submitted_at;
        debug!(
            container = %container,
            queued_ms = queued_for.num_milliseconds(),
            "processing diagnosis task"
        );

        let outcome = self.graph.run(task.evidence).await;

        if let Err(e) = self
            .journal
            .append(&HistoryRecord::from_outcome(&outcome))
            .await
        {
            error!(container = %container, "failed to journal outcome: {e}");
        }

        if let Some(callback) = task.callback {
            callback(&outcome);
        }
    }

    /// Flip the running flag; workers exit after their current task (or
    /// their current one-second wait).
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        info!("stopping diagnosis task queue");
        let handles: Vec<JoinHandle<()>> = {
            let mut workers = match self.workers.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            workers.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeRuntime;
    use crate::client::runtime::ContainerRuntime;
    use crate::conf::WardenConfig;
    use crate::diagnosis::analyze::tests::evidence;
    use crate::diagnosis::llm::FakeChat;
    use crate::evidence::model::FaultKind;
    use crate::executor::Executor;
    use crate::notify::mailer::RecordingNotifier;
    use crate::notify::Notify;

    fn queue_with(chat: FakeChat, journal: Arc<Journal>, workers: usize) -> Arc<TaskQueue> {
        let executor = Arc::new(Executor::new(
            Arc::new(FakeRuntime::new()) as Arc<dyn ContainerRuntime>,
            Arc::new(WardenConfig::default()),
        ));
        let notifier = Arc::new(RecordingNotifier::new()) as Arc<dyn Notify>;
        let graph = Arc::new(DiagnosisGraph::new(Arc::new(chat), executor, notifier));
        Arc::new(TaskQueue::new(graph, journal, workers))
    }

    fn temp_journal() -> (tempfile::TempDir, Arc<Journal>) {
        let dir = tempfile::tempdir().unwrap();
        let journal = Arc::new(Journal::new(dir.path().join("history.jsonl")));
        (dir, journal)
    }

    #[tokio::test]
    async fn processes_task_and_journals_outcome() {
        let (_dir, journal) = temp_journal();
        let queue = queue_with(
            FakeChat::replying(r#"{"command": "NONE", "reason": "fine"}"#),
            Arc::clone(&journal),
            1,
        );
        queue.start();

        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let mut done_tx = Some(done_tx);
        queue.submit(
            evidence("web", FaultKind::Unknown),
            Some(Box::new(move |outcome| {
                if let Some(tx) = done_tx.take() {
                    let _ = tx.send(outcome.container.clone());
                }
            })),
        );

        let container = tokio::time::timeout(Duration::from_secs(5), done_rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(container, "web");

        queue.stop().await;
        let records = journal.read_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].container, "web");
    }

    #[tokio::test]
    async fn multiple_tasks_all_complete() {
        let (_dir, journal) = temp_journal();
        let queue = queue_with(
            FakeChat::replying(r#"{"command": "NONE"}"#),
            Arc::clone(&journal),
            1,
        );
        queue.start();

        let (tx, mut rx) = mpsc::unbounded_channel();
        for i in 0..3 {
            let tx = tx.clone();
            queue.submit(
                evidence(&format!("c{i}"), FaultKind::Unknown),
                Some(Box::new(move |_| {
                    let _ = tx.send(());
                })),
            );
        }
        for _ in 0..3 {
            tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
        }
        queue.stop().await;

        assert_eq!(journal.read_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failing_diagnosis_does_not_kill_the_worker() {
        let (_dir, journal) = temp_journal();
        // garbage reply → parse error path inside the graph
        let queue = queue_with(FakeChat::replying("not json at all"), Arc::clone(&journal), 1);
        queue.start();

        let (tx, mut rx) = mpsc::unbounded_channel();
        for i in 0..2 {
            let tx = tx.clone();
            queue.submit(
                evidence(&format!("c{i}"), FaultKind::CpuHigh),
                Some(Box::new(move |_| {
                    let _ = tx.send(());
                })),
            );
        }
        for _ in 0..2 {
            tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
        }
        assert!(queue.is_running());
        queue.stop().await;
    }

    #[tokio::test]
    async fn double_start_spawns_one_pool() {
        let (_dir, journal) = temp_journal();
        let queue = queue_with(FakeChat::replying(r#"{"command": "NONE"}"#), journal, 2);
        queue.start();
        queue.start();
        assert_eq!(queue.workers.lock().unwrap().len(), 2);
        queue.stop().await;
    }

    #[tokio::test]
    async fn stop_flips_running_and_joins_workers() {
        let (_dir, journal) = temp_journal();
        let queue = queue_with(FakeChat::replying(r#"{"command": "NONE"}"#), journal, 1);
        queue.start();
        assert!(queue.is_running());
        queue.stop().await;
        assert!(!queue.is_running());
        assert!(queue.workers.lock().unwrap().is_empty());
    }
}
