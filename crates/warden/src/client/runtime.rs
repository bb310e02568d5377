//! Runtime trait — abstract interface for all container-engine operations.
//!
//! Every domain module (collector, executor, monitor, probes) reaches the
//! engine through this trait. `live.rs` provides the real CLI-backed
//! implementation; `fake.rs` provides a scripted test double.

use std::pin::Pin;
use std::time::Duration;

use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::docker::client::{CommandOutput, ExecOutput, RuntimeError};
use crate::docker::inventory::{ContainerEvent, ContainerInfo, ContainerStats};

/// Unified async interface over the container runtime.
///
/// Object-safe thanks to `Pin<Box<…>>` returns. Implementations must be
/// `Send + Sync` so they can be shared as `Arc<dyn ContainerRuntime>`.
pub trait ContainerRuntime: Send + Sync {
    // ── Queries ─────────────────────────────────────────────────

    fn inspect<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Option<ContainerInfo>, RuntimeError>> + Send + 'a>>;

    fn stats<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Option<ContainerStats>, RuntimeError>> + Send + 'a>>;

    fn logs<'a>(
        &'a self,
        name: &'a str,
        tail: usize,
    ) -> Pin<Box<dyn std::future::Future<Output = String> + Send + 'a>>;

    fn top<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, RuntimeError>> + Send + 'a>>;

    // ── Actions ─────────────────────────────────────────────────

    fn exec<'a>(
        &'a self,
        name: &'a str,
        argv: &'a [String],
        timeout: Duration,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ExecOutput, RuntimeError>> + Send + 'a>>;

    fn restart<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<CommandOutput, RuntimeError>> + Send + 'a>>;

    fn stop<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<CommandOutput, RuntimeError>> + Send + 'a>>;

    fn commit<'a>(
        &'a self,
        name: &'a str,
        tag: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<CommandOutput, RuntimeError>> + Send + 'a>>;

    // ── Events ──────────────────────────────────────────────────

    fn events(&self, stop: CancellationToken) -> Pin<Box<dyn Stream<Item = ContainerEvent> + Send>>;
}
