//! Live — implements `ContainerRuntime` for the real CLI-backed `DockerCli`.

use std::pin::Pin;
use std::time::Duration;

use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::client::runtime::ContainerRuntime;
use crate::docker::client::{CommandOutput, DockerCli, ExecOutput, RuntimeError};
use crate::docker::inventory::{ContainerEvent, ContainerInfo, ContainerStats};

impl ContainerRuntime for DockerCli {
    fn inspect<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Option<ContainerInfo>, RuntimeError>> + Send + 'a>> {
        Box::pin(self.inspect(name))
    }

    fn stats<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<Option<ContainerStats>, RuntimeError>> + Send + 'a>> {
        Box::pin(self.stats(name))
    }

    fn logs<'a>(
        &'a self,
        name: &'a str,
        tail: usize,
    ) -> Pin<Box<dyn std::future::Future<Output = String> + Send + 'a>> {
        Box::pin(self.logs(name, tail))
    }

    fn top<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<String, RuntimeError>> + Send + 'a>> {
        Box::pin(self.top(name))
    }

    fn exec<'a>(
        &'a self,
        name: &'a str,
        argv: &'a [String],
        timeout: Duration,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<ExecOutput, RuntimeError>> + Send + 'a>> {
        Box::pin(self.exec(name, argv, timeout))
    }

    fn restart<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<CommandOutput, RuntimeError>> + Send + 'a>> {
        Box::pin(self.restart(name))
    }

    fn stop<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<CommandOutput, RuntimeError>> + Send + 'a>> {
        Box::pin(self.stop(name))
    }

    fn commit<'a>(
        &'a self,
        name: &'a str,
        tag: &'a str,
    ) -> Pin<Box<dyn std::future::Future<Output = Result<CommandOutput, RuntimeError>> + Send + 'a>> {
        Box::pin(self.commit(name, tag))
    }

    fn events(&self, stop: CancellationToken) -> Pin<Box<dyn Stream<Item = ContainerEvent> + Send>> {
        DockerCli::events(self, stop)
    }
}
