//! Lifecycle domain — restart, stop, commit, exec.

use std::time::Duration;

use super::client::{
    CommandOutput, DockerCli, ExecOutput, RuntimeError, ACTION_TIMEOUT, COMMIT_TIMEOUT,
};

impl DockerCli {
    pub async fn restart(&self, name: &str) -> Result<CommandOutput, RuntimeError> {
        let out = self.run(&["restart", name], ACTION_TIMEOUT).await?;
        Ok(out.into())
    }

    pub async fn stop(&self, name: &str) -> Result<CommandOutput, RuntimeError> {
        let out = self.run(&["stop", name], ACTION_TIMEOUT).await?;
        Ok(out.into())
    }

    /// Commit the container's filesystem to a local image. Slow by
    /// nature, hence the dedicated timeout.
    pub async fn commit(&self, name: &str, tag: &str) -> Result<CommandOutput, RuntimeError> {
        let out = self.run(&["commit", name, tag], COMMIT_TIMEOUT).await?;
        Ok(out.into())
    }

    /// Run a command inside the container via `docker exec`.
    pub async fn exec(
        &self,
        name: &str,
        argv: &[String],
        timeout: Duration,
    ) -> Result<ExecOutput, RuntimeError> {
        let mut args: Vec<&str> = vec!["exec", name];
        args.extend(argv.iter().map(|s| s.as_str()));
        self.run(&args, timeout).await
    }
}
