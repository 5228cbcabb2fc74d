use anyhow::{Context, Result};
use tokio::runtime::{Builder, Runtime};

use crate::error::RunError;

/// Runs units of work to completion on behalf of commands.
///
/// Built once at process start and handed to every command's `run()`. By
/// default work goes to a blocking pool and the caller waits for it; in
/// inline mode it is called directly on the current thread, which keeps
/// everything on one stack for debugging.
pub struct ToolRunner {
    runtime: Option<Runtime>,
    run_inline: bool,
}

impl ToolRunner {
    pub fn new() -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("cryptocompat-worker")
            .build()
            .context("failed to start task runtime")?;
        Ok(Self {
            runtime: Some(runtime),
            run_inline: false,
        })
    }

    /// A runner without a worker pool; all work runs inline.
    pub fn inline() -> Self {
        Self {
            runtime: None,
            run_inline: true,
        }
    }

    pub fn set_run_inline(&mut self, run_inline: bool) {
        self.run_inline = run_inline;
    }

    pub fn runs_inline(&self) -> bool {
        self.run_inline || self.runtime.is_none()
    }

    /// Run `op` and wait for its result.
    ///
    /// A task that panics or is cancelled surfaces as [`RunError::Task`].
    pub fn run_to_completion<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let runtime = match &self.runtime {
            Some(runtime) if !self.run_inline => runtime,
            _ => {
                tracing::trace!("running task inline");
                return op();
            }
        };

        tracing::trace!("running task on worker pool");
        runtime
            .block_on(tokio::task::spawn_blocking(op))
            .map_err(|e| RunError::Task(e.to_string()))?
    }
}
