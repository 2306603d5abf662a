//! Reload trigger: tell the daemon to reread its config after a write.
//!
//! Reloading is best effort: the outcome is reported to the caller as data
//! and never turns a completed config write into a failure. Nothing here
//! retries.

use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use yggcommander_config::ReloadSettings;

use crate::BoxFuture;

/// What happened when the daemon was asked to reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadOutcome {
    pub success: bool,
    pub message: String,
}

impl ReloadOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Something that can ask the daemon to reload.
pub trait Reloader: Send + Sync {
    fn reload(&self) -> BoxFuture<'_, ReloadOutcome>;
}

/// Build the reloader described by the settings.
pub fn reloader_from_settings(settings: &ReloadSettings) -> Box<dyn Reloader> {
    match settings.command.split_first() {
        Some((program, args)) => Box::new(
            CommandReloader::new(program.clone(), args.to_vec())
                .with_timeout(Duration::from_secs(settings.timeout_secs)),
        ),
        None => Box::new(NoopReloader),
    }
}

/// Runs an external command such as `systemctl reload yggdrasil`.
#[derive(Debug, Clone)]
pub struct CommandReloader {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandReloader {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn run(&self) -> ReloadOutcome {
        let child = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let child = match child {
            Ok(child) => child,
            Err(e) => return ReloadOutcome::failed(format!("failed to run {}: {e}", self.program)),
        };

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) if output.status.success() => {
                ReloadOutcome::ok(format!("{} succeeded", self.program))
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                ReloadOutcome::failed(format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                ))
            }
            Ok(Err(e)) => ReloadOutcome::failed(format!("{} wait failed: {e}", self.program)),
            Err(_) => ReloadOutcome::failed(format!(
                "{} timed out after {:?}",
                self.program, self.timeout
            )),
        }
    }
}

impl Reloader for CommandReloader {
    fn reload(&self) -> BoxFuture<'_, ReloadOutcome> {
        Box::pin(async move {
            let outcome = self.run().await;
            if outcome.success {
                info!(program = %self.program, "daemon reload requested");
            } else {
                warn!(program = %self.program, message = %outcome.message, "daemon reload failed");
            }
            outcome
        })
    }
}

/// Used when no reload command is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReloader;

impl Reloader for NoopReloader {
    fn reload(&self) -> BoxFuture<'_, ReloadOutcome> {
        Box::pin(async { ReloadOutcome::ok("reload disabled") })
    }
}
