use super::{base_command, finish_output, isolated_workspace, spawn_error, Invoker};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout as tokio_timeout;
use tracing::{debug, warn};

pub struct CursorAgentRunner {
    pub binary: PathBuf,
    pub status_timeout: Duration,
}

#[async_trait]
impl Invoker for CursorAgentRunner {
    fn name(&self) -> &'static str {
        "cursor_agent"
    }

    async fn invoke(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        // Run from an empty directory so no project files leak into the answer
        let workspace = isolated_workspace()?;

        let mut cmd = base_command(&self.binary, workspace.path());
        cmd.arg("--print")
            .arg("--output-format")
            .arg("text")
            .arg("--model")
            .arg(model)
            .arg("--workspace")
            .arg(workspace.path())
            .arg(prompt)
            .stdin(Stdio::null());

        debug!("cursor-agent {} in {}", model, workspace.path().display());

        let output = cmd
            .output()
            .await
            .map_err(|e| spawn_error(&self.binary, e))?;

        finish_output(output)
    }

    async fn check_ready(&self) -> Result<(), ProviderError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("status").stdin(Stdio::null()).kill_on_drop(true);

        let output = match tokio_timeout(self.status_timeout, cmd.output()).await {
            Err(_) => {
                warn!(
                    "Could not verify cursor-agent status within {:?}, continuing",
                    self.status_timeout
                );
                return Ok(());
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(spawn_error(&self.binary, e));
            }
            Ok(Err(e)) => {
                warn!("Could not verify cursor-agent status: {}, continuing", e);
                return Ok(());
            }
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_lowercase();
        if stdout.contains("not logged in") || stdout.contains("not authenticated") {
            return Err(ProviderError::Unavailable {
                binary: self.binary.display().to_string(),
                reason: "not authenticated, run `cursor-agent login`".to_string(),
            });
        }

        Ok(())
    }
}
