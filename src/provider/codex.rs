use super::{base_command, finish_output, isolated_workspace, non_empty, spawn_error, Invoker};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

pub struct CodexRunner {
    pub binary: PathBuf,
}

#[async_trait]
impl Invoker for CodexRunner {
    fn name(&self) -> &'static str {
        "codex_cli"
    }

    async fn invoke(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let workspace = isolated_workspace()?;

        // Capture final assistant message to a file outside the workspace
        let last_message = NamedTempFile::new().map_err(ProviderError::Io)?;

        let mut cmd = base_command(&self.binary, workspace.path());
        cmd.arg("exec")
            .arg("--model")
            .arg(model)
            .arg("--skip-git-repo-check")
            .arg("--output-last-message")
            .arg(last_message.path())
            // Read prompt from stdin
            .arg("-");

        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| spawn_error(&self.binary, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(ProviderError::Io)?;
            stdin.shutdown().await.map_err(ProviderError::Io)?;
        }

        let output = child.wait_with_output().await.map_err(ProviderError::Io)?;
        let stdout = finish_output_allow_empty(output)?;

        let message = tokio::fs::read_to_string(last_message.path())
            .await
            .unwrap_or_default();
        if message.trim().is_empty() {
            // Fall back to whatever the CLI printed
            non_empty(stdout.trim())
        } else {
            non_empty(message.trim())
        }
    }
}

/// Codex may print nothing on stdout when the message goes to the file.
fn finish_output_allow_empty(output: std::process::Output) -> Result<String, ProviderError> {
    match finish_output(output) {
        Err(ProviderError::EmptyOutput) => Ok(String::new()),
        other => other,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::provider::test_support::write_script;

    #[tokio::test]
    async fn test_invoke_reads_last_message_file() {
        let dir = tempfile::tempdir().unwrap();
        // $6 is the --output-last-message path; prompt arrives on stdin
        let bin = write_script(
            dir.path(),
            "codex",
            r#"prompt=$(cat)
echo "answer to: $prompt" > "$6""#,
        );

        let runner = CodexRunner { binary: bin };
        let out = runner.invoke("gpt-5", "What is 2+2?").await.unwrap();
        assert_eq!(out, "answer to: What is 2+2?");
    }

    #[tokio::test]
    async fn test_invoke_falls_back_to_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let bin = write_script(dir.path(), "codex", "cat >/dev/null\necho Four");

        let runner = CodexRunner { binary: bin };
        assert_eq!(runner.invoke("gpt-5", "q").await.unwrap(), "Four");
    }
}
