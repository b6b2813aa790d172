use super::{base_command, finish_output, isolated_workspace, non_empty, spawn_error, Invoker};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;

pub struct ClaudeRunner {
    pub binary: PathBuf,
}

/// `claude --output-format json` wraps the answer in {"result": "...", ...}
#[derive(Deserialize)]
struct ClaudeOutput {
    result: String,
    #[serde(default)]
    is_error: bool,
}

#[async_trait]
impl Invoker for ClaudeRunner {
    fn name(&self) -> &'static str {
        "claude_cli"
    }

    async fn invoke(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let workspace = isolated_workspace()?;

        let mut cmd = base_command(&self.binary, workspace.path());

        // Ensure subscription auth is used (not API key)
        cmd.env_remove("ANTHROPIC_API_KEY");

        cmd.arg("-p")
            .arg(prompt)
            .arg("--model")
            .arg(model)
            .arg("--output-format")
            .arg("json")
            .stdin(Stdio::null());

        let output = cmd
            .output()
            .await
            .map_err(|e| spawn_error(&self.binary, e))?;

        let stdout = finish_output(output)?;
        extract_result(&stdout)
    }
}

fn extract_result(stdout: &str) -> Result<String, ProviderError> {
    match serde_json::from_str::<ClaudeOutput>(stdout) {
        Ok(out) if out.is_error => Err(ProviderError::Backend(out.result)),
        Ok(out) => non_empty(out.result.trim()),
        // Older CLIs print plain text
        Err(_) => non_empty(stdout.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_result_from_json() {
        let raw = r#"{"type":"result","result":"  Four  ","session_id":"abc","is_error":false}"#;
        assert_eq!(extract_result(raw).unwrap(), "Four");
    }

    #[test]
    fn test_extract_result_reports_backend_error() {
        let raw = r#"{"result":"Credit balance too low","is_error":true}"#;
        let err = extract_result(raw).unwrap_err();
        assert!(matches!(err, ProviderError::Backend(msg) if msg == "Credit balance too low"));
    }

    #[test]
    fn test_extract_result_plain_text_fallback() {
        assert_eq!(extract_result("2+2=4").unwrap(), "2+2=4");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_invoke_reads_json_result() {
        use crate::provider::test_support::write_script;

        let dir = tempfile::tempdir().unwrap();
        let bin = write_script(
            dir.path(),
            "claude",
            r#"echo "{\"result\": \"model=$4\", \"is_error\": false}""#,
        );

        let runner = ClaudeRunner { binary: bin };
        assert_eq!(runner.invoke("opus", "hi").await.unwrap(), "model=opus");
    }
}
