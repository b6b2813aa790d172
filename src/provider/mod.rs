mod claude;
mod codex;
mod cursor;

pub use claude::ClaudeRunner;
pub use codex::CodexRunner;
pub use cursor::CursorAgentRunner;

use crate::config::{Config, Provider};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::process::Command;

const STDERR_EXCERPT_CHARS: usize = 200;

/// Executes one prompt against one named model.
///
/// Implementations must run every call in a fresh, empty working
/// directory and must not touch shared state. Timeouts are applied by the
/// caller; spawned processes are killed when the future is dropped.
#[async_trait]
pub trait Invoker: Send + Sync {
    fn name(&self) -> &'static str;

    async fn invoke(&self, model: &str, prompt: &str) -> Result<String, ProviderError>;

    /// Verify the backend is installed and authenticated.
    async fn check_ready(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Create an invoker for the configured provider
pub fn create_invoker(config: &Config) -> Arc<dyn Invoker> {
    match config.provider {
        Provider::CursorAgent => Arc::new(CursorAgentRunner {
            binary: config.providers.cursor_agent.binary.clone(),
            status_timeout: Duration::from_secs(config.providers.cursor_agent.status_timeout_sec),
        }),
        Provider::ClaudeCli => Arc::new(ClaudeRunner {
            binary: config.providers.claude_cli.binary.clone(),
        }),
        Provider::CodexCli => Arc::new(CodexRunner {
            binary: config.providers.codex_cli.binary.clone(),
        }),
    }
}

/// Empty scratch directory used as the backend's workspace; removed on drop.
fn isolated_workspace() -> Result<TempDir, ProviderError> {
    tempfile::Builder::new()
        .prefix("council-")
        .tempdir()
        .map_err(ProviderError::Io)
}

fn base_command(binary: &Path, workspace: &Path) -> Command {
    // Use string for PATH lookup if not an absolute/relative path
    let binary_str = binary.to_string_lossy();
    let mut cmd = if binary_str.contains('/') || binary_str.contains('\\') {
        Command::new(binary)
    } else {
        Command::new(binary_str.as_ref())
    };
    cmd.current_dir(workspace).kill_on_drop(true);
    cmd
}

fn spawn_error(binary: &Path, err: std::io::Error) -> ProviderError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ProviderError::Unavailable {
            binary: binary.display().to_string(),
            reason: "not found in PATH".to_string(),
        }
    } else {
        ProviderError::Io(err)
    }
}

/// Turn a finished process into its trimmed stdout, or the matching error.
fn finish_output(output: Output) -> Result<String, ProviderError> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProviderError::NonZeroExit {
            code: output.status.code().unwrap_or(-1),
            stderr: excerpt(stderr.trim(), STDERR_EXCERPT_CHARS),
        });
    }
    non_empty(String::from_utf8_lossy(&output.stdout).trim())
}

fn non_empty(text: &str) -> Result<String, ProviderError> {
    if text.is_empty() {
        Err(ProviderError::EmptyOutput)
    } else {
        Ok(text.to_string())
    }
}

fn excerpt(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(all(test, unix))]
pub(crate) mod test_support {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Write an executable shell script standing in for a backend CLI.
    pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_counts_chars() {
        assert_eq!(excerpt("héllo world", 5), "héllo");
        assert_eq!(excerpt("short", 50), "short");
    }

    #[test]
    fn test_non_empty() {
        assert!(matches!(non_empty(""), Err(ProviderError::EmptyOutput)));
        assert_eq!(non_empty("4").unwrap(), "4");
    }

    #[test]
    fn test_spawn_error_not_found_is_unavailable() {
        let err = spawn_error(
            Path::new("cursor-agent"),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(matches!(err, ProviderError::Unavailable { .. }));

        let err = spawn_error(
            Path::new("cursor-agent"),
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, ProviderError::Io(_)));
    }

    #[test]
    fn test_create_invoker_follows_provider() {
        let mut config = Config::default();
        assert_eq!(create_invoker(&config).name(), "cursor_agent");
        config.provider = Provider::ClaudeCli;
        assert_eq!(create_invoker(&config).name(), "claude_cli");
        config.provider = Provider::CodexCli;
        assert_eq!(create_invoker(&config).name(), "codex_cli");
    }
}
