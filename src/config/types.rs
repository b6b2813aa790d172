use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::*;

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Models queried in Stage 1 and asked to peer-review in Stage 2.
    /// Their order is the canonical order used for anonymous labels.
    #[serde(default = "default_council_models")]
    pub council_models: Vec<String>,

    /// Model that synthesizes the final answer in Stage 3.
    #[serde(default = "default_chairman_model")]
    pub chairman_model: String,

    #[serde(default)]
    pub provider: Provider,

    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Per-invocation timeout for Stage 1 and Stage 2 queries.
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,

    #[serde(default = "default_chairman_timeout_sec")]
    pub chairman_timeout_sec: u64,

    /// Accept model identifiers outside the provider's known set.
    #[serde(default)]
    pub allow_unknown_models: bool,

    #[serde(default)]
    pub report_dir: Option<PathBuf>,

    #[serde(default)]
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub cursor_agent: CursorAgentConfig,

    #[serde(default)]
    pub claude_cli: ClaudeCliConfig,

    #[serde(default)]
    pub codex_cli: CodexCliConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct CursorAgentConfig {
    #[serde(default = "default_cursor_binary")]
    pub binary: PathBuf,

    #[serde(default = "default_status_timeout_sec")]
    pub status_timeout_sec: u64,
}

impl Default for CursorAgentConfig {
    fn default() -> Self {
        Self {
            binary: default_cursor_binary(),
            status_timeout_sec: default_status_timeout_sec(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ClaudeCliConfig {
    #[serde(default = "default_claude_binary")]
    pub binary: PathBuf,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            binary: default_claude_binary(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct CodexCliConfig {
    #[serde(default = "default_codex_binary")]
    pub binary: PathBuf,
}

impl Default for CodexCliConfig {
    fn default() -> Self {
        Self {
            binary: default_codex_binary(),
        }
    }
}

/// How much of each answer and review the console shows.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct PreviewConfig {
    #[serde(default = "default_answer_preview_chars")]
    pub answer_chars: usize,

    #[serde(default = "default_review_preview_chars")]
    pub review_chars: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            answer_chars: default_answer_preview_chars(),
            review_chars: default_review_preview_chars(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    CursorAgent,
    ClaudeCli,
    CodexCli,
}

impl Provider {
    /// Model identifiers the backend is known to accept.
    pub fn known_models(&self) -> &'static [&'static str] {
        match self {
            Provider::CursorAgent => &[
                "sonnet-4.5",
                "sonnet-4.5-thinking",
                "opus-4.5",
                "opus-4.5-thinking",
                "opus-4.1",
                "gemini-3-pro",
                "gpt-5",
                "gpt-5.1",
                "gpt-5.1-high",
                "grok",
            ],
            Provider::ClaudeCli => &["sonnet", "opus", "haiku"],
            Provider::CodexCli => &["gpt-5", "gpt-5.1", "gpt-5-codex", "gpt-5.1-codex", "o3", "o4-mini"],
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::CursorAgent => write!(f, "cursor_agent"),
            Provider::ClaudeCli => write!(f, "claude_cli"),
            Provider::CodexCli => write!(f, "codex_cli"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "cursor_agent" | "cursor" => Ok(Provider::CursorAgent),
            "claude_cli" | "claude" => Ok(Provider::ClaudeCli),
            "codex_cli" | "codex" => Ok(Provider::CodexCli),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}
