use std::path::PathBuf;

pub const DEFAULT_CONFIG_FILE: &str = "council.yaml";

pub fn default_version() -> u32 {
    1
}

pub fn default_council_models() -> Vec<String> {
    vec![
        "sonnet-4.5".to_string(),
        "gemini-3-pro".to_string(),
        "gpt-5.1".to_string(),
    ]
}

pub fn default_chairman_model() -> String {
    "sonnet-4.5".to_string()
}

pub fn default_timeout_sec() -> u64 {
    120
}

pub fn default_chairman_timeout_sec() -> u64 {
    180
}

pub fn default_status_timeout_sec() -> u64 {
    10
}

pub fn default_cursor_binary() -> PathBuf {
    PathBuf::from("cursor-agent")
}

pub fn default_claude_binary() -> PathBuf {
    // Check common install location first
    if let Some(home) = std::env::var_os("HOME") {
        let local_path = PathBuf::from(home).join(".claude/local/claude");
        if local_path.exists() {
            return local_path;
        }
    }
    PathBuf::from("claude")
}

pub fn default_codex_binary() -> PathBuf {
    PathBuf::from("codex")
}

pub fn default_answer_preview_chars() -> usize {
    500
}

pub fn default_review_preview_chars() -> usize {
    800
}
