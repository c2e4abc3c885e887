//! Redaction of credentials before they reach the terminal or a log line.

use regex::Regex;
use std::sync::LazyLock;

static API_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:sk-ant-|sk-|hf_)[A-Za-z0-9_\-]{16,}").expect("valid regex"));

static BEARER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[A-Za-z0-9_\-\.]+").expect("valid regex"));

static KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(["']?(?:api_key|apikey|token|secret)["']?\s*[:=]\s*)["']?[A-Za-z0-9_\-\.]{8,}["']?"#)
        .expect("valid regex")
});

/// Replace anything that looks like a credential in `text`.
pub fn redact_secrets(text: &str) -> String {
    let scrubbed = API_KEY.replace_all(text, "[REDACTED]");
    let scrubbed = BEARER.replace_all(&scrubbed, "Bearer [REDACTED]");
    KEY_VALUE.replace_all(&scrubbed, "${1}[REDACTED]").into_owned()
}

/// Show only the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 8 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{tail}")
}
