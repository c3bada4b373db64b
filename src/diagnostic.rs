//! Short, user-facing failure text from CLI output.
//!
//! The CLI colors its stderr and, under `--json`, reports errors as a JSON
//! document on stdout instead. Both are reduced to one readable message.

/// Maximum characters of CLI error text shown to the user.
pub(crate) const MAX_DETAIL_CHARS: usize = 512;

/// Remove ANSI escape sequences (colors, cursor movement).
pub(crate) fn strip_ansi(text: &str) -> String {
    lazy_static::lazy_static! {
        static ref ANSI: regex::Regex =
            regex::Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").unwrap();
    }
    ANSI.replace_all(text, "").into_owned()
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_DETAIL_CHARS) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// `message` of a `--json` error document, e.g.
/// `{"status":1,"name":"NoOrgFound","message":"No org configuration found"}`.
fn json_error_message(stdout: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(stdout.trim()).ok()?;
    json.get("message")
        .and_then(|m| m.as_str())
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

/// Pick the most useful failure description from a finished command.
///
/// Preference: cleaned stderr, then the JSON error message on stdout.
/// Empty when neither says anything.
pub(crate) fn failure_detail(stdout: &str, stderr: &str) -> String {
    let stderr = strip_ansi(stderr);
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return truncate(stderr);
    }
    json_error_message(stdout)
        .map(|m| truncate(&strip_ansi(&m)))
        .unwrap_or_default()
}
