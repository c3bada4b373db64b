//! Editor-side effects and argument handling.
//!
//! Hosts call operations with loosely-typed arguments (a string, an array of
//! command-line words, or nothing) and receive messages and scratch buffers
//! back through [`EditorHost`].

use serde::Serialize;
use serde_json::Value;

use crate::sf_cli::SfError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    #[default]
    Horizontal,
    Vertical,
}

/// A read-only, unlisted buffer filled with rendered lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScratchBuffer {
    /// Buffer name; `None` leaves the split unnamed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub filetype: String,
    pub split: Split,
    pub lines: Vec<String>,
}

/// What an operation can ask of the editor.
pub trait EditorHost {
    fn notify(&self, level: NotifyLevel, message: &str);
    fn open_buffer(&self, buffer: ScratchBuffer);
}

/// Reduce a host argument to an optional string.
///
/// A string is taken as-is, an array yields its first element (non-string
/// scalars are stringified), null yields `None`. Objects are rejected.
pub fn parse_arg(args: &Value) -> Result<Option<String>, SfError> {
    match args {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Array(items) => match items.first() {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(SfError::InvalidArguments(format!(
                "Expected a string argument, got {other}"
            ))),
        },
        other => Err(SfError::InvalidArguments(format!(
            "Expected a string argument, got {other}"
        ))),
    }
}

/// Non-empty argument, trimmed.
pub fn parse_non_empty(args: &Value) -> Result<Option<String>, SfError> {
    Ok(parse_arg(args)?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Split a comma-separated list, dropping empty entries.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_arg_shapes() {
        assert_eq!(parse_arg(&json!("dev")).unwrap().as_deref(), Some("dev"));
        assert_eq!(parse_arg(&json!(["07L1", "extra"])).unwrap().as_deref(), Some("07L1"));
        assert_eq!(parse_arg(&json!([42])).unwrap().as_deref(), Some("42"));
        assert_eq!(parse_arg(&json!([])).unwrap(), None);
        assert_eq!(parse_arg(&Value::Null).unwrap(), None);
    }

    #[test]
    fn test_parse_arg_rejects_objects() {
        assert!(matches!(
            parse_arg(&json!({"org": "dev"})),
            Err(SfError::InvalidArguments(_))
        ));
        assert!(parse_arg(&json!(7)).is_err());
    }

    #[test]
    fn test_parse_non_empty_drops_blank() {
        assert_eq!(parse_non_empty(&json!("  ")).unwrap(), None);
        assert_eq!(parse_non_empty(&json!([" dev "])).unwrap().as_deref(), Some("dev"));
    }

    #[test]
    fn test_split_list_trims() {
        assert_eq!(
            split_list("ApexClass:Foo, ApexClass:Bar ,,"),
            ["ApexClass:Foo", "ApexClass:Bar"]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_scratch_buffer_wire_shape() {
        let buffer = ScratchBuffer {
            name: Some("[SF Orgs]".into()),
            filetype: "sfdev-orgs".into(),
            split: Split::Horizontal,
            lines: vec!["# Authenticated Orgs".into()],
        };
        assert_eq!(
            serde_json::to_value(&buffer).unwrap(),
            json!({
                "name": "[SF Orgs]",
                "filetype": "sfdev-orgs",
                "split": "horizontal",
                "lines": ["# Authenticated Orgs"]
            })
        );
    }
}
