//! Normalized result records handed to the editor.
//!
//! Field names follow what the editor side consumes: camelCase for records
//! this crate builds, and the SOQL PascalCase for records passed through from
//! `data query` (`ApexLog`, `TestClass`).

use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Org {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub username: String,
    pub org_id: String,
    pub instance_url: String,
    pub is_default_username: bool,
    pub is_default_dev_hub: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentFailure {
    pub component_type: String,
    pub full_name: String,
    pub problem_type: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_number: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResult {
    pub success: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_failures: Option<Vec<ComponentFailure>>,
}

impl DeployResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            status: "Error".to_string(),
            id: None,
            message: Some(message.into()),
            component_failures: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveResult {
    pub success: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RetrieveResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            status: "Error".to_string(),
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResult {
    pub success: bool,
    pub compiled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile_problem: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_stack_trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<i64>,
    /// Debug log lines; `None` when the CLI returned no log at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<String>>,
}

impl ExecuteResult {
    pub fn failure(compile_problem: impl Into<String>) -> Self {
        Self {
            compile_problem: Some(compile_problem.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub outcome: String,
    pub tests_ran: u64,
    pub passing: u64,
    pub failing: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMethodResult {
    pub full_name: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_time: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub success: bool,
    pub summary: TestSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests: Option<Vec<TestMethodResult>>,
}

impl TestResult {
    pub fn failure() -> Self {
        Self {
            success: false,
            summary: TestSummary {
                outcome: "Error".to_string(),
                ..Default::default()
            },
            tests: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Query-backed records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogUser {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ApexLog {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub log_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_user: Option<LogUser>,
    #[serde(deserialize_with = "null_as_default")]
    pub application: String,
    #[serde(deserialize_with = "null_as_default")]
    pub duration_milliseconds: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(deserialize_with = "null_as_default")]
    pub log_length: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub operation: String,
    #[serde(deserialize_with = "null_as_default")]
    pub request: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start_time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TestClass {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub namespace_prefix: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub api_version: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub is_valid: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub length_without_comments: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub created_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub last_modified_date: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogListResult {
    pub success: bool,
    pub logs: Vec<ApexLog>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogContentResult {
    pub success: bool,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteLogResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearLogsResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub deleted_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestClassListResult {
    pub success: bool,
    pub classes: Vec<TestClass>,
}

/// Org list passed through for pickers that do their own formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOrgList {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Outcome of a fire-and-report CLI command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub success: bool,
    pub message: String,
}
