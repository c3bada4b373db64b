//! JSON response normalization.
//!
//! The CLI's `--json` output differs by dialect and by operation. These
//! functions read the raw `serde_json::Value` field by field and produce the
//! stable records in [`crate::types`]. Missing fields fall back to the same
//! defaults regardless of which CLI produced the document.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::dialect::{DeployFailureShape, Dialect, OrgListShape};
use crate::types::{
    ComponentFailure, DeployResult, ExecuteResult, Org, RetrieveResult, TestMethodResult,
    TestResult, TestSummary,
};

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Non-empty string field.
fn text(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(|f| f.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// First non-empty string among alternative spellings of a field.
fn text_any(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| text(v, k))
}

fn flag(v: &Value, key: &str) -> bool {
    v.get(key).and_then(|f| f.as_bool()).unwrap_or(false)
}

/// Integer field given either as a JSON number or a numeric string.
fn int(v: &Value, key: &str) -> Option<i64> {
    match v.get(key)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn count(v: &Value, key: &str) -> u64 {
    int(v, key).and_then(|n| u64::try_from(n).ok()).unwrap_or(0)
}

fn array<'a>(v: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    v.get(key).and_then(|f| f.as_array())
}

/// The `result` object of a CLI response, or `Null`.
fn result(json: &Value) -> &Value {
    json.get("result").unwrap_or(&Value::Null)
}

fn status_ok(json: &Value) -> bool {
    json.get("status").and_then(|s| s.as_i64()) == Some(0)
}

fn result_status(json: &Value) -> String {
    text(result(json), "status").unwrap_or_else(|| "Unknown".to_string())
}

// ---------------------------------------------------------------------------
// Orgs
// ---------------------------------------------------------------------------

/// Org entries of an org list response, in display order.
pub fn org_entries<'a>(dialect: &Dialect, json: &'a Value) -> Vec<&'a Value> {
    let result = result(json);
    let non_scratch = array(result, "nonScratchOrgs");
    let scratch = array(result, "scratchOrgs");

    match dialect.org_list_shape {
        OrgListShape::Concatenated => non_scratch
            .into_iter()
            .chain(scratch)
            .flatten()
            .collect(),
        OrgListShape::FirstPresent => non_scratch
            .or(scratch)
            .map(|orgs| orgs.iter().collect())
            .unwrap_or_default(),
    }
}

fn org(dialect: &Dialect, entry: &Value) -> Org {
    let instance_url = text(entry, "instanceUrl")
        .or_else(|| dialect.instance_url_fallback.and_then(|k| text(entry, k)))
        .unwrap_or_default();
    Org {
        alias: text(entry, "alias"),
        username: text(entry, "username").unwrap_or_default(),
        org_id: text(entry, "orgId").unwrap_or_default(),
        instance_url,
        is_default_username: flag(entry, "isDefaultUsername"),
        is_default_dev_hub: flag(entry, dialect.dev_hub_field),
    }
}

pub fn orgs(dialect: &Dialect, json: &Value) -> Vec<Org> {
    org_entries(dialect, json)
        .into_iter()
        .map(|entry| org(dialect, entry))
        .collect()
}

// ---------------------------------------------------------------------------
// Deploy / retrieve
// ---------------------------------------------------------------------------

fn legacy_failure(f: &Value) -> ComponentFailure {
    ComponentFailure {
        component_type: text(f, "componentType").unwrap_or_default(),
        full_name: text(f, "fullName").unwrap_or_default(),
        problem_type: text(f, "problemType").unwrap_or_default(),
        problem: text(f, "problem").unwrap_or_default(),
        line_number: int(f, "lineNumber").and_then(|n| u32::try_from(n).ok()),
        column_number: int(f, "columnNumber").and_then(|n| u32::try_from(n).ok()),
    }
}

fn failed_file(f: &Value) -> ComponentFailure {
    ComponentFailure {
        component_type: text(f, "type").unwrap_or_default(),
        full_name: text(f, "fullName").unwrap_or_default(),
        problem_type: "Error".to_string(),
        problem: text(f, "error").unwrap_or_else(|| "Unknown error".to_string()),
        line_number: None,
        column_number: None,
    }
}

fn component_failures(dialect: &Dialect, json: &Value) -> Option<Vec<ComponentFailure>> {
    let result = result(json);
    match dialect.deploy_failures {
        DeployFailureShape::ComponentFailures => result
            .get("details")
            .and_then(|d| d.get("componentFailures"))
            .map(|failures| match failures {
                // A single failure is reported as an object, not a one-element array.
                Value::Array(items) => items.iter().map(legacy_failure).collect(),
                single => vec![legacy_failure(single)],
            }),
        DeployFailureShape::FailedFiles => array(result, "files").map(|files| {
            files
                .iter()
                .filter(|f| f.get("state").and_then(|s| s.as_str()) == Some("Failed"))
                .map(failed_file)
                .collect()
        }),
    }
}

/// `success` reflects only the top-level `status`; component failures are
/// reported alongside it.
pub fn deploy(dialect: &Dialect, json: &Value) -> DeployResult {
    DeployResult {
        success: status_ok(json),
        status: result_status(json),
        id: text(result(json), "id"),
        message: text(json, "message"),
        component_failures: component_failures(dialect, json),
    }
}

pub fn retrieve(json: &Value) -> RetrieveResult {
    RetrieveResult {
        success: status_ok(json),
        status: result_status(json),
        message: text(json, "message"),
    }
}

// ---------------------------------------------------------------------------
// Anonymous Apex
// ---------------------------------------------------------------------------

/// Split a debug log into its non-blank lines.
pub fn log_lines(log: &str) -> Vec<String> {
    log.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

pub fn execute(json: &Value) -> ExecuteResult {
    let result = result(json);
    let logs = result
        .get("logs")
        .and_then(|l| l.as_str())
        .map(log_lines)
        .filter(|lines| !lines.is_empty());

    ExecuteResult {
        success: flag(result, "success"),
        compiled: flag(result, "compiled"),
        compile_problem: text(result, "compileProblem"),
        exception_message: text(result, "exceptionMessage"),
        exception_stack_trace: text(result, "exceptionStackTrace"),
        line: int(result, "line"),
        column: int(result, "column"),
        logs,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

fn test_method(t: &Value) -> TestMethodResult {
    TestMethodResult {
        full_name: text_any(t, &["fullName", "FullName"]).unwrap_or_default(),
        outcome: text_any(t, &["outcome", "Outcome"]).unwrap_or_default(),
        message: text_any(t, &["message", "Message"]),
        stack_trace: text_any(t, &["stackTrace", "StackTrace"]),
        run_time: int(t, "runTime")
            .filter(|n| *n != 0)
            .or_else(|| int(t, "RunTime"))
            .and_then(|n| u64::try_from(n).ok()),
    }
}

pub fn tests(json: &Value) -> TestResult {
    let result = result(json);
    let summary = result.get("summary").unwrap_or(&Value::Null);
    let outcome = text(summary, "outcome").unwrap_or_else(|| "Unknown".to_string());

    TestResult {
        success: outcome == "Passed",
        summary: TestSummary {
            tests_ran: count(summary, "testsRan"),
            passing: count(summary, "passing"),
            failing: count(summary, "failing"),
            skipped: count(summary, "skipped"),
            outcome,
        },
        tests: array(result, "tests").map(|items| items.iter().map(test_method).collect()),
    }
}

// ---------------------------------------------------------------------------
// Logs and queries
// ---------------------------------------------------------------------------

/// Body of an `apex get log` response.
///
/// The CLI has returned the log as a bare string, a list of strings, a list
/// of `{log}` objects and a single `{log}` object across versions. Anything
/// else is shown as pretty-printed JSON.
pub fn log_content(json: &Value) -> String {
    let pretty = |v: &Value| serde_json::to_string_pretty(v).unwrap_or_default();
    let log_field = |v: &Value| v.get("log").and_then(|l| l.as_str()).map(str::to_string);

    match result(json) {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) if !items.is_empty() => match &items[0] {
            Value::String(s) => s.clone(),
            first => log_field(first).unwrap_or_else(|| pretty(result(json))),
        },
        other => log_field(other).unwrap_or_else(|| pretty(other)),
    }
}

/// `result.records` of a `data query` response. Records that don't fit `T`
/// are dropped one by one; the rest of the listing survives.
pub fn records<T: DeserializeOwned>(json: &Value) -> Vec<T> {
    array(result(json), "records")
        .into_iter()
        .flatten()
        .filter_map(|record| match T::deserialize(record) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(error = %e, record = %record, "skipping unexpected query record");
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
