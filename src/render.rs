//! Text rendering of normalized results.

use chrono::DateTime;

use crate::host::{ScratchBuffer, Split};
use crate::types::{ApexLog, ComponentFailure, DeployResult, ExecuteResult, Org, TestClass, TestResult};

const RULE: &str = "─────────────────────────────";

fn scratch(name: Option<String>, filetype: &str, split: Split, lines: Vec<String>) -> ScratchBuffer {
    ScratchBuffer {
        name,
        filetype: filetype.to_string(),
        split,
        lines,
    }
}

/// `None` when there is nothing to show.
pub fn org_list(orgs: &[Org]) -> Option<ScratchBuffer> {
    if orgs.is_empty() {
        return None;
    }
    let mut lines = vec!["# Authenticated Orgs".to_string(), String::new()];
    for org in orgs {
        let alias = org
            .alias
            .as_deref()
            .map(|a| format!("{a} - "))
            .unwrap_or_default();
        let default_marker = if org.is_default_username { " (default)" } else { "" };
        let dev_hub_marker = if org.is_default_dev_hub { " [DevHub]" } else { "" };
        lines.push(format!("{alias}{}{default_marker}{dev_hub_marker}", org.username));
        lines.push(format!("  Org ID: {}", org.org_id));
        lines.push(format!("  Instance: {}", org.instance_url));
        lines.push(String::new());
    }
    Some(scratch(
        Some("[SF Orgs]".to_string()),
        "sfdev-orgs",
        Split::Horizontal,
        lines,
    ))
}

pub fn execute_result(code: &str, result: &ExecuteResult) -> ScratchBuffer {
    let mut lines = vec![
        "=== Apex Execution Result ===".to_string(),
        String::new(),
        "Input Code:".to_string(),
        RULE.to_string(),
    ];
    lines.extend(code.split('\n').map(str::to_string));
    lines.extend([String::new(), "Output:".to_string(), RULE.to_string()]);

    if result.success {
        lines.push("✓ Compiled successfully".to_string());
        lines.push("✓ Executed successfully".to_string());
    } else {
        lines.push("✗ Execution failed".to_string());
        if let Some(problem) = &result.compile_problem {
            lines.extend([String::new(), "Compile Error:".to_string(), problem.clone()]);
            if let Some(line) = result.line.filter(|l| *l != 0) {
                lines.push(format!("Line: {line}, Column: {}", result.column.unwrap_or(0)));
            }
        }
        if let Some(exception) = &result.exception_message {
            lines.extend([String::new(), "Exception:".to_string(), exception.clone()]);
            if let Some(trace) = &result.exception_stack_trace {
                lines.extend([String::new(), "Stack Trace:".to_string(), trace.clone()]);
            }
        }
    }

    if let Some(logs) = result.logs.as_ref().filter(|l| !l.is_empty()) {
        lines.extend([String::new(), "Debug Logs:".to_string(), RULE.to_string()]);
        lines.extend(logs.iter().cloned());
    }

    scratch(None, "apexlog", Split::Vertical, lines)
}

pub fn test_results(result: &TestResult) -> ScratchBuffer {
    let summary = &result.summary;
    let mut lines = vec![
        "# Apex Test Results".to_string(),
        String::new(),
        format!("Outcome: {}", summary.outcome),
        format!("Tests Ran: {}", summary.tests_ran),
        format!("Passing: {}", summary.passing),
        format!("Failing: {}", summary.failing),
        format!("Skipped: {}", summary.skipped),
        String::new(),
    ];

    if let Some(tests) = result.tests.as_ref().filter(|t| !t.is_empty()) {
        lines.extend(["## Test Details".to_string(), String::new()]);
        for test in tests {
            lines.push(format!("{}: {}", test.outcome, test.full_name));
            if let Some(message) = &test.message {
                lines.push(format!("  Message: {message}"));
            }
            if let Some(stack) = &test.stack_trace {
                lines.push(format!("  Stack: {stack}"));
            }
            if let Some(ms) = test.run_time.filter(|ms| *ms != 0) {
                lines.push(format!("  Time: {ms}ms"));
            }
            lines.push(String::new());
        }
    }

    scratch(
        Some("[SF Test Results]".to_string()),
        "sfdev-test-results",
        Split::Horizontal,
        lines,
    )
}

pub fn apex_log(log_id: &str, content: &str) -> ScratchBuffer {
    scratch(
        Some(format!("[ApexLog] {log_id}")),
        "apexlog",
        Split::Horizontal,
        content.split('\n').map(str::to_string).collect(),
    )
}

fn failure_lines(failures: &[ComponentFailure]) -> impl Iterator<Item = String> + '_ {
    failures
        .iter()
        .map(|f| format!("  {}: {}", f.full_name, f.problem))
}

pub fn deploy_failure_message(result: &DeployResult) -> String {
    let mut message = format!("Deploy failed: {}", result.status);
    if let Some(failures) = result.component_failures.as_deref() {
        for line in failure_lines(failures) {
            message.push('\n');
            message.push_str(&line);
        }
    }
    message
}

pub fn test_summary_message(result: &TestResult) -> String {
    if result.success {
        format!(
            "All tests passed ({}/{})",
            result.summary.passing, result.summary.tests_ran
        )
    } else {
        format!("Tests failed ({} failures)", result.summary.failing)
    }
}

// ---------------------------------------------------------------------------
// Terminal tables
// ---------------------------------------------------------------------------

/// `YYYY-MM-DD HH:MM:SS` in the offset the org reported; unparseable values
/// are shown unchanged.
pub fn format_start_time(start_time: &str) -> String {
    DateTime::parse_from_str(start_time, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(start_time))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| start_time.to_string())
}

fn table(header: &[&str], rows: Vec<Vec<String>>) -> Vec<String> {
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let format_row = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_row(header.iter().map(|h| h.to_string()).collect())];
    lines.extend(rows.into_iter().map(format_row));
    lines
}

pub fn log_table(logs: &[ApexLog]) -> Vec<String> {
    let rows = logs
        .iter()
        .map(|log| {
            vec![
                log.id.clone(),
                format_start_time(&log.start_time),
                log.log_user
                    .as_ref()
                    .map(|u| u.name.clone())
                    .unwrap_or_else(|| log.log_user_id.clone()),
                log.operation.clone(),
                log.status.clone(),
                log.log_length.to_string(),
            ]
        })
        .collect();
    table(&["ID", "START", "USER", "OPERATION", "STATUS", "SIZE"], rows)
}

pub fn test_class_table(classes: &[TestClass]) -> Vec<String> {
    let rows = classes
        .iter()
        .map(|class| {
            let name = match class.namespace_prefix.as_deref() {
                Some(ns) if !ns.is_empty() => format!("{ns}.{}", class.name),
                _ => class.name.clone(),
            };
            vec![
                name,
                format!("{:.1}", class.api_version),
                class.status.clone(),
                if class.is_valid { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    table(&["NAME", "API", "STATUS", "VALID"], rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LogUser, TestMethodResult, TestSummary};

    fn org(alias: Option<&str>, default: bool, dev_hub: bool) -> Org {
        Org {
            alias: alias.map(str::to_string),
            username: "admin@example.com".into(),
            org_id: "00D1".into(),
            instance_url: "https://example.my.salesforce.com".into(),
            is_default_username: default,
            is_default_dev_hub: dev_hub,
        }
    }

    #[test]
    fn test_org_list_empty_is_none() {
        assert!(org_list(&[]).is_none());
    }

    #[test]
    fn test_org_list_markers() {
        let buffer = org_list(&[org(Some("prod"), true, true), org(None, false, false)]).unwrap();
        assert_eq!(buffer.name.as_deref(), Some("[SF Orgs]"));
        assert_eq!(buffer.filetype, "sfdev-orgs");
        assert_eq!(
            buffer.lines,
            [
                "# Authenticated Orgs",
                "",
                "prod - admin@example.com (default) [DevHub]",
                "  Org ID: 00D1",
                "  Instance: https://example.my.salesforce.com",
                "",
                "admin@example.com",
                "  Org ID: 00D1",
                "  Instance: https://example.my.salesforce.com",
                "",
            ]
        );
    }

    #[test]
    fn test_execute_result_success() {
        let result = ExecuteResult {
            success: true,
            compiled: true,
            logs: Some(vec!["USER_DEBUG|hi".into()]),
            ..Default::default()
        };
        let buffer = execute_result("System.debug('hi');", &result);
        assert_eq!(buffer.split, Split::Vertical);
        assert_eq!(buffer.filetype, "apexlog");
        assert!(buffer.name.is_none());
        assert!(buffer.lines.contains(&"✓ Executed successfully".to_string()));
        assert_eq!(buffer.lines.last().map(String::as_str), Some("USER_DEBUG|hi"));
    }

    #[test]
    fn test_execute_result_compile_error() {
        let result = ExecuteResult {
            compile_problem: Some("Unexpected token 'x'".into()),
            line: Some(3),
            column: None,
            ..Default::default()
        };
        let lines = execute_result("a\nb", &result).lines;
        assert!(lines.contains(&"✗ Execution failed".to_string()));
        assert!(lines.contains(&"Compile Error:".to_string()));
        assert!(lines.contains(&"Line: 3, Column: 0".to_string()));
        assert!(!lines.contains(&"Debug Logs:".to_string()));
    }

    #[test]
    fn test_execute_result_exception() {
        let result = ExecuteResult {
            compiled: true,
            exception_message: Some("System.NullPointerException".into()),
            exception_stack_trace: Some("AnonymousBlock: line 1".into()),
            ..Default::default()
        };
        let lines = execute_result("x", &result).lines;
        let idx = lines.iter().position(|l| l == "Stack Trace:").unwrap();
        assert_eq!(lines[idx + 1], "AnonymousBlock: line 1");
    }

    #[test]
    fn test_test_results_details() {
        let result = TestResult {
            success: false,
            summary: TestSummary {
                outcome: "Failed".into(),
                tests_ran: 1,
                passing: 0,
                failing: 1,
                skipped: 0,
            },
            tests: Some(vec![TestMethodResult {
                full_name: "FooTest.testA".into(),
                outcome: "Fail".into(),
                message: Some("boom".into()),
                stack_trace: None,
                run_time: Some(15),
            }]),
        };
        let buffer = test_results(&result);
        assert_eq!(buffer.name.as_deref(), Some("[SF Test Results]"));
        assert!(buffer.lines.contains(&"Fail: FooTest.testA".to_string()));
        assert!(buffer.lines.contains(&"  Message: boom".to_string()));
        assert!(buffer.lines.contains(&"  Time: 15ms".to_string()));
        assert_eq!(test_summary_message(&result), "Tests failed (1 failures)");
    }

    #[test]
    fn test_apex_log_keeps_blank_lines() {
        let buffer = apex_log("07L1", "a\n\nb");
        assert_eq!(buffer.name.as_deref(), Some("[ApexLog] 07L1"));
        assert_eq!(buffer.lines, ["a", "", "b"]);
    }

    #[test]
    fn test_deploy_failure_message_lists_components() {
        let mut result = DeployResult::failure("x");
        result.status = "Failed".into();
        result.component_failures = Some(vec![ComponentFailure {
            component_type: "ApexClass".into(),
            full_name: "Foo".into(),
            problem_type: "Error".into(),
            problem: "Bad syntax".into(),
            line_number: None,
            column_number: None,
        }]);
        assert_eq!(deploy_failure_message(&result), "Deploy failed: Failed\n  Foo: Bad syntax");
    }

    #[test]
    fn test_format_start_time() {
        assert_eq!(
            format_start_time("2024-03-01T10:15:30.000+0000"),
            "2024-03-01 10:15:30"
        );
        assert_eq!(format_start_time("yesterday"), "yesterday");
    }

    #[test]
    fn test_log_table_aligns_columns() {
        let logs = vec![ApexLog {
            id: "07L1".into(),
            log_user: Some(LogUser { name: "Ada".into() }),
            operation: "API".into(),
            status: "Success".into(),
            log_length: 10,
            start_time: "2024-03-01T10:15:30.000+0000".into(),
            ..Default::default()
        }];
        let lines = log_table(&logs);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID    START"));
        assert!(lines[1].starts_with("07L1  2024-03-01 10:15:30  Ada"));
    }

    #[test]
    fn test_test_class_table_prefixes_namespace() {
        let classes = vec![TestClass {
            name: "FooTest".into(),
            namespace_prefix: Some("acme".into()),
            api_version: 60.0,
            status: "Active".into(),
            is_valid: true,
            ..Default::default()
        }];
        let lines = test_class_table(&classes);
        assert!(lines[1].starts_with("acme.FooTest  60.0  Active  yes"));
    }
}
