//! Salesforce CLI operations.
//!
//! [`SfClient`] resolves the installed CLI, builds the dialect's argv, runs
//! it and normalizes the JSON reply. Apart from the org list and org open,
//! operations never fail on a bad CLI reply: spawn and parse problems come
//! back as a failure record carrying the error text. A missing CLI is always
//! an `Err`.

use std::io::Write;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::cli::{CliKind, CliResolver};
use crate::diagnostic::failure_detail;
use crate::dialect::{self, CLEAR_LOGS_LIMIT};
use crate::normalize;
use crate::sf_cli::{CliOutput, CommandRunner, ProcessRunner, SfError};
use crate::types::{
    ApexLog, ClearLogsResult, CommandMessage, DeleteLogResult, DeployResult, ExecuteResult,
    LogContentResult, LogListResult, Org, RawOrgList, RetrieveResult, TestClass,
    TestClassListResult, TestResult,
};

/// Failure text for an operation whose reply could not be used.
fn failure_text(operation: &str, err: &SfError) -> String {
    match err {
        SfError::InvalidJson(e) => format!("Failed to parse {operation} result: {e}"),
        other => other.to_string(),
    }
}

pub struct SfClient<R = ProcessRunner> {
    runner: R,
    resolver: CliResolver,
}

impl SfClient<ProcessRunner> {
    /// Client that spawns real processes and detects the CLI on first use.
    pub fn system() -> Self {
        Self::new(ProcessRunner)
    }
}

impl<R: CommandRunner> SfClient<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            resolver: CliResolver::new(),
        }
    }

    /// Client with the CLI kind already decided; no probes are made.
    pub fn with_kind(runner: R, kind: CliKind) -> Self {
        Self {
            runner,
            resolver: CliResolver::preset(kind),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub async fn cli_kind(&self) -> Result<CliKind, SfError> {
        self.resolver.resolve(&self.runner).await
    }

    async fn run(&self, kind: CliKind, args: Vec<String>) -> Result<CliOutput, SfError> {
        debug!(cli = %kind, ?args, "running Salesforce CLI");
        self.runner.run(kind.binary(), &args).await
    }

    /// Run and parse stdout regardless of exit status; the CLI reports
    /// failures inside the JSON document.
    async fn invoke_json(&self, kind: CliKind, args: Vec<String>) -> Result<Value, SfError> {
        self.run(kind, args).await?.json()
    }

    /// Run a query-style command that only counts when it exits successfully
    /// with output.
    async fn query_json(&self, kind: CliKind, args: Vec<String>) -> Option<Value> {
        let output = match self.run(kind, args).await {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "query failed to run");
                return None;
            }
        };
        if !output.success || output.stdout.trim().is_empty() {
            warn!(
                code = ?output.code,
                detail = %failure_detail(&output.stdout, &output.stderr),
                "query returned no result"
            );
            return None;
        }
        match output.json() {
            Ok(json) => Some(json),
            Err(e) => {
                warn!(error = %e, "query returned invalid JSON");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Orgs
    // -----------------------------------------------------------------------

    pub async fn list_orgs(&self) -> Result<Vec<Org>, SfError> {
        let kind = self.cli_kind().await?;
        let json = self
            .run(kind, kind.dialect().list_orgs())
            .await?
            .require_success(kind.binary())?
            .json()?;
        Ok(normalize::orgs(kind.dialect(), &json))
    }

    /// Org list reduced to `{"result":{"nonScratchOrgs":[..],"scratchOrgs":[..]}}`
    /// for pickers that format entries themselves.
    pub async fn list_orgs_raw(&self) -> Result<RawOrgList, SfError> {
        let kind = self.cli_kind().await?;
        let outcome = async {
            self.run(kind, kind.dialect().list_orgs())
                .await?
                .require_success(kind.binary())?
                .json()
        }
        .await;

        Ok(match outcome {
            Ok(json) => {
                let result = json.get("result").unwrap_or(&Value::Null);
                let list = |key: &str| result.get(key).cloned().unwrap_or_else(|| json!([]));
                let reduced = json!({
                    "result": {
                        "nonScratchOrgs": list("nonScratchOrgs"),
                        "scratchOrgs": list("scratchOrgs"),
                    }
                });
                RawOrgList {
                    success: true,
                    stdout: reduced.to_string(),
                    stderr: String::new(),
                }
            }
            Err(e) => RawOrgList {
                success: false,
                stdout: String::new(),
                stderr: format!("Failed to list orgs: {e}"),
            },
        })
    }

    pub async fn open_org(&self, target_org: Option<&str>) -> Result<(), SfError> {
        let kind = self.cli_kind().await?;
        self.run(kind, kind.dialect().open_org(target_org))
            .await?
            .require_success(kind.binary())?;
        Ok(())
    }

    pub async fn set_default_org(&self, target_org: &str) -> Result<CommandMessage, SfError> {
        let kind = self.cli_kind().await?;
        let outcome = self.run(kind, dialect::set_default_org(target_org)).await;
        Ok(command_message(
            outcome,
            kind,
            format!("Set default org to: {target_org}"),
            "Failed to set default org",
        ))
    }

    pub async fn logout_org(&self, target_org: &str) -> Result<CommandMessage, SfError> {
        let kind = self.cli_kind().await?;
        let outcome = self.run(kind, dialect::logout(target_org)).await;
        Ok(command_message(
            outcome,
            kind,
            format!("Logged out from: {target_org}"),
            "Failed to logout",
        ))
    }

    // -----------------------------------------------------------------------
    // Source
    // -----------------------------------------------------------------------

    pub async fn deploy(
        &self,
        source_path: &str,
        target_org: Option<&str>,
    ) -> Result<DeployResult, SfError> {
        let kind = self.cli_kind().await?;
        let dialect = kind.dialect();
        Ok(
            match self.invoke_json(kind, dialect.deploy(source_path, target_org)).await {
                Ok(json) => normalize::deploy(dialect, &json),
                Err(e) => DeployResult::failure(failure_text("deploy", &e)),
            },
        )
    }

    pub async fn retrieve(
        &self,
        metadata: &[String],
        target_org: Option<&str>,
    ) -> Result<RetrieveResult, SfError> {
        let kind = self.cli_kind().await?;
        Ok(
            match self.invoke_json(kind, kind.dialect().retrieve(metadata, target_org)).await {
                Ok(json) => normalize::retrieve(&json),
                Err(e) => RetrieveResult::failure(failure_text("retrieve", &e)),
            },
        )
    }

    // -----------------------------------------------------------------------
    // Apex
    // -----------------------------------------------------------------------

    /// Run anonymous Apex. The source goes through a temporary `.apex` file
    /// that is removed before this returns.
    pub async fn execute_apex(
        &self,
        code: &str,
        target_org: Option<&str>,
    ) -> Result<ExecuteResult, SfError> {
        let kind = self.cli_kind().await?;

        let mut file = tempfile::Builder::new()
            .prefix("sfdev-")
            .suffix(".apex")
            .tempfile()
            .map_err(SfError::TempFile)?;
        file.write_all(code.as_bytes()).map_err(SfError::TempFile)?;
        file.flush().map_err(SfError::TempFile)?;
        let source = file.into_temp_path();

        let outcome = self
            .invoke_json(kind, kind.dialect().execute_apex(&source, target_org))
            .await;

        if let Err(e) = source.close() {
            warn!(error = %e, "failed to remove Apex source file");
        }

        Ok(match outcome {
            Ok(json) => normalize::execute(&json),
            Err(e) => ExecuteResult::failure(failure_text("execute", &e)),
        })
    }

    pub async fn run_tests(
        &self,
        test_names: &[String],
        target_org: Option<&str>,
    ) -> Result<TestResult, SfError> {
        let kind = self.cli_kind().await?;
        Ok(
            match self.invoke_json(kind, kind.dialect().run_tests(test_names, target_org)).await {
                Ok(json) => normalize::tests(&json),
                Err(e) => {
                    warn!(error = %e, "test run produced no usable result");
                    TestResult::failure()
                }
            },
        )
    }

    pub async fn list_test_classes(
        &self,
        target_org: Option<&str>,
    ) -> Result<TestClassListResult, SfError> {
        let kind = self.cli_kind().await?;
        let classes = self
            .query_json(kind, dialect::list_test_classes(target_org))
            .await
            .map(|json| normalize::records::<TestClass>(&json));
        Ok(match classes {
            Some(classes) => TestClassListResult {
                success: true,
                classes,
            },
            None => TestClassListResult::default(),
        })
    }

    // -----------------------------------------------------------------------
    // Debug logs
    // -----------------------------------------------------------------------

    pub async fn list_logs(
        &self,
        target_org: Option<&str>,
        limit: u32,
    ) -> Result<LogListResult, SfError> {
        let kind = self.cli_kind().await?;
        let logs = self
            .query_json(kind, dialect::list_logs(limit, target_org))
            .await
            .map(|json| normalize::records::<ApexLog>(&json));
        Ok(match logs {
            Some(logs) => LogListResult {
                success: true,
                logs,
            },
            None => LogListResult::default(),
        })
    }

    pub async fn get_log(
        &self,
        log_id: &str,
        target_org: Option<&str>,
    ) -> Result<LogContentResult, SfError> {
        let kind = self.cli_kind().await?;
        let failed = |content: String| LogContentResult {
            success: false,
            content,
            log_id: Some(log_id.to_string()),
        };

        let output = match self.run(kind, dialect::get_log(log_id, target_org)).await {
            Ok(output) => output,
            Err(e) => return Ok(failed(e.to_string())),
        };
        if !output.success || output.stdout.trim().is_empty() {
            let detail = failure_detail(&output.stdout, &output.stderr);
            return Ok(failed(if detail.is_empty() {
                "Failed to retrieve log".to_string()
            } else {
                detail
            }));
        }

        Ok(match output.json() {
            Ok(json) => LogContentResult {
                success: true,
                content: normalize::log_content(&json),
                log_id: Some(log_id.to_string()),
            },
            Err(e) => failed(e.to_string()),
        })
    }

    pub async fn delete_log(
        &self,
        log_id: &str,
        target_org: Option<&str>,
    ) -> Result<DeleteLogResult, SfError> {
        let kind = self.cli_kind().await?;
        let message = match self.run(kind, dialect::delete_log(log_id, target_org)).await {
            Ok(output) if output.success => {
                return Ok(DeleteLogResult {
                    success: true,
                    message: Some(format!("Log {log_id} deleted successfully")),
                });
            }
            Ok(output) => {
                let detail = failure_detail(&output.stdout, &output.stderr);
                if detail.is_empty() {
                    "Failed to delete log".to_string()
                } else {
                    detail
                }
            }
            Err(e) => e.to_string(),
        };
        Ok(DeleteLogResult {
            success: false,
            message: Some(message),
        })
    }

    /// Delete every log the list query returns (up to [`CLEAR_LOGS_LIMIT`]),
    /// one at a time. Individual failures are skipped, not retried.
    pub async fn clear_logs(&self, target_org: Option<&str>) -> Result<ClearLogsResult, SfError> {
        let listing = self.list_logs(target_org, CLEAR_LOGS_LIMIT).await?;
        if !listing.success {
            warn!("log listing failed; nothing to clear");
            return Ok(ClearLogsResult {
                success: true,
                message: Some("Could not list logs; nothing deleted".to_string()),
                deleted_count: 0,
            });
        }
        let ids: Vec<&str> = listing
            .logs
            .iter()
            .map(|log| log.id.as_str())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Ok(ClearLogsResult {
                success: true,
                message: Some("No logs to delete".to_string()),
                deleted_count: 0,
            });
        }

        let mut deleted_count = 0u32;
        for id in ids {
            let result = self.delete_log(id, target_org).await?;
            if result.success {
                deleted_count += 1;
            } else {
                debug!(log_id = %id, message = ?result.message, "log delete failed");
            }
        }

        Ok(ClearLogsResult {
            success: true,
            message: Some(format!("Deleted {deleted_count} logs")),
            deleted_count,
        })
    }
}

fn command_message(
    outcome: Result<CliOutput, SfError>,
    kind: CliKind,
    success_message: String,
    failure_prefix: &str,
) -> CommandMessage {
    match outcome.and_then(|output| output.require_success(kind.binary())) {
        Ok(_) => CommandMessage {
            success: true,
            message: success_message,
        },
        Err(e) => CommandMessage {
            success: false,
            message: format!("{failure_prefix}: {e}"),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
