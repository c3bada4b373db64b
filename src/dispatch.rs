//! Named operations exposed to editor hosts.
//!
//! Each operation takes the host's loosely-typed argument, reports progress
//! and outcome through [`EditorHost`], and returns either `null` or a
//! structured result. CLI failures end up as host messages; only malformed
//! arguments and unknown operation names are returned as errors.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::client::SfClient;
use crate::config::SettingsSource;
use crate::dialect::DEFAULT_LOG_LIMIT;
use crate::host::{EditorHost, NotifyLevel, parse_arg, parse_non_empty, split_list};
use crate::render;
use crate::sf_cli::{CommandRunner, ProcessRunner, SfError};
use crate::types::{CommandMessage, RawOrgList};

/// Operation names, in the order hosts list them.
pub const OPERATIONS: &[&str] = &[
    "listOrgs",
    "openOrg",
    "deploy",
    "retrieve",
    "executeApex",
    "runTest",
    "listLogs",
    "getLog",
    "deleteLog",
    "clearLogs",
    "listTestClasses",
    "setDefaultOrg",
    "logoutOrg",
    "listOrgsJson",
];

const INVALID_APEX_ARGS: &str =
    "Invalid arguments. Use :SFApexExecute [code] or :SFApexExecute without args to execute buffer";

/// Editor state captured when the call was made.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallContext {
    /// Absolute path of the buffer the call came from.
    pub current_file: Option<String>,
    /// Org chosen for this call, ahead of the configured default.
    pub target_org: Option<String>,
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, SfError> {
    serde_json::to_value(value).map_err(SfError::InvalidJson)
}

fn failed(err: &SfError, extra: Value) -> Value {
    let mut value = json!({"success": false, "error": err.to_string()});
    if let (Some(map), Value::Object(extra)) = (value.as_object_mut(), extra) {
        map.extend(extra);
    }
    value
}

pub struct Dispatcher<R = ProcessRunner> {
    client: SfClient<R>,
    settings: SettingsSource,
}

impl<R: CommandRunner> Dispatcher<R> {
    pub fn new(client: SfClient<R>, settings: SettingsSource) -> Self {
        Self { client, settings }
    }

    pub fn client(&self) -> &SfClient<R> {
        &self.client
    }

    pub fn settings(&self) -> &SettingsSource {
        &self.settings
    }

    /// Org for this call: the context's choice, then the configured default.
    fn target_org(&self, ctx: &CallContext) -> Option<String> {
        ctx.target_org
            .clone()
            .filter(|o| !o.trim().is_empty())
            .or_else(|| self.settings.current().default_org)
    }

    pub async fn dispatch<H: EditorHost>(
        &self,
        host: &H,
        operation: &str,
        args: Value,
        ctx: &CallContext,
    ) -> Result<Value, SfError> {
        debug!(operation, %args, "dispatch");
        match operation {
            "listOrgs" => self.list_orgs(host).await,
            "openOrg" => self.open_org(host, &args, ctx).await,
            "deploy" => self.deploy(host, &args, ctx).await,
            "retrieve" => self.retrieve(host, &args, ctx).await,
            "executeApex" => self.execute_apex(host, &args, ctx).await,
            "runTest" => self.run_test(host, &args, ctx).await,
            "listLogs" => self.list_logs(host, &args, ctx).await,
            "getLog" => self.get_log(host, &args, ctx).await,
            "deleteLog" => self.delete_log(host, &args, ctx).await,
            "clearLogs" => self.clear_logs(host, ctx).await,
            "listTestClasses" => self.list_test_classes(host, ctx).await,
            "setDefaultOrg" => self.set_default_org(host, &args).await,
            "logoutOrg" => self.logout_org(host, &args).await,
            "listOrgsJson" => self.list_orgs_json().await,
            other => Err(SfError::UnknownOperation(other.to_string())),
        }
    }

    async fn list_orgs<H: EditorHost>(&self, host: &H) -> Result<Value, SfError> {
        match self.client.list_orgs().await {
            Ok(orgs) => match render::org_list(&orgs) {
                Some(buffer) => {
                    host.open_buffer(buffer);
                    host.notify(NotifyLevel::Success, "Org list displayed");
                }
                None => host.notify(NotifyLevel::Info, "No authenticated orgs found"),
            },
            Err(e) => host.notify(NotifyLevel::Error, &format!("Failed to list orgs: {e}")),
        }
        Ok(Value::Null)
    }

    async fn open_org<H: EditorHost>(
        &self,
        host: &H,
        args: &Value,
        ctx: &CallContext,
    ) -> Result<Value, SfError> {
        let org = parse_non_empty(args)?.or_else(|| self.target_org(ctx));
        match self.client.open_org(org.as_deref()).await {
            Ok(()) => host.notify(NotifyLevel::Success, "Org opened in browser"),
            Err(e) => host.notify(NotifyLevel::Error, &format!("Failed to open org: {e}")),
        }
        Ok(Value::Null)
    }

    async fn deploy<H: EditorHost>(
        &self,
        host: &H,
        args: &Value,
        ctx: &CallContext,
    ) -> Result<Value, SfError> {
        let path = parse_non_empty(args)?.or_else(|| {
            ctx.current_file
                .clone()
                .filter(|f| !f.trim().is_empty())
        });
        let Some(path) = path else {
            host.notify(NotifyLevel::Error, "No file to deploy");
            return Ok(Value::Null);
        };

        host.notify(NotifyLevel::Info, "Deploying...");
        let org = self.target_org(ctx);
        match self.client.deploy(&path, org.as_deref()).await {
            Ok(result) if result.success => host.notify(
                NotifyLevel::Success,
                &format!("Deploy succeeded: {}", result.status),
            ),
            Ok(result) => host.notify(NotifyLevel::Error, &render::deploy_failure_message(&result)),
            Err(e) => host.notify(NotifyLevel::Error, &format!("Deploy error: {e}")),
        }
        Ok(Value::Null)
    }

    async fn retrieve<H: EditorHost>(
        &self,
        host: &H,
        args: &Value,
        ctx: &CallContext,
    ) -> Result<Value, SfError> {
        let Some(metadata) = parse_non_empty(args)? else {
            host.notify(NotifyLevel::Error, "Please specify metadata to retrieve");
            return Ok(Value::Null);
        };

        host.notify(NotifyLevel::Info, "Retrieving metadata...");
        let org = self.target_org(ctx);
        match self.client.retrieve(&split_list(&metadata), org.as_deref()).await {
            Ok(result) if result.success => host.notify(
                NotifyLevel::Success,
                &format!("Retrieve succeeded: {}", result.status),
            ),
            Ok(result) => host.notify(
                NotifyLevel::Error,
                &format!(
                    "Retrieve failed: {}",
                    result.message.as_deref().unwrap_or(&result.status)
                ),
            ),
            Err(e) => host.notify(NotifyLevel::Error, &format!("Retrieve error: {e}")),
        }
        Ok(Value::Null)
    }

    async fn execute_apex<H: EditorHost>(
        &self,
        host: &H,
        args: &Value,
        ctx: &CallContext,
    ) -> Result<Value, SfError> {
        // The editor passes either the code or the command's word list.
        let code = match args {
            Value::String(code) => code.clone(),
            Value::Array(items) => items
                .first()
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            _ => {
                host.notify(NotifyLevel::Error, INVALID_APEX_ARGS);
                return Ok(Value::Null);
            }
        };
        if code.trim().is_empty() {
            host.notify(NotifyLevel::Error, "No Apex code provided");
            return Ok(Value::Null);
        }

        let line_count = code.split('\n').count();
        host.notify(
            NotifyLevel::Info,
            &format!("Executing {line_count} line(s) of Apex code..."),
        );

        let org = self.target_org(ctx);
        match self.client.execute_apex(&code, org.as_deref()).await {
            Ok(result) => {
                host.open_buffer(render::execute_result(&code, &result));
                if result.success {
                    host.notify(NotifyLevel::Success, "Apex executed successfully");
                } else {
                    host.notify(NotifyLevel::Error, "Apex execution failed");
                }
            }
            Err(e) => host.notify(NotifyLevel::Error, &format!("Execute error: {e}")),
        }
        Ok(Value::Null)
    }

    async fn run_test<H: EditorHost>(
        &self,
        host: &H,
        args: &Value,
        ctx: &CallContext,
    ) -> Result<Value, SfError> {
        let names = parse_non_empty(args)?
            .map(|names| split_list(&names))
            .unwrap_or_default();

        host.notify(NotifyLevel::Info, "Running tests...");
        let org = self.target_org(ctx);
        match self.client.run_tests(&names, org.as_deref()).await {
            Ok(result) => {
                host.open_buffer(render::test_results(&result));
                let level = if result.success {
                    NotifyLevel::Success
                } else {
                    NotifyLevel::Error
                };
                host.notify(level, &render::test_summary_message(&result));
            }
            Err(e) => host.notify(NotifyLevel::Error, &format!("Test error: {e}")),
        }
        Ok(Value::Null)
    }

    async fn list_logs<H: EditorHost>(
        &self,
        host: &H,
        args: &Value,
        ctx: &CallContext,
    ) -> Result<Value, SfError> {
        let limit = match parse_non_empty(args)? {
            Some(limit) => limit.parse().map_err(|_| {
                SfError::InvalidArguments(format!("Invalid log limit: {limit}"))
            })?,
            None => DEFAULT_LOG_LIMIT,
        };
        let org = self.target_org(ctx);
        match self.client.list_logs(org.as_deref(), limit).await {
            Ok(result) => to_json(&result),
            Err(e) => {
                host.notify(NotifyLevel::Error, &format!("Failed to list logs: {e}"));
                Ok(failed(&e, json!({"logs": []})))
            }
        }
    }

    async fn get_log<H: EditorHost>(
        &self,
        host: &H,
        args: &Value,
        ctx: &CallContext,
    ) -> Result<Value, SfError> {
        let Some(log_id) = parse_non_empty(args)? else {
            host.notify(NotifyLevel::Error, "Get log error: No log ID provided");
            return Ok(json!({"success": false, "error": "No log ID provided"}));
        };

        host.notify(NotifyLevel::Info, "Fetching log...");
        let org = self.target_org(ctx);
        match self.client.get_log(&log_id, org.as_deref()).await {
            Ok(result) => {
                if result.success {
                    host.open_buffer(render::apex_log(&log_id, &result.content));
                    host.notify(NotifyLevel::Success, "Log loaded successfully");
                } else {
                    host.notify(
                        NotifyLevel::Error,
                        &format!("Failed to fetch log: {}", result.content),
                    );
                }
                to_json(&result)
            }
            Err(e) => {
                host.notify(NotifyLevel::Error, &format!("Get log error: {e}"));
                Ok(failed(&e, Value::Null))
            }
        }
    }

    async fn delete_log<H: EditorHost>(
        &self,
        host: &H,
        args: &Value,
        ctx: &CallContext,
    ) -> Result<Value, SfError> {
        let Some(log_id) = parse_non_empty(args)? else {
            host.notify(NotifyLevel::Error, "Delete log error: No log ID provided");
            return Ok(json!({"success": false, "error": "No log ID provided"}));
        };

        host.notify(NotifyLevel::Info, "Deleting log...");
        let org = self.target_org(ctx);
        match self.client.delete_log(&log_id, org.as_deref()).await {
            Ok(result) => {
                if result.success {
                    host.notify(
                        NotifyLevel::Success,
                        result.message.as_deref().unwrap_or("Log deleted"),
                    );
                } else {
                    host.notify(
                        NotifyLevel::Error,
                        result.message.as_deref().unwrap_or("Failed to delete log"),
                    );
                }
                to_json(&result)
            }
            Err(e) => {
                host.notify(NotifyLevel::Error, &format!("Delete log error: {e}"));
                Ok(failed(&e, Value::Null))
            }
        }
    }

    async fn clear_logs<H: EditorHost>(
        &self,
        host: &H,
        ctx: &CallContext,
    ) -> Result<Value, SfError> {
        host.notify(NotifyLevel::Info, "Clearing all logs...");
        let org = self.target_org(ctx);
        match self.client.clear_logs(org.as_deref()).await {
            Ok(result) => {
                let message = result
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("Deleted {} logs", result.deleted_count));
                let level = if result.success {
                    NotifyLevel::Success
                } else {
                    NotifyLevel::Error
                };
                host.notify(level, &message);
                to_json(&result)
            }
            Err(e) => {
                host.notify(NotifyLevel::Error, &format!("Clear logs error: {e}"));
                Ok(failed(&e, Value::Null))
            }
        }
    }

    async fn list_test_classes<H: EditorHost>(
        &self,
        host: &H,
        ctx: &CallContext,
    ) -> Result<Value, SfError> {
        let org = self.target_org(ctx);
        match self.client.list_test_classes(org.as_deref()).await {
            Ok(result) => to_json(&result),
            Err(e) => {
                host.notify(
                    NotifyLevel::Error,
                    &format!("Failed to list test classes: {e}"),
                );
                Ok(failed(&e, json!({"classes": []})))
            }
        }
    }

    async fn set_default_org<H: EditorHost>(&self, host: &H, args: &Value) -> Result<Value, SfError> {
        let org = required_org(args)?;
        let result = match self.client.set_default_org(&org).await {
            Ok(result) => result,
            Err(e) => CommandMessage {
                success: false,
                message: format!("Failed to set default org: {e}"),
            },
        };
        report(host, &result);
        to_json(&result)
    }

    async fn logout_org<H: EditorHost>(&self, host: &H, args: &Value) -> Result<Value, SfError> {
        let org = required_org(args)?;
        let result = match self.client.logout_org(&org).await {
            Ok(result) => result,
            Err(e) => CommandMessage {
                success: false,
                message: format!("Failed to logout: {e}"),
            },
        };
        report(host, &result);
        to_json(&result)
    }

    async fn list_orgs_json(&self) -> Result<Value, SfError> {
        let raw = match self.client.list_orgs_raw().await {
            Ok(raw) => raw,
            Err(e) => RawOrgList {
                success: false,
                stdout: String::new(),
                stderr: e.to_string(),
            },
        };
        to_json(&raw)
    }
}

fn required_org(args: &Value) -> Result<String, SfError> {
    parse_arg(args)?
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .ok_or_else(|| SfError::InvalidArguments("No org provided".to_string()))
}

fn report<H: EditorHost>(host: &H, result: &CommandMessage) {
    let level = if result.success {
        NotifyLevel::Success
    } else {
        NotifyLevel::Error
    };
    host.notify(level, &result.message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliKind;
    use crate::config::Settings;
    use crate::host::{ScratchBuffer, Split};
    use crate::testing::FakeRunner;
    use parking_lot::Mutex;
    use serial_test::serial;

    #[derive(Default)]
    struct RecordingHost {
        messages: Mutex<Vec<(NotifyLevel, String)>>,
        buffers: Mutex<Vec<ScratchBuffer>>,
    }

    impl EditorHost for RecordingHost {
        fn notify(&self, level: NotifyLevel, message: &str) {
            self.messages.lock().push((level, message.to_string()));
        }

        fn open_buffer(&self, buffer: ScratchBuffer) {
            self.buffers.lock().push(buffer);
        }
    }

    impl RecordingHost {
        fn last(&self) -> (NotifyLevel, String) {
            self.messages.lock().last().cloned().unwrap()
        }
    }

    fn dispatcher(default_org: Option<&str>) -> Dispatcher<FakeRunner> {
        Dispatcher::new(
            SfClient::with_kind(FakeRunner::modern(), CliKind::Modern),
            SettingsSource::Fixed(Settings {
                default_org: default_org.map(str::to_string),
            }),
        )
    }

    fn ctx() -> CallContext {
        CallContext::default()
    }

    #[test]
    fn test_call_context_from_camel_case() {
        let ctx: CallContext =
            serde_json::from_value(json!({"currentFile": "/p/Foo.cls", "targetOrg": "dev"})).unwrap();
        assert_eq!(ctx.current_file.as_deref(), Some("/p/Foo.cls"));
        assert_eq!(ctx.target_org.as_deref(), Some("dev"));
        let empty: CallContext = serde_json::from_value(json!({})).unwrap();
        assert!(empty.current_file.is_none());
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let host = RecordingHost::default();
        let err = dispatcher(None)
            .dispatch(&host, "frobnicate", Value::Null, &ctx())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unknown operation: frobnicate");
    }

    #[tokio::test]
    async fn test_every_listed_operation_is_routed() {
        let d = dispatcher(None);
        for op in OPERATIONS {
            let host = RecordingHost::default();
            let result = d.dispatch(&host, op, json!(["x"]), &ctx()).await;
            assert!(
                !matches!(result, Err(SfError::UnknownOperation(_))),
                "{op} is not routed"
            );
        }
    }

    #[tokio::test]
    async fn test_list_orgs_opens_buffer() {
        let d = dispatcher(None);
        d.client().runner().push_json(json!({
            "status": 0,
            "result": {"nonScratchOrgs": [{"alias": "dev", "username": "a@example.com", "orgId": "00D1"}]}
        }));
        let host = RecordingHost::default();
        let result = d.dispatch(&host, "listOrgs", Value::Null, &ctx()).await.unwrap();
        assert!(result.is_null());
        let buffers = host.buffers.lock();
        assert_eq!(buffers[0].name.as_deref(), Some("[SF Orgs]"));
        assert_eq!(buffers[0].lines[2], "dev - a@example.com");
        assert_eq!(host.last(), (NotifyLevel::Success, "Org list displayed".into()));
    }

    #[tokio::test]
    async fn test_list_orgs_empty_is_info() {
        let d = dispatcher(None);
        d.client().runner().push_json(json!({"status": 0, "result": {}}));
        let host = RecordingHost::default();
        d.dispatch(&host, "listOrgs", Value::Null, &ctx()).await.unwrap();
        assert!(host.buffers.lock().is_empty());
        assert_eq!(host.last(), (NotifyLevel::Info, "No authenticated orgs found".into()));
    }

    #[tokio::test]
    async fn test_missing_cli_reported_to_host() {
        let d = Dispatcher::new(SfClient::new(FakeRunner::new(&[])), SettingsSource::Fixed(Settings::default()));
        let host = RecordingHost::default();
        d.dispatch(&host, "listOrgs", Value::Null, &ctx()).await.unwrap();
        let (level, message) = host.last();
        assert_eq!(level, NotifyLevel::Error);
        assert_eq!(
            message,
            "Failed to list orgs: Salesforce CLI not found. Please install 'sf' or 'sfdx'."
        );
    }

    #[tokio::test]
    async fn test_deploy_uses_current_file() {
        let d = dispatcher(None);
        d.client()
            .runner()
            .push_json(json!({"status": 0, "result": {"status": "Succeeded"}}));
        let host = RecordingHost::default();
        let ctx = CallContext {
            current_file: Some("/proj/force-app/main/default/classes/Foo.cls".into()),
            target_org: None,
        };
        d.dispatch(&host, "deploy", Value::Null, &ctx).await.unwrap();
        let args = &d.client().runner().calls()[0].args;
        assert_eq!(args[4], "/proj/force-app/main/default/classes/Foo.cls");
        let messages = host.messages.lock();
        assert_eq!(messages[0], (NotifyLevel::Info, "Deploying...".into()));
        assert_eq!(messages[1], (NotifyLevel::Success, "Deploy succeeded: Succeeded".into()));
    }

    #[tokio::test]
    async fn test_deploy_without_file() {
        let d = dispatcher(None);
        let host = RecordingHost::default();
        d.dispatch(&host, "deploy", Value::Null, &ctx()).await.unwrap();
        assert_eq!(host.last(), (NotifyLevel::Error, "No file to deploy".into()));
        assert!(d.client().runner().calls().is_empty());
    }

    #[tokio::test]
    async fn test_deploy_failure_lists_components() {
        let d = dispatcher(None);
        d.client().runner().push_json(json!({
            "status": 1,
            "result": {"status": "Failed", "files": [
                {"state": "Failed", "type": "ApexClass", "fullName": "Foo", "error": "Bad syntax"}
            ]}
        }));
        let host = RecordingHost::default();
        d.dispatch(&host, "deploy", json!("force-app"), &ctx()).await.unwrap();
        assert_eq!(
            host.last(),
            (NotifyLevel::Error, "Deploy failed: Failed\n  Foo: Bad syntax".into())
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_org_precedence() {
        let d = dispatcher(Some("configured"));
        let host = RecordingHost::default();

        d.dispatch(&host, "deploy", json!("force-app"), &ctx()).await.unwrap();
        let with_ctx = CallContext {
            current_file: None,
            target_org: Some("from-context".into()),
        };
        d.dispatch(&host, "deploy", json!("force-app"), &with_ctx).await.unwrap();
        d.dispatch(&host, "openOrg", json!(["explicit"]), &with_ctx).await.unwrap();

        let calls = d.client().runner().calls();
        assert_eq!(calls[0].args.last().map(String::as_str), Some("configured"));
        assert_eq!(calls[1].args.last().map(String::as_str), Some("from-context"));
        assert_eq!(calls[2].args, ["org", "open", "-o", "explicit"]);
    }

    #[tokio::test]
    async fn test_retrieve_requires_metadata() {
        let d = dispatcher(None);
        let host = RecordingHost::default();
        d.dispatch(&host, "retrieve", json!(""), &ctx()).await.unwrap();
        assert_eq!(
            host.last(),
            (NotifyLevel::Error, "Please specify metadata to retrieve".into())
        );
    }

    #[tokio::test]
    async fn test_retrieve_failure_prefers_message() {
        let d = dispatcher(None);
        d.client()
            .runner()
            .push_json(json!({"status": 1, "message": "Entity of type 'ApexClass' named 'Nope' cannot be found"}));
        let host = RecordingHost::default();
        d.dispatch(&host, "retrieve", json!("ApexClass:Nope, ApexClass:Foo"), &ctx())
            .await
            .unwrap();
        assert_eq!(d.client().runner().calls()[0].args[4], "ApexClass:Nope,ApexClass:Foo");
        assert_eq!(
            host.last(),
            (
                NotifyLevel::Error,
                "Retrieve failed: Entity of type 'ApexClass' named 'Nope' cannot be found".into()
            )
        );
    }

    #[tokio::test]
    async fn test_execute_apex_argument_shapes() {
        let d = dispatcher(None);
        let host = RecordingHost::default();
        d.dispatch(&host, "executeApex", json!({"code": "x"}), &ctx()).await.unwrap();
        assert_eq!(host.last(), (NotifyLevel::Error, INVALID_APEX_ARGS.into()));

        d.dispatch(&host, "executeApex", json!(["   "]), &ctx()).await.unwrap();
        assert_eq!(host.last(), (NotifyLevel::Error, "No Apex code provided".into()));
        assert!(d.client().runner().calls().is_empty());
    }

    #[tokio::test]
    async fn test_execute_apex_shows_result_buffer() {
        let d = dispatcher(None);
        d.client().runner().push_json(json!({
            "status": 0,
            "result": {"success": true, "compiled": true, "logs": "USER_DEBUG|1"}
        }));
        let host = RecordingHost::default();
        d.dispatch(&host, "executeApex", json!("Integer a = 1;\nSystem.debug(a);"), &ctx())
            .await
            .unwrap();
        let messages = host.messages.lock();
        assert_eq!(
            messages[0],
            (NotifyLevel::Info, "Executing 2 line(s) of Apex code...".into())
        );
        assert_eq!(messages[1], (NotifyLevel::Success, "Apex executed successfully".into()));
        let buffers = host.buffers.lock();
        assert_eq!(buffers[0].split, Split::Vertical);
        assert_eq!(buffers[0].filetype, "apexlog");
    }

    #[tokio::test]
    async fn test_run_test_summary_message() {
        let d = dispatcher(None);
        d.client().runner().push_json(json!({
            "status": 0,
            "result": {"summary": {"outcome": "Passed", "testsRan": 3, "passing": 3}}
        }));
        let host = RecordingHost::default();
        d.dispatch(&host, "runTest", json!("FooTest, BarTest"), &ctx()).await.unwrap();
        let args = &d.client().runner().calls()[0].args;
        assert!(args.contains(&"FooTest,BarTest".to_string()));
        assert_eq!(host.last(), (NotifyLevel::Success, "All tests passed (3/3)".into()));
        assert_eq!(
            host.buffers.lock()[0].name.as_deref(),
            Some("[SF Test Results]")
        );
    }

    #[tokio::test]
    async fn test_list_logs_returns_structured_result() {
        let d = dispatcher(None);
        d.client()
            .runner()
            .push_json(json!({"status": 0, "result": {"records": [{"Id": "07L1"}]}}));
        let host = RecordingHost::default();
        let value = d.dispatch(&host, "listLogs", Value::Null, &ctx()).await.unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["logs"][0]["Id"], "07L1");
        assert!(d.client().runner().calls()[0].args[3].ends_with("LIMIT 25"));
    }

    #[tokio::test]
    async fn test_list_logs_rejects_bad_limit() {
        let d = dispatcher(None);
        let host = RecordingHost::default();
        let err = d
            .dispatch(&host, "listLogs", json!("many"), &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, SfError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_get_log_opens_named_buffer() {
        let d = dispatcher(None);
        d.client()
            .runner()
            .push_json(json!({"status": 0, "result": {"log": "HEADER\nLINE"}}));
        let host = RecordingHost::default();
        let value = d.dispatch(&host, "getLog", json!(["07L1"]), &ctx()).await.unwrap();
        assert_eq!(value["content"], "HEADER\nLINE");
        assert_eq!(value["logId"], "07L1");
        let buffers = host.buffers.lock();
        assert_eq!(buffers[0].name.as_deref(), Some("[ApexLog] 07L1"));
        assert_eq!(buffers[0].lines, ["HEADER", "LINE"]);
    }

    #[tokio::test]
    async fn test_get_log_without_id() {
        let d = dispatcher(None);
        let host = RecordingHost::default();
        let value = d.dispatch(&host, "getLog", json!([]), &ctx()).await.unwrap();
        assert_eq!(value, json!({"success": false, "error": "No log ID provided"}));
        assert_eq!(
            host.last(),
            (NotifyLevel::Error, "Get log error: No log ID provided".into())
        );
    }

    #[tokio::test]
    async fn test_delete_log_reports_message() {
        let d = dispatcher(None);
        let host = RecordingHost::default();
        let value = d.dispatch(&host, "deleteLog", json!("07L9"), &ctx()).await.unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(
            host.last(),
            (NotifyLevel::Success, "Log 07L9 deleted successfully".into())
        );
    }

    #[tokio::test]
    async fn test_clear_logs_reports_count() {
        let d = dispatcher(None);
        d.client()
            .runner()
            .push_json(json!({"status": 0, "result": {"records": [{"Id": "07L1"}, {"Id": "07L2"}]}}));
        let host = RecordingHost::default();
        let value = d.dispatch(&host, "clearLogs", Value::Null, &ctx()).await.unwrap();
        assert_eq!(value, json!({"success": true, "message": "Deleted 2 logs", "deletedCount": 2}));
        let messages = host.messages.lock();
        assert_eq!(messages[0], (NotifyLevel::Info, "Clearing all logs...".into()));
        assert_eq!(messages[1], (NotifyLevel::Success, "Deleted 2 logs".into()));
    }

    #[tokio::test]
    async fn test_set_default_org_requires_org() {
        let d = dispatcher(None);
        let host = RecordingHost::default();
        let err = d
            .dispatch(&host, "setDefaultOrg", Value::Null, &ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, SfError::InvalidArguments(_)));

        let value = d
            .dispatch(&host, "setDefaultOrg", json!(["dev"]), &ctx())
            .await
            .unwrap();
        assert_eq!(value, json!({"success": true, "message": "Set default org to: dev"}));
        assert_eq!(
            host.last(),
            (NotifyLevel::Success, "Set default org to: dev".into())
        );
    }

    #[tokio::test]
    async fn test_logout_failure_is_reported() {
        let d = dispatcher(None);
        d.client().runner().push_failure("No authorization information found for dev");
        let host = RecordingHost::default();
        let value = d.dispatch(&host, "logoutOrg", json!(["dev"]), &ctx()).await.unwrap();
        assert_eq!(value["success"], false);
        let (level, message) = host.last();
        assert_eq!(level, NotifyLevel::Error);
        assert!(message.starts_with("Failed to logout:"));
    }

    #[tokio::test]
    async fn test_list_orgs_json_without_cli() {
        let d = Dispatcher::new(SfClient::new(FakeRunner::new(&[])), SettingsSource::Fixed(Settings::default()));
        let host = RecordingHost::default();
        let value = d.dispatch(&host, "listOrgsJson", Value::Null, &ctx()).await.unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["stdout"], "");
        assert!(value["stderr"].as_str().unwrap().contains("not found"));
    }
}
