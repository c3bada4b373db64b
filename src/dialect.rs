//! Per-dialect command table.
//!
//! `sf` and `sfdx` name the same operations differently, use different org
//! flags and return differently shaped JSON. Everything that varies lives in
//! one [`Dialect`] value per CLI; callers never branch on the CLI kind.

use std::path::Path;

/// How the org list response is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrgListShape {
    /// `nonScratchOrgs` followed by `scratchOrgs`.
    Concatenated,
    /// `nonScratchOrgs`, or `scratchOrgs` when the former is missing.
    FirstPresent,
}

/// Where deploy component failures are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployFailureShape {
    /// `result.details.componentFailures`
    ComponentFailures,
    /// `result.files` entries with `state == "Failed"`
    FailedFiles,
}

/// Subcommands, flags and response field names of one CLI dialect.
#[derive(Debug)]
pub struct Dialect {
    pub org_list: &'static [&'static str],
    pub org_open: &'static [&'static str],
    pub deploy: &'static [&'static str],
    pub deploy_path_flag: &'static str,
    pub retrieve: &'static [&'static str],
    pub apex_execute: &'static [&'static str],
    pub apex_test: &'static [&'static str],
    pub test_names_flag: &'static str,
    pub org_flag: &'static str,
    pub org_list_shape: OrgListShape,
    pub dev_hub_field: &'static str,
    /// Field consulted when `instanceUrl` is missing from an org entry.
    pub instance_url_fallback: Option<&'static str>,
    pub deploy_failures: DeployFailureShape,
}

pub const MODERN: Dialect = Dialect {
    org_list: &["org", "list"],
    org_open: &["org", "open"],
    deploy: &["project", "deploy", "start"],
    deploy_path_flag: "-d",
    retrieve: &["project", "retrieve", "start"],
    apex_execute: &["apex", "run"],
    apex_test: &["apex", "run", "test"],
    test_names_flag: "-t",
    org_flag: "-o",
    org_list_shape: OrgListShape::FirstPresent,
    dev_hub_field: "isDevHubUsername",
    instance_url_fallback: None,
    deploy_failures: DeployFailureShape::FailedFiles,
};

pub const LEGACY: Dialect = Dialect {
    org_list: &["force:org:list"],
    org_open: &["force:org:open"],
    deploy: &["force:source:deploy"],
    deploy_path_flag: "-p",
    retrieve: &["force:source:retrieve"],
    apex_execute: &["force:apex:execute"],
    apex_test: &["force:apex:test:run"],
    test_names_flag: "-n",
    org_flag: "-u",
    org_list_shape: OrgListShape::Concatenated,
    dev_hub_field: "isDevHub",
    instance_url_fallback: Some("loginUrl"),
    deploy_failures: DeployFailureShape::ComponentFailures,
};

/// Row cap used when clearing every log.
pub const CLEAR_LOGS_LIMIT: u32 = 1000;
/// Default row count for the log list.
pub const DEFAULT_LOG_LIMIT: u32 = 25;

const TARGET_ORG_FLAG: &str = "--target-org";

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

fn push_org(args: &mut Vec<String>, flag: &str, target_org: Option<&str>) {
    if let Some(org) = target_org.filter(|o| !o.is_empty()) {
        args.push(flag.to_string());
        args.push(org.to_string());
    }
}

impl Dialect {
    pub fn list_orgs(&self) -> Vec<String> {
        let mut args = argv(self.org_list);
        args.push("--json".into());
        args
    }

    pub fn open_org(&self, target_org: Option<&str>) -> Vec<String> {
        let mut args = argv(self.org_open);
        push_org(&mut args, self.org_flag, target_org);
        args
    }

    pub fn deploy(&self, source_path: &str, target_org: Option<&str>) -> Vec<String> {
        let mut args = argv(self.deploy);
        args.extend([
            self.deploy_path_flag.to_string(),
            source_path.to_string(),
            "--json".to_string(),
        ]);
        push_org(&mut args, self.org_flag, target_org);
        args
    }

    pub fn retrieve(&self, metadata: &[String], target_org: Option<&str>) -> Vec<String> {
        let mut args = argv(self.retrieve);
        args.extend(["-m".to_string(), metadata.join(","), "--json".to_string()]);
        push_org(&mut args, self.org_flag, target_org);
        args
    }

    pub fn execute_apex(&self, source_file: &Path, target_org: Option<&str>) -> Vec<String> {
        let mut args = argv(self.apex_execute);
        args.extend([
            "-f".to_string(),
            source_file.to_string_lossy().to_string(),
            "--json".to_string(),
        ]);
        push_org(&mut args, self.org_flag, target_org);
        args
    }

    pub fn run_tests(&self, test_names: &[String], target_org: Option<&str>) -> Vec<String> {
        let mut args = argv(self.apex_test);
        args.extend(argv(&["--json", "--result-format", "json"]));
        if !test_names.is_empty() {
            args.push(self.test_names_flag.to_string());
            args.push(test_names.join(","));
        }
        push_org(&mut args, self.org_flag, target_org);
        args
    }
}

// ---------------------------------------------------------------------------
// Single-dialect operations
// ---------------------------------------------------------------------------
// Both binaries accept these spellings, so no table lookup is needed.

pub fn list_logs(limit: u32, target_org: Option<&str>) -> Vec<String> {
    let query = format!(
        "SELECT Id, LogUserId, LogUser.Name, Application, DurationMilliseconds, Location, \
         LogLength, Operation, Request, StartTime, Status FROM ApexLog \
         ORDER BY StartTime DESC LIMIT {limit}"
    );
    let mut args = argv(&["data", "query", "--query"]);
    args.push(query);
    args.push("--json".into());
    push_org(&mut args, TARGET_ORG_FLAG, target_org);
    args
}

pub fn get_log(log_id: &str, target_org: Option<&str>) -> Vec<String> {
    let mut args = argv(&["apex", "get", "log", "--log-id", log_id, "--json"]);
    push_org(&mut args, TARGET_ORG_FLAG, target_org);
    args
}

pub fn delete_log(log_id: &str, target_org: Option<&str>) -> Vec<String> {
    let mut args = argv(&[
        "data",
        "delete",
        "record",
        "--sobject",
        "ApexLog",
        "--record-id",
        log_id,
        "--json",
    ]);
    push_org(&mut args, TARGET_ORG_FLAG, target_org);
    args
}

pub fn list_test_classes(target_org: Option<&str>) -> Vec<String> {
    let mut args = argv(&[
        "data",
        "query",
        "--query",
        "SELECT Id, Name, NamespacePrefix, ApiVersion, Status, IsValid, LengthWithoutComments, \
         CreatedDate, LastModifiedDate FROM ApexClass \
         WHERE (Name LIKE '%Test%' OR Name LIKE '%test%') ORDER BY Name ASC",
        "--json",
    ]);
    push_org(&mut args, TARGET_ORG_FLAG, target_org);
    args
}

pub fn set_default_org(target_org: &str) -> Vec<String> {
    argv(&["config", "set", "target-org", target_org])
}

pub fn logout(target_org: &str) -> Vec<String> {
    argv(&["org", "logout", TARGET_ORG_FLAG, target_org, "--no-prompt"])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
