//! Scripted `CommandRunner` shared by the module tests.

use std::collections::VecDeque;
use std::io;

use parking_lot::Mutex;
use serde_json::Value;

use crate::sf_cli::{CliOutput, CommandRunner, SfError};

/// One recorded invocation.
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub program: String,
    pub args: Vec<String>,
    /// Contents of the `-f` file at the time of the call, if any.
    pub source_file: Option<String>,
}

enum Scripted {
    Output(CliOutput),
    SpawnError,
}

/// Answers probes for a fixed set of binaries and replays queued outputs.
/// With an empty queue every call succeeds with `{"status":0,"result":{}}`.
pub(crate) struct FakeRunner {
    installed: Vec<&'static str>,
    queue: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<Call>>,
    probes: Mutex<Vec<String>>,
}

pub(crate) fn json_output(value: Value) -> CliOutput {
    let ok = value.get("status").and_then(|s| s.as_i64()).unwrap_or(0) == 0;
    CliOutput {
        stdout: value.to_string(),
        stderr: String::new(),
        success: ok,
        code: Some(if ok { 0 } else { 1 }),
    }
}

impl FakeRunner {
    pub fn new(installed: &[&'static str]) -> Self {
        Self {
            installed: installed.to_vec(),
            queue: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            probes: Mutex::new(Vec::new()),
        }
    }

    /// Runner with only `sf` installed.
    pub fn modern() -> Self {
        Self::new(&["sf"])
    }

    /// Runner with only `sfdx` installed.
    pub fn legacy() -> Self {
        Self::new(&["sfdx"])
    }

    pub fn push(&self, output: CliOutput) -> &Self {
        self.queue.lock().push_back(Scripted::Output(output));
        self
    }

    /// Queue a JSON response; exit status follows the document's `status`.
    pub fn push_json(&self, value: Value) -> &Self {
        self.push(json_output(value))
    }

    /// Queue a failed exit with the given stderr and no stdout.
    pub fn push_failure(&self, stderr: &str) -> &Self {
        self.push(CliOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
            success: false,
            code: Some(1),
        })
    }

    pub fn push_spawn_error(&self) -> &Self {
        self.queue.lock().push_back(Scripted::SpawnError);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().clone()
    }
}

impl CommandRunner for FakeRunner {
    async fn probe(&self, program: &str) -> bool {
        self.probes.lock().push(program.to_string());
        self.installed.contains(&program)
    }

    async fn run(&self, program: &str, args: &[String]) -> Result<CliOutput, SfError> {
        let source_file = args
            .iter()
            .position(|a| a == "-f")
            .and_then(|i| args.get(i + 1))
            .and_then(|path| std::fs::read_to_string(path).ok());
        self.calls.lock().push(Call {
            program: program.to_string(),
            args: args.to_vec(),
            source_file,
        });

        match self.queue.lock().pop_front() {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::SpawnError) => Err(SfError::SpawnFailed {
                program: program.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            }),
            None => Ok(json_output(serde_json::json!({"status": 0, "result": {}}))),
        }
    }
}
