//! Line-delimited JSON-RPC 2.0 over stdio.
//!
//! One request per input line, one frame per output line. Host-side effects
//! of a request (`sfdev/notify`, `sfdev/openBuffer`) are written as
//! notifications before that request's response.

use std::io::{self, Write};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::dispatch::{CallContext, Dispatcher, OPERATIONS};
use crate::host::{EditorHost, NotifyLevel, ScratchBuffer};
use crate::sf_cli::{CommandRunner, SfError};

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Deserialize)]
struct JsonRpcRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    context: CallContext,
}

#[derive(Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Serialize)]
struct JsonRpcNotification<'a, P: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: P,
}

impl JsonRpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, code: i64, message: String) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError { code, message }),
        }
    }
}

fn error_code(err: &SfError) -> i64 {
    match err {
        SfError::UnknownOperation(_) => METHOD_NOT_FOUND,
        SfError::InvalidArguments(_) => INVALID_PARAMS,
        _ => INTERNAL_ERROR,
    }
}

fn error_message(err: &SfError) -> String {
    match err {
        SfError::UnknownOperation(name) => format!("Method not found: {name}"),
        other => other.to_string(),
    }
}

/// Write one frame and flush.
fn send<W: Write, T: Serialize>(out: &Mutex<W>, frame: &T) {
    let line = serde_json::to_string(frame).unwrap_or_else(|e| {
        warn!(error = %e, "failed to serialize frame");
        r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32603,"message":"Internal serialization error"}}"#
            .to_string()
    });
    let mut out = out.lock();
    if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
        warn!(error = %e, "failed to write frame");
    }
}

/// Forwards editor effects to the peer as notifications.
struct RpcHost<'a, W: Write> {
    out: &'a Mutex<W>,
}

impl<W: Write> EditorHost for RpcHost<'_, W> {
    fn notify(&self, level: NotifyLevel, message: &str) {
        send(
            self.out,
            &JsonRpcNotification {
                jsonrpc: "2.0",
                method: "sfdev/notify",
                params: json!({"level": level, "message": message}),
            },
        );
    }

    fn open_buffer(&self, buffer: ScratchBuffer) {
        send(
            self.out,
            &JsonRpcNotification {
                jsonrpc: "2.0",
                method: "sfdev/openBuffer",
                params: buffer,
            },
        );
    }
}

fn server_info() -> Value {
    json!({
        "serverInfo": {
            "name": "sfdev",
            "version": env!("CARGO_PKG_VERSION")
        },
        "operations": OPERATIONS
    })
}

/// Serve requests from `input` until EOF or `shutdown`.
pub async fn serve<R, I, W>(dispatcher: &Dispatcher<R>, input: I, output: W) -> io::Result<()>
where
    R: CommandRunner,
    I: AsyncBufRead + Unpin,
    W: Write,
{
    let out = Mutex::new(output);
    let host = RpcHost { out: &out };
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let frame: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "invalid JSON-RPC line");
                send(
                    &out,
                    &JsonRpcResponse::err(Value::Null, PARSE_ERROR, format!("Parse error: {e}")),
                );
                continue;
            }
        };
        let request = match JsonRpcRequest::deserialize(&frame) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "malformed JSON-RPC request");
                let id = frame.get("id").cloned().unwrap_or(Value::Null);
                send(
                    &out,
                    &JsonRpcResponse::err(id, INVALID_REQUEST, format!("Invalid Request: {e}")),
                );
                continue;
            }
        };

        debug!(method = %request.method, "request");
        let reply = match request.method.as_str() {
            "initialize" => Ok(server_info()),
            "shutdown" => {
                if let Some(id) = request.id {
                    send(&out, &JsonRpcResponse::ok(id, Value::Null));
                }
                break;
            }
            method => {
                dispatcher
                    .dispatch(&host, method, request.params, &request.context)
                    .await
            }
        };

        // Requests without an id are notifications and get no response.
        let Some(id) = request.id else { continue };
        let response = match reply {
            Ok(result) => JsonRpcResponse::ok(id, result),
            Err(e) => JsonRpcResponse::err(id, error_code(&e), error_message(&e)),
        };
        send(&out, &response);
    }

    Ok(())
}
