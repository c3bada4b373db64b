pub mod cli;
pub mod client;
pub mod config;
pub(crate) mod diagnostic;
pub mod dialect;
pub mod dispatch;
pub mod host;
pub mod logging;
pub mod normalize;
pub mod render;
pub mod rpc;
pub mod sf_cli;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use cli::{CliKind, CliResolver};
pub use client::SfClient;
pub use config::{Settings, SettingsSource};
pub use dispatch::{CallContext, Dispatcher, OPERATIONS};
pub use host::{EditorHost, NotifyLevel, ScratchBuffer, Split};
pub use sf_cli::{CliOutput, CommandRunner, ProcessRunner, SfError};
