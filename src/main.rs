//! sfdev - Salesforce CLI operations from the terminal.
//!
//! Runs the same operations the editor bridge exposes and prints their
//! buffers and messages instead of handing them to an editor.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use sfdev_lib::config::{DEFAULT_ORG_ENV, settings_path};
use sfdev_lib::types::{LogListResult, TestClassListResult};
use sfdev_lib::{
    CallContext, Dispatcher, EditorHost, NotifyLevel, ScratchBuffer, SettingsSource, SfClient,
    logging, render,
};

#[derive(Parser)]
#[command(name = "sfdev")]
#[command(about = "Salesforce CLI operations for editors and terminals", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Target org alias or username (overrides the configured default)
    #[arg(long, short = 'o', global = true)]
    org: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List authenticated orgs
    Orgs {
        /// Print the org list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Open an org in the browser
    Open {
        /// Org to open (defaults to --org or the configured default)
        target: Option<String>,
    },

    /// Deploy a source file or directory
    Deploy {
        /// Path to deploy
        path: PathBuf,
    },

    /// Retrieve metadata
    Retrieve {
        /// Metadata entries, comma-separated (e.g. ApexClass:Foo,ApexClass:Bar)
        metadata: String,
    },

    /// Execute anonymous Apex
    Exec {
        /// Apex code; read from --file or stdin when omitted
        code: Option<String>,

        /// File containing Apex code
        #[arg(short, long, conflicts_with = "code")]
        file: Option<PathBuf>,
    },

    /// Run Apex tests
    Test {
        /// Test class or method names, comma-separated (all tests when omitted)
        names: Option<String>,
    },

    /// Manage Apex debug logs
    Logs {
        #[command(subcommand)]
        command: LogCommands,
    },

    /// List Apex test classes
    TestClasses {
        /// Print the raw records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set the CLI's default target org
    Use {
        /// Org alias or username
        target: String,
    },

    /// Log out of an org
    Logout {
        /// Org alias or username
        target: String,
    },

    /// Show or change sfdev settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum LogCommands {
    /// List recent logs
    List {
        /// Maximum number of logs
        #[arg(short, long, default_value_t = sfdev_lib::dialect::DEFAULT_LOG_LIMIT)]
        limit: u32,

        /// Print the raw records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a log
    Get {
        /// Log ID
        id: String,
    },

    /// Delete a log
    Delete {
        /// Log ID
        id: String,
    },

    /// Delete all logs
    Clear,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective settings
    Show,

    /// Store the org used when none is given
    SetDefaultOrg {
        /// Org alias or username
        org: String,
    },

    /// Forget the stored default org
    UnsetDefaultOrg,

    /// Print the settings file path
    Path,
}

/// Prints messages to stderr and buffers to stdout.
#[derive(Default)]
struct TerminalHost {
    failed: AtomicBool,
}

impl EditorHost for TerminalHost {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Info => eprintln!("{message}"),
            NotifyLevel::Success => eprintln!("✓ {message}"),
            NotifyLevel::Error => {
                self.failed.store(true, Ordering::Relaxed);
                eprintln!("✗ {message}");
            }
        }
    }

    fn open_buffer(&self, buffer: ScratchBuffer) {
        for line in buffer.lines {
            println!("{line}");
        }
    }
}

fn read_apex(code: Option<String>, file: Option<PathBuf>) -> Result<String> {
    if let Some(code) = code {
        return Ok(code);
    }
    if let Some(file) = file {
        return std::fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {}", file.display()));
    }
    let mut code = String::new();
    std::io::stdin()
        .read_to_string(&mut code)
        .context("Failed to read Apex code from stdin")?;
    Ok(code)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn config_command(command: ConfigCommands, settings: &SettingsSource) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let current = settings.current();
            println!(
                "default_org: {}",
                current.default_org.as_deref().unwrap_or("(none)")
            );
            if std::env::var_os(DEFAULT_ORG_ENV).is_some() {
                println!("(default_org overridden by {DEFAULT_ORG_ENV})");
            }
        }
        ConfigCommands::SetDefaultOrg { org } => {
            settings
                .set_default_org(Some(org.clone()))
                .map_err(anyhow::Error::msg)?;
            println!("Default org set to {org}");
        }
        ConfigCommands::UnsetDefaultOrg => {
            settings.set_default_org(None).map_err(anyhow::Error::msg)?;
            println!("Default org cleared");
        }
        ConfigCommands::Path => println!("{}", settings_path().display()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    logging::init("warn");
    let cli = Cli::parse();

    let dispatcher = Dispatcher::new(SfClient::system(), SettingsSource::default());
    let host = TerminalHost::default();
    let ctx = CallContext {
        current_file: None,
        target_org: cli.org,
    };
    let call = |operation: &'static str, args: Value| {
        let (dispatcher, host, ctx) = (&dispatcher, &host, &ctx);
        async move {
            dispatcher
                .dispatch(host, operation, args, ctx)
                .await
                .with_context(|| format!("{operation} failed"))
        }
    };

    match cli.command {
        Commands::Orgs { json: true } => {
            let orgs = dispatcher.client().list_orgs().await?;
            print_json(&serde_json::to_value(orgs)?)?;
        }
        Commands::Orgs { json: false } => {
            call("listOrgs", Value::Null).await?;
        }
        Commands::Open { target } => {
            call("openOrg", target.map(Value::String).unwrap_or_default()).await?;
        }
        Commands::Deploy { path } => {
            call("deploy", Value::String(path.to_string_lossy().to_string())).await?;
        }
        Commands::Retrieve { metadata } => {
            call("retrieve", Value::String(metadata)).await?;
        }
        Commands::Exec { code, file } => {
            let code = read_apex(code, file)?;
            call("executeApex", Value::String(code)).await?;
        }
        Commands::Test { names } => {
            call("runTest", names.map(Value::String).unwrap_or_default()).await?;
        }
        Commands::Logs { command } => match command {
            LogCommands::List { limit, json } => {
                let value = call("listLogs", Value::String(limit.to_string())).await?;
                if json {
                    print_json(&value)?;
                } else {
                    let result: LogListResult = serde_json::from_value(value)?;
                    if !result.success {
                        host.notify(NotifyLevel::Error, "Failed to list logs");
                    } else if result.logs.is_empty() {
                        host.notify(NotifyLevel::Info, "No logs found");
                    } else {
                        render::log_table(&result.logs)
                            .iter()
                            .for_each(|line| println!("{line}"));
                    }
                }
            }
            LogCommands::Get { id } => {
                call("getLog", Value::String(id)).await?;
            }
            LogCommands::Delete { id } => {
                call("deleteLog", Value::String(id)).await?;
            }
            LogCommands::Clear => {
                call("clearLogs", Value::Null).await?;
            }
        },
        Commands::TestClasses { json } => {
            let value = call("listTestClasses", Value::Null).await?;
            if json {
                print_json(&value)?;
            } else {
                let result: TestClassListResult = serde_json::from_value(value)?;
                if !result.success {
                    host.notify(NotifyLevel::Error, "Failed to list test classes");
                } else {
                    render::test_class_table(&result.classes)
                        .iter()
                        .for_each(|line| println!("{line}"));
                }
            }
        }
        Commands::Use { target } => {
            call("setDefaultOrg", Value::String(target)).await?;
        }
        Commands::Logout { target } => {
            call("logoutOrg", Value::String(target)).await?;
        }
        Commands::Config { command } => config_command(command, dispatcher.settings())?,
    }

    Ok(if host.failed.load(Ordering::Relaxed) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
