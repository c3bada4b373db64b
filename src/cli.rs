//! Salesforce CLI detection and binary resolution.
//!
//! Two binaries speak the same product's commands in different dialects:
//! `sf` (current) and `sfdx` (legacy). [`CliResolver`] probes them in that
//! order once and remembers the answer for the rest of its lifetime.
//!
//! Editors launched from a desktop session don't inherit the user's shell
//! PATH, so the npm/installer locations the CLI lives in are probed as well.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::dialect::{Dialect, LEGACY, MODERN};
use crate::sf_cli::{CommandRunner, SfError};

/// Which Salesforce CLI dialect is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CliKind {
    /// `sf`: nested subcommands (`org list`, `project deploy start`).
    Modern,
    /// `sfdx`: colon-namespaced subcommands (`force:org:list`).
    Legacy,
}

impl CliKind {
    /// Probe order.
    pub const PRIORITY: [CliKind; 2] = [CliKind::Modern, CliKind::Legacy];

    pub fn binary(self) -> &'static str {
        match self {
            Self::Modern => "sf",
            Self::Legacy => "sfdx",
        }
    }

    pub fn dialect(self) -> &'static Dialect {
        match self {
            Self::Modern => &MODERN,
            Self::Legacy => &LEGACY,
        }
    }
}

impl fmt::Display for CliKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Detects the installed CLI once. Later installs or removals are not
/// observed.
#[derive(Debug, Default)]
pub struct CliResolver {
    kind: OnceCell<CliKind>,
}

impl CliResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver that never probes.
    pub fn preset(kind: CliKind) -> Self {
        Self {
            kind: OnceCell::new_with(Some(kind)),
        }
    }

    /// The cached kind, if detection already ran.
    pub fn cached(&self) -> Option<CliKind> {
        self.kind.get().copied()
    }

    pub async fn resolve<R: CommandRunner>(&self, runner: &R) -> Result<CliKind, SfError> {
        self.kind
            .get_or_try_init(|| detect(runner))
            .await
            .copied()
    }
}

async fn detect<R: CommandRunner>(runner: &R) -> Result<CliKind, SfError> {
    for kind in CliKind::PRIORITY {
        if runner.probe(kind.binary()).await {
            info!(cli = %kind, "Salesforce CLI detected");
            return Ok(kind);
        }
        debug!(cli = %kind, "Salesforce CLI probe failed");
    }
    Err(SfError::CliNotFound)
}

// ---------------------------------------------------------------------------
// Binary lookup
// ---------------------------------------------------------------------------

/// Install locations of the Salesforce CLI that may be missing from PATH.
fn extra_bin_dirs() -> &'static [PathBuf] {
    static DIRS: OnceLock<Vec<PathBuf>> = OnceLock::new();
    DIRS.get_or_init(|| {
        let home = dirs::home_dir().unwrap_or_default();
        let mut dirs = Vec::new();

        #[cfg(target_os = "macos")]
        dirs.extend([
            PathBuf::from("/opt/homebrew/bin"),
            PathBuf::from("/usr/local/bin"),
            PathBuf::from("/usr/local/sf/bin"),
        ]);

        #[cfg(target_os = "linux")]
        dirs.extend([
            PathBuf::from("/usr/local/bin"),
            PathBuf::from("/usr/bin"),
            home.join(".local/share/sf/client/bin"),
            home.join(".local/bin"),
        ]);

        #[cfg(not(target_os = "windows"))]
        dirs.extend([home.join(".npm-global/bin"), home.join(".volta/bin")]);

        #[cfg(target_os = "windows")]
        {
            let program_files = std::env::var("ProgramFiles")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("C:\\Program Files"));
            dirs.extend([
                home.join("AppData\\Roaming\\npm"),
                program_files.join("sf\\bin"),
                program_files.join("sfdx\\bin"),
            ]);
        }

        dirs
    })
}

fn candidate_names(name: &str) -> Vec<String> {
    if cfg!(target_os = "windows") {
        vec![format!("{name}.cmd"), format!("{name}.exe")]
    } else {
        vec![name.to_string()]
    }
}

fn lookup_in(dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| candidate_names(name).into_iter().map(move |n| dir.join(n)))
        .find(|candidate| candidate.is_file())
}

/// Resolve a CLI binary name to the path that should be spawned.
///
/// Falls back to the bare name (PATH lookup) when no well-known location has
/// it. Cached per name for the lifetime of the process.
pub(crate) fn resolve_cli(name: &str) -> String {
    static CACHE: OnceLock<parking_lot::Mutex<HashMap<String, String>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| parking_lot::Mutex::new(HashMap::new()));

    if let Some(hit) = cache.lock().get(name) {
        return hit.clone();
    }

    let resolved = lookup_in(extra_bin_dirs(), name)
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());
    debug!(name, resolved = %resolved, "resolved CLI binary");

    cache.lock().insert(name.to_string(), resolved.clone());
    resolved
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
