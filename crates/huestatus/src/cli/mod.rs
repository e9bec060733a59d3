//! CLI subcommands — configuration, bridge management, status application.

mod apply;
mod bridge;
mod config_cmd;
mod watch;

use std::io::Read;
use std::path::PathBuf;

use clap::Subcommand;
use serde::Serialize;
use serde_json::Value;

pub(super) use crate::RUNNING;
pub(super) use huestatus_lib::config::{Config, ValidationError};
pub(super) use huestatus_lib::error::{HueStatusError, Result};
pub(super) use huestatus_lib::monitor::{ApplyReport, GroupReport, Outcome, StatusMonitor};
pub(super) use huestatus_lib::store::{self, FileStore};
pub(super) use huestatus_lib::transport::UreqTransport;

const PADDING: usize = 2;

/// Compute alignment width for a command's key-value output.
/// Leaves at least PADDING spaces after the longest key at either level;
/// indented values line up with top-level ones.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{key:<width$}{value}", width = w);
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

pub(super) fn print_json(value: &impl Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    println!("{text}");
    Ok(())
}

/// One line per group: `bridge/group  color  outcome`.
pub(super) fn print_group_reports(reports: &[GroupReport]) {
    for r in reports {
        let target = format!("{}/{}", r.bridge, r.group);
        let color = r.color.map(|c| c.to_string()).unwrap_or_else(|| "off".into());
        let outcome = match r.outcome {
            Outcome::Applied => "ok",
            Outcome::Rejected => "rejected",
            Outcome::Failed => "FAILED",
        };
        match &r.error {
            Some(e) => println!("  {target:<24}{color:<16}{outcome}: {e}"),
            None => println!("  {target:<24}{color:<16}{outcome}"),
        }
    }
}

// ── Shared context ──

/// Global options every command sees.
pub struct Context {
    pub json: bool,
    pub store: Option<PathBuf>,
}

impl Context {
    pub(super) fn open_store(&self) -> Result<FileStore> {
        match &self.store {
            Some(path) => FileStore::open(path),
            None => FileStore::open_default(),
        }
    }

    /// Open the store and load the configuration it holds.
    pub(super) fn load(&self) -> Result<(FileStore, Config)> {
        let store = self.open_store()?;
        let config = store::load_config(&store)?;
        log::debug!(
            "[store] {}: {} bridges",
            store.path().display(),
            config.bridges().len()
        );
        Ok((store, config))
    }

    pub(super) fn monitor(&self, config: Config) -> StatusMonitor<UreqTransport> {
        StatusMonitor::new(config, UreqTransport::new())
    }
}

/// Read a JSON document from a file, or from stdin when `source` is `-`.
pub(super) fn read_document(source: &str) -> Result<Value> {
    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(source)?
    };
    serde_json::from_str(&text)
        .map_err(|e| HueStatusError::Validation(ValidationError::InvalidJson(e.to_string())))
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct BridgeSummaryJson {
    pub name: String,
    pub address: Option<String>,
    pub paired: bool,
    pub enabled: bool,
    pub groups: usize,
}

#[derive(Serialize)]
pub(super) struct EnableOutput {
    pub bridge: String,
    pub enabled: bool,
}

#[derive(Serialize)]
pub(super) struct DisableOutput {
    pub bridge: String,
    pub groups: Vec<GroupReport>,
}

#[derive(Serialize)]
pub(super) struct UserOutput {
    pub bridge: String,
    pub user: String,
}

// ── Commands ──

#[derive(Subcommand)]
pub enum Command {
    /// Show or replace the whole configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage bridges
    Bridge {
        #[command(subcommand)]
        action: BridgeAction,
    },

    /// Apply one status to every enabled bridge
    Apply {
        /// Status string, e.g. HEALTH_WARN
        status: String,
    },

    /// Apply each status read from stdin (one per line); groups go off at exit
    Watch,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the stored configuration document
    Get,
    /// Replace the configuration with a JSON document
    Set {
        /// Document file, or `-` for stdin
        source: String,
    },
}

#[derive(Subcommand)]
pub enum BridgeAction {
    /// Create or replace one bridge from a JSON definition
    Setup {
        name: String,
        /// Definition file, or `-` for stdin
        source: String,
    },
    /// Enable a bridge (runs a self-test unless forced)
    Enable {
        name: String,
        /// Skip the readiness checks (address and user are still required)
        #[arg(long)]
        force: bool,
    },
    /// Disable a bridge and turn its groups off
    Disable { name: String },
    /// Pair with a bridge (press its link button first) and store the user
    CreateUser { name: String },
    /// Store the user for a bridge
    SetUser { name: String, user: String },
    /// Store the address of a bridge
    SetAddress { name: String, address: String },
    /// List configured bridges
    Ls,
    /// Show one bridge
    Info {
        name: String,
        /// Also list the groups defined on the bridge itself
        #[arg(long)]
        groups: bool,
    },
}

/// Warn if `--json` was passed to a command that doesn't support it.
fn warn_json_unsupported(cmd_name: &str) {
    log::warn!("--json is not supported for `{cmd_name}` (ignored)");
}

pub fn run(cmd: Command, ctx: &Context) -> Result<()> {
    match cmd {
        Command::Config { action } => match action {
            ConfigAction::Get => config_cmd::cmd_config_get(ctx),
            ConfigAction::Set { source } => config_cmd::cmd_config_set(ctx, &source),
        },
        Command::Bridge { action } => match action {
            BridgeAction::Setup { name, source } => bridge::cmd_setup(ctx, &name, &source),
            BridgeAction::Enable { name, force } => bridge::cmd_enable(ctx, &name, force),
            BridgeAction::Disable { name } => bridge::cmd_disable(ctx, &name),
            BridgeAction::CreateUser { name } => bridge::cmd_create_user(ctx, &name),
            BridgeAction::SetUser { name, user } => {
                if ctx.json {
                    warn_json_unsupported("bridge set-user");
                }
                bridge::cmd_set_user(ctx, &name, &user)
            }
            BridgeAction::SetAddress { name, address } => {
                if ctx.json {
                    warn_json_unsupported("bridge set-address");
                }
                bridge::cmd_set_address(ctx, &name, &address)
            }
            BridgeAction::Ls => bridge::cmd_ls(ctx),
            BridgeAction::Info { name, groups } => bridge::cmd_info(ctx, &name, groups),
        },
        Command::Apply { status } => apply::cmd_apply(ctx, &status),
        Command::Watch => watch::cmd_watch(ctx),
    }
}
