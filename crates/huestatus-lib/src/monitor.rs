//! Status monitor — the serialized path between incoming statuses, the
//! configuration and the per-bridge clients.
//!
//! One lock guards the configuration snapshot and every [`BridgeClient`], so a
//! resolve-then-apply always sees a consistent configuration and config
//! mutations never interleave with device writes. Front ends (CLI commands,
//! the `watch` loop) are thin adapters over this type.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use serde_json::Value;

use crate::client::{self, BridgeClient};
use crate::config::{BridgeConfig, Config, StatusColor, ValidationError};
use crate::error::{HueStatusError, Result};
use crate::resolver::{self, Target};
use crate::transport::Transport;

// ── Reports ──

/// How one group fared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The bridge accepted the write, or the cache showed it was not needed.
    Applied,
    /// The group is unknown to the bridge or the bridge refused the write.
    Rejected,
    /// No usable response, or the bridge could not be used at all.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub bridge: String,
    pub group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<StatusColor>,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GroupReport {
    fn from_result(
        bridge: &str,
        group: &str,
        color: Option<StatusColor>,
        result: client::Result<bool>,
    ) -> Self {
        let (outcome, error) = match result {
            Ok(true) => (Outcome::Applied, None),
            Ok(false) => (Outcome::Rejected, None),
            Err(e) => (Outcome::Failed, Some(e.to_string())),
        };
        GroupReport {
            bridge: bridge.to_string(),
            group: group.to_string(),
            color,
            outcome,
            error,
        }
    }

    fn failed(target: &Target, error: impl Into<String>) -> Self {
        GroupReport {
            bridge: target.bridge.clone(),
            group: target.group.clone(),
            color: Some(target.color),
            outcome: Outcome::Failed,
            error: Some(error.into()),
        }
    }

    pub fn is_applied(&self) -> bool {
        self.outcome == Outcome::Applied
    }
}

/// Result of applying one status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplyReport {
    pub status: String,
    pub groups: Vec<GroupReport>,
}

impl ApplyReport {
    /// No configured group handles the status.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn applied(&self) -> usize {
        self.groups.iter().filter(|g| g.is_applied()).count()
    }

    pub fn all_applied(&self) -> bool {
        self.groups.iter().all(GroupReport::is_applied)
    }
}

// ── Monitor ──

struct MonitorState<T: Transport> {
    config: Config,
    /// Initialized bridges only.
    clients: HashMap<String, BridgeClient<T>>,
}

impl<T: Transport + Clone> MonitorState<T> {
    /// Build and self-test a client for `name`. Returns whether the bridge is
    /// now initialized.
    fn initialize(&mut self, transport: &T, name: &str) -> std::result::Result<bool, String> {
        if self.clients.contains_key(name) {
            return Ok(true);
        }
        let Some(bridge) = self.config.bridge(name) else {
            return Err(format!("bridge '{name}' is not configured"));
        };
        let Some(client) = BridgeClient::from_config(bridge, transport.clone()) else {
            return Err(format!("bridge '{name}' has no address or user"));
        };
        match client.check_user() {
            Ok(true) => {
                log::info!("[bridge] {name}: initialized ({})", client.address());
                self.clients.insert(name.to_string(), client);
                Ok(true)
            }
            Ok(false) => {
                log::warn!("[bridge] {name}: self-test failed, user not authorized");
                Ok(false)
            }
            Err(e) => {
                log::warn!("[bridge] {name}: self-test failed: {e}");
                Err(e.to_string())
            }
        }
    }

    /// Drop clients whose bridge vanished, was disabled or changed credentials.
    fn reconcile(&mut self) {
        let config = &self.config;
        self.clients.retain(|name, client| {
            config.bridge(name).is_some_and(|b| {
                b.enabled
                    && b.address.as_deref() == Some(client.address())
                    && b.user.as_deref() == Some(client.user())
            })
        });
    }

    /// Turn off the groups `bridge` had configured, through its live client or,
    /// for a bridge that was enabled, a fresh one. The client is dropped.
    fn retire(&mut self, transport: &T, bridge: &BridgeConfig) -> Vec<GroupReport> {
        let client = match self.clients.remove(&bridge.name) {
            Some(client) => Some(client),
            None if bridge.enabled => BridgeClient::from_config(bridge, transport.clone()),
            None => None,
        };
        match client {
            Some(mut client) => quiesce(&mut client, &group_names(bridge)),
            None => Vec::new(),
        }
    }

    /// Replace the configuration, turning off every bridge that was enabled
    /// before and is not anymore.
    fn replace_config(&mut self, transport: &T, config: Config) {
        let previous = std::mem::replace(&mut self.config, config);
        for bridge in previous.enabled_bridges() {
            if !self.config.bridge(&bridge.name).is_some_and(|b| b.enabled) {
                log::info!("[bridge] {}: no longer enabled", bridge.name);
                self.retire(transport, bridge);
            }
        }
        self.reconcile();
    }

    fn require_bridge(&self, name: &str) -> Result<&BridgeConfig> {
        self.config.bridge(name).ok_or_else(|| not_found(name))
    }
}

fn not_found(name: &str) -> HueStatusError {
    HueStatusError::NotFound(format!("bridge '{name}'"))
}

/// Turn `groups` off through `client`. Failures are logged, never raised.
fn quiesce<T: Transport>(client: &mut BridgeClient<T>, groups: &[String]) -> Vec<GroupReport> {
    groups
        .iter()
        .map(|group| {
            let result = client.shutdown_group(group);
            let report = GroupReport::from_result(client.name(), group, None, result);
            if !report.is_applied() {
                log::warn!(
                    "[bridge] {}: could not turn '{group}' off{}",
                    client.name(),
                    report
                        .error
                        .as_deref()
                        .map(|e| format!(": {e}"))
                        .unwrap_or_default()
                );
            }
            report
        })
        .collect()
}

fn group_names(bridge: &BridgeConfig) -> Vec<String> {
    bridge.groups.iter().map(|g| g.name.clone()).collect()
}

/// Owns the configuration snapshot and the bridge clients.
pub struct StatusMonitor<T: Transport + Clone> {
    transport: T,
    state: Mutex<MonitorState<T>>,
}

impl<T: Transport + Clone> StatusMonitor<T> {
    /// Create a monitor. No bridge is contacted until [`init_bridges`](Self::init_bridges)
    /// or the first status.
    pub fn new(config: Config, transport: T) -> Self {
        StatusMonitor {
            transport,
            state: Mutex::new(MonitorState {
                config,
                clients: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Self-test every enabled bridge. Returns `(bridge, initialized)` in
    /// configuration order.
    pub fn init_bridges(&self) -> Vec<(String, bool)> {
        let mut state = self.lock();
        let names: Vec<String> = state
            .config
            .enabled_bridges()
            .map(|b| b.name.clone())
            .collect();
        names
            .into_iter()
            .map(|name| {
                let ok = matches!(state.initialize(&self.transport, &name), Ok(true));
                (name, ok)
            })
            .collect()
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Config {
        self.lock().config.clone()
    }

    pub fn is_initialized(&self, name: &str) -> bool {
        self.lock().clients.contains_key(name)
    }

    /// Replace the whole configuration. On error nothing changes.
    ///
    /// Bridges that stop being enabled have their groups turned off.
    pub fn assimilate(&self, document: &Value) -> Result<Config> {
        let mut state = self.lock();
        let mut next = state.config.clone();
        next.assimilate(document)?;
        state.replace_config(&self.transport, next);
        log::info!("[config] loaded {} bridges", state.config.bridges().len());
        Ok(state.config.clone())
    }

    /// Insert or replace one bridge. On error nothing changes.
    pub fn setup_bridge(&self, name: &str, document: &Value) -> Result<BridgeConfig> {
        let mut state = self.lock();
        let mut next = state.config.clone();
        let bridge = next.setup_bridge(name, document)?.clone();
        state.replace_config(&self.transport, next);
        log::info!("[config] bridge '{name}' set up with {} groups", bridge.groups.len());
        Ok(bridge)
    }

    /// Enable a bridge.
    ///
    /// Without `force` the bridge must define a status group and pass the
    /// self-test. `Ok(false)` when refused; an unknown name is an error.
    pub fn enable_bridge(&self, name: &str, force: bool) -> Result<bool> {
        let mut state = self.lock();
        let client = BridgeClient::from_config(state.require_bridge(name)?, self.transport.clone());

        if force {
            if !state.config.enable_bridge(name, true) {
                return Ok(false);
            }
            if let Some(client) = client {
                state.clients.entry(name.to_string()).or_insert(client);
            }
            return Ok(true);
        }

        let mut candidate = state.config.clone();
        if !candidate.enable_bridge(name, false) {
            return Ok(false);
        }
        let Some(client) = client else {
            return Ok(false);
        };
        match client.check_user() {
            Ok(true) => {}
            Ok(false) => {
                log::warn!("[bridge] {name}: not enabled, user not authorized");
                return Ok(false);
            }
            Err(e) => {
                log::warn!("[bridge] {name}: not enabled, self-test failed: {e}");
                return Ok(false);
            }
        }

        state.config = candidate;
        state.clients.insert(name.to_string(), client);
        log::info!("[bridge] {name}: enabled");
        Ok(true)
    }

    /// Disable a bridge and turn its configured groups off.
    pub fn disable_bridge(&self, name: &str) -> Result<Vec<GroupReport>> {
        let mut state = self.lock();
        let bridge = state.require_bridge(name)?.clone();
        state.config.disable_bridge(name);
        log::info!("[bridge] {name}: disabled");
        Ok(state.retire(&self.transport, &bridge))
    }

    pub fn set_user(&self, name: &str, user: &str) -> Result<()> {
        let mut state = self.lock();
        state.config.set_user(name, user)?;
        state.reconcile();
        Ok(())
    }

    pub fn set_address(&self, name: &str, address: &str) -> Result<()> {
        let mut state = self.lock();
        state.config.set_address(name, address)?;
        state.reconcile();
        Ok(())
    }

    /// Pair with a bridge and store the issued user.
    pub fn create_user(&self, name: &str) -> Result<String> {
        let mut state = self.lock();
        let address = state
            .require_bridge(name)?
            .address
            .clone()
            .ok_or_else(|| ValidationError::EmptyValue {
                bridge: name.into(),
                field: "address",
            })?;
        let user = client::create_user(&self.transport, &address)?;
        state.config.set_user(name, &user)?;
        state.reconcile();
        log::info!("[bridge] {name}: paired");
        Ok(user)
    }

    /// Apply `status` to every enabled bridge.
    ///
    /// Targets are processed one after the other; a failure on one never
    /// stops the rest and is reported in its [`GroupReport`].
    pub fn apply_status(&self, status: &str) -> ApplyReport {
        let mut state = self.lock();
        let targets = resolver::resolve(&state.config, status);
        if targets.is_empty() {
            log::debug!("[apply] no group handles '{status}'");
        }

        let mut unusable: HashMap<String, String> = HashMap::new();
        let mut groups = Vec::with_capacity(targets.len());
        for target in &targets {
            if let Some(reason) = unusable.get(&target.bridge) {
                groups.push(GroupReport::failed(target, reason.clone()));
                continue;
            }
            match state.initialize(&self.transport, &target.bridge) {
                Ok(true) => {}
                Ok(false) => {
                    let reason = format!("bridge '{}' failed its self-test", target.bridge);
                    groups.push(GroupReport::failed(target, reason.clone()));
                    unusable.insert(target.bridge.clone(), reason);
                    continue;
                }
                Err(reason) => {
                    groups.push(GroupReport::failed(target, reason.clone()));
                    unusable.insert(target.bridge.clone(), reason);
                    continue;
                }
            }
            let Some(client) = state.clients.get_mut(&target.bridge) else {
                continue;
            };
            let report = GroupReport::from_result(
                &target.bridge,
                &target.group,
                Some(target.color),
                client.set_group_state(&target.group, &target.color),
            );
            if let Some(e) = &report.error {
                log::warn!("[apply] {}/{}: {e}", target.bridge, target.group);
            }
            groups.push(report);
        }

        let report = ApplyReport {
            status: status.to_string(),
            groups,
        };
        log::info!(
            "[apply] '{status}': {}/{} groups applied",
            report.applied(),
            report.groups.len()
        );
        report
    }

    /// Turn off every configured group of every initialized bridge.
    ///
    /// Best effort: failures are logged and reported, never raised.
    pub fn shutdown(&self) -> Vec<GroupReport> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let mut reports = Vec::new();
        for bridge in state.config.bridges() {
            if let Some(client) = state.clients.get_mut(&bridge.name) {
                reports.extend(quiesce(client, &group_names(bridge)));
            }
        }
        let off = reports.iter().filter(|r| r.is_applied()).count();
        log::info!("[apply] shutdown: {off}/{} groups turned off", reports.len());
        reports
    }
}
