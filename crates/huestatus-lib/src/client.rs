//! Per-bridge protocol client — pairing, group enumeration, group state updates.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};

use crate::cache::GroupStateCache;
use crate::config::{BridgeConfig, StatusColor};
use crate::protocol::{
    self, ApiError, DEVICE_TYPE, ErrorCode, GROUP_SET, GROUPS_GET, GroupAction, Method,
    USER_CHECK, USER_CREATE, UrlParams, matches_error,
};
use crate::transport::Transport;

// ── Error type ──

/// Bridge communication errors.
#[derive(Debug, Clone)]
pub enum BridgeError {
    /// No response, or a response other than HTTP 200.
    Transport(String),
    /// Action name missing from the endpoint table.
    UnknownEndpoint(String),
    /// Authenticated action requested without a paired user.
    MissingCredential(String),
    /// Pairing refused until the button on the bridge is pressed.
    LinkButtonNotPressed,
    /// Any other application error reported by the bridge.
    Device(ApiError),
    /// The bridge answered with something the protocol does not allow.
    Internal(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::Transport(e) => write!(f, "Bridge request failed: {e}"),
            BridgeError::UnknownEndpoint(a) => write!(f, "Unknown bridge endpoint '{a}'"),
            BridgeError::MissingCredential(a) => {
                write!(f, "Endpoint '{a}' requires a paired user, but none is configured")
            }
            BridgeError::LinkButtonNotPressed => {
                write!(f, "bridge's physical link button was not pressed")
            }
            BridgeError::Device(e) => {
                write!(f, "unexpected device error (code {})", e.code)?;
                if !e.description.is_empty() {
                    write!(f, ": {}", e.description)?;
                }
                Ok(())
            }
            BridgeError::Internal(e) => write!(f, "Bridge protocol violation: {e}"),
        }
    }
}

impl std::error::Error for BridgeError {}

pub type Result<T> = std::result::Result<T, BridgeError>;

// ── Requests ──

/// Send a request and split the reply into body and embedded application errors.
///
/// Anything but HTTP 200 with a JSON body is a [`BridgeError::Transport`].
/// There is no retry.
pub fn execute<T: Transport + ?Sized>(
    transport: &T,
    url: &str,
    method: Method,
    body: Option<&Value>,
) -> Result<(Value, Vec<ApiError>)> {
    let response = transport.send(method, url, body)?;
    if response.status != 200 {
        return Err(BridgeError::Transport(format!(
            "{method} {url}: HTTP {}",
            response.status
        )));
    }
    let json: Value = serde_json::from_str(&response.body)
        .map_err(|e| BridgeError::Transport(format!("{method} {url}: invalid JSON body: {e}")))?;
    let errors = protocol::extract_errors(&json);
    Ok((json, errors))
}

/// Pair with the bridge at `address` and return the issued user.
///
/// The bridge only accepts this within 30 seconds of its link button being
/// pressed; otherwise it answers with a single `LINK_BUTTON_NOT_PRESSED` error.
pub fn create_user<T: Transport + ?Sized>(transport: &T, address: &str) -> Result<String> {
    let (url, method) = protocol::build_url(
        USER_CREATE,
        &UrlParams {
            address,
            ..UrlParams::default()
        },
    )?;
    let payload = json!({ "devicetype": DEVICE_TYPE });
    let (body, errors) = execute(transport, &url, method, Some(&payload))?;

    if let Some(first) = errors.first() {
        if errors.len() == 1 && matches_error(first, ErrorCode::LinkButtonNotPressed) {
            return Err(BridgeError::LinkButtonNotPressed);
        }
        return Err(BridgeError::Device(first.clone()));
    }

    success_username(&body)
        .ok_or_else(|| BridgeError::Internal(format!("no username in pairing response: {body}")))
}

fn success_username(body: &Value) -> Option<String> {
    let entries = match body {
        Value::Array(list) => list.as_slice(),
        other => std::slice::from_ref(other),
    };
    entries.iter().find_map(|entry| {
        entry
            .get("success")?
            .get("username")?
            .as_str()
            .map(str::to_string)
    })
}

// ── Groups ──

/// A group as enumerated on the bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupInfo {
    pub id: String,
    pub name: String,
    pub lights: Vec<String>,
    #[serde(skip)]
    pub raw: Value,
}

impl GroupInfo {
    fn from_entry(id: &str, raw: &Value) -> Option<Self> {
        let name = raw.get("name")?.as_str()?.to_string();
        let lights = raw
            .get("lights")
            .and_then(Value::as_array)
            .map(|l| {
                l.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Some(GroupInfo {
            id: id.to_string(),
            name,
            lights,
            raw: raw.clone(),
        })
    }
}

/// Sort key for group ids: numeric ids by value, then any others as text.
fn id_order(id: &str) -> (bool, u32, &str) {
    match id.parse::<u32>() {
        Ok(n) => (false, n, id),
        Err(_) => (true, 0, id),
    }
}

// ── Client ──

/// Protocol client for one bridge. Owns that bridge's [`GroupStateCache`].
#[derive(Debug)]
pub struct BridgeClient<T: Transport> {
    name: String,
    address: String,
    user: String,
    transport: T,
    cache: GroupStateCache,
}

impl<T: Transport> BridgeClient<T> {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        user: impl Into<String>,
        transport: T,
    ) -> Self {
        BridgeClient {
            name: name.into(),
            address: address.into(),
            user: user.into(),
            transport,
            cache: GroupStateCache::new(),
        }
    }

    /// Build a client for a configured bridge. `None` without address or user.
    pub fn from_config(bridge: &BridgeConfig, transport: T) -> Option<Self> {
        match (&bridge.address, &bridge.user) {
            (Some(address), Some(user)) if !address.is_empty() && !user.is_empty() => {
                Some(Self::new(&bridge.name, address, user, transport))
            }
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn cache(&self) -> &GroupStateCache {
        &self.cache
    }

    pub fn build_url(&self, action: &str, group_id: Option<&str>) -> Result<(String, Method)> {
        protocol::build_url(
            action,
            &UrlParams {
                address: &self.address,
                user: Some(&self.user),
                group_id,
            },
        )
    }

    pub fn execute(
        &self,
        url: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<(Value, Vec<ApiError>)> {
        execute(&self.transport, url, method, body)
    }

    /// Self-test: does the bridge accept our user?
    ///
    /// `Ok(false)` when the bridge reports the user as unauthorized.
    pub fn check_user(&self) -> Result<bool> {
        let (url, method) = self.build_url(USER_CHECK, None)?;
        let (_, errors) = self.execute(&url, method, None)?;
        match errors.first() {
            None => Ok(true),
            Some(e) if matches_error(e, ErrorCode::UnauthorizedUser) => {
                log::info!("[bridge] {}: user is not authorized", self.name);
                Ok(false)
            }
            Some(e) => Err(BridgeError::Device(e.clone())),
        }
    }

    /// Enumerate groups on the bridge, keyed by group id.
    ///
    /// An application error yields an empty map: nothing is known yet.
    pub fn list_groups(&self) -> Result<BTreeMap<String, GroupInfo>> {
        let (url, method) = self.build_url(GROUPS_GET, None)?;
        let (body, errors) = self.execute(&url, method, None)?;
        if !errors.is_empty() {
            log::warn!(
                "[bridge] {}: unable to list groups: {}",
                self.name,
                errors[0]
            );
            return Ok(BTreeMap::new());
        }
        let Some(entries) = body.as_object() else {
            return Ok(BTreeMap::new());
        };
        Ok(entries
            .iter()
            .filter_map(|(id, raw)| GroupInfo::from_entry(id, raw))
            .map(|g| (g.id.clone(), g))
            .collect())
    }

    /// Id of the first bridge group named `name`, if any.
    ///
    /// Numeric ids are compared as numbers, so `"2"` comes before `"10"`.
    pub fn group_id_for(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .list_groups()?
            .into_values()
            .filter(|g| g.name == name)
            .min_by(|a, b| id_order(&a.id).cmp(&id_order(&b.id)))
            .map(|g| g.id))
    }

    /// Show `color` on `group`.
    ///
    /// Returns `Ok(true)` without a request when the cache says the color is
    /// already showing. `Ok(false)` when the group is unknown to the bridge or
    /// the bridge rejected the update; the cache is left as it was.
    pub fn set_group_state(&mut self, group: &str, color: &StatusColor) -> Result<bool> {
        if self.cache.is_applied(group, color) {
            log::debug!("[bridge] {}: '{group}' already shows {color}", self.name);
            return Ok(true);
        }

        let Some(gid) = self.group_id_for(group)? else {
            log::warn!("[bridge] {}: group '{group}' not found on bridge", self.name);
            return Ok(false);
        };

        let (url, method) = self.build_url(GROUP_SET, Some(&gid))?;
        let payload = GroupAction::show(color).to_value();
        let (_, errors) = self.execute(&url, method, Some(&payload))?;
        if let Some(e) = errors.first() {
            log::warn!("[bridge] {}: setting '{group}' to {color} failed: {e}", self.name);
            return Ok(false);
        }

        self.cache.set(group, *color);
        log::debug!("[bridge] {}: '{group}' -> {color}", self.name);
        Ok(true)
    }

    /// Turn `group` off. Always sends the request, whatever the cache says.
    pub fn shutdown_group(&mut self, group: &str) -> Result<bool> {
        self.cache.clear(group);

        let Some(gid) = self.group_id_for(group)? else {
            log::warn!("[bridge] {}: group '{group}' not found on bridge", self.name);
            return Ok(false);
        };

        let (url, method) = self.build_url(GROUP_SET, Some(&gid))?;
        let payload = GroupAction::off().to_value();
        let (_, errors) = self.execute(&url, method, Some(&payload))?;
        if let Some(e) = errors.first() {
            log::warn!("[bridge] {}: turning '{group}' off failed: {e}", self.name);
            return Ok(false);
        }
        Ok(true)
    }
}
