//! Bridge configuration — JSON document, validated into an ordered entity graph.
//!
//! A [`Config`] owns every [`BridgeConfig`]; each bridge owns an ordered list
//! of [`Group`]s mapping status strings to palette colors. Parsing validates
//! the whole document before anything is committed, so a rejected document
//! never leaves a half-applied configuration behind.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::error::HueStatusError;
use crate::palette::{self, HueColor};

/// Newest document version this build understands.
pub const CONFIG_VERSION: u64 = 1;

/// Format tag written into serialized documents.
pub const CONFIG_FORMAT: &str = "huestatus";

// ── Validation errors ──

/// Structural problems found while parsing a configuration document.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The document (or the string holding it) is not valid JSON.
    InvalidJson(String),
    /// The document root is not a JSON object.
    NotAnObject,
    /// The root has no `bridges` list.
    MissingBridges,
    /// A `version` newer than [`CONFIG_VERSION`].
    UnsupportedVersion(u64),
    /// Entry `index` of the `bridges` list is not an object.
    BridgeNotAnObject(usize),
    /// Entry `index` of the `bridges` list has no string `name`.
    BridgeMissingName(usize),
    /// Two bridges share a name.
    DuplicateBridge(String),
    /// A field holds the wrong JSON type.
    InvalidField {
        scope: String,
        field: &'static str,
        expected: &'static str,
    },
    /// The bridge's `groups` field is present but not a list.
    GroupsNotAList(String),
    /// Entry `index` of a bridge's `groups` list has no string `name`.
    GroupMissingName { bridge: String, index: usize },
    /// A group has no `status` field.
    GroupMissingStatus { bridge: String, group: String },
    /// A group's `status` field is not an object.
    StatusNotAnObject { bridge: String, group: String },
    /// A group's `status` object has no entries.
    EmptyStatus { bridge: String, group: String },
    /// A status entry has no `color`.
    MissingColor {
        bridge: String,
        group: String,
        status: String,
    },
    /// A status entry names a color outside the palette.
    UnknownColor {
        bridge: String,
        group: String,
        status: String,
        color: String,
    },
    /// `enabled: true` on a bridge without address or user.
    EnabledWithoutCredentials(String),
    /// A setter was given an empty value.
    EmptyValue { bridge: String, field: &'static str },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidJson(e) => write!(f, "invalid JSON: {e}"),
            ValidationError::NotAnObject => write!(f, "configuration must be a JSON object"),
            ValidationError::MissingBridges => write!(f, "configuration requires a 'bridges' list"),
            ValidationError::UnsupportedVersion(v) => write!(
                f,
                "configuration version {v} is newer than supported version {CONFIG_VERSION}"
            ),
            ValidationError::BridgeNotAnObject(i) => write!(f, "bridges[{i}] must be an object"),
            ValidationError::BridgeMissingName(i) => write!(f, "bridges[{i}] requires a name"),
            ValidationError::DuplicateBridge(name) => write!(f, "duplicate bridge '{name}'"),
            ValidationError::InvalidField {
                scope,
                field,
                expected,
            } => write!(f, "{scope}: '{field}' must be {expected}"),
            ValidationError::GroupsNotAList(bridge) => {
                write!(f, "bridge '{bridge}': expected a list of groups")
            }
            ValidationError::GroupMissingName { bridge, index } => {
                write!(f, "bridge '{bridge}': groups[{index}] requires a name")
            }
            ValidationError::GroupMissingStatus { bridge, group } => {
                write!(f, "bridge '{bridge}', group '{group}': missing 'status'")
            }
            ValidationError::StatusNotAnObject { bridge, group } => {
                write!(f, "bridge '{bridge}', group '{group}': 'status' must be an object")
            }
            ValidationError::EmptyStatus { bridge, group } => {
                write!(f, "bridge '{bridge}', group '{group}': no status entries defined")
            }
            ValidationError::MissingColor {
                bridge,
                group,
                status,
            } => write!(
                f,
                "bridge '{bridge}', group '{group}': color not specified for status '{status}'"
            ),
            ValidationError::UnknownColor {
                bridge,
                group,
                status,
                color,
            } => write!(
                f,
                "bridge '{bridge}', group '{group}': unknown color '{color}' for status '{status}' (known: {})",
                palette::names()
            ),
            ValidationError::EnabledWithoutCredentials(bridge) => write!(
                f,
                "bridge '{bridge}' cannot be enabled without an address and a user"
            ),
            ValidationError::EmptyValue { bridge, field } => {
                write!(f, "bridge '{bridge}': {field} cannot be empty")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

// ── Status colors ──

/// Visual effect applied together with a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Solid,
    Alert,
}

impl ColorMode {
    /// Map a document `type` string to a mode.
    ///
    /// Matching is case-insensitive; unrecognized names fall back to `Solid`
    /// instead of failing.
    pub fn from_type_name(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("alert") {
            ColorMode::Alert
        } else {
            ColorMode::Solid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorMode::Solid => "solid",
            ColorMode::Alert => "alert",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A palette color plus the mode to show it with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusColor {
    pub color: &'static HueColor,
    pub mode: ColorMode,
}

impl StatusColor {
    pub fn new(color: &'static HueColor, mode: ColorMode) -> Self {
        StatusColor { color, mode }
    }

    pub fn color_name(&self) -> &'static str {
        self.color.name
    }

    pub fn is_alert(&self) -> bool {
        self.mode == ColorMode::Alert
    }
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.color.name, self.mode)
    }
}

impl Serialize for StatusColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        json!({"color": self.color.name, "type": self.mode.as_str()}).serialize(serializer)
    }
}

// ── Groups ──

/// Status string → color, one color per status.
pub type StatusMap = BTreeMap<String, StatusColor>;

/// What a configured group does.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKind {
    /// Shows a color for each mapped status.
    Status(StatusMap),
}

/// A named light group on a bridge.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub name: String,
    pub kind: GroupKind,
}

impl Group {
    pub fn status(name: impl Into<String>, statuses: StatusMap) -> Self {
        Group {
            name: name.into(),
            kind: GroupKind::Status(statuses),
        }
    }

    pub fn is_status_group(&self) -> bool {
        matches!(self.kind, GroupKind::Status(_))
    }

    /// The status mapping, if this is a status group.
    pub fn status_map(&self) -> Option<&StatusMap> {
        match &self.kind {
            GroupKind::Status(map) => Some(map),
        }
    }

    pub fn handles_status(&self, status: &str) -> bool {
        self.status_color(status).is_some()
    }

    pub fn status_color(&self, status: &str) -> Option<&StatusColor> {
        self.status_map().and_then(|m| m.get(status))
    }
}

impl Serialize for Group {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let status: Map<String, Value> = self
            .status_map()
            .into_iter()
            .flatten()
            .map(|(k, v)| {
                (
                    k.clone(),
                    json!({"color": v.color.name, "type": v.mode.as_str()}),
                )
            })
            .collect();
        json!({"name": self.name, "status": status}).serialize(serializer)
    }
}

// ── Bridges ──

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BridgeConfig {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub enabled: bool,
    pub groups: Vec<Group>,
}

impl BridgeConfig {
    pub fn new(name: impl Into<String>) -> Self {
        BridgeConfig {
            name: name.into(),
            address: None,
            user: None,
            enabled: false,
            groups: Vec::new(),
        }
    }

    pub fn has_address(&self) -> bool {
        self.address.as_deref().is_some_and(|a| !a.is_empty())
    }

    pub fn has_user(&self) -> bool {
        self.user.as_deref().is_some_and(|u| !u.is_empty())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Status groups handling `status`, in configuration order.
    pub fn status_groups(&self, status: &str) -> Vec<&Group> {
        self.groups
            .iter()
            .filter(|g| g.is_status_group() && g.handles_status(status))
            .collect()
    }
}

// ── Root ──

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub version: u64,
    pub format: String,
    bridges: Vec<BridgeConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            version: CONFIG_VERSION,
            format: CONFIG_FORMAT.into(),
            bridges: Vec::new(),
        }
    }
}

impl Config {
    /// Parse a configuration document.
    ///
    /// `raw` is either the document itself or a JSON string holding the
    /// encoded document.
    pub fn parse(raw: &Value) -> Result<Config, ValidationError> {
        match raw {
            Value::String(text) => parse_document(&decode(text)?),
            other => parse_document(other),
        }
    }

    /// Parse a configuration document from JSON text.
    pub fn from_json(text: &str) -> Result<Config, ValidationError> {
        parse_document(&decode(text)?)
    }

    /// Bridges in insertion order.
    pub fn bridges(&self) -> &[BridgeConfig] {
        &self.bridges
    }

    pub fn bridge(&self, name: &str) -> Option<&BridgeConfig> {
        self.bridges.iter().find(|b| b.name == name)
    }

    fn bridge_mut(&mut self, name: &str) -> Option<&mut BridgeConfig> {
        self.bridges.iter_mut().find(|b| b.name == name)
    }

    pub fn enabled_bridges(&self) -> impl Iterator<Item = &BridgeConfig> {
        self.bridges.iter().filter(|b| b.enabled)
    }

    /// Replace the whole configuration with a parsed document.
    ///
    /// On error the current configuration is left untouched.
    pub fn assimilate(&mut self, raw: &Value) -> Result<&Config, ValidationError> {
        *self = Config::parse(raw)?;
        Ok(self)
    }

    /// Parse one bridge definition and insert it under `name`, replacing any
    /// existing bridge of that name in place. Other bridges are untouched.
    ///
    /// An `enabled` key in the definition is ignored. The bridge keeps its
    /// current flag (a new bridge starts disabled) and only loses it when the
    /// definition drops the address or the user.
    pub fn setup_bridge(&mut self, name: &str, raw: &Value) -> Result<&BridgeConfig, ValidationError> {
        let decoded;
        let raw = match raw {
            Value::String(text) => {
                decoded = decode(text)?;
                &decoded
            }
            other => other,
        };
        let mut definition = raw.as_object().ok_or(ValidationError::NotAnObject)?.clone();
        definition.remove("enabled");
        let mut bridge = parse_bridge(name, &definition)?;
        let was_enabled = self.bridge(name).is_some_and(BridgeConfig::is_enabled);
        bridge.enabled = was_enabled && bridge.has_address() && bridge.has_user();
        if was_enabled && !bridge.enabled {
            log::info!("[config] bridge '{name}' disabled: address or user removed");
        }

        let idx = match self.bridges.iter().position(|b| b.name == name) {
            Some(i) => {
                self.bridges[i] = bridge;
                i
            }
            None => {
                self.bridges.push(bridge);
                self.bridges.len() - 1
            }
        };
        Ok(&self.bridges[idx])
    }

    /// Enable a bridge.
    ///
    /// Refused (returns `false`, nothing changes) when the bridge is unknown or
    /// lacks an address or user; `force` never bypasses that. Without `force`
    /// a bridge with no status groups is refused as well.
    pub fn enable_bridge(&mut self, name: &str, force: bool) -> bool {
        let Some(bridge) = self.bridge_mut(name) else {
            return false;
        };
        if !bridge.has_address() || !bridge.has_user() {
            log::info!(
                "[config] bridge '{name}' not enabled: address = {:?}, user = {}",
                bridge.address,
                if bridge.has_user() { "set" } else { "missing" }
            );
            return false;
        }
        if !force && !bridge.groups.iter().any(Group::is_status_group) {
            log::info!("[config] bridge '{name}' not enabled: no status groups configured");
            return false;
        }
        bridge.enabled = true;
        true
    }

    /// Disable a bridge. Returns `false` only when the bridge does not exist.
    pub fn disable_bridge(&mut self, name: &str) -> bool {
        match self.bridge_mut(name) {
            Some(bridge) => {
                bridge.enabled = false;
                true
            }
            None => false,
        }
    }

    /// Store a bridge credential.
    pub fn set_user(&mut self, name: &str, user: &str) -> Result<(), HueStatusError> {
        let bridge = self
            .bridge_mut(name)
            .ok_or_else(|| HueStatusError::NotFound(format!("bridge '{name}'")))?;
        if user.trim().is_empty() {
            return Err(ValidationError::EmptyValue {
                bridge: name.into(),
                field: "user",
            }
            .into());
        }
        bridge.user = Some(user.trim().to_string());
        Ok(())
    }

    /// Store a bridge address.
    pub fn set_address(&mut self, name: &str, address: &str) -> Result<(), HueStatusError> {
        let bridge = self
            .bridge_mut(name)
            .ok_or_else(|| HueStatusError::NotFound(format!("bridge '{name}'")))?;
        if address.trim().is_empty() {
            return Err(ValidationError::EmptyValue {
                bridge: name.into(),
                field: "address",
            }
            .into());
        }
        bridge.address = Some(address.trim().to_string());
        Ok(())
    }

    /// Status groups handling `status`, per enabled bridge, in insertion order.
    ///
    /// Bridges without a matching group are omitted.
    pub fn status_groups_for(&self, status: &str) -> Vec<(&str, Vec<&Group>)> {
        self.enabled_bridges()
            .filter_map(|b| {
                let groups = b.status_groups(status);
                (!groups.is_empty()).then_some((b.name.as_str(), groups))
            })
            .collect()
    }

    /// Serialize into a document that [`Config::parse`] accepts.
    pub fn to_document(&self) -> Value {
        let bridges: Vec<Value> = self
            .bridges
            .iter()
            .map(|b| {
                let mut obj = Map::new();
                obj.insert("name".into(), Value::from(b.name.as_str()));
                if let Some(address) = &b.address {
                    obj.insert("address".into(), Value::from(address.as_str()));
                }
                if let Some(user) = &b.user {
                    obj.insert("user".into(), Value::from(user.as_str()));
                }
                obj.insert("enabled".into(), Value::Bool(b.enabled));
                obj.insert("groups".into(), json!(b.groups));
                Value::Object(obj)
            })
            .collect();
        json!({
            "version": self.version,
            "format": self.format,
            "bridges": bridges,
        })
    }

    pub fn to_json_pretty(&self) -> String {
        // Serializing a `Value` cannot fail.
        serde_json::to_string_pretty(&self.to_document()).unwrap_or_default()
    }
}

impl Serialize for Config {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_document().serialize(serializer)
    }
}

// ── Parsing ──

fn decode(text: &str) -> Result<Value, ValidationError> {
    serde_json::from_str(text).map_err(|e| ValidationError::InvalidJson(e.to_string()))
}

fn parse_document(raw: &Value) -> Result<Config, ValidationError> {
    let root = raw.as_object().ok_or(ValidationError::NotAnObject)?;

    let version = match root.get("version") {
        None | Some(Value::Null) => CONFIG_VERSION,
        Some(v) => v.as_u64().ok_or_else(|| ValidationError::InvalidField {
            scope: "configuration".into(),
            field: "version",
            expected: "a non-negative integer",
        })?,
    };
    if version > CONFIG_VERSION {
        return Err(ValidationError::UnsupportedVersion(version));
    }

    let format = match root.get("format") {
        None | Some(Value::Null) => CONFIG_FORMAT.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(ValidationError::InvalidField {
                scope: "configuration".into(),
                field: "format",
                expected: "a string",
            });
        }
    };

    let entries = root
        .get("bridges")
        .and_then(Value::as_array)
        .ok_or(ValidationError::MissingBridges)?;

    let mut bridges: Vec<BridgeConfig> = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let obj = entry
            .as_object()
            .ok_or(ValidationError::BridgeNotAnObject(index))?;
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or(ValidationError::BridgeMissingName(index))?;
        if bridges.iter().any(|b| b.name == name) {
            return Err(ValidationError::DuplicateBridge(name.into()));
        }
        bridges.push(parse_bridge(name, obj)?);
    }

    Ok(Config {
        version,
        format,
        bridges,
    })
}

fn optional_string(
    obj: &Map<String, Value>,
    field: &'static str,
    scope: &str,
) -> Result<Option<String>, ValidationError> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::InvalidField {
            scope: scope.into(),
            field,
            expected: "a string",
        }),
    }
}

fn parse_bridge(name: &str, obj: &Map<String, Value>) -> Result<BridgeConfig, ValidationError> {
    let scope = format!("bridge '{name}'");
    let address = optional_string(obj, "address", &scope)?;
    let user = optional_string(obj, "user", &scope)?;

    let enabled = match obj.get("enabled") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(_) => {
            return Err(ValidationError::InvalidField {
                scope,
                field: "enabled",
                expected: "a boolean",
            });
        }
    };

    let groups = match obj.get("groups") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(list)) => list
            .iter()
            .enumerate()
            .map(|(index, g)| parse_group(name, index, g))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(ValidationError::GroupsNotAList(name.into())),
    };

    let bridge = BridgeConfig {
        name: name.into(),
        address,
        user,
        enabled,
        groups,
    };
    if bridge.enabled && (!bridge.has_address() || !bridge.has_user()) {
        return Err(ValidationError::EnabledWithoutCredentials(name.into()));
    }
    Ok(bridge)
}

fn parse_group(bridge: &str, index: usize, raw: &Value) -> Result<Group, ValidationError> {
    let missing_name = || ValidationError::GroupMissingName {
        bridge: bridge.into(),
        index,
    };
    let obj = raw.as_object().ok_or_else(missing_name)?;
    let name = obj
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(missing_name)?;

    let status = match obj.get("status") {
        None | Some(Value::Null) => {
            return Err(ValidationError::GroupMissingStatus {
                bridge: bridge.into(),
                group: name.into(),
            });
        }
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(ValidationError::StatusNotAnObject {
                bridge: bridge.into(),
                group: name.into(),
            });
        }
    };
    if status.is_empty() {
        return Err(ValidationError::EmptyStatus {
            bridge: bridge.into(),
            group: name.into(),
        });
    }

    let mut statuses = StatusMap::new();
    for (status_name, entry) in status {
        let color_name = match entry.get("color") {
            Some(Value::String(c)) => c.as_str(),
            None | Some(Value::Null) => {
                return Err(ValidationError::MissingColor {
                    bridge: bridge.into(),
                    group: name.into(),
                    status: status_name.clone(),
                });
            }
            Some(_) => {
                return Err(ValidationError::InvalidField {
                    scope: format!("bridge '{bridge}', group '{name}', status '{status_name}'"),
                    field: "color",
                    expected: "a string",
                });
            }
        };
        let color = palette::by_name(color_name).ok_or_else(|| ValidationError::UnknownColor {
            bridge: bridge.into(),
            group: name.into(),
            status: status_name.clone(),
            color: color_name.into(),
        })?;
        let mode = match entry.get("type") {
            Some(Value::String(t)) => {
                let mode = ColorMode::from_type_name(t);
                if mode == ColorMode::Solid && !t.trim().eq_ignore_ascii_case("solid") {
                    log::warn!(
                        "[config] bridge '{bridge}', group '{name}': unknown type '{t}' for status '{status_name}', using solid"
                    );
                }
                mode
            }
            None | Some(Value::Null) => ColorMode::Solid,
            Some(other) => {
                log::warn!(
                    "[config] bridge '{bridge}', group '{name}': type {other} for status '{status_name}' is not a string, using solid"
                );
                ColorMode::Solid
            }
        };
        statuses.insert(status_name.clone(), StatusColor::new(color, mode));
    }

    Ok(Group::status(name, statuses))
}
