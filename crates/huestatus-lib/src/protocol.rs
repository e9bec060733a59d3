//! Hue bridge REST protocol — endpoint table, device error vocabulary, payloads.
//!
//! Every request goes to `http://{address}/api/{endpoint}` with a JSON body.
//! Authenticated endpoints carry the paired user (the bridge "username")
//! as the first path segment: `http://{address}/api/{user}/{endpoint}`.
//!
//! The bridge answers application errors with HTTP 200 and a body such as
//! `[{"error": {"type": 101, "address": "", "description": "link button not pressed"}}]`,
//! so a successful transport round-trip still has to be checked for
//! embedded error objects.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::BridgeError;
use crate::config::StatusColor;

/// Device type sent when pairing.
pub const DEVICE_TYPE: &str = "huestatus#status-to-hue";

/// Header sent with every request.
pub const CONTENT_TYPE: &str = "application/json";

/// Alert effect for [`ColorMode::Alert`](crate::config::ColorMode): breathe for 15 seconds.
pub const ALERT_LONG: &str = "lselect";

/// Alert effect for solid colors: a single breathe cycle.
pub const ALERT_SINGLE: &str = "select";

// ── Endpoints ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the endpoint table.
#[derive(Debug)]
pub struct Endpoint {
    pub action: &'static str,
    /// Path below `/api/`, after the user segment when `authenticated`.
    /// `{gid}` is replaced by the group id.
    pub path: &'static str,
    pub method: Method,
    pub authenticated: bool,
}

pub const USER_CREATE: &str = "user-create";
pub const USER_CHECK: &str = "user-check";
pub const GROUPS_GET: &str = "groups-get";
pub const GROUP_SET: &str = "group-set";

pub static ENDPOINTS: [Endpoint; 4] = [
    Endpoint {
        action: USER_CREATE,
        path: "",
        method: Method::Post,
        authenticated: false,
    },
    Endpoint {
        action: USER_CHECK,
        path: "",
        method: Method::Get,
        authenticated: true,
    },
    Endpoint {
        action: GROUPS_GET,
        path: "groups/",
        method: Method::Get,
        authenticated: true,
    },
    Endpoint {
        action: GROUP_SET,
        path: "groups/{gid}/action/",
        method: Method::Put,
        authenticated: true,
    },
];

pub fn endpoint(action: &str) -> Option<&'static Endpoint> {
    ENDPOINTS.iter().find(|e| e.action == action)
}

/// Values substituted into an endpoint URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlParams<'a> {
    pub address: &'a str,
    pub user: Option<&'a str>,
    pub group_id: Option<&'a str>,
}

/// Build the request URL and method for `action`.
pub fn build_url(action: &str, params: &UrlParams<'_>) -> Result<(String, Method), BridgeError> {
    let ep = endpoint(action).ok_or_else(|| BridgeError::UnknownEndpoint(action.into()))?;

    let mut path = ep.path.to_string();
    if path.contains("{gid}") {
        let gid = params
            .group_id
            .ok_or_else(|| BridgeError::Internal(format!("endpoint '{action}' requires a group id")))?;
        path = path.replace("{gid}", gid);
    }

    if ep.authenticated {
        let user = params
            .user
            .filter(|u| !u.is_empty())
            .ok_or_else(|| BridgeError::MissingCredential(action.into()))?;
        path = format!("{user}/{path}");
    }

    Ok((format!("http://{}/api/{path}", params.address), ep.method))
}

// ── Device error vocabulary ──

/// Error `type` codes the bridge reports inside 200 responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    UnauthorizedUser = 1,
    InvalidBody = 2,
    ResourceUnavailable = 3,
    MethodUnavailable = 4,
    MissingParameter = 5,
    ParameterUnavailable = 6,
    InvalidParameterValue = 7,
    ParameterNotModifiable = 8,
    TooManyItems = 11,
    PortalConnectionRequired = 12,
    LinkButtonNotPressed = 101,
    InternalError = 901,
}

const ERROR_CODES: [ErrorCode; 12] = [
    ErrorCode::UnauthorizedUser,
    ErrorCode::InvalidBody,
    ErrorCode::ResourceUnavailable,
    ErrorCode::MethodUnavailable,
    ErrorCode::MissingParameter,
    ErrorCode::ParameterUnavailable,
    ErrorCode::InvalidParameterValue,
    ErrorCode::ParameterNotModifiable,
    ErrorCode::TooManyItems,
    ErrorCode::PortalConnectionRequired,
    ErrorCode::LinkButtonNotPressed,
    ErrorCode::InternalError,
];

impl ErrorCode {
    pub fn from_code(code: u32) -> Option<Self> {
        ERROR_CODES.iter().copied().find(|c| c.code() == code)
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorCode::UnauthorizedUser => "UNAUTHORIZED_USER",
            ErrorCode::InvalidBody => "INVALID_BODY",
            ErrorCode::ResourceUnavailable => "UNAVAILABLE_RESOURCE",
            ErrorCode::MethodUnavailable => "UNAVAILABLE_METHOD",
            ErrorCode::MissingParameter => "MISSING_PARAMETER",
            ErrorCode::ParameterUnavailable => "UNAVAILABLE_PARAMETER",
            ErrorCode::InvalidParameterValue => "INVALID_PARAMETER",
            ErrorCode::ParameterNotModifiable => "NOT_MODIFIABLE_PARAMETER",
            ErrorCode::TooManyItems => "TOO_MANY_ITEMS",
            ErrorCode::PortalConnectionRequired => "REQUIRES_PORTAL_CONNECTION",
            ErrorCode::LinkButtonNotPressed => "LINK_BUTTON_NOT_PRESSED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// An application error object embedded in a bridge response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type", default)]
    pub code: u32,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
}

impl ApiError {
    pub fn kind(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(kind) => write!(f, "{kind}")?,
            None => write!(f, "type {}", self.code)?,
        }
        if !self.description.is_empty() {
            write!(f, ": {}", self.description)?;
        }
        Ok(())
    }
}

fn entry_error(entry: &Value) -> Option<ApiError> {
    let raw = entry.as_object()?.get("error")?;
    Some(
        serde_json::from_value(raw.clone()).unwrap_or_else(|e| ApiError {
            description: format!("malformed error object: {e}"),
            ..ApiError::default()
        }),
    )
}

/// Collect the application errors embedded in a response body.
///
/// The body is either a single object or a list of `{"success": ..}` /
/// `{"error": ..}` entries.
pub fn extract_errors(body: &Value) -> Vec<ApiError> {
    match body {
        Value::Array(entries) => entries.iter().filter_map(entry_error).collect(),
        other => entry_error(other).into_iter().collect(),
    }
}

/// Anything that can be reduced to a device error code.
pub trait ErrorCodeSource {
    fn error_code(&self) -> Option<u32>;
}

impl ErrorCodeSource for u32 {
    fn error_code(&self) -> Option<u32> {
        Some(*self)
    }
}

impl ErrorCodeSource for ApiError {
    fn error_code(&self) -> Option<u32> {
        Some(self.code)
    }
}

/// A list is classified by its first error.
impl ErrorCodeSource for [ApiError] {
    fn error_code(&self) -> Option<u32> {
        self.first().map(|e| e.code)
    }
}

impl ErrorCodeSource for Vec<ApiError> {
    fn error_code(&self) -> Option<u32> {
        self.as_slice().error_code()
    }
}

/// Raw JSON: a number, an error object (`{"type": n}`), a response entry
/// (`{"error": {...}}`), or a list of those.
impl ErrorCodeSource for Value {
    fn error_code(&self) -> Option<u32> {
        match self {
            Value::Number(n) => n.as_u64().and_then(|c| u32::try_from(c).ok()),
            Value::Array(list) => list.first().and_then(|v| v.error_code()),
            Value::Object(obj) => {
                if let Some(inner) = obj.get("error") {
                    inner.error_code()
                } else {
                    obj.get("type").and_then(|t| t.error_code())
                }
            }
            _ => None,
        }
    }
}

/// Whether `err` carries the `expected` device error code.
pub fn matches_error<E: ErrorCodeSource + ?Sized>(err: &E, expected: ErrorCode) -> bool {
    err.error_code() == Some(expected.code())
}

// ── Payloads ──

/// Body of a `group-set` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupAction {
    pub on: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sat: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bri: Option<u8>,
}

impl GroupAction {
    /// Turn the group on showing `color`.
    pub fn show(color: &StatusColor) -> Self {
        GroupAction {
            on: true,
            alert: Some(if color.is_alert() {
                ALERT_LONG
            } else {
                ALERT_SINGLE
            }),
            hue: Some(color.color.hue),
            sat: Some(color.color.sat),
            bri: Some(color.color.bri),
        }
    }

    pub fn off() -> Self {
        GroupAction {
            on: false,
            alert: None,
            hue: None,
            sat: None,
            bri: None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColorMode;
    use crate::palette::{RED, YELLOW};
    use serde_json::json;

    fn params<'a>(user: Option<&'a str>, gid: Option<&'a str>) -> UrlParams<'a> {
        UrlParams {
            address: "10.0.0.5",
            user,
            group_id: gid,
        }
    }

    // ── build_url ──

    #[test]
    fn url_user_create_is_unauthenticated() {
        let (url, method) = build_url(USER_CREATE, &params(None, None)).unwrap();
        assert_eq!(url, "http://10.0.0.5/api/");
        assert_eq!(method, Method::Post);
    }

    #[test]
    fn url_groups_get() {
        let (url, method) = build_url(GROUPS_GET, &params(Some("abc"), None)).unwrap();
        assert_eq!(url, "http://10.0.0.5/api/abc/groups/");
        assert_eq!(method, Method::Get);
    }

    #[test]
    fn url_group_set() {
        let (url, method) = build_url(GROUP_SET, &params(Some("abc"), Some("3"))).unwrap();
        assert_eq!(url, "http://10.0.0.5/api/abc/groups/3/action/");
        assert_eq!(method, Method::Put);
    }

    #[test]
    fn url_user_check() {
        let (url, method) = build_url(USER_CHECK, &params(Some("abc"), None)).unwrap();
        assert_eq!(url, "http://10.0.0.5/api/abc/");
        assert_eq!(method, Method::Get);
    }

    #[test]
    fn url_unknown_endpoint() {
        let err = build_url("lights-get", &params(Some("abc"), None)).unwrap_err();
        assert!(matches!(err, BridgeError::UnknownEndpoint(ref a) if a == "lights-get"));
    }

    #[test]
    fn url_missing_credential() {
        let err = build_url(GROUPS_GET, &params(None, None)).unwrap_err();
        assert!(matches!(err, BridgeError::MissingCredential(_)));
        let err = build_url(GROUPS_GET, &params(Some(""), None)).unwrap_err();
        assert!(matches!(err, BridgeError::MissingCredential(_)));
    }

    #[test]
    fn url_group_set_requires_group_id() {
        let err = build_url(GROUP_SET, &params(Some("abc"), None)).unwrap_err();
        assert!(matches!(err, BridgeError::Internal(_)));
    }

    // ── error codes ──

    #[test]
    fn error_code_lookup() {
        assert_eq!(ErrorCode::from_code(101), Some(ErrorCode::LinkButtonNotPressed));
        assert_eq!(ErrorCode::from_code(1), Some(ErrorCode::UnauthorizedUser));
        assert_eq!(ErrorCode::from_code(901), Some(ErrorCode::InternalError));
        assert_eq!(ErrorCode::from_code(9), None);
    }

    #[test]
    fn error_code_display() {
        assert_eq!(
            ErrorCode::LinkButtonNotPressed.to_string(),
            "LINK_BUTTON_NOT_PRESSED (101)"
        );
    }

    #[test]
    fn extract_errors_from_list() {
        let body = json!([
            {"success": {"/groups/1/action/on": true}},
            {"error": {"type": 7, "address": "/groups/1/action/hue", "description": "invalid value"}}
        ]);
        let errors = extract_errors(&body);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, 7);
        assert_eq!(errors[0].kind(), Some(ErrorCode::InvalidParameterValue));
    }

    #[test]
    fn extract_errors_from_single_object() {
        let body = json!({"error": {"type": 1, "description": "unauthorized user"}});
        let errors = extract_errors(&body);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), Some(ErrorCode::UnauthorizedUser));
    }

    #[test]
    fn extract_errors_none_on_success() {
        assert!(extract_errors(&json!([{"success": {"username": "x"}}])).is_empty());
        assert!(extract_errors(&json!({"1": {"name": "rack1"}})).is_empty());
    }

    #[test]
    fn extract_malformed_error_object() {
        let errors = extract_errors(&json!([{"error": "boom"}]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, 0);
        assert!(errors[0].description.contains("malformed"));
    }

    // ── matches_error ──

    #[test]
    fn match_raw_code() {
        assert!(matches_error(&101u32, ErrorCode::LinkButtonNotPressed));
        assert!(!matches_error(&1u32, ErrorCode::LinkButtonNotPressed));
    }

    #[test]
    fn match_single_and_list() {
        let e = ApiError {
            code: 101,
            ..ApiError::default()
        };
        assert!(matches_error(&e, ErrorCode::LinkButtonNotPressed));
        let list = vec![e.clone(), ApiError::default()];
        assert!(matches_error(&list, ErrorCode::LinkButtonNotPressed));
        assert!(matches_error(list.as_slice(), ErrorCode::LinkButtonNotPressed));
        let empty: Vec<ApiError> = vec![];
        assert!(!matches_error(&empty, ErrorCode::LinkButtonNotPressed));
    }

    #[test]
    fn match_json_shapes() {
        let expected = ErrorCode::LinkButtonNotPressed;
        assert!(matches_error(&json!(101), expected));
        assert!(matches_error(&json!({"type": 101}), expected));
        assert!(matches_error(&json!({"error": {"type": 101}}), expected));
        assert!(matches_error(&json!([{"error": {"type": 101}}]), expected));
        assert!(!matches_error(&json!([]), expected));
        assert!(!matches_error(&json!("101"), expected));
    }

    #[test]
    fn api_error_display() {
        let e = ApiError {
            code: 101,
            address: String::new(),
            description: "link button not pressed".into(),
        };
        assert_eq!(
            e.to_string(),
            "LINK_BUTTON_NOT_PRESSED (101): link button not pressed"
        );
        let unknown = ApiError {
            code: 999,
            ..ApiError::default()
        };
        assert_eq!(unknown.to_string(), "type 999");
    }

    // ── payloads ──

    #[test]
    fn show_alert_payload() {
        let action = GroupAction::show(&StatusColor::new(&RED, ColorMode::Alert));
        assert_eq!(
            action.to_value(),
            json!({"on": true, "alert": "lselect", "hue": 0, "sat": 254, "bri": 254})
        );
    }

    #[test]
    fn show_solid_payload() {
        let action = GroupAction::show(&StatusColor::new(&YELLOW, ColorMode::Solid));
        assert_eq!(
            action.to_value(),
            json!({"on": true, "alert": "select", "hue": 12750, "sat": 254, "bri": 254})
        );
    }

    #[test]
    fn off_payload() {
        assert_eq!(GroupAction::off().to_value(), json!({"on": false}));
    }
}
