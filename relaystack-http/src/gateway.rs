//! API Gateway proxy event and response models

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Payload format version of a gateway proxy event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    V1,
    V2,
}

impl PayloadFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "1.0",
            Self::V2 => "2.0",
        }
    }
}

/// Treat an explicit `null` like a missing key
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// API Gateway event structure (v1 format)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayEvent {
    #[serde(default)]
    pub resource: Option<String>,
    pub path: String,
    pub http_method: String,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub multi_value_headers: Option<HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub multi_value_query_string_parameters: Option<HashMap<String, Vec<String>>>,
    #[serde(default)]
    pub path_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub stage_variables: Option<HashMap<String, String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub request_context: ApiGatewayRequestContext,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiGatewayRequestContext {
    pub account_id: Option<String>,
    pub api_id: Option<String>,
    pub http_method: Option<String>,
    pub identity: Option<ApiGatewayIdentity>,
    pub path: Option<String>,
    pub stage: Option<String>,
    pub request_id: Option<String>,
    pub request_time: Option<String>,
    pub request_time_epoch: Option<i64>,
    pub resource_id: Option<String>,
    pub resource_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiGatewayIdentity {
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// HTTP API event structure (v2 format)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiEvent {
    pub version: String,
    #[serde(default, deserialize_with = "nullable")]
    pub route_key: String,
    pub raw_path: String,
    #[serde(default, deserialize_with = "nullable")]
    pub raw_query_string: String,
    #[serde(default)]
    pub cookies: Option<Vec<String>>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    pub request_context: HttpApiRequestContext,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiRequestContext {
    #[serde(default, deserialize_with = "nullable")]
    pub account_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub api_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub domain_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub request_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub stage: String,
    pub http: HttpApiRequestDescription,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiRequestDescription {
    pub method: String,
    #[serde(default, deserialize_with = "nullable")]
    pub path: String,
    #[serde(default, deserialize_with = "nullable")]
    pub protocol: String,
    #[serde(default, deserialize_with = "nullable")]
    pub source_ip: String,
    #[serde(default, deserialize_with = "nullable")]
    pub user_agent: String,
}

/// A decoded gateway proxy event
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    V1(ApiGatewayEvent),
    V2(HttpApiEvent),
}

/// Error decoding a gateway event
#[derive(Debug, thiserror::Error)]
pub enum GatewayEventError {
    #[error("Unsupported payload format version: {0:?}")]
    UnsupportedVersion(Option<String>),

    #[error("Invalid gateway event: {0}")]
    Invalid(#[from] serde_json::Error),
}

impl GatewayEvent {
    /// Decode an event according to its `version` field
    pub fn from_event(event: &Value) -> Result<Self, GatewayEventError> {
        match event.get("version").and_then(Value::as_str) {
            Some("1.0") => Ok(Self::V1(ApiGatewayEvent::deserialize(event)?)),
            Some("2.0") => Ok(Self::V2(HttpApiEvent::deserialize(event)?)),
            other => Err(GatewayEventError::UnsupportedVersion(
                other.map(str::to_string),
            )),
        }
    }

    pub fn format(&self) -> PayloadFormat {
        match self {
            Self::V1(_) => PayloadFormat::V1,
            Self::V2(_) => PayloadFormat::V2,
        }
    }
}

/// API Gateway response structure (v1 format)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayResponse {
    pub status_code: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub multi_value_headers: HashMap<String, Vec<String>>,
    pub body: String,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

/// HTTP API response structure (v2 format)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpApiResponse {
    pub status_code: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub cookies: Vec<String>,
    pub body: String,
    #[serde(default)]
    pub is_base64_encoded: bool,
}
