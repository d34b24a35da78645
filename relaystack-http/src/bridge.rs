//! HTTP bridge between gateway proxy events and an [`Application`]

use axum::body::Body;
use base64::{engine::general_purpose, Engine};
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, COOKIE, SET_COOKIE};
use http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use relaystack_core::{BoxError, Event, InvocationContext};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

use crate::application::Application;
use crate::encoding::{decode_single_byte, encode_path, encode_query, unescape_header_value, EncodingError};
use crate::gateway::{
    ApiGatewayEvent, ApiGatewayResponse, GatewayEvent, GatewayEventError, HttpApiEvent,
    HttpApiResponse, PayloadFormat,
};

/// Content type prefixes returned to the gateway as text
pub const TEXT_CONTENT_TYPE_PREFIXES: &[&str] = &[
    "application/javascript",
    "application/json",
    "application/vnd.api+json",
    "application/xml",
    "image/svg+xml",
    "text/",
];

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Event(#[from] GatewayEventError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error("Invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] http::Error),

    #[error("Invalid base64 body: {0}")]
    InvalidBody(#[from] base64::DecodeError),

    #[error("Application error: {0}")]
    Application(#[source] BoxError),

    #[error("Failed to read response body: {0}")]
    ResponseBody(#[source] BoxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The gateway's raw `requestContext`, attached to every bridged request
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayRequestContext(pub Value);

/// Run one gateway event through the application and return the gateway
/// response document.
///
/// The [`InvocationContext`] and [`GatewayRequestContext`] are available to
/// the application as request extensions.
pub async fn bridge(
    app: &dyn Application,
    event: &Event,
    context: &InvocationContext,
) -> Result<Value, BridgeError> {
    let gateway = GatewayEvent::from_event(event)?;
    let format = gateway.format();

    let mut request = match gateway {
        GatewayEvent::V1(event) => build_v1_request(event)?,
        GatewayEvent::V2(event) => build_v2_request(event)?,
    };

    let request_context = event.get("requestContext").cloned().unwrap_or(Value::Null);
    request.extensions_mut().insert(GatewayRequestContext(request_context));
    request.extensions_mut().insert(context.clone());

    debug!(
        format = format.as_str(),
        method = %request.method(),
        uri = %request.uri(),
        "Bridging gateway request"
    );

    let response = app.call(request).await.map_err(BridgeError::Application)?;
    let (parts, body) = response.into_parts();
    let body = body
        .collect()
        .await
        .map_err(|e| BridgeError::ResponseBody(Box::new(e)))?
        .to_bytes();

    debug!(status = parts.status.as_u16(), bytes = body.len(), "Application responded");

    let value = match format {
        PayloadFormat::V1 => serde_json::to_value(v1_response(parts.status, &parts.headers, body))?,
        PayloadFormat::V2 => serde_json::to_value(v2_response(parts.status, &parts.headers, body))?,
    };
    Ok(value)
}

fn build_v2_request(event: HttpApiEvent) -> Result<Request<Body>, BridgeError> {
    let body = request_body(event.body, event.is_base64_encoded)?;

    let mut uri = encode_path(&event.raw_path);
    if !event.raw_query_string.is_empty() {
        uri.push('?');
        uri.push_str(&encode_query(&event.raw_query_string));
    }

    let mut request = Request::builder()
        .method(event.request_context.http.method.as_str())
        .uri(uri)
        .body(Body::from(body.clone()))?;

    let headers = request.headers_mut();
    for (name, value) in event.headers.unwrap_or_default() {
        append_header(headers, &name, &value)?;
    }

    if let Some(cookies) = event.cookies.filter(|c| !c.is_empty()) {
        append_header(headers, COOKIE.as_str(), &cookies.join("; "))?;
    }

    set_content_length(headers, body.len());
    Ok(request)
}

fn build_v1_request(event: ApiGatewayEvent) -> Result<Request<Body>, BridgeError> {
    let body = request_body(event.body, event.is_base64_encoded)?;

    let mut uri = encode_path(&event.path);
    let query = v1_query_string(
        event.multi_value_query_string_parameters,
        event.query_string_parameters,
    );
    if !query.is_empty() {
        uri.push('?');
        uri.push_str(&query);
    }

    let mut request = Request::builder()
        .method(event.http_method.as_str())
        .uri(uri)
        .body(Body::from(body.clone()))?;

    let headers = request.headers_mut();
    match event.multi_value_headers.filter(|h| !h.is_empty()) {
        Some(multi) => {
            for (name, values) in multi {
                for value in values {
                    append_header(headers, &name, &value)?;
                }
            }
        }
        None => {
            for (name, value) in event.headers.unwrap_or_default() {
                append_header(headers, &name, &value)?;
            }
        }
    }

    set_content_length(headers, body.len());
    Ok(request)
}

fn v1_query_string(
    multi: Option<HashMap<String, Vec<String>>>,
    single: Option<HashMap<String, String>>,
) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    match multi.filter(|m| !m.is_empty()) {
        Some(multi) => {
            let mut keys: Vec<_> = multi.into_iter().collect();
            keys.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, values) in keys {
                for value in values {
                    serializer.append_pair(&key, &value);
                }
            }
        }
        None => {
            let mut pairs: Vec<_> = single.unwrap_or_default().into_iter().collect();
            pairs.sort();
            for (key, value) in pairs {
                serializer.append_pair(&key, &value);
            }
        }
    }
    serializer.finish()
}

fn request_body(body: Option<String>, is_base64_encoded: bool) -> Result<Bytes, BridgeError> {
    match body {
        None => Ok(Bytes::new()),
        Some(body) if is_base64_encoded => Ok(Bytes::from(general_purpose::STANDARD.decode(body)?)),
        Some(body) => Ok(Bytes::from(body)),
    }
}

fn append_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), BridgeError> {
    let header_name =
        HeaderName::from_bytes(name.as_bytes()).map_err(|e| BridgeError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

    let raw = unescape_header_value(value)?;
    let header_value = HeaderValue::from_bytes(&raw).map_err(|e| BridgeError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })?;

    headers.append(header_name, header_value);
    Ok(())
}

fn set_content_length(headers: &mut HeaderMap, len: usize) {
    if !headers.contains_key(CONTENT_LENGTH) {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    }
}

/// Whether a response must be base64 encoded for the gateway
fn is_binary(headers: &HeaderMap) -> bool {
    let content_type = headers
        .get(CONTENT_TYPE)
        .map(|v| header_text(v).to_ascii_lowercase())
        .unwrap_or_default();

    if !TEXT_CONTENT_TYPE_PREFIXES
        .iter()
        .any(|prefix| content_type.starts_with(prefix))
    {
        return true;
    }

    headers
        .get_all(CONTENT_ENCODING)
        .iter()
        .any(|v| header_text(v).to_ascii_lowercase().contains("gzip"))
}

fn encode_body(headers: &HeaderMap, body: Bytes) -> (String, bool) {
    if !is_binary(headers) {
        if let Ok(text) = String::from_utf8(body.to_vec()) {
            return (text, false);
        }
    }
    (general_purpose::STANDARD.encode(&body), true)
}

fn header_text(value: &HeaderValue) -> String {
    match std::str::from_utf8(value.as_bytes()) {
        Ok(text) => text.to_string(),
        Err(_) => decode_single_byte(value.as_bytes()),
    }
}

fn v2_response(status: StatusCode, headers: &HeaderMap, body: Bytes) -> HttpApiResponse {
    let mut flat: HashMap<String, String> = HashMap::new();
    let mut cookies = Vec::new();

    for (name, value) in headers {
        let text = header_text(value);
        if name == SET_COOKIE {
            cookies.push(text);
            continue;
        }
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&text);
            })
            .or_insert(text);
    }

    let (body, is_base64_encoded) = encode_body(headers, body);
    HttpApiResponse {
        status_code: status.as_u16(),
        headers: flat,
        cookies,
        body,
        is_base64_encoded,
    }
}

fn v1_response(status: StatusCode, headers: &HeaderMap, body: Bytes) -> ApiGatewayResponse {
    let mut multi: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        multi
            .entry(name.as_str().to_string())
            .or_default()
            .push(header_text(value));
    }

    let (body, is_base64_encoded) = encode_body(headers, body);
    ApiGatewayResponse {
        status_code: status.as_u16(),
        headers: HashMap::new(),
        multi_value_headers: multi,
        body,
        is_base64_encoded,
    }
}
