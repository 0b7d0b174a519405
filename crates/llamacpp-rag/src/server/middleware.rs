//! Request correlation and request/response logging

use axum::{
    body::{to_bytes, Body},
    extract::{Query, Request, State},
    http::{header, HeaderValue, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use super::state::AppState;

/// Header carrying the per-request correlation ID
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// Tag the request with a correlation ID and run it inside a span carrying it
pub async fn correlation_id(request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = tracing::info_span!("request", correlation_id = %id);

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

/// Log every API call with its bodies; multipart uploads are not buffered
pub async fn log_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let max_logged = state.config().server.max_logged_body;
    let max_body = state.config().server.max_upload_size;

    let method = request.method().clone();
    let uri = request.uri().path().to_string();
    let pairs = query_pairs(request.uri());

    tracing::info!(
        "API INCOMING [{} {}] query={} params={}",
        method,
        uri,
        decoded_query(&pairs),
        format_params(&pairs)
    );

    let started = Instant::now();
    let request = if is_multipart(&request) {
        tracing::info!("API REQUEST [{} {}] Body: <multipart>", method, uri);
        request
    } else {
        let (parts, body) = request.into_parts();
        let bytes = match to_bytes(body, max_body).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to read request body: {}", e);
                return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
            }
        };
        tracing::info!(
            "API REQUEST [{} {}] Body: {}",
            method,
            uri,
            preview(&bytes, max_logged)
        );
        Request::from_parts(parts, Body::from(bytes))
    };

    let response = next.run(request).await;
    let elapsed = started.elapsed().as_millis();

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to buffer response body: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    tracing::info!(
        "API RESPONSE [{} {}] Status: {} Time: {} ms Body: {}",
        method,
        uri,
        parts.status.as_u16(),
        elapsed,
        preview(&bytes, max_logged)
    );

    Response::from_parts(parts, Body::from(bytes))
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/"))
}

/// At most `limit` bytes of the body as lossy UTF-8
fn preview(bytes: &[u8], limit: usize) -> String {
    let shown = &bytes[..bytes.len().min(limit)];
    let mut text = String::from_utf8_lossy(shown).into_owned();
    if bytes.len() > limit {
        text.push_str("...");
    }
    text
}

/// Decoded query string pairs, in order
fn query_pairs(uri: &Uri) -> Vec<(String, String)> {
    Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default()
}

fn decoded_query(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// `{k=v1,v2, k2=v}` with repeated keys grouped in first-seen order
fn format_params(pairs: &[(String, String)]) -> String {
    let mut params: Vec<(&str, Vec<&str>)> = Vec::new();
    for (key, value) in pairs {
        match params.iter_mut().find(|(k, _)| *k == key.as_str()) {
            Some((_, values)) => values.push(value.as_str()),
            None => params.push((key.as_str(), vec![value.as_str()])),
        }
    }

    let joined = params
        .iter()
        .map(|(k, values)| format!("{}={}", k, values.join(",")))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(uri: &str) -> Vec<(String, String)> {
        query_pairs(&uri.parse::<Uri>().unwrap())
    }

    #[test]
    fn test_format_params() {
        assert_eq!(format_params(&pairs("/api/chat")), "{}");
        assert_eq!(
            format_params(&pairs("/api/chat?q=what%20is+RAG%3F&tag=a&tag=b")),
            "{q=what is RAG?, tag=a,b}"
        );
    }

    #[test]
    fn test_decoded_query() {
        assert_eq!(
            decoded_query(&pairs("/api/chat?q=caf%C3%A9+menu&lang=fr")),
            "q=café menu&lang=fr"
        );
    }

    #[test]
    fn test_preview_caps_body() {
        assert_eq!(preview(b"hello", 10), "hello");
        assert_eq!(preview(b"hello world", 5), "hello...");
    }
}
