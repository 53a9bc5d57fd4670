//! Upstream HTTP forwarding.

use std::time::Duration;

use axum::body::Body;
use axum::http::header::{CONNECTION, CONTENT_LENGTH, HOST, HeaderName};
use axum::http::{HeaderMap, HeaderValue, Request, Response};
use tracing::debug;

use gatehouse_core::error::{AppError, ErrorKind};
use gatehouse_core::types::instance::ServiceInstance;

/// Header carrying the host the client originally addressed.
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Connection-scoped headers that must not be forwarded.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Forwards buffered requests to an upstream instance.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl ProxyClient {
    /// Creates a client with a whole-request timeout and a body limit.
    pub fn new(timeout: Duration, max_body_bytes: usize) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build proxy client", e)
            })?;
        Ok(Self {
            client,
            max_body_bytes,
        })
    }

    /// Sends `request` to `instance` at `path_and_query`.
    ///
    /// The upstream body is read completely before a response is built, so a
    /// failure never yields a partially written response.
    pub async fn forward(
        &self,
        instance: &ServiceInstance,
        path_and_query: &str,
        request: Request<Body>,
    ) -> Result<Response<Body>, AppError> {
        let url = format!("http://{}{}", instance.authority(), path_and_query);
        let (parts, body) = request.into_parts();

        let original_host = parts
            .headers
            .get(HOST)
            .cloned()
            .or_else(|| {
                parts
                    .uri
                    .authority()
                    .and_then(|a| HeaderValue::from_str(a.as_str()).ok())
            });

        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| AppError::validation(format!("Request body rejected: {e}")))?;

        let mut headers = strip_hop_by_hop(&parts.headers);
        headers.remove(HOST);
        headers.remove(CONTENT_LENGTH);
        if let Some(host) = original_host {
            headers.insert(HeaderName::from_static(X_FORWARDED_HOST), host);
        }

        let mut upstream = self.client.request(parts.method.clone(), &url).headers(headers);
        if !body.is_empty() {
            upstream = upstream.body(body);
        }

        let response = upstream
            .send()
            .await
            .map_err(|e| map_upstream_error(&instance.service, e))?;

        let status = response.status();
        let mut response_headers = strip_hop_by_hop(response.headers());
        response_headers.remove(CONTENT_LENGTH);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_upstream_error(&instance.service, e))?;

        debug!(
            service = %instance.service,
            upstream = %url,
            status = status.as_u16(),
            bytes = bytes.len(),
            "Upstream responded"
        );

        let mut builder = Response::builder().status(status);
        if let Some(target) = builder.headers_mut() {
            *target = response_headers;
        }
        builder
            .body(Body::from(bytes))
            .map_err(|e| AppError::internal(format!("Failed to build proxied response: {e}")))
    }
}

/// Copies `headers` without hop-by-hop entries, including any named in
/// `Connection`.
pub fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let listed: Vec<String> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let lower = name.as_str();
        if HOP_BY_HOP.contains(&lower) || listed.iter().any(|l| l == lower) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

fn map_upstream_error(service: &str, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::with_source(
            ErrorKind::Timeout,
            format!("Upstream {service} timed out"),
            err,
        )
    } else {
        AppError::with_source(
            ErrorKind::ServiceUnavailable,
            format!("Upstream {service} unreachable"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("keep-alive, x-private"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-private", HeaderValue::from_static("secret"));
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));

        let stripped = strip_hop_by_hop(&headers);
        assert_eq!(stripped.len(), 1);
        assert_eq!(stripped.get("x-request-id").unwrap(), "abc");
    }
}
