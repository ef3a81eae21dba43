//! Reverse proxy to an API's upstream.
//!
//! [`UpstreamProxy`] forwards an authorized call to
//! `{upstream}{request.path}` and relays status, headers and body verbatim.
//! Upstream 5xx answers and transport failures are returned as
//! [`ProxyError`] so the caller can hand them to the error surface.

use crate::error::ProxyError;
use portico_kernel::gateway::{GatewayContext, GatewayResponse, HttpMethod, headers};
use reqwest::{Client, Method};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Headers never forwarded upstream.
const SKIPPED_HEADERS: &[&str] = &[
    "host",
    "content-length",
    "connection",
    headers::ROUTE_ID,
    headers::REASON_CODE,
    headers::REASON_MESSAGE,
];

pub struct UpstreamProxy {
    client: Client,
}

impl UpstreamProxy {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    /// Forward the call held by `ctx` to the upstream of its matched route.
    #[instrument(skip(self, ctx), fields(request_id = %ctx.request.id, path = %ctx.request.path))]
    pub async fn forward(&self, ctx: &GatewayContext) -> Result<GatewayResponse, ProxyError> {
        let (api_id, upstream) = ctx
            .route_match
            .as_ref()
            .map(|m| (m.api_id.as_str(), m.upstream.as_str()))
            .unwrap_or_default();
        let req = &ctx.request;
        let url = format!("{}{}", upstream.trim_end_matches('/'), req.path);
        debug!(url = %url, "forwarding to upstream");

        let start = Instant::now();
        let mut builder = self.client.request(to_reqwest(req.method), &url);
        for (key, value) in &req.headers {
            if SKIPPED_HEADERS.contains(&key.as_str()) {
                continue;
            }
            builder = builder.header(key, value);
        }
        if !req.body.is_empty() {
            builder = builder.body(req.body.clone());
        }

        let network = |source| ProxyError::NetworkError {
            api_id: api_id.to_string(),
            source,
        };
        let upstream_resp = builder.send().await.map_err(network)?;
        let status = upstream_resp.status().as_u16();

        let mut resp_headers = HashMap::new();
        for (name, value) in upstream_resp.headers() {
            if let Ok(v) = value.to_str() {
                resp_headers.insert(name.to_string(), v.to_string());
            }
        }

        let body = upstream_resp.bytes().await.map_err(network)?;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        if status >= 500 {
            return Err(ProxyError::UpstreamError {
                api_id: api_id.to_string(),
                status,
                message: String::from_utf8_lossy(&body).to_string(),
            });
        }

        let mut resp = GatewayResponse::new(status, api_id);
        resp.headers = resp_headers;
        resp.body = body.to_vec();
        resp.latency_ms = latency_ms;
        Ok(resp)
    }
}

fn to_reqwest(method: HttpMethod) -> Method {
    Method::from_bytes(method.as_str().as_bytes()).unwrap_or(Method::GET)
}
