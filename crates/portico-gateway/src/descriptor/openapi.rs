//! OpenAPI / Swagger document resolver.
//!
//! Only the `paths` object is read: every `paths.<template>.<method>` entry
//! becomes one [`PathSpec`]. Operation details, parameters and schemas are
//! ignored. Path templates already use the `{param}` syntax routes expect.

use async_trait::async_trait;
use portico_kernel::gateway::{DescriptorResolver, GatewayError, HttpMethod, PathSpec};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// Fetches descriptor documents over HTTP.
pub struct OpenApiResolver {
    client: Client,
}

impl OpenApiResolver {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl DescriptorResolver for OpenApiResolver {
    #[instrument(skip(self))]
    async fn resolve(&self, endpoint: &str) -> Result<Vec<PathSpec>, GatewayError> {
        let unavailable =
            |reason: String| GatewayError::DescriptorUnavailable(endpoint.to_string(), reason);

        let resp = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(unavailable(format!("descriptor endpoint answered {status}")));
        }

        let body = resp.bytes().await.map_err(|e| unavailable(e.to_string()))?;
        let document: Value = serde_json::from_slice(&body)
            .map_err(|e| GatewayError::DescriptorInvalid(endpoint.to_string(), e.to_string()))?;

        let paths = paths_from_document(endpoint, &document)?;
        debug!(paths = paths.len(), "descriptor resolved");
        Ok(paths)
    }
}

/// Walk the `paths` object of a parsed descriptor document.
///
/// Keys under a path template that are not HTTP methods (`parameters`,
/// `summary`, vendor extensions) are skipped. The result is ordered by
/// template, then method.
pub fn paths_from_document(endpoint: &str, document: &Value) -> Result<Vec<PathSpec>, GatewayError> {
    let invalid = |reason: &str| {
        GatewayError::DescriptorInvalid(endpoint.to_string(), reason.to_string())
    };

    let paths = document
        .get("paths")
        .and_then(Value::as_object)
        .ok_or_else(|| invalid("document has no 'paths' object"))?;

    let mut specs = Vec::new();
    for (template, operations) in paths {
        if !template.starts_with('/') {
            return Err(invalid(&format!("path '{template}' must start with '/'")));
        }
        let operations = operations
            .as_object()
            .ok_or_else(|| invalid(&format!("path '{template}' is not an object")))?;
        specs.extend(
            operations
                .keys()
                .filter_map(|key| HttpMethod::from_str_ci(key))
                .map(|method| PathSpec::new(method, template.as_str())),
        );
    }
    specs.sort_by(|a, b| (&a.uri, a.method.as_str()).cmp(&(&b.uri, b.method.as_str())));
    Ok(specs)
}
