//! Bearer-token authorization gate.
//!
//! Every routed call must carry the API id it is addressed to and an
//! `Authorization: Bearer <token>` credential. The token is verified against
//! the current [`KeySet`] and its `authorities` claim must list the API id.
//! Credential headers are stripped before the call goes any further.

use crate::error::TokenError;
use crate::keys::{Claims, KeySet};
use async_trait::async_trait;
use portico_kernel::gateway::auth::{INVALID_KEYS, INVALID_TOKEN, NOT_SUBSCRIBED};
use portico_kernel::gateway::{
    AuthOutcome, FilterAction, FilterOrder, GatewayContext, GatewayError, GatewayFilter, headers,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Claim listing the API ids the token's subject may call.
const AUTHORITIES_CLAIM: &str = "authorities";

/// Context attribute holding the verified `sub` claim.
pub const SUBJECT_ATTR: &str = "auth.subject";

pub struct AuthorizationGate {
    keys: Arc<KeySet>,
}

impl AuthorizationGate {
    pub fn new(keys: Arc<KeySet>) -> Self {
        Self { keys }
    }

    /// Decide the outcome for one call. On success the verified claims are
    /// returned alongside the outcome.
    pub fn authorize(
        &self,
        api_id: Option<&str>,
        token: Option<&str>,
    ) -> (AuthOutcome, Option<Claims>) {
        let (Some(api_id), Some(token)) = (api_id, token) else {
            return (AuthOutcome::denied(400, INVALID_TOKEN), None);
        };

        let claims = match self.keys.verify(token) {
            Ok(claims) => claims,
            Err(TokenError::Malformed(reason)) => {
                debug!(%reason, "token could not be parsed");
                return (AuthOutcome::denied(400, INVALID_TOKEN), None);
            }
            Err(TokenError::Rejected(reason)) => {
                debug!(%reason, "token signature not verified");
                return (AuthOutcome::denied(403, INVALID_KEYS), None);
            }
        };

        if !is_subscribed(&claims, api_id) {
            return (AuthOutcome::denied(403, NOT_SUBSCRIBED), None);
        }
        (AuthOutcome::authorized(), Some(claims))
    }
}

fn is_subscribed(claims: &Claims, api_id: &str) -> bool {
    claims
        .get(AUTHORITIES_CLAIM)
        .and_then(Value::as_array)
        .is_some_and(|authorities| {
            authorities
                .iter()
                .filter_map(Value::as_str)
                .any(|authority| authority == api_id)
        })
}

fn bearer_token(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .and_then(|v| v.strip_prefix(headers::BEARER_PREFIX))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl GatewayFilter for AuthorizationGate {
    fn name(&self) -> &str {
        "authorization"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::AUTH
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
        // Credentials never travel past this point.
        let api_id = ctx
            .remove_header(headers::API_ID)
            .filter(|id| !id.is_empty());
        let token = bearer_token(ctx.remove_header(headers::AUTHORIZATION));
        ctx.remove_header(headers::BLOCK_IF_IN_ERROR);

        let (outcome, claims) = self.authorize(api_id.as_deref(), token.as_deref());
        let action = if outcome.authorized {
            if let Some(sub) = claims.as_ref().and_then(|c| c.get("sub")).and_then(Value::as_str) {
                ctx.set_attr(SUBJECT_ATTR, &sub);
            }
            FilterAction::Continue
        } else {
            warn!(
                request_id = %ctx.request.id,
                api_id = api_id.as_deref().unwrap_or(""),
                code = outcome.reason_code,
                reason = %outcome.reason_message,
                "call not authorized"
            );
            ctx.set_reason(outcome.reason_code, outcome.reason_message.clone());
            FilterAction::Divert
        };
        ctx.auth_outcome = Some(outcome);
        Ok(action)
    }
}
