//! Terminal error surface.
//!
//! Every rejected call ends here, whether the authorization gate, the
//! throttle or the upstream proxy refused it. The reason code and message
//! recorded on the call, together with the route's [`RunningApi`] state, are
//! the only inputs. Each pass with a known route id marks that route blocked.
//!
//! [`RunningApi`]: portico_kernel::gateway::RunningApi

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
};
use portico_kernel::gateway::{GatewayContext, RunningApiStore, headers};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error};

/// Error text when neither a suspension message nor a reason was recorded.
pub const FALLBACK_MESSAGE: &str = "Bad request";

/// Fixed path the surface is mounted at.
pub const ERROR_PATH: &str = "/error";

/// Status and message of a rendered rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub struct ErrorSurface {
    running: Arc<dyn RunningApiStore>,
}

impl ErrorSurface {
    pub fn new(running: Arc<dyn RunningApiStore>) -> Self {
        Self { running }
    }

    /// Build the rejection for one call.
    ///
    /// A suspension message on the route beats any recorded reason. A reason
    /// is only used when both code and message are present; a code that is
    /// not a valid HTTP status yields `400` carrying the parse failure.
    pub fn reject(
        &self,
        route_id: Option<&str>,
        reason_code: Option<&str>,
        reason_message: Option<&str>,
    ) -> Rejection {
        let suspension = route_id.and_then(|id| self.suspend_and_block(id));

        let rejection = match (reason_code, reason_message) {
            (Some(code), Some(message)) if suspension.is_none() => match parse_status(code) {
                Ok(status) => Rejection {
                    status,
                    message: message.to_string(),
                },
                Err(failure) => Rejection {
                    status: StatusCode::BAD_REQUEST,
                    message: failure,
                },
            },
            _ => Rejection {
                status: StatusCode::TOO_MANY_REQUESTS,
                message: suspension.unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
            },
        };

        debug!(
            route_id = route_id.unwrap_or(""),
            status = rejection.status.as_u16(),
            message = %rejection.message,
            "call rejected"
        );
        rejection
    }

    /// Render a diverted call from its context headers.
    pub fn render(&self, ctx: &GatewayContext) -> Response {
        self.reject(
            ctx.route_id(),
            ctx.header(headers::REASON_CODE),
            ctx.header(headers::REASON_MESSAGE),
        )
        .into_response()
    }

    /// Render a call that reached [`ERROR_PATH`] directly.
    pub fn render_headers(&self, headers: &HeaderMap) -> Response {
        let read = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
        self.reject(
            read(headers::ROUTE_ID),
            read(headers::REASON_CODE),
            read(headers::REASON_MESSAGE),
        )
        .into_response()
    }

    /// Mark the route blocked and return its suspension message, if any.
    fn suspend_and_block(&self, route_id: &str) -> Option<String> {
        match self.running.upsert(route_id, &|state| state.blocked = true) {
            Ok(state) => state.suspension_message,
            Err(e) => {
                // The rejection is still rendered; only the escalation is lost.
                error!(route_id, error = %e, "failed to mark route blocked");
                self.running.get(route_id).suspension_message
            }
        }
    }
}

fn parse_status(code: &str) -> Result<StatusCode, String> {
    let numeric: u16 = code.trim().parse().map_err(|e| format!("{e}: {code:?}"))?;
    StatusCode::from_u16(numeric).map_err(|e| format!("{e}: {numeric}"))
}

/// Router exposing the surface at [`ERROR_PATH`] for GET, POST, PUT and
/// DELETE. All four verbs behave identically.
pub fn error_router<S>(surface: Arc<ErrorSurface>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(
            ERROR_PATH,
            get(error_handler)
                .post(error_handler)
                .put(error_handler)
                .delete(error_handler),
        )
        .with_state(surface)
}

async fn error_handler(State(surface): State<Arc<ErrorSurface>>, headers: HeaderMap) -> Response {
    surface.render_headers(&headers)
}
