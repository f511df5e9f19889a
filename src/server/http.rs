use crate::auth::{authorize_url, code_prefix, CallbackOutcome, GitHubOAuth, TokenExchanger};
use crate::config::Config;
use crate::error::{AuthError, ExchangeError};
use crate::metrics::METRICS;
use anyhow::Result;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{Request, StatusCode},
    response::{Json, Response},
    routing::get,
    Router,
};
use axum_extra::extract::CookieJar;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// HTTP server state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub exchanger: Arc<dyn TokenExchanger>,
}

impl AppState {
    pub fn new(config: Config, exchanger: Arc<dyn TokenExchanger>) -> Self {
        Self {
            config: Arc::new(config),
            exchanger,
        }
    }
}

/// Query string GitHub sends back to the callback
#[derive(Debug, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl From<HashMap<String, String>> for CallbackParams {
    /// Repeated keys collapse to the last value instead of rejecting the request
    fn from(mut query: HashMap<String, String>) -> Self {
        Self {
            code: query.remove("code"),
            error: query.remove("error"),
            error_description: query.remove("error_description"),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let callback_path = state.config.server.callback_path.clone();

    Router::new()
        // Health check
        .route("/health", get(health_handler))
        // Metrics (Prometheus)
        .route("/metrics", get(metrics_handler))
        // OAuth callback (also the login entry point)
        .route(&callback_path, get(oauth_callback_handler))
        // The span records the path only: the query carries the authorization code
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::debug_span!("request", method = %req.method(), path = %req.uri().path())
            }),
        )
        .with_state(state)
}

/// Start HTTP server
pub async fn serve(config: Config) -> Result<()> {
    let oauth = GitHubOAuth::new(config.github.clone())?;
    let bind = config.server.bind.clone();
    let state = AppState::new(config, Arc::new(oauth));

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("✓ HTTP server listening on {}", bind);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// GET /health
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}

/// GET /metrics (Prometheus format)
pub async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    METRICS.render().map_err(|e| {
        error!("Failed to encode metrics: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

/// GET /auth
pub async fn oauth_callback_handler(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    jar: CookieJar,
) -> Response {
    let outcome = resolve_callback(&state, query.into()).await;
    METRICS.callback_total.with_label_values(&[outcome.label()]).inc();
    outcome.into_response(jar, &state.config)
}

/// Pick the callback branch and run it. At most one exchange call, never retried.
pub async fn resolve_callback(state: &AppState, params: CallbackParams) -> CallbackOutcome {
    if let Some(error) = params.error {
        warn!(
            error = %error,
            description = params.error_description.as_deref().unwrap_or(""),
            "GitHub returned an authorization error"
        );
        return CallbackOutcome::Failed(AuthError::UpstreamRejection {
            error,
            description: params.error_description,
        });
    }

    let Some(code) = params.code.filter(|code| !code.is_empty()) else {
        let url = authorize_url(&state.config.github);
        info!(url = %url, "Redirecting visitor to GitHub authorization");
        return CallbackOutcome::RedirectToProvider(url);
    };

    info!(code_prefix = code_prefix(&code), "Exchanging authorization code");

    let timer = METRICS.exchange_duration_seconds.start_timer();
    let result = state.exchanger.exchange_code_for_token(&code).await;
    timer.observe_duration();

    match result {
        Ok(token) => {
            info!("✓ GitHub access token obtained");
            CallbackOutcome::SignedIn(token)
        }
        Err(ExchangeError::BadVerificationCode) => {
            warn!(
                code_prefix = code_prefix(&code),
                "Authorization code expired or already used"
            );
            CallbackOutcome::Failed(AuthError::ExpiredOrReusedCode)
        }
        Err(e) => {
            error!("GitHub OAuth error: {}", e);
            CallbackOutcome::Failed(e.into())
        }
    }
}
