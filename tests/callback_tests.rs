// Callback route tests against an in-process fake of GitHub's token endpoint.
// The fake honours single-use codes so replay behaviour can be checked.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use ghgate::server::http::{router, AppState};
use ghgate::{AccessToken, Config, ExchangeError, TokenExchanger};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// Issued codes map to tokens; exchanging removes the code
#[derive(Default)]
struct SingleUseGitHub {
    issued: Mutex<HashMap<String, String>>,
    scripted_error: Option<(String, Option<String>)>,
    calls: AtomicUsize,
}

impl SingleUseGitHub {
    fn issue(self, code: &str, token: &str) -> Self {
        self.issued
            .lock()
            .unwrap()
            .insert(code.to_string(), token.to_string());
        self
    }

    fn failing_with(error: &str, description: Option<&str>) -> Self {
        Self {
            scripted_error: Some((error.to_string(), description.map(str::to_string))),
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenExchanger for SingleUseGitHub {
    async fn exchange_code_for_token(&self, code: &str) -> Result<AccessToken, ExchangeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some((error, description)) = &self.scripted_error {
            return Err(ExchangeError::Provider {
                error: error.clone(),
                description: description.clone(),
            });
        }

        match self.issued.lock().unwrap().remove(code) {
            Some(token) => Ok(AccessToken::new(token)),
            None => Err(ExchangeError::BadVerificationCode),
        }
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.github.client_id = "Iv1.test".to_string();
    config.github.client_secret = "test-secret".to_string();
    config
}

fn app(github: Arc<SingleUseGitHub>) -> Router {
    router(AppState::new(test_config(), github))
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_error_query_returns_400_with_error_text() {
    let github = Arc::new(SingleUseGitHub::default());

    let response = get(
        app(github.clone()),
        "/auth?error=access_denied&error_description=The+user+has+denied+your+application+access.",
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(set_cookies(&response).is_empty());
    let body = body_text(response).await;
    assert!(body.contains("access_denied"));
    assert!(body.contains("denied your application access"));
    assert_eq!(github.calls(), 0);
}

#[tokio::test]
async fn test_missing_code_redirects_to_github() {
    let github = Arc::new(SingleUseGitHub::default());

    let response = get(app(github.clone()), "/auth").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("https://github.com/login/oauth/authorize?"));
    assert!(location.contains("client_id=Iv1.test"));
    assert!(location.contains("redirect_uri=http%3A%2F%2Flocalhost%3A4321%2Fauth"));
    assert!(location.contains("scope=repo"));
    assert!(set_cookies(&response).is_empty());
    assert_eq!(github.calls(), 0);
}

#[tokio::test]
async fn test_successful_exchange_sets_cookie_and_redirects_to_admin() {
    let github = Arc::new(SingleUseGitHub::default().issue("good-code", "abc123"));

    let response = get(app(github.clone()), "/auth?code=good-code").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/admin");

    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 1);
    let cookie = &cookies[0];
    assert!(cookie.starts_with("github_token=abc123"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=604800"));
    assert!(!cookie.contains("Secure"));
    assert_eq!(github.calls(), 1);
}

#[tokio::test]
async fn test_bad_verification_code_returns_400_without_cookie() {
    let github = Arc::new(SingleUseGitHub::default());

    let response = get(app(github.clone()), "/auth?code=expired").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(set_cookies(&response).is_empty());
    let body = body_text(response).await;
    assert!(body.contains("sign in with GitHub again"));
    assert_eq!(github.calls(), 1);
}

#[tokio::test]
async fn test_other_provider_error_returns_500_with_description() {
    let github = Arc::new(SingleUseGitHub::failing_with("other_error", Some("boom")));

    let response = get(app(github.clone()), "/auth?code=whatever").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(set_cookies(&response).is_empty());
    assert!(body_text(response).await.contains("boom"));
}

#[tokio::test]
async fn test_other_provider_error_without_description_is_generic() {
    let github = Arc::new(SingleUseGitHub::failing_with("incorrect_client_credentials", None));

    let response = get(app(github), "/auth?code=whatever").await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Authentication failed");
}

#[tokio::test]
async fn test_replayed_code_never_succeeds_twice() {
    let github = Arc::new(SingleUseGitHub::default().issue("once", "abc123"));
    let app = app(github.clone());

    let first = get(app.clone(), "/auth?code=once").await;
    assert_eq!(first.status(), StatusCode::FOUND);
    assert_eq!(set_cookies(&first).len(), 1);

    let second = get(app, "/auth?code=once").await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert!(set_cookies(&second).is_empty());

    // one exchange per request, no retries
    assert_eq!(github.calls(), 2);
}

#[tokio::test]
async fn test_repeated_query_keys_still_reach_callback_branches() {
    let github = Arc::new(
        SingleUseGitHub::default()
            .issue("first", "abc123")
            .issue("second", "abc123"),
    );

    let response = get(app(github.clone()), "/auth?code=first&code=second").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/admin");
    assert_eq!(github.calls(), 1);

    let response = get(app(github), "/auth?error=a&error=access_denied").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("access_denied"));
}

#[tokio::test]
async fn test_flag_cookie_when_configured() {
    let github = Arc::new(SingleUseGitHub::default().issue("good-code", "abc123"));
    let mut config = test_config();
    config.session.authenticated_cookie = Some("github_authenticated".to_string());
    config.server.admin_path = "/dashboard".to_string();

    let response = get(
        router(AppState::new(config, github)),
        "/auth?code=good-code",
    )
    .await;

    assert_eq!(response.headers()[header::LOCATION], "/dashboard");
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().any(|c| c.starts_with("github_token=abc123")));
    assert!(cookies.iter().any(|c| c.starts_with("github_authenticated=true")));
}

#[tokio::test]
async fn test_health_and_metrics() {
    let github = Arc::new(SingleUseGitHub::default());

    let health = get(app(github.clone()), "/health").await;
    assert_eq!(health.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(health).await).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], ghgate::VERSION);

    // drive one callback so the counter family is present
    get(app(github.clone()), "/auth").await;
    let metrics = get(app(github), "/metrics").await;
    assert_eq!(metrics.status(), StatusCode::OK);
    assert!(body_text(metrics).await.contains("ghgate_callback_total"));
}
