/// Callback outcomes and the cookies/redirects they turn into
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::AccessToken;
use crate::config::{Config, SessionConfig};
use crate::error::AuthError;

/// Terminal result of one callback request
#[derive(Debug)]
pub enum CallbackOutcome {
    /// No code yet: send the visitor to GitHub's consent screen
    RedirectToProvider(String),
    /// Code exchanged: persist the token and enter the admin area
    SignedIn(AccessToken),
    Failed(AuthError),
}

impl CallbackOutcome {
    /// Metrics label
    pub fn label(&self) -> &'static str {
        match self {
            CallbackOutcome::RedirectToProvider(_) => "redirect",
            CallbackOutcome::SignedIn(_) => "signed_in",
            CallbackOutcome::Failed(err) => err.kind(),
        }
    }

    /// Cookies are only added on `SignedIn`
    pub fn into_response(self, jar: CookieJar, config: &Config) -> Response {
        match self {
            CallbackOutcome::RedirectToProvider(url) => found(url),
            CallbackOutcome::SignedIn(token) => {
                let mut jar = jar.add(session_cookie(
                    &config.session,
                    config.session.token_cookie.clone(),
                    token.secret().to_string(),
                ));

                if let Some(flag) = &config.session.authenticated_cookie {
                    jar = jar.add(session_cookie(&config.session, flag.clone(), "true".to_string()));
                }

                (jar, found(config.server.admin_path.clone())).into_response()
            }
            CallbackOutcome::Failed(err) => err.into_response(),
        }
    }
}

/// 302 Found (axum's `Redirect` only offers 303/307/308)
pub fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn session_cookie(session: &SessionConfig, name: String, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(session.secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(session.max_age_secs))
        .build()
}
