use axum::Form;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::{blocking, store_error};
use crate::auth::{self, SESSION_COOKIE, Session};
use crate::server::AppState;
use crate::server::pages;
use crate::server::response::ApiError;

const INVALID_LOGIN: &str = "Invalid username or password";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login_page(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if current_session(&state, &headers).is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    Html(pages::login_page(None).into_string()).into_response()
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let username = form.username.trim().to_string();
    if username.is_empty() || form.password.is_empty() {
        return Ok(rejected_login());
    }

    let db = state.db.clone();
    let name = username.clone();
    let user = blocking(move || {
        db.find_user(&name).map(|user| {
            user.filter(|u| auth::verify_password(&u.password_hash, &form.password))
        })
    })
    .await?
    .map_err(store_error)?;

    let Some(user) = user else {
        warn!(username, "failed login");
        return Ok(rejected_login());
    };

    let token = state
        .sessions
        .create(&user)
        .map_err(|e| ApiError::internal(e.to_string()))?;
    info!(username, tier = %user.tier, "logged in");

    let cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.sessions.ttl().as_secs()
    );
    Ok(with_cookie(Redirect::to("/dashboard").into_response(), &cookie))
}

pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(session) = session_token(&headers).and_then(|t| state.sessions.remove(t)) {
        info!(username = %session.username, "logged out");
    }
    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    with_cookie(Redirect::to("/login").into_response(), &cookie)
}

pub async fn dashboard(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    match current_session(&state, &headers) {
        Some(session) => Html(pages::dashboard_page(&session).into_string()).into_response(),
        None => Redirect::to("/login").into_response(),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(auth::token_from_cookie_header)
}

fn current_session(state: &AppState, headers: &HeaderMap) -> Option<Session> {
    session_token(headers).and_then(|token| state.sessions.get(token))
}

fn rejected_login() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Html(pages::login_page(Some(INVALID_LOGIN)).into_string()),
    )
        .into_response()
}

fn with_cookie(mut response: Response, cookie: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}
