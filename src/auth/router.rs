use axum::{
    Form, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::error;

use super::user::{AuthSession, Credentials};
use crate::{router::AppState, routes::render};

// This allows us to extract the "next" field from the query string. We use this
// to redirect after log in.
#[derive(Debug, Deserialize)]
pub struct NextUrl {
    next: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(self::post::login))
        .route("/login", get(self::get::login))
        .route("/logout", get(self::get::logout))
}

fn render_login(state: &AppState, next: Option<String>, failed: bool) -> Response {
    render(
        state,
        "login.html",
        minijinja::context! {
            next => next,
            failed => failed,
        },
    )
}

/// Only same-site paths are followed after login.
fn safe_next(next: Option<String>) -> Option<String> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//"))
}

mod post {
    use super::*;

    pub async fn login(
        State(state): State<AppState>,
        mut auth_session: AuthSession,
        Form(creds): Form<Credentials>,
    ) -> impl IntoResponse {
        let next = safe_next(creds.next.clone());
        let user = match auth_session.authenticate(creds).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                let mut response = render_login(&state, next, true);
                *response.status_mut() = StatusCode::UNAUTHORIZED;
                return response;
            }
            Err(e) => {
                error!(error = %e, "Authentication failed");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

        if auth_session.login(&user).await.is_err() {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }

        match next {
            Some(next) => Redirect::to(&next).into_response(),
            None => Redirect::to("/dashboard").into_response(),
        }
    }
}

mod get {
    use super::*;

    pub async fn login(
        State(state): State<AppState>,
        Query(NextUrl { next }): Query<NextUrl>,
    ) -> impl IntoResponse {
        render_login(&state, safe_next(next), false)
    }

    pub async fn logout(mut auth_session: AuthSession) -> impl IntoResponse {
        match auth_session.logout().await {
            Ok(_) => Redirect::to("/login").into_response(),
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::safe_next;

    #[test]
    fn test_next_must_stay_on_site() {
        assert_eq!(safe_next(Some("/me".into())), Some("/me".into()));
        assert_eq!(safe_next(Some("//evil.example".into())), None);
        assert_eq!(safe_next(Some("https://evil.example".into())), None);
        assert_eq!(safe_next(None), None);
    }
}
