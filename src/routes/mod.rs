pub mod courts;
pub mod dashboard;
pub mod dues;
pub mod error;
pub mod families;
pub mod me;
pub mod members;
pub mod practices;

use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use tracing::error;

use crate::router::AppState;

/// The JSON API, mounted under `/api`.
pub fn api() -> Router<AppState> {
    Router::new()
        .route("/me", get(members::whoami))
        .nest("/members", members::routes())
        .nest("/families", families::routes())
        .nest("/cuotas", dues::routes())
        .nest("/courts", courts::routes())
        .nest("/practices", practices::routes())
}

pub(crate) fn render(state: &AppState, template: &str, ctx: minijinja::Value) -> Response {
    let rendered = state
        .templates
        .get_template(template)
        .and_then(|tmpl| tmpl.render(ctx));
    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!(template, error = %e, "Failed to render template");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
