use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{Datelike, Utc};
use serde::Deserialize;

use super::error::{ApiResult, require_self_or_staff, require_staff};
use crate::{
    auth::user::AuthSession,
    club::dues::{generate_monthly_cuotas, member_cuotas, member_debt, pay_cuota},
    router::AppState,
};

/// Billing period; defaults to the current month.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    year: Option<i32>,
    month: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentRequest {
    method: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/{id}/pay", post(pay))
        .route("/member/{member_id}", get(for_member))
        .route("/member/{member_id}/debt", get(debt))
}

pub async fn generate(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&auth_session)?;
    let today = Utc::now().date_naive();
    let report = generate_monthly_cuotas(
        &state.db,
        &state.fees,
        request.year.unwrap_or(today.year()),
        request.month.unwrap_or(today.month()),
        state.due_day,
    )
    .await?;
    let status = if report.created > 0 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(report)))
}

pub async fn pay(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<i32>,
    Json(request): Json<PaymentRequest>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&auth_session)?;
    let paid = pay_cuota(&state.db, id, request.method, Utc::now().naive_utc()).await?;
    Ok(Json(paid))
}

pub async fn for_member(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(member_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    require_self_or_staff(&auth_session, member_id)?;
    Ok(Json(member_cuotas(&state.db, member_id).await?))
}

pub async fn debt(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(member_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    require_self_or_staff(&auth_session, member_id)?;
    let summary = member_debt(&state.db, member_id, Utc::now().date_naive()).await?;
    Ok(Json(summary))
}
