use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use super::error::{ApiResult, require_self_or_staff, require_staff, require_user};
use crate::{
    auth::user::AuthSession,
    club::courts::{
        NewCourt, ReservationRequest, cancel_reservation, court_reservations, create_court,
        list_courts, reserve_court, upcoming_reservations,
    },
    router::AppState,
};

#[derive(Debug, Deserialize)]
pub struct DayParams {
    date: Option<NaiveDate>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(all_courts).post(create))
        .route("/{id}/reservations", get(day_sheet).post(reserve))
        .route("/reservations/{id}/cancel", post(cancel))
        .route("/reservations/member/{member_id}", get(upcoming))
}

pub async fn all_courts(
    State(state): State<AppState>,
    auth_session: AuthSession,
) -> ApiResult<impl IntoResponse> {
    require_user(&auth_session)?;
    Ok(Json(list_courts(&state.db).await?))
}

pub async fn create(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(input): Json<NewCourt>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&auth_session)?;
    let court = create_court(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(court)))
}

pub async fn day_sheet(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<i32>,
    Query(params): Query<DayParams>,
) -> ApiResult<impl IntoResponse> {
    require_user(&auth_session)?;
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    Ok(Json(court_reservations(&state.db, id, date).await?))
}

pub async fn reserve(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<i32>,
    Json(request): Json<ReservationRequest>,
) -> ApiResult<impl IntoResponse> {
    require_self_or_staff(&auth_session, request.member_id)?;
    let reservation = reserve_court(&state.db, id, request, Utc::now().naive_utc()).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

pub async fn cancel(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let actor = require_user(&auth_session)?;
    Ok(Json(cancel_reservation(&state.db, id, &actor).await?))
}

pub async fn upcoming(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(member_id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    require_self_or_staff(&auth_session, member_id)?;
    let reservations =
        upcoming_reservations(&state.db, member_id, Utc::now().naive_utc()).await?;
    Ok(Json(reservations))
}
