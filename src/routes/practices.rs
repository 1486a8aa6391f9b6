use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use super::error::{ApiResult, require_self_or_staff, require_staff, require_user};
use crate::{
    auth::user::AuthSession,
    club::{
        ClubError,
        practices::{
            NewPractice, create_practice, enroll, find_practice, list_practices,
            practice_attendance, practice_roster, record_attendance, unenroll,
        },
    },
    entities::member,
    router::AppState,
};

#[derive(Debug, Deserialize)]
pub struct EnrollmentRequest {
    member_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceRequest {
    present: Vec<i32>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(all_practices).post(create))
        .route("/{id}/enrollments", get(roster).post(join))
        .route("/{id}/enrollments/{member_id}", delete(leave))
        .route("/{id}/attendance/{date}", get(attendance).put(take_attendance))
}

/// Staff or the coach running the practice.
async fn require_coach_or_staff(
    state: &AppState,
    auth_session: &AuthSession,
    practice_id: i32,
) -> ApiResult<member::Model> {
    let user = require_user(auth_session)?;
    let practice = find_practice(&state.db, practice_id).await?;
    if user.role.is_staff() || practice.coach_id == user.id {
        Ok(user)
    } else {
        Err(ClubError::Forbidden.into())
    }
}

pub async fn all_practices(
    State(state): State<AppState>,
    auth_session: AuthSession,
) -> ApiResult<impl IntoResponse> {
    require_user(&auth_session)?;
    Ok(Json(list_practices(&state.db).await?))
}

pub async fn create(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(input): Json<NewPractice>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&auth_session)?;
    let practice = create_practice(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(practice)))
}

pub async fn roster(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    require_coach_or_staff(&state, &auth_session, id).await?;
    Ok(Json(practice_roster(&state.db, id).await?))
}

pub async fn join(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<i32>,
    Json(request): Json<EnrollmentRequest>,
) -> ApiResult<impl IntoResponse> {
    require_self_or_staff(&auth_session, request.member_id)?;
    let enrollment = enroll(&state.db, id, request.member_id, Utc::now().naive_utc()).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

pub async fn leave(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path((id, member_id)): Path<(i32, i32)>,
) -> ApiResult<impl IntoResponse> {
    require_self_or_staff(&auth_session, member_id)?;
    unenroll(&state.db, id, member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn attendance(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path((id, date)): Path<(i32, NaiveDate)>,
) -> ApiResult<impl IntoResponse> {
    require_coach_or_staff(&state, &auth_session, id).await?;
    Ok(Json(practice_attendance(&state.db, id, date).await?))
}

pub async fn take_attendance(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path((id, date)): Path<(i32, NaiveDate)>,
    Json(request): Json<AttendanceRequest>,
) -> ApiResult<impl IntoResponse> {
    require_coach_or_staff(&state, &auth_session, id).await?;
    let sheet = record_attendance(&state.db, id, date, &request.present).await?;
    Ok(Json(sheet))
}
