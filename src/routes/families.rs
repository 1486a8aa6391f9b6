use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use super::error::{ApiResult, require_staff, require_user};
use crate::{
    auth::user::AuthSession,
    club::{
        ClubError,
        family::{FamilyMemberInput, create_family_group, family_group},
    },
    router::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CreateFamilyRequest {
    pub head: FamilyMemberInput,
    pub members: Vec<FamilyMemberInput>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/{group_id}", get(show))
}

pub async fn create(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(request): Json<CreateFamilyRequest>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&auth_session)?;
    let created = create_family_group(
        &state.db,
        request.head,
        request.members,
        Utc::now().date_naive(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Staff see any group; a socio only their own.
pub async fn show(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(group_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = require_user(&auth_session)?;
    if !user.role.is_staff() && user.family_group_id != Some(group_id) {
        return Err(ClubError::Forbidden.into());
    }
    let members = family_group(&state.db, group_id).await?;
    if members.is_empty() {
        return Err(ClubError::member_not_found(group_id).into());
    }
    Ok(Json(members))
}
