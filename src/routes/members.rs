use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;

use super::error::{ApiResult, require_self_or_staff, require_staff, require_user};
use crate::{
    auth::user::AuthSession,
    club::{
        ClubError,
        billing::compute_monthly_fee,
        family::{
            FamilyMemberInput, convert_family_to_individual, convert_individual_to_family,
            remove_member,
        },
        members::{MemberUpdate, NewMember, find_member, list_members, register_member, update_member},
        notify::{ChangeNotice, dispatch},
    },
    entities::member::Role,
    router::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(flatten)]
    pub member: NewMember,
    #[serde(default)]
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct FamilyRequest {
    pub members: Vec<FamilyMemberInput>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(all_members).post(register))
        .route("/{id}", get(show).patch(update).delete(remove))
        .route("/{id}/fee", get(fee))
        .route("/{id}/individual", post(to_individual))
        .route("/{id}/family", post(to_family))
}

pub async fn all_members(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Query(params): Query<ListParams>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&auth_session)?;
    let members = list_members(&state.db, params.role).await?;
    Ok(Json(members))
}

/// Staff registration. Only a super admin may create other staff accounts.
pub async fn register(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let actor = require_staff(&auth_session)?;
    let role = request.role.unwrap_or(Role::Socio);
    if role.is_staff() && actor.role != Role::SuperAdmin {
        return Err(ClubError::Forbidden.into());
    }
    let today = Utc::now().date_naive();
    let member = register_member(&state.db, request.member, role, today).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn show(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    require_self_or_staff(&auth_session, id)?;
    let member = find_member(&state.db, id).await?;
    Ok(Json(member))
}

pub async fn update(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<i32>,
    Json(changes): Json<MemberUpdate>,
) -> ApiResult<impl IntoResponse> {
    require_self_or_staff(&auth_session, id)?;
    let member = update_member(&state.db, id, changes, Utc::now().date_naive()).await?;
    Ok(Json(member))
}

pub async fn remove(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    let actor = require_staff(&auth_session)?;
    if actor.id == id {
        return Err(ClubError::Forbidden.into());
    }
    let report = remove_member(&state.db, id, Utc::now().date_naive()).await?;
    dispatch(state.notifier.as_ref(), ChangeNotice::from(&report)).await;
    Ok(Json(report))
}

pub async fn fee(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    require_self_or_staff(&auth_session, id)?;
    let quote = compute_monthly_fee(&state.db, &state.fees, id).await?;
    Ok(Json(quote))
}

pub async fn to_individual(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<i32>,
) -> ApiResult<impl IntoResponse> {
    require_self_or_staff(&auth_session, id)?;
    let report = convert_family_to_individual(&state.db, id, Utc::now().date_naive()).await?;
    dispatch(state.notifier.as_ref(), ChangeNotice::from(&report)).await;
    Ok(Json(report))
}

pub async fn to_family(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(id): Path<i32>,
    Json(request): Json<FamilyRequest>,
) -> ApiResult<impl IntoResponse> {
    let actor = require_self_or_staff(&auth_session, id)?;
    // Only staff may pull socios who already have their own plan.
    if !actor.role.is_staff()
        && request
            .members
            .iter()
            .any(|m| matches!(m, FamilyMemberInput::Existing { .. }))
    {
        return Err(ClubError::Forbidden.into());
    }
    let created =
        convert_individual_to_family(&state.db, id, request.members, Utc::now().date_naive())
            .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// The logged-in member's own record.
pub async fn whoami(auth_session: AuthSession) -> ApiResult<impl IntoResponse> {
    Ok(Json(require_user(&auth_session)?))
}
