use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use chrono::Utc;
use tracing::error;

use super::render;
use crate::club::{
    ClubResult,
    courts::upcoming_reservations,
    dues::{DebtSummary, member_debt},
    practices::coach_practices,
};
use crate::entities::{
    member::{self, Role},
    practice, reservation,
};
use crate::{auth::user::AuthSession, router::AppState};

#[derive(Default)]
struct Overview {
    debt: Option<DebtSummary>,
    reservations: Vec<reservation::Model>,
    coaching: Vec<practice::Model>,
}

async fn load_overview(state: &AppState, user: &member::Model) -> ClubResult<Overview> {
    let now = Utc::now().naive_utc();
    let mut overview = Overview::default();
    match user.role {
        Role::Socio => {
            overview.debt = Some(member_debt(&state.db, user.id, now.date()).await?);
            overview.reservations = upcoming_reservations(&state.db, user.id, now).await?;
        }
        Role::Entrenador => {
            overview.coaching = coach_practices(&state.db, user.id).await?;
        }
        Role::Admin | Role::SuperAdmin => {}
    }
    Ok(overview)
}

pub async fn dashboard(
    State(state): State<AppState>,
    auth_session: AuthSession,
) -> impl IntoResponse {
    let Some(user) = auth_session.user else {
        return Redirect::to("/login?next=/dashboard").into_response();
    };

    let overview = match load_overview(&state, &user).await {
        Ok(overview) => overview,
        Err(e) => {
            error!(member_id = user.id, error = %e, "Failed to load dashboard");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let is_staff = user.role.is_staff();
    render(
        &state,
        "dashboard.html",
        minijinja::context! {
            active => "dashboard",
            member => user,
            is_staff => is_staff,
            debt => overview.debt,
            reservations => overview.reservations,
            coaching => overview.coaching,
        },
    )
}
