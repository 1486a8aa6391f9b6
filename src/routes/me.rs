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
    age::calculate_age,
    billing::{FeeQuote, compute_monthly_fee},
    family::family_group,
};
use crate::entities::member;
use crate::{auth::user::AuthSession, router::AppState};

struct Profile {
    fee: Option<FeeQuote>,
    family: Vec<member::Model>,
}

async fn load_profile(state: &AppState, user: &member::Model) -> ClubResult<Profile> {
    // Staff have no plan, so no fee.
    let fee = match user.membership_type {
        Some(_) => Some(compute_monthly_fee(&state.db, &state.fees, user.id).await?),
        None => None,
    };
    let family = match user.family_group_id {
        Some(group_id) => family_group(&state.db, group_id).await?,
        None => Vec::new(),
    };
    Ok(Profile { fee, family })
}

pub async fn me(State(state): State<AppState>, auth_session: AuthSession) -> impl IntoResponse {
    let Some(user) = auth_session.user else {
        return Redirect::to("/login?next=/me").into_response();
    };

    let profile = match load_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(e) => {
            error!(member_id = user.id, error = %e, "Failed to load profile");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let age = calculate_age(user.birth_date, Utc::now().date_naive());
    let registered_at = user.registered_at.format("%Y-%m-%d").to_string();
    render(
        &state,
        "me.html",
        minijinja::context! {
            active => "me",
            member => user,
            age => age,
            fee => profile.fee,
            family => profile.family,
            registered_at => registered_at,
        },
    )
}
