//! JSON error responses and the access checks shared by the API handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::auth::user::AuthSession;
use crate::club::{ClubError, FieldError};
use crate::entities::member;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("login required")]
    Unauthorized,

    #[error(transparent)]
    Club(#[from] ClubError),
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    field: Option<&'static str>,
    message: String,
    errors: Vec<FieldError>,
}

pub fn status_of(err: &ClubError) -> StatusCode {
    match err {
        ClubError::DuplicateIdentity { .. }
        | ClubError::DuplicateEmail { .. }
        | ClubError::AlreadyInFamilyPlan { .. }
        | ClubError::CuotaAlreadyPaid { .. }
        | ClubError::DuplicateCourt { .. }
        | ClubError::ScheduleConflict { .. }
        | ClubError::PracticeFull { .. }
        | ClubError::PracticeOverlap { .. }
        | ClubError::AlreadyEnrolled { .. } => StatusCode::CONFLICT,
        ClubError::Validation(_)
        | ClubError::InsufficientGroupSize { .. }
        | ClubError::InvalidAge { .. }
        | ClubError::NotASocio { .. }
        | ClubError::NotACoach { .. }
        | ClubError::NotInFamilyPlan { .. }
        | ClubError::NotEnrolled { .. }
        | ClubError::OutstandingDebt { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ClubError::MemberNotFound { .. }
        | ClubError::CuotaNotFound { .. }
        | ClubError::CourtNotFound { .. }
        | ClubError::ReservationNotFound { .. }
        | ClubError::PracticeNotFound { .. } => StatusCode::NOT_FOUND,
        ClubError::Forbidden => StatusCode::FORBIDDEN,
        ClubError::Password(_) | ClubError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::Unauthorized => {
                let body = ErrorBody {
                    kind: "Unauthorized",
                    field: None,
                    message: "login required".to_string(),
                    errors: vec![],
                };
                return (StatusCode::UNAUTHORIZED, Json(body)).into_response();
            }
            ApiError::Club(err) => err,
        };

        let status = status_of(&err);
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %err, "Request failed");
            "internal error".to_string()
        } else {
            err.to_string()
        };
        let body = ErrorBody {
            kind: err.kind(),
            field: err.field(),
            message,
            errors: match err {
                ClubError::Validation(errors) => errors,
                _ => vec![],
            },
        };
        (status, Json(body)).into_response()
    }
}

pub fn require_user(auth_session: &AuthSession) -> ApiResult<member::Model> {
    auth_session.user.clone().ok_or(ApiError::Unauthorized)
}

pub fn require_staff(auth_session: &AuthSession) -> ApiResult<member::Model> {
    let user = require_user(auth_session)?;
    if user.role.is_staff() {
        Ok(user)
    } else {
        Err(ClubError::Forbidden.into())
    }
}

/// A socio may act on their own record; staff on anyone's.
pub fn require_self_or_staff(
    auth_session: &AuthSession,
    member_id: i32,
) -> ApiResult<member::Model> {
    let user = require_user(auth_session)?;
    if user.id == member_id || user.role.is_staff() {
        Ok(user)
    } else {
        Err(ClubError::Forbidden.into())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::DbErr;

    use super::*;

    #[tokio::test]
    async fn test_duplicate_maps_to_conflict() {
        let response = ApiError::from(ClubError::DuplicateEmail {
            email: "ana@club.com".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(&ClubError::InsufficientGroupSize {
                minimum: 3,
                actual: 2
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(&ClubError::member_not_found("12345678")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(&ClubError::Database(DbErr::Custom("down".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_unauthorized_response() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
