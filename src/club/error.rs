use chrono::NaiveDateTime;
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;

use crate::auth::password::PasswordError;

pub type ClubResult<T> = Result<T, ClubError>;

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClubError {
    #[error("identity number {dni} is already registered")]
    DuplicateIdentity { dni: String },

    #[error("email {email} is already registered")]
    DuplicateEmail { email: String },

    #[error("a family plan needs at least {minimum} members, got {actual}")]
    InsufficientGroupSize { minimum: usize, actual: usize },

    #[error("member {dni} already belongs to a family plan")]
    AlreadyInFamilyPlan { dni: String },

    #[error("member {reference} not found")]
    MemberNotFound { reference: String },

    #[error("member {dni} is {age} years old, the minimum is {minimum}")]
    InvalidAge { dni: String, age: u32, minimum: u32 },

    #[error("member {dni} is not a socio")]
    NotASocio { dni: String },

    #[error("member {dni} is not a coach")]
    NotACoach { dni: String },

    #[error("member {dni} is not on a family plan")]
    NotInFamilyPlan { dni: String },

    #[error("invalid input")]
    Validation(Vec<FieldError>),

    #[error("cuota {id} not found")]
    CuotaNotFound { id: i32 },

    #[error("cuota {id} is already paid")]
    CuotaAlreadyPaid { id: i32 },

    #[error("member {member_id} owes {overdue_total} in overdue cuotas")]
    OutstandingDebt { member_id: i32, overdue_total: i64 },

    #[error("court {id} not found")]
    CourtNotFound { id: i32 },

    #[error("court name {name} is already taken")]
    DuplicateCourt { name: String },

    #[error("reservation {id} not found")]
    ReservationNotFound { id: i32 },

    #[error("requested slot overlaps a reservation from {starts_at} to {ends_at}")]
    ScheduleConflict {
        starts_at: NaiveDateTime,
        ends_at: NaiveDateTime,
    },

    #[error("practice {id} not found")]
    PracticeNotFound { id: i32 },

    #[error("practice {id} is full ({capacity} places)")]
    PracticeFull { id: i32, capacity: i32 },

    #[error("time slot overlaps practice {practice_id}")]
    PracticeOverlap { practice_id: i32 },

    #[error("member {member_id} is already enrolled in practice {practice_id}")]
    AlreadyEnrolled { practice_id: i32, member_id: i32 },

    #[error("member {member_id} is not enrolled in practice {practice_id}")]
    NotEnrolled { practice_id: i32, member_id: i32 },

    #[error("operation not allowed for this member")]
    Forbidden,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Database(#[from] DbErr),
}

impl ClubError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ClubError::DuplicateIdentity { .. } => "DuplicateIdentity",
            ClubError::DuplicateEmail { .. } => "DuplicateEmail",
            ClubError::InsufficientGroupSize { .. } => "InsufficientGroupSize",
            ClubError::AlreadyInFamilyPlan { .. } => "AlreadyInFamilyPlan",
            ClubError::MemberNotFound { .. } => "MemberNotFound",
            ClubError::InvalidAge { .. } => "InvalidAge",
            ClubError::NotASocio { .. } => "NotASocio",
            ClubError::NotACoach { .. } => "NotACoach",
            ClubError::NotInFamilyPlan { .. } => "NotInFamilyPlan",
            ClubError::Validation(_) => "Validation",
            ClubError::CuotaNotFound { .. } => "CuotaNotFound",
            ClubError::CuotaAlreadyPaid { .. } => "CuotaAlreadyPaid",
            ClubError::OutstandingDebt { .. } => "OutstandingDebt",
            ClubError::CourtNotFound { .. } => "CourtNotFound",
            ClubError::DuplicateCourt { .. } => "DuplicateCourt",
            ClubError::ReservationNotFound { .. } => "ReservationNotFound",
            ClubError::ScheduleConflict { .. } => "ScheduleConflict",
            ClubError::PracticeNotFound { .. } => "PracticeNotFound",
            ClubError::PracticeFull { .. } => "PracticeFull",
            ClubError::PracticeOverlap { .. } => "PracticeOverlap",
            ClubError::AlreadyEnrolled { .. } => "AlreadyEnrolled",
            ClubError::NotEnrolled { .. } => "NotEnrolled",
            ClubError::Forbidden => "Forbidden",
            ClubError::Password(_) | ClubError::Database(_) => "Internal",
        }
    }

    /// Offending input field, when the error points at one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ClubError::DuplicateIdentity { .. } | ClubError::AlreadyInFamilyPlan { .. } => {
                Some("dni")
            }
            ClubError::DuplicateEmail { .. } => Some("email"),
            ClubError::InsufficientGroupSize { .. } => Some("members"),
            ClubError::InvalidAge { .. } => Some("birth_date"),
            ClubError::DuplicateCourt { .. } => Some("name"),
            ClubError::ScheduleConflict { .. } | ClubError::PracticeOverlap { .. } => {
                Some("starts_at")
            }
            _ => None,
        }
    }

    pub fn member_not_found(reference: impl ToString) -> Self {
        ClubError::MemberNotFound {
            reference: reference.to_string(),
        }
    }
}

/// Translates a unique-index violation raised while writing a member row
/// into the matching domain error. Anything else stays a database error.
pub(crate) fn member_write_error(err: DbErr, dni: &str, email: Option<&str>) -> ClubError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) if message.contains("email") => {
            ClubError::DuplicateEmail {
                email: email.unwrap_or_default().to_string(),
            }
        }
        Some(SqlErr::UniqueConstraintViolation(_)) => ClubError::DuplicateIdentity {
            dni: dni.to_string(),
        },
        _ => ClubError::Database(err),
    }
}
