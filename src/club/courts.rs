//! Courts and reservations.
//!
//! Reservation windows are half-open: a booking ending at 10:00 does not
//! clash with one starting at 10:00.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr, TransactionTrait,
};
use serde::Deserialize;
use tracing::info;

use super::dues::summarize_debt;
use super::error::{ClubError, ClubResult};
use super::members::find_member;
use super::validation::{Violations, validate_name};
use crate::entities::{
    court, cuota,
    member::{self, Role},
    reservation,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewCourt {
    pub name: String,
    pub sport: String,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest {
    pub member_id: i32,
    pub starts_at: NaiveDateTime,
    pub ends_at: NaiveDateTime,
}

/// Half-open interval overlap.
pub fn overlaps(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Checks a requested window against the court's hours and the clock.
pub fn check_window(
    court: &court::Model,
    starts_at: NaiveDateTime,
    ends_at: NaiveDateTime,
    now: NaiveDateTime,
) -> ClubResult<()> {
    let mut violations = Violations::new();
    if ends_at <= starts_at {
        violations.push("ends_at", "must be after starts_at");
    } else if starts_at.date() != ends_at.date() {
        violations.push("ends_at", "must be on the same day as starts_at");
    } else if starts_at.time() < court.opens_at || ends_at.time() > court.closes_at {
        violations.push(
            "starts_at",
            format!(
                "court is open from {} to {}",
                court.opens_at.format("%H:%M"),
                court.closes_at.format("%H:%M")
            ),
        );
    }
    if starts_at < now {
        violations.push("starts_at", "cannot be in the past");
    }
    violations.finish()
}

pub async fn create_court(db: &DatabaseConnection, input: NewCourt) -> ClubResult<court::Model> {
    let name = input.name.trim().to_string();
    let sport = input.sport.trim().to_string();

    let mut violations = Violations::new();
    violations.check("name", validate_name(&name));
    violations.check("sport", validate_name(&sport));
    if input.closes_at <= input.opens_at {
        violations.push("closes_at", "must be after opens_at");
    }
    violations.finish()?;

    let taken = court::Entity::find()
        .filter(court::Column::Name.eq(name.as_str()))
        .one(db)
        .await?;
    if taken.is_some() {
        return Err(ClubError::DuplicateCourt { name });
    }

    let now = Utc::now().naive_utc();
    let created = court::ActiveModel {
        name: Set(name.clone()),
        sport: Set(sport),
        opens_at: Set(input.opens_at),
        closes_at: Set(input.closes_at),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ClubError::DuplicateCourt {
            name: name.clone(),
        },
        _ => ClubError::Database(e),
    })?;

    info!(court_id = created.id, "Created court");
    Ok(created)
}

pub async fn list_courts(db: &DatabaseConnection) -> ClubResult<Vec<court::Model>> {
    Ok(court::Entity::find()
        .filter(court::Column::Active.eq(true))
        .order_by_asc(court::Column::Name)
        .all(db)
        .await?)
}

pub async fn find_court<C: sea_orm::ConnectionTrait>(
    conn: &C,
    court_id: i32,
) -> ClubResult<court::Model> {
    court::Entity::find_by_id(court_id)
        .one(conn)
        .await?
        .filter(|c| c.active)
        .ok_or(ClubError::CourtNotFound { id: court_id })
}

/// Books a court for a socio. The window must fit the court's hours, and
/// neither the court nor the socio may already be booked in it. Socios with
/// overdue cuotas cannot book.
pub async fn reserve_court(
    db: &DatabaseConnection,
    court_id: i32,
    request: ReservationRequest,
    now: NaiveDateTime,
) -> ClubResult<reservation::Model> {
    let ReservationRequest {
        member_id,
        starts_at,
        ends_at,
    } = request;

    let txn = db.begin().await?;
    let court = find_court(&txn, court_id).await?;
    let member = find_member(&txn, member_id).await?;
    if member.role != Role::Socio {
        return Err(ClubError::NotASocio { dni: member.dni });
    }
    check_window(&court, starts_at, ends_at, now)?;

    let cuotas = cuota::Entity::find()
        .filter(cuota::Column::MemberId.eq(member_id))
        .all(&txn)
        .await?;
    let debt = summarize_debt(member_id, &cuotas, now.date());
    if debt.has_overdue() {
        return Err(ClubError::OutstandingDebt {
            member_id,
            overdue_total: debt.overdue_total,
        });
    }

    let day_start = starts_at.date().and_time(NaiveTime::MIN);
    let same_day = reservation::Entity::find()
        .filter(reservation::Column::Cancelled.eq(false))
        .filter(
            reservation::Column::CourtId
                .eq(court_id)
                .or(reservation::Column::MemberId.eq(member_id)),
        )
        .filter(reservation::Column::StartsAt.gte(day_start))
        .filter(reservation::Column::StartsAt.lt(day_start + Duration::days(1)))
        .all(&txn)
        .await?;
    let clash = same_day
        .into_iter()
        .find(|r| overlaps(r.starts_at, r.ends_at, starts_at, ends_at));
    if let Some(existing) = clash {
        return Err(ClubError::ScheduleConflict {
            starts_at: existing.starts_at,
            ends_at: existing.ends_at,
        });
    }

    let created = reservation::ActiveModel {
        court_id: Set(court_id),
        member_id: Set(member_id),
        starts_at: Set(starts_at),
        ends_at: Set(ends_at),
        cancelled: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(
        reservation_id = created.id,
        court_id,
        member_id,
        "Reserved court"
    );
    Ok(created)
}

/// Cancels a reservation on behalf of its owner or a staff member.
pub async fn cancel_reservation(
    db: &DatabaseConnection,
    reservation_id: i32,
    actor: &member::Model,
) -> ClubResult<reservation::Model> {
    let existing = reservation::Entity::find_by_id(reservation_id)
        .one(db)
        .await?
        .ok_or(ClubError::ReservationNotFound { id: reservation_id })?;
    if existing.member_id != actor.id && !actor.role.is_staff() {
        return Err(ClubError::Forbidden);
    }
    if existing.cancelled {
        return Ok(existing);
    }

    let mut active: reservation::ActiveModel = existing.into();
    active.cancelled = Set(true);
    active.updated_at = Set(Utc::now().naive_utc());
    let cancelled = active.update(db).await?;

    info!(reservation_id, "Cancelled reservation");
    Ok(cancelled)
}

/// Active reservations of a court on one day, in time order.
pub async fn court_reservations(
    db: &DatabaseConnection,
    court_id: i32,
    date: NaiveDate,
) -> ClubResult<Vec<reservation::Model>> {
    find_court(db, court_id).await?;
    let day_start = date.and_time(NaiveTime::MIN);
    let next_day = day_start + Duration::days(1);
    Ok(reservation::Entity::find()
        .filter(reservation::Column::CourtId.eq(court_id))
        .filter(reservation::Column::Cancelled.eq(false))
        .filter(reservation::Column::StartsAt.gte(day_start))
        .filter(reservation::Column::StartsAt.lt(next_day))
        .order_by_asc(reservation::Column::StartsAt)
        .all(db)
        .await?)
}

/// Active reservations of a member that have not ended yet.
pub async fn upcoming_reservations(
    db: &DatabaseConnection,
    member_id: i32,
    now: NaiveDateTime,
) -> ClubResult<Vec<reservation::Model>> {
    Ok(reservation::Entity::find()
        .filter(reservation::Column::MemberId.eq(member_id))
        .filter(reservation::Column::Cancelled.eq(false))
        .filter(reservation::Column::EndsAt.gt(now))
        .order_by_asc(reservation::Column::StartsAt)
        .all(db)
        .await?)
}
