//! Weekly coached practices: enrollment against a fixed cupo and attendance.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::courts::find_court;
use super::error::{ClubError, ClubResult};
use super::members::find_member;
use super::validation::{Violations, validate_name};
use crate::entities::{
    attendance, enrollment,
    member::{self, Role},
    practice,
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewPractice {
    pub name: String,
    pub sport: String,
    pub coach_id: i32,
    pub court_id: Option<i32>,
    /// 0 = Monday .. 6 = Sunday
    pub weekday: i32,
    pub starts_at: NaiveTime,
    pub ends_at: NaiveTime,
    pub capacity: i32,
}

/// Attendance sheet of one practice day.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceSheet {
    pub practice_id: i32,
    pub date: NaiveDate,
    pub present: Vec<i32>,
    pub absent: Vec<i32>,
}

fn weekday_of(date: NaiveDate) -> i32 {
    date.weekday().num_days_from_monday() as i32
}

fn slots_overlap(a: (NaiveTime, NaiveTime), b: (NaiveTime, NaiveTime)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

fn check_new_practice(input: &NewPractice) -> ClubResult<()> {
    let mut violations = Violations::new();
    violations.check("name", validate_name(&input.name));
    violations.check("sport", validate_name(&input.sport));
    if !(0..=6).contains(&input.weekday) {
        violations.push("weekday", "must be between 0 (Monday) and 6 (Sunday)");
    }
    if input.ends_at <= input.starts_at {
        violations.push("ends_at", "must be after starts_at");
    }
    if input.capacity < 1 {
        violations.push("capacity", "must be at least 1");
    }
    violations.finish()
}

/// Neither the coach nor the court may hold another practice in the same
/// weekly slot.
pub async fn create_practice(
    db: &DatabaseConnection,
    input: NewPractice,
) -> ClubResult<practice::Model> {
    check_new_practice(&input)?;

    let txn = db.begin().await?;
    let coach = find_member(&txn, input.coach_id).await?;
    if coach.role != Role::Entrenador {
        return Err(ClubError::NotACoach { dni: coach.dni });
    }
    if let Some(court_id) = input.court_id {
        find_court(&txn, court_id).await?;
    }

    let mut sharing = Condition::any().add(practice::Column::CoachId.eq(coach.id));
    if let Some(court_id) = input.court_id {
        sharing = sharing.add(practice::Column::CourtId.eq(court_id));
    }
    let same_day = practice::Entity::find()
        .filter(sharing)
        .filter(practice::Column::Weekday.eq(input.weekday))
        .all(&txn)
        .await?;
    if let Some(clash) = same_day
        .iter()
        .find(|p| slots_overlap((p.starts_at, p.ends_at), (input.starts_at, input.ends_at)))
    {
        return Err(ClubError::PracticeOverlap {
            practice_id: clash.id,
        });
    }

    let now = Utc::now().naive_utc();
    let created = practice::ActiveModel {
        name: Set(input.name.trim().to_string()),
        sport: Set(input.sport.trim().to_string()),
        coach_id: Set(coach.id),
        court_id: Set(input.court_id),
        weekday: Set(input.weekday),
        starts_at: Set(input.starts_at),
        ends_at: Set(input.ends_at),
        capacity: Set(input.capacity),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(practice_id = created.id, coach_id = coach.id, "Created practice");
    Ok(created)
}

pub async fn list_practices(db: &DatabaseConnection) -> ClubResult<Vec<practice::Model>> {
    Ok(practice::Entity::find()
        .order_by_asc(practice::Column::Weekday)
        .order_by_asc(practice::Column::StartsAt)
        .all(db)
        .await?)
}

pub async fn coach_practices(
    db: &DatabaseConnection,
    coach_id: i32,
) -> ClubResult<Vec<practice::Model>> {
    Ok(practice::Entity::find()
        .filter(practice::Column::CoachId.eq(coach_id))
        .order_by_asc(practice::Column::Weekday)
        .order_by_asc(practice::Column::StartsAt)
        .all(db)
        .await?)
}

pub async fn find_practice<C: sea_orm::ConnectionTrait>(
    conn: &C,
    practice_id: i32,
) -> ClubResult<practice::Model> {
    practice::Entity::find_by_id(practice_id)
        .one(conn)
        .await?
        .ok_or(ClubError::PracticeNotFound { id: practice_id })
}

/// Enrolls a socio. The practice row is read under lock and the enrollment
/// count re-read inside the transaction so two requests cannot both take
/// the last place.
pub async fn enroll(
    db: &DatabaseConnection,
    practice_id: i32,
    member_id: i32,
    now: NaiveDateTime,
) -> ClubResult<enrollment::Model> {
    let txn = db.begin().await?;
    let practice = practice::Entity::find_by_id(practice_id)
        .lock_exclusive()
        .one(&txn)
        .await?
        .ok_or(ClubError::PracticeNotFound { id: practice_id })?;
    let member = find_member(&txn, member_id).await?;
    if member.role != Role::Socio {
        return Err(ClubError::NotASocio { dni: member.dni });
    }

    let existing = enrollment::Entity::find()
        .filter(enrollment::Column::PracticeId.eq(practice_id))
        .filter(enrollment::Column::MemberId.eq(member_id))
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(ClubError::AlreadyEnrolled {
            practice_id,
            member_id,
        });
    }

    let taken = enrollment::Entity::find()
        .filter(enrollment::Column::PracticeId.eq(practice_id))
        .count(&txn)
        .await?;
    debug!(practice_id, taken, capacity = practice.capacity, "Checking cupo");
    if taken >= practice.capacity as u64 {
        return Err(ClubError::PracticeFull {
            id: practice_id,
            capacity: practice.capacity,
        });
    }

    let created = enrollment::ActiveModel {
        practice_id: Set(practice_id),
        member_id: Set(member_id),
        enrolled_at: Set(now),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!(practice_id, member_id, "Enrolled member");
    Ok(created)
}

pub async fn unenroll(db: &DatabaseConnection, practice_id: i32, member_id: i32) -> ClubResult<()> {
    find_practice(db, practice_id).await?;
    let result = enrollment::Entity::delete_many()
        .filter(enrollment::Column::PracticeId.eq(practice_id))
        .filter(enrollment::Column::MemberId.eq(member_id))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(ClubError::NotEnrolled {
            practice_id,
            member_id,
        });
    }
    info!(practice_id, member_id, "Unenrolled member");
    Ok(())
}

/// Enrolled members, in enrollment order.
pub async fn practice_roster(
    db: &DatabaseConnection,
    practice_id: i32,
) -> ClubResult<Vec<member::Model>> {
    find_practice(db, practice_id).await?;
    let rows = enrollment::Entity::find()
        .filter(enrollment::Column::PracticeId.eq(practice_id))
        .order_by_asc(enrollment::Column::EnrolledAt)
        .order_by_asc(enrollment::Column::Id)
        .find_also_related(member::Entity)
        .all(db)
        .await?;
    Ok(rows.into_iter().filter_map(|(_, m)| m).collect())
}

/// Stores the attendance of a practice day. Every enrolled member gets one
/// row for the date: present if listed, absent otherwise. Recording the same
/// day again overwrites the previous sheet.
pub async fn record_attendance(
    db: &DatabaseConnection,
    practice_id: i32,
    date: NaiveDate,
    present_ids: &[i32],
) -> ClubResult<AttendanceSheet> {
    let txn = db.begin().await?;
    let practice = find_practice(&txn, practice_id).await?;
    if weekday_of(date) != practice.weekday {
        let mut violations = Violations::new();
        violations.push("date", "does not fall on the practice's weekday");
        violations.finish()?;
    }

    let enrolled: Vec<i32> = enrollment::Entity::find()
        .filter(enrollment::Column::PracticeId.eq(practice_id))
        .order_by_asc(enrollment::Column::MemberId)
        .all(&txn)
        .await?
        .into_iter()
        .map(|e| e.member_id)
        .collect();
    if let Some(&stranger) = present_ids.iter().find(|id| !enrolled.contains(id)) {
        return Err(ClubError::NotEnrolled {
            practice_id,
            member_id: stranger,
        });
    }

    let recorded = attendance::Entity::find()
        .filter(attendance::Column::PracticeId.eq(practice_id))
        .filter(attendance::Column::Date.eq(date))
        .all(&txn)
        .await?;

    let now = Utc::now().naive_utc();
    let mut sheet = AttendanceSheet {
        practice_id,
        date,
        present: Vec::new(),
        absent: Vec::new(),
    };
    for member_id in enrolled {
        let present = present_ids.contains(&member_id);
        match recorded.iter().find(|a| a.member_id == member_id) {
            Some(row) if row.present == present => {}
            Some(row) => {
                let mut active: attendance::ActiveModel = row.clone().into();
                active.present = Set(present);
                active.updated_at = Set(now);
                active.update(&txn).await?;
            }
            None => {
                attendance::ActiveModel {
                    practice_id: Set(practice_id),
                    member_id: Set(member_id),
                    date: Set(date),
                    present: Set(present),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }
        if present {
            sheet.present.push(member_id);
        } else {
            sheet.absent.push(member_id);
        }
    }
    txn.commit().await?;

    info!(
        practice_id,
        %date,
        present = sheet.present.len(),
        absent = sheet.absent.len(),
        "Recorded attendance"
    );
    Ok(sheet)
}

pub async fn practice_attendance(
    db: &DatabaseConnection,
    practice_id: i32,
    date: NaiveDate,
) -> ClubResult<AttendanceSheet> {
    find_practice(db, practice_id).await?;
    let rows = attendance::Entity::find()
        .filter(attendance::Column::PracticeId.eq(practice_id))
        .filter(attendance::Column::Date.eq(date))
        .order_by_asc(attendance::Column::MemberId)
        .all(db)
        .await?;
    let (present, absent): (Vec<_>, Vec<_>) = rows.into_iter().partition(|a| a.present);
    Ok(AttendanceSheet {
        practice_id,
        date,
        present: present.into_iter().map(|a| a.member_id).collect(),
        absent: absent.into_iter().map(|a| a.member_id).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn input() -> NewPractice {
        NewPractice {
            name: "Mini tenis".into(),
            sport: "Tenis".into(),
            coach_id: 1,
            court_id: None,
            weekday: 2,
            starts_at: t(18, 0),
            ends_at: t(19, 30),
            capacity: 12,
        }
    }

    #[test]
    fn test_weekday_counts_from_monday() {
        assert_eq!(weekday_of(NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()), 0);
        assert_eq!(weekday_of(NaiveDate::from_ymd_opt(2025, 6, 8).unwrap()), 6);
    }

    #[test]
    fn test_slot_overlap() {
        assert!(slots_overlap((t(18, 0), t(19, 0)), (t(18, 30), t(20, 0))));
        assert!(!slots_overlap((t(18, 0), t(19, 0)), (t(19, 0), t(20, 0))));
    }

    #[test]
    fn test_new_practice_rules() {
        assert!(check_new_practice(&input()).is_ok());

        let bad = NewPractice {
            weekday: 7,
            capacity: 0,
            ends_at: t(17, 0),
            ..input()
        };
        let Err(ClubError::Validation(errors)) = check_new_practice(&bad) else {
            panic!("expected validation errors");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["weekday", "ends_at", "capacity"]);
    }
}
