//! Cuota generation, payment and debt aggregation.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use tracing::{debug, info};

use super::billing::FeeSchedule;
use super::error::{ClubError, ClubResult, FieldError};
use super::members::find_member;
use crate::entities::{
    cuota,
    member::{self, Role},
};

/// Outcome of one billing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub year: i32,
    pub month: u32,
    pub created: usize,
    pub skipped: usize,
}

/// Unpaid cuotas of one member. Overdue ones are included in the pending
/// figures as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DebtSummary {
    pub member_id: i32,
    pub pending_count: usize,
    pub pending_total: i64,
    pub overdue_count: usize,
    pub overdue_total: i64,
}

impl DebtSummary {
    pub fn has_overdue(&self) -> bool {
        self.overdue_count > 0
    }
}

/// Due date inside the billed month, clamped to the month's last day.
pub fn due_date(year: i32, month: u32, due_day: u32) -> ClubResult<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        ClubError::Validation(vec![FieldError::new("month", "is not a valid period")])
    })?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last_day = next_first
        .and_then(|d| d.pred_opt())
        .map_or(28, |d| d.day());
    let day = due_day.clamp(1, last_day);
    Ok(NaiveDate::from_ymd_opt(year, month, day).unwrap_or(first))
}

/// Creates the cuota of every billed socio for one period. Socios that
/// already have one for the period are skipped, so reruns are harmless.
pub async fn generate_monthly_cuotas(
    db: &DatabaseConnection,
    schedule: &FeeSchedule,
    year: i32,
    month: u32,
    due_day: u32,
) -> ClubResult<GenerationReport> {
    let due = due_date(year, month, due_day)?;
    let now = Utc::now().naive_utc();

    let txn = db.begin().await?;
    let socios = member::Entity::find()
        .filter(member::Column::Role.eq(Role::Socio))
        .filter(member::Column::MembershipType.is_not_null())
        .order_by_asc(member::Column::Id)
        .all(&txn)
        .await?;

    let already_billed: HashSet<i32> = cuota::Entity::find()
        .filter(cuota::Column::Year.eq(year))
        .filter(cuota::Column::Month.eq(month as i32))
        .all(&txn)
        .await?
        .into_iter()
        .map(|c| c.member_id)
        .collect();

    let mut report = GenerationReport {
        year,
        month,
        created: 0,
        skipped: 0,
    };
    for socio in socios {
        let Some(membership_type) = socio.membership_type else {
            continue;
        };
        if already_billed.contains(&socio.id) {
            report.skipped += 1;
            continue;
        }
        let amount = schedule.monthly_fee(membership_type);
        debug!(member_id = socio.id, amount, "Creating cuota");
        cuota::ActiveModel {
            member_id: Set(socio.id),
            year: Set(year),
            month: Set(month as i32),
            amount: Set(amount),
            due_date: Set(due),
            paid_at: Set(None),
            payment_method: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        report.created += 1;
    }
    txn.commit().await?;

    info!(
        year,
        month,
        created = report.created,
        skipped = report.skipped,
        "Generated cuotas"
    );
    Ok(report)
}

/// Cuotas of one member, newest period first.
pub async fn member_cuotas(
    db: &DatabaseConnection,
    member_id: i32,
) -> ClubResult<Vec<cuota::Model>> {
    find_member(db, member_id).await?;
    Ok(cuota::Entity::find()
        .filter(cuota::Column::MemberId.eq(member_id))
        .order_by_desc(cuota::Column::Year)
        .order_by_desc(cuota::Column::Month)
        .all(db)
        .await?)
}

pub async fn find_cuota(db: &DatabaseConnection, cuota_id: i32) -> ClubResult<cuota::Model> {
    cuota::Entity::find_by_id(cuota_id)
        .one(db)
        .await?
        .ok_or(ClubError::CuotaNotFound { id: cuota_id })
}

pub async fn pay_cuota(
    db: &DatabaseConnection,
    cuota_id: i32,
    method: Option<String>,
    paid_at: NaiveDateTime,
) -> ClubResult<cuota::Model> {
    let txn = db.begin().await?;
    let existing = cuota::Entity::find_by_id(cuota_id)
        .one(&txn)
        .await?
        .ok_or(ClubError::CuotaNotFound { id: cuota_id })?;
    if existing.is_paid() {
        return Err(ClubError::CuotaAlreadyPaid { id: cuota_id });
    }

    let mut active: cuota::ActiveModel = existing.into();
    active.paid_at = Set(Some(paid_at));
    active.payment_method = Set(method.map(|m| m.trim().to_string()).filter(|m| !m.is_empty()));
    active.updated_at = Set(Utc::now().naive_utc());
    let paid = active.update(&txn).await?;
    txn.commit().await?;

    info!(cuota_id, member_id = paid.member_id, "Cuota paid");
    Ok(paid)
}

/// Sums unpaid cuotas; those whose due date is before `today` are overdue.
pub fn summarize_debt(member_id: i32, cuotas: &[cuota::Model], today: NaiveDate) -> DebtSummary {
    cuotas
        .iter()
        .filter(|c| !c.is_paid())
        .fold(
            DebtSummary {
                member_id,
                ..Default::default()
            },
            |mut summary, c| {
                summary.pending_count += 1;
                summary.pending_total += c.amount;
                if c.due_date < today {
                    summary.overdue_count += 1;
                    summary.overdue_total += c.amount;
                }
                summary
            },
        )
}

pub async fn member_debt(
    db: &DatabaseConnection,
    member_id: i32,
    today: NaiveDate,
) -> ClubResult<DebtSummary> {
    let cuotas = member_cuotas(db, member_id).await?;
    Ok(summarize_debt(member_id, &cuotas, today))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn cuota(id: i32, amount: i64, due: NaiveDate, paid: bool) -> cuota::Model {
        let now = date(2025, 1, 1).and_hms_opt(0, 0, 0).unwrap();
        cuota::Model {
            id,
            member_id: 1,
            year: due.year(),
            month: due.month() as i32,
            amount,
            due_date: due,
            paid_at: paid.then_some(now),
            payment_method: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_due_date_clamps_to_month_end() {
        assert_eq!(due_date(2025, 2, 31).unwrap(), date(2025, 2, 28));
        assert_eq!(due_date(2024, 2, 31).unwrap(), date(2024, 2, 29));
        assert_eq!(due_date(2025, 12, 31).unwrap(), date(2025, 12, 31));
        assert_eq!(due_date(2025, 4, 10).unwrap(), date(2025, 4, 10));
        assert_eq!(due_date(2025, 4, 0).unwrap(), date(2025, 4, 1));
    }

    #[test]
    fn test_due_date_rejects_bad_month() {
        assert!(matches!(
            due_date(2025, 13, 10),
            Err(ClubError::Validation(_))
        ));
    }

    #[test]
    fn test_summarize_debt() {
        let today = date(2025, 3, 15);
        let cuotas = vec![
            cuota(1, 7_000, date(2025, 1, 10), true),
            cuota(2, 7_000, date(2025, 2, 10), false),
            cuota(3, 7_000, date(2025, 3, 10), false),
            cuota(4, 7_000, date(2025, 4, 10), false),
        ];
        let summary = summarize_debt(1, &cuotas, today);
        assert_eq!(summary.pending_count, 3);
        assert_eq!(summary.pending_total, 21_000);
        assert_eq!(summary.overdue_count, 2);
        assert_eq!(summary.overdue_total, 14_000);
        assert!(summary.has_overdue());
    }

    #[test]
    fn test_due_today_is_not_overdue() {
        let today = date(2025, 3, 10);
        let summary = summarize_debt(1, &[cuota(1, 500, today, false)], today);
        assert_eq!(summary.pending_count, 1);
        assert!(!summary.has_overdue());
    }
}
