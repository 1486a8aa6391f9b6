//! Monthly fee calculation.
//!
//! Amounts are whole currency units. The family discount is applied with
//! integer arithmetic and rounded half-up, identically for every member of a
//! group, so the head and the dependents always owe the same cuota.

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{ClubError, ClubResult};
use crate::entities::member::{self, MembershipType, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub base_price: i64,
    pub family_discount_percent: u32,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            base_price: 10_000,
            family_discount_percent: 30,
        }
    }
}

impl FeeSchedule {
    pub fn monthly_fee(&self, membership_type: MembershipType) -> i64 {
        match membership_type {
            MembershipType::Individual => self.base_price,
            MembershipType::Familiar => {
                discounted(self.base_price, self.family_discount_percent.min(100))
            }
        }
    }
}

/// Largest base price the configuration accepts.
pub const MAX_BASE_PRICE: i64 = 1_000_000_000_000;

fn discounted(base: i64, percent: u32) -> i64 {
    let kept = i128::from(100 - percent);
    // Half-up for non-negative amounts. Widened so the product cannot wrap.
    let amount = (i128::from(base) * kept + 50).div_euclid(100);
    i64::try_from(amount).unwrap_or(base)
}

/// Fee owed by one member right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeQuote {
    pub member_id: i32,
    pub membership_type: MembershipType,
    pub base_price: i64,
    pub discount_percent: u32,
    pub amount: i64,
    pub family_group_id: Option<Uuid>,
    pub group_size: usize,
}

/// Reads the member on every call, so the quote always reflects the plan the
/// member is on at this moment.
pub async fn compute_monthly_fee(
    db: &DatabaseConnection,
    schedule: &FeeSchedule,
    member_id: i32,
) -> ClubResult<FeeQuote> {
    let member = member::Entity::find_by_id(member_id)
        .one(db)
        .await?
        .ok_or_else(|| ClubError::member_not_found(member_id))?;

    let membership_type = match (member.role, member.membership_type) {
        (Role::Socio, Some(membership_type)) => membership_type,
        _ => return Err(ClubError::NotASocio { dni: member.dni }),
    };

    let group_size = match member.family_group_id {
        Some(group_id) => member::Entity::find()
            .filter(member::Column::FamilyGroupId.eq(group_id))
            .count(db)
            .await? as usize,
        None => 1,
    };

    let discount_percent = match membership_type {
        MembershipType::Individual => 0,
        MembershipType::Familiar => schedule.family_discount_percent,
    };

    Ok(FeeQuote {
        member_id,
        membership_type,
        base_price: schedule.base_price,
        discount_percent,
        amount: schedule.monthly_fee(membership_type),
        family_group_id: member.family_group_id,
        group_size,
    })
}
