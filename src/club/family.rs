//! Family-plan consistency engine.
//!
//! A family group is the set of socios sharing one `family_group_id`. Every
//! mutation here leaves each group with zero or at least
//! [`MINIMUM_FAMILY_SIZE`] members. All input is validated before the first
//! write, and each operation runs in a single transaction that re-reads the
//! group it is about to change.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::age::is_dependent_age;
use super::error::{ClubError, ClubResult};
use super::members::{
    NewMember, PreparedMember, check_new_member, ensure_independent_age, ensure_unique,
    find_by_dni, find_member, insert_member, prepare_member,
};
use super::validation::{Violations, validate_dni};
use crate::entities::member::{self, MembershipType, Role};

pub const MINIMUM_FAMILY_SIZE: usize = 3;

/// One person joining a family plan.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FamilyMemberInput {
    /// A socio already on the individual plan, by DNI
    Existing { dni: String },
    /// Someone registering together with the family
    New(NewMember),
}

impl FamilyMemberInput {
    fn normalized(self) -> Self {
        match self {
            FamilyMemberInput::Existing { dni } => FamilyMemberInput::Existing {
                dni: dni.trim().to_string(),
            },
            FamilyMemberInput::New(member) => FamilyMemberInput::New(member.normalized()),
        }
    }

    fn dni(&self) -> &str {
        match self {
            FamilyMemberInput::Existing { dni } => dni,
            FamilyMemberInput::New(member) => &member.dni,
        }
    }

    /// Email that must be unique; dependents and existing members have none
    /// to claim.
    fn claimed_email(&self, today: NaiveDate) -> Option<&str> {
        match self {
            FamilyMemberInput::New(member) if !member.is_dependent(today) => {
                member.email.as_deref()
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyGroupCreated {
    pub group_id: Uuid,
    pub head_id: i32,
    /// Head first, then members in request order
    pub member_ids: Vec<i32>,
    pub member_count: usize,
}

/// A member whose plan changed as a side effect of someone else's request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffectedMember {
    pub id: i32,
    pub dni: String,
    pub name: String,
    /// Under 12 at the time of the change
    pub dependent: bool,
}

impl AffectedMember {
    fn of(member: &member::Model, today: NaiveDate) -> Self {
        Self {
            id: member.id,
            dni: member.dni.clone(),
            name: member.name.clone(),
            dependent: is_dependent_age(member.birth_date, today),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndividualConversion {
    pub member_id: i32,
    pub group_id: Uuid,
    /// Remaining members forced onto the individual plan
    pub cascaded: Vec<AffectedMember>,
    /// Set when headship moved to another member
    pub new_head_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovalReport {
    pub removed: AffectedMember,
    pub group_id: Option<Uuid>,
    pub cascaded: Vec<AffectedMember>,
    pub new_head_id: Option<i32>,
}

/// Validated input, credentials hashed, not yet checked against the store.
enum Candidate {
    Existing(String),
    New(PreparedMember),
}

/// Candidate checked against the store inside the transaction.
enum Resolved {
    Existing(member::Model),
    New(PreparedMember),
}

#[derive(Debug, Default)]
struct Rebalance {
    cascaded: Vec<AffectedMember>,
    new_head_id: Option<i32>,
}

fn check_group_size(total: usize) -> ClubResult<()> {
    if total < MINIMUM_FAMILY_SIZE {
        return Err(ClubError::InsufficientGroupSize {
            minimum: MINIMUM_FAMILY_SIZE,
            actual: total,
        });
    }
    Ok(())
}

fn check_input(violations: &mut Violations, field: &str, input: &FamilyMemberInput, today: NaiveDate) {
    match input {
        FamilyMemberInput::Existing { dni } => {
            violations.check(format!("{field}.dni"), validate_dni(dni));
        }
        FamilyMemberInput::New(member) => check_new_member(violations, field, member, today),
    }
}

/// Rejects a DNI or email that appears twice among `entries`.
fn ensure_distinct<'a>(
    entries: impl IntoIterator<Item = (&'a str, Option<&'a str>)>,
) -> ClubResult<()> {
    let mut dnis = HashSet::new();
    let mut emails = HashSet::new();
    for (dni, email) in entries {
        if !dnis.insert(dni) {
            return Err(ClubError::DuplicateIdentity {
                dni: dni.to_string(),
            });
        }
        if let Some(email) = email {
            if !emails.insert(email) {
                return Err(ClubError::DuplicateEmail {
                    email: email.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn into_candidate(input: FamilyMemberInput, today: NaiveDate) -> ClubResult<Candidate> {
    match input {
        FamilyMemberInput::Existing { dni } => Ok(Candidate::Existing(dni)),
        FamilyMemberInput::New(member) => Ok(Candidate::New(prepare_member(member, today)?)),
    }
}

/// Only individual socios can be pulled into a new group.
fn ensure_absorbable(member: &member::Model) -> ClubResult<()> {
    if member.role != Role::Socio {
        return Err(ClubError::NotASocio {
            dni: member.dni.clone(),
        });
    }
    if member.family_group_id.is_some() || member.is_familiar() {
        return Err(ClubError::AlreadyInFamilyPlan {
            dni: member.dni.clone(),
        });
    }
    Ok(())
}

async fn resolve<C: ConnectionTrait>(conn: &C, candidate: Candidate) -> ClubResult<Resolved> {
    match candidate {
        Candidate::Existing(dni) => {
            let existing = find_by_dni(conn, &dni)
                .await?
                .ok_or_else(|| ClubError::member_not_found(&dni))?;
            ensure_absorbable(&existing)?;
            Ok(Resolved::Existing(existing))
        }
        Candidate::New(prepared) => {
            ensure_unique(conn, &prepared.dni, prepared.email.as_deref()).await?;
            Ok(Resolved::New(prepared))
        }
    }
}

async fn join_group<C: ConnectionTrait>(
    conn: &C,
    member: member::Model,
    group_id: Uuid,
    head_id: Option<i32>,
) -> ClubResult<member::Model> {
    let mut active: member::ActiveModel = member.into();
    active.membership_type = Set(Some(MembershipType::Familiar));
    active.family_group_id = Set(Some(group_id));
    active.head_id = Set(head_id);
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(conn).await?)
}

async fn set_individual<C: ConnectionTrait>(
    conn: &C,
    member: member::Model,
) -> ClubResult<member::Model> {
    let mut active: member::ActiveModel = member.into();
    active.membership_type = Set(Some(MembershipType::Individual));
    active.family_group_id = Set(None);
    active.head_id = Set(None);
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(conn).await?)
}

async fn set_head<C: ConnectionTrait>(
    conn: &C,
    member: member::Model,
    head_id: Option<i32>,
) -> ClubResult<member::Model> {
    let mut active: member::ActiveModel = member.into();
    active.head_id = Set(head_id);
    active.updated_at = Set(Utc::now().naive_utc());
    Ok(active.update(conn).await?)
}

/// Current members of a group, locked for the rest of the transaction where
/// the backend supports row locks.
async fn locked_group<C: ConnectionTrait>(
    conn: &C,
    group_id: Uuid,
) -> ClubResult<Vec<member::Model>> {
    Ok(member::Entity::find()
        .filter(member::Column::FamilyGroupId.eq(group_id))
        .order_by_asc(member::Column::Id)
        .lock_exclusive()
        .all(conn)
        .await?)
}

/// Writes the head and the rest of the group with one fresh group id.
async fn form_group<C: ConnectionTrait>(
    conn: &C,
    head: Resolved,
    others: Vec<Resolved>,
) -> ClubResult<FamilyGroupCreated> {
    let group_id = Uuid::new_v4();
    debug!(%group_id, "Forming family group");

    let head = match head {
        Resolved::New(prepared) => {
            insert_member(
                conn,
                &prepared,
                Role::Socio,
                Some(MembershipType::Familiar),
                Some(group_id),
                None,
            )
            .await?
        }
        Resolved::Existing(existing) => join_group(conn, existing, group_id, None).await?,
    };

    let mut member_ids = vec![head.id];
    for other in others {
        let joined = match other {
            Resolved::New(prepared) => {
                insert_member(
                    conn,
                    &prepared,
                    Role::Socio,
                    Some(MembershipType::Familiar),
                    Some(group_id),
                    Some(head.id),
                )
                .await?
            }
            Resolved::Existing(existing) => {
                join_group(conn, existing, group_id, Some(head.id)).await?
            }
        };
        member_ids.push(joined.id);
    }

    Ok(FamilyGroupCreated {
        group_id,
        head_id: head.id,
        member_count: member_ids.len(),
        member_ids,
    })
}

/// Restores the group invariants for the members left behind after one
/// member leaves. Groups that drop below the minimum are dissolved; a group
/// that lost its head gets the oldest remaining member of independent age
/// as the new head, or is dissolved when nobody qualifies.
async fn rebalance<C: ConnectionTrait>(
    conn: &C,
    remaining: Vec<member::Model>,
    today: NaiveDate,
) -> ClubResult<Rebalance> {
    if remaining.is_empty() {
        return Ok(Rebalance::default());
    }

    let has_head = remaining.iter().any(|m| m.head_id.is_none());
    let successor = if remaining.len() < MINIMUM_FAMILY_SIZE || has_head {
        None
    } else {
        remaining
            .iter()
            .filter(|m| !is_dependent_age(m.birth_date, today))
            .min_by_key(|m| (m.birth_date, m.id))
            .map(|m| m.id)
    };

    if remaining.len() < MINIMUM_FAMILY_SIZE || (!has_head && successor.is_none()) {
        let mut cascaded = Vec::with_capacity(remaining.len());
        for other in remaining {
            cascaded.push(AffectedMember::of(&other, today));
            set_individual(conn, other).await?;
        }
        debug!(count = cascaded.len(), "Dissolved family group");
        return Ok(Rebalance {
            cascaded,
            new_head_id: None,
        });
    }

    if let Some(new_head_id) = successor {
        for other in remaining {
            let head_id = (other.id != new_head_id).then_some(new_head_id);
            set_head(conn, other, head_id).await?;
        }
        debug!(new_head_id, "Reassigned family head");
        return Ok(Rebalance {
            cascaded: Vec::new(),
            new_head_id: Some(new_head_id),
        });
    }

    Ok(Rebalance::default())
}

/// Registers or promotes a head and puts them on a new family plan together
/// with at least two more members.
pub async fn create_family_group(
    db: &DatabaseConnection,
    head: FamilyMemberInput,
    members: Vec<FamilyMemberInput>,
    today: NaiveDate,
) -> ClubResult<FamilyGroupCreated> {
    check_group_size(1 + members.len())?;

    let head = head.normalized();
    let members: Vec<_> = members
        .into_iter()
        .map(FamilyMemberInput::normalized)
        .collect();

    let mut violations = Violations::new();
    check_input(&mut violations, "head", &head, today);
    for (i, member) in members.iter().enumerate() {
        check_input(&mut violations, &format!("members[{i}]"), member, today);
    }
    violations.finish()?;

    if let FamilyMemberInput::New(new_head) = &head {
        ensure_independent_age(&new_head.dni, new_head.birth_date, today)?;
    }
    ensure_distinct(
        std::iter::once(&head)
            .chain(members.iter())
            .map(|m| (m.dni(), m.claimed_email(today))),
    )?;

    let head = into_candidate(head, today)?;
    let candidates = members
        .into_iter()
        .map(|m| into_candidate(m, today))
        .collect::<ClubResult<Vec<_>>>()?;

    let txn = db.begin().await?;
    let head = resolve(&txn, head).await?;
    if let Resolved::Existing(existing) = &head {
        ensure_independent_age(&existing.dni, existing.birth_date, today)?;
    }
    let mut resolved = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        resolved.push(resolve(&txn, candidate).await?);
    }
    let created = form_group(&txn, head, resolved).await?;
    txn.commit().await?;

    info!(
        group_id = %created.group_id,
        head_id = created.head_id,
        members = created.member_count,
        "Created family group"
    );
    Ok(created)
}

/// Moves an individual socio onto a new family plan as its head.
pub async fn convert_individual_to_family(
    db: &DatabaseConnection,
    member_id: i32,
    members: Vec<FamilyMemberInput>,
    today: NaiveDate,
) -> ClubResult<FamilyGroupCreated> {
    check_group_size(1 + members.len())?;

    let members: Vec<_> = members
        .into_iter()
        .map(FamilyMemberInput::normalized)
        .collect();

    let mut violations = Violations::new();
    for (i, member) in members.iter().enumerate() {
        check_input(&mut violations, &format!("members[{i}]"), member, today);
    }
    violations.finish()?;
    ensure_distinct(members.iter().map(|m| (m.dni(), m.claimed_email(today))))?;

    let txn = db.begin().await?;
    let head = find_member(&txn, member_id).await?;
    ensure_absorbable(&head)?;
    ensure_independent_age(&head.dni, head.birth_date, today)?;
    ensure_distinct(
        std::iter::once((head.dni.as_str(), head.email.as_deref()))
            .chain(members.iter().map(|m| (m.dni(), m.claimed_email(today)))),
    )?;

    let candidates = members
        .into_iter()
        .map(|m| into_candidate(m, today))
        .collect::<ClubResult<Vec<_>>>()?;
    let mut resolved = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        resolved.push(resolve(&txn, candidate).await?);
    }
    let created = form_group(&txn, Resolved::Existing(head), resolved).await?;
    txn.commit().await?;

    info!(
        member_id,
        group_id = %created.group_id,
        members = created.member_count,
        "Converted member to family plan"
    );
    Ok(created)
}

/// Takes one member off their family plan. If fewer than three would be
/// left, the rest of the group goes back to the individual plan too.
pub async fn convert_family_to_individual(
    db: &DatabaseConnection,
    member_id: i32,
    today: NaiveDate,
) -> ClubResult<IndividualConversion> {
    let txn = db.begin().await?;
    let member = find_member(&txn, member_id).await?;
    let group_id = match (member.membership_type, member.family_group_id) {
        (Some(MembershipType::Familiar), Some(group_id)) => group_id,
        _ => return Err(ClubError::NotInFamilyPlan { dni: member.dni }),
    };
    ensure_independent_age(&member.dni, member.birth_date, today)?;

    let remaining: Vec<_> = locked_group(&txn, group_id)
        .await?
        .into_iter()
        .filter(|m| m.id != member_id)
        .collect();

    set_individual(&txn, member).await?;
    let outcome = rebalance(&txn, remaining, today).await?;
    txn.commit().await?;

    info!(
        member_id,
        %group_id,
        cascaded = outcome.cascaded.len(),
        "Converted member to individual plan"
    );
    Ok(IndividualConversion {
        member_id,
        group_id,
        cascaded: outcome.cascaded,
        new_head_id: outcome.new_head_id,
    })
}

/// Deletes a member. Their family group, if any, is rebalanced first so it
/// never survives with one or two members or without a head.
pub async fn remove_member(
    db: &DatabaseConnection,
    member_id: i32,
    today: NaiveDate,
) -> ClubResult<RemovalReport> {
    let txn = db.begin().await?;
    let member = find_member(&txn, member_id).await?;
    let removed = AffectedMember::of(&member, today);
    let group_id = member.family_group_id;

    let outcome = match group_id {
        Some(group_id) => {
            let remaining: Vec<_> = locked_group(&txn, group_id)
                .await?
                .into_iter()
                .filter(|m| m.id != member_id)
                .collect();
            rebalance(&txn, remaining, today).await?
        }
        None => Rebalance::default(),
    };

    member::Entity::delete_by_id(member_id).exec(&txn).await?;
    txn.commit().await?;

    info!(
        member_id,
        cascaded = outcome.cascaded.len(),
        "Removed member"
    );
    Ok(RemovalReport {
        removed,
        group_id,
        cascaded: outcome.cascaded,
        new_head_id: outcome.new_head_id,
    })
}

/// Members of a family group, head first, then by name.
pub async fn family_group(
    db: &DatabaseConnection,
    group_id: Uuid,
) -> ClubResult<Vec<member::Model>> {
    let mut members = member::Entity::find()
        .filter(member::Column::FamilyGroupId.eq(group_id))
        .order_by_asc(member::Column::Name)
        .all(db)
        .await?;
    members.sort_by_key(|m| m.head_id.is_some());
    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_member(dni: &str, email: Option<&str>, born: NaiveDate) -> FamilyMemberInput {
        FamilyMemberInput::New(NewMember {
            dni: dni.into(),
            name: format!("Member {dni}"),
            birth_date: born,
            email: email.map(Into::into),
            phone: None,
            password: Some("secreto123".into()),
        })
    }

    #[test]
    fn test_group_size_minimum() {
        assert!(check_group_size(3).is_ok());
        assert!(matches!(
            check_group_size(2),
            Err(ClubError::InsufficientGroupSize {
                minimum: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_distinct_rejects_repeated_dni() {
        let err = ensure_distinct([("30111222", None), ("30111222", Some("a@b.com"))]).unwrap_err();
        assert!(matches!(err, ClubError::DuplicateIdentity { dni } if dni == "30111222"));
    }

    #[test]
    fn test_distinct_rejects_repeated_email() {
        let err = ensure_distinct([("1111111", Some("a@b.com")), ("2222222", Some("a@b.com"))])
            .unwrap_err();
        assert!(matches!(err, ClubError::DuplicateEmail { .. }));
    }

    #[test]
    fn test_dependents_claim_no_email() {
        let today = date(2025, 1, 1);
        let child = new_member("44555666", Some("shared@home.com"), date(2018, 1, 1));
        let adult = new_member("33444555", Some("shared@home.com"), date(1985, 1, 1));
        assert_eq!(child.claimed_email(today), None);
        assert_eq!(adult.claimed_email(today), Some("shared@home.com"));
        assert!(
            ensure_distinct(
                [&child, &adult]
                    .into_iter()
                    .map(|m| (m.dni(), m.claimed_email(today)))
            )
            .is_ok()
        );
    }

    #[test]
    fn test_input_deserializes_tagged() {
        let json = r#"[
            {"kind": "existing", "dni": "30111222"},
            {"kind": "new", "dni": "44555666", "name": "Tomás", "birth_date": "2018-02-01"}
        ]"#;
        let inputs: Vec<FamilyMemberInput> = serde_json::from_str(json).unwrap();
        assert!(matches!(&inputs[0], FamilyMemberInput::Existing { dni } if dni == "30111222"));
        assert!(matches!(&inputs[1], FamilyMemberInput::New(m) if m.email.is_none()));
    }
}
