//! Registration, lookups and profile edits for single members.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::age::{MINIMUM_INDEPENDENT_AGE, calculate_age, is_dependent_age};
use super::error::{ClubError, ClubResult, member_write_error};
use super::validation::{
    Violations, validate_birth_date, validate_dni, validate_email, validate_name,
    validate_password, validate_phone,
};
use crate::auth::password::hash_password;
use crate::entities::member::{self, MembershipType, Role};

/// Registration data for a person not yet in the club.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMember {
    pub dni: String,
    pub name: String,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl NewMember {
    /// Trims free text and lowercases the email; blank optionals become None.
    pub fn normalized(self) -> Self {
        Self {
            dni: self.dni.trim().to_string(),
            name: self.name.trim().to_string(),
            birth_date: self.birth_date,
            email: non_blank(self.email).map(|e| e.to_lowercase()),
            phone: non_blank(self.phone),
            password: self.password.filter(|p| !p.is_empty()),
        }
    }

    pub fn is_dependent(&self, today: NaiveDate) -> bool {
        is_dependent_age(self.birth_date, today)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Editable profile fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A validated new member, password already hashed. Dependents carry no
/// contact data or credentials of their own.
#[derive(Debug, Clone)]
pub(crate) struct PreparedMember {
    pub dni: String,
    pub name: String,
    pub birth_date: NaiveDate,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub dependent: bool,
}

/// Records every format problem of `input` under `prefix`. Dependents skip
/// the credential rules.
pub(crate) fn check_new_member(
    violations: &mut Violations,
    prefix: &str,
    input: &NewMember,
    today: NaiveDate,
) {
    let field = |name: &str| {
        if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        }
    };

    violations.check(field("dni"), validate_dni(&input.dni));
    violations.check(field("name"), validate_name(&input.name));
    violations.check(
        field("birth_date"),
        validate_birth_date(input.birth_date, today),
    );

    if input.is_dependent(today) {
        return;
    }

    match &input.email {
        Some(email) => violations.check(field("email"), validate_email(email)),
        None => violations.push(field("email"), "is required"),
    }
    match &input.password {
        Some(password) => violations.check(field("password"), validate_password(password)),
        None => violations.push(field("password"), "is required"),
    }
    if let Some(phone) = &input.phone {
        violations.check(field("phone"), validate_phone(phone));
    }
}

/// Hashes credentials of an already checked input.
pub(crate) fn prepare_member(input: NewMember, today: NaiveDate) -> ClubResult<PreparedMember> {
    let dependent = input.is_dependent(today);
    if dependent {
        return Ok(PreparedMember {
            dni: input.dni,
            name: input.name,
            birth_date: input.birth_date,
            email: None,
            phone: None,
            password_hash: None,
            dependent,
        });
    }

    let password_hash = match &input.password {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };
    Ok(PreparedMember {
        dni: input.dni,
        name: input.name,
        birth_date: input.birth_date,
        email: input.email,
        phone: input.phone,
        password_hash,
        dependent,
    })
}

/// Fails with `InvalidAge` unless the person may hold an individual plan,
/// head a family or log in.
pub(crate) fn ensure_independent_age(
    dni: &str,
    birth_date: NaiveDate,
    today: NaiveDate,
) -> ClubResult<()> {
    let age = calculate_age(birth_date, today);
    if age < MINIMUM_INDEPENDENT_AGE {
        return Err(ClubError::InvalidAge {
            dni: dni.to_string(),
            age,
            minimum: MINIMUM_INDEPENDENT_AGE,
        });
    }
    Ok(())
}

/// Pre-checks uniqueness so callers get a precise error. The unique indexes
/// still decide under concurrent writes.
pub(crate) async fn ensure_unique<C: ConnectionTrait>(
    conn: &C,
    dni: &str,
    email: Option<&str>,
) -> ClubResult<()> {
    if find_by_dni(conn, dni).await?.is_some() {
        return Err(ClubError::DuplicateIdentity {
            dni: dni.to_string(),
        });
    }
    if let Some(email) = email {
        let taken = member::Entity::find()
            .filter(member::Column::Email.eq(email))
            .one(conn)
            .await?;
        if taken.is_some() {
            return Err(ClubError::DuplicateEmail {
                email: email.to_string(),
            });
        }
    }
    Ok(())
}

pub(crate) async fn insert_member<C: ConnectionTrait>(
    conn: &C,
    prepared: &PreparedMember,
    role: Role,
    membership_type: Option<MembershipType>,
    family_group_id: Option<Uuid>,
    head_id: Option<i32>,
) -> ClubResult<member::Model> {
    let now = Utc::now().naive_utc();
    let model = member::ActiveModel {
        dni: Set(prepared.dni.clone()),
        name: Set(prepared.name.clone()),
        birth_date: Set(prepared.birth_date),
        email: Set(prepared.email.clone()),
        phone: Set(prepared.phone.clone()),
        password_hash: Set(prepared.password_hash.clone()),
        role: Set(role),
        membership_type: Set(membership_type),
        family_group_id: Set(family_group_id),
        head_id: Set(head_id),
        registered_at: Set(now),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    debug!("Inserting member {}", prepared.dni);
    model
        .insert(conn)
        .await
        .map_err(|e| member_write_error(e, &prepared.dni, prepared.email.as_deref()))
}

/// Registers one member outside any family plan. Socios start on the
/// individual plan; every role needs credentials, so the minimum age applies
/// to all of them.
pub async fn register_member(
    db: &DatabaseConnection,
    input: NewMember,
    role: Role,
    today: NaiveDate,
) -> ClubResult<member::Model> {
    let input = input.normalized();

    let mut violations = Violations::new();
    check_new_member(&mut violations, "", &input, today);
    violations.finish()?;
    ensure_independent_age(&input.dni, input.birth_date, today)?;

    let prepared = prepare_member(input, today)?;
    let membership_type = (role == Role::Socio).then_some(MembershipType::Individual);

    let txn = db.begin().await?;
    ensure_unique(&txn, &prepared.dni, prepared.email.as_deref()).await?;
    let member = insert_member(&txn, &prepared, role, membership_type, None, None).await?;
    txn.commit().await?;

    info!(member_id = member.id, role = ?role, "Registered member");
    Ok(member)
}

pub async fn find_member<C: ConnectionTrait>(conn: &C, id: i32) -> ClubResult<member::Model> {
    member::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ClubError::member_not_found(id))
}

pub async fn find_by_dni<C: ConnectionTrait>(
    conn: &C,
    dni: &str,
) -> ClubResult<Option<member::Model>> {
    Ok(member::Entity::find()
        .filter(member::Column::Dni.eq(dni))
        .one(conn)
        .await?)
}

/// Looks a member up by DNI or email, for logging in.
pub async fn find_by_login<C: ConnectionTrait>(
    conn: &C,
    login: &str,
) -> ClubResult<Option<member::Model>> {
    let login = login.trim();
    let column = if login.contains('@') {
        member::Column::Email
    } else {
        member::Column::Dni
    };
    Ok(member::Entity::find()
        .filter(column.eq(login.to_lowercase()))
        .one(conn)
        .await?)
}

pub async fn list_members(
    db: &DatabaseConnection,
    role: Option<Role>,
) -> ClubResult<Vec<member::Model>> {
    let mut query = member::Entity::find().order_by_asc(member::Column::Name);
    if let Some(role) = role {
        query = query.filter(member::Column::Role.eq(role));
    }
    Ok(query.all(db).await?)
}

/// Edits contact data. Dependents under 12 cannot get an email of their own.
pub async fn update_member(
    db: &DatabaseConnection,
    member_id: i32,
    update: MemberUpdate,
    today: NaiveDate,
) -> ClubResult<member::Model> {
    let name = non_blank(update.name);
    let email = non_blank(update.email).map(|e| e.to_lowercase());
    let phone = non_blank(update.phone);

    let txn = db.begin().await?;
    let existing = find_member(&txn, member_id).await?;

    let mut violations = Violations::new();
    if let Some(name) = &name {
        violations.check("name", validate_name(name));
    }
    if let Some(email) = &email {
        violations.check("email", validate_email(email));
        if is_dependent_age(existing.birth_date, today) {
            violations.push("email", "dependents under 12 have no credentials");
        }
    }
    if let Some(phone) = &phone {
        violations.check("phone", validate_phone(phone));
    }
    violations.finish()?;

    if let Some(email) = &email {
        if existing.email.as_deref() != Some(email.as_str()) {
            let taken = member::Entity::find()
                .filter(member::Column::Email.eq(email.as_str()))
                .one(&txn)
                .await?;
            if taken.is_some() {
                return Err(ClubError::DuplicateEmail {
                    email: email.clone(),
                });
            }
        }
    }

    let dni = existing.dni.clone();
    let mut active: member::ActiveModel = existing.into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(email) = email.clone() {
        active.email = Set(Some(email));
    }
    if let Some(phone) = phone {
        active.phone = Set(Some(phone));
    }
    active.updated_at = Set(Utc::now().naive_utc());
    let updated = active
        .update(&txn)
        .await
        .map_err(|e| member_write_error(e, &dni, email.as_deref()))?;
    txn.commit().await?;

    info!(member_id, "Updated member profile");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn adult() -> NewMember {
        NewMember {
            dni: " 30111222 ".into(),
            name: " Ana Pérez ".into(),
            birth_date: date(1990, 5, 4),
            email: Some(" Ana@Club.com ".into()),
            phone: Some("   ".into()),
            password: Some("secreto123".into()),
        }
    }

    #[test]
    fn test_normalized_trims_and_lowercases() {
        let input = adult().normalized();
        assert_eq!(input.dni, "30111222");
        assert_eq!(input.name, "Ana Pérez");
        assert_eq!(input.email.as_deref(), Some("ana@club.com"));
        assert_eq!(input.phone, None);
    }

    #[test]
    fn test_adult_requires_credentials() {
        let today = date(2025, 1, 1);
        let mut input = adult().normalized();
        input.email = None;
        input.password = None;

        let mut violations = Violations::new();
        check_new_member(&mut violations, "members[0]", &input, today);
        match violations.finish() {
            Err(ClubError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["members[0].email", "members[0].password"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_dependent_skips_credentials_and_drops_contact_data() {
        let today = date(2025, 1, 1);
        let input = NewMember {
            dni: "55123456".into(),
            name: "Tomás".into(),
            birth_date: date(2017, 3, 3),
            email: Some("not-even-valid".into()),
            phone: Some("x".into()),
            password: None,
        };

        let mut violations = Violations::new();
        check_new_member(&mut violations, "", &input, today);
        assert!(violations.is_empty());

        let prepared = prepare_member(input, today).unwrap();
        assert!(prepared.dependent);
        assert_eq!(prepared.email, None);
        assert_eq!(prepared.phone, None);
        assert_eq!(prepared.password_hash, None);
    }

    #[test]
    fn test_minimum_age_gate() {
        let today = date(2025, 1, 1);
        assert!(ensure_independent_age("1", date(2013, 1, 1), today).is_ok());
        let err = ensure_independent_age("1", date(2013, 1, 2), today).unwrap_err();
        assert!(matches!(err, ClubError::InvalidAge { age: 11, .. }));
    }
    fn prepared(dni: &str, email: &str) -> PreparedMember {
        PreparedMember {
            dni: dni.into(),
            name: "Ana Pérez".into(),
            birth_date: date(1990, 5, 4),
            email: Some(email.into()),
            phone: None,
            password_hash: None,
            dependent: false,
        }
    }

    #[tokio::test]
    async fn test_store_unique_violation_maps_to_duplicate_kind() {
        let db = crate::database::connect("sqlite::memory:").await.unwrap();
        let individual = Some(MembershipType::Individual);
        insert_member(&db, &prepared("30111222", "ana@club.test"), Role::Socio, individual, None, None)
            .await
            .unwrap();

        // Skips the lookup in front of the insert, as a lost race would.
        let err = insert_member(&db, &prepared("30111333", "ana@club.test"), Role::Socio, individual, None, None)
            .await
            .unwrap_err();
        assert!(matches!(&err, ClubError::DuplicateEmail { email } if email == "ana@club.test"), "{err:?}");

        let err = insert_member(&db, &prepared("30111222", "otra@club.test"), Role::Socio, individual, None, None)
            .await
            .unwrap_err();
        assert!(matches!(&err, ClubError::DuplicateIdentity { dni } if dni == "30111222"), "{err:?}");
    }
}
