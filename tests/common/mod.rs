#![allow(dead_code)]

use chrono::NaiveDate;
use club_rs::club::{
    family::FamilyMemberInput,
    members::{NewMember, register_member},
};
use club_rs::entities::member::{self, Role};
use sea_orm::DatabaseConnection;

/// Fresh in-memory database with every migration applied.
pub async fn setup_test_db() -> DatabaseConnection {
    club_rs::database::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn today() -> NaiveDate {
    date(2025, 6, 1)
}

pub fn adult(dni: &str) -> NewMember {
    NewMember {
        dni: dni.to_string(),
        name: format!("Socio {dni}"),
        birth_date: date(1985, 3, 15),
        email: Some(format!("{dni}@club.test")),
        phone: None,
        password: Some("secreto123".to_string()),
    }
}

pub fn adult_born(dni: &str, birth_date: NaiveDate) -> NewMember {
    NewMember {
        birth_date,
        ..adult(dni)
    }
}

/// Under 12 on [`today`], no contact data or credentials.
pub fn child(dni: &str) -> NewMember {
    NewMember {
        dni: dni.to_string(),
        name: format!("Menor {dni}"),
        birth_date: date(2018, 9, 1),
        email: None,
        phone: None,
        password: None,
    }
}

pub fn new(member: NewMember) -> FamilyMemberInput {
    FamilyMemberInput::New(member)
}

pub fn existing(dni: &str) -> FamilyMemberInput {
    FamilyMemberInput::Existing {
        dni: dni.to_string(),
    }
}

pub async fn register(db: &DatabaseConnection, input: NewMember, role: Role) -> member::Model {
    register_member(db, input, role, today())
        .await
        .expect("Failed to register member")
}

pub async fn socio(db: &DatabaseConnection, dni: &str) -> member::Model {
    register(db, adult(dni), Role::Socio).await
}
