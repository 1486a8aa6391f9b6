//! Member entity: socios, coaches and staff share one table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Access role of a member
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Paying club member
    #[sea_orm(string_value = "SOCIO")]
    Socio,

    /// Coach running practices
    #[sea_orm(string_value = "ENTRENADOR")]
    Entrenador,

    #[sea_orm(string_value = "ADMIN")]
    Admin,

    #[sea_orm(string_value = "SUPER_ADMIN")]
    SuperAdmin,
}

impl Role {
    /// Admins and super admins may act on any member.
    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

/// Billing plan of a socio
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipType {
    #[sea_orm(string_value = "INDIVIDUAL")]
    Individual,

    #[sea_orm(string_value = "FAMILIAR")]
    Familiar,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "member")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// National identity number, 7 or 8 digits
    #[sea_orm(unique)]
    pub dni: String,

    pub name: String,

    pub birth_date: Date,

    /// Null for dependents under 12
    #[sea_orm(unique)]
    pub email: Option<String>,

    pub phone: Option<String>,

    /// Argon2id PHC string; dependents have no credentials
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,

    pub role: Role,

    /// Only set for socios
    pub membership_type: Option<MembershipType>,

    /// Shared by every member of one family plan
    pub family_group_id: Option<Uuid>,

    /// Head of household; null for the head itself
    pub head_id: Option<i32>,

    pub registered_at: DateTime,

    pub created_at: DateTime,

    pub updated_at: DateTime,
}

impl Model {
    pub fn is_familiar(&self) -> bool {
        self.membership_type == Some(MembershipType::Familiar)
    }

    pub fn is_family_head(&self) -> bool {
        self.is_familiar() && self.head_id.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::HeadId",
        to = "Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Head,

    #[sea_orm(has_many = "super::cuota::Entity")]
    Cuotas,

    #[sea_orm(has_many = "super::reservation::Entity")]
    Reservations,

    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollments,
}

impl Related<super::cuota::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cuotas.def()
    }
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
