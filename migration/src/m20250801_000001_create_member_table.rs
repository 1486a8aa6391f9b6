use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = table_auto(Member::Table)
            .col(pk_auto(Member::Id))
            .col(string_uniq(Member::Dni))
            .col(string(Member::Name))
            .col(date(Member::BirthDate))
            .col(string_null(Member::Email).unique_key())
            .col(string_null(Member::Phone))
            .col(string_null(Member::PasswordHash))
            .col(string(Member::Role))
            .col(string_null(Member::MembershipType))
            .col(uuid_null(Member::FamilyGroupId))
            .col(integer_null(Member::HeadId))
            .col(date_time(Member::RegisteredAt))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_member_head")
                    .from(Member::Table, Member::HeadId)
                    .to(Member::Table, Member::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            // FAMILIAR members always carry a group.
            .check(
                Expr::col(Member::MembershipType)
                    .ne("FAMILIAR")
                    .or(Expr::col(Member::FamilyGroupId).is_not_null()),
            )
            // INDIVIDUAL members never do.
            .check(
                Expr::col(Member::MembershipType).ne("INDIVIDUAL").or(Expr::col(
                    Member::FamilyGroupId,
                )
                .is_null()
                .and(Expr::col(Member::HeadId).is_null())),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_member_family_group")
                    .table(Member::Table)
                    .col(Member::FamilyGroupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_member_role")
                    .table(Member::Table)
                    .col(Member::Role)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Member::Table).to_owned())
            .await?;

        Ok(())
    }
}
