use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = table_auto(Cuota::Table)
            .col(pk_auto(Cuota::Id))
            .col(integer(Cuota::MemberId))
            .col(integer(Cuota::Year))
            .col(integer(Cuota::Month))
            .col(big_integer(Cuota::Amount))
            .col(date(Cuota::DueDate))
            .col(date_time_null(Cuota::PaidAt))
            .col(string_null(Cuota::PaymentMethod))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_cuota_member")
                    .from(Cuota::Table, Cuota::MemberId)
                    .to(Member::Table, Member::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .check(
                Expr::col(Cuota::Month)
                    .gte(1)
                    .and(Expr::col(Cuota::Month).lte(12)),
            )
            .check(Expr::col(Cuota::Amount).gte(0))
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cuota_member_period")
                    .table(Cuota::Table)
                    .col(Cuota::MemberId)
                    .col(Cuota::Year)
                    .col(Cuota::Month)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Cuota::Table).to_owned())
            .await?;

        Ok(())
    }
}
