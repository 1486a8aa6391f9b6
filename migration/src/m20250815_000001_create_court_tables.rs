use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = table_auto(Court::Table)
            .col(pk_auto(Court::Id))
            .col(string_uniq(Court::Name))
            .col(string(Court::Sport))
            .col(time(Court::OpensAt))
            .col(time(Court::ClosesAt))
            .col(boolean(Court::Active).default(true))
            .check(Expr::col(Court::ClosesAt).gt(Expr::col(Court::OpensAt)))
            .to_owned();
        manager.create_table(table).await?;

        let table = table_auto(Reservation::Table)
            .col(pk_auto(Reservation::Id))
            .col(integer(Reservation::CourtId))
            .col(integer(Reservation::MemberId))
            .col(date_time(Reservation::StartsAt))
            .col(date_time(Reservation::EndsAt))
            .col(boolean(Reservation::Cancelled).default(false))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_reservation_court")
                    .from(Reservation::Table, Reservation::CourtId)
                    .to(Court::Table, Court::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_reservation_member")
                    .from(Reservation::Table, Reservation::MemberId)
                    .to(Member::Table, Member::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .check(Expr::col(Reservation::EndsAt).gt(Expr::col(Reservation::StartsAt)))
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservation_court_start")
                    .table(Reservation::Table)
                    .col(Reservation::CourtId)
                    .col(Reservation::StartsAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservation_member")
                    .table(Reservation::Table)
                    .col(Reservation::MemberId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reservation::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Court::Table).to_owned())
            .await?;

        Ok(())
    }
}
