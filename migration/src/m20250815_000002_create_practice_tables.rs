use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = table_auto(Practice::Table)
            .col(pk_auto(Practice::Id))
            .col(string(Practice::Name))
            .col(string(Practice::Sport))
            .col(integer(Practice::CoachId))
            .col(integer_null(Practice::CourtId))
            .col(integer(Practice::Weekday))
            .col(time(Practice::StartsAt))
            .col(time(Practice::EndsAt))
            .col(integer(Practice::Capacity))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_practice_coach")
                    .from(Practice::Table, Practice::CoachId)
                    .to(Member::Table, Member::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_practice_court")
                    .from(Practice::Table, Practice::CourtId)
                    .to(Court::Table, Court::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .check(Expr::col(Practice::EndsAt).gt(Expr::col(Practice::StartsAt)))
            .check(Expr::col(Practice::Capacity).gt(0))
            .check(
                Expr::col(Practice::Weekday)
                    .gte(0)
                    .and(Expr::col(Practice::Weekday).lte(6)),
            )
            .to_owned();
        manager.create_table(table).await?;

        let table = table_auto(Enrollment::Table)
            .col(pk_auto(Enrollment::Id))
            .col(integer(Enrollment::PracticeId))
            .col(integer(Enrollment::MemberId))
            .col(date_time(Enrollment::EnrolledAt))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_enrollment_practice")
                    .from(Enrollment::Table, Enrollment::PracticeId)
                    .to(Practice::Table, Practice::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_enrollment_member")
                    .from(Enrollment::Table, Enrollment::MemberId)
                    .to(Member::Table, Member::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_enrollment_practice_member")
                    .table(Enrollment::Table)
                    .col(Enrollment::PracticeId)
                    .col(Enrollment::MemberId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        let table = table_auto(Attendance::Table)
            .col(pk_auto(Attendance::Id))
            .col(integer(Attendance::PracticeId))
            .col(integer(Attendance::MemberId))
            .col(date(Attendance::Date))
            .col(boolean(Attendance::Present).default(false))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_attendance_practice")
                    .from(Attendance::Table, Attendance::PracticeId)
                    .to(Practice::Table, Practice::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_attendance_member")
                    .from(Attendance::Table, Attendance::MemberId)
                    .to(Member::Table, Member::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_attendance_practice_member_date")
                    .table(Attendance::Table)
                    .col(Attendance::PracticeId)
                    .col(Attendance::MemberId)
                    .col(Attendance::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop all tables in reverse order to avoid foreign key constraints
        manager
            .drop_table(Table::drop().table(Attendance::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Enrollment::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Practice::Table).to_owned())
            .await?;

        Ok(())
    }
}
