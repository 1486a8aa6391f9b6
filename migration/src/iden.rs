use sea_orm_migration::prelude::*;

// Define table names
#[derive(DeriveIden)]
pub enum Member {
    Table,
    Id,
    Dni,
    Name,
    BirthDate,
    Email,
    Phone,
    PasswordHash,
    Role,
    MembershipType,
    FamilyGroupId,
    HeadId,
    RegisteredAt,
}

#[derive(DeriveIden)]
pub enum Cuota {
    Table,
    Id,
    MemberId,
    Year,
    Month,
    Amount,
    DueDate,
    PaidAt,
    PaymentMethod,
}

#[derive(DeriveIden)]
pub enum Court {
    Table,
    Id,
    Name,
    Sport,
    OpensAt,
    ClosesAt,
    Active,
}

#[derive(DeriveIden)]
pub enum Reservation {
    Table,
    Id,
    CourtId,
    MemberId,
    StartsAt,
    EndsAt,
    Cancelled,
}

#[derive(DeriveIden)]
pub enum Practice {
    Table,
    Id,
    Name,
    Sport,
    CoachId,
    CourtId,
    Weekday,
    StartsAt,
    EndsAt,
    Capacity,
}

#[derive(DeriveIden)]
pub enum Enrollment {
    Table,
    Id,
    PracticeId,
    MemberId,
    EnrolledAt,
}

#[derive(DeriveIden)]
pub enum Attendance {
    Table,
    Id,
    PracticeId,
    MemberId,
    Date,
    Present,
}
