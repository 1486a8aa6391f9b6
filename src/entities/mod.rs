//! Database entities

pub mod attendance;
pub mod court;
pub mod cuota;
pub mod enrollment;
pub mod member;
pub mod practice;
pub mod reservation;

pub mod prelude {
    pub use super::attendance::Entity as Attendance;
    pub use super::court::Entity as Court;
    pub use super::cuota::Entity as Cuota;
    pub use super::enrollment::Entity as Enrollment;
    pub use super::member::Entity as Member;
    pub use super::practice::Entity as Practice;
    pub use super::reservation::Entity as Reservation;
}
