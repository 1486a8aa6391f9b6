pub mod age;
pub mod billing;
pub mod courts;
pub mod dues;
pub mod error;
pub mod family;
pub mod members;
pub mod notify;
pub mod practices;
pub mod validation;

pub use error::{ClubError, ClubResult, FieldError};
