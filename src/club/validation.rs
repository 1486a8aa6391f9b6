//! Field rules shared by every entry point that accepts member data.
//!
//! Each rule is a pure function returning the message to show on failure.
//! [`Violations`] gathers the failures of a whole request so the caller gets
//! every problem in one round trip.

use chrono::NaiveDate;
use validator::ValidateEmail;

use super::age::calculate_age;
use super::error::{ClubError, ClubResult, FieldError};

pub const MAX_NAME_LEN: usize = 100;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_AGE: u32 = 120;

pub fn validate_dni(dni: &str) -> Result<(), String> {
    let len_ok = (7..=8).contains(&dni.len());
    if len_ok && dni.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err("must be 7 or 8 digits".to_string())
    }
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.to_owned().validate_email() {
        Ok(())
    } else {
        Err("is not a valid email address".to_string())
    }
}

pub fn validate_phone(phone: &str) -> Result<(), String> {
    let body = phone.strip_prefix('+').unwrap_or(phone);
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
    {
        return Err("may only contain digits, spaces and dashes".to_string());
    }
    let digits = body.chars().filter(char::is_ascii_digit).count();
    if (8..=15).contains(&digits) {
        Ok(())
    } else {
        Err("must have between 8 and 15 digits".to_string())
    }
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!("must be at least {MIN_PASSWORD_LEN} characters"));
    }
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if has_letter && has_digit {
        Ok(())
    } else {
        Err("must contain a letter and a digit".to_string())
    }
}

pub fn validate_name(name: &str) -> Result<(), String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err("is required".to_string())
    } else if trimmed.chars().count() > MAX_NAME_LEN {
        Err(format!("must be at most {MAX_NAME_LEN} characters"))
    } else {
        Ok(())
    }
}

pub fn validate_birth_date(birth_date: NaiveDate, today: NaiveDate) -> Result<(), String> {
    if birth_date > today {
        Err("cannot be in the future".to_string())
    } else if calculate_age(birth_date, today) > MAX_AGE {
        Err(format!("implies an age over {MAX_AGE}"))
    } else {
        Ok(())
    }
}

/// Accumulates field errors for one request.
#[derive(Debug, Default)]
pub struct Violations {
    errors: Vec<FieldError>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, field: impl Into<String>, result: Result<(), String>) {
        if let Err(message) = result {
            self.errors.push(FieldError::new(field, message));
        }
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn finish(self) -> ClubResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ClubError::Validation(self.errors))
        }
    }
}
