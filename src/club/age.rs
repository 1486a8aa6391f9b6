use chrono::{Datelike, NaiveDate};

/// Youngest age allowed to hold an individual plan, head a family or log in.
pub const MINIMUM_INDEPENDENT_AGE: u32 = 12;

/// Whole years between `birth_date` and `as_of`. Birth dates after `as_of`
/// count as zero.
pub fn calculate_age(birth_date: NaiveDate, as_of: NaiveDate) -> u32 {
    if birth_date >= as_of {
        return 0;
    }
    let mut years = as_of.year() - birth_date.year();
    if (as_of.month(), as_of.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// Under-12s only exist as dependents inside a family plan.
pub fn is_dependent_age(birth_date: NaiveDate, as_of: NaiveDate) -> bool {
    calculate_age(birth_date, as_of) < MINIMUM_INDEPENDENT_AGE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_before_and_after_birthday() {
        let born = date(2000, 6, 15);
        assert_eq!(calculate_age(born, date(2025, 6, 14)), 24);
        assert_eq!(calculate_age(born, date(2025, 6, 15)), 25);
        assert_eq!(calculate_age(born, date(2025, 12, 31)), 25);
    }

    #[test]
    fn test_leap_day_birthday() {
        let born = date(2012, 2, 29);
        assert_eq!(calculate_age(born, date(2024, 2, 28)), 11);
        assert_eq!(calculate_age(born, date(2024, 2, 29)), 12);
        // Non-leap year: turns a year older on March 1st.
        assert_eq!(calculate_age(born, date(2025, 2, 28)), 12);
    }

    #[test]
    fn test_future_birth_date_is_zero() {
        assert_eq!(calculate_age(date(2030, 1, 1), date(2025, 1, 1)), 0);
    }

    #[test]
    fn test_dependent_threshold() {
        let today = date(2025, 3, 10);
        assert!(is_dependent_age(date(2013, 3, 11), today));
        assert!(!is_dependent_age(date(2013, 3, 10), today));
    }
}
