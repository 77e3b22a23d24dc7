//! Validation utilities for registration intake

use chrono::{Months, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

use crate::types::*;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+7\d{10}$").expect("phone regex is valid"));

static BIRTH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("birth date regex is valid"));

/// Oldest accepted participant age
const MAX_AGE_YEARS: u32 = 120;

/// Validate that a text field's trimmed length is within bounds
pub fn validate_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        Err(format!(
            "{} must be between {} and {} characters",
            field, min, max
        ))
    } else {
        Ok(())
    }
}

/// Validate an email address shape
pub fn validate_email(email: &str) -> Result<(), String> {
    if EMAIL.is_match(email.trim()) {
        Ok(())
    } else {
        Err("Email address is invalid".to_string())
    }
}

/// Validate a Russian mobile number in `+7XXXXXXXXXX` form
pub fn validate_phone(field: &str, phone: &str) -> Result<(), String> {
    if PHONE.is_match(phone.trim()) {
        Ok(())
    } else {
        Err(format!("{} must be in +7XXXXXXXXXX format", field))
    }
}

/// Parse a `dd/mm/yyyy` birth date
pub fn parse_birth_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if !BIRTH_DATE.is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%d/%m/%Y").ok()
}

/// Validate a birth date: well-formed, not in the future, plausible age
pub fn validate_birth_date(value: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    let birth_date = parse_birth_date(value)
        .ok_or_else(|| "Birth date must be a valid date in dd/mm/yyyy format".to_string())?;

    if birth_date > today {
        return Err("Birth date cannot be in the future".to_string());
    }

    let oldest = today
        .checked_sub_months(Months::new(12 * MAX_AGE_YEARS))
        .unwrap_or(NaiveDate::MIN);
    if birth_date <= oldest {
        return Err(format!(
            "Birth date must be less than {} years ago",
            MAX_AGE_YEARS
        ));
    }

    Ok(birth_date)
}

/// Whether someone born on `birth_date` is younger than `years` on `today`
pub fn is_younger_than(birth_date: NaiveDate, years: u32, today: NaiveDate) -> bool {
    birth_date
        .checked_add_months(Months::new(12 * years))
        .is_some_and(|anniversary| anniversary > today)
}

/// Check a registration request against the intake rules, collecting every
/// violation
pub fn validate_registration_request(request: &RegistrationRequest, today: NaiveDate) -> Vec<String> {
    let mut problems = Vec::new();

    let mut check = |result: Result<(), String>| {
        if let Err(problem) = result {
            problems.push(problem);
        }
    };

    check(validate_length("First name", &request.first_name, 2, 50));
    check(validate_length("Last name", &request.last_name, 2, 50));
    check(validate_email(&request.email));
    check(validate_phone("Phone", &request.phone));
    check(validate_length("Telegram", &request.telegram, 3, 50));
    check(validate_length("City", &request.city, 2, 50));

    if Role::parse(&request.role).is_none() {
        check(Err("Role must be 'подросток' or 'служитель'".to_string()));
    }

    match validate_birth_date(&request.birth_date, today) {
        Ok(birth_date) => {
            if is_younger_than(birth_date, 14, today) && !request.consent_under_14 {
                check(Err("Consent for participants under 14 is required".to_string()));
            }

            if is_younger_than(birth_date, 18, today) {
                let parent_name = request.parent_full_name.as_deref().unwrap_or_default();
                if parent_name.trim().is_empty() {
                    check(Err("Parent full name is required for minors".to_string()));
                }
                check(validate_phone(
                    "Parent phone",
                    request.parent_phone.as_deref().unwrap_or_default(),
                ));
            }
        }
        Err(problem) => check(Err(problem)),
    }

    if !request.consent_donation {
        check(Err("Donation consent is required".to_string()));
    }
    if !request.consent_personal_data {
        check(Err("Personal data consent is required".to_string()));
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn adult_request() -> RegistrationRequest {
        RegistrationRequest {
            first_name: "Иван".to_string(),
            last_name: "Петров".to_string(),
            email: "ivan@example.com".to_string(),
            birth_date: "15/03/1990".to_string(),
            phone: "+79001234567".to_string(),
            telegram: "@ivanp".to_string(),
            city: "Саратов".to_string(),
            role: "служитель".to_string(),
            consent_donation: true,
            consent_personal_data: true,
            ..RegistrationRequest::default()
        }
    }

    #[test]
    fn test_valid_adult_request() {
        assert!(validate_registration_request(&adult_request(), today()).is_empty());
    }

    #[test]
    fn test_all_problems_reported_together() {
        let request = RegistrationRequest {
            first_name: "И".to_string(),
            email: "not-an-email".to_string(),
            phone: "89001234567".to_string(),
            role: "гость".to_string(),
            consent_donation: false,
            ..adult_request()
        };

        let problems = validate_registration_request(&request, today());
        assert_eq!(problems.len(), 5, "{:?}", problems);
    }

    #[test]
    fn test_minor_needs_parent_details() {
        let request = RegistrationRequest {
            birth_date: "01/01/2010".to_string(),
            role: "подросток".to_string(),
            ..adult_request()
        };

        let problems = validate_registration_request(&request, today());
        assert_eq!(problems.len(), 2, "{:?}", problems);

        let request = RegistrationRequest {
            parent_full_name: Some("Петрова Анна".to_string()),
            parent_phone: Some("+79007654321".to_string()),
            ..request
        };
        assert!(validate_registration_request(&request, today()).is_empty());
    }

    #[test]
    fn test_under_14_needs_consent() {
        let request = RegistrationRequest {
            birth_date: "01/01/2013".to_string(),
            role: "подросток".to_string(),
            parent_full_name: Some("Петрова Анна".to_string()),
            parent_phone: Some("+79007654321".to_string()),
            ..adult_request()
        };
        assert_eq!(validate_registration_request(&request, today()).len(), 1);

        let request = RegistrationRequest {
            consent_under_14: true,
            ..request
        };
        assert!(validate_registration_request(&request, today()).is_empty());
    }

    #[test]
    fn test_birth_date_rules() {
        assert!(validate_birth_date("31/02/2000", today()).is_err());
        assert!(validate_birth_date("2000-01-01", today()).is_err());
        assert!(validate_birth_date("02/06/2025", today()).is_err());
        assert!(validate_birth_date("01/06/1905", today()).is_err());
        assert_eq!(
            validate_birth_date("01/06/2025", today()),
            Ok(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
        );
    }

    #[test]
    fn test_age_boundaries() {
        let birthday = NaiveDate::from_ymd_opt(2007, 6, 1).unwrap();
        assert!(!is_younger_than(birthday, 18, today()));
        assert!(is_younger_than(birthday, 18, today().pred_opt().unwrap()));
    }
}
