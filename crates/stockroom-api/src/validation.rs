//! Field-level validation that accumulates every failure before reporting.

use std::fmt::Display;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("valid email regex")
});

// E.164: leading +, no leading zero, at most 15 digits.
static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{1,14}$").expect("valid phone regex"));

/// One failed constraint on one request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_REGEX.is_match(value)
}

pub fn is_valid_phone(value: &str) -> bool {
    PHONE_REGEX.is_match(value)
}

/// Collects [`FieldError`]s across a payload.
///
/// ```
/// use stockroom_api::Validator;
///
/// let mut v = Validator::new();
/// if v.required("name", Some("Pen")) {
///     v.length("name", "Pen", 2, 100);
/// }
/// v.greater_than("price", 0.0, 0.0);
/// assert_eq!(v.errors().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Records "This field is required" when the value is absent or blank.
    /// Returns whether the value is present.
    pub fn required(&mut self, field: &str, value: Option<&str>) -> bool {
        match value {
            Some(v) if !v.trim().is_empty() => true,
            _ => {
                self.push(field, "This field is required");
                false
            }
        }
    }

    /// Length bounds in characters.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            self.push(field, format!("Minimum length is {min}"));
        } else if len > max {
            self.push(field, format!("Maximum length is {max}"));
        }
    }

    pub fn min_length(&mut self, field: &str, value: &str, min: usize) {
        if value.chars().count() < min {
            self.push(field, format!("Minimum length is {min}"));
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        if !is_valid_email(value) {
            self.push(field, "Invalid email format");
        }
    }

    pub fn phone(&mut self, field: &str, value: &str) {
        if !is_valid_phone(value) {
            self.push(field, "Invalid phone number format");
        }
    }

    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) {
        if !allowed.contains(&value) {
            self.push(field, format!("Must be one of: {}", allowed.join(" ")));
        }
    }

    pub fn greater_than<T: PartialOrd + Display>(&mut self, field: &str, value: T, bound: T) {
        if value.partial_cmp(&bound) != Some(std::cmp::Ordering::Greater) {
            self.push(field, format!("Must be greater than {bound}"));
        }
    }

    pub fn at_least<T: PartialOrd + Display>(&mut self, field: &str, value: T, min: T) {
        if value < min {
            self.push(field, format!("Must be at least {min}"));
        }
    }

    pub fn at_most<T: PartialOrd + Display>(&mut self, field: &str, value: T, max: T) {
        if value > max {
            self.push(field, format!("Must be at most {max}"));
        }
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when nothing failed, otherwise [`ApiError::Validation`].
    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("ann@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.org"));
        assert!(!is_valid_email("ann@"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("ann@example"));
    }

    #[test]
    fn phone_is_e164() {
        assert!(is_valid_phone("+14155552671"));
        assert!(!is_valid_phone("4155552671"));
        assert!(!is_valid_phone("+0123"));
        assert!(!is_valid_phone("+1234567890123456"));
    }

    #[test]
    fn length_counts_characters() {
        let mut v = Validator::new();
        v.length("name", "Zoë", 2, 3);
        assert!(v.is_valid());

        v.length("name", "A", 2, 50);
        v.length("description", &"x".repeat(1001), 10, 1000);
        assert_eq!(
            v.errors(),
            &[
                FieldError::new("name", "Minimum length is 2"),
                FieldError::new("description", "Maximum length is 1000"),
            ]
        );
    }

    #[test]
    fn numeric_bounds() {
        let mut v = Validator::new();
        v.greater_than("price", 0.0, 0.0);
        v.at_least("stock", -1, 0);
        v.at_most("age", 151, 150);
        v.at_least("age", 0, 0);
        let messages: Vec<&str> = v.errors().iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Must be greater than 0", "Must be at least 0", "Must be at most 150"]
        );
    }

    #[test]
    fn required_and_one_of() {
        let mut v = Validator::new();
        assert!(!v.required("email", None));
        assert!(!v.required("name", Some("  ")));
        v.one_of("gender", "unknown", &["male", "female", "other"]);
        let err = v.finish().unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.len(), 3);
                assert_eq!(errors[0].message, "This field is required");
                assert_eq!(errors[2].message, "Must be one of: male female other");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
