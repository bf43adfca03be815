//! Submit-readiness checks.
//!
//! Every failing check is collected, so the user sees all missing items in one message.

use std::fmt;

use super::page::{AgreementPage, FULL_NAME, INITIALS, READ, TERMS};
use crate::signature::is_blank_signature;

pub const ALERT_HEADER: &str = "Please complete the following:";

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The control that failed validation
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// The combined alert text, one bullet per missing item.
    pub fn to_alert_message(&self) -> String {
        let mut message = format!("{ALERT_HEADER}\n");
        for error in &self.errors {
            message.push_str("• ");
            message.push_str(&error.message);
            message.push('\n');
        }
        message
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_alert_message())
    }
}

impl std::error::Error for ValidationErrors {}

/// Trait for validating request objects.
pub trait Validator {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

/// Validate that a string is not empty after trimming.
pub fn validate_required(value: &str, field: &str, message: &str, errors: &mut ValidationErrors) {
    if value.trim().is_empty() {
        errors.add(ValidationError::new(field, message));
    }
}

pub fn validate_checked(checked: bool, field: &str, message: &str, errors: &mut ValidationErrors) {
    if !checked {
        errors.add(ValidationError::new(field, message));
    }
}

/// The values the submit-readiness checks look at.
#[derive(Debug, Clone)]
pub struct ReadinessCheck<'a> {
    pub full_name: &'a str,
    pub initials: &'a str,
    pub read: bool,
    pub terms: bool,
    pub signature: &'a str,
    pub empty_signature_threshold: usize,
}

impl<'a> ReadinessCheck<'a> {
    pub fn for_page(page: &'a AgreementPage, empty_signature_threshold: usize) -> Self {
        Self {
            full_name: page.value(FULL_NAME),
            initials: page.value(INITIALS),
            read: page.is_checked(READ),
            terms: page.is_checked(TERMS),
            signature: page.signature_data(),
            empty_signature_threshold,
        }
    }
}

impl Validator for ReadinessCheck<'_> {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        validate_required(self.full_name, FULL_NAME, "Please enter your full name", &mut errors);
        validate_required(self.initials, INITIALS, "Please enter your initials", &mut errors);
        validate_checked(self.read, READ, "Please confirm you've read the agreement", &mut errors);
        validate_checked(self.terms, TERMS, "Please agree to the terms", &mut errors);
        if is_blank_signature(self.signature, self.empty_signature_threshold) {
            errors.add(ValidationError::new(
                super::page::SIGNATURE_DATA,
                "Please sign the agreement",
            ));
        }

        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete<'a>(signature: &'a str) -> ReadinessCheck<'a> {
        ReadinessCheck {
            full_name: "Jane Buyer",
            initials: "JB",
            read: true,
            terms: true,
            signature,
            empty_signature_threshold: 10,
        }
    }

    #[test]
    fn test_complete_form_passes() {
        assert!(complete("data:image/png;base64,AAAAAAAA").validate().is_ok());
    }

    #[test]
    fn test_every_missing_item_is_listed_in_order() {
        let check = ReadinessCheck {
            full_name: "",
            initials: "",
            read: false,
            terms: false,
            signature: "",
            empty_signature_threshold: 1000,
        };
        let errors = check.validate().unwrap_err();
        assert_eq!(errors.len(), 5);
        assert_eq!(
            errors.to_alert_message(),
            "Please complete the following:\n\
             • Please enter your full name\n\
             • Please enter your initials\n\
             • Please confirm you've read the agreement\n\
             • Please agree to the terms\n\
             • Please sign the agreement\n"
        );
    }

    #[test]
    fn test_whitespace_only_name_is_missing() {
        let mut check = complete("data:image/png;base64,AAAAAAAA");
        check.full_name = "   ";
        let errors = check.validate().unwrap_err();
        assert_eq!(errors.errors()[0].field, FULL_NAME);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_short_signature_is_blank() {
        let errors = complete("data:").validate().unwrap_err();
        assert_eq!(errors.errors()[0].message, "Please sign the agreement");
    }
}
