// Field-level validation for the current step

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::LazyLock;

use crate::workflow::{FieldKey, InputKind, Step};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldError {
    Missing,
    InvalidEmail,
    InvalidChoice,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Missing => f.write_str("required"),
            FieldError::InvalidEmail => f.write_str("not a valid email address"),
            FieldError::InvalidChoice => f.write_str("not one of the offered choices"),
        }
    }
}

/// Live error map rendered next to the inputs, keyed in a stable order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<FieldKey, FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: FieldKey, error: FieldError) {
        self.0.insert(key, error);
    }

    pub fn remove(&mut self, key: &FieldKey) -> Option<FieldError> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &FieldKey) -> Option<FieldError> {
        self.0.get(key).copied()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &FieldError)> {
        self.0.iter()
    }

    /// Keys of required fields that were left empty
    pub fn missing_fields(&self) -> Vec<FieldKey> {
        self.0
            .iter()
            .filter(|(_, error)| **error == FieldError::Missing)
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|(key, error)| format!("{key} {error}"))
            .collect();
        f.write_str(&rendered.join(", "))
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value.trim())
}

/// Check every input on `step` against the collected values.
///
/// Required inputs must be non-blank. Any non-blank email input must look like
/// an address. `invalid_choices` lists keys whose raw value failed to parse.
pub fn validate_step(
    step: &Step,
    values: &HashMap<FieldKey, String>,
    invalid_choices: &[FieldKey],
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    for field in &step.fields {
        let value = values.get(&field.key).map(|v| v.trim()).unwrap_or("");

        if value.is_empty() {
            if field.required {
                errors.insert(field.key.clone(), FieldError::Missing);
            }
            continue;
        }
        if field.input == InputKind::Email && !is_valid_email(value) {
            errors.insert(field.key.clone(), FieldError::InvalidEmail);
        } else if invalid_choices.contains(&field.key) {
            errors.insert(field.key.clone(), FieldError::InvalidChoice);
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{FieldFlags, FieldSpec, StandardField, StepKind};

    fn contact_step() -> Step {
        Step {
            kind: StepKind::ContactInfo,
            fields: vec![
                FieldSpec::standard(StandardField::FullName, FieldFlags::REQUIRED),
                FieldSpec::standard(StandardField::Email, FieldFlags::OPTIONAL),
            ],
        }
    }

    #[test]
    fn test_email_format() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("  ada.lovelace+kiosk@mail.example.org "));
        assert!(!is_valid_email("ada@example"));
        assert!(!is_valid_email("ada example.com"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn test_blank_required_field_is_missing() {
        let mut values = HashMap::new();
        values.insert(FieldKey::Standard(StandardField::FullName), "   ".to_string());

        let errors = validate_step(&contact_step(), &values, &[]);
        assert_eq!(
            errors.missing_fields(),
            vec![FieldKey::Standard(StandardField::FullName)]
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_optional_email_still_checked_when_filled() {
        let mut values = HashMap::new();
        values.insert(FieldKey::Standard(StandardField::FullName), "Ada".to_string());
        values.insert(FieldKey::Standard(StandardField::Email), "ada-at-example".to_string());

        let errors = validate_step(&contact_step(), &values, &[]);
        assert_eq!(
            errors.get(&FieldKey::Standard(StandardField::Email)),
            Some(FieldError::InvalidEmail)
        );
        assert!(errors.missing_fields().is_empty());
        assert_eq!(errors.to_string(), "email not a valid email address");
    }
}
