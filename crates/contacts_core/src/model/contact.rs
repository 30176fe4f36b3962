//! Contact domain model.
//!
//! # Responsibility
//! - Define the single record exchanged between CSV, services and storage.
//! - Own field-level validation rules enforced before every store write.
//!
//! # Invariants
//! - `id` is assigned by the store only; unsaved records carry `None`.
//! - `is_deleted` is the source of truth for tombstone state.
//! - `created_at`/`updated_at` are owned by the store and overwritten on save.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store-assigned surrogate key.
pub type ContactId = i64;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const EMAIL_MAX_CHARS: usize = 150;
pub const ADDRESS_MAX_CHARS: usize = 255;
pub const SHORT_TEXT_MAX_CHARS: usize = 100;
pub const NOTES_MAX_CHARS: usize = 500;
pub const WEBSITE_MAX_CHARS: usize = 255;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*$",
    )
    .expect("valid email regex")
});
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+212[0-9]{9}$").expect("valid phone regex"));
static POSTAL_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{0,10}$").expect("valid postal code regex"));
static WEBSITE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?([\da-z.-]+)\.([a-z.]{2,6})([/\w .-]*)*/?$")
        .expect("valid website regex")
});

/// Field-level validation failure for a [`Contact`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContactValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("{field} must contain between {min} and {max} characters, got {actual}")]
    Length {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },
    #[error("email `{0}` is not a valid address")]
    InvalidEmail(String),
    #[error("phone `{0}` must use the +212XXXXXXXXX format")]
    InvalidPhone(String),
    #[error("postal code `{0}` must contain up to 10 digits")]
    InvalidPostalCode(String),
    #[error("website `{0}` is not a valid URL")]
    InvalidWebsite(String),
}

/// Canonical contact record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Option<ContactId>,
    pub first_name: String,
    pub last_name: String,
    /// Unique among non-deleted contacts.
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub website: Option<String>,
    pub notes: Option<String>,
    /// Soft delete tombstone; deleted contacts stay in storage.
    pub is_deleted: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl Contact {
    /// Creates an unsaved contact with the three required fields set.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    /// Marks this contact as softly deleted.
    pub fn soft_delete(&mut self) {
        self.is_deleted = true;
    }

    /// Returns whether this contact is visible to listing, search and export.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Copies user-editable fields from `changes`.
    ///
    /// Identity, tombstone state and audit timestamps are left untouched.
    pub fn apply_changes(&mut self, changes: &Contact) {
        self.first_name = changes.first_name.clone();
        self.last_name = changes.last_name.clone();
        self.email = changes.email.clone();
        self.phone = changes.phone.clone();
        self.address = changes.address.clone();
        self.city = changes.city.clone();
        self.postal_code = changes.postal_code.clone();
        self.country = changes.country.clone();
        self.company = changes.company.clone();
        self.job_title = changes.job_title.clone();
        self.birthday = changes.birthday;
        self.website = changes.website.clone();
        self.notes = changes.notes.clone();
    }

    /// Validates field formats and lengths.
    ///
    /// # Errors
    /// Returns the first rule violation found, in field declaration order.
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        check_name("first name", &self.first_name)?;
        check_name("last name", &self.last_name)?;

        let email = self.email.trim();
        if email.is_empty() {
            return Err(ContactValidationError::Required { field: "email" });
        }
        check_max("email", email, EMAIL_MAX_CHARS)?;
        if !EMAIL_RE.is_match(email) {
            return Err(ContactValidationError::InvalidEmail(email.to_string()));
        }

        if let Some(phone) = non_empty(&self.phone) {
            if !PHONE_RE.is_match(phone) {
                return Err(ContactValidationError::InvalidPhone(phone.to_string()));
            }
        }

        if let Some(address) = non_empty(&self.address) {
            check_max("address", address, ADDRESS_MAX_CHARS)?;
        }
        if let Some(city) = non_empty(&self.city) {
            check_max("city", city, SHORT_TEXT_MAX_CHARS)?;
        }
        if let Some(postal_code) = non_empty(&self.postal_code) {
            if !POSTAL_CODE_RE.is_match(postal_code) {
                return Err(ContactValidationError::InvalidPostalCode(
                    postal_code.to_string(),
                ));
            }
        }
        if let Some(country) = non_empty(&self.country) {
            check_max("country", country, SHORT_TEXT_MAX_CHARS)?;
        }
        if let Some(company) = non_empty(&self.company) {
            check_max("company", company, SHORT_TEXT_MAX_CHARS)?;
        }
        if let Some(job_title) = non_empty(&self.job_title) {
            check_max("job title", job_title, SHORT_TEXT_MAX_CHARS)?;
        }
        if let Some(notes) = non_empty(&self.notes) {
            check_max("notes", notes, NOTES_MAX_CHARS)?;
        }
        if let Some(website) = non_empty(&self.website) {
            check_max("website", website, WEBSITE_MAX_CHARS)?;
            if !WEBSITE_RE.is_match(website) {
                return Err(ContactValidationError::InvalidWebsite(website.to_string()));
            }
        }

        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

fn check_name(field: &'static str, value: &str) -> Result<(), ContactValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ContactValidationError::Required { field });
    }
    let actual = trimmed.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&actual) {
        return Err(ContactValidationError::Length {
            field,
            min: NAME_MIN_CHARS,
            max: NAME_MAX_CHARS,
            actual,
        });
    }
    Ok(())
}

fn check_max(field: &'static str, value: &str, max: usize) -> Result<(), ContactValidationError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(ContactValidationError::Length {
            field,
            min: 0,
            max,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Contact, ContactValidationError};
    use chrono::NaiveDate;

    fn valid_contact() -> Contact {
        let mut contact = Contact::new("Jean", "Dupont", "jean@example.com");
        contact.phone = Some("+212612345678".to_string());
        contact.postal_code = Some("75001".to_string());
        contact.website = Some("https://example.com".to_string());
        contact
    }

    #[test]
    fn new_contact_is_unsaved_and_active() {
        let contact = Contact::new("Jean", "Dupont", "jean@example.com");
        assert_eq!(contact.id, None);
        assert!(contact.is_active());
        assert!(contact.created_at.is_none());
    }

    #[test]
    fn valid_contact_passes_validation() {
        valid_contact().validate().unwrap();
    }

    #[test]
    fn blank_first_name_is_required() {
        let mut contact = valid_contact();
        contact.first_name = "   ".to_string();
        assert_eq!(
            contact.validate().unwrap_err(),
            ContactValidationError::Required {
                field: "first name"
            }
        );
    }

    #[test]
    fn one_letter_last_name_is_too_short() {
        let mut contact = valid_contact();
        contact.last_name = "D".to_string();
        assert!(matches!(
            contact.validate().unwrap_err(),
            ContactValidationError::Length { field: "last name", actual: 1, .. }
        ));
    }

    #[test]
    fn malformed_email_is_rejected() {
        let mut contact = valid_contact();
        contact.email = "not-an-email".to_string();
        assert!(matches!(
            contact.validate().unwrap_err(),
            ContactValidationError::InvalidEmail(_)
        ));
    }

    #[test]
    fn phone_outside_national_format_is_rejected() {
        let mut contact = valid_contact();
        contact.phone = Some("0612345678".to_string());
        assert!(matches!(
            contact.validate().unwrap_err(),
            ContactValidationError::InvalidPhone(_)
        ));
    }

    #[test]
    fn empty_optional_fields_are_accepted() {
        let mut contact = valid_contact();
        contact.phone = Some(String::new());
        contact.website = Some(String::new());
        contact.postal_code = None;
        contact.validate().unwrap();
    }

    #[test]
    fn notes_longer_than_limit_are_rejected() {
        let mut contact = valid_contact();
        contact.notes = Some("x".repeat(501));
        assert!(matches!(
            contact.validate().unwrap_err(),
            ContactValidationError::Length { field: "notes", max: 500, .. }
        ));
    }

    #[test]
    fn website_without_domain_is_rejected() {
        let mut contact = valid_contact();
        contact.website = Some("not a url".to_string());
        assert!(matches!(
            contact.validate().unwrap_err(),
            ContactValidationError::InvalidWebsite(_)
        ));
    }

    #[test]
    fn apply_changes_keeps_identity_and_audit_fields() {
        let mut stored = valid_contact();
        stored.id = Some(7);
        stored.created_at = NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|date| date.and_hms_opt(3, 4, 5));

        let mut changes = Contact::new("Marie", "Curie", "marie@example.com");
        changes.id = Some(99);
        changes.is_deleted = true;
        stored.apply_changes(&changes);

        assert_eq!(stored.id, Some(7));
        assert_eq!(stored.first_name, "Marie");
        assert_eq!(stored.phone, None);
        assert!(!stored.is_deleted);
        assert!(stored.created_at.is_some());
    }

    #[test]
    fn serializes_with_camel_case_names() {
        let contact = Contact::new("Jean", "Dupont", "jean@example.com");
        let json = serde_json::to_value(&contact).unwrap();
        assert_eq!(json["firstName"], "Jean");
        assert_eq!(json["isDeleted"], false);
        assert!(json["postalCode"].is_null());
    }
}
