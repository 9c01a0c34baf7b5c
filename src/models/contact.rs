use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;
use uuid::Uuid;

use super::enums::Relationship;

/// A trusted contact notified on emergencies. Soft-deleted via `is_active`;
/// the dispatch path only ever sees active contacts in ascending priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub relationship: Relationship,
    /// 1 = highest, 5 = lowest.
    pub priority: i64,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Validated input for creating a contact.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub user_id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub relationship: Relationship,
    pub priority: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum ContactValidationError {
    #[error("Contact name is required")]
    MissingName,
    #[error("Invalid phone number format: {0}")]
    InvalidPhone(String),
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),
    #[error("Priority must be between 1 and 5, got {0}")]
    PriorityOutOfRange(i64),
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\+?[\d\s\-\(\)]+$").unwrap())
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

impl NewContact {
    /// Check name/phone/email/priority; returns the effective priority
    /// (default 3) on success.
    pub fn validate(&self) -> Result<i64, ContactValidationError> {
        if self.name.trim().is_empty() {
            return Err(ContactValidationError::MissingName);
        }
        if self.phone.trim().is_empty() || !phone_pattern().is_match(&self.phone) {
            return Err(ContactValidationError::InvalidPhone(self.phone.clone()));
        }
        if let Some(email) = &self.email {
            if !email_pattern().is_match(email) {
                return Err(ContactValidationError::InvalidEmail(email.clone()));
            }
        }
        let priority = self.priority.unwrap_or(3);
        if !(1..=5).contains(&priority) {
            return Err(ContactValidationError::PriorityOutOfRange(priority));
        }
        Ok(priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> NewContact {
        NewContact {
            user_id: "user-1".into(),
            name: "Ada Lovelace".into(),
            phone: "+1 555-010-0000".into(),
            email: Some("ada@example.com".into()),
            relationship: Relationship::Family,
            priority: Some(1),
            notes: None,
        }
    }

    #[test]
    fn valid_contact_passes() {
        assert_eq!(base().validate(), Ok(1));
    }

    #[test]
    fn priority_defaults_to_three() {
        let mut c = base();
        c.priority = None;
        assert_eq!(c.validate(), Ok(3));
    }

    #[test]
    fn rejects_empty_name() {
        let mut c = base();
        c.name = "  ".into();
        assert_eq!(c.validate(), Err(ContactValidationError::MissingName));
    }

    #[test]
    fn rejects_bad_phone() {
        let mut c = base();
        c.phone = "not-a-phone!".into();
        assert!(matches!(
            c.validate(),
            Err(ContactValidationError::InvalidPhone(_))
        ));
    }

    #[test]
    fn accepts_formatted_phones() {
        for phone in ["+15550100", "555 010 0000", "(555) 010-0000", "555-0100"] {
            let mut c = base();
            c.phone = phone.into();
            assert!(c.validate().is_ok(), "expected {phone} to validate");
        }
    }

    #[test]
    fn rejects_bad_email() {
        let mut c = base();
        c.email = Some("nope".into());
        assert!(matches!(
            c.validate(),
            Err(ContactValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn email_is_optional() {
        let mut c = base();
        c.email = None;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_priority_out_of_range() {
        for p in [0, 6, -1] {
            let mut c = base();
            c.priority = Some(p);
            assert_eq!(
                c.validate(),
                Err(ContactValidationError::PriorityOutOfRange(p))
            );
        }
    }
}
