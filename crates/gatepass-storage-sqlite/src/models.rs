//! Database models

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Access record as stored in the `users` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Store-assigned row ID
    pub id: i64,
    /// Normalized email (unique)
    pub email: String,
    /// Display name
    pub name: String,
    /// Display phone number
    pub phone: String,
    /// Access level (General, VIP, Staff, ...); open-ended
    pub access_level: String,
    /// Areas this user may enter, in display order
    pub allowed_areas: Vec<String>,
    /// Inactive records never leave the store
    pub is_active: bool,
}

/// Access record awaiting insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserRecord {
    /// Email; normalized on insert
    pub email: String,
    /// Display name
    pub name: String,
    /// Display phone number
    pub phone: String,
    /// Access level
    pub access_level: String,
    /// Areas this user may enter
    pub allowed_areas: Vec<String>,
    /// Defaults to active when absent from a seed blob
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl NewUserRecord {
    /// Create an active record
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        phone: impl Into<String>,
        access_level: impl Into<String>,
        allowed_areas: &[&str],
    ) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            phone: phone.into(),
            access_level: access_level.into(),
            allowed_areas: allowed_areas.iter().map(|a| a.to_string()).collect(),
            is_active: true,
        }
    }

    /// Mark the record inactive
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Check the fields the `users` table requires
    pub fn validate(&self) -> Result<()> {
        if normalize_email(&self.email).is_empty() {
            return Err(Error::Validation("Email cannot be empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(Error::Validation("Name cannot be empty".to_string()));
        }
        if self.phone.trim().is_empty() {
            return Err(Error::Validation("Phone cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Trim and lowercase an email for lookup and storage
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
