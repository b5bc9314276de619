//! Access record storage
//!
//! Read paths only ever surface active rows. Inserts are idempotent: a row
//! whose email already exists (active or not) is silently skipped.

use crate::models::{normalize_email, NewUserRecord, UserRecord};
use crate::{Database, Result};
use rusqlite::{params, types::Type, OptionalExtension, Row};
use std::collections::BTreeSet;

/// Access levels shown when the store cannot be read (sorted)
pub const FALLBACK_ACCESS_LEVELS: &[&str] = &["General", "Management", "Security", "Staff", "VIP"];

/// Areas shown when the store cannot be read (sorted)
pub const FALLBACK_AREAS: &[&str] = &[
    "Backstage",
    "Control Room",
    "Food Court",
    "General Entrance",
    "Main Arena",
    "Management Office",
    "Media Center",
    "Security Office",
    "Staff Entrance",
    "VIP Lounge",
];

const SELECT_COLUMNS: &str =
    "SELECT id, email, name, phone, access_level, allowed_areas, is_active FROM users";

/// Access record storage operations
pub struct UserStorage<'a> {
    db: &'a Database,
}

impl<'a> UserStorage<'a> {
    /// Create new user storage
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Ensure the backing table exists. Idempotent.
    pub fn initialize(&self) -> Result<()> {
        self.db.initialize()
    }

    /// Look up an active record by (already normalized) email
    pub fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let user = self
            .db
            .conn()
            .query_row(
                &format!("{} WHERE email = ?1 AND is_active = 1", SELECT_COLUMNS),
                params![email],
                Self::row_to_user,
            )
            .optional()?;

        Ok(user)
    }

    /// All active records, oldest first
    pub fn list_active(&self) -> Result<Vec<UserRecord>> {
        let mut stmt = self
            .db
            .conn()
            .prepare(&format!("{} WHERE is_active = 1 ORDER BY id", SELECT_COLUMNS))?;

        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Insert a record. Returns `false` when the email already exists.
    pub fn insert(&self, record: &NewUserRecord) -> Result<bool> {
        record.validate()?;
        let email = normalize_email(&record.email);

        let areas = serde_json::to_string(&record.allowed_areas)?;

        let rows = self.db.conn().execute(
            r#"
            INSERT OR IGNORE INTO users
                (email, name, phone, access_level, allowed_areas, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                email,
                record.name,
                record.phone,
                record.access_level,
                areas,
                record.is_active as i32,
            ],
        )?;

        if rows == 0 {
            tracing::debug!("Skipped insert for existing email {}", email);
        }

        Ok(rows > 0)
    }

    /// Remove every record (reset path only)
    pub fn delete_all(&self) -> Result<usize> {
        let rows = self.db.conn().execute("DELETE FROM users", [])?;
        tracing::info!("Deleted {} user records", rows);
        Ok(rows)
    }

    /// Row count including inactive records
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .db
            .conn()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Sorted distinct access levels of active records.
    ///
    /// Falls back to [`FALLBACK_ACCESS_LEVELS`] if the store is unreadable;
    /// the fallback is only fit for display.
    pub fn distinct_access_levels(&self) -> Vec<String> {
        match self.list_active() {
            Ok(users) => users
                .into_iter()
                .map(|u| u.access_level)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            Err(e) => {
                tracing::warn!("Falling back to default access levels: {}", e);
                FALLBACK_ACCESS_LEVELS.iter().map(|s| s.to_string()).collect()
            }
        }
    }

    /// Sorted distinct areas across active records.
    ///
    /// Falls back to [`FALLBACK_AREAS`] if the store is unreadable.
    pub fn distinct_areas(&self) -> Vec<String> {
        match self.list_active() {
            Ok(users) => users
                .into_iter()
                .flat_map(|u| u.allowed_areas)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            Err(e) => {
                tracing::warn!("Falling back to default areas: {}", e);
                FALLBACK_AREAS.iter().map(|s| s.to_string()).collect()
            }
        }
    }

    fn row_to_user(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
        let areas: String = row.get(5)?;
        let allowed_areas = serde_json::from_str(&areas)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;
        let is_active: Option<i64> = row.get(6)?;

        Ok(UserRecord {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            phone: row.get(3)?,
            access_level: row.get(4)?,
            allowed_areas,
            is_active: is_active.unwrap_or(1) != 0,
        })
    }
}
