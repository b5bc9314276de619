//! First-run provisioning of the demo access records
//!
//! The demo dataset is kept in the secret store in obfuscated form so a
//! reinstalled database is reseeded with the same records. Secret store
//! failures never abort seeding; database failures do.

use crate::models::NewUserRecord;
use crate::obfuscation::SeedObfuscator;
use crate::secret_store::{keys, SecretStore};
use crate::users::UserStorage;
use crate::{Database, Error, Result};

/// What a provisioning run did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The store already held records; nothing was touched
    AlreadyPopulated,
    /// Records were restored from the stored obfuscated blob
    Restored {
        /// Rows actually inserted
        inserted: usize,
    },
    /// The fixed demo dataset was generated and its blob stored
    Generated {
        /// Rows actually inserted
        inserted: usize,
    },
}

/// The fixed demo dataset
pub fn demo_users() -> Vec<NewUserRecord> {
    vec![
        NewUserRecord::new(
            "john.athlete@sports.com",
            "John Athlete",
            "+1-555-0101",
            "General",
            &["Main Arena", "General Entrance", "Food Court"],
        ),
        NewUserRecord::new(
            "sarah.vip@sports.com",
            "Sarah Johnson",
            "+1-555-0102",
            "VIP",
            &["Main Arena", "General Entrance", "Food Court", "VIP Lounge"],
        ),
        NewUserRecord::new(
            "mike.staff@sports.com",
            "Mike Wilson",
            "+1-555-0103",
            "Staff",
            &["Main Arena", "Staff Entrance", "Backstage", "Food Court"],
        ),
        NewUserRecord::new(
            "lisa.security@sports.com",
            "Lisa Chen",
            "+1-555-0104",
            "Security",
            &[
                "Main Arena",
                "General Entrance",
                "Staff Entrance",
                "Security Office",
                "Control Room",
            ],
        ),
        NewUserRecord::new(
            "david.manager@sports.com",
            "David Brown",
            "+1-555-0105",
            "Management",
            &[
                "Main Arena",
                "VIP Lounge",
                "Backstage",
                "Control Room",
                "Management Office",
            ],
        ),
        NewUserRecord::new(
            "emma.fan@sports.com",
            "Emma Davis",
            "+1-555-0106",
            "General",
            &["Main Arena", "General Entrance", "Food Court"],
        ),
        NewUserRecord::new(
            "alex.press@sports.com",
            "Alex Martinez",
            "+1-555-0107",
            "Staff",
            &["Main Arena", "Media Center", "Staff Entrance"],
        ),
        NewUserRecord::new(
            "olivia.vip@sports.com",
            "Olivia Taylor",
            "+1-555-0108",
            "VIP",
            &["Main Arena", "VIP Lounge", "Food Court"],
        ),
        NewUserRecord::new(
            "ryan.guard@sports.com",
            "Ryan Thomas",
            "+1-555-0109",
            "Security",
            &["General Entrance", "Staff Entrance", "Security Office"],
        ),
        NewUserRecord::new(
            "grace.director@sports.com",
            "Grace Lee",
            "+1-555-0110",
            "Management",
            &["Main Arena", "Management Office", "Control Room", "VIP Lounge"],
        ),
    ]
}

/// Seeds the record store from the secret store or the demo dataset
pub struct SeedProvisioner<'a> {
    db: &'a Database,
    secrets: &'a dyn SecretStore,
    obfuscator: &'a SeedObfuscator,
}

impl<'a> SeedProvisioner<'a> {
    /// Create new provisioner
    pub fn new(
        db: &'a Database,
        secrets: &'a dyn SecretStore,
        obfuscator: &'a SeedObfuscator,
    ) -> Self {
        Self {
            db,
            secrets,
            obfuscator,
        }
    }

    /// Seed the store if it is empty
    pub fn ensure_seeded(&self) -> Result<SeedOutcome> {
        let storage = UserStorage::new(self.db);
        if storage.count()? > 0 {
            return Ok(SeedOutcome::AlreadyPopulated);
        }

        if let Some(records) = self.load_stored_seed() {
            let inserted = self.insert_all(&storage, &records)?;
            tracing::info!("Restored {} demo users from stored seed", inserted);
            return Ok(SeedOutcome::Restored { inserted });
        }

        self.generate(&storage)
    }

    /// Wipe the store and the stored seed, then regenerate
    pub fn reset(&self) -> Result<SeedOutcome> {
        let storage = UserStorage::new(self.db);
        storage.delete_all()?;
        if let Err(e) = self.secrets.delete(keys::DEMO_USERS_SEED) {
            tracing::warn!("Failed to clear stored seed: {}", e);
        }
        self.generate(&storage)
    }

    fn generate(&self, storage: &UserStorage<'_>) -> Result<SeedOutcome> {
        let records = demo_users();
        self.store_seed(&records);
        let inserted = self.insert_all(storage, &records)?;
        tracing::info!("Generated {} demo users", inserted);
        Ok(SeedOutcome::Generated { inserted })
    }

    fn insert_all(&self, storage: &UserStorage<'_>, records: &[NewUserRecord]) -> Result<usize> {
        let tx = self.db.transaction()?;
        let mut inserted = 0;
        for record in records {
            if storage.insert(record)? {
                inserted += 1;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn load_stored_seed(&self) -> Option<Vec<NewUserRecord>> {
        let blob = match self.secrets.get(keys::DEMO_USERS_SEED) {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read stored seed: {}", e);
                return None;
            }
        };

        let decoded = self
            .obfuscator
            .decode(&blob)
            .and_then(|json| serde_json::from_str::<Vec<NewUserRecord>>(&json).map_err(Error::from))
            .and_then(|records| {
                records.iter().try_for_each(NewUserRecord::validate)?;
                Ok(records)
            });

        match decoded {
            Ok(records) => Some(records),
            Err(e) => {
                tracing::warn!("Stored seed is unusable, regenerating: {}", e);
                None
            }
        }
    }

    fn store_seed(&self, records: &[NewUserRecord]) {
        let json = match serde_json::to_string(records) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to serialize seed: {}", e);
                return;
            }
        };
        let blob = self.obfuscator.encode(&json);
        if let Err(e) = self.secrets.set(keys::DEMO_USERS_SEED, &blob) {
            tracing::warn!("Failed to store seed: {}", e);
        }
    }
}
