use chrono::{DateTime, Utc};
use uuid::Uuid;

use formguide_shared::errors::AppResult;

use crate::models::{Profile, ProfileSections};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgProfileStore;

/// One profile document per identity, keyed by the credential id.
pub trait ProfileStore: Send + Sync {
    fn find(&self, owner: Uuid) -> AppResult<Option<Profile>>;
    /// Replaces every section, creating the profile on first write.
    fn upsert(&self, owner: Uuid, sections: ProfileSections, now: DateTime<Utc>) -> AppResult<Profile>;
    fn ping(&self) -> AppResult<()>;
}
