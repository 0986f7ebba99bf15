use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use formguide_shared::errors::{AppError, AppResult};

use crate::models::{NewProfile, Profile, ProfileSections};
use crate::store::ProfileStore;

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<Uuid, Profile>>,
}

impl ProfileStore for MemoryProfileStore {
    fn find(&self, owner: Uuid) -> AppResult<Option<Profile>> {
        let profiles = self.profiles.lock().map_err(|_| AppError::internal("profile store lock poisoned"))?;
        Ok(profiles.get(&owner).cloned())
    }

    fn upsert(&self, owner: Uuid, sections: ProfileSections, now: DateTime<Utc>) -> AppResult<Profile> {
        let mut profiles = self.profiles.lock().map_err(|_| AppError::internal("profile store lock poisoned"))?;
        let profile = match profiles.remove(&owner) {
            Some(existing) => Profile {
                personal: sections.personal,
                address: sections.address,
                education: sections.education,
                certifications: sections.certifications,
                experience: sections.experience,
                documents: sections.documents,
                updated_at: now,
                ..existing
            },
            None => NewProfile::new(owner, sections, now).into(),
        };
        profiles.insert(owner, profile.clone());
        Ok(profile)
    }

    fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
