use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use formguide_shared::clients::db::{checkout, DbPool};
use formguide_shared::errors::AppResult;

use crate::models::{NewProfile, Profile, ProfileSections};
use crate::schema::profiles;
use crate::store::ProfileStore;

#[derive(Clone)]
pub struct PgProfileStore {
    pool: DbPool,
}

impl PgProfileStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl ProfileStore for PgProfileStore {
    fn find(&self, owner: Uuid) -> AppResult<Option<Profile>> {
        let mut conn = checkout(&self.pool)?;
        let profile = profiles::table
            .filter(profiles::credential_id.eq(owner))
            .select(Profile::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(profile)
    }

    fn upsert(&self, owner: Uuid, sections: ProfileSections, now: DateTime<Utc>) -> AppResult<Profile> {
        let mut conn = checkout(&self.pool)?;
        let profile = diesel::insert_into(profiles::table)
            .values(NewProfile::new(owner, sections.clone(), now))
            .on_conflict(profiles::credential_id)
            .do_update()
            .set((&sections, profiles::updated_at.eq(now)))
            .returning(Profile::as_returning())
            .get_result(&mut conn)?;
        Ok(profile)
    }

    fn ping(&self) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }
}
