use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::schema::profiles;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = profiles)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    #[serde(rename = "userId")]
    pub credential_id: Uuid,
    pub personal: Value,
    pub address: Value,
    pub education: Value,
    pub certifications: Value,
    pub experience: Value,
    pub documents: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn sections(&self) -> ProfileSections {
        ProfileSections {
            personal: self.personal.clone(),
            address: self.address.clone(),
            education: self.education.clone(),
            certifications: self.certifications.clone(),
            experience: self.experience.clone(),
            documents: self.documents.clone(),
        }
    }
}

/// The six profile sections as submitted by the client. Contents are opaque;
/// absent sections take their empty default.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, AsChangeset)]
#[diesel(table_name = profiles)]
pub struct ProfileSections {
    #[serde(default = "empty_object")]
    pub personal: Value,
    #[serde(default = "empty_object")]
    pub address: Value,
    #[serde(default = "empty_array")]
    pub education: Value,
    #[serde(default = "empty_array")]
    pub certifications: Value,
    #[serde(default = "empty_array")]
    pub experience: Value,
    #[serde(default = "empty_object")]
    pub documents: Value,
}

fn empty_object() -> Value { json!({}) }
fn empty_array() -> Value { json!([]) }

impl Default for ProfileSections {
    fn default() -> Self {
        Self {
            personal: empty_object(),
            address: empty_object(),
            education: empty_array(),
            certifications: empty_array(),
            experience: empty_array(),
            documents: empty_object(),
        }
    }
}

impl ProfileSections {
    /// `null` sections are treated as absent.
    pub fn normalized(mut self) -> Self {
        let defaults = Self::default();
        for (section, default) in [
            (&mut self.personal, defaults.personal),
            (&mut self.address, defaults.address),
            (&mut self.education, defaults.education),
            (&mut self.certifications, defaults.certifications),
            (&mut self.experience, defaults.experience),
            (&mut self.documents, defaults.documents),
        ] {
            if section.is_null() {
                *section = default;
            }
        }
        self
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub id: Uuid,
    pub credential_id: Uuid,
    pub personal: Value,
    pub address: Value,
    pub education: Value,
    pub certifications: Value,
    pub experience: Value,
    pub documents: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewProfile {
    pub fn new(credential_id: Uuid, sections: ProfileSections, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            credential_id,
            personal: sections.personal,
            address: sections.address,
            education: sections.education,
            certifications: sections.certifications,
            experience: sections.experience,
            documents: sections.documents,
            created_at: now,
            updated_at: now,
        }
    }
}

impl From<NewProfile> for Profile {
    fn from(n: NewProfile) -> Self {
        Self {
            id: n.id,
            credential_id: n.credential_id,
            personal: n.personal,
            address: n.address,
            education: n.education,
            certifications: n.certifications,
            experience: n.experience,
            documents: n.documents,
            created_at: n.created_at,
            updated_at: n.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_sections_default_to_empty() {
        let sections: ProfileSections = serde_json::from_value(json!({
            "personal": {"fullName": "Alice"},
            "education": null
        }))
        .unwrap();
        let sections = sections.normalized();

        assert_eq!(sections.personal["fullName"], "Alice");
        assert_eq!(sections.address, json!({}));
        assert_eq!(sections.education, json!([]));
        assert_eq!(sections.documents, json!({}));
    }

    #[test]
    fn profile_serializes_owner_as_user_id() {
        let owner = Uuid::new_v4();
        let profile: Profile = NewProfile::new(owner, ProfileSections::default(), Utc::now()).into();
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["userId"], owner.to_string());
        assert!(json.get("createdAt").is_some());
    }
}
