use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use formguide_shared::clients::minio::ObjectStorage;
use formguide_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Profile, ProfileSections};
use crate::store::ProfileStore;

/// A file received from the upload form, not yet stored.
#[derive(Debug)]
pub struct DocumentUpload {
    pub doc_key: String,
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

pub struct ProfileService {
    store: Arc<dyn ProfileStore>,
    storage: Arc<dyn ObjectStorage>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ProfileStore>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { store, storage }
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    pub fn storage(&self) -> &Arc<dyn ObjectStorage> {
        &self.storage
    }

    pub fn get(&self, owner: Uuid) -> AppResult<Option<Profile>> {
        self.store.find(owner)
    }

    pub fn save(&self, owner: Uuid, sections: ProfileSections) -> AppResult<Profile> {
        let profile = self.store.upsert(owner, sections.normalized(), Utc::now())?;
        tracing::info!(user_id = %owner, profile_id = %profile.id, "profile saved");
        Ok(profile)
    }

    /// Stores the file and records its URL on the owner's profile, creating
    /// the profile if needed. Returns the URL and the updated profile.
    pub async fn attach_document(&self, owner: Uuid, upload: DocumentUpload) -> AppResult<(String, Profile)> {
        validate_doc_key(&upload.doc_key)?;
        if upload.bytes.is_empty() {
            return Err(AppError::new(ErrorCode::DocumentMissing, "no file uploaded"));
        }

        let now = Utc::now();
        let key = object_key(owner, &upload.doc_key, upload.file_name.as_deref(), now);
        let url = self
            .storage
            .upload(&key, upload.bytes, &upload.content_type)
            .await
            .map_err(|e| AppError::new(ErrorCode::DocumentUploadFailed, e.to_string()))?;

        let mut sections = self
            .store
            .find(owner)?
            .map(|p| p.sections())
            .unwrap_or_default();
        apply_document(&mut sections, &upload.doc_key, &url);
        let profile = self.store.upsert(owner, sections, now)?;

        tracing::info!(user_id = %owner, doc_key = %upload.doc_key, key = %key, "document uploaded");
        Ok((url, profile))
    }
}

/// Letters, digits, `_` and `-` only, since the key becomes part of an object name.
pub fn validate_doc_key(doc_key: &str) -> AppResult<()> {
    if doc_key.trim().is_empty() {
        return Err(AppError::new(ErrorCode::DocumentKeyMissing, "docKey is required"));
    }
    if doc_key.len() > 64
        || !doc_key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::bad_request("docKey may only contain letters, digits, '_' and '-'"));
    }
    Ok(())
}

/// `documents/{owner}/{millis}-{docKey}{.ext}`, the extension taken from the
/// uploaded file name.
pub fn object_key(owner: Uuid, doc_key: &str, file_name: Option<&str>, at: DateTime<Utc>) -> String {
    let ext = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("documents/{owner}/{}-{doc_key}{ext}", at.timestamp_millis())
}

/// Records `url` under `documents.{doc_key}`. Passport photos and domicile
/// certificates are also mirrored where the personal and address forms read them.
pub fn apply_document(sections: &mut ProfileSections, doc_key: &str, url: &str) {
    with_object(&mut sections.documents, |documents| {
        documents.insert(doc_key.to_string(), json!(url));
    });

    match doc_key {
        "passportPhoto" => with_object(&mut sections.personal, |personal| {
            personal.insert("passportPhoto".into(), json!(url));
        }),
        "domicile" => with_object(&mut sections.address, |address| {
            let files = address.entry("files").or_insert_with(|| json!({}));
            with_object(files, |files| {
                files.insert("domicile".into(), json!(url));
            });
        }),
        _ => {}
    }
}

/// Edits `value` as an object; anything that is not one starts over empty.
fn with_object(value: &mut Value, edit: impl FnOnce(&mut Map<String, Value>)) {
    let mut map = match value.take() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    edit(&mut map);
    *value = Value::Object(map);
}
