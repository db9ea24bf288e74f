use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One file of an upload batch, already read from the request.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl ImageFile {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: None,
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File extension for the public URL: content type first, then filename.
    pub fn extension(&self) -> Option<String> {
        let from_type = self.content_type.as_deref().and_then(|ct| {
            let ext = match ct.trim().to_ascii_lowercase().as_str() {
                "image/jpeg" | "image/jpg" | "image/pjpeg" => "jpg",
                "image/png" => "png",
                "image/webp" => "webp",
                "image/gif" => "gif",
                "image/avif" => "avif",
                "image/svg+xml" => "svg",
                _ => return None,
            };
            Some(ext.to_string())
        });

        from_type.or_else(|| {
            let name = self.filename.as_deref()?;
            let (_, ext) = name.rsplit_once('.')?;
            let ext = ext.to_ascii_lowercase();
            (!ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())).then_some(ext)
        })
    }
}

/// A URL produced by a successful upload, waiting in a staging slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedImage {
    pub url: String,
}

/// Audit record of one upload batch. Written once, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadBatchRecord {
    pub id: String,
    pub images: Vec<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl UploadBatchRecord {
    pub fn new(images: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            images,
            created_at: Utc::now(),
        }
    }
}

/// Identifies a staging slot: one per tenant and client session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StagingKey {
    pub tenant: String,
    pub session: String,
}

impl StagingKey {
    pub fn new<T: Into<String>, S: Into<String>>(tenant: T, session: S) -> Self {
        Self {
            tenant: tenant.into(),
            session: session.into(),
        }
    }

    pub fn slot(&self) -> String {
        format!("{}:{}", self.tenant, self.session)
    }
}

/// Outcome of asking the image host to delete one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RemoteDeletion {
    Deleted,
    NotFound,
}

/// Per-image result of releasing an entity's images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRelease {
    pub url: String,
    #[serde(flatten)]
    pub outcome: ReleaseOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ReleaseOutcome {
    Released {
        #[serde(rename = "objectId")]
        object_id: String,
    },
    Skipped {
        reason: String,
    },
    Failed {
        reason: String,
    },
}

impl ImageRelease {
    pub fn is_released(&self) -> bool {
        matches!(self.outcome, ReleaseOutcome::Released { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ReleaseOutcome::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extension_prefers_content_type() {
        let file = ImageFile::new(vec![1u8])
            .with_filename("photo.jpeg")
            .with_content_type("image/png");
        assert_eq!(file.extension().as_deref(), Some("png"));

        let file = ImageFile::new(vec![1u8]).with_filename("Photo.JPEG");
        assert_eq!(file.extension().as_deref(), Some("jpeg"));

        assert_eq!(ImageFile::new(vec![1u8]).with_filename("noext").extension(), None);
    }

    #[test]
    fn release_serializes_with_status_tag() {
        let release = ImageRelease {
            url: "https://cdn/upload/a.png".into(),
            outcome: ReleaseOutcome::Failed {
                reason: "boom".into(),
            },
        };
        assert_eq!(
            serde_json::to_value(&release).unwrap(),
            json!({"url": "https://cdn/upload/a.png", "status": "failed", "reason": "boom"})
        );
    }
}
