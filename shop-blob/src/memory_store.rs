use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::store::public_url;
use crate::{BlobError, BlobResult, DestroyResult, HostedImage, ImageFile, ImageHost};

#[derive(Debug, Clone)]
struct StoredImage {
    bytes: Bytes,
    content_type: Option<String>,
}

#[derive(Default)]
struct Faults {
    /// 1-based index of the upload call that fails
    fail_upload_at: Option<usize>,
    failing_destroys: HashSet<String>,
}

/// In-process image host for development and tests.
pub struct MemoryImageHost {
    public_base: String,
    objects: Mutex<HashMap<String, StoredImage>>,
    uploads: Mutex<usize>,
    faults: Mutex<Faults>,
}

impl MemoryImageHost {
    pub fn new<S: Into<String>>(public_base: S) -> Self {
        Self {
            public_base: public_base.into(),
            objects: Mutex::new(HashMap::new()),
            uploads: Mutex::new(0),
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Make the n-th upload call (counting from 1 over the host's lifetime) fail.
    pub fn fail_upload_at(&self, n: usize) {
        self.faults.lock().fail_upload_at = Some(n);
    }

    /// Make every destroy of `object_id` answer an error result.
    pub fn fail_destroy_for<S: Into<String>>(&self, object_id: S) {
        self.faults.lock().failing_destroys.insert(object_id.into());
    }

    pub fn contains(&self, object_id: &str) -> bool {
        self.objects.lock().contains_key(object_id)
    }

    pub fn object_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.objects.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn content_type(&self, object_id: &str) -> Option<String> {
        self.objects
            .lock()
            .get(object_id)
            .and_then(|o| o.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().is_empty()
    }
}

#[async_trait]
impl ImageHost for MemoryImageHost {
    async fn upload(&self, object_id: &str, file: &ImageFile) -> BlobResult<HostedImage> {
        let attempt = {
            let mut uploads = self.uploads.lock();
            *uploads += 1;
            *uploads
        };

        if self.faults.lock().fail_upload_at == Some(attempt) {
            return Err(BlobError::upload_failed(format!(
                "memory host rejected upload #{attempt}"
            )));
        }

        let ext = file
            .extension()
            .ok_or_else(|| BlobError::invalid("image has no recognizable extension"))?;

        self.objects.lock().insert(
            object_id.to_string(),
            StoredImage {
                bytes: file.bytes.clone(),
                content_type: file.content_type.clone(),
            },
        );

        Ok(HostedImage {
            secure_url: public_url(&self.public_base, object_id, &ext),
            object_id: object_id.to_string(),
        })
    }

    async fn destroy(&self, object_id: &str) -> BlobResult<DestroyResult> {
        if self.faults.lock().failing_destroys.contains(object_id) {
            return Ok(DestroyResult::Other("error".to_string()));
        }

        match self.objects.lock().remove(object_id) {
            Some(stored) => {
                tracing::debug!(object_id, bytes = stored.bytes.len(), "memory host destroyed image");
                Ok(DestroyResult::Ok)
            }
            None => Ok(DestroyResult::NotFound),
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_destroy() {
        let host = MemoryImageHost::new("http://localhost/media");
        let file = ImageFile::new(vec![1u8, 2, 3]).with_content_type("image/png");

        let hosted = host.upload("categories/abc", &file).await.unwrap();
        assert_eq!(hosted.secure_url, "http://localhost/media/upload/categories/abc.png");
        assert!(host.contains("categories/abc"));

        assert_eq!(host.destroy("categories/abc").await.unwrap(), DestroyResult::Ok);
        assert_eq!(host.destroy("categories/abc").await.unwrap(), DestroyResult::NotFound);
    }

    #[tokio::test]
    async fn injected_faults_fire() {
        let host = MemoryImageHost::new("http://localhost/media");
        let file = ImageFile::new(vec![1u8]).with_content_type("image/jpeg");
        host.fail_upload_at(2);
        host.fail_destroy_for("a");

        assert!(host.upload("a", &file).await.is_ok());
        assert!(matches!(
            host.upload("b", &file).await,
            Err(BlobError::UploadFailed { .. })
        ));
        assert_eq!(
            host.destroy("a").await.unwrap(),
            DestroyResult::Other("error".into())
        );
        assert!(host.contains("a"));
    }
}
