use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::resolver::{resolve_object_id, ObjectIdStrategy};
use crate::staging::UploadStaging;
use crate::{
    BlobError, BlobResult, DestroyResult, ImageConfig, ImageFile, ImageHost, ImageKeyStrategy,
    ImageRelease, ReleaseOutcome, RemoteDeletion, StagingKey, UploadBatchRecord,
};

const MIN_PURGE_PERIOD: Duration = Duration::from_millis(10);

/// Persists one audit record per successful upload batch.
#[async_trait]
pub trait UploadBatchLog: Send + Sync {
    async fn record(&self, tenant: &str, record: UploadBatchRecord) -> BlobResult<()>;
}

/// Where a batch goes on the host and how its object ids are named.
#[derive(Clone)]
pub struct UploadTarget {
    pub folder: String,
    pub keys: Arc<dyn ImageKeyStrategy>,
}

impl UploadTarget {
    pub fn new<S: Into<String>>(folder: S, keys: Arc<dyn ImageKeyStrategy>) -> Self {
        Self {
            folder: folder.into(),
            keys,
        }
    }
}

/// Image infrastructure embedded by services: uploads into per-session
/// staging slots, resolves stored URLs and deletes remote objects.
pub struct ImageAdapter {
    host: Arc<dyn ImageHost>,
    staging: UploadStaging,
    batch_log: Option<Arc<dyn UploadBatchLog>>,
    config: ImageConfig,
}

impl ImageAdapter {
    pub fn new(host: Arc<dyn ImageHost>, config: ImageConfig) -> Self {
        Self {
            host,
            staging: UploadStaging::new(config.staging_ttl),
            batch_log: None,
            config,
        }
    }

    pub fn with_batch_log(mut self, log: Arc<dyn UploadBatchLog>) -> Self {
        self.batch_log = Some(log);
        self
    }

    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    pub fn staging(&self) -> &UploadStaging {
        &self.staging
    }

    /// Drop expired staging slots once per ttl on `handle`. The task ends
    /// when the last `Arc` to the adapter goes away.
    pub fn spawn_staging_purge(self: &Arc<Self>, handle: &Handle) -> JoinHandle<()> {
        let period = self.staging.ttl().max(MIN_PURGE_PERIOD);
        let adapter: Weak<Self> = Arc::downgrade(self);

        handle.spawn(async move {
            let mut ticks = tokio::time::interval(period);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticks.tick().await;
            loop {
                ticks.tick().await;
                let Some(adapter) = adapter.upgrade() else {
                    break;
                };
                let purged = adapter.staging.purge_expired();
                if purged > 0 {
                    tracing::debug!(purged, "purged expired staging slots");
                }
            }
        })
    }

    async fn with_timeout<T, F>(&self, operation: &'static str, fut: F) -> BlobResult<T>
    where
        F: Future<Output = BlobResult<T>>,
    {
        match tokio::time::timeout(self.config.remote_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(BlobError::Timeout {
                operation,
                secs: self.config.remote_timeout.as_secs(),
            }),
        }
    }

    fn validate(&self, index: usize, file: &ImageFile) -> BlobResult<()> {
        let name = file.filename.as_deref().unwrap_or("<unnamed>");

        if file.is_empty() {
            return Err(BlobError::invalid(format!("file #{index} ({name}) is empty")));
        }
        if file.len() > self.config.max_image_bytes {
            return Err(BlobError::invalid(format!(
                "file #{index} ({name}) is {} bytes, limit is {}",
                file.len(),
                self.config.max_image_bytes
            )));
        }
        if let Some(ct) = file.content_type.as_deref() {
            if !self.config.accepts_content_type(ct) {
                return Err(BlobError::invalid(format!(
                    "file #{index} ({name}) has unsupported content type '{ct}'"
                )));
            }
        }
        if file.extension().is_none() {
            return Err(BlobError::invalid(format!(
                "file #{index} ({name}) has no recognizable image type"
            )));
        }
        Ok(())
    }

    /// Upload `files` in order and stage their URLs for `key`.
    ///
    /// The slot is cleared first. Any failure rejects the whole batch and
    /// leaves the slot empty; objects already uploaded stay on the host.
    /// On success one [`UploadBatchRecord`] is written, then the slot is
    /// replaced with the new URLs.
    pub async fn stage_upload_batch(
        &self,
        key: &StagingKey,
        target: &UploadTarget,
        files: Vec<ImageFile>,
    ) -> BlobResult<Vec<String>> {
        self.staging.clear(key);

        if files.is_empty() {
            return Err(BlobError::invalid("upload batch contains no images"));
        }
        for (i, file) in files.iter().enumerate() {
            self.validate(i, file)?;
        }

        let mut uploaded: Vec<String> = Vec::with_capacity(files.len());
        let mut urls: Vec<String> = Vec::with_capacity(files.len());

        for (i, file) in files.iter().enumerate() {
            let object_id = target.keys.object_id(&target.folder, file);
            let res = self
                .with_timeout("upload", self.host.upload(&object_id, file))
                .await;

            match res {
                Ok(hosted) => {
                    uploaded.push(hosted.object_id);
                    urls.push(hosted.secure_url);
                }
                Err(e) => {
                    if !uploaded.is_empty() {
                        tracing::warn!(
                            host = self.host.name(),
                            orphans = ?uploaded,
                            "upload batch aborted, earlier objects left on host"
                        );
                    }
                    let reason = format!("file #{i}: {e}");
                    return Err(match e {
                        BlobError::Timeout { .. } => e,
                        _ => BlobError::upload_failed(reason),
                    });
                }
            }
        }

        if let Some(log) = &self.batch_log {
            log.record(&key.tenant, UploadBatchRecord::new(urls.clone()))
                .await?;
        }

        self.staging.replace(key, urls.clone());
        tracing::info!(
            tenant = %key.tenant,
            session = %key.session,
            folder = %target.folder,
            count = urls.len(),
            "staged upload batch"
        );

        Ok(urls)
    }

    /// The slot's URLs; the slot is left as is.
    pub fn consume_staged_images(&self, key: &StagingKey) -> Vec<String> {
        self.staging.consume(key)
    }

    pub fn clear_staged(&self, key: &StagingKey) {
        self.staging.clear(key);
    }

    pub fn resolve_object_id(&self, url: &str, strategy: ObjectIdStrategy) -> BlobResult<String> {
        resolve_object_id(url, strategy)
    }

    pub async fn delete_remote_image(&self, object_id: &str) -> BlobResult<RemoteDeletion> {
        let res = self
            .with_timeout("destroy", self.host.destroy(object_id))
            .await;

        match res {
            Ok(DestroyResult::Ok) => Ok(RemoteDeletion::Deleted),
            Ok(DestroyResult::NotFound) => Ok(RemoteDeletion::NotFound),
            Ok(DestroyResult::Other(result)) => Err(BlobError::remote_delete(
                object_id,
                format!("host answered '{result}'"),
            )),
            Err(e @ BlobError::Timeout { .. }) => Err(e),
            Err(e) => Err(BlobError::remote_delete(object_id, e.to_string())),
        }
    }

    async fn release_one(&self, url: String, strategy: ObjectIdStrategy) -> ImageRelease {
        let object_id = match resolve_object_id(&url, strategy) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "skipping image release");
                return ImageRelease {
                    url,
                    outcome: ReleaseOutcome::Skipped {
                        reason: e.to_string(),
                    },
                };
            }
        };

        let outcome = match self.delete_remote_image(&object_id).await {
            Ok(RemoteDeletion::Deleted) => ReleaseOutcome::Released { object_id },
            Ok(RemoteDeletion::NotFound) => {
                tracing::warn!(url = %url, object_id = %object_id, "image already absent on host");
                ReleaseOutcome::Skipped {
                    reason: format!("object '{object_id}' not found on image host"),
                }
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "image release failed");
                ReleaseOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        ImageRelease { url, outcome }
    }

    /// Delete every image independently and concurrently.
    ///
    /// One result per URL, in input order. Never fails as a whole.
    pub async fn release_images(
        &self,
        urls: Vec<String>,
        strategy: ObjectIdStrategy,
    ) -> Vec<ImageRelease> {
        join_all(urls.into_iter().map(|url| self.release_one(url, strategy))).await
    }

    /// Resolve and delete one image. The caller removes the URL from its
    /// record only when this succeeds.
    ///
    /// An object already absent on the host counts as detached.
    pub async fn detach_image(&self, url: &str, strategy: ObjectIdStrategy) -> BlobResult<String> {
        let object_id = resolve_object_id(url, strategy)?;
        match self.delete_remote_image(&object_id).await? {
            RemoteDeletion::Deleted => {}
            RemoteDeletion::NotFound => {
                tracing::info!(object_id = %object_id, "detached image was already absent on host");
            }
        }
        Ok(object_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlatKeyStrategy, MemoryImageHost, NestedKeyStrategy};
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingLog {
        records: Mutex<Vec<(String, UploadBatchRecord)>>,
    }

    #[async_trait]
    impl UploadBatchLog for RecordingLog {
        async fn record(&self, tenant: &str, record: UploadBatchRecord) -> BlobResult<()> {
            self.records.lock().push((tenant.to_string(), record));
            Ok(())
        }
    }

    fn png(name: &str) -> ImageFile {
        ImageFile::new(vec![0x89u8, b'P', b'N', b'G'])
            .with_filename(name)
            .with_content_type("image/png")
    }

    fn setup() -> (Arc<MemoryImageHost>, Arc<RecordingLog>, ImageAdapter) {
        let host = Arc::new(MemoryImageHost::new("https://cdn.test"));
        let log = Arc::new(RecordingLog::default());
        let adapter = ImageAdapter::new(host.clone(), ImageConfig::default())
            .with_batch_log(log.clone());
        (host, log, adapter)
    }

    fn flat(folder: &str) -> UploadTarget {
        UploadTarget::new(folder, Arc::new(FlatKeyStrategy))
    }

    #[tokio::test]
    async fn purge_task_drops_abandoned_slots() {
        let host = Arc::new(MemoryImageHost::new("https://cdn.test"));
        let adapter = Arc::new(ImageAdapter::new(
            host,
            ImageConfig::default().with_staging_ttl(Duration::from_millis(20)),
        ));
        for i in 0..50 {
            let key = StagingKey::new("acme", format!("s{i}"));
            adapter
                .stage_upload_batch(&key, &flat("categories"), vec![png("a.png")])
                .await
                .unwrap();
        }
        assert_eq!(adapter.staging().len(), 50);

        let task = adapter.spawn_staging_purge(&Handle::current());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(adapter.staging().is_empty());

        drop(adapter);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("purge task stops with the adapter")
            .unwrap();
    }

    #[tokio::test]
    async fn staged_batch_is_logged_and_replaces_slot() {
        let (_host, log, adapter) = setup();
        let key = StagingKey::new("acme", "s1");

        let first = adapter
            .stage_upload_batch(&key, &flat("categories"), vec![png("a.png"), png("b.png")])
            .await
            .unwrap();
        assert_eq!(first.len(), 2);

        let second = adapter
            .stage_upload_batch(&key, &flat("categories"), vec![png("c.png")])
            .await
            .unwrap();

        assert_eq!(adapter.consume_staged_images(&key), second);

        let records = log.records.lock();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, "acme");
        assert_eq!(records[1].1.images, second);
    }

    #[tokio::test]
    async fn failing_file_rejects_whole_batch() {
        let (host, log, adapter) = setup();
        let key = StagingKey::new("acme", "s1");

        adapter
            .stage_upload_batch(&key, &flat("products"), vec![png("old.png")])
            .await
            .unwrap();

        host.fail_upload_at(3);
        let err = adapter
            .stage_upload_batch(
                &key,
                &flat("products"),
                vec![png("a.png"), png("b.png"), png("c.png")],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BlobError::UploadFailed { .. }));
        assert!(adapter.consume_staged_images(&key).is_empty());
        assert_eq!(log.records.lock().len(), 1);
        // old.png plus the orphaned a.png
        assert_eq!(host.len(), 2);
    }

    #[tokio::test]
    async fn invalid_files_are_rejected_before_any_upload() {
        let (host, _log, adapter) = setup();
        let key = StagingKey::new("acme", "s1");
        let text = ImageFile::new(b"hello".to_vec())
            .with_filename("notes.txt")
            .with_content_type("text/plain");

        let err = adapter
            .stage_upload_batch(&key, &flat("banners"), vec![png("a.png"), text])
            .await
            .unwrap_err();

        assert!(matches!(err, BlobError::Invalid { .. }));
        assert!(host.is_empty());

        let err = adapter
            .stage_upload_batch(&key, &flat("banners"), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Invalid { .. }));
    }

    #[tokio::test]
    async fn release_isolates_failures() {
        let (host, _log, adapter) = setup();
        let key = StagingKey::new("acme", "s1");
        let urls = adapter
            .stage_upload_batch(
                &key,
                &flat("categories"),
                vec![png("a.png"), png("b.png"), png("c.png")],
            )
            .await
            .unwrap();

        let second = ObjectIdStrategy::SimpleId.resolve(&urls[1]).unwrap();
        host.fail_destroy_for(second);

        let releases = adapter
            .release_images(urls.clone(), ObjectIdStrategy::SimpleId)
            .await;

        assert_eq!(releases.len(), 3);
        assert!(releases[0].is_released());
        assert!(releases[1].is_failed());
        assert!(releases[2].is_released());
        assert_eq!(releases[1].url, urls[1]);
        assert_eq!(host.len(), 1);
    }

    #[tokio::test]
    async fn release_skips_unresolvable_urls() {
        let (_host, _log, adapter) = setup();
        let releases = adapter
            .release_images(
                vec!["https://cdn.test/no-extension".into()],
                ObjectIdStrategy::SimpleId,
            )
            .await;
        assert!(matches!(releases[0].outcome, ReleaseOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn detach_uses_path_aware_ids_for_nested_keys() {
        let (host, _log, adapter) = setup();
        let key = StagingKey::new("acme", "s1");
        let target = UploadTarget::new("users", Arc::new(NestedKeyStrategy));
        let urls = adapter
            .stage_upload_batch(&key, &target, vec![png("me.png")])
            .await
            .unwrap();

        // the simple rule names a different object
        let simple = adapter
            .resolve_object_id(&urls[0], ObjectIdStrategy::SimpleId)
            .unwrap();
        assert_eq!(
            adapter.delete_remote_image(&simple).await.unwrap(),
            RemoteDeletion::NotFound
        );

        let object_id = adapter
            .detach_image(&urls[0], ObjectIdStrategy::PathAwareId)
            .await
            .unwrap();
        assert!(object_id.starts_with("users/"));
        assert!(host.is_empty());
    }

    #[tokio::test]
    async fn remote_delete_errors_surface() {
        let (host, _log, adapter) = setup();
        host.fail_destroy_for("x");
        let err = adapter.delete_remote_image("x").await.unwrap_err();
        assert!(matches!(err, BlobError::RemoteDelete { .. }));
    }

    struct StalledHost;

    #[async_trait]
    impl ImageHost for StalledHost {
        async fn upload(&self, _object_id: &str, _file: &ImageFile) -> BlobResult<crate::HostedImage> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(BlobError::upload_failed("unreachable"))
        }

        async fn destroy(&self, _object_id: &str) -> BlobResult<DestroyResult> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(DestroyResult::Ok)
        }

        fn name(&self) -> &'static str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn host_calls_time_out() {
        let adapter = ImageAdapter::new(
            Arc::new(StalledHost),
            ImageConfig::default().with_remote_timeout(Duration::from_millis(20)),
        );
        let key = StagingKey::new("acme", "s1");

        let err = adapter
            .stage_upload_batch(&key, &flat("categories"), vec![png("a.png")])
            .await
            .unwrap_err();
        assert!(matches!(err, BlobError::Timeout { operation: "upload", .. }));

        let err = adapter.delete_remote_image("a").await.unwrap_err();
        assert!(matches!(err, BlobError::Timeout { operation: "destroy", .. }));
    }
}
