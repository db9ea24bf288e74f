use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{primitives::ByteStream as AwsByteStream, Client};
use std::env;

use crate::store::{public_url, UPLOAD_SEGMENT};
use crate::{BlobError, BlobResult, DestroyResult, HostedImage, ImageFile, ImageHost};

/// S3-compatible host configuration
#[derive(Debug, Clone)]
pub struct S3HostConfig {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: String,
    pub bucket: String,
    /// Public base the bucket is served from; URLs are `<base>/upload/<id>.<ext>`
    pub public_base_url: String,
}

impl S3HostConfig {
    /// Read `SHOP_S3_*` environment variables.
    pub fn from_env() -> BlobResult<Self> {
        fn get_env(key: &str) -> BlobResult<String> {
            env::var(key)
                .map_err(|_| BlobError::invalid(format!("{} environment variable required", key)))
        }

        Ok(Self {
            region: get_env("SHOP_S3_REGION")?,
            access_key_id: get_env("SHOP_S3_ACCESS_KEY_ID")?,
            secret_access_key: get_env("SHOP_S3_SECRET_ACCESS_KEY")?,
            endpoint_url: get_env("SHOP_S3_ENDPOINT_URL")?,
            bucket: get_env("SHOP_S3_BUCKET")?,
            public_base_url: get_env("SHOP_S3_PUBLIC_BASE_URL")?,
        })
    }
}

/// Image host backed by any S3-compatible object store.
///
/// Objects are stored under `upload/<object id>.<ext>` so the public URL maps
/// straight onto the bucket key.
#[derive(Clone)]
pub struct S3ImageHost {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl S3ImageHost {
    pub async fn from_env() -> BlobResult<Self> {
        Self::new(S3HostConfig::from_env()?).await
    }

    pub async fn new(config: S3HostConfig) -> BlobResult<Self> {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "shop-images",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .endpoint_url(config.endpoint_url)
            .load()
            .await;

        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(true)
                .build(),
        );

        Ok(Self {
            client,
            bucket: config.bucket,
            public_base_url: config.public_base_url,
        })
    }

    fn key_prefix(object_id: &str) -> String {
        format!("{}/{}.", UPLOAD_SEGMENT, object_id)
    }

    fn map_aws_error(err: impl std::error::Error + Send + Sync + 'static) -> BlobError {
        BlobError::backend(err)
    }
}

#[async_trait]
impl ImageHost for S3ImageHost {
    #[tracing::instrument(skip(self, file), fields(bytes = file.len()))]
    async fn upload(&self, object_id: &str, file: &ImageFile) -> BlobResult<HostedImage> {
        let ext = file
            .extension()
            .ok_or_else(|| BlobError::invalid("image has no recognizable extension"))?;
        let key = format!("{}{}", Self::key_prefix(object_id), ext);

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(AwsByteStream::from(file.bytes.to_vec()));

        if let Some(ct) = file.content_type.as_deref() {
            request = request.content_type(ct);
        }
        if let Some(filename) = file.filename.as_deref() {
            request = request.metadata("filename", filename);
        }

        request
            .send()
            .await
            .map_err(|e| BlobError::upload_failed(format!("{key}: {e}")))?;

        Ok(HostedImage {
            secure_url: public_url(&self.public_base_url, object_id, &ext),
            object_id: object_id.to_string(),
        })
    }

    /// The extension is not part of the object id, so the bucket is listed
    /// by `upload/<object id>.` and every match is deleted.
    #[tracing::instrument(skip(self))]
    async fn destroy(&self, object_id: &str) -> BlobResult<DestroyResult> {
        let listed = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(Self::key_prefix(object_id))
            .send()
            .await
            .map_err(Self::map_aws_error)?;

        let keys: Vec<String> = listed
            .contents()
            .iter()
            .filter_map(|o| o.key().map(|k| k.to_string()))
            .collect();

        if keys.is_empty() {
            return Ok(DestroyResult::NotFound);
        }

        for key in keys {
            if let Err(e) = self
                .client
                .delete_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
            {
                return Ok(DestroyResult::Other(e.to_string()));
            }
        }

        Ok(DestroyResult::Ok)
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroy_prefix_matches_only_the_object_itself() {
        let prefix = S3ImageHost::key_prefix("users/abc");
        assert_eq!(prefix, "upload/users/abc.");
        assert!("upload/users/abc.png".starts_with(&prefix));
        assert!(!"upload/users/abcd.png".starts_with(&prefix));
    }
}
