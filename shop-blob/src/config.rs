use std::time::Duration;

/// Configuration for image operations
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// Max size of a single uploaded image
    pub max_image_bytes: usize,

    /// Content types accepted by uploads. Empty accepts any `image/*`.
    pub allowed_content_types: Vec<String>,

    /// Upper bound for every call to the image host
    pub remote_timeout: Duration,

    /// How long a staged batch stays visible to its session
    pub staging_ttl: Duration,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 10 * 1024 * 1024, // 10MB
            allowed_content_types: vec![
                "image/jpeg".into(),
                "image/png".into(),
                "image/webp".into(),
                "image/gif".into(),
                "image/avif".into(),
                "image/svg+xml".into(),
            ],
            remote_timeout: Duration::from_secs(30),
            staging_ttl: Duration::from_secs(30 * 60),
        }
    }
}

impl ImageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_image_bytes(mut self, bytes: usize) -> Self {
        self.max_image_bytes = bytes;
        self
    }

    pub fn with_allowed_content_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_content_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn with_staging_ttl(mut self, ttl: Duration) -> Self {
        self.staging_ttl = ttl;
        self
    }

    pub fn accepts_content_type(&self, content_type: &str) -> bool {
        let ct = content_type.trim().to_ascii_lowercase();
        if self.allowed_content_types.is_empty() {
            return ct.starts_with("image/");
        }
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&ct))
    }
}
