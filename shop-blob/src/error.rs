use thiserror::Error;

/// Result type for image operations
pub type BlobResult<T> = Result<T, BlobError>;

/// Errors that can occur while uploading, resolving or deleting images
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Image not found: {id}")]
    NotFound { id: String },

    #[error("Invalid image: {message}")]
    Invalid { message: String },

    /// The image host rejected or failed a file of an upload batch.
    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    /// A stored URL could not be mapped to a remote object id.
    #[error("Cannot resolve object id from '{url}': {reason}")]
    Resolution { url: String, reason: String },

    /// The image host failed a delete or answered something other than "ok".
    #[error("Remote delete of '{id}' failed: {reason}")]
    RemoteDelete { id: String, reason: String },

    #[error("Image host timed out after {secs}s during {operation}")]
    Timeout { operation: &'static str, secs: u64 },

    #[error("Image host error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl BlobError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(id: S) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn upload_failed<S: Into<String>>(reason: S) -> Self {
        Self::UploadFailed {
            reason: reason.into(),
        }
    }

    pub fn resolution<U: Into<String>, R: Into<String>>(url: U, reason: R) -> Self {
        Self::Resolution {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn remote_delete<I: Into<String>, R: Into<String>>(id: I, reason: R) -> Self {
        Self::RemoteDelete {
            id: id.into(),
            reason: reason.into(),
        }
    }
}
