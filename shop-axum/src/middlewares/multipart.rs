use std::collections::{HashMap, HashSet};

use axum::{body::Body, http::HeaderMap};
use bytes::Bytes;
use shop_core::errors::ShopError;

/// Limits and field selection for reading multipart/form-data bodies
#[derive(Debug, Clone)]
pub struct MultipartConfig {
    /// Maximum size of a single file in bytes (None = unlimited)
    pub max_file_size: Option<u64>,
    /// Maximum total request size in bytes (None = unlimited)
    pub max_total_size: Option<u64>,
    /// Field names to treat as files (empty = any field carrying a filename)
    pub file_fields: HashSet<String>,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_file_size: Some(10 * 1024 * 1024),  // 10MB
            max_total_size: Some(100 * 1024 * 1024), // 100MB
            file_fields: HashSet::new(),
        }
    }
}

impl MultipartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = Some(size);
        self
    }

    pub fn max_total_size(mut self, size: u64) -> Self {
        self.max_total_size = Some(size);
        self
    }

    pub fn file_field(mut self, field_name: &str) -> Self {
        self.file_fields.insert(field_name.to_string());
        self
    }

    fn is_file_field(&self, name: &str, filename: Option<&str>) -> bool {
        if self.file_fields.is_empty() {
            filename.is_some()
        } else {
            self.file_fields.contains(name)
        }
    }

    fn constraints(&self) -> multer::Constraints {
        let mut limit = multer::SizeLimit::new();
        if let Some(total) = self.max_total_size {
            limit = limit.whole_stream(total);
        }
        if let Some(per_file) = self.max_file_size {
            limit = limit.per_field(per_file);
        }
        multer::Constraints::new().size_limit(limit)
    }
}

/// One file read from a multipart body
#[derive(Debug, Clone)]
pub struct MultipartFile {
    pub field: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Files in field order, plus plain text fields
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    pub files: Vec<MultipartFile>,
    pub fields: HashMap<String, String>,
}

impl MultipartForm {
    pub fn files_named<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a MultipartFile> + 'a {
        self.files.iter().filter(move |f| f.field == field)
    }
}

fn bad_multipart(e: impl std::fmt::Display) -> anyhow::Error {
    ShopError::bad_request(format!("Failed to parse multipart data: {e}")).into_anyhow()
}

/// Read a multipart/form-data body into memory, enforcing `config` limits.
pub async fn read_multipart(
    headers: &HeaderMap,
    body: Body,
    config: &MultipartConfig,
) -> anyhow::Result<MultipartForm> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !content_type.starts_with("multipart/form-data") {
        return Err(ShopError::bad_request("Expected a multipart/form-data request").into_anyhow());
    }

    let boundary = multer::parse_boundary(content_type).map_err(bad_multipart)?;

    let mut multipart = multer::Multipart::with_constraints(
        body.into_data_stream(),
        boundary,
        config.constraints(),
    );

    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or("unknown").to_string();
        let filename = field.file_name().map(|f| f.to_string());
        let content_type = field.content_type().map(|ct| ct.to_string());

        if config.is_file_field(&name, filename.as_deref()) {
            let data = field.bytes().await.map_err(bad_multipart)?;
            tracing::debug!(field = %name, bytes = data.len(), "multipart file read");
            form.files.push(MultipartFile {
                field: name,
                filename,
                content_type,
                data,
            });
        } else {
            let value = field.text().await.map_err(bad_multipart)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}
