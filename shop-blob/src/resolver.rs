//! Image reference resolver: stored URL → remote object id.
//!
//! Two rules coexist and are not interchangeable. A URL produced with one
//! layout and resolved with the other rule names a different object (or
//! none), so every call site picks its rule explicitly.

use serde::{Deserialize, Serialize};

use crate::store::UPLOAD_SEGMENT;
use crate::{BlobError, BlobResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectIdStrategy {
    /// Final path segment without its extension.
    ///
    /// `https://host/x/y/z/name.jpg` → `name`
    SimpleId,
    /// Every segment after the literal `upload` segment, joined with `/`,
    /// extension stripped.
    ///
    /// `https://host/img/upload/categories/abc123.png` → `categories/abc123`
    PathAwareId,
}

impl ObjectIdStrategy {
    pub fn resolve(&self, url: &str) -> BlobResult<String> {
        resolve_object_id(url, *self)
    }
}

/// Path segments of a URL, without scheme, host, query or fragment.
fn path_segments(url: &str) -> Vec<&str> {
    let url = url.trim();
    let url = url.split('#').next().unwrap_or_default();
    let url = url.split('?').next().unwrap_or_default();

    let path = match url.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or_default(),
        None => url,
    };

    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Text before the first `.`; the segment must carry an extension.
fn strip_extension<'a>(url: &str, segment: &'a str) -> BlobResult<&'a str> {
    let Some((stem, ext)) = segment.split_once('.') else {
        return Err(BlobError::resolution(url, "no file extension"));
    };
    if stem.is_empty() {
        return Err(BlobError::resolution(url, "empty file name"));
    }
    if ext.is_empty() {
        return Err(BlobError::resolution(url, "empty file extension"));
    }
    Ok(stem)
}

pub fn resolve_object_id(url: &str, strategy: ObjectIdStrategy) -> BlobResult<String> {
    let segments = path_segments(url);
    let Some(last) = segments.last() else {
        return Err(BlobError::resolution(url, "no path"));
    };

    match strategy {
        ObjectIdStrategy::SimpleId => Ok(strip_extension(url, last)?.to_string()),
        ObjectIdStrategy::PathAwareId => {
            let Some(pos) = segments.iter().position(|s| *s == UPLOAD_SEGMENT) else {
                return Err(BlobError::resolution(url, "no 'upload' segment"));
            };

            let rest = &segments[pos + 1..];
            let Some((file, folders)) = rest.split_last() else {
                return Err(BlobError::resolution(url, "nothing after 'upload'"));
            };

            let stem = strip_extension(url, file)?;
            let mut parts: Vec<&str> = folders.to_vec();
            parts.push(stem);
            Ok(parts.join("/"))
        }
    }
}
