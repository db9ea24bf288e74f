use std::sync::Arc;

use shop_blob::ImageAdapter;

use crate::services::adapters::document_store::DocumentStore;

pub type AdminParams = shop_axum::params::RestParams;

/// Shared by every service and image route.
pub struct AdminState {
    pub store: Arc<DocumentStore>,
    pub images: Arc<ImageAdapter>,
}

impl AdminState {
    pub fn new(store: Arc<DocumentStore>, images: Arc<ImageAdapter>) -> Self {
        Self { store, images }
    }
}
