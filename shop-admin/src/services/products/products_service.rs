use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use shop_blob::ImageAdapter;
use shop_core::{ServiceCapabilities, ShopContext, ShopService};

use super::products_shared::{self, COLLECTION};
use crate::services::adapters::document_store::{Filter, TenantCollection};
use crate::services::images::ImageResource;
use crate::services::query::{filter_from_query, page_from_query, query_f64};
use crate::services::records::{for_create, for_patch, for_update, release_and_remove};
use crate::services::{AdminParams, AdminState};

const FILTERS: &[(&str, &str)] = &[
    ("catId", "catId"),
    ("category", "category"),
    ("subCatId", "subCatId"),
    ("isFeatured", "isFeatured"),
];

fn product_filter(params: &AdminParams) -> Filter {
    filter_from_query(params, FILTERS).range(
        "price",
        query_f64(params, "minPrice"),
        query_f64(params, "maxPrice"),
    )
}

pub struct ProductsService {
    adapter: TenantCollection,
    images: Arc<ImageAdapter>,
    resource: ImageResource,
}

impl ProductsService {
    pub fn new(state: &AdminState) -> Self {
        Self {
            adapter: TenantCollection::new(Arc::clone(&state.store), COLLECTION, "Product not found"),
            images: Arc::clone(&state.images),
            resource: ImageResource::products(),
        }
    }
}

#[async_trait]
impl ShopService<Value, AdminParams> for ProductsService {
    fn capabilities(&self) -> ServiceCapabilities {
        products_shared::capabilities()
    }

    async fn find(&self, ctx: &ShopContext, params: AdminParams) -> Result<Vec<Value>> {
        let filter = product_filter(&params);
        self.adapter._find(ctx, &filter, page_from_query(&params)).await
    }

    async fn get(&self, ctx: &ShopContext, id: &str, _params: AdminParams) -> Result<Value> {
        self.adapter._get(ctx, id).await
    }

    async fn create(&self, ctx: &ShopContext, data: Value, _params: AdminParams) -> Result<Value> {
        self.adapter._create(ctx, for_create(data)?).await
    }

    async fn update(&self, ctx: &ShopContext, id: &str, data: Value, _params: AdminParams) -> Result<Value> {
        let existing = self.adapter._get(ctx, id).await?;
        let data = for_update(&existing, data, &["images"])?;
        self.adapter._update(ctx, id, data).await
    }

    async fn patch(&self, ctx: &ShopContext, id: &str, data: Value, _params: AdminParams) -> Result<Value> {
        self.adapter._patch(ctx, id, for_patch(data)?).await
    }

    async fn remove(&self, ctx: &ShopContext, id: &str, _params: AdminParams) -> Result<Value> {
        release_and_remove(&self.adapter, &self.images, self.resource.release, ctx, id).await
    }

    async fn count(&self, ctx: &ShopContext, params: AdminParams) -> Result<u64> {
        self.adapter._count(ctx, &product_filter(&params)).await
    }
}
