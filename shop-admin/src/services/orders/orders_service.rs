use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use shop_core::{ServiceCapabilities, ShopContext, ShopService};

use super::orders_shared::{self, COLLECTION};
use crate::services::adapters::document_store::TenantCollection;
use crate::services::query::{filter_from_query, page_from_query};
use crate::services::records::{for_create, for_patch, for_update};
use crate::services::{AdminParams, AdminState};

/// `?userId=` filters the stored `userid` field.
const FILTERS: &[(&str, &str)] = &[("userId", "userid"), ("status", "status"), ("isPaid", "isPaid")];

pub struct OrdersService {
    adapter: TenantCollection,
}

impl OrdersService {
    pub fn new(state: &AdminState) -> Self {
        Self {
            adapter: TenantCollection::new(Arc::clone(&state.store), COLLECTION, "Order not found"),
        }
    }
}

#[async_trait]
impl ShopService<Value, AdminParams> for OrdersService {
    fn capabilities(&self) -> ServiceCapabilities {
        orders_shared::capabilities()
    }

    async fn find(&self, ctx: &ShopContext, params: AdminParams) -> Result<Vec<Value>> {
        let filter = filter_from_query(&params, FILTERS);
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
        let data = for_update(&existing, data, &["userid"])?;
        self.adapter._update(ctx, id, data).await
    }

    async fn patch(&self, ctx: &ShopContext, id: &str, data: Value, _params: AdminParams) -> Result<Value> {
        self.adapter._patch(ctx, id, for_patch(data)?).await
    }

    async fn remove(&self, ctx: &ShopContext, id: &str, _params: AdminParams) -> Result<Value> {
        self.adapter._remove(ctx, id).await
    }

    async fn count(&self, ctx: &ShopContext, params: AdminParams) -> Result<u64> {
        let filter = filter_from_query(&params, FILTERS);
        self.adapter._count(ctx, &filter).await
    }
}
