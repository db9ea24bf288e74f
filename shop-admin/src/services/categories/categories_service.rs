use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use shop_blob::ImageAdapter;
use shop_core::errors::ShopError;
use shop_core::{ServiceCapabilities, ShopContext, ShopService};

use super::categories_shared::{self, COLLECTION};
use super::category_tree::{build_forest, CategoryRecord, TreeError};
use crate::services::adapters::document_store::{Filter, Page, TenantCollection};
use crate::services::images::ImageResource;
use crate::services::query::{filter_from_query, page_from_query};
use crate::services::records::{for_create, for_patch, for_update, release_and_remove};
use crate::services::{AdminParams, AdminState};

const FILTERS: &[(&str, &str)] = &[("parentId", "parentId")];

fn tree_error(err: TreeError) -> anyhow::Error {
    match &err {
        TreeError::CyclicHierarchy { id } => {
            let data = json!({ "id": id });
            ShopError::conflict(err.to_string()).with_data(data).into_anyhow()
        }
    }
}

pub struct CategoriesService {
    adapter: TenantCollection,
    images: Arc<ImageAdapter>,
    resource: ImageResource,
}

impl CategoriesService {
    pub fn new(state: &AdminState) -> Self {
        Self {
            adapter: TenantCollection::new(Arc::clone(&state.store), COLLECTION, "Category not found"),
            images: Arc::clone(&state.images),
            resource: ImageResource::categories(),
        }
    }

    /// Every category of the tenant nested under its parent.
    async fn forest(&self, ctx: &ShopContext) -> Result<Vec<Value>> {
        let docs = self.adapter._find(ctx, &Filter::new(), Page::all()).await?;
        let records: Vec<CategoryRecord> = docs.iter().filter_map(CategoryRecord::from_value).collect();

        let forest = build_forest(&records).map_err(tree_error)?;
        forest
            .into_iter()
            .map(|node| serde_json::to_value(node).map_err(anyhow::Error::from))
            .collect()
    }
}

#[async_trait]
impl ShopService<Value, AdminParams> for CategoriesService {
    fn capabilities(&self) -> ServiceCapabilities {
        categories_shared::crud_capabilities()
    }

    /// The category forest, or stored records with `?flat=true`.
    async fn find(&self, ctx: &ShopContext, params: AdminParams) -> Result<Vec<Value>> {
        if params.query_bool("flat") == Some(true) {
            let filter = filter_from_query(&params, FILTERS);
            return self.adapter._find(ctx, &filter, page_from_query(&params)).await;
        }
        self.forest(ctx).await
    }

    async fn get(&self, ctx: &ShopContext, id: &str, _params: AdminParams) -> Result<Value> {
        self.adapter._get(ctx, id).await
    }

    async fn create(&self, ctx: &ShopContext, data: Value, _params: AdminParams) -> Result<Value> {
        self.adapter._create(ctx, for_create(data)?).await
    }

    /// A replacement without `parentId` keeps the category where it is;
    /// an explicit `null` moves it to the root.
    async fn update(&self, ctx: &ShopContext, id: &str, data: Value, _params: AdminParams) -> Result<Value> {
        let existing = self.adapter._get(ctx, id).await?;
        let data = for_update(&existing, data, &["images", "parentId"])?;
        self.adapter._update(ctx, id, data).await
    }

    async fn patch(&self, ctx: &ShopContext, id: &str, data: Value, _params: AdminParams) -> Result<Value> {
        self.adapter._patch(ctx, id, for_patch(data)?).await
    }

    async fn remove(&self, ctx: &ShopContext, id: &str, _params: AdminParams) -> Result<Value> {
        release_and_remove(&self.adapter, &self.images, self.resource.release, ctx, id).await
    }

    async fn count(&self, ctx: &ShopContext, params: AdminParams) -> Result<u64> {
        let filter = filter_from_query(&params, FILTERS);
        self.adapter._count(ctx, &filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::adapters::document_store::DocumentStore;
    use shop_blob::{ImageConfig, MemoryImageHost};

    fn service() -> (Arc<DocumentStore>, CategoriesService) {
        let store = Arc::new(DocumentStore::new());
        let host = Arc::new(MemoryImageHost::new("https://cdn.test/media"));
        let images = Arc::new(ImageAdapter::new(host, ImageConfig::default()));
        let state = AdminState::new(Arc::clone(&store), images);
        (store, CategoriesService::new(&state))
    }

    #[tokio::test]
    async fn find_nests_children_and_flat_lists_records() {
        let (_, svc) = service();
        let ctx = ShopContext::new("acme");

        let c1 = svc
            .create(&ctx, json!({"name": "C1", "slug": "c1"}), AdminParams::internal())
            .await
            .unwrap();
        let c1_id = c1["id"].as_str().unwrap().to_string();
        svc.create(
            &ctx,
            json!({"name": "C2", "slug": "c2", "parentId": c1_id}),
            AdminParams::internal(),
        )
        .await
        .unwrap();

        let forest = svc.find(&ctx, AdminParams::internal()).await.unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0]["children"][0]["name"], "C2");

        let roots = svc
            .find(
                &ctx,
                AdminParams::internal()
                    .with_query("flat", "true")
                    .with_query("parentId[$exists]", "false"),
            )
            .await
            .unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(svc.count(&ctx, AdminParams::internal()).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn stored_cycle_is_a_conflict() {
        let (store, svc) = service();
        let ctx = ShopContext::new("acme");
        store
            .create("acme", COLLECTION, json!({"id": "a", "name": "A", "parentId": "b"}))
            .await
            .unwrap();
        store
            .create("acme", COLLECTION, json!({"id": "b", "name": "B", "parentId": "a"}))
            .await
            .unwrap();

        let err = svc.find(&ctx, AdminParams::internal()).await.unwrap_err();
        let shop = ShopError::from_anyhow(&err).unwrap();
        assert_eq!(shop.code(), 409);
        assert!(shop.data.is_some());
    }

    #[tokio::test]
    async fn update_keeps_images_when_absent() {
        let (_, svc) = service();
        let ctx = ShopContext::new("acme");
        let created = svc
            .create(
                &ctx,
                json!({"name": "C1", "images": ["https://cdn.test/media/upload/categories_a.png"]}),
                AdminParams::internal(),
            )
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap();

        let updated = svc
            .update(&ctx, id, json!({"name": "Renamed"}), AdminParams::internal())
            .await
            .unwrap();
        assert_eq!(updated["images"], created["images"]);
        assert_eq!(updated["createdAt"], created["createdAt"]);
    }

    #[tokio::test]
    async fn renaming_a_subcategory_keeps_its_parent() {
        let (_, svc) = service();
        let ctx = ShopContext::new("acme");
        let parent = svc
            .create(&ctx, json!({"name": "Fashion"}), AdminParams::internal())
            .await
            .unwrap();
        let child = svc
            .create(
                &ctx,
                json!({"name": "Shoes", "parentId": parent["id"]}),
                AdminParams::internal(),
            )
            .await
            .unwrap();
        let child_id = child["id"].as_str().unwrap();

        let renamed = svc
            .update(
                &ctx,
                child_id,
                json!({"name": "Sneakers", "color": "#fff"}),
                AdminParams::internal(),
            )
            .await
            .unwrap();
        assert_eq!(renamed["parentId"], parent["id"]);

        let forest = svc.find(&ctx, AdminParams::internal()).await.unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0]["children"][0]["name"], "Sneakers");

        let moved = svc
            .update(
                &ctx,
                child_id,
                json!({"name": "Sneakers", "parentId": null}),
                AdminParams::internal(),
            )
            .await
            .unwrap();
        assert!(moved["parentId"].is_null());
        assert_eq!(svc.find(&ctx, AdminParams::internal()).await.unwrap().len(), 2);
    }
}
