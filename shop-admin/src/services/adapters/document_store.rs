//! Tenant-scoped, insertion-ordered collections of JSON documents.
//!
//! Stands in for the document database: every collection keeps its records
//! in the order they were created, so listings (and the children of a
//! category node) come back in store order.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use shop_blob::{BlobError, BlobResult, UploadBatchLog, UploadBatchRecord};
use shop_core::errors::ShopError;
use shop_core::ShopContext;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const IMAGE_UPLOADS: &str = "imageUploads";

type Collections = HashMap<String, Vec<Value>>;

fn doc_id(doc: &Value) -> Option<&str> {
    doc.get("id").and_then(|v| v.as_str())
}

/// A field holding `null` or `""` counts as absent.
fn present(v: Option<&Value>) -> Option<&Value> {
    match v {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => Some(v),
    }
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone)]
enum Clause {
    Eq { field: String, value: Value },
    Exists { field: String, present: bool },
    Range {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl Clause {
    fn matches(&self, doc: &Value) -> bool {
        match self {
            Clause::Eq { field, value } => present(doc.get(field)) == Some(value),
            Clause::Exists { field, present: want } => present(doc.get(field)).is_some() == *want,
            Clause::Range { field, min, max } => {
                let Some(n) = present(doc.get(field)).and_then(as_number) else {
                    return false;
                };
                min.map_or(true, |m| n >= m) && max.map_or(true, |m| n <= m)
            }
        }
    }
}

/// Conjunction of equality, presence and numeric range tests.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq<F: Into<String>, V: Into<Value>>(mut self, field: F, value: V) -> Self {
        self.clauses.push(Clause::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn exists<F: Into<String>>(mut self, field: F, present: bool) -> Self {
        self.clauses.push(Clause::Exists {
            field: field.into(),
            present,
        });
        self
    }

    pub fn range<F: Into<String>>(mut self, field: F, min: Option<f64>, max: Option<f64>) -> Self {
        if min.is_some() || max.is_some() {
            self.clauses.push(Clause::Range {
                field: field.into(),
                min,
                max,
            });
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.clauses.iter().all(|c| c.matches(doc))
    }
}

/// `skip`/`limit` window over a filtered listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub skip: usize,
    pub limit: Option<usize>,
}

impl Page {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(skip: usize, limit: Option<usize>) -> Self {
        Self { skip, limit }
    }
}

#[derive(Default)]
pub struct DocumentStore {
    tenants: RwLock<HashMap<String, Collections>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn find(&self, tenant: &str, collection: &str, filter: &Filter, page: Page) -> Vec<Value> {
        let tenants = self.tenants.read().await;
        let Some(docs) = tenants.get(tenant).and_then(|c| c.get(collection)) else {
            return Vec::new();
        };

        let matching = docs.iter().filter(|d| filter.matches(d)).skip(page.skip);
        match page.limit {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        }
    }

    pub async fn count(&self, tenant: &str, collection: &str, filter: &Filter) -> u64 {
        let tenants = self.tenants.read().await;
        tenants
            .get(tenant)
            .and_then(|c| c.get(collection))
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count() as u64)
            .unwrap_or(0)
    }

    pub async fn get(&self, tenant: &str, collection: &str, id: &str) -> Option<Value> {
        let tenants = self.tenants.read().await;
        tenants
            .get(tenant)
            .and_then(|c| c.get(collection))
            .and_then(|docs| docs.iter().find(|d| doc_id(d) == Some(id)))
            .cloned()
    }

    /// Insert `data`, assigning an `id` when it carries none.
    pub async fn create(&self, tenant: &str, collection: &str, data: Value) -> Result<Value> {
        let mut obj = match data {
            Value::Object(obj) => obj,
            _ => {
                return Err(ShopError::bad_request("A document must be a JSON object").into_anyhow())
            }
        };

        let id = obj
            .get("id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        obj.insert("id".to_string(), Value::String(id.clone()));

        let mut tenants = self.tenants.write().await;
        let docs = tenants
            .entry(tenant.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default();

        if docs.iter().any(|d| doc_id(d) == Some(id.as_str())) {
            return Err(ShopError::conflict(format!("Document '{id}' already exists")).into_anyhow());
        }

        let value = Value::Object(obj);
        docs.push(value.clone());
        Ok(value)
    }

    /// Replace the whole document, keeping its id and position.
    pub async fn replace(&self, tenant: &str, collection: &str, id: &str, data: Value) -> Option<Value> {
        let mut obj = data.as_object().cloned().unwrap_or_default();
        obj.insert("id".to_string(), Value::String(id.to_string()));

        self.modify(tenant, collection, id, |doc| *doc = Value::Object(obj))
            .await
    }

    /// Merge the top-level fields of `data` into the document.
    pub async fn patch(&self, tenant: &str, collection: &str, id: &str, data: Value) -> Option<Value> {
        let patch: Map<String, Value> = data.as_object().cloned().unwrap_or_default();

        self.modify(tenant, collection, id, |doc| {
            if let Some(record) = doc.as_object_mut() {
                for (k, v) in patch {
                    if k != "id" {
                        record.insert(k, v);
                    }
                }
            }
        })
        .await
    }

    pub async fn remove(&self, tenant: &str, collection: &str, id: &str) -> Option<Value> {
        let mut tenants = self.tenants.write().await;
        let docs = tenants.get_mut(tenant)?.get_mut(collection)?;
        let pos = docs.iter().position(|d| doc_id(d) == Some(id))?;
        Some(docs.remove(pos))
    }

    async fn modify<F>(&self, tenant: &str, collection: &str, id: &str, f: F) -> Option<Value>
    where
        F: FnOnce(&mut Value),
    {
        let mut tenants = self.tenants.write().await;
        let doc = tenants
            .get_mut(tenant)?
            .get_mut(collection)?
            .iter_mut()
            .find(|d| doc_id(d) == Some(id))?;
        f(doc);
        Some(doc.clone())
    }
}

#[async_trait]
impl UploadBatchLog for DocumentStore {
    async fn record(&self, tenant: &str, record: UploadBatchRecord) -> BlobResult<()> {
        let doc = serde_json::to_value(&record).map_err(BlobError::backend)?;
        self.create(tenant, IMAGE_UPLOADS, doc)
            .await
            .map(|_| ())
            .map_err(|e| BlobError::Backend { source: e.into() })
    }
}

/// One collection seen through a service: tenant from the request
/// context, NotFound errors named after the resource.
#[derive(Clone)]
pub struct TenantCollection {
    pub store: Arc<DocumentStore>,
    pub collection: &'static str,
    pub not_found_prefix: &'static str,
}

impl TenantCollection {
    pub fn new(store: Arc<DocumentStore>, collection: &'static str, not_found_prefix: &'static str) -> Self {
        Self {
            store,
            collection,
            not_found_prefix,
        }
    }

    fn not_found(&self, id: &str) -> anyhow::Error {
        ShopError::not_found(format!("{}: {id}", self.not_found_prefix)).into_anyhow()
    }

    pub async fn _find(&self, ctx: &ShopContext, filter: &Filter, page: Page) -> Result<Vec<Value>> {
        Ok(self.store.find(ctx.tenant(), self.collection, filter, page).await)
    }

    pub async fn _count(&self, ctx: &ShopContext, filter: &Filter) -> Result<u64> {
        Ok(self.store.count(ctx.tenant(), self.collection, filter).await)
    }

    pub async fn _get(&self, ctx: &ShopContext, id: &str) -> Result<Value> {
        self.store
            .get(ctx.tenant(), self.collection, id)
            .await
            .ok_or_else(|| self.not_found(id))
    }

    pub async fn _try_get(&self, ctx: &ShopContext, id: &str) -> Option<Value> {
        self.store.get(ctx.tenant(), self.collection, id).await
    }

    pub async fn _create(&self, ctx: &ShopContext, data: Value) -> Result<Value> {
        self.store.create(ctx.tenant(), self.collection, data).await
    }

    pub async fn _update(&self, ctx: &ShopContext, id: &str, data: Value) -> Result<Value> {
        self.store
            .replace(ctx.tenant(), self.collection, id, data)
            .await
            .ok_or_else(|| self.not_found(id))
    }

    pub async fn _patch(&self, ctx: &ShopContext, id: &str, data: Value) -> Result<Value> {
        self.store
            .patch(ctx.tenant(), self.collection, id, data)
            .await
            .ok_or_else(|| self.not_found(id))
    }

    pub async fn _remove(&self, ctx: &ShopContext, id: &str) -> Result<Value> {
        self.store
            .remove(ctx.tenant(), self.collection, id)
            .await
            .ok_or_else(|| self.not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn listings_keep_insertion_order_and_tenant_scope() {
        let store = DocumentStore::new();
        for name in ["a", "b", "c"] {
            store.create("acme", "categories", json!({"name": name})).await.unwrap();
        }
        store.create("other", "categories", json!({"name": "x"})).await.unwrap();

        let names: Vec<_> = store
            .find("acme", "categories", &Filter::new(), Page::all())
            .await
            .into_iter()
            .map(|d| d["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let page = store
            .find("acme", "categories", &Filter::new(), Page::new(1, Some(1)))
            .await;
        assert_eq!(page[0]["name"], "b");
        assert_eq!(store.count("other", "categories", &Filter::new()).await, 1);
    }

    #[tokio::test]
    async fn filters_treat_empty_and_null_as_absent() {
        let store = DocumentStore::new();
        store.create("t", "c", json!({"name": "root"})).await.unwrap();
        store.create("t", "c", json!({"name": "blank", "parentId": ""})).await.unwrap();
        store.create("t", "c", json!({"name": "child", "parentId": "p1"})).await.unwrap();

        let roots = Filter::new().exists("parentId", false);
        assert_eq!(store.count("t", "c", &roots).await, 2);

        let under_p1 = Filter::new().eq("parentId", "p1");
        let found = store.find("t", "c", &under_p1, Page::all()).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["name"], "child");
    }

    #[tokio::test]
    async fn range_filters_compare_numbers() {
        let store = DocumentStore::new();
        for price in [5, 15, 25] {
            store.create("t", "products", json!({"price": price})).await.unwrap();
        }

        let mid = Filter::new().range("price", Some(10.0), Some(20.0));
        let found = store.find("t", "products", &mid, Page::all()).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["price"], 15);
    }

    #[tokio::test]
    async fn patch_merges_and_replace_overwrites() {
        let store = DocumentStore::new();
        let doc = store
            .create("t", "c", json!({"name": "a", "color": "red"}))
            .await
            .unwrap();
        let id = doc["id"].as_str().unwrap();

        let patched = store.patch("t", "c", id, json!({"color": "blue"})).await.unwrap();
        assert_eq!(patched, json!({"id": id, "name": "a", "color": "blue"}));

        let replaced = store.replace("t", "c", id, json!({"name": "b"})).await.unwrap();
        assert_eq!(replaced, json!({"id": id, "name": "b"}));

        assert!(store.remove("t", "c", id).await.is_some());
        assert!(store.get("t", "c", id).await.is_none());
        assert!(store.patch("t", "c", id, json!({})).await.is_none());
    }

    #[tokio::test]
    async fn duplicate_ids_conflict() {
        let store = DocumentStore::new();
        store.create("t", "c", json!({"id": "x"})).await.unwrap();
        let err = store.create("t", "c", json!({"id": "x"})).await.unwrap_err();
        assert_eq!(ShopError::from_anyhow(&err).map(|e| e.code()), Some(409));
    }

    #[tokio::test]
    async fn upload_batches_are_logged_per_tenant() {
        let store = DocumentStore::new();
        store
            .record("acme", UploadBatchRecord::new(vec!["u1".into(), "u2".into()]))
            .await
            .unwrap();

        let logged = store
            .find("acme", IMAGE_UPLOADS, &Filter::new(), Page::all())
            .await;
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0]["images"], json!(["u1", "u2"]));
        assert!(logged[0].get("createdAt").is_some());
    }
}
