//! Feathers-style query conventions shared by the services:
//! `field=value`, `field[$exists]=true|false`, `$skip`, `$limit`.

use serde_json::Value;

use super::adapters::document_store::{Filter, Page};
use super::AdminParams;

fn query_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => Value::String(other.to_string()),
    }
}

/// Equality and presence tests for the listed fields. `query_key` is the
/// query parameter name, `field` the document field it filters.
pub fn filter_from_query(params: &AdminParams, fields: &[(&str, &str)]) -> Filter {
    let mut filter = Filter::new();

    for (query_key, field) in fields {
        if let Some(raw) = params.query_str(query_key) {
            filter = filter.eq(*field, query_value(raw));
        }
        if let Some(present) = params.query_bool(&format!("{query_key}[$exists]")) {
            filter = filter.exists(*field, present);
        }
    }

    filter
}

pub fn query_f64(params: &AdminParams, key: &str) -> Option<f64> {
    params.query_str(key).and_then(|v| v.parse().ok())
}

pub fn query_usize(params: &AdminParams, key: &str) -> Option<usize> {
    params.query_str(key).and_then(|v| v.parse().ok())
}

pub fn page_from_query(params: &AdminParams) -> Page {
    Page::new(
        query_usize(params, "$skip").unwrap_or(0),
        query_usize(params, "$limit"),
    )
}

/// Same params, windowed to `page`.
pub fn with_page(params: &AdminParams, page: Page) -> AdminParams {
    let mut params = params.clone().with_query("$skip", page.skip.to_string());
    match page.limit {
        Some(limit) => params = params.with_query("$limit", limit.to_string()),
        None => {
            params.query.remove("$limit");
        }
    }
    params
}

/// Page-number pagination as the list endpoints expose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub per_page: Option<usize>,
}

impl PageRequest {
    pub fn from_query(params: &AdminParams, default_per_page: Option<usize>) -> Self {
        let page = query_usize(params, "page").filter(|p| *p > 0).unwrap_or(1);
        let per_page = query_usize(params, "perPage")
            .filter(|p| *p > 0)
            .or(default_per_page);
        Self { page, per_page }
    }

    /// Without a page size everything is one page.
    pub fn total_pages(&self, total: u64) -> u64 {
        match self.per_page {
            Some(per_page) => total.div_ceil(per_page as u64),
            None => u64::from(total > 0),
        }
    }

    /// A page past the last one; an empty listing has no such page.
    pub fn is_beyond(&self, total: u64) -> bool {
        let pages = self.total_pages(total);
        pages > 0 && self.page as u64 > pages
    }

    pub fn window(&self) -> Page {
        match self.per_page {
            Some(per_page) => Page::new(
                self.page.saturating_sub(1).saturating_mul(per_page),
                Some(per_page),
            ),
            None => Page::all(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_math_matches_listing_size() {
        let req = PageRequest {
            page: 2,
            per_page: Some(6),
        };
        assert_eq!(req.total_pages(13), 3);
        assert_eq!(req.window(), Page::new(6, Some(6)));
        assert!(!req.is_beyond(13));
        assert!(req.is_beyond(6));
        assert!(!req.is_beyond(0));
    }

    #[test]
    fn huge_page_numbers_do_not_overflow() {
        let req = PageRequest {
            page: usize::MAX,
            per_page: Some(2),
        };
        assert_eq!(req.window(), Page::new(usize::MAX, Some(2)));
        assert!(!req.is_beyond(0));
        assert!(req.is_beyond(3));
    }

    #[test]
    fn query_parsing_ignores_junk() {
        let params = AdminParams::internal()
            .with_query("page", "0")
            .with_query("perPage", "abc");
        assert_eq!(
            PageRequest::from_query(&params, Some(6)),
            PageRequest {
                page: 1,
                per_page: Some(6)
            }
        );
    }

    #[test]
    fn exists_and_equality_filters_come_from_query() {
        let params = AdminParams::internal()
            .with_query("parentId[$exists]", "false")
            .with_query("isFeatured", "true");
        let filter = filter_from_query(&params, &[("parentId", "parentId"), ("isFeatured", "isFeatured")]);

        assert!(filter.matches(&serde_json::json!({"isFeatured": true})));
        assert!(!filter.matches(&serde_json::json!({"isFeatured": true, "parentId": "p"})));
        assert!(!filter.matches(&serde_json::json!({"isFeatured": false})));
    }
}
