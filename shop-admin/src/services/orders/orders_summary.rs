//! `GET /orders/sales-summary`: totals over paid orders.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use shop_axum::{context_from_headers, ShopAxumError};

use super::orders_shared::SERVICE;
use crate::routes::AdminApp;
use crate::services::AdminParams;

const OTHERS: &str = "Others";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_sales: f64,
    pub last_month_sales: f64,
    /// `[["Category", "Sales"], [<category>, <amount>], ...]`
    pub pie_chart_data: Vec<(String, Value)>,
}

fn number(v: Option<&Value>) -> f64 {
    match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn created_at(order: &Value) -> Option<DateTime<Utc>> {
    order
        .get("createdAt")
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|d| d.with_timezone(&Utc))
}

/// `orders` are expected to be paid already.
pub fn sales_summary(orders: &[Value], now: DateTime<Utc>) -> SalesSummary {
    let month_ago = now - Duration::days(30);
    let mut total_sales = 0.0;
    let mut last_month_sales = 0.0;
    let mut by_category: BTreeMap<String, f64> = BTreeMap::new();

    for order in orders {
        let amount = number(order.get("amount"));
        total_sales += amount;
        if created_at(order).is_some_and(|t| t > month_ago) {
            last_month_sales += amount;
        }

        let lines = order.get("products").and_then(|p| p.as_array());
        for line in lines.into_iter().flatten() {
            let category = line
                .get("category")
                .and_then(|c| c.as_str())
                .filter(|c| !c.trim().is_empty())
                .unwrap_or(OTHERS);
            let sales = number(line.get("price")) * number(line.get("quantity"));
            *by_category.entry(category.to_string()).or_default() += sales;
        }
    }

    let mut pie_chart_data = vec![("Category".to_string(), Value::String("Sales".to_string()))];
    pie_chart_data.extend(
        by_category
            .into_iter()
            .map(|(cat, sales)| (cat, serde_json::json!(sales))),
    );

    SalesSummary {
        total_sales,
        last_month_sales,
        pie_chart_data,
    }
}

async fn summary(State(app): State<AdminApp>, headers: HeaderMap) -> Result<Json<SalesSummary>, ShopAxumError> {
    let ctx = context_from_headers(&headers);
    let paid = app
        .service(SERVICE)?
        .find(ctx, AdminParams::internal().with_query("isPaid", "true"))
        .await?;
    Ok(Json(sales_summary(&paid, Utc::now())))
}

pub fn router(app: AdminApp) -> Router<()> {
    Router::new()
        .route("/sales-summary", get(summary))
        .with_state(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn totals_split_by_age_and_category() {
        let now = Utc::now();
        let recent = (now - Duration::days(3)).to_rfc3339();
        let old = (now - Duration::days(90)).to_rfc3339();
        let orders = vec![
            json!({
                "amount": 30,
                "createdAt": recent,
                "products": [
                    {"category": "Shoes", "price": 10, "quantity": 2},
                    {"price": 10, "quantity": 1},
                ],
            }),
            json!({
                "amount": "20",
                "createdAt": old,
                "products": [{"category": "Shoes", "price": 20, "quantity": 1}],
            }),
        ];

        let summary = sales_summary(&orders, now);
        assert_eq!(summary.total_sales, 50.0);
        assert_eq!(summary.last_month_sales, 30.0);
        assert_eq!(
            serde_json::to_value(&summary.pie_chart_data).unwrap(),
            json!([["Category", "Sales"], ["Others", 10.0], ["Shoes", 40.0]])
        );
    }

    #[test]
    fn no_orders_gives_only_the_header_row() {
        let summary = sales_summary(&[], Utc::now());
        assert_eq!(summary.total_sales, 0.0);
        assert_eq!(summary.pie_chart_data.len(), 1);
    }
}
