use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shop_core::errors::ShopError;

#[derive(Debug)]
pub struct ShopAxumError(pub anyhow::Error);

impl From<anyhow::Error> for ShopAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<ShopError> for ShopAxumError {
    fn from(e: ShopError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for ShopAxumError {
    fn into_response(self) -> Response {
        // A ShopError anywhere in the chain keeps its status and class fields
        if let Some(shop) = ShopError::from_anyhow(&self.0) {
            let safe = shop.sanitize_for_client();
            if safe.code() >= 500 {
                tracing::error!(error = %self.0, "request failed");
            }
            let status = StatusCode::from_u16(safe.code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, Json(safe.to_json())).into_response();
        }

        tracing::error!(error = ?self.0, "unhandled error");
        let shop = ShopError::general_error(self.0.to_string());
        let safe = shop.sanitize_for_client();
        let status = StatusCode::from_u16(safe.code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}
