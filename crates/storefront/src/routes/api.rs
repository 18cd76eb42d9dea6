//! JSON API handlers.
//!
//! Unlike the HTML pages these use the strict catalog queries, so a store
//! failure is a 502 rather than an empty list.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use heritage_core::ProductId;
use serde::Deserialize;

use crate::catalog::Product;
use crate::error::{AppError, Result};
use crate::middleware::CurrentRole;
use crate::roles::RoleState;
use crate::state::AppState;

/// Product list filters. At most one may be given.
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub culture: Option<String>,
    pub occasion: Option<String>,
}

/// Role state for the current session.
pub async fn role(CurrentRole(role): CurrentRole) -> Json<RoleState> {
    Json(role)
}

/// Products, optionally filtered by culture or occasion.
pub async fn products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>> {
    let catalog = state.catalog();
    let products = match (filter.culture, filter.occasion) {
        (Some(_), Some(_)) => {
            return Err(AppError::BadRequest(
                "use either culture or occasion, not both".to_string(),
            ));
        }
        (Some(culture), None) => catalog.try_products_by_culture(&culture).await?,
        (None, Some(occasion)) => catalog.try_products_by_occasion(&occasion).await?,
        (None, None) => catalog.try_all_products().await?,
    };

    Ok(Json(products))
}

/// A single product.
pub async fn product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    let id = ProductId::new(id);
    state
        .catalog()
        .try_product_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}
