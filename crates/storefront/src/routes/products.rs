//! Product route handlers.
//!
//! Listing pages use the fail-soft catalog queries: a store outage renders
//! the empty state rather than an error page.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use heritage_core::ProductId;
use tracing::instrument;

use crate::catalog::Product;
use crate::filters;
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Option<String>,
    pub image_url: Option<String>,
    pub culture: Option<String>,
    pub occasions: Vec<String>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name().to_string(),
            description: product.description().map(String::from),
            price: product.price(),
            image_url: product.image_url().map(String::from),
            culture: product.culture().map(String::from),
            occasions: product.occasions().into_iter().map(String::from).collect(),
        }
    }
}

/// Map catalog products to template views.
pub fn views(products: &[Product]) -> Vec<ProductView> {
    products.iter().map(ProductView::from).collect()
}

/// Product listing page template.
///
/// Shared by the full listing and the culture and occasion pages.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub heading: String,
    pub products: Vec<ProductView>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub product: ProductView,
}

/// Page shown for unknown products and routes.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub message: String,
}

/// 404 response with the not-found page.
pub fn not_found(message: impl Into<String>) -> Response {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            message: message.into(),
        },
    )
        .into_response()
}

/// Display every product.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let products = state.catalog().all_products().await;

    ProductsIndexTemplate {
        heading: "All products".to_string(),
        products: views(&products),
    }
}

/// Display products for a culture.
#[instrument(skip(state))]
pub async fn by_culture(
    State(state): State<AppState>,
    Path(culture): Path<String>,
) -> impl IntoResponse {
    let products = state.catalog().products_by_culture(&culture).await;

    ProductsIndexTemplate {
        heading: culture,
        products: views(&products),
    }
}

/// Display products for an occasion.
#[instrument(skip(state))]
pub async fn by_occasion(
    State(state): State<AppState>,
    Path(occasion): Path<String>,
) -> impl IntoResponse {
    let products = state.catalog().products_by_occasion(&occasion).await;

    ProductsIndexTemplate {
        heading: occasion,
        products: views(&products),
    }
}

/// Display product detail page.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let id = ProductId::new(id);
    match state.catalog().product_by_id(&id).await {
        Some(product) => ProductShowTemplate {
            product: ProductView::from(&product),
        }
        .into_response(),
        None => not_found("We couldn't find that product."),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_product_view_from_product() {
        let fields = json!({
            "name": "Kente Stole",
            "culture": "Ghanaian",
            "occasions": ["graduation", "wedding"],
            "price": 45,
            "imageUrl": "https://images.heritage.example/kente.jpg"
        });
        let product = Product {
            id: ProductId::new("p-kente"),
            fields: fields.as_object().cloned().unwrap_or_default(),
        };

        let view = ProductView::from(&product);
        assert_eq!(view.id, "p-kente");
        assert_eq!(view.name, "Kente Stole");
        assert_eq!(view.culture.as_deref(), Some("Ghanaian"));
        assert_eq!(view.occasions, vec!["graduation", "wedding"]);
        assert_eq!(view.price.as_deref(), Some("45.00"));
        assert!(view.description.is_none());
    }
}
