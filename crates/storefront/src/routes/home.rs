//! Home page route handler.

use std::collections::BTreeSet;

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use super::products::{ProductView, views};
use crate::catalog::Product;
use crate::filters;
use crate::state::AppState;

/// Number of products featured on the home page.
const FEATURED_COUNT: usize = 8;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub featured: Vec<ProductView>,
    pub cultures: Vec<String>,
    pub occasions: Vec<String>,
}

/// Display the home page.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let products = state.catalog().all_products().await;
    let (cultures, occasions) = tags(&products);
    let featured = products.get(..FEATURED_COUNT).unwrap_or(products.as_slice());

    HomeTemplate {
        featured: views(featured),
        cultures,
        occasions,
    }
}

/// Distinct culture and occasion tags, sorted.
fn tags(products: &[Product]) -> (Vec<String>, Vec<String>) {
    let cultures: BTreeSet<&str> = products.iter().filter_map(Product::culture).collect();
    let occasions: BTreeSet<&str> = products.iter().flat_map(Product::occasions).collect();

    (
        cultures.into_iter().map(String::from).collect(),
        occasions.into_iter().map(String::from).collect(),
    )
}
