//! Admin route handler.
//!
//! Gated on the admin role by [`require_admin`](crate::middleware::require_admin).

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};

use crate::filters;
use crate::state::AppState;

/// Admin page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub product_count: usize,
}

/// Display the admin page.
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let product_count = state.catalog().all_products().await.len();

    AdminTemplate { product_count }
}
