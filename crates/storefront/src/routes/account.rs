//! Account route handler.
//!
//! Gated on the customer role by [`require_customer`](crate::middleware::require_customer).

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use crate::filters;
use crate::middleware::{CurrentRole, OptionalIdentity};

/// Account page template.
#[derive(Template, WebTemplate)]
#[template(path = "account.html")]
pub struct AccountTemplate {
    pub uid: String,
    pub email: Option<String>,
    pub role: String,
}

/// Display the account page.
pub async fn index(
    OptionalIdentity(identity): OptionalIdentity,
    CurrentRole(role): CurrentRole,
) -> impl IntoResponse {
    let (uid, email) = identity.map_or_else(
        || (String::new(), None),
        |identity| (identity.uid.into_inner(), identity.email),
    );

    AccountTemplate {
        uid,
        email,
        role: role.role.to_string(),
    }
}
