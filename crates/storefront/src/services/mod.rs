//! Services the storefront consumes.
//!
//! # Services
//!
//! - `auth` - Identity verification against the identity provider

pub mod auth;
