//! Heritage Market Core - Shared types library.
//!
//! This crate provides common types used across all Heritage Market components:
//! - `storefront` - Public-facing catalog and role-gated pages
//! - `cli` - Command-line tools for catalog queries and role inspection
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no document
//! store access, no HTTP clients. This keeps the access rules testable on their
//! own and usable anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, roles, role records, and identities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
