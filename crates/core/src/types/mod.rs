//! Core types for Heritage Market.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod identity;
pub mod role;

pub use id::*;
pub use identity::Identity;
pub use role::{Role, RoleParseError, RoleRecord, can_access, resolve_role};
