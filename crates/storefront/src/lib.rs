//! Heritage Market storefront library.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused by the CLI.
//!
//! # Architecture
//!
//! - [`store`] - Document store port (Firestore REST client, in-memory store)
//! - [`catalog`] - Product queries over the store
//! - [`roles`] - Role resolution per browser session
//! - [`middleware`] - Session identity, role guard, security headers
//! - [`routes`] - Axum handlers and Askama templates

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
mod filters;
pub mod middleware;
pub mod roles;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
