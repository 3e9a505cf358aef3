//! HTTP client infrastructure for the ShelfHub catalog and auth APIs.
//!
//! This crate provides:
//! - A stateless catalog client for the four product operations
//!   (create, upload images, attach images, list)
//! - An auth client for the session endpoints (login, logout, refresh)
//! - Common error handling with backend-message extraction
//!
//! Clients never hold a session: the bearer token is an argument to each
//! protected call, injected by whoever owns the session state.
//!
//! ## Usage
//!
//! ```ignore
//! use shelf_catalog::{CatalogApi, CatalogClient, ClientConfig};
//!
//! let client = CatalogClient::new(ClientConfig::new(store_url))?;
//! let products = client.list_products(Some(&token), &ListQuery::default()).await?;
//! ```

mod auth;
mod client;
mod config;
mod error;
pub mod types;

pub use auth::{AuthClient, Credentials, LoginResponse, UserProfile};
pub use client::{CatalogApi, CatalogClient};
pub use config::ClientConfig;
pub use error::{AuthError, CatalogClientError};
