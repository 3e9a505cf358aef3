//! Configuration for client construction.

use std::collections::BTreeMap;

use url::Url;

/// Configuration for constructing a [`CatalogClient`] or [`AuthClient`].
///
/// The catalog and auth surfaces of ShelfHub may be hosted at different
/// base URLs, so each client takes its own config.
///
/// [`CatalogClient`]: crate::CatalogClient
/// [`AuthClient`]: crate::AuthClient
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL the client's endpoint paths are joined onto.
    pub base_url: Url,
    /// Additional headers to include in every request.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional user agent.
    pub user_agent: Option<String>,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        ClientConfig {
            base_url,
            extra_headers: BTreeMap::new(),
            user_agent: None,
        }
    }
}
