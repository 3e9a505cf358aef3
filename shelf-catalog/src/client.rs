//! Catalog client for the ShelfHub product API.

use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{backend_message, CatalogClientError};
use crate::types::{ImageRef, ImageUpload, ListQuery, NewProduct, Product, SequenceResponse};

/// The catalog API interface.
///
/// One trait, one HTTP implementation ([`CatalogClient`]); the trait is
/// the seam for mock implementations in SDK tests.
///
/// Every protected operation takes the bearer token explicitly. Clients
/// are stateless with respect to sessions: whoever owns the session
/// injects the token per call.
#[allow(async_fn_in_trait)]
pub trait CatalogApi {
    /// Create a product record. Images are attached in a separate step.
    async fn create_product(
        &self,
        token: &str,
        product: &NewProduct,
    ) -> Result<Product, CatalogClientError>;

    /// Upload image binaries, returning backend-assigned asset metadata.
    ///
    /// Callers must skip this call entirely when there is nothing to
    /// upload; the client does not special-case an empty batch.
    async fn upload_images(
        &self,
        token: &str,
        uploads: Vec<ImageUpload>,
    ) -> Result<Vec<ImageRef>, CatalogClientError>;

    /// Replace a product's image list wholesale.
    ///
    /// The backend treats this as a full replacement, not an addition:
    /// callers must supply the complete desired set.
    async fn attach_images(
        &self,
        token: &str,
        product_id: i64,
        images: &[ImageRef],
    ) -> Result<Product, CatalogClientError>;

    /// Fetch one page of products, optionally filtered server-side.
    async fn list_products(
        &self,
        token: Option<&str>,
        query: &ListQuery,
    ) -> Result<Vec<Product>, CatalogClientError>;
}

/// HTTP client for the ShelfHub catalog API.
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: Url,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    pub fn new(config: ClientConfig) -> Result<Self, CatalogClientError> {
        let client = build_http_client(&config).map_err(CatalogClientError::Other)?;
        Ok(CatalogClient {
            client,
            base_url: config.base_url,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CatalogClientError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{path}")).map_err(CatalogClientError::InvalidUrl)
    }
}

impl CatalogApi for CatalogClient {
    async fn create_product(
        &self,
        token: &str,
        product: &NewProduct,
    ) -> Result<Product, CatalogClientError> {
        debug!(name = %product.name, "creating product record");
        let response = self
            .client
            .post(self.endpoint("product")?)
            .bearer_auth(token)
            .json(product)
            .send()
            .await
            .map_err(CatalogClientError::Request)?;

        json_or_api_error(response).await
    }

    async fn upload_images(
        &self,
        token: &str,
        uploads: Vec<ImageUpload>,
    ) -> Result<Vec<ImageRef>, CatalogClientError> {
        debug!(n_files = uploads.len(), "uploading image assets");
        let mut form = multipart::Form::new();
        for upload in uploads {
            let part = multipart::Part::bytes(upload.bytes)
                .file_name(upload.file_name)
                .mime_str(&upload.mime)
                .map_err(CatalogClientError::Request)?;
            // ShelfHub expects the repeated `content[]` field name.
            form = form.part("content[]", part);
        }

        let response = self
            .client
            .post(self.endpoint("upload/image")?)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(CatalogClientError::Request)?;

        let assets: SequenceResponse<ImageRef> = json_or_api_error(response).await?;
        Ok(assets.into_vec())
    }

    async fn attach_images(
        &self,
        token: &str,
        product_id: i64,
        images: &[ImageRef],
    ) -> Result<Product, CatalogClientError> {
        debug!(product_id, n_images = images.len(), "attaching images");
        let response = self
            .client
            .patch(self.endpoint(&format!("product/{product_id}"))?)
            .bearer_auth(token)
            .json(&serde_json::json!({ "images": images }))
            .send()
            .await
            .map_err(CatalogClientError::Request)?;

        json_or_api_error(response).await
    }

    async fn list_products(
        &self,
        token: Option<&str>,
        query: &ListQuery,
    ) -> Result<Vec<Product>, CatalogClientError> {
        debug!(
            limit = query.limit,
            offset = query.offset,
            query = %query.query,
            "listing products"
        );
        let mut request = self
            .client
            .get(self.endpoint("product")?)
            .query(&list_query_pairs(query));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(CatalogClientError::Request)?;
        let products: SequenceResponse<Product> = json_or_api_error(response).await?;
        Ok(products.into_vec())
    }
}

/// Query parameters for a list request.
///
/// `q` is omitted entirely when the search term is empty rather than sent
/// as an empty string.
fn list_query_pairs(query: &ListQuery) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        ("limit", query.limit.to_string()),
        ("offset", query.offset.to_string()),
    ];
    if !query.query.is_empty() {
        pairs.push(("q", query.query.clone()));
    }
    pairs
}

/// Parse a 2xx response body, or turn a non-2xx response into
/// [`CatalogClientError::Api`] with the backend message when one is
/// present.
async fn json_or_api_error<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, CatalogClientError> {
    let status = response.status();
    if status.is_success() {
        response.json().await.map_err(CatalogClientError::Response)
    } else {
        let message = backend_message(response).await;
        Err(CatalogClientError::Api { status, message })
    }
}

/// Build the underlying HTTP client with timeouts and configured
/// headers. Shared with [`AuthClient`](crate::AuthClient).
pub(crate) fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, String> {
    let mut headers = HeaderMap::new();
    for (key, value) in &config.extra_headers {
        headers.insert(
            HeaderName::from_str(key).map_err(|e| e.to_string())?,
            HeaderValue::from_str(value).map_err(|e| e.to_string())?,
        );
    }

    debug!(
        base_url = %config.base_url,
        extra_headers = config.extra_headers.len(),
        "building HTTP client"
    );

    let builder = reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(60));

    let builder = if let Some(ref user_agent) = config.user_agent {
        builder.user_agent(user_agent)
    } else {
        builder
    };

    builder.build().map_err(|e| e.to_string())
}
