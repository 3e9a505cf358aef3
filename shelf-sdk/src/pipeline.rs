//! The product creation pipeline.
//!
//! Creating a product with images is three backend calls in a fixed
//! order: create the record, upload the binaries, attach the returned
//! assets. There is no rollback; if a later step fails the record from
//! step one exists without images, and the error says so by carrying
//! the created id.

use shelf_catalog::types::{ImageUpload, NewProduct, Product};
use shelf_catalog::{CatalogApi, CatalogClientError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CreateError {
    /// Checked before any network call.
    #[error("not signed in")]
    NotAuthenticated,
    #[error("couldn't create product")]
    Create(#[source] CatalogClientError),
    /// The record exists but has no images.
    #[error("product {created_id} was created, but uploading images failed")]
    Upload {
        created_id: i64,
        #[source]
        source: CatalogClientError,
    },
    /// The record and the uploaded assets exist but aren't linked.
    #[error("product {created_id} was created, but attaching images failed")]
    Attach {
        created_id: i64,
        #[source]
        source: CatalogClientError,
    },
}

impl CreateError {
    /// A message suitable for direct display to a user.
    pub fn user_message(&self) -> String {
        match self {
            CreateError::NotAuthenticated => self.to_string(),
            CreateError::Create(source) => source.user_message(),
            CreateError::Upload { source, .. } | CreateError::Attach { source, .. } => {
                format!("{self}: {}", source.user_message())
            },
        }
    }

    /// The id of the record left behind by a partial failure, so callers
    /// can re-query or surface it.
    pub fn created_id(&self) -> Option<i64> {
        match self {
            CreateError::Upload { created_id, .. } | CreateError::Attach { created_id, .. } => {
                Some(*created_id)
            },
            _ => None,
        }
    }
}

/// Create a product and attach its images, strictly sequentially.
///
/// With no uploads this is a single `create` call. Attach only runs
/// when the upload actually returned assets, and always sends the full
/// set. Returns the most recent version of the record the backend gave
/// us.
pub async fn create_with_images(
    client: &impl CatalogApi,
    token: &str,
    fields: &NewProduct,
    uploads: Vec<ImageUpload>,
) -> Result<Product, CreateError> {
    if token.is_empty() {
        return Err(CreateError::NotAuthenticated);
    }

    let created = client
        .create_product(token, fields)
        .await
        .map_err(CreateError::Create)?;
    debug!(id = created.id, "product record created");

    if uploads.is_empty() {
        return Ok(created);
    }

    let assets = client
        .upload_images(token, uploads)
        .await
        .map_err(|source| CreateError::Upload {
            created_id: created.id,
            source,
        })?;
    if assets.is_empty() {
        debug!(id = created.id, "upload returned no assets, skipping attach");
        return Ok(created);
    }

    client
        .attach_images(token, created.id, &assets)
        .await
        .map_err(|source| CreateError::Attach {
            created_id: created.id,
            source,
        })
}
