//! Catalog interaction types.
//!
//! These types represent the domain model for catalog operations. The
//! backend owns every record; the client only ever holds transient
//! copies, so deserialization is lenient: unknown fields are ignored and
//! optional fields default.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A product record as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: String,
    /// Empty until the attach step of the creation flow completes.
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

/// Fields for creating a new product record.
///
/// The backend assigns the id; images are attached in a separate step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i64,
    pub brand: String,
    pub category: String,
}

/// Backend-assigned metadata for an uploaded image asset.
///
/// The attach call must send back exactly what the upload call returned,
/// so unknown fields are captured in `extra` and round-trip through
/// serialization rather than being dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An image selected for upload: raw bytes plus the metadata the
/// multipart part needs.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Parameters for a single page of the product list.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub limit: usize,
    pub offset: usize,
    /// Search term. Omitted from the request entirely when empty, since
    /// the backend may not support search and should not see a spurious
    /// parameter.
    pub query: String,
}

pub const DEFAULT_PAGE_SIZE: usize = 12;

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
            query: String::new(),
        }
    }
}

/// The backend returns list-shaped data either as a bare array or
/// wrapped in an object (`{items: [...]}` for products, `{files: [...]}`
/// for uploads). Callers always get a plain `Vec`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SequenceResponse<T> {
    Bare(Vec<T>),
    Items { items: Vec<T> },
    Files { files: Vec<T> },
}

impl<T> SequenceResponse<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            SequenceResponse::Bare(v) => v,
            SequenceResponse::Items { items } => items,
            SequenceResponse::Files { files } => files,
        }
    }
}
