//! Infinite-scroll pagination over the product list.
//!
//! The controller accumulates pages and applies a local text filter on
//! top. Fetching and filtering are independent: the filter narrows what
//! [`ListingController::visible`] returns but never triggers a fetch or
//! moves the cursor.
//!
//! `load_page` takes `&mut self`, so a reload and a load-more can't run
//! concurrently against the same controller; whichever is awaited first
//! applies first.

use shelf_catalog::types::{ListQuery, Product, DEFAULT_PAGE_SIZE};
use shelf_catalog::CatalogApi;
use tracing::{debug, warn};

pub struct ListingController {
    items: Vec<Product>,
    offset: usize,
    limit: usize,
    has_more: bool,
    loading: bool,
    last_error: Option<String>,
    query: String,
}

impl Default for ListingController {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ListingController {
    pub fn new(limit: usize) -> Self {
        ListingController {
            items: Vec::new(),
            offset: 0,
            limit,
            has_more: true,
            loading: false,
            last_error: None,
            query: String::new(),
        }
    }

    /// The accumulated records, unfiltered.
    pub fn items(&self) -> &[Product] {
        &self.items
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// User-displayable text of the most recent failed fetch, cleared by
    /// the next attempt.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Set the filter text. Purely local; call `load_page(.., reset:
    /// true)` separately if server-side search is wanted too.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Fetch the next page (or the first, with `reset`) and fold it into
    /// the accumulation. Fetch errors land in `last_error` rather than
    /// propagating; the accumulation and the cursor are left as they
    /// were, so a failed reset doesn't rewind a working session.
    pub async fn load_page(&mut self, client: &impl CatalogApi, token: Option<&str>, reset: bool) {
        self.loading = true;
        self.last_error = None;

        // Committed to self only once the fetch succeeds.
        let next_offset = if reset { 0 } else { self.offset };
        let query = ListQuery {
            limit: self.limit,
            offset: next_offset,
            query: self.query.clone(),
        };
        match client.list_products(token, &query).await {
            Ok(page) => {
                debug!(got = page.len(), offset = next_offset, "loaded product page");
                // A short page means the backend ran out. An exactly-full
                // final page costs one extra empty fetch; that's fine.
                self.has_more = page.len() == self.limit;
                self.offset = next_offset + page.len();
                if reset {
                    self.items = page;
                } else {
                    self.items.extend(page);
                }
            },
            Err(err) => {
                warn!(%err, "couldn't load product page");
                self.last_error = Some(err.user_message());
            },
        }
        self.loading = false;
    }

    /// The accumulated records that match the filter text:
    /// case-insensitive substring over name, brand, category, and
    /// description. An empty query matches everything. Order is the
    /// order records arrived in.
    pub fn visible(&self) -> Vec<&Product> {
        if self.query.is_empty() {
            return self.items.iter().collect();
        }
        let needle = self.query.to_lowercase();
        self.items
            .iter()
            .filter(|p| {
                [&p.name, &p.brand, &p.category, &p.description]
                    .into_iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use reqwest::StatusCode;
    use shelf_catalog::types::{ImageRef, ImageUpload, NewProduct};
    use shelf_catalog::CatalogClientError;

    use super::*;

    /// Serves a fixed sequence of pages (or errors), one per call.
    struct PagedCatalog {
        pages: Mutex<Vec<Result<Vec<Product>, CatalogClientError>>>,
        seen_queries: Mutex<Vec<ListQuery>>,
    }

    impl PagedCatalog {
        fn new(pages: Vec<Result<Vec<Product>, CatalogClientError>>) -> Self {
            PagedCatalog {
                pages: Mutex::new(pages),
                seen_queries: Mutex::new(Vec::new()),
            }
        }
    }

    impl CatalogApi for PagedCatalog {
        async fn create_product(
            &self,
            _token: &str,
            _product: &NewProduct,
        ) -> Result<Product, CatalogClientError> {
            unimplemented!("listing tests never create")
        }

        async fn upload_images(
            &self,
            _token: &str,
            _uploads: Vec<ImageUpload>,
        ) -> Result<Vec<ImageRef>, CatalogClientError> {
            unimplemented!("listing tests never upload")
        }

        async fn attach_images(
            &self,
            _token: &str,
            _product_id: i64,
            _images: &[ImageRef],
        ) -> Result<Product, CatalogClientError> {
            unimplemented!("listing tests never attach")
        }

        async fn list_products(
            &self,
            _token: Option<&str>,
            query: &ListQuery,
        ) -> Result<Vec<Product>, CatalogClientError> {
            self.seen_queries.lock().unwrap().push(query.clone());
            self.pages.lock().unwrap().remove(0)
        }
    }

    fn named(id: i64, name: &str) -> Product {
        Product {
            id,
            name: name.to_string(),
            description: String::new(),
            price: 0.0,
            stock: 0,
            brand: String::new(),
            category: String::new(),
            images: vec![],
        }
    }

    fn page_of(ids: std::ops::Range<i64>) -> Vec<Product> {
        ids.map(|id| named(id, &format!("Item {id}"))).collect()
    }

    #[tokio::test]
    async fn full_page_keeps_has_more_short_page_ends_it() {
        let catalog = PagedCatalog::new(vec![Ok(page_of(0..12)), Ok(page_of(12..17))]);
        let mut listing = ListingController::default();

        listing.load_page(&catalog, None, false).await;
        assert!(listing.has_more());
        assert_eq!(listing.offset(), 12);

        listing.load_page(&catalog, None, false).await;
        assert!(!listing.has_more());
        assert_eq!(listing.offset(), 17);
        assert_eq!(listing.items().len(), 17);
    }

    #[tokio::test]
    async fn empty_page_ends_pagination() {
        let catalog = PagedCatalog::new(vec![Ok(vec![])]);
        let mut listing = ListingController::default();
        listing.load_page(&catalog, None, false).await;
        assert!(!listing.has_more());
        assert_eq!(listing.offset(), 0);
    }

    #[tokio::test]
    async fn offset_advances_by_items_actually_returned() {
        let catalog = PagedCatalog::new(vec![Ok(page_of(0..12)), Ok(page_of(12..19))]);
        let mut listing = ListingController::default();

        listing.load_page(&catalog, None, false).await;
        listing.load_page(&catalog, None, false).await;

        assert_eq!(listing.offset(), 19);
        let queries = catalog.seen_queries.lock().unwrap().clone();
        assert_eq!(queries[0].offset, 0);
        assert_eq!(queries[1].offset, 12);
    }

    #[tokio::test]
    async fn reset_replaces_the_accumulation() {
        let catalog = PagedCatalog::new(vec![Ok(page_of(0..12)), Ok(page_of(100..103))]);
        let mut listing = ListingController::default();

        listing.load_page(&catalog, None, false).await;
        listing.load_page(&catalog, None, true).await;

        assert_eq!(listing.items().len(), 3);
        assert_eq!(listing.items()[0].id, 100);
        assert_eq!(listing.offset(), 3);
    }

    #[tokio::test]
    async fn fetch_errors_are_recorded_not_propagated() {
        let catalog = PagedCatalog::new(vec![
            Ok(page_of(0..12)),
            Err(CatalogClientError::Api {
                status: StatusCode::BAD_GATEWAY,
                message: Some("backend down".to_string()),
            }),
            Ok(page_of(12..13)),
        ]);
        let mut listing = ListingController::default();

        listing.load_page(&catalog, None, false).await;
        listing.load_page(&catalog, None, false).await;
        assert_eq!(listing.last_error(), Some("backend down"));
        // Accumulation and cursor are untouched by the failure.
        assert_eq!(listing.items().len(), 12);
        assert_eq!(listing.offset(), 12);

        listing.load_page(&catalog, None, false).await;
        assert_eq!(listing.last_error(), None);
        assert_eq!(listing.items().len(), 13);
    }

    #[tokio::test]
    async fn failed_reset_leaves_cursor_and_accumulation_intact() {
        let catalog = PagedCatalog::new(vec![
            Ok(page_of(0..12)),
            Err(CatalogClientError::Api {
                status: StatusCode::BAD_GATEWAY,
                message: None,
            }),
            Ok(page_of(12..15)),
        ]);
        let mut listing = ListingController::default();

        listing.load_page(&catalog, None, false).await;
        listing.load_page(&catalog, None, true).await;
        assert!(listing.last_error().is_some());
        assert_eq!(listing.offset(), 12);
        assert_eq!(listing.items().len(), 12);

        // A load-more after the failed reset continues where the
        // accumulation left off instead of refetching page 0.
        listing.load_page(&catalog, None, false).await;
        let queries = catalog.seen_queries.lock().unwrap().clone();
        assert_eq!(queries[2].offset, 12);
        assert_eq!(listing.items().len(), 15);
        assert_eq!(listing.items()[12].id, 12);
    }

    #[tokio::test]
    async fn filter_is_case_insensitive_and_local() {
        let catalog = PagedCatalog::new(vec![Ok(vec![
            named(1, "Red Shoe"),
            named(2, "Blue Hat"),
        ])]);
        let mut listing = ListingController::default();
        listing.load_page(&catalog, None, false).await;
        let offset_before = listing.offset();

        listing.set_query("red");
        let visible = listing.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Red Shoe");

        listing.set_query("");
        assert_eq!(listing.visible().len(), 2);
        assert_eq!(listing.visible()[0].id, 1);

        // Filtering touched neither the cursor nor the network.
        assert_eq!(listing.offset(), offset_before);
        assert_eq!(catalog.seen_queries.lock().unwrap().len(), 1);
    }

    #[test]
    fn filter_matches_across_all_text_fields() {
        let mut listing = ListingController::default();
        listing.items = vec![
            Product {
                brand: "Acme".to_string(),
                ..named(1, "Shoe")
            },
            Product {
                category: "headwear".to_string(),
                ..named(2, "Hat")
            },
        ];

        listing.set_query("acme");
        assert_eq!(listing.visible().len(), 1);
        listing.set_query("HEADWEAR");
        assert_eq!(listing.visible()[0].id, 2);
        listing.set_query("glove");
        assert!(listing.visible().is_empty());
    }
}
