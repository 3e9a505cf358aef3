//! Client-side logic for the ShelfHub catalog: session lifecycle,
//! product creation, and paginated listing.
//!
//! The HTTP clients themselves live in [`shelf_catalog`]; this crate
//! owns the state that wraps them:
//!
//! - [`SessionStore`]: token/profile/expiry lifecycle backed by a
//!   persistent [`StateStore`], with an expiry-warning channel
//! - [`create_with_images`]: the three-step create → upload → attach
//!   pipeline
//! - [`ListingController`]: infinite-scroll pagination with a local
//!   text filter

mod listing;
mod pipeline;
mod session;
mod state;
mod token;

pub use listing::ListingController;
pub use pipeline::{create_with_images, CreateError};
pub use session::{
    RenewOutcome,
    SessionConfig,
    SessionError,
    SessionEvent,
    SessionStore,
    EXPIRY_KEY,
    TOKEN_KEY,
    USER_KEY,
};
pub use state::{FileStateStore, StateStore, StateStoreError};
