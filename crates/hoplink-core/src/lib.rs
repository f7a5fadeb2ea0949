//! Core types and ports for the Hoplink URL-shortening platform.
//!
//! This crate provides the shared domain model (mappings, cache
//! projections, click events), input validation, the error taxonomy,
//! and the traits implemented by the storage, cache, and bus backends.

pub mod bus;
pub mod cache;
pub mod error;
pub mod event;
pub mod mapping;
pub mod repository;
pub mod session;
pub mod shortcode;
pub mod target;

pub use bus::{EventPublisher, EventStream};
pub use cache::{SharedCache, UrlCache};
pub use error::{BusError, CacheError, Error, Result, StorageError};
pub use event::ClickEvent;
pub use mapping::{
    cache_ttl, CacheEntry, MappingPatch, OwnerQuery, Page, SortBy, SortOrder, UrlMapping,
};
pub use repository::{ReadRepository, Repository, ResolverStore};
pub use session::session_bucket;
pub use shortcode::ShortCode;
pub use target::validate_long_url;
