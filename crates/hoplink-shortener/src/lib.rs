//! Minting and lifecycle service for Hoplink URL mappings.
//!
//! [`ShortenerService`] owns the authoritative mapping table: it mints
//! short codes, validates URLs and aliases, enforces owner
//! authorization, and keeps the shared cache projection written
//! through on every mutation.

pub mod mint;
pub mod service;

pub use mint::{CodeMinter, RandomCodeMinter};
pub use service::{ShortenParams, ShortenerService};
