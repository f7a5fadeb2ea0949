//! Cache-first redirect resolution and click fan-out.
//!
//! [`CachedResolverStore`] decorates the mapping repository with the
//! shared cache, applying the per-call deadlines and the write-through
//! policy. [`ResolverService`] layers the resolution state machine on
//! top and emits a click event for every successful resolve without
//! blocking the response on it.

pub mod service;
pub mod store;

pub use service::{ClientInfo, Resolution, ResolverConfig, ResolverService};
pub use store::CachedResolverStore;
