//! Catalog browsing on top of [`valantis_catalog`].
//!
//! The remote API can only list ids and fetch items, so everything a
//! listing needs (filtering, deduplication, paging) happens here.

pub mod models;

pub use valantis_catalog as catalog;
