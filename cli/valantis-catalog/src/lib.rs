//! HTTP client for the Valantis product catalog API.
//!
//! The remote service exposes a single POST endpoint that dispatches on an
//! `action` name. This crate provides:
//! - the authenticated request layer ([`CatalogClient::request`]) with a
//!   bounded, exponentially backed-off retry loop
//! - typed `get_ids` / `get_items` operations via [`ClientTrait`]
//! - the catalog domain types ([`Product`], [`FilterSet`], [`ProductId`])
//! - a canned-response [`MockClient`] for downstream tests (feature-gated)
//!
//! ## Usage
//!
//! ```ignore
//! use valantis_catalog::{CatalogClient, CatalogClientConfig, ClientTrait, FilterSet};
//!
//! let client = CatalogClient::new(CatalogClientConfig::default())?;
//! let ids = client.get_ids(&FilterSet::default()).await?;
//! let items = client.get_items(&ids).await?;
//! ```

mod auth;
mod client;
mod config;
mod error;
mod types;

#[cfg(any(test, feature = "tests"))]
mod mock;

pub use auth::{AUTH_HEADER, auth_token};
pub use client::{CatalogClient, ClientTrait, GET_IDS, GET_ITEMS, RequestStatus};
pub use config::{CatalogClientConfig, DEFAULT_API_URL, DEFAULT_PASSWORD, RetryPolicy};
pub use error::{CatalogClientError, RequestError};
#[cfg(any(test, feature = "tests"))]
pub use mock::{MockClient, MockResponse, RecordedCall};
pub use types::{FilterSet, Product, ProductId};
