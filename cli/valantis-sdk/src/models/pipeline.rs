//! Filter, deduplicate and page the catalog on the client side.

use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};
use valantis_catalog::{CatalogClientError, ClientTrait, FilterSet, Product, ProductId};

/// Maximum number of products on one page.
pub const PAGE_SIZE: usize = 50;

/// One page of the filtered, deduplicated catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    /// The page the items were taken from, after any filter-change reset.
    pub page: u32,
    pub items: Vec<Product>,
    pub total_pages: u32,
    /// Number of products matching the filters across all pages.
    pub total_items: usize,
}

impl PageResult {
    /// 1-based position of the first item of this page in the whole listing.
    pub fn first_row_number(&self) -> usize {
        page_offset(self.page) + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Send the deduplicated id list to `get_items` instead of the list as
    /// returned by `get_ids`. The final listing is the same either way.
    pub dedup_ids_before_fetch: bool,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to look up product ids")]
    Ids(#[source] CatalogClientError),
    #[error("failed to fetch products")]
    Items(#[source] CatalogClientError),
}

impl PipelineError {
    /// Whether the catalog could not be reached at all, as opposed to
    /// answering with something unusable.
    pub fn is_unavailable(&self) -> bool {
        match self {
            PipelineError::Ids(err) | PipelineError::Items(err) => err.is_unavailable(),
        }
    }
}

/// Turns `(page, filters)` into a [`PageResult`] using two dependent remote calls.
#[derive(Debug)]
pub struct CatalogQueryPipeline<C> {
    client: C,
    options: PipelineOptions,
    current_filters: FilterSet,
}

impl<C: ClientTrait> CatalogQueryPipeline<C> {
    pub fn new(client: C, options: PipelineOptions) -> Self {
        Self {
            client,
            options,
            current_filters: FilterSet::default(),
        }
    }

    /// Start from `filters` instead of the empty filter set, so that a first
    /// query with these filters is not treated as a filter change.
    pub fn with_filters(mut self, filters: FilterSet) -> Self {
        self.record_filters(filters);
        self
    }

    /// Replace the recorded filter set without querying.
    pub fn record_filters(&mut self, filters: FilterSet) {
        self.current_filters = filters;
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn current_filters(&self) -> &FilterSet {
        &self.current_filters
    }

    /// Produce page `page` of the products matching `filters`.
    ///
    /// Filters that differ from those of the previous query reset `page`
    /// to 1. A page past the end yields no items, not an error.
    #[instrument(skip(self))]
    pub async fn query(
        &mut self,
        page: u32,
        filters: &FilterSet,
    ) -> Result<PageResult, PipelineError> {
        let mut page = page.max(1);
        if *filters != self.current_filters {
            debug!(previous = ?self.current_filters, "filters changed, resetting to page 1");
            self.current_filters = filters.clone();
            page = 1;
        }

        let ids = self
            .client
            .get_ids(filters)
            .await
            .map_err(PipelineError::Ids)?;
        let unique_ids = dedup_ids(&ids);
        debug!(
            n_ids = ids.len(),
            n_unique = unique_ids.len(),
            "received product ids"
        );

        let ids_to_fetch = if self.options.dedup_ids_before_fetch {
            &unique_ids
        } else {
            &ids
        };
        let items = self
            .client
            .get_items(ids_to_fetch)
            .await
            .map_err(PipelineError::Items)?;

        let matching = dedup_by_id(apply_filters(items, filters));
        let total_items = matching.len();
        let total_pages = total_pages(total_items);
        let items = page_slice(matching, page);
        debug!(total_items, total_pages, n_on_page = items.len(), "page assembled");

        Ok(PageResult {
            page,
            items,
            total_pages,
            total_items,
        })
    }
}

/// Drop repeated ids, keeping the order of first occurrence.
pub fn dedup_ids(ids: &[ProductId]) -> Vec<ProductId> {
    ids.iter().unique().cloned().collect()
}

/// Drop products whose id was already seen, keeping the first occurrence.
pub fn dedup_by_id(items: impl IntoIterator<Item = Product>) -> Vec<Product> {
    items
        .into_iter()
        .unique_by(|product| product.id.clone())
        .collect()
}

/// Keep the products satisfying every predicate present in `filters`.
pub fn apply_filters(items: impl IntoIterator<Item = Product>, filters: &FilterSet) -> Vec<Product> {
    items
        .into_iter()
        .filter(|product| filters.matches(product))
        .collect()
}

/// Number of pages needed for `total_items` products.
pub fn total_pages(total_items: usize) -> u32 {
    u32::try_from(total_items.div_ceil(PAGE_SIZE)).unwrap_or(u32::MAX)
}

/// The products on 1-based page `page`, empty past the end.
pub fn page_slice(items: Vec<Product>, page: u32) -> Vec<Product> {
    items
        .into_iter()
        .skip(page_offset(page))
        .take(PAGE_SIZE)
        .collect()
}

fn page_offset(page: u32) -> usize {
    (page.max(1) as usize - 1).saturating_mul(PAGE_SIZE)
}
