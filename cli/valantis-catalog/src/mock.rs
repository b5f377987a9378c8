//! Canned-response client for tests.
//!
//! Only available in this crate's tests or with the `tests` feature enabled.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::client::{ClientTrait, GET_IDS, GET_ITEMS};
use crate::error::{CatalogClientError, RequestError};
use crate::types::{FilterSet, Product, ProductId};

/// A response handed out by [`MockClient`], in the order it was pushed.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Ids(Vec<ProductId>),
    Items(Vec<Product>),
    /// A raw `result` payload, decoded like the HTTP client would.
    Raw(Value),
    /// The retry budget ran out.
    Unavailable,
}

/// A call observed by [`MockClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    GetIds(FilterSet),
    GetItems(Vec<ProductId>),
}

type MockField<T> = Arc<Mutex<T>>;

#[derive(Debug, Clone, Default)]
pub struct MockClient {
    // A Mutex so that the trait doesn't need `&mut self` just to pop responses.
    responses: MockField<VecDeque<MockResponse>>,
    calls: MockField<Vec<RecordedCall>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new response into the list of mock responses
    pub fn push_response(&self, response: MockResponse) {
        self.responses
            .lock()
            .expect("couldn't acquire mock lock")
            .push_back(response);
    }

    /// Queue a `get_ids` response followed by the matching `get_items` response.
    pub fn push_query(&self, ids: Vec<ProductId>, items: Vec<Product>) {
        self.push_response(MockResponse::Ids(ids));
        self.push_response(MockResponse::Items(items));
    }

    /// All calls made so far, oldest first.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("couldn't acquire mock lock").clone()
    }

    pub fn remaining_responses(&self) -> usize {
        self.responses.lock().expect("couldn't acquire mock lock").len()
    }

    fn next_response(&self, call: RecordedCall) -> MockResponse {
        self.calls
            .lock()
            .expect("couldn't acquire mock lock")
            .push(call.clone());
        self.responses
            .lock()
            .expect("couldn't acquire mock lock")
            .pop_front()
            .unwrap_or_else(|| panic!("no mock response left for {call:?}"))
    }
}

fn unavailable(action: &str) -> CatalogClientError {
    CatalogClientError::Unavailable {
        action: action.to_string(),
        attempts: 1,
        last_error: RequestError::MissingResult,
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    action: &str,
    value: Value,
) -> Result<T, CatalogClientError> {
    serde_json::from_value(value).map_err(|source| CatalogClientError::UnexpectedResult {
        action: action.to_string(),
        source,
    })
}

impl ClientTrait for MockClient {
    async fn get_ids(&self, filters: &FilterSet) -> Result<Vec<ProductId>, CatalogClientError> {
        match self.next_response(RecordedCall::GetIds(filters.clone())) {
            MockResponse::Ids(ids) => Ok(ids),
            MockResponse::Raw(value) => decode(GET_IDS, value),
            MockResponse::Unavailable => Err(unavailable(GET_IDS)),
            other => panic!("expected an ids response, found {other:?}"),
        }
    }

    async fn get_items(&self, ids: &[ProductId]) -> Result<Vec<Product>, CatalogClientError> {
        match self.next_response(RecordedCall::GetItems(ids.to_vec())) {
            MockResponse::Items(items) => Ok(items),
            MockResponse::Raw(value) => decode(GET_ITEMS, value),
            MockResponse::Unavailable => Err(unavailable(GET_ITEMS)),
            other => panic!("expected an items response, found {other:?}"),
        }
    }
}
