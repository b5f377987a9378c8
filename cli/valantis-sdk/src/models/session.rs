//! A browsing session: navigation state, the pipeline running its queries,
//! and the page currently on display.

use std::error::Error;

use tracing::{debug, error, warn};
use valantis_catalog::{ClientTrait, RequestStatus};

use super::controls::{PageControl, pagination_controls};
use super::pagination::{NavigationEvent, PaginationState, QueryRequest, QueryTicket, Transition, reduce};
use super::pipeline::{CatalogQueryPipeline, PageResult, PipelineError};

/// What the presentation layer should show besides the page itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ViewStatus {
    /// Nothing requested yet.
    #[default]
    Idle,
    Loading,
    /// A request attempt failed and is being retried.
    Retrying { attempt: u32, error: String },
    Ready,
    /// The catalog answered with something unusable.
    Failed { message: String },
    /// The catalog could not be reached within the retry budget.
    Unavailable { message: String },
}

impl ViewStatus {
    /// Fold the progress of the underlying HTTP request into this status.
    pub fn with_request_status(self, request: &RequestStatus) -> ViewStatus {
        match (self, request) {
            (
                ViewStatus::Loading | ViewStatus::Retrying { .. },
                RequestStatus::Retrying { attempt, error, .. },
            ) => ViewStatus::Retrying {
                attempt: *attempt,
                error: error.clone(),
            },
            (status, _) => status,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ViewStatus::Loading | ViewStatus::Retrying { .. })
    }
}

/// Drives [`reduce`] and runs the queries it asks for.
///
/// A query's result is applied only while its ticket is the latest one, so
/// dropping the future returned by [`BrowseSession::run`] and dispatching
/// the next event is enough to cancel a query.
#[derive(Debug)]
pub struct BrowseSession<C> {
    pipeline: CatalogQueryPipeline<C>,
    state: PaginationState,
    page: Option<PageResult>,
    status: ViewStatus,
}

impl<C: ClientTrait> BrowseSession<C> {
    pub fn new(pipeline: CatalogQueryPipeline<C>) -> Self {
        let state = PaginationState::with_filters(pipeline.current_filters().clone());
        Self {
            pipeline,
            state,
            page: None,
            status: ViewStatus::Idle,
        }
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    /// The last successfully loaded page, kept on display through failures.
    pub fn page(&self) -> Option<&PageResult> {
        self.page.as_ref()
    }

    pub fn status(&self) -> &ViewStatus {
        &self.status
    }

    pub fn pipeline(&self) -> &CatalogQueryPipeline<C> {
        &self.pipeline
    }

    /// Controls for the page currently shown.
    pub fn controls(&self) -> Vec<PageControl> {
        match &self.page {
            Some(page) => pagination_controls(page.page, page.total_pages),
            None => Vec::new(),
        }
    }

    /// Apply `event`, returning the query to run if the event calls for one.
    pub fn dispatch(&mut self, event: NavigationEvent) -> Option<QueryRequest> {
        let Transition { state, query } = reduce(std::mem::take(&mut self.state), event);
        self.state = state;
        if query.is_some() {
            self.status = ViewStatus::Loading;
        }
        query
    }

    /// Run `request` and apply its outcome.
    ///
    /// Returns a follow-up query when the outcome requires one.
    pub async fn run(&mut self, request: QueryRequest) -> Option<QueryRequest> {
        let outcome = self.pipeline.query(request.page, &request.filters).await;
        self.complete(request.ticket, outcome)
    }

    /// Apply the outcome of the query identified by `ticket`.
    pub fn complete(
        &mut self,
        ticket: QueryTicket,
        outcome: Result<PageResult, PipelineError>,
    ) -> Option<QueryRequest> {
        if !self.state.is_current(ticket) {
            debug!(%ticket, "dropping outcome of a superseded query");
            return None;
        }

        match outcome {
            Ok(page) => {
                let event = NavigationEvent::QueryCompleted {
                    ticket,
                    page: page.page,
                    total_pages: page.total_pages,
                };
                // A page past the end is replaced by the last page, keep
                // showing the current one until that arrives.
                if page.page <= page.total_pages.max(1) {
                    self.page = Some(page);
                }
                self.status = ViewStatus::Ready;
                self.dispatch(event)
            },
            Err(err) => {
                let message = error_chain(&err);
                if err.is_unavailable() {
                    error!(%ticket, "catalog unavailable: {message}");
                    self.status = ViewStatus::Unavailable { message };
                } else {
                    warn!(%ticket, "query failed: {message}");
                    self.status = ViewStatus::Failed { message };
                }
                let follow_up = self.dispatch(NavigationEvent::QueryFailed { ticket });
                self.pipeline
                    .record_filters(self.state.current_filters.clone());
                follow_up
            },
        }
    }

    /// Apply `event` and run queries until the session settles.
    pub async fn handle(&mut self, event: NavigationEvent) {
        let mut next = self.dispatch(event);
        while let Some(request) = next {
            next = self.run(request).await;
        }
    }
}

/// `err` and its sources joined with ": ".
fn error_chain(err: &dyn Error) -> String {
    std::iter::successors(Some(err), |err| (*err).source())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}
