//! Navigation state of a browsing session and its pure reducer.
//!
//! [`reduce`] never performs I/O. It returns the next state together with
//! the query the caller should run, if any. Every query carries a
//! [`QueryTicket`]; only the completion of the most recently issued ticket
//! is applied, older completions are dropped.

use derive_more::Display;
use tracing::debug;
use valantis_catalog::FilterSet;

/// Identifies one issued query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("#{_0}")]
pub struct QueryTicket(u64);

/// A query the reducer asks the caller to run.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub ticket: QueryTicket,
    pub page: u32,
    pub filters: FilterSet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NavigationEvent {
    /// Query the current page with the current filters.
    /// Used for the initial load as well.
    Refresh,
    SubmitFilters(FilterSet),
    ResetFilters,
    NextPage,
    PrevPage,
    JumpToPage(u32),
    /// Expand the ellipsis following `after_page`, landing on the page after it.
    ExpandEllipsis { after_page: u32 },
    QueryCompleted {
        ticket: QueryTicket,
        /// The page the result was taken from.
        page: u32,
        total_pages: u32,
    },
    QueryFailed { ticket: QueryTicket },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaginationState {
    pub current_page: u32,
    pub current_filters: FilterSet,
    /// Unknown until the first query completes.
    pub total_pages: Option<u32>,
    pub in_flight: Option<QueryTicket>,
    next_ticket: u64,
    /// Page and filters of the last successfully completed query.
    rendered: Option<(u32, FilterSet)>,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            current_page: 1,
            current_filters: FilterSet::default(),
            total_pages: None,
            in_flight: None,
            next_ticket: 0,
            rendered: None,
        }
    }
}

impl PaginationState {
    /// Start on page 1 with `filters` already applied.
    pub fn with_filters(filters: FilterSet) -> Self {
        Self {
            current_filters: filters,
            ..Default::default()
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether `ticket` belongs to the most recently issued query.
    pub fn is_current(&self, ticket: QueryTicket) -> bool {
        self.in_flight == Some(ticket)
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        self.total_pages
            .is_some_and(|total| self.current_page < total)
    }

    fn issue(mut self) -> Transition {
        let ticket = QueryTicket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        let query = QueryRequest {
            ticket,
            page: self.current_page,
            filters: self.current_filters.clone(),
        };
        debug!(%ticket, page = query.page, filters = ?query.filters, "issuing query");
        Transition {
            state: self,
            query: Some(query),
        }
    }

    fn go_to(mut self, page: u32) -> Transition {
        self.current_page = page.max(1);
        self.issue()
    }

    fn idle(self) -> Transition {
        Transition {
            state: self,
            query: None,
        }
    }
}

/// Result of applying one [`NavigationEvent`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: PaginationState,
    pub query: Option<QueryRequest>,
}

pub fn reduce(state: PaginationState, event: NavigationEvent) -> Transition {
    match event {
        NavigationEvent::Refresh => state.issue(),
        NavigationEvent::SubmitFilters(filters) if filters == state.current_filters => {
            state.issue()
        },
        NavigationEvent::SubmitFilters(filters) => {
            let mut state = state;
            state.current_filters = filters;
            state.go_to(1)
        },
        NavigationEvent::ResetFilters => {
            let mut state = state;
            state.current_filters = FilterSet::default();
            state.go_to(1)
        },
        NavigationEvent::NextPage if state.has_next() => {
            let page = state.current_page + 1;
            state.go_to(page)
        },
        NavigationEvent::PrevPage if state.has_previous() => {
            let page = state.current_page - 1;
            state.go_to(page)
        },
        NavigationEvent::NextPage | NavigationEvent::PrevPage => state.idle(),
        NavigationEvent::JumpToPage(page) => state.go_to(page),
        NavigationEvent::ExpandEllipsis { after_page } => {
            state.go_to(after_page.saturating_add(1))
        },
        NavigationEvent::QueryCompleted { ticket, .. } | NavigationEvent::QueryFailed { ticket }
            if !state.is_current(ticket) =>
        {
            debug!(%ticket, in_flight = ?state.in_flight, "ignoring stale query outcome");
            state.idle()
        },
        NavigationEvent::QueryCompleted {
            page, total_pages, ..
        } => {
            let mut state = state;
            state.in_flight = None;
            state.total_pages = Some(total_pages);
            state.current_page = page.max(1);

            // A page past the end was requested, show the last one instead.
            // The empty page is never rendered.
            let last = total_pages.max(1);
            if state.current_page > last {
                debug!(page, last, "page out of range, moving to last page");
                return state.go_to(last);
            }
            state.rendered = Some((state.current_page, state.current_filters.clone()));
            state.idle()
        },
        NavigationEvent::QueryFailed { .. } => {
            let mut state = state;
            state.in_flight = None;
            if let Some((page, filters)) = state.rendered.clone() {
                state.current_page = page;
                state.current_filters = filters;
            }
            // Keep the page within a total learned after the last render.
            if let Some(total) = state.total_pages {
                state.current_page = state.current_page.clamp(1, total.max(1));
            }
            state.idle()
        },
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn brand(brand: &str) -> FilterSet {
        FilterSet {
            brand: Some(brand.to_string()),
            ..Default::default()
        }
    }

    /// Apply `event` and complete the resulting query with `total_pages`.
    fn settle(state: PaginationState, event: NavigationEvent, total_pages: u32) -> PaginationState {
        let Transition { state, query } = reduce(state, event);
        let query = query.expect("event should issue a query");
        reduce(state, NavigationEvent::QueryCompleted {
            ticket: query.ticket,
            page: query.page,
            total_pages,
        })
        .state
    }

    fn on_page(page: u32, total_pages: u32) -> PaginationState {
        let state = settle(PaginationState::default(), NavigationEvent::Refresh, total_pages);
        settle(state, NavigationEvent::JumpToPage(page), total_pages)
    }

    #[test]
    fn initial_refresh_queries_first_page_unfiltered() {
        let Transition { state, query } = reduce(PaginationState::default(), NavigationEvent::Refresh);
        let query = query.unwrap();

        assert_eq!(query.page, 1);
        assert_eq!(query.filters, FilterSet::default());
        assert_eq!(state.total_pages, None);
        assert!(state.is_loading());
    }

    #[test]
    fn completion_records_total_pages() {
        let state = settle(PaginationState::default(), NavigationEvent::Refresh, 7);
        assert_eq!(state.total_pages, Some(7));
        assert_eq!(state.current_page, 1);
        assert!(!state.is_loading());
    }

    #[test]
    fn changed_filters_reset_to_first_page() {
        let state = on_page(5, 10);
        let state = settle(state, NavigationEvent::SubmitFilters(brand("X")), 10);
        let state = settle(state, NavigationEvent::JumpToPage(5), 10);

        let Transition { state, query } = reduce(state, NavigationEvent::SubmitFilters(brand("Y")));

        assert_eq!(query.unwrap().page, 1);
        assert_eq!(state.current_page, 1);
        assert_eq!(state.current_filters, brand("Y"));
    }

    #[test]
    fn resubmitting_same_filters_refreshes_current_page() {
        let state = on_page(1, 10);
        let state = settle(state, NavigationEvent::SubmitFilters(brand("X")), 10);
        let state = settle(state, NavigationEvent::JumpToPage(4), 10);

        let query = reduce(state, NavigationEvent::SubmitFilters(brand("X"))).query.unwrap();
        assert_eq!(query.page, 4);
        assert_eq!(query.filters, brand("X"));
    }

    #[test]
    fn reset_clears_filters() {
        let state = settle(PaginationState::with_filters(brand("X")), NavigationEvent::Refresh, 3);
        let state = settle(state, NavigationEvent::NextPage, 3);

        let Transition { state, query } = reduce(state, NavigationEvent::ResetFilters);
        let query = query.unwrap();

        assert_eq!(query.page, 1);
        assert_eq!(query.filters, FilterSet::default());
        assert_eq!(state.current_filters, FilterSet::default());
    }

    #[test]
    fn next_and_prev_stay_within_bounds() {
        let first = on_page(1, 3);
        assert_eq!(reduce(first.clone(), NavigationEvent::PrevPage).query, None);
        assert_eq!(reduce(first, NavigationEvent::NextPage).query.unwrap().page, 2);

        let last = on_page(3, 3);
        assert_eq!(reduce(last.clone(), NavigationEvent::NextPage).query, None);
        assert_eq!(reduce(last, NavigationEvent::PrevPage).query.unwrap().page, 2);
    }

    #[test]
    fn next_is_ignored_before_total_is_known() {
        let Transition { state, .. } = reduce(PaginationState::default(), NavigationEvent::Refresh);
        let Transition { state, query } = reduce(state, NavigationEvent::NextPage);
        assert_eq!(query, None);
        assert_eq!(state.current_page, 1);
    }

    #[test]
    fn single_page_has_no_navigation() {
        let state = on_page(1, 1);
        assert!(!state.has_previous());
        assert!(!state.has_next());
    }

    #[test]
    fn jump_and_expand_query_the_target_page() {
        let state = on_page(1, 10);
        assert_eq!(reduce(state.clone(), NavigationEvent::JumpToPage(8)).query.unwrap().page, 8);
        assert_eq!(reduce(state.clone(), NavigationEvent::JumpToPage(0)).query.unwrap().page, 1);
        assert_eq!(
            reduce(state, NavigationEvent::ExpandEllipsis { after_page: 2 })
                .query
                .unwrap()
                .page,
            3
        );
    }

    #[test]
    fn stale_completion_is_ignored() {
        let state = on_page(1, 10);
        let Transition { state, query } = reduce(state, NavigationEvent::JumpToPage(4));
        let stale = query.unwrap();
        let Transition { state, query } = reduce(state, NavigationEvent::JumpToPage(6));
        let fresh = query.unwrap();
        assert_ne!(stale.ticket, fresh.ticket);

        let Transition { state, query } = reduce(state, NavigationEvent::QueryCompleted {
            ticket: stale.ticket,
            page: 4,
            total_pages: 2,
        });
        assert_eq!(query, None);
        assert_eq!(state.current_page, 6);
        assert_eq!(state.total_pages, Some(10));
        assert!(state.is_current(fresh.ticket));

        let state = reduce(state, NavigationEvent::QueryCompleted {
            ticket: fresh.ticket,
            page: 6,
            total_pages: 10,
        })
        .state;
        assert_eq!(state.current_page, 6);
        assert!(!state.is_loading());
    }

    #[test]
    fn completion_past_the_end_moves_to_last_page() {
        let state = on_page(1, 10);
        let Transition { state, query } = reduce(state, NavigationEvent::JumpToPage(12));
        let query = query.unwrap();

        let Transition { state, query } = reduce(state, NavigationEvent::QueryCompleted {
            ticket: query.ticket,
            page: 12,
            total_pages: 10,
        });

        assert_eq!(query.unwrap().page, 10);
        assert_eq!(state.current_page, 10);
    }

    #[test]
    fn failed_follow_up_after_past_the_end_stays_in_range() {
        let state = on_page(2, 3);
        let Transition { state, query } = reduce(state, NavigationEvent::JumpToPage(9));
        let query = query.unwrap();
        let Transition { state, query } = reduce(state, NavigationEvent::QueryCompleted {
            ticket: query.ticket,
            page: 9,
            total_pages: 3,
        });
        let follow_up = query.unwrap();
        assert_eq!(follow_up.page, 3);

        let state = reduce(state, NavigationEvent::QueryFailed {
            ticket: follow_up.ticket,
        })
        .state;

        assert_eq!(state.current_page, 2);
        assert_eq!(state.total_pages, Some(3));
        assert!(!state.is_loading());
    }

    #[test]
    fn failure_after_catalog_shrank_clamps_to_last_page() {
        let state = on_page(5, 5);
        let Transition { state, query } = reduce(state, NavigationEvent::Refresh);
        let query = query.unwrap();
        let Transition { state, query } = reduce(state, NavigationEvent::QueryCompleted {
            ticket: query.ticket,
            page: 5,
            total_pages: 3,
        });
        let follow_up = query.unwrap();

        let state = reduce(state, NavigationEvent::QueryFailed {
            ticket: follow_up.ticket,
        })
        .state;

        assert_eq!(state.current_page, 3);
        assert_eq!(state.total_pages, Some(3));
    }

    #[test]
    fn empty_result_stays_on_first_page() {
        let state = settle(PaginationState::with_filters(brand("nobody")), NavigationEvent::Refresh, 0);
        assert_eq!(state.current_page, 1);
        assert_eq!(state.total_pages, Some(0));
        assert!(!state.is_loading());
    }

    #[test]
    fn failure_restores_last_rendered_view() {
        let state = on_page(3, 10);
        let Transition { state, query } = reduce(state, NavigationEvent::SubmitFilters(brand("X")));
        let ticket = query.unwrap().ticket;

        let state = reduce(state, NavigationEvent::QueryFailed { ticket }).state;

        assert_eq!(state.current_page, 3);
        assert_eq!(state.current_filters, FilterSet::default());
        assert!(!state.is_loading());
    }

    #[test]
    fn stale_failure_is_ignored() {
        let state = on_page(1, 10);
        let Transition { state, query } = reduce(state, NavigationEvent::JumpToPage(2));
        let stale = query.unwrap().ticket;
        let Transition { state, .. } = reduce(state, NavigationEvent::JumpToPage(3));

        let state = reduce(state, NavigationEvent::QueryFailed { ticket: stale }).state;
        assert_eq!(state.current_page, 3);
        assert!(state.is_loading());
    }
}
