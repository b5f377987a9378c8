use std::io::Write;

use anyhow::Result;
use bpaf::Bpaf;
use indoc::indoc;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::watch;
use tracing::{debug, instrument};
use valantis_catalog::{ClientTrait, FilterSet, RequestStatus};
use valantis_sdk::models::filter_input::{FilterInput, FilterInputError};
use valantis_sdk::models::pagination::{NavigationEvent, QueryRequest};
use valantis_sdk::models::session::{BrowseSession, ViewStatus};

use super::{FilterArgs, filter_args};
use crate::config::Config;
use crate::utils::init::{init_catalog_client, init_pipeline};
use crate::utils::message;
use crate::utils::render::{render_controls, render_page, render_status};

const BROWSE_HELP: &str = indoc! {"
    Commands:
      n, next                      next page
      p, prev                      previous page
      <number>                     go to page <number>
      more <number>                expand the '…' following page <number>
      filter name=…, price=…, brand=…
                                   apply filters, any subset, comma separated
      reset                        clear all filters
      r, refresh                   reload the current page
      h, help                      show this help
      q, quit                      exit
    Typing a command while a page is loading cancels the load."
};

// Browse the catalog interactively
#[derive(Debug, Bpaf, Clone)]
pub struct Browse {
    #[bpaf(external(filter_args))]
    pub(crate) filters: FilterArgs,
}

impl Browse {
    #[instrument(name = "browse", skip_all)]
    pub async fn handle(self, config: Config) -> Result<()> {
        let filters = self.filters.to_filters()?;
        let client = init_catalog_client(&config)?;
        let status_rx = client.subscribe();
        let session = BrowseSession::new(init_pipeline(&config, client).with_filters(filters));

        message::plain(BROWSE_HELP);
        let lines = BufReader::new(tokio::io::stdin()).lines();
        run_session(session, lines, status_rx, &mut std::io::stdout()).await
    }
}

/// A line of user input.
#[derive(Debug, Clone, PartialEq)]
enum BrowseCommand {
    Navigate(NavigationEvent),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
enum BrowseInputError {
    #[error("unknown command '{0}', type 'help' for a list of commands")]
    UnknownCommand(String),
    #[error("'{0}' is not a page number")]
    InvalidPage(String),
    #[error("unknown filter '{0}', expected name, price or brand")]
    UnknownFilter(String),
    #[error("expected 'field=value', found '{0}'")]
    MalformedFilter(String),
    #[error(transparent)]
    Filter(#[from] FilterInputError),
}

fn parse_page(page: &str) -> Result<u32, BrowseInputError> {
    page.parse()
        .map_err(|_| BrowseInputError::InvalidPage(page.to_string()))
}

/// Parse `name=…, price=…, brand=…` into a filter set.
fn parse_filters(assignments: &str) -> Result<FilterSet, BrowseInputError> {
    let mut input = FilterInput::default();
    for assignment in assignments.split(',').filter(|a| !a.trim().is_empty()) {
        let (field, value) = assignment
            .split_once('=')
            .ok_or_else(|| BrowseInputError::MalformedFilter(assignment.trim().to_string()))?;
        let slot = match field.trim() {
            "name" => &mut input.name,
            "price" => &mut input.price,
            "brand" => &mut input.brand,
            other => return Err(BrowseInputError::UnknownFilter(other.to_string())),
        };
        *slot = Some(value.to_string());
    }
    Ok(FilterSet::try_from(input)?)
}

/// Parse one line of input, `None` for a blank line.
fn parse_command(line: &str) -> Result<Option<BrowseCommand>, BrowseInputError> {
    let line = line.trim();
    let (command, rest) = line
        .split_once(char::is_whitespace)
        .map(|(command, rest)| (command, rest.trim()))
        .unwrap_or((line, ""));

    let command = match command {
        "" => return Ok(None),
        "n" | "next" => BrowseCommand::Navigate(NavigationEvent::NextPage),
        "p" | "prev" => BrowseCommand::Navigate(NavigationEvent::PrevPage),
        "more" => BrowseCommand::Navigate(NavigationEvent::ExpandEllipsis {
            after_page: parse_page(rest)?,
        }),
        "filter" => BrowseCommand::Navigate(NavigationEvent::SubmitFilters(parse_filters(rest)?)),
        "reset" => BrowseCommand::Navigate(NavigationEvent::ResetFilters),
        "r" | "refresh" => BrowseCommand::Navigate(NavigationEvent::Refresh),
        "h" | "help" | "?" => BrowseCommand::Help,
        "q" | "quit" => BrowseCommand::Quit,
        page if page.starts_with(|c: char| c.is_ascii_digit()) => {
            BrowseCommand::Navigate(NavigationEvent::JumpToPage(parse_page(page)?))
        },
        other => return Err(BrowseInputError::UnknownCommand(other.to_string())),
    };
    Ok(Some(command))
}

enum QueryOutcome {
    /// The query ran to completion, possibly asking for a follow-up.
    Settled(Option<QueryRequest>),
    /// Input arrived first, the query was dropped.
    Interrupted(Option<String>),
}

/// Run an interactive session until `quit` or end of input.
///
/// Queries run concurrently with reading input. A line arriving while a
/// query is in flight cancels that query. If the line does not start a new
/// query of its own, the cancelled one is started over.
async fn run_session<C, R, W>(
    mut session: BrowseSession<C>,
    mut lines: Lines<R>,
    mut status_rx: watch::Receiver<RequestStatus>,
    out: &mut W,
) -> Result<()>
where
    C: ClientTrait,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut pending = session.dispatch(NavigationEvent::Refresh);

    loop {
        let mut interrupted = None;
        let line = match pending.take() {
            Some(request) => {
                let mut view_status = session.status().clone();
                if let Some(status) = render_status(&view_status) {
                    message::plain(status);
                }

                let outcome = {
                    let run = session.run(request.clone());
                    tokio::pin!(run);
                    loop {
                        tokio::select! {
                            biased;
                            next = &mut run => break QueryOutcome::Settled(next),
                            Ok(()) = status_rx.changed() => {
                                let request_status = status_rx.borrow_and_update().clone();
                                let updated = view_status.clone().with_request_status(&request_status);
                                if updated != view_status {
                                    if let Some(status) = render_status(&updated) {
                                        message::warning(status);
                                    }
                                    view_status = updated;
                                }
                            },
                            line = lines.next_line() => break QueryOutcome::Interrupted(line?),
                        }
                    }
                };

                match outcome {
                    QueryOutcome::Settled(next) => {
                        pending = next;
                        if pending.is_none() {
                            render_view(&session, out)?;
                        }
                        continue;
                    },
                    QueryOutcome::Interrupted(line) => {
                        debug!(ticket = %request.ticket, "input received, cancelling query");
                        interrupted = Some(request);
                        line
                    },
                }
            },
            None => lines.next_line().await?,
        };

        // end of input
        let Some(line) = line else {
            break;
        };

        match parse_command(&line) {
            Ok(Some(BrowseCommand::Quit)) => break,
            Ok(Some(BrowseCommand::Help)) => writeln!(out, "{BROWSE_HELP}")?,
            Ok(Some(BrowseCommand::Navigate(event))) => {
                pending = session.dispatch(event);
                if pending.is_none() && interrupted.is_none() {
                    message::plain("Already there.");
                }
            },
            Ok(None) => {},
            Err(err) => message::error(err),
        }

        if pending.is_none() {
            pending = interrupted.take();
        }
    }

    Ok(())
}

fn render_view<C: ClientTrait, W: Write>(session: &BrowseSession<C>, out: &mut W) -> Result<()> {
    if matches!(
        session.status(),
        ViewStatus::Failed { .. } | ViewStatus::Unavailable { .. }
    ) {
        if let Some(status) = render_status(session.status()) {
            message::error(status);
        }
    }

    if let Some(page) = session.page() {
        write!(out, "{}", render_page(page))?;
        let controls = render_controls(&session.controls());
        if !controls.is_empty() {
            writeln!(out, "{controls}")?;
        }
    }
    out.flush()?;
    Ok(())
}
