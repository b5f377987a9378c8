mod browse;
mod page;

use anyhow::{Context, Result};
use bpaf::Bpaf;
use indoc::indoc;
use valantis_catalog::FilterSet;
use valantis_sdk::models::filter_input::FilterInput;

use crate::config::Config;

const VALANTIS_DESCRIPTION: &str = indoc! {"
    Browse the Valantis jewelry catalog.

    Products are filtered by name, price and brand, deduplicated
    and shown 50 to a page."
};

fn vec_len<T>(x: Vec<T>) -> usize {
    Vec::len(&x)
}

#[derive(Bpaf, Clone, Copy, Debug, PartialEq)]
pub enum Verbosity {
    Verbose(
        /// Increase logging verbosity
        ///
        /// Invoke multiple times for increasing detail.
        #[bpaf(short('v'), long("verbose"), req_flag(()), many, map(vec_len))]
        usize,
    ),

    /// Silence logs except for errors
    #[bpaf(short, long)]
    Quiet,
}

impl Default for Verbosity {
    fn default() -> Self {
        Verbosity::Verbose(0)
    }
}

#[derive(Bpaf)]
#[bpaf(options, descr(VALANTIS_DESCRIPTION))]
pub struct ValantisCli(#[bpaf(external(valantis_args))] pub ValantisArgs);

/// Main valantis args parser
///
/// To parse the valantis CLI, use [`ValantisCli`] instead using [`valantis_cli()`].
#[derive(Debug, Bpaf)]
#[bpaf(ignore_rustdoc)] // we don't want this struct to be interpreted as a group
pub struct ValantisArgs {
    #[bpaf(external, fallback(Default::default()))]
    pub verbosity: Verbosity,

    #[bpaf(external(commands))]
    command: Commands,
}

impl ValantisArgs {
    pub async fn handle(self, config: Config) -> Result<()> {
        match self.command {
            Commands::Page(args) => args.handle(config).await,
            Commands::Browse(args) => args.handle(config).await,
        }
    }
}

#[derive(Bpaf, Clone, Debug)]
enum Commands {
    /// Print one page of the catalog
    #[bpaf(command)]
    Page(#[bpaf(external(page::page))] page::Page),

    /// Browse the catalog interactively, reading commands from stdin
    #[bpaf(command)]
    Browse(#[bpaf(external(browse::browse))] browse::Browse),
}

/// Filters shared by all commands.
#[derive(Bpaf, Clone, Debug, Default, PartialEq)]
pub struct FilterArgs {
    /// Only show products whose name contains NAME (case-sensitive)
    #[bpaf(long, argument("NAME"))]
    pub name: Option<String>,

    /// Only show products priced exactly PRICE
    #[bpaf(long, argument("PRICE"))]
    pub price: Option<String>,

    /// Only show products of brand BRAND
    #[bpaf(long, argument("BRAND"))]
    pub brand: Option<String>,
}

impl FilterArgs {
    pub fn to_filters(&self) -> Result<FilterSet> {
        FilterSet::try_from(FilterInput {
            name: self.name.clone(),
            price: self.price.clone(),
            brand: self.brand.clone(),
        })
        .context("Invalid filter")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(args: &[&str]) -> ValantisArgs {
        let ValantisCli(args) = valantis_cli().run_inner(args).unwrap();
        args
    }

    #[test]
    fn parses_page_command() {
        let args = parse(&["-vv", "page", "--brand", "Piaget", "--page", "3", "--json"]);

        assert_eq!(args.verbosity, Verbosity::Verbose(2));
        let Commands::Page(page) = args.command else {
            panic!("expected the page command");
        };
        assert_eq!(page.page, 3);
        assert!(page.json);
        assert_eq!(page.filters, FilterArgs {
            brand: Some("Piaget".to_string()),
            ..Default::default()
        });
    }

    #[test]
    fn page_defaults_to_first() {
        let Commands::Page(page) = parse(&["page"]).command else {
            panic!("expected the page command");
        };
        assert_eq!(page.page, 1);
        assert!(!page.json);
    }

    #[test]
    fn page_zero_is_rejected() {
        assert!(valantis_cli().run_inner(&["page", "--page", "0"]).is_err());
    }

    #[test]
    fn parses_browse_with_filters() {
        let args = parse(&["-q", "browse", "--name", "кольцо", "--price", "500"]);

        assert_eq!(args.verbosity, Verbosity::Quiet);
        let Commands::Browse(browse) = args.command else {
            panic!("expected the browse command");
        };
        assert_eq!(browse.filters.to_filters().unwrap(), FilterSet {
            name: Some("кольцо".to_string()),
            price: Some(500.0),
            brand: None,
        });
    }

    #[test]
    fn non_numeric_price_is_rejected_before_any_request() {
        let filters = FilterArgs {
            price: Some("cheap".to_string()),
            ..Default::default()
        };
        let err = filters.to_filters().unwrap_err();
        assert_eq!(
            format!("{err:#}"),
            "Invalid filter: price 'cheap' is not a number"
        );
    }
}
