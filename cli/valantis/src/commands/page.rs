use anyhow::{Context, Result};
use bpaf::Bpaf;
use tracing::instrument;
use valantis_catalog::{ClientTrait, FilterSet};
use valantis_sdk::models::controls::pagination_controls;
use valantis_sdk::models::pipeline::CatalogQueryPipeline;

use super::{FilterArgs, filter_args};
use crate::config::Config;
use crate::utils::init::{init_catalog_client, init_pipeline};
use crate::utils::render::{render_controls, render_page};

fn page_number(page: &u32) -> bool {
    *page >= 1
}

// Print one page of the catalog
#[derive(Debug, Bpaf, Clone)]
pub struct Page {
    #[bpaf(external(filter_args))]
    pub(crate) filters: FilterArgs,

    /// Page to show, starting at 1
    #[bpaf(long, argument("N"), guard(page_number, "page numbers start at 1"), fallback(1))]
    pub(crate) page: u32,

    /// Print the page as JSON
    #[bpaf(long)]
    pub(crate) json: bool,
}

impl Page {
    #[instrument(name = "page", fields(page = self.page, json = self.json), skip_all)]
    pub async fn handle(self, config: Config) -> Result<()> {
        let filters = self.filters.to_filters()?;
        let client = init_catalog_client(&config)?;
        let mut pipeline = init_pipeline(&config, client).with_filters(filters.clone());

        let output = self.render(&mut pipeline, &filters).await?;
        print!("{output}");
        Ok(())
    }

    async fn render<C: ClientTrait>(
        &self,
        pipeline: &mut CatalogQueryPipeline<C>,
        filters: &FilterSet,
    ) -> Result<String> {
        let result = pipeline
            .query(self.page, filters)
            .await
            .context("Could not load the catalog page")?;

        if self.json {
            return Ok(format!("{}\n", serde_json::to_string_pretty(&result)?));
        }

        let mut output = render_page(&result);
        let controls = render_controls(&pagination_controls(result.page, result.total_pages));
        if !controls.is_empty() {
            output.push_str(&controls);
            output.push('\n');
        }
        Ok(output)
    }
}
