use anyhow::{Context, Result};
use tracing::debug;
use valantis_catalog::CatalogClient;
use valantis_sdk::models::pipeline::CatalogQueryPipeline;

use crate::config::Config;

/// Initialize the catalog API client
pub fn init_catalog_client(config: &Config) -> Result<CatalogClient> {
    let client_config = config.catalog_client_config();
    debug!(
        api_url = %client_config.api_url,
        retry = ?client_config.retry,
        "using catalog client"
    );
    CatalogClient::new(client_config).context("Could not create catalog client")
}

/// Initialize a query pipeline on top of `client`.
pub fn init_pipeline(config: &Config, client: CatalogClient) -> CatalogQueryPipeline<CatalogClient> {
    CatalogQueryPipeline::new(client, config.pipeline_options())
}
