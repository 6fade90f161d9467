// Storefront provider - bridges the HTTP client with FragmentSource
use async_trait::async_trait;
use rvp_api::StorefrontClient;

use crate::{config::StorefrontConfig, source::FragmentSource, Result};

/// Wrapper around StorefrontClient that implements FragmentSource
pub struct StorefrontProvider {
    client: StorefrontClient,
}

impl StorefrontProvider {
    pub fn new(client: StorefrontClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: &StorefrontConfig) -> Result<Self> {
        let client = StorefrontClient::with_view(
            config.base_url.clone(),
            config.view.clone(),
            config.selector.clone(),
        )?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &StorefrontClient {
        &self.client
    }
}

#[async_trait]
impl FragmentSource for StorefrontProvider {
    async fn fetch_fragment(&self, handle: &str) -> Result<String> {
        let fragment = self.client.fetch_fragment(handle).await?;
        Ok(fragment)
    }
}
