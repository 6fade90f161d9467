use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::extract::{extract_fragment, DEFAULT_FRAGMENT_SELECTOR};

/// Alternate product template that renders just the card
pub const DEFAULT_FRAGMENT_VIEW: &str = "recently-viewed-card";

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid fragment selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid storefront URL: {0}")]
    InvalidUrl(String),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Outcome of requesting a product page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedPage {
    Ok(String),
    NotOk(StatusCode),
}

/// Client for `GET /products/{handle}?view={view}`
///
/// No request timeout and no retries: a slow or failed card just leaves a
/// blank slot in the carousel.
#[derive(Debug, Clone)]
pub struct StorefrontClient {
    client: reqwest::Client,
    base_url: String,
    view: String,
    selector: String,
}

impl StorefrontClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_view(base_url, DEFAULT_FRAGMENT_VIEW, DEFAULT_FRAGMENT_SELECTOR)
    }

    pub fn with_view(
        base_url: impl Into<String>,
        view: impl Into<String>,
        selector: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(StorefrontError::InvalidUrl(base_url));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(concat!("rvp/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url,
            view: view.into(),
            selector: selector.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn product_url(&self, handle: &str) -> String {
        format!("{}/products/{}", self.base_url, urlencoding::encode(handle))
    }

    /// Fetch the rendered card page for `handle`
    pub async fn fetch_page(&self, handle: &str) -> Result<FetchedPage> {
        let url = self.product_url(handle);
        debug!("Fetching {}?view={}", url, self.view);

        let response = self
            .client
            .get(&url)
            .query(&[("view", self.view.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!("Storefront returned {} for {}", status, handle);
            return Ok(FetchedPage::NotOk(status));
        }

        let body = response.text().await?;
        Ok(FetchedPage::Ok(body))
    }

    /// Fetch and extract the slide fragment for `handle`
    ///
    /// Empty string when the storefront answers with a non-success status
    /// or the page has no slide element.
    pub async fn fetch_fragment(&self, handle: &str) -> Result<String> {
        match self.fetch_page(handle).await? {
            FetchedPage::Ok(body) => extract_fragment(&body, &self.selector),
            FetchedPage::NotOk(_) => Ok(String::new()),
        }
    }
}
