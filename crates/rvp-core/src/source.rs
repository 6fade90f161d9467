use crate::Result;

/// Where fragments come from when neither cache tier has them
///
/// The storefront HTTP client is the real implementation; tests swap in
/// mocks. An `Ok("")` means "nothing to show" (non-success status or no
/// slide in the page); `Err` means the request itself blew up.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait FragmentSource: Send + Sync {
    async fn fetch_fragment(&self, handle: &str) -> Result<String>;
}
