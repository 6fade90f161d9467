// Storefront HTTP client - fetches pre-rendered product cards
pub mod extract;
pub mod storefront;

// Re-export common types
pub use extract::{extract_fragment, DEFAULT_FRAGMENT_SELECTOR};
pub use storefront::{FetchedPage, StorefrontClient, StorefrontError, DEFAULT_FRAGMENT_VIEW};
