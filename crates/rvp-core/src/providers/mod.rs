// Fragment source implementations
pub mod storefront;

pub use storefront::StorefrontProvider;
