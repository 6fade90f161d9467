use scraper::{Html, Selector};

use crate::storefront::{Result, StorefrontError};

/// Marker attribute the card template puts on its slide element
pub const DEFAULT_FRAGMENT_SELECTOR: &str = "[data-swiper-slide]";

/// Pull the first element matching `selector` out of a rendered page
///
/// Returns the element's outer HTML, or an empty string when nothing
/// matches. html5ever recovers from malformed markup instead of failing, so
/// only a bad selector is an error.
pub fn extract_fragment(html: &str, selector: &str) -> Result<String> {
    let selector = Selector::parse(selector)
        .map_err(|e| StorefrontError::InvalidSelector(format!("{}: {:?}", selector, e)))?;

    let document = Html::parse_document(html);
    let fragment = document
        .select(&selector)
        .next()
        .map(|element| element.html())
        .unwrap_or_default();

    Ok(fragment)
}
