// Recently viewed products - recording, tiered fetching, display
pub mod config;
pub mod display;
pub mod error;
pub mod fetcher;
pub mod providers;
pub mod recorder;
pub mod source;

pub use config::Config;
pub use display::{Carousel, DisplayController, DisplaySettings, RenderOutcome, SlideContainer};
pub use error::Error;
pub use fetcher::{ProductFetcher, CACHE_TTL};
pub use recorder::ViewedItemsRecorder;
pub use source::FragmentSource;

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
