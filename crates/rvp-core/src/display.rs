use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{config::Config, fetcher::ProductFetcher, recorder::ViewedItemsRecorder, Error, Result};

/// Class added to the slide container when the carousel never came up
pub const FALLBACK_GRID_CLASS: &str = "fallback-grid";

/// Third-party carousel living around the slide container
///
/// `ready` resolves once the carousel component can be (re)initialized. It
/// is awaited with a deadline, never polled.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Carousel: Send + Sync {
    async fn ready(&self) -> Result<()>;
    fn destroy(&self);
    fn initialize(&self);
}

/// Where rendered cards are injected
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlideContainer {
    pub inner_html: String,
    pub classes: BTreeSet<String>,
    /// The enclosing section was hidden because there is nothing to show
    pub section_hidden: bool,
}

impl SlideContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn add_class(&mut self, class: &str) {
        self.classes.insert(class.to_string());
    }
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub products_to_show: usize,
    /// On a product page the current product is in the list but never
    /// shown, so one extra handle is requested
    pub is_product_template: bool,
    pub current_handle: Option<String>,
    pub hide_empty_section: bool,
    /// Theme editor preview: render nothing
    pub design_mode: bool,
    pub readiness_timeout: Duration,
}

impl DisplaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            products_to_show: config.display.products_to_show,
            hide_empty_section: config.display.hide_empty_section,
            design_mode: config.display.design_mode,
            readiness_timeout: config.display.readiness_timeout(),
            ..Self::default()
        }
    }

    /// How many handles to take from the viewed list
    pub fn request_limit(&self) -> usize {
        if self.is_product_template {
            self.products_to_show + 1
        } else {
            self.products_to_show
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            products_to_show: 4,
            is_product_template: false,
            current_handle: None,
            hide_empty_section: false,
            design_mode: false,
            readiness_timeout: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Design mode; nothing fetched
    Skipped,
    /// No history and the section is configured to hide
    Hidden,
    /// No history, or every fragment came back blank
    Empty,
    Rendered { cards: usize, animated: bool },
}

/// Picks handles from the viewed list, resolves them and fills the container
pub struct DisplayController {
    recorder: ViewedItemsRecorder,
    fetcher: Arc<ProductFetcher>,
    settings: DisplaySettings,
}

impl DisplayController {
    pub fn new(
        recorder: ViewedItemsRecorder,
        fetcher: Arc<ProductFetcher>,
        settings: DisplaySettings,
    ) -> Self {
        Self {
            recorder,
            fetcher,
            settings,
        }
    }

    /// Handles to request, in display order (current product still included)
    pub fn handles_to_request(&self) -> Vec<String> {
        let mut list = self.recorder.list();
        list.truncate(self.settings.request_limit());
        list
    }

    pub async fn render(
        &self,
        container: &mut SlideContainer,
        carousel: Option<&dyn Carousel>,
    ) -> RenderOutcome {
        if self.settings.design_mode {
            debug!("Design mode, skipping recently viewed render");
            return RenderOutcome::Skipped;
        }

        let handles = self.handles_to_request();
        if handles.is_empty() {
            if self.settings.hide_empty_section {
                container.section_hidden = true;
                return RenderOutcome::Hidden;
            }
            return RenderOutcome::Empty;
        }

        let fragments = self
            .fetcher
            .resolve_batch(&handles, self.settings.current_handle.as_deref())
            .await;

        let cards = fragments.iter().filter(|f| !f.is_empty()).count();
        if cards == 0 {
            info!("No recently viewed products could be rendered");
            return RenderOutcome::Empty;
        }

        container.inner_html = fragments.concat();

        let Some(carousel) = carousel else {
            return RenderOutcome::Rendered {
                cards,
                animated: false,
            };
        };

        match self.refresh_carousel(carousel).await {
            Ok(()) => RenderOutcome::Rendered {
                cards,
                animated: true,
            },
            Err(e) => {
                warn!("Carousel unavailable ({}), displaying static grid", e);
                container.add_class(FALLBACK_GRID_CLASS);
                RenderOutcome::Rendered {
                    cards,
                    animated: false,
                }
            }
        }
    }

    async fn refresh_carousel(&self, carousel: &dyn Carousel) -> Result<()> {
        let timeout = self.settings.readiness_timeout;
        match tokio::time::timeout(timeout, carousel.ready()).await {
            Ok(ready) => ready?,
            Err(_) => {
                let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                return Err(Error::ReadinessTimeout(millis));
            }
        }

        carousel.destroy();
        carousel.initialize();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockFragmentSource;
    use mockall::predicate::eq;
    use mockall::Sequence;
    use rvp_cache::{ManualClock, MemoryStorage, MemoryTier, SessionTier, Storage};

    fn card(handle: &str) -> String {
        format!("<div data-swiper-slide>{}</div>", handle)
    }

    fn controller(
        history: &[&str],
        source: MockFragmentSource,
        settings: DisplaySettings,
    ) -> DisplayController {
        let local = Arc::new(MemoryStorage::new());
        let recorder = ViewedItemsRecorder::new(local, "1");
        // record() puts newest first, so replay oldest first
        for handle in history.iter().rev() {
            recorder.record(handle).unwrap();
        }

        let fetcher = ProductFetcher::new(
            Arc::new(source),
            Arc::new(MemoryTier::new()),
            SessionTier::new(Arc::new(MemoryStorage::new()) as Arc<dyn Storage>, "rvp_"),
            Arc::new(ManualClock::new(0)),
        );

        DisplayController::new(recorder, Arc::new(fetcher), settings)
    }

    fn echo_source() -> MockFragmentSource {
        let mut source = MockFragmentSource::new();
        source.expect_fetch_fragment().returning(|h| Ok(card(h)));
        source
    }

    fn ready_carousel() -> MockCarousel {
        let mut carousel = MockCarousel::new();
        let mut seq = Sequence::new();
        carousel.expect_ready().times(1).returning(|| Ok(()));
        carousel
            .expect_destroy()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        carousel
            .expect_initialize()
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        carousel
    }

    /// Carousel whose component never finishes loading
    struct NeverReady;

    #[async_trait]
    impl Carousel for NeverReady {
        async fn ready(&self) -> Result<()> {
            futures::future::pending::<()>().await;
            Ok(())
        }
        fn destroy(&self) {
            panic!("destroy called on a carousel that never became ready");
        }
        fn initialize(&self) {
            panic!("initialize called on a carousel that never became ready");
        }
    }

    #[test]
    fn test_request_limit() {
        let mut settings = DisplaySettings {
            products_to_show: 4,
            ..DisplaySettings::default()
        };
        assert_eq!(settings.request_limit(), 4);

        settings.is_product_template = true;
        assert_eq!(settings.request_limit(), 5);
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.display.products_to_show = 6;
        config.display.readiness_timeout_ms = 500;
        config.display.hide_empty_section = true;

        let settings = DisplaySettings::from_config(&config);
        assert_eq!(settings.products_to_show, 6);
        assert_eq!(settings.readiness_timeout, Duration::from_millis(500));
        assert!(settings.hide_empty_section);
        assert!(!settings.design_mode);

        config.display.design_mode = true;
        assert!(DisplaySettings::from_config(&config).design_mode);
    }

    #[tokio::test]
    async fn test_design_mode_from_config_skips_render() {
        let mut config = Config::default();
        config.display.design_mode = true;

        let mut source = MockFragmentSource::new();
        source.expect_fetch_fragment().never();

        let controller = controller(&["a"], source, DisplaySettings::from_config(&config));
        let mut container = SlideContainer::new();

        assert_eq!(
            controller.render(&mut container, None).await,
            RenderOutcome::Skipped
        );
    }

    #[tokio::test]
    async fn test_renders_and_reinitializes_carousel() {
        let controller = controller(&["a", "b", "c"], echo_source(), DisplaySettings::default());
        let carousel = ready_carousel();
        let mut container = SlideContainer::new();

        let outcome = controller.render(&mut container, Some(&carousel as &dyn Carousel)).await;

        assert_eq!(
            outcome,
            RenderOutcome::Rendered {
                cards: 3,
                animated: true
            }
        );
        assert_eq!(container.inner_html, format!("{}{}{}", card("a"), card("b"), card("c")));
        assert!(!container.has_class(FALLBACK_GRID_CLASS));
    }

    #[tokio::test]
    async fn test_product_template_requests_one_extra_and_skips_current() {
        let mut source = MockFragmentSource::new();
        source.expect_fetch_fragment().with(eq("b")).never();
        source.expect_fetch_fragment().with(eq("d")).never();
        source.expect_fetch_fragment().returning(|h| Ok(card(h)));

        let settings = DisplaySettings {
            products_to_show: 2,
            is_product_template: true,
            current_handle: Some("b".to_string()),
            ..DisplaySettings::default()
        };
        let controller = controller(&["a", "b", "c", "d"], source, settings);
        assert_eq!(controller.handles_to_request(), vec!["a", "b", "c"]);

        let mut container = SlideContainer::new();
        let outcome = controller.render(&mut container, None).await;

        assert_eq!(
            outcome,
            RenderOutcome::Rendered {
                cards: 2,
                animated: false
            }
        );
        assert_eq!(container.inner_html, format!("{}{}", card("a"), card("c")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_readiness_timeout_falls_back_to_static_grid() {
        let controller = controller(&["a"], echo_source(), DisplaySettings::default());
        let mut container = SlideContainer::new();

        let outcome = controller.render(&mut container, Some(&NeverReady as &dyn Carousel)).await;

        assert_eq!(
            outcome,
            RenderOutcome::Rendered {
                cards: 1,
                animated: false
            }
        );
        assert!(container.has_class(FALLBACK_GRID_CLASS));
        assert_eq!(container.inner_html, card("a"));
    }

    #[tokio::test]
    async fn test_readiness_error_falls_back_to_static_grid() {
        let mut carousel = MockCarousel::new();
        carousel
            .expect_ready()
            .returning(|| Err(Error::CarouselError("script failed to load".into())));
        carousel.expect_destroy().never();
        carousel.expect_initialize().never();

        let controller = controller(&["a"], echo_source(), DisplaySettings::default());
        let mut container = SlideContainer::new();
        controller.render(&mut container, Some(&carousel as &dyn Carousel)).await;

        assert!(container.has_class(FALLBACK_GRID_CLASS));
    }

    #[tokio::test]
    async fn test_empty_history_hides_section_when_configured() {
        let mut source = MockFragmentSource::new();
        source.expect_fetch_fragment().never();

        let settings = DisplaySettings {
            hide_empty_section: true,
            ..DisplaySettings::default()
        };
        let controller = controller(&[], source, settings);
        let mut container = SlideContainer::new();

        assert_eq!(
            controller.render(&mut container, None).await,
            RenderOutcome::Hidden
        );
        assert!(container.section_hidden);
    }

    #[tokio::test]
    async fn test_empty_history_leaves_section_visible_by_default() {
        let controller = controller(&[], MockFragmentSource::new(), DisplaySettings::default());
        let mut container = SlideContainer::new();

        assert_eq!(
            controller.render(&mut container, None).await,
            RenderOutcome::Empty
        );
        assert!(!container.section_hidden);
    }

    #[tokio::test]
    async fn test_all_blank_fragments_leave_container_untouched() {
        let mut source = MockFragmentSource::new();
        source.expect_fetch_fragment().returning(|_| Ok(String::new()));

        let mut carousel = MockCarousel::new();
        carousel.expect_ready().never();

        let controller = controller(&["a", "b"], source, DisplaySettings::default());
        let mut container = SlideContainer::new();
        container.inner_html = "<p>placeholder</p>".to_string();

        assert_eq!(
            controller.render(&mut container, Some(&carousel as &dyn Carousel)).await,
            RenderOutcome::Empty
        );
        assert_eq!(container.inner_html, "<p>placeholder</p>");
    }

    #[tokio::test]
    async fn test_design_mode_fetches_nothing() {
        let mut source = MockFragmentSource::new();
        source.expect_fetch_fragment().never();

        let settings = DisplaySettings {
            design_mode: true,
            ..DisplaySettings::default()
        };
        let controller = controller(&["a"], source, settings);
        let mut container = SlideContainer::new();

        assert_eq!(
            controller.render(&mut container, None).await,
            RenderOutcome::Skipped
        );
        assert!(container.inner_html.is_empty());
    }
}
