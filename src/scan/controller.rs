//! Page-lifetime scan loop: an initial pass, then periodic re-scans until the
//! pass budget runs out or the page goes quiet.

use super::annotate::annotate_document;
use super::dom::HtmlDom;
use super::session::{AppliedBadge, ScanSession, ScanStats};
use super::{scan_pass, PageContext, PassOutcome};
use crate::config::Config;
use crate::storefront::client::StorefrontSource;
use crate::storefront::models::PageType;
use scraper::Html;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// How long to wait after a change signal for further changes to settle.
const SIGNAL_DEBOUNCE: Duration = Duration::from_millis(100);

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxPasses,
    Idle,
    SignalsClosed,
}

/// Summary of a finished scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub url: String,
    pub page_type: PageType,
    pub product_source: Option<&'static str>,
    pub stats: ScanStats,
    pub stop_reason: StopReason,
    pub badges: Vec<AppliedBadge>,
    /// The last scanned document with the overlay injected
    #[serde(skip)]
    pub annotated_html: String,
}

/// Drives repeated scan passes over one page.
pub struct ScanController<'a, S: StorefrontSource + ?Sized> {
    source: &'a S,
    interval: Duration,
    max_passes: u32,
    idle_passes_before_stop: u32,
    ancestor_depth: usize,
    signals: Option<mpsc::Receiver<()>>,
}

impl<'a, S: StorefrontSource + ?Sized> ScanController<'a, S> {
    pub fn new(source: &'a S, config: &Config) -> Self {
        Self {
            source,
            interval: Duration::from_millis(config.scan_interval_ms),
            max_passes: config.max_passes.max(1),
            idle_passes_before_stop: config.idle_passes_before_stop,
            ancestor_depth: config.ancestor_depth,
            signals: None,
        }
    }

    /// Re-scans early whenever a change signal arrives. The interval keeps
    /// ticking alongside, and the loop ends when the sender is dropped.
    pub fn with_signals(mut self, signals: mpsc::Receiver<()>) -> Self {
        self.signals = Some(signals);
        self
    }

    /// Scans `url`, starting from already-fetched HTML. Later passes re-fetch
    /// the page through the source.
    pub async fn run(&mut self, session: &mut ScanSession, url: &str, initial_html: String) -> ScanReport {
        let mut html = initial_html;
        let mut idle_passes = 0;
        let mut ticker = (!self.interval.is_zero()).then(|| {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        // The first tick completes immediately.
        if let Some(ticker) = ticker.as_mut() {
            ticker.tick().await;
        }

        let mut last_page: PageContext;
        let mut annotated: String;

        let stop_reason = loop {
            let document = Html::parse_document(&html);
            let page = PageContext::from_document(&document, url);

            if let Some(currency) = &page.currency {
                session.set_currency(currency.clone());
            }

            let outcome: PassOutcome = {
                let dom = HtmlDom::new(&document);
                scan_pass(session, &dom, &page, self.source, self.ancestor_depth).await
            };
            annotated = annotate_document(&document, session.overlay(), session.anchors());
            last_page = page;

            if outcome.discovered_anything() {
                idle_passes = 0;
            } else {
                idle_passes += 1;
            }

            if session.stats().passes >= self.max_passes {
                break StopReason::MaxPasses;
            }
            if self.idle_passes_before_stop > 0 && idle_passes >= self.idle_passes_before_stop {
                debug!("No new products for {} passes, stopping", idle_passes);
                break StopReason::Idle;
            }

            if !self.wait(&mut ticker).await {
                break StopReason::SignalsClosed;
            }

            match self.source.page(url).await {
                Ok(body) => html = body,
                Err(e) => warn!("Re-fetch of {} failed, re-scanning previous markup: {}", url, e),
            }
        };

        let stats = session.stats();
        info!(
            "Scan of {} finished after {} passes ({:?}): {} badges on {} containers",
            url, stats.passes, stop_reason, stats.badges_applied, stats.containers_resolved
        );

        ScanReport {
            url: url.to_string(),
            page_type: last_page.page_type,
            product_source: last_page.product_source,
            stats,
            stop_reason,
            badges: session.applied().to_vec(),
            annotated_html: annotated,
        }
    }

    /// Waits for the next tick or change signal, whichever comes first.
    /// Returns false when the signal channel closed.
    async fn wait(&mut self, ticker: &mut Option<tokio::time::Interval>) -> bool {
        let Some(signals) = self.signals.as_mut() else {
            if let Some(ticker) = ticker.as_mut() {
                ticker.tick().await;
            }
            return true;
        };

        let received = match ticker.as_mut() {
            Some(ticker) => tokio::select! {
                _ = ticker.tick() => return true,
                received = signals.recv() => received,
            },
            None => signals.recv().await,
        };
        if received.is_none() {
            return false;
        }

        tokio::time::sleep(SIGNAL_DEBOUNCE).await;
        // Collapse a burst of signals into one pass
        while signals.try_recv().is_ok() {}
        if let Some(ticker) = ticker.as_mut() {
            ticker.reset();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badge::RenderSettings;
    use crate::error::BadgeError;
    use crate::rules::BadgeRule;
    use crate::storefront::models::Product;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves a queue of page bodies, repeating the last one.
    struct PagedSource {
        pages: Mutex<Vec<String>>,
        page_calls: AtomicUsize,
    }

    impl PagedSource {
        fn new(pages: Vec<&str>) -> Self {
            Self {
                pages: Mutex::new(pages.into_iter().rev().map(String::from).collect()),
                page_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl StorefrontSource for PagedSource {
        async fn rules(&self) -> Result<Vec<BadgeRule>, BadgeError> {
            Ok(vec![])
        }

        async fn product(&self, handle: &str) -> Result<Product, BadgeError> {
            Ok(Product { id: format!("id-{}", handle), handle: handle.into(), ..Default::default() })
        }

        async fn page(&self, _url: &str) -> Result<String, BadgeError> {
            self.page_calls.fetch_add(1, Ordering::SeqCst);
            let mut pages = self.pages.lock().unwrap();
            let body = if pages.len() > 1 { pages.pop() } else { pages.last().cloned() };
            Ok(body.unwrap_or_default())
        }
    }

    fn make_config(max_passes: u32, idle: u32) -> Config {
        Config { scan_interval_ms: 0, max_passes, idle_passes_before_stop: idle, ..Config::default() }
    }

    fn make_session() -> ScanSession {
        ScanSession::new(vec![BadgeRule::new("1", "NEW")], RenderSettings::default())
    }

    fn listing(handles: &[&str]) -> String {
        let cards: String = handles
            .iter()
            .map(|h| format!(r#"<div class="card-wrapper"><a href="/products/{}">x</a></div>"#, h))
            .collect();
        format!("<html><body class=\"template-collection\">{}</body></html>", cards)
    }

    #[tokio::test]
    async fn test_stops_when_idle() {
        let page = listing(&["a", "b"]);
        let source = PagedSource::new(vec![&page]);
        let mut session = make_session();

        let report = ScanController::new(&source, &make_config(10, 2))
            .run(&mut session, "https://shop.test/collections/all", page.clone())
            .await;

        // One productive pass, then two idle ones
        assert_eq!(report.stop_reason, StopReason::Idle);
        assert_eq!(report.stats.passes, 3);
        assert_eq!(report.badges.len(), 2);
        assert_eq!(report.page_type, PageType::Collection);
        assert!(report.annotated_html.contains("sb-badge-id-a-1"));
    }

    #[tokio::test]
    async fn test_picks_up_late_products() {
        let first = listing(&["a"]);
        let second = listing(&["a", "b"]);
        let source = PagedSource::new(vec![&second]);
        let mut session = make_session();

        let report = ScanController::new(&source, &make_config(10, 1))
            .run(&mut session, "https://shop.test/collections/all", first)
            .await;

        assert_eq!(report.badges.len(), 2);
        assert_eq!(report.stop_reason, StopReason::Idle);
        assert!(source.page_calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_respects_max_passes() {
        let page = listing(&["a"]);
        let source = PagedSource::new(vec![&page]);
        let mut session = make_session();

        let report = ScanController::new(&source, &make_config(1, 0))
            .run(&mut session, "https://shop.test/", page.clone())
            .await;

        assert_eq!(report.stop_reason, StopReason::MaxPasses);
        assert_eq!(report.stats.passes, 1);
        assert_eq!(source.page_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_signals_trigger_rescan() {
        let page = listing(&["a"]);
        let source = PagedSource::new(vec![&page]);
        let mut session = make_session();
        let (tx, rx) = mpsc::channel(4);

        tx.send(()).await.unwrap();
        tx.send(()).await.unwrap();
        drop(tx);

        let report = ScanController::new(&source, &make_config(10, 0))
            .with_signals(rx)
            .run(&mut session, "https://shop.test/", page.clone())
            .await;

        // Both queued signals collapse into one re-scan, then the closed channel ends the loop
        assert_eq!(report.stop_reason, StopReason::SignalsClosed);
        assert_eq!(report.stats.passes, 2);
        assert_eq!(source.page_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_interval_keeps_ticking_with_quiet_signals() {
        let page = listing(&["a"]);
        let source = PagedSource::new(vec![&page]);
        let mut session = make_session();
        let (_tx, rx) = mpsc::channel(4);
        let config = Config { scan_interval_ms: 5, ..make_config(3, 0) };

        let report = ScanController::new(&source, &config)
            .with_signals(rx)
            .run(&mut session, "https://shop.test/", page.clone())
            .await;

        assert_eq!(report.stop_reason, StopReason::MaxPasses);
        assert_eq!(report.stats.passes, 3);
        assert_eq!(source.page_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_card_inserted_ahead_of_badged_card() {
        let first = listing(&["a"]);
        let second = listing(&["b", "a"]);
        let source = PagedSource::new(vec![&second]);
        let mut session = make_session();

        let report = ScanController::new(&source, &make_config(10, 1))
            .run(&mut session, "https://shop.test/collections/all", first)
            .await;

        let mut handles: Vec<_> = report.badges.iter().map(|b| b.product_handle.as_str()).collect();
        handles.sort();
        assert_eq!(handles, vec!["a", "b"]);

        // Each badge stays inside its own card
        let html = &report.annotated_html;
        let b_badge = html.find("sb-badge-id-b-1").unwrap();
        let a_link = html.find("/products/a").unwrap();
        let a_badge = html.find("sb-badge-id-a-1").unwrap();
        assert!(html.find("/products/b").unwrap() < b_badge);
        assert!(b_badge < a_link && a_link < a_badge);
        assert_eq!(html.matches("sb-badge-id-a-1").count(), 1);
    }
}
