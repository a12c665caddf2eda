//! Options shared by the paginated collection calls.

use std::fmt;
use std::time::Duration;

use crate::config::PacingConfig;

/// Default cap for `search` when the caller passes 0.
pub const DEFAULT_SEARCH_CAP: usize = 20;

/// Default cap for `list_channels` unless the caller asks for everything.
pub const DEFAULT_CHANNEL_CAP: usize = 1000;

/// Progress callback: `(current, total)`, where `total == 0` means unbounded.
pub type ProgressFn<'a> = Box<dyn FnMut(usize, usize) + Send + 'a>;

/// Caller-supplied knobs for a paginated fetch.
///
/// `result_cap == 0` means "no cap" for channel listing and "use the default
/// of 20" for search.
#[derive(Default)]
pub struct FetchOptions<'a> {
    /// Maximum number of results to return.
    pub result_cap: usize,
    /// Keep archived channels (listing only).
    pub include_archived: bool,
    /// Invoked once per fetched page.
    pub progress: Option<ProgressFn<'a>>,
}

impl<'a> FetchOptions<'a> {
    /// Options with the given result cap.
    #[must_use]
    pub fn with_cap(result_cap: usize) -> Self {
        Self {
            result_cap,
            ..Self::default()
        }
    }

    /// Options that walk every page (listing only).
    #[must_use]
    pub fn unbounded() -> Self {
        Self::with_cap(0)
    }

    /// Include or exclude archived channels.
    #[must_use]
    pub fn include_archived(mut self, include: bool) -> Self {
        self.include_archived = include;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn on_progress(mut self, progress: impl FnMut(usize, usize) + Send + 'a) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub(crate) fn report(&mut self, current: usize, total: usize) {
        if let Some(progress) = self.progress.as_mut() {
            progress(current, total);
        }
    }
}

impl fmt::Debug for FetchOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("result_cap", &self.result_cap)
            .field("include_archived", &self.include_archived)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Pauses inserted between page requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause between channel pages, applied only to unbounded listings.
    pub channel_page_interval: Duration,
    /// Pause between search pages, always applied.
    pub search_page_interval: Duration,
}

impl Pacing {
    /// No pauses at all.
    pub const NONE: Self = Self {
        channel_page_interval: Duration::ZERO,
        search_page_interval: Duration::ZERO,
    };
}

impl Default for Pacing {
    fn default() -> Self {
        Self::from(PacingConfig::default())
    }
}

impl From<PacingConfig> for Pacing {
    fn from(cfg: PacingConfig) -> Self {
        Self {
            channel_page_interval: Duration::from_secs(cfg.channel_page_interval),
            search_page_interval: Duration::from_secs(cfg.search_page_interval),
        }
    }
}

pub(crate) async fn pause(interval: Duration) {
    if !interval.is_zero() {
        log::debug!("pacing: sleeping {interval:?} before next page");
        tokio::time::sleep(interval).await;
    }
}
