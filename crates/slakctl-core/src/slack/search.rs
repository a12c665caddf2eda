//! Page-numbered message search (`search.messages`).

use reqwest::Method;

use crate::CoreError;
use crate::slack::client::SlackClient;
use crate::slack::fetch::{DEFAULT_SEARCH_CAP, FetchOptions, pause};
use crate::slack::models::{SearchPage, SearchResults};

/// Matches requested per page; Slack's ceiling for `search.messages`.
pub const SEARCH_PAGE_SIZE: usize = 100;

impl SlackClient {
    /// Search messages for `keyword`, newest first.
    ///
    /// Collects up to `options.result_cap` matches (20 when the cap is 0),
    /// truncating the final page so the cap is never exceeded. Pages after
    /// the first are separated by the configured search interval.
    ///
    /// `total` in the result is the number of matches collected here, not
    /// the workspace-wide count Slack reports.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] for an empty keyword before
    /// any request is made, otherwise the first transport, HTTP or API
    /// error encountered.
    pub async fn search(
        &self,
        keyword: &str,
        mut options: FetchOptions<'_>,
    ) -> Result<SearchResults, CoreError> {
        if keyword.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "search keyword must not be empty".to_string(),
            ));
        }

        let cap = if options.result_cap > 0 {
            options.result_cap
        } else {
            DEFAULT_SEARCH_CAP
        };
        let mut matches = Vec::new();
        let mut page: u32 = 1;

        loop {
            let query = [
                ("query", keyword.to_string()),
                ("sort", "timestamp".to_string()),
                ("sort_dir", "desc".to_string()),
                ("page", page.to_string()),
                ("count", SEARCH_PAGE_SIZE.to_string()),
            ];

            let response: SearchPage = self
                .call::<_, ()>("search", Method::GET, "search.messages", &query, None)
                .await?;

            let remaining = cap.saturating_sub(matches.len());
            let page_count = response.messages.page_count();
            let mut found = response.messages.matches;
            found.truncate(remaining);
            matches.extend(found);
            log::debug!(
                "search.messages page {page}/{page_count}: {} of {cap} collected",
                matches.len()
            );

            options.report(matches.len(), cap);

            if matches.len() >= cap || page >= page_count {
                break;
            }

            if page > 1 {
                pause(self.pacing.search_page_interval).await;
            }

            page += 1;
        }

        Ok(SearchResults {
            total: matches.len(),
            matches,
        })
    }
}
