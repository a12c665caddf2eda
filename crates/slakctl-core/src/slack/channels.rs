//! Cursor-paginated channel listing (`conversations.list`).

use reqwest::Method;

use crate::CoreError;
use crate::slack::client::SlackClient;
use crate::slack::fetch::{FetchOptions, pause};
use crate::slack::models::{Channel, ChannelPage};

/// Channels requested per page.
pub const CHANNEL_PAGE_SIZE: usize = 1000;

impl SlackClient {
    /// List channels visible to the token owner.
    ///
    /// Pages are fetched sequentially and appended in arrival order until
    /// `options.result_cap` channels have been collected (the last page is
    /// truncated to hit the cap exactly) or the server stops returning a
    /// cursor. A cap of 0 walks every page; only then are pages paced by
    /// the configured channel interval.
    ///
    /// Archived channels are filtered out unless `options.include_archived`
    /// is set.
    ///
    /// # Errors
    ///
    /// Returns the first transport, HTTP or API error encountered. No
    /// partial result is returned.
    pub async fn list_channels(
        &self,
        mut options: FetchOptions<'_>,
    ) -> Result<Vec<Channel>, CoreError> {
        let cap = options.result_cap;
        let unbounded = cap == 0;
        let mut channels: Vec<Channel> = Vec::new();
        let mut cursor = String::new();
        let mut page_number = 0_usize;

        loop {
            page_number += 1;

            let mut query = vec![("limit", CHANNEL_PAGE_SIZE.to_string())];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.clone()));
            }
            if !options.include_archived {
                query.push(("exclude_archived", "true".to_string()));
            }

            let page: ChannelPage = self
                .call::<_, ()>(
                    "list channels",
                    Method::GET,
                    "conversations.list",
                    &query,
                    None,
                )
                .await?;

            let received = page.channels.len();
            channels.extend(
                page.channels
                    .into_iter()
                    .filter(|c| options.include_archived || !c.is_archived),
            );
            log::debug!(
                "conversations.list page {page_number}: {received} channels, {} total",
                channels.len()
            );

            if !unbounded {
                channels.truncate(cap);
            }
            options.report(channels.len(), cap);

            if !unbounded && channels.len() >= cap {
                break;
            }

            let next_cursor = page.response_metadata.next_cursor;
            if next_cursor.is_empty() {
                break;
            }

            if unbounded && page_number > 1 {
                pause(self.pacing.channel_page_interval).await;
            }

            cursor = next_cursor;
        }

        Ok(channels)
    }
}
