//! Data models for the Slack Web API.

use serde::{Deserialize, Serialize};

/// A channel as returned by `conversations.list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel ID (e.g. `C0123456789`).
    pub id: String,
    /// Channel name without the leading `#`.
    #[serde(default)]
    pub name: String,
    /// Whether the channel has been archived.
    #[serde(default)]
    pub is_archived: bool,
}

/// Channel reference embedded in a search match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    /// Channel ID.
    #[serde(default)]
    pub id: String,
    /// Channel name (may be empty for DMs).
    #[serde(default)]
    pub name: String,
}

/// A message returned by `search.messages`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    /// Message type, usually `message`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Message text in Slack mrkdwn.
    pub text: String,
    /// Author user ID.
    pub user: String,
    /// Author display name.
    pub username: String,
    /// Channel the message was posted in.
    pub channel: ChannelRef,
    /// Slack timestamp (`seconds.micros`), also the message ID within the channel.
    pub ts: String,
    /// Permanent link to the message.
    pub permalink: String,
}

impl Message {
    /// Channel name, falling back to the channel ID.
    #[must_use]
    pub fn channel_label(&self) -> &str {
        if self.channel.name.is_empty() {
            &self.channel.id
        } else {
            &self.channel.name
        }
    }

    /// Author display name, falling back to the user ID.
    #[must_use]
    pub fn author_label(&self) -> &str {
        if self.username.is_empty() {
            &self.user
        } else {
            &self.username
        }
    }
}

/// Accumulated outcome of a paginated search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    /// Matches in server order, truncated to the requested cap.
    pub matches: Vec<Message>,
    /// Number of matches collected locally. Always equals `matches.len()`;
    /// this is not the workspace-wide total reported by Slack.
    pub total: usize,
}

/// Identity returned by `auth.test`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthIdentity {
    /// Workspace URL.
    pub url: String,
    /// Workspace name.
    pub team: String,
    /// User name of the token owner.
    pub user: String,
    /// Workspace ID.
    pub team_id: String,
    /// User ID of the token owner.
    pub user_id: String,
}

/// Acknowledgement returned by `chat.postMessage`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostedMessage {
    /// Channel ID the message landed in.
    pub channel: String,
    /// Timestamp of the new message.
    pub ts: String,
}

// ─── Wire pages ──────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChannelPage {
    pub channels: Vec<Channel>,
    pub response_metadata: ResponseMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ResponseMetadata {
    pub next_cursor: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SearchPage {
    pub messages: SearchMessages,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct SearchMessages {
    pub matches: Vec<Message>,
    pub paging: Option<Paging>,
    pub pagination: Option<Pagination>,
}

impl SearchMessages {
    /// Total number of result pages the server reports, 0 when absent.
    pub fn page_count(&self) -> u32 {
        self.paging
            .as_ref()
            .map(|p| p.pages)
            .filter(|&n| n > 0)
            .or_else(|| self.pagination.as_ref().map(|p| p.page_count))
            .unwrap_or(0)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Paging {
    #[serde(alias = "page_count")]
    pub pages: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Pagination {
    pub page_count: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct TokenGrant {
    pub access_token: String,
    pub authed_user: Option<AuthedUser>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct AuthedUser {
    pub access_token: String,
}

impl TokenGrant {
    /// Bot token when granted, otherwise the user token.
    pub fn into_token(self) -> Option<String> {
        Some(self.access_token)
            .filter(|t| !t.is_empty())
            .or_else(|| {
                self.authed_user
                    .map(|u| u.access_token)
                    .filter(|t| !t.is_empty())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_tolerates_missing_fields() {
        let msg: Message = serde_json::from_str(r#"{"text":"hi","ts":"1.2"}"#).expect("parse");
        assert_eq!(msg.text, "hi");
        assert!(msg.user.is_empty());
        assert!(msg.channel.id.is_empty());
    }

    #[test]
    fn labels_fall_back_to_ids() {
        let msg = Message {
            user: "U1".to_string(),
            channel: ChannelRef {
                id: "C1".to_string(),
                name: String::new(),
            },
            ..Message::default()
        };
        assert_eq!(msg.author_label(), "U1");
        assert_eq!(msg.channel_label(), "C1");
    }

    #[test]
    fn page_count_reads_either_paging_shape() {
        let paging: SearchMessages =
            serde_json::from_str(r#"{"matches":[],"paging":{"pages":4}}"#).expect("parse");
        assert_eq!(paging.page_count(), 4);

        let legacy: SearchMessages =
            serde_json::from_str(r#"{"matches":[],"paging":{"page_count":2}}"#).expect("parse");
        assert_eq!(legacy.page_count(), 2);

        let pagination: SearchMessages =
            serde_json::from_str(r#"{"matches":[],"pagination":{"page_count":3}}"#)
                .expect("parse");
        assert_eq!(pagination.page_count(), 3);

        let none: SearchMessages = serde_json::from_str(r#"{"matches":[]}"#).expect("parse");
        assert_eq!(none.page_count(), 0);
    }

    #[test]
    fn token_grant_prefers_top_level_token() {
        let grant: TokenGrant = serde_json::from_str(
            r#"{"access_token":"xoxb-1","authed_user":{"access_token":"xoxp-1"}}"#,
        )
        .expect("parse");
        assert_eq!(grant.into_token().as_deref(), Some("xoxb-1"));

        let user_only: TokenGrant =
            serde_json::from_str(r#"{"authed_user":{"access_token":"xoxp-2"}}"#).expect("parse");
        assert_eq!(user_only.into_token().as_deref(), Some("xoxp-2"));

        let empty: TokenGrant = serde_json::from_str("{}").expect("parse");
        assert_eq!(empty.into_token(), None);
    }
}
