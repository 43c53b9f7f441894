use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A viewer chat comment.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Gateway-assigned id.
    pub id: String,
    /// Viewer id.
    pub author_id: String,
    /// Viewer display name.
    pub author_name: String,
    /// Viewer handle, if the platform has one.
    #[serde(default)]
    pub handle: Option<String>,
    /// Viewer avatar.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Comment body.
    pub text: String,
    /// Creation time (ms since epoch).
    #[serde(default)]
    pub created_at_ms: u64,
    /// Whether the comment was already marked read.
    #[serde(default)]
    pub read: bool,
}

/// A gift sent by a viewer.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Gift {
    /// Gateway-assigned id.
    pub id: String,
    /// Viewer id.
    pub sender_id: String,
    /// Viewer display name.
    pub sender_name: String,
    /// Gift type, e.g. `"rose"`.
    pub gift_name: String,
    /// How many were sent.
    #[serde(default = "one")]
    pub amount: u32,
    /// Creation time (ms since epoch).
    #[serde(default)]
    pub created_at_ms: u64,
    /// Whether the gift was already marked read.
    #[serde(default)]
    pub read: bool,
}

fn one() -> u32 {
    1
}

/// One entry of the top-liker ranking.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopLiker {
    /// Viewer id.
    pub user_id: String,
    /// Viewer display name.
    pub display_name: String,
    /// Viewer handle.
    #[serde(default)]
    pub handle: Option<String>,
    /// Viewer avatar.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Likes in the ranking window.
    #[serde(default)]
    pub likes: u64,
}

/// Ranking window for top likers.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TopLikerWindow {
    /// Recent activity only.
    Recent,
    /// Since the stream started.
    AllTime,
}

impl TopLikerWindow {
    /// Query-string value.
    pub fn as_str(self) -> &'static str {
        match self {
            TopLikerWindow::Recent => "recent",
            TopLikerWindow::AllTime => "all_time",
        }
    }
}

/// A message in the shared peer-agent room.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessage {
    /// Gateway-assigned id.
    pub id: String,
    /// Agent that wrote it.
    pub author_id: String,
    /// Display name of that agent.
    pub author_name: String,
    /// Body.
    pub text: String,
    /// Creation time (ms since epoch).
    #[serde(default)]
    pub created_at_ms: u64,
}

/// Body of a peer-room post.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomPost {
    /// Posting agent.
    pub agent_id: String,
    /// Name shown in the room.
    pub display_name: String,
    /// Body.
    pub text: String,
    /// Synthesized speech, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

/// Animation change for the avatar.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnimationUpdate {
    /// Agent whose avatar animates.
    pub agent_id: String,
    /// Catalog animation name.
    pub animation: String,
}

/// Liveness report.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    /// Reporting agent.
    pub agent_id: String,
    /// Free-form status, `"alive"` for heartbeats.
    pub status: String,
    /// Heartbeat counter, persisted across restarts.
    pub beat: u64,
    /// Time since process start.
    pub uptime_ms: u64,
    /// Report time (ms since epoch).
    pub at_ms: u64,
}

/// One agent reaction, as published to the presentation layer.
///
/// Built with [`OutboundResponse::builder`]; immutable afterwards.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutboundResponse {
    /// Fresh UUID per record.
    pub id: String,
    /// What the agent says.
    pub text: String,
    /// Speaking agent.
    pub agent_id: String,
    /// Viewer being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_user: Option<String>,
    /// Comment being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<String>,
    /// Text of the comment being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message_text: Option<String>,
    /// Handle of the viewer being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_handle: Option<String>,
    /// Avatar of the viewer being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_avatar: Option<String>,
    /// Set on gift thank-yous.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_gift_response: bool,
    /// Gift being thanked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gift_id: Option<String>,
    /// Set on top-liker thank-yous.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_top_liker_response: bool,
    /// Set on unprompted remarks.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_thought: bool,
    /// Animation to play alongside.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
    /// Synthesized speech.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl OutboundResponse {
    /// Start a record for `agent_id` saying `text`.
    pub fn builder(agent_id: impl Into<String>, text: impl Into<String>) -> OutboundResponseBuilder {
        OutboundResponseBuilder {
            inner: OutboundResponse {
                id: Uuid::new_v4().to_string(),
                text: text.into(),
                agent_id: agent_id.into(),
                reply_to_user: None,
                reply_to_message_id: None,
                reply_to_message_text: None,
                reply_to_handle: None,
                reply_to_avatar: None,
                is_gift_response: false,
                gift_id: None,
                is_top_liker_response: false,
                is_thought: false,
                animation: None,
                audio_url: None,
            },
        }
    }
}

/// Builder for [`OutboundResponse`].
#[derive(Debug)]
pub struct OutboundResponseBuilder {
    inner: OutboundResponse,
}

impl OutboundResponseBuilder {
    /// Mark as a reply to `comment`.
    pub fn reply_to(mut self, comment: &Comment) -> Self {
        self.inner.reply_to_user = Some(comment.author_name.clone());
        self.inner.reply_to_message_id = Some(comment.id.clone());
        self.inner.reply_to_message_text = Some(comment.text.clone());
        self.inner.reply_to_handle = comment.handle.clone();
        self.inner.reply_to_avatar = comment.avatar_url.clone();
        self
    }

    /// Mark as a thank-you for `gift`.
    pub fn for_gift(mut self, gift: &Gift) -> Self {
        self.inner.is_gift_response = true;
        self.inner.gift_id = Some(gift.id.clone());
        self.inner.reply_to_user = Some(gift.sender_name.clone());
        self
    }

    /// Mark as a thank-you for a top liker.
    pub fn for_top_liker(mut self, liker: &TopLiker) -> Self {
        self.inner.is_top_liker_response = true;
        self.inner.reply_to_user = Some(liker.display_name.clone());
        self.inner.reply_to_handle = liker.handle.clone();
        self.inner.reply_to_avatar = liker.avatar_url.clone();
        self
    }

    /// Mark as an unprompted remark.
    pub fn thought(mut self) -> Self {
        self.inner.is_thought = true;
        self
    }

    /// Attach an animation.
    pub fn animation(mut self, animation: Option<String>) -> Self {
        self.inner.animation = animation;
        self
    }

    /// Attach synthesized speech.
    pub fn audio(mut self, audio_url: Option<String>) -> Self {
        self.inner.audio_url = audio_url;
        self
    }

    /// Finish the record.
    pub fn build(self) -> OutboundResponse {
        self.inner
    }
}
