//! Collaborators the jobs talk to: the data gateway, text generation and speech.
//!
//! Each is an async trait so job bodies can run against in-process fakes;
//! the `Http*` types are the production adapters.

mod gateway;
mod generation;
mod speech;

pub use gateway::HttpGateway;
pub use generation::HttpGeneration;
pub use speech::{HttpSpeech, NoSpeech};

use std::sync::Arc;

use async_trait::async_trait;
use cohost_core::cfg::Config;
use cohost_core::error::{GatewayError, GenerationError, SpeechError};
use cohost_core::model::{
    AnimationUpdate, Comment, Gift, OutboundResponse, RoomMessage, RoomPost, StatusUpdate,
    TopLiker, TopLikerWindow,
};

/// Remote store of viewer events and sink for agent output.
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Unread comments for `agent_id` created after `since_ms`.
    async fn fetch_unread_comments(&self, agent_id: &str, since_ms: u64) -> Result<Vec<Comment>, GatewayError>;
    /// Mark comments read. Idempotent on the gateway side.
    async fn mark_comments_read(&self, ids: &[String]) -> Result<u64, GatewayError>;
    /// Unread gifts for `agent_id`.
    async fn fetch_unread_gifts(&self, agent_id: &str) -> Result<Vec<Gift>, GatewayError>;
    /// Mark gifts read.
    async fn mark_gifts_read(&self, agent_id: &str, ids: &[String]) -> Result<u64, GatewayError>;
    /// Ranked likers for the window.
    async fn fetch_top_likers(&self, agent_id: &str, window: TopLikerWindow) -> Result<Vec<TopLiker>, GatewayError>;
    /// Last `limit` room messages, oldest first.
    async fn fetch_room_messages(&self, room_id: &str, limit: u32) -> Result<Vec<RoomMessage>, GatewayError>;
    /// Post into the shared peer room.
    async fn post_room_message(&self, room_id: &str, post: &RoomPost) -> Result<(), GatewayError>;
    /// Publish one reaction. The record is consumed.
    async fn publish_response(&self, record: OutboundResponse) -> Result<(), GatewayError>;
    /// Switch the avatar animation.
    async fn publish_animation(&self, update: &AnimationUpdate) -> Result<(), GatewayError>;
    /// Liveness report.
    async fn publish_status(&self, update: &StatusUpdate) -> Result<(), GatewayError>;
}

/// Output length hint for a completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

/// Turns a context string into text.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn complete(&self, context: &str, size: SizeClass) -> Result<String, GenerationError>;
}

/// Turns text into a hosted audio resource.
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Returns the URL of the uploaded audio.
    async fn synthesize(&self, text: &str) -> Result<String, SpeechError>;
}

/// The three collaborators, shared by every job.
#[derive(Clone)]
pub struct Services {
    pub gateway: Arc<dyn DataGateway>,
    pub generation: Arc<dyn GenerationService>,
    pub speech: Arc<dyn SpeechService>,
}

impl Services {
    /// HTTP adapters for every configured endpoint; speech falls back to [`NoSpeech`].
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let speech: Arc<dyn SpeechService> = match &cfg.speech.base_url {
            Some(url) => Arc::new(HttpSpeech::new(url, &cfg.speech)?),
            None => {
                tracing::info!("no speech endpoint configured; responses go out without audio");
                Arc::new(NoSpeech)
            }
        };
        Ok(Self {
            gateway: Arc::new(HttpGateway::new(&cfg.gateway)?),
            generation: Arc::new(HttpGeneration::new(&cfg.generation)?),
            speech,
        })
    }
}
