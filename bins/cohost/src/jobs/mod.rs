//! Job bodies and the runner that dispatches to them.
//!
//! Per-job state (the comment watermark, the last peer message) lives here as
//! plain fields: the scheduler hands out `&mut` access one job at a time.

mod animation;
mod chat;
mod gifts;
mod heartbeat;
mod peer_chat;
mod thought;
mod top_likers;

use std::sync::Arc;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;

use cohost_core::cfg::{AgentCfg, ChatCfg, Config, PeerCfg};
use cohost_core::error::JobError;
use cohost_core::job::JobKind;
use cohost_core::memory::AgentMemory;
use cohost_core::store::Kv;

use crate::catalog::AnimationCatalog;
use crate::clock::Clock;
use crate::composer::Composer;
use crate::scheduler::JobRunner;
use crate::services::{DataGateway, GenerationService, Services};

/// The agent: collaborators, memory and per-job state.
pub struct Cohost<K> {
    agent: AgentCfg,
    chat_cfg: ChatCfg,
    peer_cfg: PeerCfg,
    gateway: Arc<dyn DataGateway>,
    generation: Arc<dyn GenerationService>,
    composer: Composer,
    memory: AgentMemory<K>,
    kv: K,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    started_ms: u64,
    comment_watermark_ms: u64,
    last_peer_message_id: Option<String>,
    beats: u64,
}

impl<K: Kv> Cohost<K> {
    pub fn new(cfg: &Config, services: Services, kv: K, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_ms();
        let catalog = AnimationCatalog::new(cfg.animations.iter().cloned());
        let composer = Composer::new(
            cfg.agent.clone(),
            catalog,
            services.generation.clone(),
            services.speech.clone(),
        );
        Self {
            agent: cfg.agent.clone(),
            chat_cfg: cfg.chat.clone(),
            peer_cfg: cfg.peer.clone(),
            gateway: services.gateway,
            generation: services.generation,
            composer,
            memory: AgentMemory::new(kv.clone(), cfg.agent.id.clone()),
            kv,
            clock,
            rng: StdRng::from_entropy(),
            started_ms: now,
            comment_watermark_ms: now,
            last_peer_message_id: None,
            beats: 0,
        }
    }

    /// Deterministic coin flips.
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }
}

#[async_trait]
impl<K: Kv> JobRunner for Cohost<K> {
    async fn run(&mut self, kind: JobKind) -> Result<(), JobError> {
        match kind {
            JobKind::Gifts => self.read_gifts().await,
            JobKind::Chat => self.read_chat().await,
            JobKind::TopLikers => self.thank_top_liker().await,
            JobKind::Thought => self.share_thought().await,
            JobKind::PeerChat => self.chat_with_peers().await,
            JobKind::Animation => self.cycle_animation().await,
            JobKind::Heartbeat => self.heartbeat().await,
        }
    }
}
