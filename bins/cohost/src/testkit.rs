//! In-process fakes for the gateway, generation and speech services.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use cohost_core::cfg::Config;
use cohost_core::error::{GatewayError, GenerationError, SpeechError};
use cohost_core::model::{
    AnimationUpdate, Comment, Gift, OutboundResponse, RoomMessage, RoomPost, StatusUpdate,
    TopLiker, TopLikerWindow,
};
use cohost_core::store::MemKv;

use crate::clock::Clock;
use crate::jobs::Cohost;
use crate::services::{DataGateway, GenerationService, Services, SizeClass, SpeechService};

pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self { now: AtomicU64::new(start_ms) }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub fn comment(id: &str, author: &str, text: &str) -> Comment {
    Comment {
        id: id.into(),
        author_id: format!("uid-{author}"),
        author_name: author.into(),
        handle: Some(format!("@{}", author.to_lowercase())),
        avatar_url: None,
        text: text.into(),
        created_at_ms: 0,
        read: false,
    }
}

pub fn gift(id: &str, name: &str) -> Gift {
    Gift {
        id: id.into(),
        sender_id: "uid-rin".into(),
        sender_name: "Rin".into(),
        gift_name: name.into(),
        amount: 1,
        created_at_ms: 0,
        read: false,
    }
}

pub fn room_message(id: &str, author_id: &str, text: &str) -> RoomMessage {
    RoomMessage {
        id: id.into(),
        author_id: author_id.into(),
        author_name: author_id.to_uppercase(),
        text: text.into(),
        created_at_ms: 0,
    }
}

/// Everything the fake gateway serves and records.
#[derive(Default)]
pub struct GatewayState {
    pub comments: Vec<Comment>,
    pub gifts: Vec<Gift>,
    pub top_likers: Vec<TopLiker>,
    pub room: Vec<RoomMessage>,

    pub fail_comment_fetch: bool,
    pub fail_publish_for_text: Option<String>,

    pub comment_fetches: Vec<u64>,
    pub comment_reads: Vec<Vec<String>>,
    pub gift_reads: Vec<Vec<String>>,
    pub liker_windows: Vec<TopLikerWindow>,
    pub published: Vec<OutboundResponse>,
    pub room_posts: Vec<RoomPost>,
    pub animations: Vec<AnimationUpdate>,
    pub statuses: Vec<StatusUpdate>,
}

#[derive(Default)]
pub struct FakeGateway {
    pub state: Mutex<GatewayState>,
}

impl FakeGateway {
    pub fn with(f: impl FnOnce(&mut GatewayState)) -> Arc<Self> {
        let gw = Self::default();
        f(&mut gw.state.lock().unwrap());
        Arc::new(gw)
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, GatewayState> {
        self.state.lock().unwrap()
    }
}

fn boom(endpoint: &str) -> GatewayError {
    GatewayError::Status { endpoint: endpoint.into(), status: 500, message: "fake failure".into() }
}

#[async_trait]
impl DataGateway for FakeGateway {
    async fn fetch_unread_comments(&self, _agent_id: &str, since_ms: u64) -> Result<Vec<Comment>, GatewayError> {
        let mut st = self.state();
        st.comment_fetches.push(since_ms);
        if st.fail_comment_fetch {
            return Err(boom("/comments"));
        }
        Ok(st.comments.iter().filter(|c| !c.read).cloned().collect())
    }

    async fn mark_comments_read(&self, ids: &[String]) -> Result<u64, GatewayError> {
        let mut st = self.state();
        st.comment_reads.push(ids.to_vec());
        let mut n = 0;
        for c in st.comments.iter_mut().filter(|c| ids.contains(&c.id) && !c.read) {
            c.read = true;
            n += 1;
        }
        Ok(n)
    }

    async fn fetch_unread_gifts(&self, _agent_id: &str) -> Result<Vec<Gift>, GatewayError> {
        Ok(self.state().gifts.iter().filter(|g| !g.read).cloned().collect())
    }

    async fn mark_gifts_read(&self, _agent_id: &str, ids: &[String]) -> Result<u64, GatewayError> {
        let mut st = self.state();
        st.gift_reads.push(ids.to_vec());
        let mut n = 0;
        for g in st.gifts.iter_mut().filter(|g| ids.contains(&g.id) && !g.read) {
            g.read = true;
            n += 1;
        }
        Ok(n)
    }

    async fn fetch_top_likers(&self, _agent_id: &str, window: TopLikerWindow) -> Result<Vec<TopLiker>, GatewayError> {
        let mut st = self.state();
        st.liker_windows.push(window);
        Ok(st.top_likers.clone())
    }

    async fn fetch_room_messages(&self, _room_id: &str, limit: u32) -> Result<Vec<RoomMessage>, GatewayError> {
        let st = self.state();
        let skip = st.room.len().saturating_sub(limit as usize);
        Ok(st.room[skip..].to_vec())
    }

    async fn post_room_message(&self, _room_id: &str, post: &RoomPost) -> Result<(), GatewayError> {
        self.state().room_posts.push(post.clone());
        Ok(())
    }

    async fn publish_response(&self, record: OutboundResponse) -> Result<(), GatewayError> {
        let mut st = self.state();
        if st.fail_publish_for_text.as_deref().is_some_and(|t| record.text.contains(t)) {
            return Err(boom("/responses"));
        }
        st.published.push(record);
        Ok(())
    }

    async fn publish_animation(&self, update: &AnimationUpdate) -> Result<(), GatewayError> {
        self.state().animations.push(update.clone());
        Ok(())
    }

    async fn publish_status(&self, update: &StatusUpdate) -> Result<(), GatewayError> {
        self.state().statuses.push(update.clone());
        Ok(())
    }
}

/// Answers from a script, then with `fallback`.
pub struct FakeGeneration {
    script: Mutex<VecDeque<Result<String, GenerationError>>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
    latency: Mutex<Option<(Arc<ManualClock>, u64)>>,
}

impl Default for FakeGeneration {
    fn default() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: "sounds fun!".into(),
            prompts: Mutex::new(Vec::new()),
            latency: Mutex::new(None),
        }
    }
}

impl FakeGeneration {
    pub fn scripted<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let g = Self::default();
        g.script.lock().unwrap().extend(answers.into_iter().map(|a| Ok(a.into())));
        g
    }

    pub fn then_fail(self) -> Self {
        self.script.lock().unwrap().push_back(Err(GenerationError::Empty));
        self
    }

    /// Every completion moves `clock` forward by `ms`.
    pub fn advance_clock_per_call(&self, clock: Arc<ManualClock>, ms: u64) {
        *self.latency.lock().unwrap() = Some((clock, ms));
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationService for FakeGeneration {
    async fn complete(&self, context: &str, _size: SizeClass) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(context.to_string());
        if let Some((clock, ms)) = self.latency.lock().unwrap().as_ref() {
            clock.advance(*ms);
        }
        match self.script.lock().unwrap().pop_front() {
            Some(answer) => answer,
            None => Ok(self.fallback.clone()),
        }
    }
}

pub struct FakeSpeech {
    fail: bool,
    calls: AtomicUsize,
}

impl FakeSpeech {
    pub fn ok() -> Self {
        Self { fail: false, calls: AtomicUsize::new(0) }
    }

    pub fn failing() -> Self {
        Self { fail: true, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechService for FakeSpeech {
    async fn synthesize(&self, _text: &str) -> Result<String, SpeechError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(SpeechError::Status { status: 502, message: "tts down".into() })
        } else {
            Ok(format!("https://cdn.test/audio-{n}.mp3"))
        }
    }
}

/// A cohost wired to fakes, plus handles to inspect them.
pub struct Harness {
    pub gateway: Arc<FakeGateway>,
    pub generation: Arc<FakeGeneration>,
    pub speech: Arc<FakeSpeech>,
    pub clock: Arc<ManualClock>,
    pub kv: MemKv,
    pub cohost: Cohost<MemKv>,
}

impl Harness {
    pub fn new(gateway: Arc<FakeGateway>, generation: FakeGeneration, speech: FakeSpeech) -> Self {
        Self::with_config(Config::default(), gateway, generation, speech)
    }

    pub fn with_config(cfg: Config, gateway: Arc<FakeGateway>, generation: FakeGeneration, speech: FakeSpeech) -> Self {
        let generation = Arc::new(generation);
        let speech = Arc::new(speech);
        let clock = Arc::new(ManualClock::new(1_000));
        let kv = MemKv::new();
        let services = Services {
            gateway: gateway.clone(),
            generation: generation.clone(),
            speech: speech.clone(),
        };
        let cohost = Cohost::new(&cfg, services, kv.clone(), clock.clone()).with_rng_seed(7);
        Self { gateway, generation, speech, clock, kv, cohost }
    }
}
