//! Prompt assembly and result mapping for everything the agent says.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use cohost_core::cfg::AgentCfg;
use cohost_core::error::{GenerationError, SpeechError};
use cohost_core::memory::MemoryEntry;
use cohost_core::model::{Comment, Gift, RoomMessage, TopLiker, TopLikerWindow};

use crate::catalog::AnimationCatalog;
use crate::services::{GenerationService, SizeClass, SpeechService};

/// Text plus animation for a gift thank-you.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GiftThanks {
    pub text: String,
    pub animation: Option<String>,
}

#[derive(Deserialize)]
struct RawGiftThanks {
    text: String,
    #[serde(default)]
    animation: Option<String>,
}

pub struct Composer {
    agent: AgentCfg,
    catalog: AnimationCatalog,
    generation: Arc<dyn GenerationService>,
    speech: Arc<dyn SpeechService>,
}

impl Composer {
    pub fn new(
        agent: AgentCfg,
        catalog: AnimationCatalog,
        generation: Arc<dyn GenerationService>,
        speech: Arc<dyn SpeechService>,
    ) -> Self {
        Self { agent, catalog, generation, speech }
    }

    pub fn catalog(&self) -> &AnimationCatalog {
        &self.catalog
    }

    fn persona_header(&self) -> String {
        let mut s = format!(
            "You are {}, co-hosting a live stream. {}\n",
            self.agent.display_name, self.agent.persona
        );
        if !self.agent.lore.is_empty() {
            s.push_str("Background: ");
            s.push_str(&self.agent.lore);
            s.push('\n');
        }
        s
    }

    pub async fn reply_to_comment(&self, comment: &Comment, recent: &[MemoryEntry]) -> Result<String, GenerationError> {
        let mut ctx = self.persona_header();
        if !recent.is_empty() {
            ctx.push_str("Recent interactions:\n");
            for m in recent {
                ctx.push_str(&format!("- {}: {}\n", m.author, m.text));
            }
        }
        ctx.push_str(&format!(
            "Viewer {} says: \"{}\"\nReply to them in one or two short spoken sentences.",
            comment.author_name, comment.text
        ));
        self.generation.complete(&ctx, SizeClass::Medium).await
    }

    /// Structured thank-you: the service must answer `{"text": ..., "animation": ...}`.
    pub async fn gift_thanks(&self, gift: &Gift) -> Result<GiftThanks, GenerationError> {
        let ctx = format!(
            "{}{} just sent {} x{}.\nThank them warmly in one sentence and pick one animation from [{}].\n\
             Answer only with JSON: {{\"text\": \"...\", \"animation\": \"...\"}}",
            self.persona_header(),
            gift.sender_name,
            gift.gift_name,
            gift.amount,
            self.catalog.names().join(", "),
        );
        let raw = self.generation.complete(&ctx, SizeClass::Small).await?;
        let parsed = parse_gift_thanks(&raw)?;
        let animation = match parsed.animation.as_deref().map(|a| self.catalog.validate(a)) {
            Some(Ok(name)) => Some(name),
            Some(Err(e)) => {
                debug!("gift animation dropped: {}", e);
                None
            }
            None => None,
        };
        Ok(GiftThanks { text: parsed.text, animation })
    }

    pub async fn top_liker_thanks(&self, liker: &TopLiker, window: TopLikerWindow) -> Result<String, GenerationError> {
        let span = match window {
            TopLikerWindow::Recent => "lately",
            TopLikerWindow::AllTime => "since the stream began",
        };
        let ctx = format!(
            "{}{} is one of the top likers {} with {} likes. Give them a short, playful shout-out.",
            self.persona_header(),
            liker.display_name,
            span,
            liker.likes
        );
        self.generation.complete(&ctx, SizeClass::Small).await
    }

    pub async fn thought(&self) -> Result<String, GenerationError> {
        let ctx = format!(
            "{}Nobody has asked you anything. Share one short, in-character remark with the chat.",
            self.persona_header()
        );
        self.generation.complete(&ctx, SizeClass::Small).await
    }

    pub async fn peer_reply(&self, history: &[RoomMessage]) -> Result<String, GenerationError> {
        let mut ctx = self.persona_header();
        ctx.push_str("You are chatting with other co-hosts. Recent messages:\n");
        for m in history {
            ctx.push_str(&format!("{}: {}\n", m.author_name, m.text));
        }
        ctx.push_str("Write your next message, one or two sentences.");
        self.generation.complete(&ctx, SizeClass::Small).await
    }

    /// Raw animation choice; callers validate it against the catalog.
    pub async fn pick_animation(&self) -> Result<String, GenerationError> {
        let ctx = format!(
            "{}Choose the animation your avatar should play next. Options: {}.\nAnswer with the name only.",
            self.persona_header(),
            self.catalog.names().join(", ")
        );
        self.generation.complete(&ctx, SizeClass::Small).await
    }

    /// Animation reacting to `text`, or `None` if generation fails or goes off-catalog.
    pub async fn reactive_animation(&self, text: &str) -> Option<String> {
        let ctx = format!(
            "A viewer said: \"{}\". Which animation fits as a reaction? Options: {}.\nAnswer with the name only.",
            text,
            self.catalog.names().join(", ")
        );
        match self.generation.complete(&ctx, SizeClass::Small).await {
            Ok(raw) => self.catalog.validate(&raw).map_err(|e| debug!("reaction dropped: {}", e)).ok(),
            Err(e) => {
                debug!("reaction generation failed: {}", e);
                None
            }
        }
    }

    /// Synthesize `text`; any speech failure degrades to no audio.
    pub async fn speak_or_silent(&self, text: &str) -> Option<String> {
        match self.speech.synthesize(text).await {
            Ok(url) => Some(url),
            Err(SpeechError::Disabled) => None,
            Err(e) => {
                warn!("speech failed, publishing without audio: {}", e);
                None
            }
        }
    }
}

/// Accepts bare JSON or JSON wrapped in prose / code fences.
fn parse_gift_thanks(raw: &str) -> Result<RawGiftThanks, GenerationError> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let body = match (start, end) {
        (Some(s), Some(e)) if s < e => &raw[s..=e],
        _ => {
            return Err(GenerationError::Unparseable { what: "gift thank-you", reason: "no JSON object".into() })
        }
    };
    let parsed: RawGiftThanks = serde_json::from_str(body)
        .map_err(|e| GenerationError::Unparseable { what: "gift thank-you", reason: e.to_string() })?;
    if parsed.text.trim().is_empty() {
        return Err(GenerationError::Unparseable { what: "gift thank-you", reason: "empty text".into() });
    }
    Ok(parsed)
}
