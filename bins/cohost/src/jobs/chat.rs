use tracing::{info, warn};

use cohost_core::error::JobError;
use cohost_core::memory::MemoryEntry;
use cohost_core::model::{Comment, OutboundResponse};
use cohost_core::store::Kv;

use super::Cohost;
use crate::selector;

const REPLY_CONTEXT_MEMORIES: usize = 5;

impl<K: Kv> Cohost<K> {
    /// Fetch comments past the watermark, answer at most one, mark the batch read.
    pub(super) async fn read_chat(&mut self) -> Result<(), JobError> {
        let since = self.comment_watermark_ms;
        // Comments created while the reply is generated must stay ahead of the watermark.
        let fetched_at = self.clock.now_ms();
        match self.gateway.fetch_unread_comments(&self.agent.id, since).await {
            Ok(batch) => {
                let result = self.handle_comments(&batch).await;
                self.comment_watermark_ms = fetched_at;
                result
            }
            Err(e) => {
                if self.chat_cfg.advance_watermark_on_fetch_error {
                    warn!("comment fetch failed; comments between {} and {} will not be fetched again", since, fetched_at);
                    self.comment_watermark_ms = fetched_at;
                }
                Err(e.into())
            }
        }
    }

    async fn handle_comments(&mut self, batch: &[Comment]) -> Result<(), JobError> {
        if batch.is_empty() {
            return Ok(());
        }
        let replied = match selector::select(self.generation.as_ref(), batch).await {
            Ok(Some(chosen)) => self.reply(chosen).await,
            Ok(None) => Ok(()),
            Err(e) => Err(e.into()),
        };

        let mut ids: Vec<String> = batch.iter().map(|c| c.id.clone()).collect();
        ids.sort();
        ids.dedup();
        let marked = self.gateway.mark_comments_read(&ids).await;

        replied?;
        marked?;
        Ok(())
    }

    async fn reply(&mut self, comment: &Comment) -> Result<(), JobError> {
        self.memory.record(&MemoryEntry::from_comment(comment, self.clock.now_ms()))?;
        let recent = self.memory.recent(REPLY_CONTEXT_MEMORIES)?;

        let text = self.composer.reply_to_comment(comment, &recent).await?;
        let audio = self.composer.speak_or_silent(&text).await;
        let animation = self.composer.reactive_animation(&comment.text).await;

        let record = OutboundResponse::builder(&self.agent.id, text)
            .reply_to(comment)
            .audio(audio)
            .animation(animation)
            .build();
        self.gateway.publish_response(record).await?;
        info!("replied to comment id={} author={}", comment.id, comment.author_name);
        Ok(())
    }
}
