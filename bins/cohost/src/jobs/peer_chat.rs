use tracing::{debug, info};

use cohost_core::error::JobError;
use cohost_core::model::RoomPost;
use cohost_core::store::Kv;

use super::Cohost;

impl<K: Kv> Cohost<K> {
    /// Answer the newest peer-room message unless it is ours or already handled.
    pub(super) async fn chat_with_peers(&mut self) -> Result<(), JobError> {
        if !self.agent.in_peer_chat {
            return Ok(());
        }
        let room = self.agent.room_id.clone();
        let history = self.gateway.fetch_room_messages(&room, self.peer_cfg.history_limit).await?;
        let Some(latest) = history.last() else {
            return Ok(());
        };
        if self.last_peer_message_id.as_deref() == Some(latest.id.as_str()) {
            debug!("peer room unchanged since id={}", latest.id);
            return Ok(());
        }
        if latest.author_id == self.agent.id {
            self.last_peer_message_id = Some(latest.id.clone());
            return Ok(());
        }

        let text = self.composer.peer_reply(&history).await?;
        let audio_url = self.composer.speak_or_silent(&text).await;
        let post = RoomPost {
            agent_id: self.agent.id.clone(),
            display_name: self.agent.display_name.clone(),
            text,
            audio_url,
        };
        self.gateway.post_room_message(&room, &post).await?;
        self.last_peer_message_id = Some(latest.id.clone());
        info!("replied in peer room={} to id={}", room, latest.id);
        Ok(())
    }
}
