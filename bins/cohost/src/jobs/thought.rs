use tracing::info;

use cohost_core::error::JobError;
use cohost_core::model::OutboundResponse;
use cohost_core::store::Kv;

use super::Cohost;

impl<K: Kv> Cohost<K> {
    pub(super) async fn share_thought(&mut self) -> Result<(), JobError> {
        let text = self.composer.thought().await?;
        let audio = self.composer.speak_or_silent(&text).await;
        let record = OutboundResponse::builder(&self.agent.id, text).thought().audio(audio).build();
        self.gateway.publish_response(record).await?;
        info!("shared a thought");
        Ok(())
    }
}
