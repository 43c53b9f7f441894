use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use cohost_core::error::JobError;
use cohost_core::model::{OutboundResponse, TopLikerWindow};
use cohost_core::store::Kv;

use super::Cohost;

impl<K: Kv> Cohost<K> {
    /// Shout out one random supporter from a randomly chosen ranking window.
    pub(super) async fn thank_top_liker(&mut self) -> Result<(), JobError> {
        let window = if self.rng.gen_bool(0.5) { TopLikerWindow::Recent } else { TopLikerWindow::AllTime };
        let likers = self.gateway.fetch_top_likers(&self.agent.id, window).await?;
        let Some(liker) = likers.choose(&mut self.rng).cloned() else {
            debug!("no top likers for window={}", window.as_str());
            return Ok(());
        };

        let text = self.composer.top_liker_thanks(&liker, window).await?;
        let record = OutboundResponse::builder(&self.agent.id, text).for_top_liker(&liker).build();
        self.gateway.publish_response(record).await?;
        info!("thanked top liker user={} window={}", liker.user_id, window.as_str());
        Ok(())
    }
}
