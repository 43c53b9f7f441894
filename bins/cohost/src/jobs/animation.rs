use tracing::{info, warn};

use cohost_core::error::JobError;
use cohost_core::model::AnimationUpdate;
use cohost_core::store::Kv;

use super::Cohost;

impl<K: Kv> Cohost<K> {
    /// Ask for an idle animation; off-catalog answers are dropped, not replaced.
    pub(super) async fn cycle_animation(&mut self) -> Result<(), JobError> {
        let raw = self.composer.pick_animation().await?;
        let animation = match self.composer.catalog().validate(&raw) {
            Ok(name) => name,
            Err(e) => {
                warn!("{}; skipping animation update", e);
                return Ok(());
            }
        };
        let update = AnimationUpdate { agent_id: self.agent.id.clone(), animation };
        self.gateway.publish_animation(&update).await?;
        info!("animation set to {}", update.animation);
        Ok(())
    }
}
