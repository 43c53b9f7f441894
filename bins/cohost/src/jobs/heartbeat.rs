use cohost_core::error::JobError;
use cohost_core::model::StatusUpdate;
use cohost_core::store::{ns, Kv, KvSerde};
use tracing::{info, warn};

use super::Cohost;

impl<K: Kv> Cohost<K> {
    /// Publish liveness. A store failure only costs the persisted count.
    pub(super) async fn heartbeat(&mut self) -> Result<(), JobError> {
        let key = ns("heartbeat", "count");
        let last = match self.kv.get_t::<u64>(&key) {
            Ok(stored) => stored.unwrap_or(0).max(self.beats),
            Err(e) => {
                warn!("heartbeat count unreadable, using in-memory count: {:#}", e);
                self.beats
            }
        };
        let count = last + 1;
        self.beats = count;
        if let Err(e) = self.kv.put_t(&key, &count) {
            warn!("heartbeat count not persisted: {:#}", e);
        }

        let now = self.clock.now_ms();
        let update = StatusUpdate {
            agent_id: self.agent.id.clone(),
            status: "alive".to_string(),
            beat: count,
            uptime_ms: now.saturating_sub(self.started_ms),
            at_ms: now,
        };
        self.gateway.publish_status(&update).await?;
        info!("heartbeat tick {}", count);
        Ok(())
    }
}
