use rand::Rng;
use tracing::{info, warn};

use cohost_core::error::JobError;
use cohost_core::memory::MemoryEntry;
use cohost_core::model::{Gift, OutboundResponse};
use cohost_core::store::Kv;

use super::Cohost;

const SPEAK_PROBABILITY: f64 = 0.5;

/// The special gift always gets a voice; everything else follows the coin.
pub(crate) fn wants_speech(gift: &Gift, special_gift: &str, coin: bool) -> bool {
    coin || gift.gift_name.eq_ignore_ascii_case(special_gift)
}

impl<K: Kv> Cohost<K> {
    /// Thank every unread gift, one after another.
    pub(super) async fn read_gifts(&mut self) -> Result<(), JobError> {
        let gifts = self.gateway.fetch_unread_gifts(&self.agent.id).await?;
        let total = gifts.len();
        let mut failed = 0;
        for gift in &gifts {
            if let Err(e) = self.thank_for_gift(gift).await {
                failed += 1;
                warn!("gift thank-you failed id={} gift={} err={}", gift.id, gift.gift_name, e);
            }
        }
        if failed > 0 {
            return Err(JobError::Partial { failed, total });
        }
        Ok(())
    }

    async fn thank_for_gift(&mut self, gift: &Gift) -> Result<(), JobError> {
        self.memory.record(&MemoryEntry::from_gift(gift, self.clock.now_ms()))?;

        let thanks = self.composer.gift_thanks(gift).await?;
        let coin = self.rng.gen_bool(SPEAK_PROBABILITY);
        let audio = if wants_speech(gift, &self.agent.special_gift, coin) {
            self.composer.speak_or_silent(&thanks.text).await
        } else {
            None
        };

        let record = OutboundResponse::builder(&self.agent.id, thanks.text)
            .for_gift(gift)
            .animation(thanks.animation)
            .audio(audio)
            .build();
        self.gateway.publish_response(record).await?;
        self.gateway.mark_gifts_read(&self.agent.id, std::slice::from_ref(&gift.id)).await?;
        info!("thanked gift id={} from={}", gift.id, gift.sender_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohost_core::job::JobKind;
    use cohost_core::memory::{AgentMemory, MemoryKind};

    use crate::scheduler::JobRunner;
    use crate::testkit::{gift, FakeGateway, FakeGeneration, FakeSpeech, Harness};

    fn thanks(text: &str) -> String {
        format!(r#"{{"text": "{text}", "animation": "bow"}}"#)
    }

    #[test]
    fn special_gift_overrides_the_coin() {
        assert!(wants_speech(&gift("g1", "Rocket"), "rocket", false));
        assert!(!wants_speech(&gift("g1", "rose"), "rocket", false));
        assert!(wants_speech(&gift("g1", "rose"), "rocket", true));
    }

    #[tokio::test]
    async fn special_gifts_are_always_spoken() {
        let gw = FakeGateway::with(|s| s.gifts = (0..12).map(|i| gift(&format!("g{i}"), "rocket")).collect());
        let gen = FakeGeneration::scripted((0..12).map(|i| thanks(&format!("thanks #{i}"))));
        let mut h = Harness::new(gw, gen, FakeSpeech::ok());

        h.cohost.run(JobKind::Gifts).await.unwrap();

        assert_eq!(h.speech.calls(), 12);
        let st = h.gateway.state();
        assert_eq!(st.published.len(), 12);
        assert!(st.published.iter().all(|r| r.audio_url.is_some() && r.is_gift_response));
    }

    #[tokio::test]
    async fn ordinary_gifts_are_spoken_on_a_coin_flip() {
        let gw = FakeGateway::with(|s| s.gifts = (0..20).map(|i| gift(&format!("g{i}"), "rose")).collect());
        let gen = FakeGeneration::scripted((0..20).map(|i| thanks(&format!("thanks #{i}"))));
        let mut h = Harness::new(gw, gen, FakeSpeech::ok());

        h.cohost.run(JobKind::Gifts).await.unwrap();

        let spoken = h.speech.calls();
        assert!(spoken > 0 && spoken < 20, "spoken={spoken}");
        let st = h.gateway.state();
        assert_eq!(st.published.len(), 20);
        let mut urls: Vec<String> = st.published.iter().filter_map(|r| r.audio_url.clone()).collect();
        urls.sort();
        let mut expected: Vec<String> = (0..spoken).map(|n| format!("https://cdn.test/audio-{n}.mp3")).collect();
        expected.sort();
        assert_eq!(urls, expected);
    }

    #[tokio::test]
    async fn each_gift_is_published_then_marked_read_individually() {
        let gw = FakeGateway::with(|s| s.gifts = vec![gift("g1", "rose"), gift("g2", "heart")]);
        let gen = FakeGeneration::scripted([thanks("ty rose"), thanks("ty heart")]);
        let mut h = Harness::new(gw, gen, FakeSpeech::ok());

        h.cohost.run(JobKind::Gifts).await.unwrap();

        let st = h.gateway.state();
        assert_eq!(st.gift_reads, vec![vec!["g1".to_string()], vec!["g2".to_string()]]);
        assert_eq!(st.published[0].gift_id.as_deref(), Some("g1"));
        assert_eq!(st.published[0].animation.as_deref(), Some("bow"));
        assert!(st.gifts.iter().all(|g| g.read));

        let memory = AgentMemory::new(h.kv.clone(), "cohost");
        assert!(memory.recall(MemoryKind::Gift, "g2").unwrap().is_some());
    }

    #[tokio::test]
    async fn one_bad_gift_does_not_block_the_rest() {
        let gw = FakeGateway::with(|s| {
            s.gifts = vec![gift("g1", "rose"), gift("g2", "heart")];
            s.fail_publish_for_text = Some("ty rose".into());
        });
        let gen = FakeGeneration::scripted([thanks("ty rose"), thanks("ty heart")]);
        let mut h = Harness::new(gw, gen, FakeSpeech::ok());

        let err = h.cohost.run(JobKind::Gifts).await.unwrap_err();
        assert!(matches!(err, JobError::Partial { failed: 1, total: 2 }));

        let st = h.gateway.state();
        assert_eq!(st.gift_reads, vec![vec!["g2".to_string()]]);
        assert!(!st.gifts[0].read);
    }

    #[tokio::test]
    async fn unparseable_thanks_skips_publish_for_that_gift() {
        let gw = FakeGateway::with(|s| s.gifts = vec![gift("g1", "rose")]);
        let mut h = Harness::new(gw, FakeGeneration::scripted(["thank you!!"]), FakeSpeech::ok());

        assert!(h.cohost.run(JobKind::Gifts).await.is_err());
        let st = h.gateway.state();
        assert!(st.published.is_empty());
        assert!(st.gift_reads.is_empty());
    }
}
