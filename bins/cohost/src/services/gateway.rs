use std::time::Duration;

use async_trait::async_trait;
use anyhow::Context;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use cohost_core::cfg::GatewayCfg;
use cohost_core::error::GatewayError;
use cohost_core::model::{
    AnimationUpdate, Comment, Gift, OutboundResponse, RoomMessage, RoomPost, StatusUpdate,
    TopLiker, TopLikerWindow,
};

use super::DataGateway;

/// JSON-over-HTTP data gateway.
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

#[derive(Deserialize)]
struct CommentsEnvelope {
    comments: Vec<Comment>,
}

#[derive(Deserialize)]
struct GiftsEnvelope {
    gifts: Vec<Gift>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopLikersEnvelope {
    top_likers: Vec<TopLiker>,
}

#[derive(Deserialize)]
struct MessagesEnvelope {
    messages: Vec<RoomMessage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Modified {
    #[serde(default)]
    modified_count: u64,
}

impl HttpGateway {
    pub fn new(cfg: &GatewayCfg) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()?;
        let base_url = Url::parse(&cfg.base_url)
            .with_context(|| format!("gateway base_url {:?}", cfg.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("gateway base_url {:?} cannot take a path", cfg.base_url);
        }
        Ok(Self { client, base_url })
    }

    /// Base URL with `segments` appended, each percent-encoded as one path segment.
    fn url(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Transport {
                endpoint: label(segments),
                reason: "base url cannot take a path".to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<R: DeserializeOwned>(&self, segments: &[&str], query: &[(&str, String)]) -> Result<R, GatewayError> {
        let endpoint = &label(segments);
        debug!("gateway GET {}", endpoint);
        let resp = self
            .client
            .get(self.url(segments)?)
            .query(query)
            .send()
            .await
            .map_err(|e| transport(endpoint, e))?;
        decode(endpoint, check(endpoint, resp).await?).await
    }

    async fn post_json<B: Serialize + ?Sized>(&self, segments: &[&str], body: &B) -> Result<reqwest::Response, GatewayError> {
        let endpoint = &label(segments);
        debug!("gateway POST {}", endpoint);
        let resp = self
            .client
            .post(self.url(segments)?)
            .json(body)
            .send()
            .await
            .map_err(|e| transport(endpoint, e))?;
        check(endpoint, resp).await
    }
}

fn label(segments: &[&str]) -> String {
    format!("/{}", segments.join("/"))
}

fn transport(endpoint: &str, e: reqwest::Error) -> GatewayError {
    GatewayError::Transport { endpoint: endpoint.to_string(), reason: e.to_string() }
}

async fn check(endpoint: &str, resp: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(GatewayError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        message: if message.is_empty() { status.to_string() } else { message },
    })
}

async fn decode<R: DeserializeOwned>(endpoint: &str, resp: reqwest::Response) -> Result<R, GatewayError> {
    resp.json::<R>().await.map_err(|e| GatewayError::Decode {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl DataGateway for HttpGateway {
    async fn fetch_unread_comments(&self, agent_id: &str, since_ms: u64) -> Result<Vec<Comment>, GatewayError> {
        let env: CommentsEnvelope = self
            .get_json(&["comments"], &[("agentId", agent_id.to_string()), ("since", since_ms.to_string())])
            .await?;
        Ok(env.comments)
    }

    async fn mark_comments_read(&self, ids: &[String]) -> Result<u64, GatewayError> {
        let segments = ["comments", "read"];
        let resp = self.post_json(&segments, &json!({ "ids": ids })).await?;
        Ok(decode::<Modified>(&label(&segments), resp).await?.modified_count)
    }

    async fn fetch_unread_gifts(&self, agent_id: &str) -> Result<Vec<Gift>, GatewayError> {
        let env: GiftsEnvelope = self
            .get_json(&["gifts"], &[("agentId", agent_id.to_string()), ("unread", "true".to_string())])
            .await?;
        Ok(env.gifts)
    }

    async fn mark_gifts_read(&self, agent_id: &str, ids: &[String]) -> Result<u64, GatewayError> {
        let segments = ["gifts", "read"];
        let resp = self.post_json(&segments, &json!({ "agentId": agent_id, "ids": ids })).await?;
        Ok(decode::<Modified>(&label(&segments), resp).await?.modified_count)
    }

    async fn fetch_top_likers(&self, agent_id: &str, window: TopLikerWindow) -> Result<Vec<TopLiker>, GatewayError> {
        let env: TopLikersEnvelope = self
            .get_json(&["top-likers"], &[("agentId", agent_id.to_string()), ("window", window.as_str().to_string())])
            .await?;
        Ok(env.top_likers)
    }

    async fn fetch_room_messages(&self, room_id: &str, limit: u32) -> Result<Vec<RoomMessage>, GatewayError> {
        let env: MessagesEnvelope = self
            .get_json(&["rooms", room_id, "messages"], &[("limit", limit.to_string())])
            .await?;
        Ok(env.messages)
    }

    async fn post_room_message(&self, room_id: &str, post: &RoomPost) -> Result<(), GatewayError> {
        self.post_json(&["rooms", room_id, "messages"], post).await?;
        Ok(())
    }

    async fn publish_response(&self, record: OutboundResponse) -> Result<(), GatewayError> {
        self.post_json(&["responses"], &record).await?;
        Ok(())
    }

    async fn publish_animation(&self, update: &AnimationUpdate) -> Result<(), GatewayError> {
        self.post_json(&["animations"], update).await?;
        Ok(())
    }

    async fn publish_status(&self, update: &StatusUpdate) -> Result<(), GatewayError> {
        self.post_json(&["status"], update).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer) -> HttpGateway {
        HttpGateway::new(&GatewayCfg { base_url: format!("{}/api/", server.uri()), timeout_ms: 5_000 }).unwrap()
    }

    #[tokio::test]
    async fn fetches_comments_since_watermark() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/comments"))
            .and(query_param("agentId", "mika"))
            .and(query_param("since", "1700"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "comments": [{"id": "c1", "authorId": "u1", "authorName": "Rin", "text": "hi"}]
            })))
            .mount(&server)
            .await;

        let comments = gateway(&server).fetch_unread_comments("mika", 1700).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].author_name, "Rin");
    }

    #[tokio::test]
    async fn mark_read_reports_modified_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/gifts/read"))
            .and(body_json(serde_json::json!({"agentId": "mika", "ids": ["g1"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"modifiedCount": 1})))
            .mount(&server)
            .await;

        let n = gateway(&server).mark_gifts_read("mika", &["g1".to_string()]).await.unwrap();
        assert_eq!(n, 1);
    }

    #[tokio::test]
    async fn non_success_status_becomes_gateway_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/responses"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let rec = OutboundResponse::builder("mika", "hello").build();
        match gateway(&server).publish_response(rec).await {
            Err(GatewayError::Status { status, message, endpoint }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
                assert_eq!(endpoint, "/responses");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_envelope_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/gifts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"nope": []})))
            .mount(&server)
            .await;

        let err = gateway(&server).fetch_unread_gifts("mika").await.unwrap_err();
        assert!(matches!(err, GatewayError::Decode { .. }));
    }

    #[tokio::test]
    async fn room_id_is_escaped_as_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/rooms/lobby%2F2%3Fx%23y/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/rooms/lobby%2F2%3Fx%23y/messages"))
            .and(query_param("limit", "4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"messages": []})))
            .mount(&server)
            .await;

        let gw = gateway(&server);
        let post = RoomPost { agent_id: "mika".into(), display_name: "Mika".into(), text: "hi".into(), audio_url: None };
        gw.post_room_message("lobby/2?x#y", &post).await.unwrap();
        assert!(gw.fetch_room_messages("lobby/2?x#y", 4).await.unwrap().is_empty());
    }

    #[test]
    fn rejects_unparseable_base_url() {
        assert!(HttpGateway::new(&GatewayCfg { base_url: "not a url".into(), timeout_ms: 1 }).is_err());
    }
}
