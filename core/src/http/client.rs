use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, ClientBuilder, Proxy, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::{RawDeleteResponse, RawPage, Transport, RATE_LIMITED_CODE};
use crate::core::model::Item;
use crate::error::TransportError;

pub const DEFAULT_API_BASE: &str = "https://slack.com/api/";

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Vec<SlackMessage>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct SlackMessage {
    ts: String,
    // Bot and system messages carry no user.
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl From<SlackMessage> for Item {
    fn from(msg: SlackMessage) -> Self {
        Item {
            id: msg.ts,
            author_id: msg.user.unwrap_or_default(),
            content: msg.text,
        }
    }
}

impl From<HistoryResponse> for RawPage {
    fn from(resp: HistoryResponse) -> Self {
        let next_cursor = resp
            .response_metadata
            .and_then(|m| m.next_cursor)
            .filter(|c| !c.is_empty());
        RawPage {
            ok: resp.ok,
            items: resp.messages.into_iter().map(Item::from).collect(),
            has_more: resp.has_more,
            next_cursor,
            error: resp.error,
        }
    }
}

/// Slack Web API client scoped to one channel.
pub struct SlackClient {
    inner: Client,
    api_base: Url,
    channel: String,
    page_size: usize,
}

impl SlackClient {
    pub fn new(
        token: &str,
        channel: &str,
        api_base: &str,
        page_size: usize,
        timeout_seconds: u64,
        proxy_url: Option<&str>,
    ) -> Result<Self, TransportError> {
        let mut default_headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| TransportError(format!("invalid token: {}", e)))?;
        auth.set_sensitive(true);
        default_headers.insert(AUTHORIZATION, auth);

        let mut builder = ClientBuilder::new()
            .timeout(Duration::from_secs(timeout_seconds))
            .default_headers(default_headers);

        if let Some(proxy) = proxy_url {
            let p = Proxy::all(proxy).map_err(|e| TransportError(format!("invalid proxy: {}", e)))?;
            builder = builder.proxy(p);
        }

        let inner = builder.build()?;

        // Url::join drops the last path segment unless it ends with '/'.
        let base = if api_base.ends_with('/') {
            api_base.to_string()
        } else {
            format!("{}/", api_base)
        };
        let api_base = Url::parse(&base)
            .map_err(|e| TransportError(format!("invalid api base '{}': {}", api_base, e)))?;

        Ok(Self {
            inner,
            api_base,
            channel: channel.to_string(),
            page_size,
        })
    }

    fn endpoint(&self, method: &str) -> Result<Url, TransportError> {
        self.api_base
            .join(method)
            .map_err(|e| TransportError(format!("invalid endpoint '{}': {}", method, e)))
    }
}

#[async_trait]
impl Transport for SlackClient {
    async fn list_page(&self, cursor: Option<&str>) -> Result<RawPage, TransportError> {
        let url = self.endpoint("conversations.history")?;
        let limit = self.page_size.to_string();

        let mut query: Vec<(&str, &str)> = vec![("channel", self.channel.as_str()), ("limit", limit.as_str())];
        if let Some(c) = cursor {
            query.push(("cursor", c));
        }

        debug!("GET {} cursor={:?}", url, cursor);
        let response = self.inner.get(url).query(&query).send().await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Ok(RawPage {
                ok: false,
                error: Some(RATE_LIMITED_CODE.to_string()),
                ..RawPage::default()
            });
        }

        let body: HistoryResponse = response.json().await?;
        Ok(body.into())
    }

    async fn delete_item(&self, id: &str) -> Result<RawDeleteResponse, TransportError> {
        let url = self.endpoint("chat.delete")?;

        let response = self
            .inner
            .post(url)
            .json(&serde_json::json!({ "channel": self.channel, "ts": id }))
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Ok(RawDeleteResponse::rejected(RATE_LIMITED_CODE));
        }

        let body: DeleteResponse = response.json().await?;
        Ok(RawDeleteResponse {
            ok: body.ok,
            error_code: body.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SlackClient {
        SlackClient::new("xoxp-test", "C123", &server.uri(), 1000, 5, None).unwrap()
    }

    #[tokio::test]
    async fn test_list_page_maps_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.history"))
            .and(query_param("channel", "C123"))
            .and(query_param("limit", "1000"))
            .and(header("authorization", "Bearer xoxp-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "messages": [
                    { "type": "message", "user": "U1", "text": "hello", "ts": "1700000000.000100" },
                    { "type": "message", "subtype": "bot_message", "text": "beep", "ts": "1700000000.000200" }
                ],
                "has_more": true,
                "response_metadata": { "next_cursor": "bmV4dA==" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client_for(&server).list_page(None).await.unwrap();
        assert!(page.ok);
        assert!(page.has_more);
        assert_eq!(page.next_cursor.as_deref(), Some("bmV4dA=="));
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0], Item::new("1700000000.000100", "U1", "hello"));
        assert_eq!(page.items[1].author_id, "");
    }

    #[tokio::test]
    async fn test_list_page_sends_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.history"))
            .and(query_param("cursor", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "messages": [],
                "has_more": false,
                "response_metadata": { "next_cursor": "" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let page = client_for(&server).list_page(Some("abc")).await.unwrap();
        assert!(!page.has_more);
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn test_list_page_remote_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.history"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "error": "channel_not_found"
            })))
            .mount(&server)
            .await;

        let page = client_for(&server).list_page(None).await.unwrap();
        assert!(!page.ok);
        assert_eq!(page.error.as_deref(), Some("channel_not_found"));
    }

    #[tokio::test]
    async fn test_list_page_garbage_body_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.history"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        assert!(client_for(&server).list_page(None).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_item_ok() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.delete"))
            .and(body_json(serde_json::json!({ "channel": "C123", "ts": "1.2" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true, "channel": "C123", "ts": "1.2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = client_for(&server).delete_item("1.2").await.unwrap();
        assert_eq!(resp, RawDeleteResponse::deleted());
    }

    #[tokio::test]
    async fn test_delete_item_ratelimited_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.delete"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false, "error": "ratelimited"
            })))
            .mount(&server)
            .await;

        let resp = client_for(&server).delete_item("1.2").await.unwrap();
        assert!(resp.is_rate_limited());
    }

    #[tokio::test]
    async fn test_delete_item_http_429() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.delete"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
            .mount(&server)
            .await;

        let resp = client_for(&server).delete_item("1.2").await.unwrap();
        assert!(resp.is_rate_limited());
    }

    #[tokio::test]
    async fn test_delete_item_other_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.delete"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false, "error": "cant_delete_message"
            })))
            .mount(&server)
            .await;

        let resp = client_for(&server).delete_item("1.2").await.unwrap();
        assert!(!resp.ok);
        assert!(!resp.is_rate_limited());
        assert_eq!(resp.error_code.as_deref(), Some("cant_delete_message"));
    }

    #[test]
    fn test_api_base_without_trailing_slash() {
        let client = SlackClient::new("t", "C1", "http://localhost:9/api", 10, 1, None).unwrap();
        assert_eq!(
            client.endpoint("chat.delete").unwrap().as_str(),
            "http://localhost:9/api/chat.delete"
        );
    }

    #[test]
    fn test_invalid_api_base() {
        assert!(SlackClient::new("t", "C1", "not a url", 10, 1, None).is_err());
    }
}
