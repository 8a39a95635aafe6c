pub mod client;

pub use client::SlackClient;

use async_trait::async_trait;

use crate::core::model::Item;
use crate::error::TransportError;

/// Error code the backend uses to signal a rate-limited delete.
pub const RATE_LIMITED_CODE: &str = "ratelimited";

/// Listing response as reported by the backend, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawPage {
    pub ok: bool,
    pub items: Vec<Item>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
    pub error: Option<String>,
}

/// Delete response as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawDeleteResponse {
    pub ok: bool,
    pub error_code: Option<String>,
}

impl RawDeleteResponse {
    pub fn deleted() -> Self {
        Self { ok: true, error_code: None }
    }

    pub fn rejected(code: impl Into<String>) -> Self {
        Self { ok: false, error_code: Some(code.into()) }
    }

    pub fn is_rate_limited(&self) -> bool {
        !self.ok && self.error_code.as_deref() == Some(RATE_LIMITED_CODE)
    }
}

/// The two remote calls the drain pipeline needs.
/// `SlackClient` talks to the Slack Web API; tests plug in in-memory fakes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn list_page(&self, cursor: Option<&str>) -> Result<RawPage, TransportError>;

    async fn delete_item(&self, id: &str) -> Result<RawDeleteResponse, TransportError>;
}
