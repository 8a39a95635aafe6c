use std::sync::Arc;

use log::debug;

use crate::core::model::Page;
use crate::error::{Result, SweepError};
use crate::http::Transport;

/// Wraps the listing call and turns a backend refusal into a `Remote` error.
/// No retries here; the drain loop treats any failure as fatal.
pub struct PageFetcher {
    transport: Arc<dyn Transport>,
}

impl PageFetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn fetch(&self, cursor: Option<&str>) -> Result<Page> {
        let raw = self.transport.list_page(cursor).await?;

        if !raw.ok {
            let reason = raw.error.unwrap_or_else(|| "listing refused".to_string());
            return Err(SweepError::Remote(reason));
        }

        debug!(
            "Fetched {} item(s), has_more={}, next_cursor={:?}",
            raw.items.len(),
            raw.has_more,
            raw.next_cursor
        );

        Ok(Page {
            items: raw.items,
            has_more: raw.has_more,
            next_cursor: raw.next_cursor.filter(|c| !c.is_empty()),
        })
    }
}
