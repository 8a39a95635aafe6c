//! In-memory `Transport` and sink fakes shared by the unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::time::Instant;

use crate::core::model::{Item, OutcomeEvent};
use crate::error::TransportError;
use crate::http::{RawDeleteResponse, RawPage, Transport};
use crate::SweepEventSink;

pub fn page(items: Vec<Item>, has_more: bool, next_cursor: Option<&str>) -> RawPage {
    RawPage {
        ok: true,
        items,
        has_more,
        next_cursor: next_cursor.map(str::to_string),
        error: None,
    }
}

/// Replays scripted list responses in order and answers deletes from a
/// per-id script (defaulting to success). Records every call.
#[derive(Default)]
pub struct FakeTransport {
    pages: Mutex<VecDeque<Result<RawPage, TransportError>>>,
    deletes: Mutex<HashMap<String, VecDeque<Result<RawDeleteResponse, TransportError>>>>,
    pub list_calls: Mutex<Vec<Option<String>>>,
    pub delete_calls: Mutex<Vec<(String, Instant)>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, page: RawPage) -> Self {
        self.pages.lock().unwrap().push_back(Ok(page));
        self
    }

    pub fn with_list_error(self, message: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .push_back(Err(TransportError(message.to_string())));
        self
    }

    pub fn with_delete(self, id: &str, response: Result<RawDeleteResponse, TransportError>) -> Self {
        self.deletes
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn listed_cursors(&self) -> Vec<Option<String>> {
        self.list_calls.lock().unwrap().clone()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .delete_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn delete_time(&self, id: &str) -> Option<Instant> {
        self.delete_calls
            .lock()
            .unwrap()
            .iter()
            .find(|(called, _)| called == id)
            .map(|(_, at)| *at)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn list_page(&self, cursor: Option<&str>) -> Result<RawPage, TransportError> {
        self.list_calls.lock().unwrap().push(cursor.map(str::to_string));
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("no scripted page left".to_string())))
    }

    async fn delete_item(&self, id: &str) -> Result<RawDeleteResponse, TransportError> {
        self.delete_calls
            .lock()
            .unwrap()
            .push((id.to_string(), Instant::now()));
        self.deletes
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(|script| script.pop_front())
            .unwrap_or_else(|| Ok(RawDeleteResponse::deleted()))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub logs: Mutex<Vec<(String, String)>>,
    pub outcomes: Mutex<Vec<OutcomeEvent>>,
    pub pages: Mutex<Vec<(usize, usize)>>,
}

impl SweepEventSink for RecordingSink {
    fn on_log(&self, level: &str, message: &str) {
        self.logs
            .lock()
            .unwrap()
            .push((level.to_string(), message.to_string()));
    }

    fn on_outcome(&self, event: &OutcomeEvent) {
        self.outcomes.lock().unwrap().push(event.clone());
    }

    fn on_page(&self, index: usize, matched: usize) {
        self.pages.lock().unwrap().push((index, matched));
    }
}
