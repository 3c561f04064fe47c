// tests/common/mod.rs
// Shared fakes for the Telegram seams.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aviser_bot::clients::telegram::{Chat, IncomingMessage, MessageSender, Update, UpdatesApi, User};
use parking_lot::Mutex;
use std::sync::Arc;

/// Serves updates with `id >= offset`, like `getUpdates` does.
#[derive(Clone, Default)]
pub struct FakeUpdates {
    pub pending: Arc<Mutex<Vec<Update>>>,
    pub calls: Arc<Mutex<Vec<(i64, usize)>>>,
    pub fail: Arc<Mutex<bool>>,
}

impl FakeUpdates {
    pub fn with(updates: Vec<Update>) -> Self {
        let f = Self::default();
        *f.pending.lock() = updates;
        f
    }

    pub fn push(&self, u: Update) {
        self.pending.lock().push(u);
    }

    pub fn set_failing(&self, on: bool) {
        *self.fail.lock() = on;
    }
}

#[async_trait]
impl UpdatesApi for FakeUpdates {
    async fn updates(&self, offset: i64, limit: usize) -> Result<Vec<Update>> {
        self.calls.lock().push((offset, limit));
        if *self.fail.lock() {
            return Err(anyhow!("connection reset"));
        }
        Ok(self
            .pending
            .lock()
            .iter()
            .filter(|u| u.id >= offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct FakeSender {
    pub sent: Arc<Mutex<Vec<(i64, String)>>>,
}

impl FakeSender {
    pub fn texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl MessageSender for FakeSender {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        self.sent.lock().push((chat_id, text.to_string()));
        Ok(())
    }
}

pub fn message(id: i64, text: &str, username: &str) -> Update {
    Update {
        id,
        message: Some(IncomingMessage {
            text: Some(text.to_string()),
            from: Some(User {
                username: Some(username.to_string()),
            }),
            chat: Chat { id: 1000 },
        }),
    }
}

pub fn bare(id: i64) -> Update {
    Update { id, message: None }
}
