//! Telegram adapters: [`TelegramSource`] turns `getUpdates` into events and
//! owns the offset; [`TelegramProcessor`] runs chat commands against storage.

mod commands;

use async_trait::async_trait;
use metrics::gauge;

use crate::clients::telegram::{MessageSender, Update, UpdatesApi};
use crate::events::{Event, EventError, Fetcher, Kind, MessageMeta, Processor};
use crate::storage::Storage;

pub use commands::{
    HELP_CMD, MSG_ALREADY_EXISTS, MSG_HELP, MSG_HELLO, MSG_NO_SAVED_PAGES, MSG_SAVED,
    MSG_UNKNOWN_COMMAND, RND_CMD, START_CMD,
};

pub struct TelegramSource<A> {
    api: A,
    offset: i64,
}

impl<A: UpdatesApi> TelegramSource<A> {
    pub fn new(api: A) -> Self {
        Self::with_offset(api, 0)
    }

    pub fn with_offset(api: A, offset: i64) -> Self {
        Self { api, offset }
    }

    /// Id of the next update this source will ask for.
    pub fn offset(&self) -> i64 {
        self.offset
    }
}

#[async_trait]
impl<A: UpdatesApi> Fetcher for TelegramSource<A> {
    async fn fetch(&mut self, limit: usize) -> Result<Vec<Event>, EventError> {
        let updates = self
            .api
            .updates(self.offset, limit)
            .await
            .map_err(|source| EventError::Fetch {
                context: "can't get events",
                source,
            })?;

        let Some(max_id) = updates.iter().map(|u| u.id).max() else {
            return Ok(Vec::new());
        };

        let events = updates.into_iter().map(event).collect();
        self.offset = self.offset.max(max_id.saturating_add(1));
        gauge!("consumer_offset").set(self.offset as f64);

        Ok(events)
    }
}

fn event(update: Update) -> Event {
    match update.message {
        Some(msg) => Event::message(
            msg.text.unwrap_or_default(),
            MessageMeta {
                chat_id: msg.chat.id,
                username: msg.from.and_then(|u| u.username).unwrap_or_default(),
            },
        ),
        None => Event::unknown(),
    }
}

pub struct TelegramProcessor<M, S> {
    tg: M,
    storage: S,
}

impl<M: MessageSender, S: Storage> TelegramProcessor<M, S> {
    pub fn new(tg: M, storage: S) -> Self {
        Self { tg, storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    async fn process_message(&self, event: &Event) -> Result<(), EventError> {
        let meta = event.message_meta()?;
        self.do_cmd(&event.text, meta.chat_id, &meta.username)
            .await
            .map_err(|source| EventError::Handler {
                context: "can't process message",
                source,
            })
    }
}

#[async_trait]
impl<M: MessageSender, S: Storage> Processor for TelegramProcessor<M, S> {
    async fn process(&self, event: &Event) -> Result<(), EventError> {
        match event.kind {
            Kind::Message => self.process_message(event).await,
            other => Err(EventError::UnsupportedKind(other)),
        }
    }
}
