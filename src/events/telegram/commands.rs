use anyhow::{Context, Result};
use reqwest::Url;

use super::TelegramProcessor;
use crate::clients::telegram::MessageSender;
use crate::storage::{Page, Storage, StorageError};

pub const RND_CMD: &str = "/rnd";
pub const HELP_CMD: &str = "/help";
pub const START_CMD: &str = "/start";

macro_rules! help_text {
    () => {
        "I can save and keep you pages. Also I can offer you them to read.

In order to save the page, just send me a link to it.

In order to get a random page from your list, send me command /rnd.
Caution! After that, this page will be removed from your list!"
    };
}

pub const MSG_HELP: &str = help_text!();
pub const MSG_HELLO: &str = concat!("Hi there! 👾\n\n", help_text!());

pub const MSG_UNKNOWN_COMMAND: &str = "Unknown command 🤔";
pub const MSG_NO_SAVED_PAGES: &str = "You have no saved pages 🙊";
pub const MSG_SAVED: &str = "Saved! 👌";
pub const MSG_ALREADY_EXISTS: &str = "You already have this page in your list 🤗";

impl<M: MessageSender, S: Storage> TelegramProcessor<M, S> {
    pub(super) async fn do_cmd(&self, text: &str, chat_id: i64, username: &str) -> Result<()> {
        let text = text.trim();

        tracing::info!(target: "commands", cmd = %text, user = %username, "got new command");

        if is_add_cmd(text) {
            return self.save_page(chat_id, text, username).await;
        }

        match text {
            RND_CMD => self.send_random(chat_id, username).await,
            HELP_CMD => self.send(chat_id, MSG_HELP).await,
            START_CMD => self.send(chat_id, MSG_HELLO).await,
            _ => self.send(chat_id, MSG_UNKNOWN_COMMAND).await,
        }
    }

    async fn save_page(&self, chat_id: i64, page_url: &str, username: &str) -> Result<()> {
        let page = Page::new(page_url, username);

        if self
            .storage
            .is_exists(&page, username)
            .await
            .context("can't do command: save page")?
        {
            return self.send(chat_id, MSG_ALREADY_EXISTS).await;
        }

        self.storage
            .save(&page)
            .await
            .context("can't do command: save page")?;

        self.send(chat_id, MSG_SAVED).await
    }

    async fn send_random(&self, chat_id: i64, username: &str) -> Result<()> {
        let page = match self.storage.pick_random(username).await {
            Ok(page) => page,
            Err(StorageError::NoSavedPages) => return self.send(chat_id, MSG_NO_SAVED_PAGES).await,
            Err(e) => return Err(e).context("can't do command: can't send random"),
        };

        self.send(chat_id, &page.url).await?;

        self.storage
            .remove(&page, username)
            .await
            .context("can't do command: can't send random")
    }

    async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        self.tg
            .send_message(chat_id, text)
            .await
            .context("can't send message")
    }
}

fn is_add_cmd(text: &str) -> bool {
    is_url(text)
}

fn is_url(text: &str) -> bool {
    Url::parse(text)
        .ok()
        .and_then(|u| u.host_str().map(|h| !h.is_empty()))
        .unwrap_or(false)
}
