//! Normalized events and the two seams of the consumer loop:
//! a [`Fetcher`] that produces them and a [`Processor`] that handles them.

pub mod telegram;

use async_trait::async_trait;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Kind {
    Unknown,
    Message,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Unknown => f.write_str("unknown"),
            Kind::Message => f.write_str("message"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMeta {
    pub chat_id: i64,
    pub username: String,
}

/// Kind-specific context, tagged by variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Meta {
    None,
    Message(MessageMeta),
}

impl Meta {
    fn kind(&self) -> Kind {
        match self {
            Meta::None => Kind::Unknown,
            Meta::Message(_) => Kind::Message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: Kind,
    pub text: String,
    pub meta: Meta,
}

impl Event {
    pub fn unknown() -> Self {
        Self {
            kind: Kind::Unknown,
            text: String::new(),
            meta: Meta::None,
        }
    }

    pub fn message(text: impl Into<String>, meta: MessageMeta) -> Self {
        Self {
            kind: Kind::Message,
            text: text.into(),
            meta: Meta::Message(meta),
        }
    }

    /// Message metadata, or `MetadataType` if this event carries something else.
    pub fn message_meta(&self) -> Result<&MessageMeta, EventError> {
        match &self.meta {
            Meta::Message(m) => Ok(m),
            other => Err(EventError::MetadataType {
                expected: Kind::Message,
                found: other.kind(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("{context}: {source:#}")]
    Fetch {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("can't process event: unsupported kind {0}")]
    UnsupportedKind(Kind),
    #[error("unexpected metadata: expected {expected}, found {found}")]
    MetadataType { expected: Kind, found: Kind },
    #[error("{context}: {source:#}")]
    Handler {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Pulls the next batch of events. Implementors own their cursor.
#[async_trait]
pub trait Fetcher: Send {
    /// Up to `limit` new events; an empty batch means nothing is pending.
    async fn fetch(&mut self, limit: usize) -> Result<Vec<Event>, EventError>;
}

#[async_trait]
pub trait Processor: Send + Sync {
    async fn process(&self, event: &Event) -> Result<(), EventError>;
}
