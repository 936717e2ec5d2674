//! Chat transport boundary.

pub mod dgg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use dgg::DggTransport;

/// Something that happened in chat
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Public {
        sender: String,
        text: String,
        timestamp: Option<DateTime<Utc>>,
    },
    Private {
        sender: String,
        text: String,
        timestamp: Option<DateTime<Utc>>,
    },
    /// Error reported by the chat server
    Error(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Websocket error: {0}")]
    Websocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Invalid auth token: {0}")]
    InvalidToken(String),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Connection closed")]
    Closed,
}

/// Outbound half of a chat connection
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_public(&self, text: &str) -> Result<(), TransportError>;

    async fn send_private(&self, recipient: &str, text: &str) -> Result<(), TransportError>;
}
