//! Outbound reply queue.
//!
//! Any number of [`ReplyQueue`] handles feed one [`Dispatcher`], which owns the
//! transport and sends replies one at a time, in order, with a fixed pause
//! after every send.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::transport::ChatTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// A reply waiting to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    pub visibility: Visibility,
    /// Nick of the requester; only used for private replies
    pub recipient: String,
}

impl OutboundMessage {
    pub fn public(text: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            visibility: Visibility::Public,
            recipient: recipient.into(),
        }
    }

    pub fn private(text: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            visibility: Visibility::Private,
            recipient: recipient.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Reply dispatcher has stopped")]
    Closed,
}

/// Producer handle. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ReplyQueue {
    tx: mpsc::Sender<OutboundMessage>,
}

impl ReplyQueue {
    /// Queue a reply, waiting for room when the queue is full.
    pub async fn enqueue(&self, msg: OutboundMessage) -> Result<(), DispatchError> {
        self.tx.send(msg).await.map_err(|_| DispatchError::Closed)
    }
}

/// Single consumer of the reply queue
pub struct Dispatcher<T: ?Sized> {
    rx: mpsc::Receiver<OutboundMessage>,
    transport: Arc<T>,
    send_interval: Duration,
    last_public: String,
}

/// Create a bounded reply queue and the dispatcher that drains it.
///
/// `capacity` must be greater than zero.
pub fn channel<T: ChatTransport + ?Sized>(
    capacity: usize,
    send_interval: Duration,
    transport: Arc<T>,
) -> (ReplyQueue, Dispatcher<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    let dispatcher = Dispatcher {
        rx,
        transport,
        send_interval,
        last_public: String::new(),
    };
    (ReplyQueue { tx }, dispatcher)
}

impl<T: ChatTransport + ?Sized> Dispatcher<T> {
    /// Send queued replies until every [`ReplyQueue`] is dropped or `cancel`
    /// fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!("Reply dispatcher started");

        loop {
            let msg = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                msg = self.rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };

            self.dispatch(msg).await;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.send_interval) => {}
            }
        }

        tracing::info!("Reply dispatcher stopped");
    }

    async fn dispatch(&mut self, msg: OutboundMessage) {
        match msg.visibility {
            Visibility::Private => {
                if let Err(e) = self.transport.send_private(&msg.recipient, &msg.text).await {
                    tracing::error!("Could not send private message to {}: {}", msg.recipient, e);
                }
            }
            Visibility::Public => {
                let text = self.dedupe(msg.text);
                if let Err(e) = self.transport.send_public(&text).await {
                    tracing::error!("Could not send message: {}", e);
                }
            }
        }
    }

    /// The chat server drops a message identical to the previous one, so a
    /// repeat gets a trailing dot. The sent text becomes the new baseline.
    fn dedupe(&mut self, mut text: String) -> String {
        if text == self.last_public {
            text.push('.');
        }
        self.last_public.clone_from(&text);
        text
    }
}
