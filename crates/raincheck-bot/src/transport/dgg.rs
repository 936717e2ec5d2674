//! Websocket transport for dgg-style chat servers.
//!
//! Every frame is `COMMAND <json>`. Inbound `MSG` and `PRIVMSG` frames become
//! [`ChatEvent`]s, `ERR` frames become [`ChatEvent::Error`], everything else
//! (joins, quits, names, pings) is ignored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::COOKIE;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{ChatEvent, ChatTransport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Deserialize)]
struct InboundMessage {
    nick: String,
    data: String,
    /// Milliseconds since the epoch
    #[serde(default)]
    timestamp: Option<i64>,
}

#[derive(Serialize)]
struct OutboundPublic<'a> {
    data: &'a str,
}

#[derive(Serialize)]
struct OutboundPrivate<'a> {
    nick: &'a str,
    data: &'a str,
}

pub struct DggTransport {
    sink: Mutex<SplitSink<WsStream, Message>>,
}

impl DggTransport {
    /// Connect and start a reader task.
    ///
    /// Chat events arrive on the returned receiver, which yields `None` once
    /// the connection is gone.
    pub async fn connect(
        address: &str,
        auth_token: &str,
        event_buffer: usize,
    ) -> Result<(Self, mpsc::Receiver<ChatEvent>), TransportError> {
        let mut request = address.into_client_request()?;
        let cookie = HeaderValue::from_str(&format!("jwt={}", auth_token))
            .map_err(|e| TransportError::InvalidToken(e.to_string()))?;
        request.headers_mut().insert(COOKIE, cookie);

        let (stream, response) = connect_async(request).await?;
        tracing::debug!("Chat handshake complete ({})", response.status());

        let (sink, stream) = stream.split();
        let (tx, rx) = mpsc::channel(event_buffer);
        tokio::spawn(read_events(stream, tx));

        Ok((
            Self {
                sink: Mutex::new(sink),
            },
            rx,
        ))
    }

    async fn send_frame(&self, frame: String) -> Result<(), TransportError> {
        self.sink.lock().await.send(Message::Text(frame)).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for DggTransport {
    async fn send_public(&self, text: &str) -> Result<(), TransportError> {
        self.send_frame(public_frame(text)?).await
    }

    async fn send_private(&self, recipient: &str, text: &str) -> Result<(), TransportError> {
        self.send_frame(private_frame(recipient, text)?).await
    }
}

async fn read_events(mut stream: SplitStream<WsStream>, tx: mpsc::Sender<ChatEvent>) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                let Some(event) = parse_frame(&text) else {
                    continue;
                };
                if tx.send(event).await.is_err() {
                    tracing::debug!("Chat event receiver dropped");
                    break;
                }
            }
            Ok(Message::Close(close)) => {
                tracing::warn!("Chat server closed the connection: {:?}", close);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("Chat connection error: {}", e);
                break;
            }
        }
    }
    tracing::info!("Chat reader stopped");
}

fn parse_frame(frame: &str) -> Option<ChatEvent> {
    let (command, payload) = frame.split_once(' ')?;
    match command {
        "MSG" | "PRIVMSG" => {
            let msg: InboundMessage = match serde_json::from_str(payload) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!("Malformed {} frame: {}", command, e);
                    return None;
                }
            };
            let timestamp = msg.timestamp.and_then(DateTime::<Utc>::from_timestamp_millis);
            Some(if command == "MSG" {
                ChatEvent::Public {
                    sender: msg.nick,
                    text: msg.data,
                    timestamp,
                }
            } else {
                ChatEvent::Private {
                    sender: msg.nick,
                    text: msg.data,
                    timestamp,
                }
            })
        }
        // ERR payloads are JSON strings such as "needlogin"
        "ERR" => Some(ChatEvent::Error(
            serde_json::from_str::<String>(payload).unwrap_or_else(|_| payload.to_string()),
        )),
        _ => None,
    }
}

fn public_frame(text: &str) -> Result<String, serde_json::Error> {
    Ok(format!("MSG {}", serde_json::to_string(&OutboundPublic { data: text })?))
}

fn private_frame(recipient: &str, text: &str) -> Result<String, serde_json::Error> {
    let body = OutboundPrivate {
        nick: recipient,
        data: text,
    };
    Ok(format!("PRIVMSG {}", serde_json::to_string(&body)?))
}
