//! Process wiring: providers, chat connection, dispatcher and the event loop.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use raincheck_core::Config;
use raincheck_weather::{LocationIqGeocoder, OpenWeatherProvider};
use tokio_util::sync::CancellationToken;

use crate::dispatcher;
use crate::handler::RequestHandler;
use crate::throttle::{Throttle, ThrottlePolicy};
use crate::transport::DggTransport;

/// Chat events buffered between the socket reader and the event loop
const EVENT_BUFFER: usize = 256;

/// Connect and answer requests until Ctrl-C or the chat connection drops.
///
/// Returns an error if the connection is lost.
pub async fn run(config: Config) -> Result<()> {
    let timeout = Duration::from_secs(config.providers.request_timeout_secs);
    let geocoder = Arc::new(
        LocationIqGeocoder::new(&config.providers.geo_api_key, timeout)
            .context("Failed to create geocoding client")?,
    );
    let weather = Arc::new(
        OpenWeatherProvider::new(&config.providers.weather_api_key, timeout)
            .context("Failed to create weather client")?,
    );

    tracing::info!("Trying to establish connection to {}", config.chat.address);
    let (transport, mut events) =
        DggTransport::connect(&config.chat.address, &config.chat.auth_token, EVENT_BUFFER)
            .await
            .context("Failed to connect to chat")?;
    tracing::info!("Connected as {}", config.chat.nick);

    let (replies, dispatcher) = dispatcher::channel(
        config.dispatch.queue_capacity,
        Duration::from_millis(config.dispatch.send_interval_ms),
        Arc::new(transport),
    );
    let cancel = CancellationToken::new();
    let dispatcher_task = tokio::spawn(dispatcher.run(cancel.clone()));

    let handler = Arc::new(RequestHandler::new(
        config.chat.nick.clone(),
        Throttle::new(ThrottlePolicy::from(&config.throttle)),
        geocoder,
        weather,
        replies,
    ));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let result = loop {
        tokio::select! {
            signal = &mut shutdown => {
                if let Err(e) = signal {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                }
                tracing::info!("Shutting down");
                break Ok(());
            }
            event = events.recv() => match event {
                Some(event) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        handler.on_event(event).await;
                    });
                }
                None => break Err(anyhow::anyhow!("Chat connection closed")),
            },
        }
    };

    cancel.cancel();
    if let Err(e) = dispatcher_task.await {
        tracing::error!("Reply dispatcher task failed: {}", e);
    }

    result
}
