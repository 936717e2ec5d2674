//! Turns chat requests into rain forecasts.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use raincheck_weather::{condense, render, render_hourly, Geocoder, WeatherSource};

use crate::dispatcher::{OutboundMessage, ReplyQueue};
use crate::throttle::{Admission, Throttle};
use crate::transport::ChatEvent;

/// What happened to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    Throttled(Admission),
    GeocodeFailed,
    WeatherFailed,
    /// Neither minute nor hourly data; nothing is sent
    NoData,
    Replied,
    DispatcherClosed,
}

pub struct RequestHandler<G: ?Sized, W: ?Sized> {
    nick: String,
    throttle: Mutex<Throttle>,
    geocoder: Arc<G>,
    weather: Arc<W>,
    replies: ReplyQueue,
}

impl<G, W> RequestHandler<G, W>
where
    G: Geocoder + ?Sized,
    W: WeatherSource + ?Sized,
{
    pub fn new(
        nick: impl Into<String>,
        throttle: Throttle,
        geocoder: Arc<G>,
        weather: Arc<W>,
        replies: ReplyQueue,
    ) -> Self {
        Self {
            nick: nick.into(),
            throttle: Mutex::new(throttle),
            geocoder,
            weather,
            replies,
        }
    }

    /// Public messages are only requests when they start with the bot's nick
    pub fn is_addressed(&self, text: &str) -> bool {
        text.trim().starts_with(&self.nick)
    }

    /// The location phrase: the message with every mention of the nick removed
    pub fn search_text(&self, text: &str) -> String {
        text.replace(&self.nick, "").trim().to_string()
    }

    /// Route a chat event. Returns `None` for events that are not requests.
    pub async fn on_event(&self, event: ChatEvent) -> Option<HandleOutcome> {
        match event {
            ChatEvent::Public { sender, text, .. } => {
                if !self.is_addressed(&text) {
                    return None;
                }
                Some(self.handle(&sender, &text, false).await)
            }
            ChatEvent::Private { sender, text, .. } => Some(self.handle(&sender, &text, true).await),
            ChatEvent::Error(e) => {
                tracing::error!("Chat error: {}", e);
                None
            }
        }
    }

    pub async fn handle(&self, sender: &str, text: &str, private: bool) -> HandleOutcome {
        let admission = self.throttle.lock().admit(Instant::now(), sender, private);
        match admission {
            Admission::Admitted => {}
            Admission::GlobalCooldown { elapsed } => {
                tracing::info!("Throttled, last request {:?} ago", elapsed);
                return HandleOutcome::Throttled(admission);
            }
            Admission::SenderCooldown { elapsed } => {
                tracing::info!("User {} throttled, last request {:?} ago", sender, elapsed);
                return HandleOutcome::Throttled(admission);
            }
        }

        let search = self.search_text(text);
        tracing::info!(
            "Received {} request from [{}]: {:?}",
            if private { "private" } else { "public" },
            sender,
            search
        );

        let place = match self.geocoder.geocode(&search).await {
            Ok(place) => place,
            Err(e) => {
                tracing::warn!("Geocoding {:?} failed: {}", search, e);
                return HandleOutcome::GeocodeFailed;
            }
        };

        let forecast = match self.weather.forecast(&place).await {
            Ok(forecast) => forecast,
            Err(e) => {
                tracing::warn!("Weather lookup for {} failed: {}", place.name, e);
                return HandleOutcome::WeatherFailed;
            }
        };

        let reply = if !forecast.minutely.is_empty() {
            render(&condense(&forecast.minutely), &place.name)
        } else if let Some(rain) = forecast.hourly_rain_1h {
            tracing::debug!("No minute data for {}, using hourly", place.name);
            render_hourly(rain, &place.name)
        } else {
            tracing::debug!("No precipitation data for {}", place.name);
            return HandleOutcome::NoData;
        };

        let msg = if private {
            OutboundMessage::private(reply, sender)
        } else {
            OutboundMessage::public(reply, sender)
        };

        match self.replies.enqueue(msg).await {
            Ok(()) => HandleOutcome::Replied,
            Err(e) => {
                tracing::warn!("Dropping reply to {}: {}", sender, e);
                HandleOutcome::DispatcherClosed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use raincheck_weather::{Forecast, Sample};
    use tokio_util::sync::CancellationToken;

    use crate::dispatcher::{self, Dispatcher};
    use crate::testing::{FakeGeocoder, FakeWeather, RecordingTransport, Sent};
    use crate::throttle::ThrottlePolicy;

    const NICK: &str = "RainBot";

    struct Harness {
        handler: RequestHandler<FakeGeocoder, FakeWeather>,
        dispatcher: Dispatcher<RecordingTransport>,
        transport: Arc<RecordingTransport>,
        geocoder: Arc<FakeGeocoder>,
        weather: Arc<FakeWeather>,
    }

    impl Harness {
        fn new(weather: FakeWeather) -> Self {
            Self::with_policy(weather, ThrottlePolicy::default())
        }

        fn with_policy(weather: FakeWeather, policy: ThrottlePolicy) -> Self {
            let transport = Arc::new(RecordingTransport::default());
            let geocoder = Arc::new(FakeGeocoder::default().with_place("berlin", "Berlin, Germany"));
            let weather = Arc::new(weather);
            let (queue, dispatcher) =
                dispatcher::channel(100, Duration::from_millis(450), transport.clone());
            let handler = RequestHandler::new(
                NICK,
                Throttle::new(policy),
                geocoder.clone(),
                weather.clone(),
                queue,
            );
            Self {
                handler,
                dispatcher,
                transport,
                geocoder,
                weather,
            }
        }

        /// Drop the handler and let the dispatcher send everything queued
        async fn sent(self) -> Vec<Sent> {
            drop(self.handler);
            self.dispatcher.run(CancellationToken::new()).await;
            self.transport.sent_messages()
        }
    }

    fn rainy() -> Forecast {
        let mut minutely: Vec<Sample> = (0..61).map(|i| Sample::new(i * 60, 0.0)).collect();
        // first group catches one wet minute, the second is wet throughout
        for sample in &mut minutely[5..11] {
            sample.precipitation_mm = 1.0;
        }
        Forecast {
            minutely,
            hourly_rain_1h: Some(4.2),
        }
    }

    fn public(sender: &str, text: &str) -> ChatEvent {
        ChatEvent::Public {
            sender: sender.to_string(),
            text: text.to_string(),
            timestamp: None,
        }
    }

    fn private(sender: &str, text: &str) -> ChatEvent {
        ChatEvent::Private {
            sender: sender.to_string(),
            text: text.to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn test_search_text_strips_nick() {
        let h = Harness::new(FakeWeather::default());
        assert_eq!(h.handler.search_text("  RainBot   new york "), "new york");
        assert_eq!(h.handler.search_text("RainBot berlin RainBot"), "berlin");
        assert_eq!(h.handler.search_text("berlin"), "berlin");
    }

    #[test]
    fn test_is_addressed() {
        let h = Harness::new(FakeWeather::default());
        assert!(h.handler.is_addressed("  RainBot berlin"));
        assert!(!h.handler.is_addressed("is RainBot around?"));
        assert!(!h.handler.is_addressed("rainbot berlin"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_public_request_gets_chart() {
        let h = Harness::new(FakeWeather::returning(rainy()));
        let outcome = h.handler.on_event(public("alice", "RainBot berlin")).await;
        assert_eq!(outcome, Some(HandleOutcome::Replied));
        assert_eq!(h.geocoder.queries(), vec!["berlin".to_string()]);

        let sent = h.sent().await;
        let chart = format!("[▂█{}]", " ".repeat(10));
        assert_eq!(
            sent,
            vec![Sent::Public(format!(
                "{} 1.200 mm of rain over the next hour in Berlin, Germany",
                chart
            ))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_private_request_gets_private_reply() {
        let h = Harness::new(FakeWeather::returning(rainy()));
        let outcome = h.handler.on_event(private("bob", "berlin")).await;
        assert_eq!(outcome, Some(HandleOutcome::Replied));

        let sent = h.sent().await;
        assert!(matches!(&sent[..], [Sent::Private(to, _)] if to == "bob"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unaddressed_public_message_ignored() {
        let h = Harness::new(FakeWeather::returning(rainy()));
        assert_eq!(h.handler.on_event(public("alice", "nice weather")).await, None);
        assert!(h.geocoder.queries().is_empty());
        assert!(h.sent().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_event_ignored() {
        let h = Harness::new(FakeWeather::default());
        assert_eq!(h.handler.on_event(ChatEvent::Error("needlogin".into())).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_public_request_throttled() {
        let h = Harness::new(FakeWeather::returning(rainy()));
        assert_eq!(
            h.handler.handle("alice", "RainBot berlin", false).await,
            HandleOutcome::Replied
        );
        let outcome = h.handler.handle("bob", "RainBot berlin", false).await;
        assert!(matches!(
            outcome,
            HandleOutcome::Throttled(Admission::GlobalCooldown { .. })
        ));
        // the throttled request never reaches the providers
        assert_eq!(h.geocoder.queries().len(), 1);
        assert_eq!(h.weather.calls(), 1);
        assert_eq!(h.sent().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_private_requests_bypass_throttle() {
        let h = Harness::new(FakeWeather::returning(rainy()));
        for _ in 0..3 {
            assert_eq!(
                h.handler.handle("alice", "berlin", true).await,
                HandleOutcome::Replied
            );
        }
        assert_eq!(h.sent().await.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exempt_sender_still_hits_global_cooldown() {
        let policy = ThrottlePolicy {
            global_cooldown: Duration::ZERO,
            exempt_sender: Some("alice".to_string()),
            ..ThrottlePolicy::default()
        };
        let h = Harness::with_policy(FakeWeather::returning(rainy()), policy);
        assert_eq!(h.handler.handle("ALICE", "RainBot berlin", false).await, HandleOutcome::Replied);
        assert_eq!(h.handler.handle("ALICE", "RainBot berlin", false).await, HandleOutcome::Replied);
        assert!(matches!(
            h.handler.handle("bob", "RainBot berlin", false).await,
            HandleOutcome::Replied
        ));
        assert!(matches!(
            h.handler.handle("bob", "RainBot berlin", false).await,
            HandleOutcome::Throttled(Admission::SenderCooldown { .. })
        ));

        let sent = h.sent().await;
        // identical consecutive public replies are disambiguated
        assert!(matches!(&sent[1], Sent::Public(text) if text.ends_with("Germany.")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_geocode_failure_sends_nothing() {
        let h = Harness::new(FakeWeather::returning(rainy()));
        assert_eq!(
            h.handler.handle("alice", "RainBot atlantis", false).await,
            HandleOutcome::GeocodeFailed
        );
        assert_eq!(h.weather.calls(), 0);
        assert!(h.sent().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_weather_failure_sends_nothing() {
        let h = Harness::new(FakeWeather::default());
        assert_eq!(
            h.handler.handle("alice", "RainBot berlin", false).await,
            HandleOutcome::WeatherFailed
        );
        assert!(h.sent().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hourly_fallback() {
        let forecast = Forecast {
            minutely: Vec::new(),
            hourly_rain_1h: Some(0.456),
        };
        let h = Harness::new(FakeWeather::returning(forecast));
        assert_eq!(
            h.handler.handle("alice", "berlin", true).await,
            HandleOutcome::Replied
        );
        assert_eq!(
            h.sent().await,
            vec![Sent::Private(
                "alice".into(),
                "0.46 mms of rain expected over the next hour in Berlin, Germany".into()
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_data_is_silent() {
        let h = Harness::new(FakeWeather::returning(Forecast::default()));
        assert_eq!(
            h.handler.handle("alice", "RainBot berlin", false).await,
            HandleOutcome::NoData
        );
        assert!(h.sent().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_minutes_report_no_rain() {
        let forecast = Forecast {
            minutely: (0..61).map(|i| Sample::new(i * 60, 0.0)).collect(),
            hourly_rain_1h: None,
        };
        let h = Harness::new(FakeWeather::returning(forecast));
        h.handler.handle("alice", "RainBot berlin", false).await;
        assert_eq!(
            h.sent().await,
            vec![Sent::Public(
                "no rain expexted over the next hour in Berlin, Germany".into()
            )]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_dispatcher() {
        let h = Harness::new(FakeWeather::returning(rainy()));
        drop(h.dispatcher);
        assert_eq!(
            h.handler.handle("alice", "berlin", true).await,
            HandleOutcome::DispatcherClosed
        );
    }
}
