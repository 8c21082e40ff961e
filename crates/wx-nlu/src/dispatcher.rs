//! NLU action dispatcher
//!
//! Runs one dispatch cycle per inbound user message: asks the engine for
//! converse steps and executes the named actions it requests until the
//! engine signals stop. The updated conversation state is returned to the
//! caller, which owns persisting it.

use std::sync::Arc;
use tracing::{error, info, warn};

use wx_core::{ConversationState, InMemorySessionStore, MessageSender};
use wx_weather::WeatherProvider;

use crate::client::{first_entity_value, Entities, NluEngine, StepType};
use crate::error::Result;

/// Upper bound on engine steps per dispatch cycle
const MAX_STEPS: usize = 10;

/// Executes engine-driven actions against the conversation state
pub struct ActionDispatcher {
    engine: Arc<dyn NluEngine>,
    weather: Arc<dyn WeatherProvider>,
    sender: Arc<dyn MessageSender>,
    sessions: InMemorySessionStore,
}

impl ActionDispatcher {
    /// Create a new dispatcher
    pub fn new(
        engine: Arc<dyn NluEngine>,
        weather: Arc<dyn WeatherProvider>,
        sender: Arc<dyn MessageSender>,
        sessions: InMemorySessionStore,
    ) -> Self {
        Self {
            engine,
            weather,
            sender,
            sessions,
        }
    }

    /// Run one dispatch cycle for a user message.
    ///
    /// Returns the conversation state as left by the engine's actions. An
    /// `Err` means the cycle did not complete; the caller should log it and
    /// leave the stored state untouched.
    pub async fn dispatch(
        &self,
        session_id: &str,
        text: &str,
        context: ConversationState,
    ) -> Result<ConversationState> {
        let mut context = context;
        let mut step = self.engine.converse(session_id, Some(text), &context).await?;

        for _ in 0..MAX_STEPS {
            match step.step_type {
                StepType::Stop => return Ok(context),
                StepType::Msg => {
                    let msg = step.msg.as_deref().unwrap_or_default();
                    self.send(session_id, msg).await;
                }
                StepType::Action => match step.action.as_deref() {
                    Some("getForecast") => {
                        context = self.get_forecast(&step.entities, context).await?;
                    }
                    Some(other) => warn!("Unknown NLU action: {}", other),
                    None => warn!("Converse action step without an action name"),
                },
                StepType::Unknown => warn!("Unhandled converse step, continuing"),
            }

            step = self.engine.converse(session_id, None, &context).await?;
        }

        warn!(
            "Dispatch cycle for session {} exceeded {} steps, giving up",
            session_id, MAX_STEPS
        );
        Ok(context)
    }

    /// The `send` action: forward a bot reply to the session's user.
    ///
    /// The session must already exist by this point; a miss is logged and
    /// otherwise ignored. Delivery failures are logged and do not abort the
    /// cycle.
    async fn send(&self, session_id: &str, text: &str) {
        let Some(recipient_id) = self.sessions.user_for(session_id).await else {
            error!("Couldn't find user for session: {}", session_id);
            return;
        };

        if let Err(e) = self.sender.send_text(&recipient_id, text).await {
            error!("Failed to forward bot reply to {}: {}", recipient_id, e);
        }
    }

    /// The `getForecast` action: resolve a location entity to a forecast
    /// string in the conversation state.
    async fn get_forecast(
        &self,
        entities: &Entities,
        mut context: ConversationState,
    ) -> Result<ConversationState> {
        let Some(location) = first_entity_value(entities, "location") else {
            context.missing_location = true;
            context.forecast = None;
            return Ok(context);
        };

        // Transport and protocol failures end the cycle with an explicit
        // error instead of stalling it.
        let search = self.weather.find_city(&location).await?;

        context.forecast = Some(match search.first_description() {
            Some((description, city)) => {
                let description = if description == "sky is clear" {
                    "clear skies".to_string()
                } else {
                    description
                };
                info!("Forecast for {}: {}", city, description);
                format!("{} in {}", description, city)
            }
            None => format!("a surprise in {}", location),
        });
        context.missing_location = false;

        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::client::ConverseStep;
    use crate::error::NluError;
    use wx_weather::{CitySearch, WeatherError};

    /// Engine fake replaying a scripted list of steps
    struct ScriptedEngine {
        steps: Mutex<VecDeque<ConverseStep>>,
    }

    impl ScriptedEngine {
        fn new(steps: Vec<&str>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(
                    steps
                        .into_iter()
                        .map(|s| serde_json::from_str(s).unwrap())
                        .collect(),
                ),
            })
        }
    }

    #[async_trait]
    impl NluEngine for ScriptedEngine {
        async fn converse(
            &self,
            _session_id: &str,
            _message: Option<&str>,
            _context: &ConversationState,
        ) -> Result<ConverseStep> {
            self.steps
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| NluError::InvalidResponse("script exhausted".to_string()))
        }
    }

    /// Weather fake returning a canned response or an error
    struct CannedWeather {
        body: Option<String>,
    }

    impl CannedWeather {
        fn ok(body: &str) -> Arc<Self> {
            Arc::new(Self {
                body: Some(body.to_string()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { body: None })
        }
    }

    #[async_trait]
    impl WeatherProvider for CannedWeather {
        async fn find_city(&self, _location: &str) -> wx_weather::Result<CitySearch> {
            match &self.body {
                Some(body) => Ok(serde_json::from_str(body).unwrap()),
                None => Err(WeatherError::Api("502 - bad gateway".to_string())),
            }
        }
    }

    /// Sender fake recording every delivered message
    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MessageSender for RecordingSender {
        async fn send_text(&self, recipient_id: &str, text: &str) -> wx_core::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((recipient_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    fn dispatcher(
        engine: Arc<dyn NluEngine>,
        weather: Arc<dyn WeatherProvider>,
        sender: Arc<RecordingSender>,
        sessions: InMemorySessionStore,
    ) -> ActionDispatcher {
        ActionDispatcher::new(engine, weather, sender, sessions)
    }

    const FORECAST_STEP: &str = r#"{
        "type": "action",
        "action": "getForecast",
        "entities": {"location": [{"confidence": 0.95, "value": "Paris"}]}
    }"#;

    const STOP_STEP: &str = r#"{"type": "stop"}"#;

    #[tokio::test]
    async fn test_clear_sky_description_is_normalized() {
        let engine = ScriptedEngine::new(vec![FORECAST_STEP, STOP_STEP]);
        let weather = CannedWeather::ok(
            r#"{"list": [{"name": "Paris", "weather": [{"description": "Sky is clear"}]}]}"#,
        );
        let sender = Arc::new(RecordingSender::default());
        let sessions = InMemorySessionStore::new();
        let session = sessions.find_or_create("user-1").await;

        let d = dispatcher(engine, weather, sender, sessions);
        let context = d
            .dispatch(&session.id, "weather in Paris?", ConversationState::default())
            .await
            .unwrap();

        assert_eq!(context.forecast.as_deref(), Some("clear skies in Paris"));
        assert!(!context.missing_location);
    }

    #[tokio::test]
    async fn test_other_descriptions_pass_through_lowercased() {
        let engine = ScriptedEngine::new(vec![FORECAST_STEP, STOP_STEP]);
        let weather = CannedWeather::ok(
            r#"{"list": [{"name": "Brest", "weather": [{"description": "Light Rain"}]}]}"#,
        );
        let sender = Arc::new(RecordingSender::default());
        let sessions = InMemorySessionStore::new();
        let session = sessions.find_or_create("user-1").await;

        let d = dispatcher(engine, weather, sender, sessions);
        let context = d
            .dispatch(&session.id, "weather?", ConversationState::default())
            .await
            .unwrap();

        assert_eq!(context.forecast.as_deref(), Some("light rain in Brest"));
    }

    #[tokio::test]
    async fn test_missing_location_sets_flag_and_clears_forecast() {
        let no_location = r#"{"type": "action", "action": "getForecast", "entities": {}}"#;
        let engine = ScriptedEngine::new(vec![no_location, STOP_STEP]);
        let weather = CannedWeather::ok(r#"{"list": []}"#);
        let sender = Arc::new(RecordingSender::default());
        let sessions = InMemorySessionStore::new();
        let session = sessions.find_or_create("user-1").await;

        let stale = ConversationState {
            forecast: Some("clear skies in Paris".to_string()),
            ..Default::default()
        };

        let d = dispatcher(engine, weather, sender, sessions);
        let context = d.dispatch(&session.id, "weather?", stale).await.unwrap();

        assert!(context.missing_location);
        assert!(context.forecast.is_none());
    }

    #[tokio::test]
    async fn test_empty_city_list_falls_back_to_surprise() {
        let engine = ScriptedEngine::new(vec![FORECAST_STEP, STOP_STEP]);
        let weather = CannedWeather::ok(r#"{"list": []}"#);
        let sender = Arc::new(RecordingSender::default());
        let sessions = InMemorySessionStore::new();
        let session = sessions.find_or_create("user-1").await;

        let d = dispatcher(engine, weather, sender, sessions);
        let context = d
            .dispatch(&session.id, "weather?", ConversationState::default())
            .await
            .unwrap();

        assert_eq!(context.forecast.as_deref(), Some("a surprise in Paris"));
    }

    #[tokio::test]
    async fn test_weather_failure_resolves_to_error() {
        let engine = ScriptedEngine::new(vec![FORECAST_STEP, STOP_STEP]);
        let weather = CannedWeather::failing();
        let sender = Arc::new(RecordingSender::default());
        let sessions = InMemorySessionStore::new();
        let session = sessions.find_or_create("user-1").await;

        let d = dispatcher(engine, weather, sender, sessions);
        let result = d
            .dispatch(&session.id, "weather?", ConversationState::default())
            .await;

        assert!(matches!(result, Err(NluError::Weather(_))));
    }

    #[tokio::test]
    async fn test_msg_step_is_forwarded_to_the_session_user() {
        let msg = r#"{"type": "msg", "msg": "clear skies in Paris", "confidence": 0.9}"#;
        let engine = ScriptedEngine::new(vec![msg, STOP_STEP]);
        let weather = CannedWeather::ok(r#"{"list": []}"#);
        let sender = Arc::new(RecordingSender::default());
        let sessions = InMemorySessionStore::new();
        let session = sessions.find_or_create("user-1").await;

        let d = dispatcher(engine, weather, Arc::clone(&sender), sessions);
        d.dispatch(&session.id, "weather?", ConversationState::default())
            .await
            .unwrap();

        let sent = sender.sent.lock().unwrap();
        assert_eq!(
            sent.as_slice(),
            [("user-1".to_string(), "clear skies in Paris".to_string())]
        );
    }

    #[tokio::test]
    async fn test_msg_for_unknown_session_sends_nothing() {
        let msg = r#"{"type": "msg", "msg": "hello"}"#;
        let engine = ScriptedEngine::new(vec![msg, STOP_STEP]);
        let weather = CannedWeather::ok(r#"{"list": []}"#);
        let sender = Arc::new(RecordingSender::default());
        let sessions = InMemorySessionStore::new();

        let d = dispatcher(engine, weather, Arc::clone(&sender), sessions);
        d.dispatch("no-such-session", "hi", ConversationState::default())
            .await
            .unwrap();

        assert!(sender.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_action_is_skipped() {
        let unknown = r#"{"type": "action", "action": "bookSlot", "entities": {}}"#;
        let engine = ScriptedEngine::new(vec![unknown, STOP_STEP]);
        let weather = CannedWeather::ok(r#"{"list": []}"#);
        let sender = Arc::new(RecordingSender::default());
        let sessions = InMemorySessionStore::new();
        let session = sessions.find_or_create("user-1").await;

        let d = dispatcher(engine, weather, sender, sessions);
        let context = d
            .dispatch(&session.id, "book me a slot", ConversationState::default())
            .await
            .unwrap();

        assert_eq!(context, ConversationState::default());
    }
}
