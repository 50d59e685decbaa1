//! Chat session controller.
//!
//! A [`ChatSession`] owns everything one conversation needs: the transcript,
//! the in-flight reply buffer, model and persona selection, and the usage
//! meter. Sending a message returns [`StreamParams`] for
//! [`ChatStreamService`]; the messages that service reports are fed back
//! through [`ChatSession::apply_stream_message`]. Each turn carries its own
//! stream id and cancellation token, so messages from a superseded turn are
//! ignored.

use std::error::Error as StdError;
use std::fmt;

use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ChatMessage, ChatRequest};
use crate::core::catalog::{CatalogError, ModelCatalog, ModelDescriptor};
use crate::core::chat_stream::{ChatStreamService, StreamMessage, StreamParams};
use crate::core::config::Config;
use crate::core::message::Message;
use crate::core::persona::{Persona, PersonaManager};
use crate::core::usage::{AccessTier, UsageMeter};
use crate::utils::routing::Gateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    AwaitingResponse,
    Streaming,
    Errored,
}

impl TurnState {
    pub fn is_in_flight(self) -> bool {
        matches!(self, TurnState::AwaitingResponse | TurnState::Streaming)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    /// The free-tier premium budget is spent and a premium model is selected.
    QuotaExceeded { model: String },
    /// The request could not be sent or the endpoint answered with an error.
    RequestFailed { reason: String },
    /// The reply broke off mid-stream; the partial text was discarded.
    StreamInterrupted { reason: String, discarded_chars: usize },
}

impl TurnError {
    /// Message suitable for showing to the user
    pub fn user_message(&self) -> &'static str {
        match self {
            TurnError::QuotaExceeded { .. } => {
                "Free tier limit reached for premium models. Upgrade to continue or use a free model."
            }
            TurnError::RequestFailed { .. } => {
                "Failed to get response from AI model. Please try again."
            }
            TurnError::StreamInterrupted { .. } => {
                "The response was interrupted before it finished. Please try again."
            }
        }
    }
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnError::QuotaExceeded { model } => {
                write!(f, "{} ({})", self.user_message(), model)
            }
            TurnError::RequestFailed { reason } => {
                write!(f, "{} ({})", self.user_message(), reason)
            }
            TurnError::StreamInterrupted {
                reason,
                discarded_chars,
            } => write!(
                f,
                "{} ({}; {} characters discarded)",
                self.user_message(),
                reason,
                discarded_chars
            ),
        }
    }
}

impl StdError for TurnError {}

pub struct ChatSession {
    client: Client,
    gateway: Gateway,
    catalog: ModelCatalog,
    personas: PersonaManager,
    usage: UsageMeter,
    model: ModelDescriptor,
    transcript: Vec<Message>,
    streaming: String,
    state: TurnState,
    error: Option<TurnError>,
    current_stream_id: u64,
    stream_cancel_token: Option<CancellationToken>,
    in_flight_tier: Option<AccessTier>,
}

impl ChatSession {
    /// Build a session from configuration. An unknown default persona is
    /// logged and ignored; an unknown default model is an error.
    pub fn new(config: &Config, catalog: ModelCatalog) -> Result<Self, CatalogError> {
        let model = catalog.require(config.default_model_id())?.clone();
        let mut personas = PersonaManager::load_personas(config);
        if let Some(persona) = &config.default_persona {
            if let Err(err) = personas.set_active_persona(persona) {
                warn!("ignoring default persona: {err}");
            }
        }

        let gateway = Gateway::from_config(&config.routing);
        debug!(
            model = %model.id,
            base_url = gateway.base_url(),
            "session ready"
        );

        Ok(Self {
            client: Client::new(),
            gateway,
            catalog,
            personas,
            usage: config.usage_meter(),
            model,
            transcript: Vec::new(),
            streaming: String::new(),
            state: TurnState::Idle,
            error: None,
            current_stream_id: 0,
            stream_cancel_token: None,
            in_flight_tier: None,
        })
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Text of the reply currently streaming in
    pub fn streaming_text(&self) -> &str {
        &self.streaming
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state.is_in_flight()
    }

    pub fn error(&self) -> Option<&TurnError> {
        self.error.as_ref()
    }

    pub fn usage(&self) -> &UsageMeter {
        &self.usage
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn selected_model(&self) -> &ModelDescriptor {
        &self.model
    }

    pub fn personas(&self) -> &PersonaManager {
        &self.personas
    }

    pub fn active_persona(&self) -> Option<&Persona> {
        self.personas.get_active_persona()
    }

    pub fn current_stream_id(&self) -> u64 {
        self.current_stream_id
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.stream_cancel_token.is_some() && self.current_stream_id == stream_id
    }

    pub fn select_model(&mut self, id: &str) -> Result<&ModelDescriptor, CatalogError> {
        self.model = self.catalog.require(id)?.clone();
        info!(model = %self.model.id, "selected model");
        Ok(&self.model)
    }

    pub fn select_persona(&mut self, key: &str) -> Result<&Persona, String> {
        self.personas.set_active_persona(key)?;
        self.personas
            .get_active_persona()
            .ok_or_else(|| format!("Persona '{key}' not found"))
    }

    pub fn clear_persona(&mut self) {
        self.personas.clear_active_persona();
    }

    /// Add a persona for this session. Blank name or personality is a no-op.
    pub fn create_persona(
        &mut self,
        name: &str,
        personality: &str,
        instructions: &str,
    ) -> Option<u64> {
        let id = self.personas.create_persona(name, personality, instructions);
        if let Some(id) = id {
            debug!(id, name, "created persona");
        }
        id
    }

    pub fn upgrade(&mut self) {
        self.usage.upgrade();
        info!("upgraded to premium tier");
    }

    /// The messages sent with the next request: a synthesized system message
    /// followed by the full transcript.
    pub fn build_api_messages(&self) -> Vec<ChatMessage> {
        let system = Message::system(self.personas.system_prompt());
        std::iter::once(&system)
            .chain(self.transcript.iter())
            .map(ChatMessage::from)
            .collect()
    }

    /// Start a turn for `text`.
    ///
    /// Returns `Ok(None)` for blank input. A turn still in flight is
    /// cancelled and its partial reply dropped before the new one starts,
    /// unless the new turn is refused for quota, in which case the
    /// in-flight turn is left running.
    pub fn send_message(&mut self, text: &str) -> Result<Option<StreamParams>, TurnError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        if !self.usage.allows(self.model.tier) {
            let err = TurnError::QuotaExceeded {
                model: self.model.id.clone(),
            };
            info!(model = %self.model.id, "premium budget exhausted");
            // A reply still streaming keeps its turn; only an idle session
            // records the failure.
            if !self.is_busy() {
                self.error = Some(err.clone());
                self.state = TurnState::Errored;
            }
            return Err(err);
        }

        if self.cancel_turn() {
            debug!("superseded in-flight turn");
        }

        self.error = None;
        self.transcript.push(Message::user(text));

        let request = ChatRequest::streaming(self.build_api_messages());
        let route = self.gateway.route(&self.model.endpoint);
        let cancel_token = CancellationToken::new();

        self.current_stream_id += 1;
        self.stream_cancel_token = Some(cancel_token.clone());
        self.in_flight_tier = Some(self.model.tier);
        self.state = TurnState::AwaitingResponse;

        debug!(
            stream_id = self.current_stream_id,
            model = %self.model.id,
            "starting turn"
        );

        Ok(Some(StreamParams {
            client: self.client.clone(),
            route,
            request,
            cancel_token,
            stream_id: self.current_stream_id,
        }))
    }

    /// Apply a message reported by the stream service. Returns false when the
    /// message belongs to a turn that is no longer current.
    pub fn apply_stream_message(&mut self, message: StreamMessage, stream_id: u64) -> bool {
        if !self.is_current_stream(stream_id) {
            debug!(
                stream_id,
                current = self.current_stream_id,
                "ignoring stale stream message"
            );
            return false;
        }

        match message {
            StreamMessage::Accepted => {
                if let Some(tier) = self.in_flight_tier {
                    if self.usage.record_call(tier) {
                        debug!(remaining = self.usage.remaining(), "charged premium call");
                    }
                }
            }
            StreamMessage::Partial(text) => {
                self.streaming = text;
                self.state = TurnState::Streaming;
            }
            StreamMessage::Complete(text) => {
                self.streaming.clear();
                self.error = None;
                self.transcript.push(Message::assistant(text));
                self.end_turn(TurnState::Idle);
            }
            StreamMessage::RequestFailed(reason) => {
                warn!(stream_id, "request failed: {reason}");
                self.fail_turn(TurnError::RequestFailed { reason });
            }
            StreamMessage::Interrupted { reason, partial } => {
                let discarded_chars = partial.chars().count();
                warn!(stream_id, discarded_chars, "stream interrupted: {reason}");
                self.fail_turn(TurnError::StreamInterrupted {
                    reason,
                    discarded_chars,
                });
            }
        }

        true
    }

    /// Abort the in-flight turn, if any. The user message stays in the
    /// transcript; the partial reply is dropped.
    pub fn cancel_turn(&mut self) -> bool {
        let Some(token) = self.stream_cancel_token.take() else {
            return false;
        };
        token.cancel();
        self.streaming.clear();
        self.in_flight_tier = None;
        self.state = TurnState::Idle;
        debug!(stream_id = self.current_stream_id, "cancelled turn");
        true
    }

    /// Reset the transcript, reply buffer and error. Usage and selections
    /// are kept.
    pub fn clear_conversation(&mut self) {
        self.cancel_turn();
        self.transcript.clear();
        self.streaming.clear();
        self.error = None;
        self.state = TurnState::Idle;
    }

    /// Send `text` and wait for the turn to finish, calling `on_partial` with
    /// the cumulative reply as it streams in.
    pub async fn run_turn<F>(&mut self, text: &str, mut on_partial: F) -> Result<(), TurnError>
    where
        F: FnMut(&str),
    {
        let Some(params) = self.send_message(text)? else {
            return Ok(());
        };

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params);
        drop(service);

        while let Some((message, stream_id)) = rx.recv().await {
            let is_partial = matches!(message, StreamMessage::Partial(_));
            if self.apply_stream_message(message, stream_id) && is_partial {
                on_partial(&self.streaming);
            }
            if !self.is_busy() {
                break;
            }
        }

        if self.is_busy() {
            let partial = std::mem::take(&mut self.streaming);
            let stream_id = self.current_stream_id;
            self.apply_stream_message(
                StreamMessage::Interrupted {
                    reason: "stream ended unexpectedly".to_string(),
                    partial,
                },
                stream_id,
            );
        }

        match (self.state, &self.error) {
            (TurnState::Errored, Some(err)) => Err(err.clone()),
            _ => Ok(()),
        }
    }

    fn end_turn(&mut self, state: TurnState) {
        self.stream_cancel_token = None;
        self.in_flight_tier = None;
        self.state = state;
    }

    fn fail_turn(&mut self, err: TurnError) {
        self.streaming.clear();
        self.error = Some(err);
        self.end_turn(TurnState::Errored);
    }
}
