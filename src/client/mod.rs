pub mod error;
pub mod sse;
pub mod wire;

use std::sync::Mutex;

use futures::StreamExt;
use futures::future::{ AbortHandle, Abortable, Aborted };
use log::{ debug, error, info, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use tokio::sync::watch;

use crate::models::chat::{ Conversation, Message };
use self::error::ChatError;
use self::sse::{ LineBuffer, SseFrame, parse_frame };
use self::wire::{ ChatRequest, ChatResponse, StreamChunk, WireMessage };

/// Reply inserted when an exchange fails for any reason other than an
/// explicit cancel.
pub const ERROR_REPLY: &str =
    "Sorry, something went wrong while sending your message. Please try again later.";

/// Reply used when a single-shot response carries no completion text.
pub const EMPTY_REPLY: &str = "Sorry, I couldn't get a reply.";

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_PLACEHOLDER: &str = "Type a message...";

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Fully-qualified URL of the chat-completions endpoint.
    pub endpoint: String,
    /// Optional bearer credential attached to every request.
    pub credential: Option<String>,
    /// Model identifier carried in every request payload.
    pub model: String,
    /// Input hint for the presentation layer; never sent on the wire.
    pub placeholder: String,
    /// Streamed delivery when true, single-shot otherwise.
    pub streaming_enabled: bool,
}

impl ChatConfig {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            credential: None,
            model: DEFAULT_MODEL.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            streaming_enabled: true,
        }
    }
}

#[derive(Debug)]
struct ChatState {
    conversation: Conversation,
    pending_input: String,
    busy: bool,
}

impl ChatState {
    fn new() -> Self {
        Self {
            conversation: Conversation::new(),
            pending_input: String::new(),
            busy: false,
        }
    }
}

/// Client for a chat-completions endpoint. Owns the conversation, sends it
/// with each new user turn, applies streamed deltas to an in-progress
/// assistant message, and supports cancelling the exchange mid-stream.
///
/// At most one exchange is in flight at a time; `submit` while busy is a
/// no-op. All failures after a request has started settle into the
/// conversation rather than surfacing as errors.
pub struct StreamingChatClient {
    config: ChatConfig,
    http: HttpClient,
    state: Mutex<ChatState>,
    abort: Mutex<Option<AbortHandle>>,
    changes: watch::Sender<u64>,
}

impl StreamingChatClient {
    pub fn new(config: ChatConfig) -> Result<Self, ChatError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(credential) = &config.credential {
            let value = HeaderValue::from_str(&format!("Bearer {}", credential))
                .map_err(|e| ChatError::Config(format!("Invalid credential format: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ChatError::Config(e.to_string()))?;

        let (changes, _) = watch::channel(0);

        Ok(Self {
            config,
            http,
            state: Mutex::new(ChatState::new()),
            abort: Mutex::new(None),
            changes,
        })
    }

    /// Read-only snapshot of the conversation's messages.
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().unwrap().conversation.messages.clone()
    }

    pub fn conversation(&self) -> Conversation {
        self.state.lock().unwrap().conversation.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().unwrap().busy
    }

    pub fn pending_input(&self) -> String {
        self.state.lock().unwrap().pending_input.clone()
    }

    pub fn set_pending_input(&self, input: &str) {
        self.state.lock().unwrap().pending_input = input.to_string();
        self.touch();
    }

    pub fn placeholder(&self) -> &str {
        &self.config.placeholder
    }

    /// Subscribes to state-changed notifications. The carried value is a
    /// revision counter; read a fresh snapshot after each change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn touch(&self) {
        self.changes.send_modify(|rev| *rev = rev.wrapping_add(1));
    }

    /// Sends one user turn to the endpoint, streaming the reply into the
    /// conversation or awaiting it whole depending on configuration.
    ///
    /// Blank input after trimming is a no-op, as is a call while another
    /// exchange is in flight.
    pub async fn submit(&self, input: &str) {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return;
        }

        {
            let mut state = self.state.lock().unwrap();
            if state.busy {
                debug!("Ignoring submit while an exchange is in flight");
                return;
            }
            state.busy = true;
            state.pending_input.clear();
            state.conversation.push(Message::user(trimmed));
            info!(
                "Submitting turn {} of conversation {}",
                state.conversation.len(),
                state.conversation.id
            );
        }
        self.touch();

        let request = self.build_request(self.config.streaming_enabled);

        let (handle, registration) = AbortHandle::new_pair();
        *self.abort.lock().unwrap() = Some(handle);

        let exchange = async {
            if self.config.streaming_enabled {
                self.run_streaming(&request).await
            } else {
                self.run_single_shot(&request).await
            }
        };

        let result = match Abortable::new(exchange, registration).await {
            Ok(result) => result,
            Err(Aborted) => Err(ChatError::Cancelled),
        };

        if let Err(err) = result {
            if err.is_cancelled() {
                info!("Exchange cancelled; keeping any partial reply as-is");
            } else {
                error!("Exchange failed: {}", err);
                self.state.lock().unwrap().conversation.push(Message::assistant(ERROR_REPLY));
            }
        }

        *self.abort.lock().unwrap() = None;
        self.state.lock().unwrap().busy = false;
        self.touch();
    }

    /// Aborts the in-flight exchange, if any. Partial streamed content is
    /// kept as-is and no error reply is inserted.
    pub fn cancel(&self) {
        if let Some(handle) = self.abort.lock().unwrap().take() {
            info!("Cancelling in-flight exchange");
            handle.abort();
        }
    }

    fn build_request(&self, stream: bool) -> ChatRequest {
        let state = self.state.lock().unwrap();
        let messages = state.conversation.messages.iter().map(WireMessage::from).collect();
        ChatRequest {
            model: self.config.model.clone(),
            messages,
            stream,
        }
    }

    async fn run_streaming(&self, request: &ChatRequest) -> Result<(), ChatError> {
        let placeholder_id = {
            let mut state = self.state.lock().unwrap();
            let placeholder = Message::streaming_placeholder();
            let id = placeholder.id.clone();
            state.conversation.push(placeholder);
            id
        };
        self.touch();

        let resp = self.http.post(&self.config.endpoint).json(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ChatError::Status(status));
        }

        let mut body = resp.bytes_stream();
        let mut lines = LineBuffer::new();

        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for line in lines.push(&chunk) {
                match parse_frame(&line) {
                    Some(SseFrame::Done) => {
                        self.finish_streaming(&placeholder_id);
                        return Ok(());
                    }
                    Some(SseFrame::Data(payload)) => {
                        match serde_json::from_str::<StreamChunk>(&payload) {
                            Ok(frame) => {
                                if let Some(delta) = frame.delta_text() {
                                    self.append_delta(&placeholder_id, &delta);
                                }
                            }
                            Err(e) => {
                                warn!("Skipping malformed stream frame: {} ({})", e, payload);
                            }
                        }
                    }
                    None => {}
                }
            }
        }

        // Body ended without the terminator frame; settle the reply anyway
        // so the conversation is not left with a live placeholder.
        warn!("Stream closed before the done frame; finalizing reply");
        self.finish_streaming(&placeholder_id);
        Ok(())
    }

    async fn run_single_shot(&self, request: &ChatRequest) -> Result<(), ChatError> {
        let resp = self.http.post(&self.config.endpoint).json(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ChatError::Status(status));
        }

        let response: ChatResponse = resp.json().await?;
        let content = response.completion_text().unwrap_or_else(|| EMPTY_REPLY.to_string());

        self.state.lock().unwrap().conversation.push(Message::assistant(&content));
        self.touch();
        Ok(())
    }

    fn append_delta(&self, id: &str, delta: &str) {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(message) = state.conversation.message_mut(id) {
                message.content.push_str(delta);
            }
        }
        self.touch();
    }

    fn finish_streaming(&self, id: &str) {
        {
            let mut state = self.state.lock().unwrap();
            if let Some(message) = state.conversation.message_mut(id) {
                message.is_streaming = false;
            }
        }
        self.touch();
    }
}
