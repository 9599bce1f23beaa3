// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::OffsetDateTime;

use crate::{Alert, Changes, ChatMessage, SettingKey, SettingsStore, read_json_or, write_json};

pub const SYSTEM_PROMPT: &str = "You are a helpful health assistant. Provide accurate health information and advice. Always remind users that your advice is not a substitute for professional medical care and they should consult healthcare providers for serious concerns. Be empathetic, clear, and concise.";

pub const APOLOGY_MESSAGE: &str = "Sorry, I encountered an error. Please check your internet connection and API key, then try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatProperty {
    Messages,
    MessageInput,
    IsLoading,
    IsEmpty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    Unauthorized,
    RateLimited,
    Status { code: u16, message: String },
    Transport(String),
    Malformed(String),
}

impl std::fmt::Display for CompletionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => f.write_str("Invalid API key. Please check your API key."),
            Self::RateLimited => {
                f.write_str("Rate limit exceeded. Please wait a moment and try again.")
            }
            Self::Status { code, message } if message.is_empty() => {
                write!(f, "API error: {code}")
            }
            Self::Status { code, message } => write!(f, "API error: {code}: {message}"),
            Self::Transport(detail) => write!(f, "cannot reach the assistant: {detail}"),
            Self::Malformed(detail) => write!(f, "Invalid response format: {detail}"),
        }
    }
}

impl std::error::Error for CompletionError {}

/// Remote chat-completion capability used by [`ChatModel`].
pub trait CompletionBackend {
    /// Whether a credential has been configured. Sends are refused otherwise.
    fn is_configured(&self) -> bool;

    fn complete(&self, system_prompt: &str, user_message: &str)
    -> Result<String, CompletionError>;
}

/// A user message accepted by [`ChatModel::begin_send`] that still needs a
/// reply from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    pub request_id: u64,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendStart {
    Empty,
    Blocked(Alert),
    Pending(PendingReply),
}

#[derive(Debug)]
pub struct ChatModel {
    messages: Vec<ChatMessage>,
    input: String,
    loading: bool,
    empty: bool,
    next_request_id: u64,
    in_flight: Option<u64>,
    changes: Changes<ChatProperty>,
}

impl ChatModel {
    pub fn load<S: SettingsStore + ?Sized>(store: &S) -> Self {
        let messages: Vec<ChatMessage> = read_json_or(store, SettingKey::ChatHistory, Vec::new());
        let mut model = Self {
            empty: messages.is_empty(),
            messages,
            input: String::new(),
            loading: false,
            next_request_id: 0,
            in_flight: None,
            changes: Changes::default(),
        };
        if !model.empty {
            model
                .changes
                .notify_all(&[ChatProperty::Messages, ChatProperty::IsEmpty]);
        }
        model
    }

    /// Continues request numbering after `last_request_id` so replies still
    /// owed to an earlier session can never match a send from this one.
    pub fn resume_after(mut self, last_request_id: u64) -> Self {
        self.next_request_id = self.next_request_id.max(last_request_id);
        self
    }

    /// The id handed to the most recent send, or 0 before any send.
    pub fn last_request_id(&self) -> u64 {
        self.next_request_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn message_input(&self) -> &str {
        &self.input
    }

    pub fn set_message_input(&mut self, value: &str) {
        if self.input != value {
            self.input = value.to_owned();
            self.changes.notify(ChatProperty::MessageInput);
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn take_changes(&mut self) -> Vec<ChatProperty> {
        self.changes.drain()
    }

    /// Validates the input and, when it can be sent, appends the user message
    /// and enters the loading state. The caller must deliver the backend's
    /// answer through [`ChatModel::finish_send`].
    pub fn begin_send(&mut self, configured: bool, now: OffsetDateTime) -> SendStart {
        let prompt = self.input.trim().to_owned();
        if prompt.is_empty() {
            self.set_loading(false);
            return SendStart::Empty;
        }

        if !configured {
            self.set_loading(false);
            return SendStart::Blocked(missing_credential_alert());
        }

        self.messages.push(ChatMessage::user(prompt.clone(), now));
        self.changes.notify(ChatProperty::Messages);
        self.set_empty(false);
        self.set_message_input("");
        self.set_loading(true);

        self.next_request_id = self.next_request_id.wrapping_add(1).max(1);
        let request_id = self.next_request_id;
        self.in_flight = Some(request_id);
        tracing::debug!(request_id, "chat request started");

        SendStart::Pending(PendingReply { request_id, prompt })
    }

    /// Applies the backend result for `request_id`. Results for superseded
    /// requests are dropped.
    pub fn finish_send<S: SettingsStore + ?Sized>(
        &mut self,
        request_id: u64,
        result: Result<String, CompletionError>,
        store: &mut S,
        now: OffsetDateTime,
    ) -> Option<Alert> {
        if self.in_flight != Some(request_id) {
            tracing::debug!(request_id, "dropping stale chat response");
            return None;
        }
        self.in_flight = None;

        let alert = match result {
            Ok(reply) => {
                self.messages.push(ChatMessage::assistant(reply.trim(), now));
                self.changes.notify(ChatProperty::Messages);
                if let Err(error) = write_json(store, SettingKey::ChatHistory, &self.messages) {
                    tracing::error!("save chat history failed: {error:#}");
                }
                None
            }
            Err(error) => {
                tracing::error!(request_id, "chat request failed: {error}");
                self.messages.push(ChatMessage::assistant(APOLOGY_MESSAGE, now));
                self.changes.notify(ChatProperty::Messages);
                Some(Alert::new(
                    "Error",
                    "Failed to get AI response. Please check:\n1. Internet connection\n2. API key is valid ([chat].api_key)\n3. API key has credits",
                ))
            }
        };

        self.set_loading(false);
        alert
    }

    /// Runs a whole send synchronously against `backend`.
    pub fn send_message<B, S>(
        &mut self,
        backend: &B,
        store: &mut S,
        now: impl Fn() -> OffsetDateTime,
    ) -> Option<Alert>
    where
        B: CompletionBackend + ?Sized,
        S: SettingsStore + ?Sized,
    {
        match self.begin_send(backend.is_configured(), now()) {
            SendStart::Empty => None,
            SendStart::Blocked(alert) => Some(alert),
            SendStart::Pending(pending) => {
                let result = backend.complete(SYSTEM_PROMPT, &pending.prompt);
                self.finish_send(pending.request_id, result, store, now())
            }
        }
    }

    pub fn clear_chat<S: SettingsStore + ?Sized>(&mut self, store: &mut S) {
        self.messages.clear();
        self.changes.notify(ChatProperty::Messages);
        self.empty = true;
        self.changes.notify(ChatProperty::IsEmpty);
        if let Err(error) = store.remove(SettingKey::ChatHistory) {
            tracing::error!("clear chat history failed: {error:#}");
        }
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        self.changes.notify(ChatProperty::IsLoading);
    }

    fn set_empty(&mut self, empty: bool) {
        if self.empty != empty {
            self.empty = empty;
            self.changes.notify(ChatProperty::IsEmpty);
        }
    }
}

pub fn chat_disabled_alert() -> Alert {
    Alert::new(
        "Chat Disabled",
        "The assistant is turned off. Set [chat] enabled = true in the carely config file (run `carely --print-config-path` to locate it), then restart.",
    )
}

fn missing_credential_alert() -> Alert {
    Alert::new(
        "API Key Required",
        "Add your API key under [chat] api_key in the carely config file (run `carely --print-config-path` to locate it), then restart.",
    )
}
