// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::config::Config;
use anyhow::{Context, Result};
use carely_app::{
    CompletionBackend, CompletionError, PendingReply, SYSTEM_PROMPT, SensorCapability,
    SettingsStore, SimulatedStepSource, StepSource,
};
use carely_db::Store;
use carely_llm::Client;
use carely_tui::{AppRuntime, InternalEvent};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

const CHAT_DISABLED: &str = "chat is disabled; set [chat] enabled = true";

pub struct CliRuntime {
    store: Store,
    steps: SimulatedStepSource,
    client: Option<Client>,
    tick_interval: Duration,
}

impl CliRuntime {
    pub fn new(store: Store, client: Option<Client>, tick_interval: Duration) -> Self {
        Self {
            store,
            steps: SimulatedStepSource::new(),
            client,
            tick_interval,
        }
    }
}

impl AppRuntime for CliRuntime {
    fn store(&mut self) -> &mut dyn SettingsStore {
        &mut self.store
    }

    fn step_parts(&mut self) -> (&mut dyn StepSource, &mut dyn SettingsStore) {
        (&mut self.steps, &mut self.store)
    }

    fn sensor_capability(&self) -> SensorCapability {
        self.steps.capability()
    }

    fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    fn chat_enabled(&self) -> bool {
        self.client.is_some()
    }

    fn chat_configured(&self) -> bool {
        self.client
            .as_ref()
            .is_some_and(|client| client.is_configured())
    }

    fn complete_chat(&self, prompt: &str) -> Result<String, CompletionError> {
        match &self.client {
            Some(client) => client.complete(SYSTEM_PROMPT, prompt),
            None => Err(CompletionError::Transport(CHAT_DISABLED.to_owned())),
        }
    }

    fn spawn_chat_request(
        &mut self,
        pending: PendingReply,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name("carely-chat".to_owned())
            .spawn(move || {
                let result = match client {
                    Some(client) => client.complete(SYSTEM_PROMPT, &pending.prompt),
                    None => Err(CompletionError::Transport(CHAT_DISABLED.to_owned())),
                };
                if tx
                    .send(InternalEvent::ChatReply {
                        request_id: pending.request_id,
                        result,
                    })
                    .is_err()
                {
                    tracing::debug!("ui closed before chat reply was delivered");
                }
            })
            .map(|_| ())
            .context("spawn chat worker thread")
    }
}

/// Builds the chat client from config, or `None` when chat is turned off.
pub fn build_client(config: &Config) -> Result<Option<Client>> {
    if !config.chat_enabled() {
        return Ok(None);
    }
    let client = Client::new(
        config.chat_base_url(),
        config.chat_model(),
        config.chat_timeout()?,
    )?
    .with_api_key(config.chat_api_key())
    .with_sampling(config.chat_max_tokens(), config.chat_temperature())?;
    if !client.has_api_key() {
        tracing::info!("chat enabled without [chat] api_key; sends will ask for a key");
    }
    Ok(Some(client))
}
