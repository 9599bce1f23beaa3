// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use carely_app::{CompletionBackend, CompletionError, SensorCapability, StepSource};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use time::macros::{date, datetime};
use time::{Date, OffsetDateTime};

const FIRST_NAMES: [&str; 16] = [
    "Avery", "Jordan", "Taylor", "Riley", "Morgan", "Casey", "Alex", "Quinn", "Parker", "Drew",
    "Kai", "Elliot", "Robin", "Cameron", "Hayden", "Rowan",
];
const LAST_NAMES: [&str; 18] = [
    "Walker", "Martin", "Hill", "Evans", "Lopez", "Gray", "Ward", "Young", "Diaz", "Reed",
    "Campbell", "Turner", "Flores", "Bennett", "Price", "Morris", "Foster", "Brooks",
];

const HEALTH_QUESTIONS: [&str; 10] = [
    "How much water should I drink each day?",
    "What are early signs of dehydration?",
    "Is it safe to exercise with a mild cold?",
    "How many hours of sleep do adults need?",
    "What can help with tension headaches?",
    "How do I lower my resting heart rate?",
    "Which foods are high in iron?",
    "How often should I stretch during desk work?",
    "What is a healthy daily step count?",
    "When should I see a doctor about back pain?",
];

struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn range_u32(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        let span = u64::from(max - min) + 1;
        min + (self.next_u64() % span) as u32
    }
}

/// Patient details as typed into the booking form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientDraft {
    pub name: String,
    pub age: String,
    pub phone: String,
}

pub struct PatientFaker {
    rng: DeterministicRng,
    seed: u64,
}

impl PatientFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn patient(&mut self) -> PatientDraft {
        let name = format!("{} {}", self.pick(&FIRST_NAMES), self.pick(&LAST_NAMES));
        let age = self.rng.range_u32(18, 90).to_string();
        let phone = format!(
            "({}) {}-{:04}",
            self.rng.range_u32(200, 989),
            self.rng.range_u32(200, 999),
            self.rng.range_u32(0, 9999)
        );
        PatientDraft { name, age, phone }
    }

    pub fn health_question(&mut self) -> String {
        self.pick(&HEALTH_QUESTIONS).to_owned()
    }

    /// Archived daily totals, most recent first.
    pub fn step_history(&mut self, days: usize) -> Vec<u32> {
        (0..days).map(|_| self.rng.range_u32(2_000, 10_000)).collect()
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Result<String, CompletionError>>,
    prompts: Vec<(String, String)>,
}

/// Completion backend that answers from a queue and records every request.
/// Clones share the same queue.
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    configured: bool,
    script: Arc<Mutex<Script>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            configured: true,
            script: Arc::new(Mutex::new(Script::default())),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    pub fn with_reply(self, reply: &str) -> Self {
        self.push(Ok(reply.to_owned()));
        self
    }

    pub fn with_error(self, error: CompletionError) -> Self {
        self.push(Err(error));
        self
    }

    pub fn push(&self, result: Result<String, CompletionError>) {
        self.lock().replies.push_back(result);
    }

    /// User messages received so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.lock()
            .prompts
            .iter()
            .map(|(_, user)| user.clone())
            .collect()
    }

    pub fn system_prompts(&self) -> Vec<String> {
        self.lock()
            .prompts
            .iter()
            .map(|(system, _)| system.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.lock().prompts.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CompletionBackend for ScriptedBackend {
    fn is_configured(&self) -> bool {
        self.configured
    }

    fn complete(&self, system_prompt: &str, user_message: &str) -> Result<String, CompletionError> {
        let mut script = self.lock();
        script
            .prompts
            .push((system_prompt.to_owned(), user_message.to_owned()));
        script
            .replies
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::Transport("no scripted reply".to_owned())))
    }
}

/// Step source that yields the same increment on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedStepSource {
    pub increment: u32,
    pub capability: SensorCapability,
    pub ticks: usize,
}

impl FixedStepSource {
    pub fn new(increment: u32) -> Self {
        Self {
            increment,
            capability: SensorCapability::Available,
            ticks: 0,
        }
    }

    pub fn unavailable(increment: u32) -> Self {
        Self {
            capability: SensorCapability::Unavailable,
            ..Self::new(increment)
        }
    }
}

impl StepSource for FixedStepSource {
    fn capability(&self) -> SensorCapability {
        self.capability
    }

    fn next_increment(&mut self) -> u32 {
        self.ticks += 1;
        self.increment
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("carely.db");
    Ok((dir, db_path))
}

pub fn fixture_date() -> Date {
    date!(2026 - 02 - 19)
}

pub fn fixture_datetime() -> OffsetDateTime {
    datetime!(2026-02-19 12:34:56 UTC)
}
