// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use time::Date;
use time::format_description::FormatItem;
use time::macros::format_description;

use crate::{Changes, SettingKey, SettingsStore, read_json_or, write_json};

pub const DAILY_GOAL: u32 = 10_000;
pub const HISTORY_DAYS: usize = 7;
pub const WEEK_SLOTS: usize = 7;
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(2);

const TRACKING_STATUS: &str = "🟢 Tracking active — Keep walking!";
const PAUSED_STATUS: &str = "⏸️ Tracking paused.";
const RESET_STATUS: &str = "🔄 Steps reset to zero.";
const GOAL_STATUS: &str = "🎉 Congratulations! Daily goal achieved!";

const MIN_BAR_HEIGHT: f64 = 20.0;
const MAX_BAR_HEIGHT: f64 = 150.0;

const STORED_DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorCapability {
    Available,
    Unavailable,
}

impl SensorCapability {
    pub const fn status_message(self) -> &'static str {
        match self {
            Self::Available => "✅ Step sensor initialized. Ready to track!",
            Self::Unavailable => "⚠️ Step tracking unavailable on this device.",
        }
    }
}

/// Where step increments come from. The tracking loop only schedules; the
/// source decides how many steps each tick contributes.
pub trait StepSource {
    fn capability(&self) -> SensorCapability;
    fn next_increment(&mut self) -> u32;
}

/// Stand-in pedometer yielding 10 to 34 steps per tick.
#[derive(Debug)]
pub struct SimulatedStepSource {
    rng: StdRng,
}

impl SimulatedStepSource {
    pub const MIN_INCREMENT: u32 = 10;
    pub const MAX_INCREMENT: u32 = 34;

    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SimulatedStepSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StepSource for SimulatedStepSource {
    fn capability(&self) -> SensorCapability {
        SensorCapability::Available
    }

    fn next_increment(&mut self) -> u32 {
        self.rng.gen_range(Self::MIN_INCREMENT..=Self::MAX_INCREMENT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepProperty {
    StepsToday,
    ProgressPercentage,
    CaloriesBurned,
    DistanceKm,
    ActiveMinutes,
    IsTracking,
    StatusMessage,
    WeekData,
}

impl StepProperty {
    const METRICS: [Self; 5] = [
        Self::StepsToday,
        Self::ProgressPercentage,
        Self::CaloriesBurned,
        Self::DistanceKm,
        Self::ActiveMinutes,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekBar {
    pub steps: u32,
    pub height: f64,
}

impl WeekBar {
    pub fn new(steps: u32) -> Self {
        Self {
            steps,
            height: bar_height(steps),
        }
    }
}

pub fn bar_height(steps: u32) -> f64 {
    (f64::from(steps) / f64::from(DAILY_GOAL) * MAX_BAR_HEIGHT)
        .clamp(MIN_BAR_HEIGHT, MAX_BAR_HEIGHT)
}

pub fn progress_percentage(steps: u32) -> u32 {
    let percent = (f64::from(steps) / f64::from(DAILY_GOAL) * 100.0).round();
    percent.clamp(0.0, 100.0) as u32
}

pub fn calories_burned(steps: u32) -> u32 {
    (f64::from(steps) * 0.04).round() as u32
}

pub fn distance_km(steps: u32) -> String {
    format!("{:.2}", f64::from(steps) * 0.0008)
}

pub fn active_minutes(steps: u32) -> u32 {
    (f64::from(steps) / 100.0).round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TrackingTimer {
    next_due: Instant,
}

#[derive(Debug)]
pub struct StepModel {
    date: Date,
    steps_today: u32,
    timer: Option<TrackingTimer>,
    tick_interval: Duration,
    status_message: String,
    history: Vec<u32>,
    week: [WeekBar; WEEK_SLOTS],
    changes: Changes<StepProperty>,
}

impl StepModel {
    /// Restores today's count, or rolls the previous day into the week
    /// history when the stored date is not `today`.
    pub fn load<S: SettingsStore + ?Sized>(
        store: &mut S,
        capability: SensorCapability,
        today: Date,
    ) -> Self {
        let stored_date = read_stored_date(store);
        let mut history: Vec<u32> = read_json_or(store, SettingKey::WeekHistory, Vec::new());

        let steps_today = if stored_date == Some(today) {
            read_stored_steps(store)
        } else {
            let stored_steps = read_stored_steps(store);
            let archived = match stored_date {
                Some(previous) => {
                    archive_day(&mut history, previous, today, stored_steps);
                    true
                }
                // Unreadable date: keep the count but there is no gap to pad.
                None if stored_steps > 0 => {
                    history.insert(0, stored_steps);
                    history.truncate(HISTORY_DAYS);
                    true
                }
                None => false,
            };
            if archived
                && let Err(error) = write_json(store, SettingKey::WeekHistory, &history)
            {
                tracing::error!("save week history failed: {error:#}");
            }
            if let Err(error) = save_count(store, today, 0) {
                tracing::error!("reset daily count failed: {error:#}");
            }
            tracing::debug!(%today, archived, "started new step day");
            0
        };

        let mut model = Self {
            date: today,
            steps_today,
            timer: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
            status_message: capability.status_message().to_owned(),
            history,
            week: [WeekBar::new(0); WEEK_SLOTS],
            changes: Changes::default(),
        };
        model.rebuild_week();
        model
    }

    pub fn steps_today(&self) -> u32 {
        self.steps_today
    }

    pub fn daily_goal(&self) -> u32 {
        DAILY_GOAL
    }

    pub fn progress_percentage(&self) -> u32 {
        progress_percentage(self.steps_today)
    }

    pub fn calories_burned(&self) -> u32 {
        calories_burned(self.steps_today)
    }

    pub fn distance_km(&self) -> String {
        distance_km(self.steps_today)
    }

    pub fn active_minutes(&self) -> u32 {
        active_minutes(self.steps_today)
    }

    pub fn is_tracking(&self) -> bool {
        self.timer.is_some()
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    /// Archived daily totals, most recent first.
    pub fn history(&self) -> &[u32] {
        &self.history
    }

    /// Oldest day first; the last slot is today.
    pub fn week_bars(&self) -> &[WeekBar; WEEK_SLOTS] {
        &self.week
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Takes effect the next time tracking starts. Zero is ignored.
    pub fn set_tick_interval(&mut self, interval: Duration) {
        if interval.is_zero() {
            tracing::warn!("ignoring zero step tick interval");
            return;
        }
        self.tick_interval = interval;
    }

    pub fn take_changes(&mut self) -> Vec<StepProperty> {
        self.changes.drain()
    }

    pub fn start_tracking(&mut self, now: Instant) {
        if self.is_tracking() {
            return;
        }
        self.timer = Some(TrackingTimer {
            next_due: now + self.tick_interval,
        });
        self.set_status(TRACKING_STATUS);
        self.changes.notify(StepProperty::IsTracking);
        tracing::debug!(
            interval_ms = self.tick_interval.as_millis() as u64,
            "step tracking started"
        );
    }

    pub fn stop_tracking<S: SettingsStore + ?Sized>(&mut self, store: &mut S) {
        if self.timer.take().is_none() {
            return;
        }
        self.persist(store);
        self.set_status(PAUSED_STATUS);
        self.changes.notify(StepProperty::IsTracking);
        tracing::debug!(steps = self.steps_today, "step tracking stopped");
    }

    pub fn reset_steps<S: SettingsStore + ?Sized>(&mut self, store: &mut S) {
        self.stop_tracking(store);
        self.steps_today = 0;
        self.persist(store);
        self.refresh_today();
        self.set_status(RESET_STATUS);
        self.changes.notify_all(&StepProperty::METRICS);
        self.changes.notify(StepProperty::IsTracking);
    }

    /// Runs one tick if the armed timer is due, then re-arms it. Returns
    /// whether a tick ran.
    pub fn poll<S, P>(&mut self, now: Instant, source: &mut P, store: &mut S) -> bool
    where
        S: SettingsStore + ?Sized,
        P: StepSource + ?Sized,
    {
        let Some(timer) = self.timer.as_mut() else {
            return false;
        };
        if now < timer.next_due {
            return false;
        }
        timer.next_due = now + self.tick_interval;
        self.tick(source, store);
        true
    }

    pub fn time_until_next_tick(&self, now: Instant) -> Option<Duration> {
        self.timer.map(|timer| timer.next_due.saturating_duration_since(now))
    }

    pub fn tick<S, P>(&mut self, source: &mut P, store: &mut S)
    where
        S: SettingsStore + ?Sized,
        P: StepSource + ?Sized,
    {
        let before = self.steps_today;
        self.steps_today = before.saturating_add(source.next_increment());
        self.persist(store);
        self.refresh_today();
        self.changes.notify_all(&StepProperty::METRICS);

        if before < DAILY_GOAL && self.steps_today >= DAILY_GOAL {
            tracing::info!(steps = self.steps_today, "daily step goal reached");
            self.set_status(GOAL_STATUS);
        }
    }

    fn set_status(&mut self, message: &str) {
        self.status_message = message.to_owned();
        self.changes.notify(StepProperty::StatusMessage);
    }

    fn persist<S: SettingsStore + ?Sized>(&self, store: &mut S) {
        if let Err(error) = save_count(store, self.date, self.steps_today) {
            tracing::error!("save steps failed: {error:#}");
        }
    }

    fn refresh_today(&mut self) {
        self.week[WEEK_SLOTS - 1] = WeekBar::new(self.steps_today);
        self.changes.notify(StepProperty::WeekData);
    }

    fn rebuild_week(&mut self) {
        let archived = WEEK_SLOTS - 1;
        for slot in 0..archived {
            let age = archived - 1 - slot;
            let steps = self.history.get(age).copied().unwrap_or(0);
            self.week[slot] = WeekBar::new(steps);
        }
        self.week[archived] = WeekBar::new(self.steps_today);
    }
}

/// Pushes `steps` for `previous` onto the front of `history`, followed by a
/// zero for every day between `previous` and `today`.
fn archive_day(history: &mut Vec<u32>, previous: Date, today: Date, steps: u32) {
    history.insert(0, steps);
    let gap = (today - previous).whole_days() - 1;
    let skipped = usize::try_from(gap).unwrap_or(0).min(HISTORY_DAYS);
    for _ in 0..skipped {
        history.insert(0, 0);
    }
    history.truncate(HISTORY_DAYS);
}

fn read_stored_date<S: SettingsStore + ?Sized>(store: &S) -> Option<Date> {
    let raw = match store.get_string(SettingKey::StepCountDate) {
        Ok(raw) => raw?,
        Err(error) => {
            tracing::error!("read step date failed: {error:#}");
            return None;
        }
    };
    match Date::parse(raw.trim(), STORED_DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(error) => {
            tracing::warn!(value = %raw, "stored step date is not YYYY-MM-DD: {error}");
            None
        }
    }
}

fn read_stored_steps<S: SettingsStore + ?Sized>(store: &S) -> u32 {
    match store.get_number(SettingKey::TodaySteps) {
        Ok(Some(value)) if value.is_finite() && value > 0.0 => value.round() as u32,
        Ok(_) => 0,
        Err(error) => {
            tracing::warn!("stored step count is unreadable: {error:#}");
            0
        }
    }
}

fn save_count<S: SettingsStore + ?Sized>(store: &mut S, date: Date, steps: u32) -> Result<()> {
    let date = date.format(STORED_DATE_FORMAT).context("format step date")?;
    store.set_number(SettingKey::TodaySteps, f64::from(steps))?;
    store.set_string(SettingKey::StepCountDate, &date)
}
