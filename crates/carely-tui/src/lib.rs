// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use carely_app::{
    Alert, AppCommand, AppEvent, AppState, BookingModel, CANCEL_LABEL, ChatModel,
    CompletionError, DAILY_GOAL, DEFAULT_TICK_INTERVAL, PendingReply, Picker, PickerOutcome,
    Screen, SendStart, SensorCapability, SettingsStore, StepModel, StepSource, WEEK_SLOTS,
    chat_disabled_alert, load_appointments, local_now,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use time::macros::format_description;
use time::{Date, Duration as CalendarDuration, OffsetDateTime};

const STATUS_CLEAR_AFTER: Duration = Duration::from_secs(4);
const IDLE_POLL: Duration = Duration::from_millis(120);
const PROGRESS_CELLS: u32 = 20;
const WEEK_BAR_CELLS: f64 = 24.0;
const MAX_BAR_HEIGHT: f64 = 150.0;
const CHAT_SCROLLBACK: usize = 40;

/// Everything the UI needs from the outside world. Tests swap in fakes.
pub trait AppRuntime {
    fn store(&mut self) -> &mut dyn SettingsStore;

    /// Split borrow used while the step model polls its source.
    fn step_parts(&mut self) -> (&mut dyn StepSource, &mut dyn SettingsStore);

    fn sensor_capability(&self) -> SensorCapability;

    fn tick_interval(&self) -> Duration {
        DEFAULT_TICK_INTERVAL
    }

    /// False when the assistant is switched off entirely, as opposed to
    /// merely missing a credential.
    fn chat_enabled(&self) -> bool {
        true
    }

    fn chat_configured(&self) -> bool;

    fn complete_chat(&self, prompt: &str) -> Result<String, CompletionError>;

    /// Runs the request and reports back through `tx`. The default blocks the
    /// caller; real runtimes move the call onto a worker thread.
    fn spawn_chat_request(
        &mut self,
        pending: PendingReply,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self.complete_chat(&pending.prompt);
        tx.send(InternalEvent::ChatReply {
            request_id: pending.request_id,
            result,
        })
        .map_err(|_| anyhow!("chat reply channel closed"))
    }

    fn now(&self) -> OffsetDateTime {
        local_now()
    }

    fn today(&self) -> Date {
        self.now().date()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    ChatReply {
        request_id: u64,
        result: Result<String, CompletionError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BookingField {
    Doctor,
    Specialty,
    Name,
    Age,
    Phone,
    Date,
    Time,
    Submit,
}

impl BookingField {
    const ALL: [Self; 8] = [
        Self::Doctor,
        Self::Specialty,
        Self::Name,
        Self::Age,
        Self::Phone,
        Self::Date,
        Self::Time,
        Self::Submit,
    ];

    fn position(self) -> usize {
        Self::ALL
            .iter()
            .position(|field| *field == self)
            .unwrap_or_default()
    }

    fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % Self::ALL.len()]
    }

    fn prev(self) -> Self {
        Self::ALL[(self.position() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Doctor => "Doctor",
            Self::Specialty => "Specialty",
            Self::Name => "Name",
            Self::Age => "Age",
            Self::Phone => "Phone",
            Self::Date => "Date",
            Self::Time => "Time",
            Self::Submit => "",
        }
    }

    const fn is_text(self) -> bool {
        matches!(self, Self::Name | Self::Age | Self::Phone)
    }
}

#[derive(Debug)]
struct BookingView {
    model: BookingModel,
    field: BookingField,
    booked: usize,
}

#[derive(Debug)]
struct StepsView {
    model: StepModel,
    today: Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PickerTarget {
    Date,
    Time,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PickerUiState {
    picker: Picker,
    target: PickerTarget,
    cursor: usize,
}

impl PickerUiState {
    fn new(picker: Picker, target: PickerTarget) -> Self {
        Self {
            picker,
            target,
            cursor: 0,
        }
    }

    fn option_count(&self) -> usize {
        self.picker.choices.len() + 1
    }

    fn label_at(&self, index: usize) -> &str {
        self.picker
            .choices
            .get(index)
            .map(String::as_str)
            .unwrap_or(CANCEL_LABEL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AlertUiState {
    alert: Alert,
    back_on_dismiss: bool,
}

#[derive(Debug, Default)]
struct ViewData {
    home_cursor: usize,
    booking: Option<BookingView>,
    steps: Option<StepsView>,
    chat: Option<ChatModel>,
    alert: Option<AlertUiState>,
    picker: Option<PickerUiState>,
    status_token: u64,
    last_chat_request: u64,
    needs_redraw: bool,
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData {
        needs_redraw: true,
        ..ViewData::default()
    };
    let (internal_tx, internal_rx) = mpsc::channel();

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_rx);
        poll_steps(runtime, &mut view_data, Instant::now());
        collect_model_changes(&mut view_data);

        if view_data.needs_redraw {
            if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
                result = Err(error).context("draw frame");
                break;
            }
            view_data.needs_redraw = false;
        }

        let timeout = poll_timeout(&view_data, Instant::now());
        let has_event = match event::poll(timeout).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    view_data.needs_redraw = true;
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(Event::Resize(_, _)) => view_data.needs_redraw = true,
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    if let Some(mut steps) = view_data.steps.take() {
        steps.model.stop_tracking(runtime.store());
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        view_data.needs_redraw = true;
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::ChatReply { request_id, result } => {
                let now = runtime.now();
                let Some(chat) = view_data.chat.as_mut() else {
                    tracing::debug!(request_id, "chat closed before the reply arrived");
                    continue;
                };
                if let Some(alert) = chat.finish_send(request_id, result, runtime.store(), now) {
                    show_alert(view_data, alert, false);
                }
            }
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_AFTER);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn show_alert(view_data: &mut ViewData, alert: Alert, back_on_dismiss: bool) {
    view_data.alert = Some(AlertUiState {
        alert,
        back_on_dismiss,
    });
}

fn poll_steps<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData, now: Instant) {
    let Some(steps) = view_data.steps.as_mut() else {
        return;
    };
    let (source, store) = runtime.step_parts();
    steps.model.poll(now, source, store);
}

fn collect_model_changes(view_data: &mut ViewData) {
    let mut changed = false;
    if let Some(booking) = view_data.booking.as_mut() {
        changed |= !booking.model.take_changes().is_empty();
    }
    if let Some(steps) = view_data.steps.as_mut() {
        changed |= !steps.model.take_changes().is_empty();
    }
    if let Some(chat) = view_data.chat.as_mut() {
        changed |= !chat.take_changes().is_empty();
    }
    if changed {
        view_data.needs_redraw = true;
    }
}

fn poll_timeout(view_data: &ViewData, now: Instant) -> Duration {
    view_data
        .steps
        .as_ref()
        .and_then(|steps| steps.model.time_until_next_tick(now))
        .map_or(IDLE_POLL, |wait| wait.min(IDLE_POLL))
}

fn navigate<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    command: AppCommand,
) {
    for event in state.dispatch(command) {
        match event {
            AppEvent::ScreenOpened(screen) => open_screen(runtime, view_data, screen),
            AppEvent::ScreenClosed(screen) => close_screen(runtime, view_data, screen),
            AppEvent::StatusUpdated(_) | AppEvent::StatusCleared => {}
        }
    }
}

fn open_screen<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData, screen: Screen) {
    tracing::debug!(screen = screen.label(), "opening screen");
    match screen {
        Screen::Home => {}
        Screen::Booking => {
            let booked = load_appointments(&*runtime.store()).len();
            view_data.booking = Some(BookingView {
                model: BookingModel::new(),
                field: BookingField::Doctor,
                booked,
            });
        }
        Screen::Steps => {
            let today = runtime.today();
            let capability = runtime.sensor_capability();
            let interval = runtime.tick_interval();
            let mut model = StepModel::load(runtime.store(), capability, today);
            model.set_tick_interval(interval);
            view_data.steps = Some(StepsView { model, today });
        }
        Screen::Chat => {
            let model = ChatModel::load(&*runtime.store());
            view_data.chat = Some(model.resume_after(view_data.last_chat_request));
        }
    }
}

fn close_screen<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData, screen: Screen) {
    match screen {
        Screen::Home => {}
        Screen::Booking => view_data.booking = None,
        Screen::Steps => {
            if let Some(mut steps) = view_data.steps.take() {
                steps.model.stop_tracking(runtime.store());
            }
        }
        Screen::Chat => {
            if let Some(chat) = view_data.chat.take() {
                view_data.last_chat_request = chat.last_request_id();
            }
        }
    }
    view_data.picker = None;
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('q') {
        return true;
    }
    if view_data.alert.is_some() {
        handle_alert_key(state, runtime, view_data, key);
        return false;
    }
    if view_data.picker.is_some() {
        handle_picker_key(view_data, key);
        return false;
    }

    match state.screen() {
        Screen::Home => return handle_home_key(state, runtime, view_data, key),
        Screen::Booking => handle_booking_key(state, runtime, view_data, key),
        Screen::Steps => handle_steps_key(state, runtime, view_data, key),
        Screen::Chat => handle_chat_key(state, runtime, view_data, internal_tx, key),
    }
    false
}

fn handle_alert_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) {
    if !matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
        return;
    }
    let Some(dismissed) = view_data.alert.take() else {
        return;
    };
    if dismissed.back_on_dismiss {
        navigate(state, runtime, view_data, AppCommand::Back);
    }
}

fn handle_picker_key(view_data: &mut ViewData, key: KeyEvent) {
    let Some(picker) = view_data.picker.as_mut() else {
        return;
    };
    let outcome = match key.code {
        KeyCode::Up | KeyCode::Char('k') => {
            picker.cursor = picker.cursor.saturating_sub(1);
            return;
        }
        KeyCode::Down | KeyCode::Char('j') => {
            picker.cursor = (picker.cursor + 1).min(picker.option_count() - 1);
            return;
        }
        KeyCode::Enter => PickerOutcome::from_label(picker.label_at(picker.cursor)),
        KeyCode::Esc => PickerOutcome::Cancel,
        _ => return,
    };

    let target = picker.target;
    view_data.picker = None;
    let Some(booking) = view_data.booking.as_mut() else {
        return;
    };
    match target {
        PickerTarget::Date => booking.model.choose_date(outcome),
        PickerTarget::Time => booking.model.choose_time(outcome),
    }
}

fn handle_home_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> bool {
    let last = Screen::DESTINATIONS.len() - 1;
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Up | KeyCode::Char('k') => {
            view_data.home_cursor = view_data.home_cursor.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            view_data.home_cursor = (view_data.home_cursor + 1).min(last);
        }
        KeyCode::Enter => {
            let screen = Screen::DESTINATIONS[view_data.home_cursor.min(last)];
            navigate(state, runtime, view_data, AppCommand::Open(screen));
        }
        KeyCode::Char(digit @ '1'..='3') => {
            let index = digit as usize - '1' as usize;
            view_data.home_cursor = index;
            navigate(
                state,
                runtime,
                view_data,
                AppCommand::Open(Screen::DESTINATIONS[index]),
            );
        }
        _ => {}
    }
    false
}

fn handle_booking_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) {
    if key.code == KeyCode::Esc {
        navigate(state, runtime, view_data, AppCommand::Back);
        return;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
        submit_booking(runtime, view_data);
        return;
    }

    let today = runtime.today();
    let Some(view) = view_data.booking.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Tab | KeyCode::Down => view.field = view.field.next(),
        KeyCode::BackTab | KeyCode::Up => view.field = view.field.prev(),
        KeyCode::Left | KeyCode::Right => {
            let forward = key.code == KeyCode::Right;
            match view.field {
                BookingField::Doctor => {
                    let index = cycle(
                        view.model.selected_doctor_index(),
                        view.model.doctors().len(),
                        forward,
                    );
                    view.model.select_doctor(index);
                }
                BookingField::Specialty => {
                    let index = cycle(
                        view.model.selected_specialty_index(),
                        view.model.specialties().len(),
                        forward,
                    );
                    view.model.select_specialty(index);
                }
                _ => {}
            }
        }
        KeyCode::Enter => match view.field {
            BookingField::Date => {
                let picker = view.model.date_picker(today);
                view_data.picker = Some(PickerUiState::new(picker, PickerTarget::Date));
            }
            BookingField::Time => {
                let picker = view.model.time_picker();
                view_data.picker = Some(PickerUiState::new(picker, PickerTarget::Time));
            }
            BookingField::Submit => submit_booking(runtime, view_data),
            _ => view.field = view.field.next(),
        },
        KeyCode::Backspace if view.field.is_text() => {
            let mut value = field_value(&view.model, view.field).to_owned();
            value.pop();
            set_field_value(&mut view.model, view.field, &value);
        }
        KeyCode::Char(ch)
            if view.field.is_text() && !key.modifiers.contains(KeyModifiers::CONTROL) =>
        {
            let mut value = field_value(&view.model, view.field).to_owned();
            value.push(ch);
            set_field_value(&mut view.model, view.field, &value);
        }
        _ => {}
    }
}

fn cycle(index: usize, len: usize, forward: bool) -> usize {
    if len == 0 {
        return 0;
    }
    let index = index.min(len - 1);
    if forward {
        (index + 1) % len
    } else {
        (index + len - 1) % len
    }
}

fn field_value(model: &BookingModel, field: BookingField) -> &str {
    match field {
        BookingField::Name => model.patient_name(),
        BookingField::Age => model.patient_age(),
        BookingField::Phone => model.patient_phone(),
        BookingField::Date => model.selected_date(),
        BookingField::Time => model.selected_time(),
        BookingField::Specialty => model.selected_specialty(),
        BookingField::Doctor | BookingField::Submit => "",
    }
}

fn set_field_value(model: &mut BookingModel, field: BookingField, value: &str) {
    match field {
        BookingField::Name => model.set_patient_name(value),
        BookingField::Age => model.set_patient_age(value),
        BookingField::Phone => model.set_patient_phone(value),
        _ => {}
    }
}

fn submit_booking<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData) {
    let now = runtime.now();
    let Some(view) = view_data.booking.as_mut() else {
        return;
    };
    let outcome = view.model.book_appointment(runtime.store(), now);
    let succeeded = outcome.is_success();
    if succeeded {
        view.booked += 1;
    }
    show_alert(view_data, outcome.alert(), succeeded);
}

fn handle_steps_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) {
    if matches!(key.code, KeyCode::Esc | KeyCode::Char('b')) {
        navigate(state, runtime, view_data, AppCommand::Back);
        return;
    }
    let Some(steps) = view_data.steps.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Char('s') => steps.model.start_tracking(Instant::now()),
        KeyCode::Char('p') | KeyCode::Char('x') => steps.model.stop_tracking(runtime.store()),
        KeyCode::Char('r') => steps.model.reset_steps(runtime.store()),
        _ => {}
    }
}

fn handle_chat_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if key.code == KeyCode::Esc {
        navigate(state, runtime, view_data, AppCommand::Back);
        return;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let Some(chat) = view_data.chat.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Char('l') if ctrl => {
            chat.clear_chat(runtime.store());
            emit_status(state, view_data, internal_tx, "chat history cleared");
        }
        KeyCode::Enter if chat.is_loading() => {
            emit_status(state, view_data, internal_tx, "still waiting for the assistant");
        }
        KeyCode::Enter => send_chat(runtime, view_data, internal_tx),
        KeyCode::Backspace => {
            let mut value = chat.message_input().to_owned();
            value.pop();
            chat.set_message_input(&value);
        }
        KeyCode::Char(ch) if !ctrl => {
            let mut value = chat.message_input().to_owned();
            value.push(ch);
            chat.set_message_input(&value);
        }
        _ => {}
    }
}

fn send_chat<R: AppRuntime>(
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let has_prompt = view_data
        .chat
        .as_ref()
        .is_some_and(|chat| !chat.message_input().trim().is_empty());
    if has_prompt && !runtime.chat_enabled() {
        show_alert(view_data, chat_disabled_alert(), false);
        return;
    }

    let configured = runtime.chat_configured();
    let now = runtime.now();
    let Some(chat) = view_data.chat.as_mut() else {
        return;
    };

    let alert = match chat.begin_send(configured, now) {
        SendStart::Empty => None,
        SendStart::Blocked(alert) => Some(alert),
        SendStart::Pending(pending) => {
            let request_id = pending.request_id;
            match runtime.spawn_chat_request(pending, internal_tx.clone()) {
                Ok(()) => None,
                Err(error) => {
                    tracing::error!("start chat request: {error:#}");
                    let failure = Err(CompletionError::Transport(error.to_string()));
                    chat.finish_send(request_id, failure, runtime.store(), now)
                }
            }
        }
    };
    if let Some(alert) = alert {
        show_alert(view_data, alert, false);
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let header = Paragraph::new(header_text(state))
        .block(Block::default().title("carely").borders(Borders::ALL));
    frame.render_widget(header, layout[0]);

    let body_text = match state.screen() {
        Screen::Home => render_home_text(view_data.home_cursor),
        Screen::Booking => view_data
            .booking
            .as_ref()
            .map(render_booking_text)
            .unwrap_or_default(),
        Screen::Steps => view_data
            .steps
            .as_ref()
            .map(render_steps_text)
            .unwrap_or_default(),
        Screen::Chat => view_data
            .chat
            .as_ref()
            .map(render_chat_text)
            .unwrap_or_default(),
    };
    let body = Paragraph::new(body_text)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(state.screen().label())
                .borders(Borders::ALL),
        );
    frame.render_widget(body, layout[1]);

    let status = Paragraph::new(status_text(state)).style(Style::default().fg(Color::Yellow));
    frame.render_widget(status, layout[2]);

    if let Some(picker) = &view_data.picker {
        let area = centered_rect(50, 60, frame.area());
        frame.render_widget(Clear, area);
        let popup = Paragraph::new(render_picker_text(picker)).block(
            Block::default()
                .title(picker.picker.title.as_str())
                .borders(Borders::ALL),
        );
        frame.render_widget(popup, area);
    }

    if let Some(alert) = &view_data.alert {
        let area = centered_rect(60, 30, frame.area());
        frame.render_widget(Clear, area);
        let popup = Paragraph::new(render_alert_text(&alert.alert))
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(alert.alert.title.as_str())
                    .borders(Borders::ALL),
            );
        frame.render_widget(popup, area);
    }
}

fn header_text(state: &AppState) -> String {
    match state.screen() {
        Screen::Home => "Your health companion".to_owned(),
        screen => format!("Home > {}", screen.label()),
    }
}

fn status_text(state: &AppState) -> String {
    let hints = match state.screen() {
        Screen::Home => "up/down move | enter open | 1-3 jump | q quit",
        Screen::Booking => "tab next field | left/right change | enter pick | ctrl+s book | esc back",
        Screen::Steps => "s start | p pause | r reset | esc back",
        Screen::Chat => "enter send | ctrl+l clear | esc back",
    };
    match &state.status_line {
        Some(status) => format!("{status} | {hints} | ctrl+q quit"),
        None => format!("{hints} | ctrl+q quit"),
    }
}

fn render_home_text(cursor: usize) -> String {
    let mut lines = vec![String::new()];
    for (index, screen) in Screen::DESTINATIONS.iter().enumerate() {
        let marker = if index == cursor { ">" } else { " " };
        lines.push(format!("{marker} {}. {}", index + 1, screen.label()));
    }
    lines.join("\n")
}

fn render_booking_text(view: &BookingView) -> String {
    let model = &view.model;
    let mut lines = Vec::new();
    for field in BookingField::ALL {
        let marker = if field == view.field { ">" } else { " " };
        let line = match field {
            BookingField::Doctor => match model.selected_doctor() {
                Some(doctor) => format!(
                    "{marker} Doctor:    {} {} ({}, {}, rated {})  < >",
                    doctor.icon, doctor.name, doctor.specialty, doctor.experience, doctor.rating
                ),
                None => format!("{marker} Doctor:    none selected  < >"),
            },
            BookingField::Specialty => {
                format!("{marker} Specialty: {}  < >", model.selected_specialty())
            }
            BookingField::Date | BookingField::Time => format!(
                "{marker} {:<10} {}  [enter]",
                format!("{}:", field.label()),
                field_value(model, field)
            ),
            BookingField::Submit => format!("{marker} [ Book Appointment ]"),
            _ => format!(
                "{marker} {:<10} {}",
                format!("{}:", field.label()),
                field_value(model, field)
            ),
        };
        lines.push(line);
    }
    lines.push(String::new());
    lines.push(format!("Booked appointments: {}", view.booked));
    lines.join("\n")
}

fn render_steps_text(view: &StepsView) -> String {
    let model = &view.model;
    let filled = (model.progress_percentage().min(100) * PROGRESS_CELLS / 100) as usize;
    let empty = PROGRESS_CELLS as usize - filled;

    let mut lines = vec![
        format!("Steps today: {} / {}", model.steps_today(), DAILY_GOAL),
        format!(
            "[{}{}] {}%",
            "#".repeat(filled),
            "-".repeat(empty),
            model.progress_percentage()
        ),
        String::new(),
        format!("Calories:       {} kcal", model.calories_burned()),
        format!("Distance:       {} km", model.distance_km()),
        format!("Active minutes: {}", model.active_minutes()),
        String::new(),
        model.status_message().to_owned(),
        String::new(),
        "This week".to_owned(),
    ];

    let weekday = format_description!("[weekday repr:short]");
    for (slot, bar) in model.week_bars().iter().enumerate() {
        let offset = (WEEK_SLOTS - 1 - slot) as i64;
        let day = view.today - CalendarDuration::days(offset);
        let label = day.format(&weekday).unwrap_or_default();
        let cells = (bar.height / MAX_BAR_HEIGHT * WEEK_BAR_CELLS).round() as usize;
        lines.push(format!("{label:<4}{:<24} {}", "█".repeat(cells), bar.steps));
    }
    lines.join("\n")
}

fn render_chat_text(chat: &ChatModel) -> String {
    let mut lines = Vec::new();
    if chat.is_empty() {
        lines.push("Ask me anything about your health.".to_owned());
        lines.push("Replies are general advice, not a substitute for a doctor.".to_owned());
    }
    let skip = chat.messages().len().saturating_sub(CHAT_SCROLLBACK);
    for message in chat.messages().iter().skip(skip) {
        let speaker = if message.is_user { "you" } else { "assistant" };
        lines.push(format!("[{}] {speaker}: {}", message.time, message.text));
    }
    if chat.is_loading() {
        lines.push("assistant is typing...".to_owned());
    }
    lines.push(String::new());
    lines.push(format!("> {}", chat.message_input()));
    lines.join("\n")
}

fn render_picker_text(picker: &PickerUiState) -> String {
    (0..picker.option_count())
        .map(|index| {
            let marker = if index == picker.cursor { ">" } else { " " };
            format!("{marker} {}", picker.label_at(index))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_alert_text(alert: &Alert) -> String {
    format!("{}\n\n[ {} ]", alert.message, alert.ok_label)
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
