// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::Screen;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    stack: Vec<Screen>,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            stack: vec![Screen::Home],
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Open(Screen),
    Back,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ScreenOpened(Screen),
    ScreenClosed(Screen),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn screen(&self) -> Screen {
        self.stack.last().copied().unwrap_or(Screen::Home)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::Open(screen) => {
                if screen == self.screen() {
                    return Vec::new();
                }
                self.stack.push(screen);
                vec![AppEvent::ScreenOpened(screen)]
            }
            AppCommand::Back => {
                if self.stack.len() <= 1 {
                    return Vec::new();
                }
                let closed = self.stack.pop().unwrap_or(Screen::Home);
                vec![AppEvent::ScreenClosed(closed)]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppState};
    use crate::Screen;

    #[test]
    fn starts_on_home() {
        let state = AppState::default();
        assert_eq!(state.screen(), Screen::Home);
        assert_eq!(state.depth(), 1);
    }

    #[test]
    fn open_pushes_and_back_pops() {
        let mut state = AppState::default();

        let opened = state.dispatch(AppCommand::Open(Screen::Chat));
        assert_eq!(opened, vec![AppEvent::ScreenOpened(Screen::Chat)]);
        assert_eq!(state.screen(), Screen::Chat);

        let closed = state.dispatch(AppCommand::Back);
        assert_eq!(closed, vec![AppEvent::ScreenClosed(Screen::Chat)]);
        assert_eq!(state.screen(), Screen::Home);
    }

    #[test]
    fn back_on_home_is_a_no_op() {
        let mut state = AppState::default();
        assert!(state.dispatch(AppCommand::Back).is_empty());
        assert_eq!(state.screen(), Screen::Home);
    }

    #[test]
    fn reopening_current_screen_does_not_grow_history() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::Open(Screen::Steps));
        assert!(state.dispatch(AppCommand::Open(Screen::Steps)).is_empty());
        assert_eq!(state.depth(), 2);
    }

    #[test]
    fn status_set_and_clear() {
        let mut state = AppState::default();

        let events = state.dispatch(AppCommand::SetStatus("saved".to_owned()));
        assert_eq!(events, vec![AppEvent::StatusUpdated("saved".to_owned())]);
        assert_eq!(state.status_line.as_deref(), Some("saved"));

        state.dispatch(AppCommand::ClearStatus);
        assert_eq!(state.status_line, None);
    }
}
