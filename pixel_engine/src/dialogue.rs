//! Typewriter dialogue box with timed input locks and choice navigation.
//!
//! A [`DialogueSystem`] owns at most one session. Transitions never call back
//! into their caller; instead they return [`Followup`] descriptors which the
//! scene applies once the dialogue has finished mutating itself.

use log::debug;
use serde::Serialize;

use crate::config::{DEFAULT_INPUT_LOCK_MS, DEFAULT_REVEAL_PERIOD_MS};
use crate::host::HostServices;
use crate::input::{Button, Listener, ListenerId};
use crate::timer::{TimerEvent, TimerHandle};
use crate::types::ActorId;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DialogueTiming {
    pub reveal_period_ms: u64,
    pub settle_lock_ms: u64,
    pub skip_lock_ms: u64,
}

impl Default for DialogueTiming {
    fn default() -> Self {
        Self {
            reveal_period_ms: DEFAULT_REVEAL_PERIOD_MS,
            settle_lock_ms: DEFAULT_INPUT_LOCK_MS,
            skip_lock_ms: DEFAULT_INPUT_LOCK_MS,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DialoguePhase {
    Idle,
    Revealing,
    AwaitingInput,
    AwaitingChoice,
}

/// What selecting a choice asks the scene to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChoiceAction {
    /// Advance `actor`'s conversation to `next`, or end it when absent.
    Follow { actor: ActorId, next: Option<String> },
}

/// What closing a session asks the scene to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompletionHook {
    EndConversation { actor: ActorId, leaf: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "followup", rename_all = "snake_case")]
pub enum Followup {
    Complete(CompletionHook),
    Select(ChoiceAction),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub action: ChoiceAction,
}

impl Choice {
    pub fn new(label: impl Into<String>, action: ChoiceAction) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueRequest {
    pub text: String,
    pub speaker: Option<String>,
    pub choices: Vec<Choice>,
    pub completion: Option<CompletionHook>,
}

impl DialogueRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speaker: None,
            choices: Vec::new(),
            completion: None,
        }
    }

    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    pub fn with_choice(mut self, choice: Choice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn with_choices<C>(mut self, choices: C) -> Self
    where
        C: IntoIterator<Item = Choice>,
    {
        self.choices.extend(choices);
        self
    }

    pub fn on_complete(mut self, hook: CompletionHook) -> Self {
        self.completion = Some(hook);
        self
    }
}

#[derive(Debug)]
struct DialogueSession {
    text: String,
    char_count: usize,
    revealed: usize,
    speaker: Option<String>,
    choices: Vec<Choice>,
    selected: usize,
    phase: DialoguePhase,
    input_locked: bool,
    completion: Option<CompletionHook>,
    reveal_timer: Option<TimerHandle>,
    unlock_timer: Option<TimerHandle>,
    listeners: Vec<ListenerId>,
}

impl DialogueSession {
    fn displayed_text(&self) -> &str {
        match self.text.char_indices().nth(self.revealed) {
            Some((byte_offset, _)) => &self.text[..byte_offset],
            None => &self.text,
        }
    }

    fn choice_labels(&self) -> Vec<String> {
        self.choices.iter().map(|choice| choice.label.clone()).collect()
    }

    fn render_choices(&self, host: &mut HostServices<'_>) {
        host.presentation
            .render_choices(&self.choice_labels(), self.selected);
    }

    /// Stops the typewriter and moves to whichever awaiting phase applies.
    fn finish_reveal(&mut self, host: &mut HostServices<'_>) {
        if let Some(handle) = self.reveal_timer.take() {
            host.timers.cancel(handle);
        }
        self.revealed = self.char_count;
        if self.choices.is_empty() {
            self.phase = DialoguePhase::AwaitingInput;
        } else {
            self.phase = DialoguePhase::AwaitingChoice;
            self.render_choices(host);
        }
    }

    fn lock_input(&mut self, duration_ms: u64, host: &mut HostServices<'_>) {
        if let Some(handle) = self.unlock_timer.take() {
            host.timers.cancel(handle);
        }
        self.input_locked = true;
        self.unlock_timer = Some(host.timers.schedule_once(duration_ms, TimerEvent::InputUnlock));
    }
}

/// Owner of the single active-session slot.
#[derive(Debug, Default)]
pub struct DialogueSystem {
    timing: DialogueTiming,
    session: Option<DialogueSession>,
    sessions_opened: u64,
}

impl DialogueSystem {
    pub fn new(timing: DialogueTiming) -> Self {
        Self {
            timing,
            session: None,
            sessions_opened: 0,
        }
    }

    pub fn timing(&self) -> DialogueTiming {
        self.timing
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn phase(&self) -> DialoguePhase {
        self.session
            .as_ref()
            .map(|session| session.phase)
            .unwrap_or(DialoguePhase::Idle)
    }

    pub fn is_input_locked(&self) -> bool {
        self.session
            .as_ref()
            .map(|session| session.input_locked)
            .unwrap_or(false)
    }

    /// Revealed prefix of the current text; empty when idle.
    pub fn displayed_text(&self) -> &str {
        self.session
            .as_ref()
            .map(|session| session.displayed_text())
            .unwrap_or("")
    }

    pub fn full_text(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.text.as_str())
    }

    pub fn revealed_len(&self) -> usize {
        self.session
            .as_ref()
            .map(|session| session.revealed)
            .unwrap_or(0)
    }

    pub fn speaker(&self) -> Option<&str> {
        self.session.as_ref()?.speaker.as_deref()
    }

    pub fn selected_choice(&self) -> Option<usize> {
        let session = self.session.as_ref()?;
        (!session.choices.is_empty()).then_some(session.selected)
    }

    pub fn choice_labels(&self) -> Vec<String> {
        self.session
            .as_ref()
            .map(|session| session.choice_labels())
            .unwrap_or_default()
    }

    pub fn sessions_opened(&self) -> u64 {
        self.sessions_opened
    }

    /// Opens a session, force-closing the current one first. The returned
    /// follow-ups belong to the preempted session.
    pub fn show(&mut self, request: DialogueRequest, host: &mut HostServices<'_>) -> Vec<Followup> {
        let followups = self.hide(host);

        let DialogueRequest {
            text,
            speaker,
            choices,
            completion,
        } = request;

        host.presentation
            .open_text_box(speaker.as_deref(), !choices.is_empty());
        let listeners = [Button::Confirm, Button::Up, Button::Down]
            .into_iter()
            .map(|button| host.input.subscribe(button, Listener::Dialogue))
            .collect();

        let mut session = DialogueSession {
            char_count: text.chars().count(),
            text,
            revealed: 0,
            speaker,
            choices,
            selected: 0,
            phase: DialoguePhase::Revealing,
            input_locked: false,
            completion,
            reveal_timer: None,
            unlock_timer: None,
            listeners,
        };
        session.lock_input(self.timing.settle_lock_ms, host);
        host.presentation.render_text("");

        if session.char_count == 0 {
            session.finish_reveal(host);
        } else {
            session.reveal_timer = Some(
                host.timers
                    .schedule_repeating(self.timing.reveal_period_ms, TimerEvent::RevealTick),
            );
        }

        self.sessions_opened += 1;
        debug!(
            "dialogue.show #{} ({} chars, {} choices)",
            self.sessions_opened,
            session.char_count,
            session.choices.len()
        );
        self.session = Some(session);
        followups
    }

    pub fn on_reveal_tick(&mut self, handle: TimerHandle, host: &mut HostServices<'_>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.reveal_timer != Some(handle) {
            return;
        }

        session.revealed = (session.revealed + 1).min(session.char_count);
        host.presentation.render_text(session.displayed_text());
        if session.revealed >= session.char_count {
            session.finish_reveal(host);
        }
    }

    pub fn on_input_unlock(&mut self, handle: TimerHandle) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.unlock_timer == Some(handle) {
            session.unlock_timer = None;
            session.input_locked = false;
        }
    }

    pub fn on_confirm(&mut self, host: &mut HostServices<'_>) -> Vec<Followup> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        if session.input_locked {
            debug!("dialogue.confirm ignored (input locked)");
            return Vec::new();
        }

        match session.phase {
            DialoguePhase::Revealing => {
                session.revealed = session.char_count;
                host.presentation.render_text(&session.text);
                session.finish_reveal(host);
                session.lock_input(self.timing.skip_lock_ms, host);
                Vec::new()
            }
            DialoguePhase::AwaitingChoice => {
                let action = session
                    .choices
                    .get(session.selected)
                    .map(|choice| choice.action.clone());
                let mut followups = self.hide(host);
                followups.extend(action.map(Followup::Select));
                followups
            }
            DialoguePhase::AwaitingInput => self.hide(host),
            DialoguePhase::Idle => Vec::new(),
        }
    }

    pub fn on_up(&mut self, host: &mut HostServices<'_>) {
        self.move_selection(host, |selected, _| selected.saturating_sub(1));
    }

    pub fn on_down(&mut self, host: &mut HostServices<'_>) {
        self.move_selection(host, |selected, last| (selected + 1).min(last));
    }

    fn move_selection<F>(&mut self, host: &mut HostServices<'_>, step: F)
    where
        F: FnOnce(usize, usize) -> usize,
    {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.input_locked || session.phase != DialoguePhase::AwaitingChoice {
            return;
        }
        let last = session.choices.len().saturating_sub(1);
        session.selected = step(session.selected, last).min(last);
        session.render_choices(host);
    }

    /// Closes the session and releases its timers and listeners. Calling it
    /// again, or while idle, does nothing.
    pub fn hide(&mut self, host: &mut HostServices<'_>) -> Vec<Followup> {
        let Some(mut session) = self.session.take() else {
            return Vec::new();
        };

        for handle in [session.reveal_timer.take(), session.unlock_timer.take()]
            .into_iter()
            .flatten()
        {
            host.timers.cancel(handle);
        }
        for id in session.listeners.drain(..) {
            host.input.unsubscribe(id);
        }
        host.presentation.close_text_box();

        session
            .completion
            .take()
            .map(Followup::Complete)
            .into_iter()
            .collect()
    }
}
