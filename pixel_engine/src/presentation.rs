use std::{cell::RefCell, rc::Rc};

use serde::Serialize;

use crate::types::ActorId;

/// Marker drawn above an actor the player can interact with.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKind {
    /// `!` over NPCs.
    Talk,
    /// `?` over props.
    Inspect,
}

impl IndicatorKind {
    pub fn glyph(&self) -> char {
        match self {
            IndicatorKind::Talk => '!',
            IndicatorKind::Inspect => '?',
        }
    }
}

/// Fire-and-forget rendering calls made by the interaction core.
pub trait PresentationSink {
    fn open_text_box(&self, speaker: Option<&str>, with_choices: bool);
    fn render_text(&self, text: &str);
    fn render_choices(&self, labels: &[String], selected: usize);
    fn close_text_box(&self);
    fn set_indicator(&self, actor: ActorId, kind: IndicatorKind, visible: bool);
}

/// Formats one choice line, marking the selected entry.
pub fn choice_line(label: &str, selected: bool) -> String {
    format!("{}{}", if selected { "> " } else { "  " }, label)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PresentationEvent {
    OpenTextBox {
        speaker: Option<String>,
        with_choices: bool,
    },
    RenderText {
        text: String,
    },
    RenderChoices {
        labels: Vec<String>,
        selected: usize,
    },
    CloseTextBox,
    Indicator {
        actor: ActorId,
        indicator: IndicatorKind,
        visible: bool,
    },
}

#[derive(Clone, Default)]
pub struct RecordingPresentation {
    events: Rc<RefCell<Vec<PresentationEvent>>>,
}

impl RecordingPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PresentationEvent> {
        self.events.borrow().clone()
    }

    /// Text of the most recent render, if the box has not been closed since.
    pub fn visible_text(&self) -> Option<String> {
        for event in self.events.borrow().iter().rev() {
            match event {
                PresentationEvent::RenderText { text } => return Some(text.clone()),
                PresentationEvent::CloseTextBox | PresentationEvent::OpenTextBox { .. } => {
                    return None
                }
                _ => {}
            }
        }
        None
    }
}

impl PresentationSink for RecordingPresentation {
    fn open_text_box(&self, speaker: Option<&str>, with_choices: bool) {
        self.events
            .borrow_mut()
            .push(PresentationEvent::OpenTextBox {
                speaker: speaker.map(|value| value.to_string()),
                with_choices,
            });
    }

    fn render_text(&self, text: &str) {
        self.events.borrow_mut().push(PresentationEvent::RenderText {
            text: text.to_string(),
        });
    }

    fn render_choices(&self, labels: &[String], selected: usize) {
        self.events
            .borrow_mut()
            .push(PresentationEvent::RenderChoices {
                labels: labels.to_vec(),
                selected,
            });
    }

    fn close_text_box(&self) {
        self.events.borrow_mut().push(PresentationEvent::CloseTextBox);
    }

    fn set_indicator(&self, actor: ActorId, kind: IndicatorKind, visible: bool) {
        self.events.borrow_mut().push(PresentationEvent::Indicator {
            actor,
            indicator: kind,
            visible,
        });
    }
}

#[derive(Debug, Default)]
struct ConsoleState {
    speaker: Option<String>,
    text: String,
    text_printed: bool,
}

/// Prints a readable transcript to stdout. Partial typewriter frames are not
/// echoed; text is printed once it is final (choices shown or box closed).
#[derive(Debug, Default)]
pub struct ConsolePresentation {
    state: RefCell<ConsoleState>,
}

impl ConsolePresentation {
    pub fn new() -> Self {
        Self::default()
    }

    fn flush_text(state: &mut ConsoleState) {
        if state.text_printed || state.text.is_empty() {
            return;
        }
        match state.speaker.as_deref() {
            Some(speaker) => println!("[{speaker}] {}", state.text),
            None => println!("{}", state.text),
        }
        state.text_printed = true;
    }
}

impl PresentationSink for ConsolePresentation {
    fn open_text_box(&self, speaker: Option<&str>, _with_choices: bool) {
        let mut state = self.state.borrow_mut();
        *state = ConsoleState {
            speaker: speaker.map(|value| value.to_string()),
            ..ConsoleState::default()
        };
    }

    fn render_text(&self, text: &str) {
        let mut state = self.state.borrow_mut();
        state.text = text.to_string();
        state.text_printed = false;
    }

    fn render_choices(&self, labels: &[String], selected: usize) {
        let mut state = self.state.borrow_mut();
        Self::flush_text(&mut state);
        for (index, label) in labels.iter().enumerate() {
            println!("    {}", choice_line(label, index == selected));
        }
    }

    fn close_text_box(&self) {
        let mut state = self.state.borrow_mut();
        Self::flush_text(&mut state);
        *state = ConsoleState::default();
    }

    fn set_indicator(&self, actor: ActorId, kind: IndicatorKind, visible: bool) {
        if visible {
            println!("  ({} near {actor})", kind.glyph());
        }
    }
}

/// Forwards every call to each inner sink in order.
#[derive(Default)]
pub struct FanoutPresentation {
    sinks: Vec<Rc<dyn PresentationSink>>,
}

impl FanoutPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Rc<dyn PresentationSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl PresentationSink for FanoutPresentation {
    fn open_text_box(&self, speaker: Option<&str>, with_choices: bool) {
        for sink in &self.sinks {
            sink.open_text_box(speaker, with_choices);
        }
    }

    fn render_text(&self, text: &str) {
        for sink in &self.sinks {
            sink.render_text(text);
        }
    }

    fn render_choices(&self, labels: &[String], selected: usize) {
        for sink in &self.sinks {
            sink.render_choices(labels, selected);
        }
    }

    fn close_text_box(&self) {
        for sink in &self.sinks {
            sink.close_text_box();
        }
    }

    fn set_indicator(&self, actor: ActorId, kind: IndicatorKind, visible: bool) {
        for sink in &self.sinks {
            sink.set_indicator(actor, kind, visible);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_presentation_tracks_events() {
        let sink = RecordingPresentation::new();
        sink.open_text_box(Some("Villager"), true);
        sink.render_text("Hi");
        sink.render_choices(&["Yes".to_string(), "No".to_string()], 1);
        sink.set_indicator(ActorId(0), IndicatorKind::Talk, false);
        assert_eq!(sink.visible_text().as_deref(), Some("Hi"));
        sink.close_text_box();

        assert_eq!(
            sink.events(),
            vec![
                PresentationEvent::OpenTextBox {
                    speaker: Some("Villager".to_string()),
                    with_choices: true,
                },
                PresentationEvent::RenderText {
                    text: "Hi".to_string(),
                },
                PresentationEvent::RenderChoices {
                    labels: vec!["Yes".to_string(), "No".to_string()],
                    selected: 1,
                },
                PresentationEvent::Indicator {
                    actor: ActorId(0),
                    indicator: IndicatorKind::Talk,
                    visible: false,
                },
                PresentationEvent::CloseTextBox,
            ]
        );
        assert_eq!(sink.visible_text(), None);
    }

    #[test]
    fn fanout_reaches_every_sink() {
        let first = RecordingPresentation::new();
        let second = RecordingPresentation::new();
        let fanout = FanoutPresentation::new()
            .with(Rc::new(first.clone()))
            .with(Rc::new(second.clone()));
        fanout.open_text_box(None, false);
        fanout.render_text("Hey");
        assert_eq!(first.events(), second.events());
        assert_eq!(first.visible_text().as_deref(), Some("Hey"));
    }

    #[test]
    fn choice_lines_mark_the_selection() {
        assert_eq!(choice_line("Ask", true), "> Ask");
        assert_eq!(choice_line("Leave", false), "  Leave");
    }
}
