use log::debug;
use serde::Serialize;

use crate::dialogue::{DialogueRequest, DialogueSystem, Followup};
use crate::error::GraphIntegrityError;
use crate::host::HostServices;
use crate::npc::NpcConversation;
use crate::presentation::{IndicatorKind, PresentationSink};
use crate::types::{ActorId, Position};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum Interaction {
    /// A session opened; `preempted` holds follow-ups of the session it replaced.
    Started { preempted: Vec<Followup> },
    Ignored(IgnoreReason),
}

impl Interaction {
    pub fn started() -> Self {
        Interaction::Started {
            preempted: Vec::new(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    SessionActive,
    AlreadyInteracting,
}

/// Static interactable: shows one fixed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prop {
    pub message: String,
}

#[derive(Debug, Clone)]
pub enum ActorKind {
    Npc(NpcConversation),
    Prop(Prop),
}

#[derive(Debug, Clone)]
pub struct Actor {
    id: ActorId,
    name: String,
    position: Position,
    indicator_visible: bool,
    kind: ActorKind,
}

impl Actor {
    pub fn npc(id: ActorId, position: Position, conversation: NpcConversation) -> Self {
        Self {
            id,
            name: conversation.name().to_string(),
            position,
            indicator_visible: false,
            kind: ActorKind::Npc(conversation),
        }
    }

    pub fn prop(
        id: ActorId,
        name: impl Into<String>,
        position: Position,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            indicator_visible: false,
            kind: ActorKind::Prop(Prop {
                message: message.into(),
            }),
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn kind(&self) -> &ActorKind {
        &self.kind
    }

    pub fn is_npc(&self) -> bool {
        matches!(self.kind, ActorKind::Npc(_))
    }

    pub fn as_npc(&self) -> Option<&NpcConversation> {
        match &self.kind {
            ActorKind::Npc(conversation) => Some(conversation),
            ActorKind::Prop(_) => None,
        }
    }

    pub fn as_npc_mut(&mut self) -> Option<&mut NpcConversation> {
        match &mut self.kind {
            ActorKind::Npc(conversation) => Some(conversation),
            ActorKind::Prop(_) => None,
        }
    }

    pub fn indicator_kind(&self) -> IndicatorKind {
        match self.kind {
            ActorKind::Npc(_) => IndicatorKind::Talk,
            ActorKind::Prop(_) => IndicatorKind::Inspect,
        }
    }

    pub fn indicator_visible(&self) -> bool {
        self.indicator_visible
    }

    /// NPCs keep their marker hidden while a conversation is running.
    pub fn show_indicator(&mut self, sink: &dyn PresentationSink) {
        if self.as_npc().is_some_and(NpcConversation::is_interacting) {
            return;
        }
        self.set_indicator(true, sink);
    }

    pub fn hide_indicator(&mut self, sink: &dyn PresentationSink) {
        self.set_indicator(false, sink);
    }

    fn set_indicator(&mut self, visible: bool, sink: &dyn PresentationSink) {
        if self.indicator_visible != visible {
            self.indicator_visible = visible;
            sink.set_indicator(self.id, self.indicator_kind(), visible);
        }
    }

    pub fn ignore_reason(&self, dialogue: &DialogueSystem) -> Option<IgnoreReason> {
        match &self.kind {
            ActorKind::Npc(conversation) => conversation.ignore_reason(dialogue),
            ActorKind::Prop(_) => dialogue
                .is_active()
                .then_some(IgnoreReason::SessionActive),
        }
    }

    pub fn interact(
        &mut self,
        dialogue: &mut DialogueSystem,
        host: &mut HostServices<'_>,
    ) -> Result<Interaction, GraphIntegrityError> {
        if let Some(reason) = self.ignore_reason(dialogue) {
            debug!("{} ({}) interaction ignored: {:?}", self.name, self.id, reason);
            return Ok(Interaction::Ignored(reason));
        }

        self.hide_indicator(host.presentation);
        let id = self.id;
        match &mut self.kind {
            ActorKind::Npc(conversation) => conversation.interact(id, dialogue, host),
            ActorKind::Prop(prop) => {
                let preempted = dialogue.show(DialogueRequest::new(prop.message.clone()), host);
                Ok(Interaction::Started { preempted })
            }
        }
    }
}
