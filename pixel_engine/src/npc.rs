use log::debug;
use pixel_formats::{DialogueGraph, NpcScript};

use crate::actor::{IgnoreReason, Interaction};
use crate::dialogue::{Choice, ChoiceAction, CompletionHook, DialogueRequest, DialogueSystem};
use crate::error::GraphIntegrityError;
use crate::host::HostServices;
use crate::timer::{TimerEvent, TimerHandle, TimerService};
use crate::types::ActorId;

/// Walks one NPC's dialogue graph, one node per dialogue session.
#[derive(Debug, Clone)]
pub struct NpcConversation {
    name: String,
    graph: DialogueGraph,
    start_node: String,
    current_node: String,
    interacting: bool,
    chain_delay_ms: u64,
    pending_reinteract: Option<TimerHandle>,
}

impl NpcConversation {
    pub fn new(
        name: impl Into<String>,
        graph: DialogueGraph,
        start_node: impl Into<String>,
        chain_delay_ms: u64,
    ) -> Self {
        let start_node = start_node.into();
        Self {
            name: name.into(),
            graph,
            current_node: start_node.clone(),
            start_node,
            interacting: false,
            chain_delay_ms,
            pending_reinteract: None,
        }
    }

    pub fn from_script(script: &NpcScript, start_node: &str, chain_delay_ms: u64) -> Self {
        Self::new(script.name.clone(), script.graph(), start_node, chain_delay_ms)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current_node(&self) -> &str {
        &self.current_node
    }

    pub fn start_node(&self) -> &str {
        &self.start_node
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    pub fn has_pending_reinteract(&self) -> bool {
        self.pending_reinteract.is_some()
    }

    pub fn ignore_reason(&self, dialogue: &DialogueSystem) -> Option<IgnoreReason> {
        if self.interacting {
            Some(IgnoreReason::AlreadyInteracting)
        } else if dialogue.is_active() {
            Some(IgnoreReason::SessionActive)
        } else {
            None
        }
    }

    /// Opens a session for the current node.
    ///
    /// A missing node aborts the interaction, releases the guard and rewinds
    /// to the start node so the next attempt can succeed.
    pub fn interact(
        &mut self,
        actor: ActorId,
        dialogue: &mut DialogueSystem,
        host: &mut HostServices<'_>,
    ) -> Result<Interaction, GraphIntegrityError> {
        if let Some(reason) = self.ignore_reason(dialogue) {
            return Ok(Interaction::Ignored(reason));
        }

        // Talking to the NPC directly supersedes a queued chain step.
        self.cancel_pending(host.timers);
        self.interacting = true;

        let Some(node) = self.graph.node(&self.current_node) else {
            let err = GraphIntegrityError {
                npc: self.name.clone(),
                node: self.current_node.clone(),
            };
            self.interacting = false;
            self.current_node = self.start_node.clone();
            return Err(err);
        };

        let choices = node.choices.iter().map(|choice| {
            Choice::new(
                choice.text.clone(),
                ChoiceAction::Follow {
                    actor,
                    next: choice.next.clone(),
                },
            )
        });
        let request = DialogueRequest::new(node.text.clone())
            .with_speaker(self.name.clone())
            .with_choices(choices)
            .on_complete(CompletionHook::EndConversation {
                actor,
                leaf: node.is_leaf(),
            });

        debug!("npc.{} node {}", self.name, node.id);
        let preempted = dialogue.show(request, host);
        Ok(Interaction::Started { preempted })
    }

    /// Session closed: release the guard and, after a leaf, rewind.
    pub fn complete(&mut self, leaf: bool) {
        self.interacting = false;
        if leaf {
            self.current_node = self.start_node.clone();
        }
    }

    /// A choice of this NPC was picked after its session closed.
    pub fn select(&mut self, actor: ActorId, next: Option<String>, timers: &mut dyn TimerService) {
        match next {
            Some(next) => {
                debug!("npc.{} next {}", self.name, next);
                self.current_node = next;
                self.cancel_pending(timers);
                self.pending_reinteract = Some(
                    timers.schedule_once(self.chain_delay_ms, TimerEvent::Reinteract { actor }),
                );
            }
            None => {
                self.interacting = false;
            }
        }
    }

    /// Claims a fired re-interaction timer; false for stale or foreign handles.
    pub fn take_pending(&mut self, handle: TimerHandle) -> bool {
        if self.pending_reinteract == Some(handle) {
            self.pending_reinteract = None;
            true
        } else {
            false
        }
    }

    pub fn cancel_pending(&mut self, timers: &mut dyn TimerService) {
        if let Some(handle) = self.pending_reinteract.take() {
            timers.cancel(handle);
        }
    }
}
