use log::debug;

use crate::actor::{Actor, Interaction};
use crate::dialogue::DialogueSystem;
use crate::error::GraphIntegrityError;
use crate::host::HostServices;
use crate::presentation::PresentationSink;
use crate::types::{ActorId, Position};

/// Picks the single actor the player can talk to and routes confirm presses.
#[derive(Debug, Clone)]
pub struct InteractionArbiter {
    radius: f32,
    nearby: Option<ActorId>,
}

impl InteractionArbiter {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            nearby: None,
        }
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn nearby(&self) -> Option<ActorId> {
        self.nearby
    }

    /// Recomputes proximity. NPCs are considered before props; within a group
    /// the earliest-created actor inside the radius wins.
    pub fn update(
        &mut self,
        player: Position,
        actors: &mut [Actor],
        sink: &dyn PresentationSink,
    ) -> Option<ActorId> {
        let npcs = actors.iter().filter(|actor| actor.is_npc());
        let props = actors.iter().filter(|actor| !actor.is_npc());
        let nearby = npcs
            .chain(props)
            .find(|actor| player.distance_to(actor.position()) < self.radius)
            .map(Actor::id);

        if nearby != self.nearby {
            debug!(
                "arbiter.nearby {}",
                nearby.map_or_else(|| "none".to_string(), |id| id.to_string())
            );
        }
        self.nearby = nearby;

        for actor in actors.iter_mut() {
            if Some(actor.id()) == nearby {
                actor.show_indicator(sink);
            } else {
                actor.hide_indicator(sink);
            }
        }
        nearby
    }

    /// Routes a confirm press to the nearby actor. Presses made while a session
    /// is open, or with nobody in range, are dropped.
    pub fn trigger(
        &self,
        actors: &mut [Actor],
        dialogue: &mut DialogueSystem,
        host: &mut HostServices<'_>,
    ) -> Option<(ActorId, Result<Interaction, GraphIntegrityError>)> {
        if dialogue.is_active() {
            return None;
        }
        let id = self.nearby?;
        let actor = actors.iter_mut().find(|actor| actor.id() == id)?;
        Some((id, actor.interact(dialogue, host)))
    }
}
