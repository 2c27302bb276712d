use std::rc::Rc;

use anyhow::{Context, Result};
use log::{debug, error, info};
use pixel_formats::{DialogueData, NpcScript, SceneLayout};
use serde::Serialize;

use crate::actor::{Actor, ActorKind, IgnoreReason, Interaction};
use crate::arbiter::InteractionArbiter;
use crate::config::EngineConfig;
use crate::dialogue::{
    ChoiceAction, CompletionHook, DialogueRequest, DialogueSystem, Followup,
};
use crate::error::GraphIntegrityError;
use crate::host::HostServices;
use crate::input::{Button, InputHub, InputService, Listener, ListenerId};
use crate::npc::NpcConversation;
use crate::presentation::PresentationSink;
use crate::timer::{TimerEvent, TimerHandle, VirtualClock};
use crate::types::{ActorId, Position};

/// Something noteworthy that happened while the scene was running.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneEventKind {
    Pressed {
        button: Button,
    },
    NearbyChanged {
        actor: Option<ActorId>,
    },
    InteractionStarted {
        actor: ActorId,
        name: String,
    },
    InteractionIgnored {
        actor: ActorId,
        reason: IgnoreReason,
    },
    ChoiceFollowed {
        actor: ActorId,
        next: Option<String>,
    },
    ConversationEnded {
        actor: ActorId,
        leaf: bool,
    },
    Fault {
        actor: ActorId,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneEvent {
    pub at_ms: u64,
    #[serde(flatten)]
    pub kind: SceneEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneFault {
    pub at_ms: u64,
    pub actor: ActorId,
    pub npc: String,
    pub node: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActorSummary {
    pub id: ActorId,
    pub name: String,
    pub kind: &'static str,
    pub position: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_node: Option<String>,
    pub interacting: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneSummary {
    pub elapsed_ms: u64,
    pub frames: u64,
    pub sessions_opened: u64,
    pub timers_fired: usize,
    pub player: Position,
    pub nearby: Option<ActorId>,
    pub actors: Vec<ActorSummary>,
    pub faults: Vec<SceneFault>,
}

/// One room: the player, its actors and the shared dialogue slot.
///
/// The scene is the only place that turns timer events, button edges and
/// dialogue follow-ups back into calls on the interaction core.
pub struct Scene {
    config: EngineConfig,
    clock: VirtualClock,
    input: InputHub,
    presentation: Rc<dyn PresentationSink>,
    dialogue: DialogueSystem,
    actors: Vec<Actor>,
    arbiter: InteractionArbiter,
    player: Position,
    interaction_listener: Option<ListenerId>,
    faults: Vec<SceneFault>,
    events: Vec<SceneEvent>,
    frames: u64,
}

impl Scene {
    pub fn new(config: EngineConfig, presentation: Rc<dyn PresentationSink>) -> Self {
        let mut input = InputHub::new();
        let interaction_listener = input.subscribe(Button::Confirm, Listener::Interaction);
        Self {
            dialogue: DialogueSystem::new(config.dialogue_timing()),
            arbiter: InteractionArbiter::new(config.interaction_radius),
            config,
            clock: VirtualClock::new(),
            input,
            presentation,
            actors: Vec::new(),
            player: Position::default(),
            interaction_listener: Some(interaction_listener),
            faults: Vec::new(),
            events: Vec::new(),
            frames: 0,
        }
    }

    pub fn from_layout(
        layout: &SceneLayout,
        data: &DialogueData,
        config: EngineConfig,
        presentation: Rc<dyn PresentationSink>,
    ) -> Result<Self> {
        let mut scene = Self::new(config, presentation);
        scene.player = layout.player.into();
        for placement in &layout.npcs {
            let script = data
                .npc(&placement.key)
                .with_context(|| format!("scene places unknown npc `{}`", placement.key))?;
            scene.add_npc(script, Position::new(placement.x, placement.y));
        }
        for (index, prop) in layout.props.iter().enumerate() {
            let name = prop
                .name
                .clone()
                .unwrap_or_else(|| format!("prop{index}"));
            scene.add_prop(name, Position::new(prop.x, prop.y), prop.message.clone());
        }
        info!(
            "scene ready: {} actors, player at ({}, {})",
            scene.actors.len(),
            scene.player.x,
            scene.player.y
        );
        Ok(scene)
    }

    pub fn add_npc(&mut self, script: &NpcScript, position: Position) -> ActorId {
        let conversation = NpcConversation::from_script(
            script,
            &self.config.start_node,
            self.config.chain_delay_ms,
        );
        let id = ActorId(self.actors.len());
        self.actors.push(Actor::npc(id, position, conversation));
        id
    }

    pub fn add_prop(
        &mut self,
        name: impl Into<String>,
        position: Position,
        message: impl Into<String>,
    ) -> ActorId {
        let id = ActorId(self.actors.len());
        self.actors.push(Actor::prop(id, name, position, message));
        id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    pub fn dialogue(&self) -> &DialogueSystem {
        &self.dialogue
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.iter().find(|actor| actor.id() == id)
    }

    pub fn player(&self) -> Position {
        self.player
    }

    pub fn nearby(&self) -> Option<ActorId> {
        self.arbiter.nearby()
    }

    pub fn faults(&self) -> &[SceneFault] {
        &self.faults
    }

    pub fn events(&self) -> &[SceneEvent] {
        &self.events
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn parts(&mut self) -> (HostServices<'_>, &mut DialogueSystem, &mut Vec<Actor>) {
        (
            HostServices {
                timers: &mut self.clock,
                input: &mut self.input,
                presentation: self.presentation.as_ref(),
            },
            &mut self.dialogue,
            &mut self.actors,
        )
    }

    /// Fires every timer due within the next `ms` milliseconds, one at a time.
    pub fn advance(&mut self, ms: u64) {
        let until = self.clock.now_ms().saturating_add(ms);
        while let Some((handle, event)) = self.clock.pop_due(until) {
            self.dispatch_timer(handle, event);
        }
        self.clock.settle(until);
    }

    fn dispatch_timer(&mut self, handle: TimerHandle, event: TimerEvent) {
        match event {
            TimerEvent::RevealTick => {
                let (mut host, dialogue, _) = self.parts();
                dialogue.on_reveal_tick(handle, &mut host);
            }
            TimerEvent::InputUnlock => self.dialogue.on_input_unlock(handle),
            TimerEvent::Reinteract { actor } => {
                let claimed = self
                    .actors
                    .iter_mut()
                    .find(|candidate| candidate.id() == actor)
                    .and_then(Actor::as_npc_mut)
                    .is_some_and(|npc| npc.take_pending(handle));
                if claimed {
                    debug!("scene.reinteract {actor}");
                    self.interact_with(actor);
                }
            }
        }
    }

    /// Proximity pass; call once per frame after timers.
    pub fn update(&mut self) -> Option<ActorId> {
        let previous = self.arbiter.nearby();
        let nearby = self
            .arbiter
            .update(self.player, &mut self.actors, self.presentation.as_ref());
        if nearby != previous {
            self.push_event(SceneEventKind::NearbyChanged { actor: nearby });
        }
        nearby
    }

    pub fn step(&mut self, frame_ms: u64) {
        self.advance(frame_ms);
        self.update();
        self.frames += 1;
    }

    /// Delivers a key-down edge to the listeners subscribed when it happened.
    pub fn press(&mut self, button: Button) {
        self.push_event(SceneEventKind::Pressed { button });
        for (id, listener) in self.input.listeners_for(button) {
            if !self.input.is_subscribed(id) {
                continue;
            }
            match (listener, button) {
                (Listener::Interaction, Button::Confirm) => self.trigger(),
                (Listener::Interaction, _) => {}
                (Listener::Dialogue, Button::Confirm) => {
                    let (mut host, dialogue, _) = self.parts();
                    let followups = dialogue.on_confirm(&mut host);
                    self.apply(followups);
                }
                (Listener::Dialogue, Button::Up) => {
                    let (mut host, dialogue, _) = self.parts();
                    dialogue.on_up(&mut host);
                }
                (Listener::Dialogue, Button::Down) => {
                    let (mut host, dialogue, _) = self.parts();
                    dialogue.on_down(&mut host);
                }
            }
        }
    }

    fn trigger(&mut self) {
        let mut host = HostServices {
            timers: &mut self.clock,
            input: &mut self.input,
            presentation: self.presentation.as_ref(),
        };
        let outcome = self
            .arbiter
            .trigger(&mut self.actors, &mut self.dialogue, &mut host);
        if let Some((actor, result)) = outcome {
            self.record_interaction(actor, result);
        }
    }

    fn interact_with(&mut self, id: ActorId) {
        let (mut host, dialogue, actors) = self.parts();
        let Some(actor) = actors.iter_mut().find(|actor| actor.id() == id) else {
            return;
        };
        let result = actor.interact(dialogue, &mut host);
        self.record_interaction(id, result);
    }

    /// Opens a free-standing message, preempting whatever is on screen.
    pub fn show_message(&mut self, request: DialogueRequest) {
        let (mut host, dialogue, _) = self.parts();
        let followups = dialogue.show(request, &mut host);
        self.apply(followups);
    }

    /// Applies dialogue follow-ups in the order the dialogue produced them.
    pub fn apply(&mut self, followups: Vec<Followup>) {
        for followup in followups {
            match followup {
                Followup::Complete(CompletionHook::EndConversation { actor, leaf }) => {
                    if let Some(npc) = self
                        .actors
                        .iter_mut()
                        .find(|candidate| candidate.id() == actor)
                        .and_then(Actor::as_npc_mut)
                    {
                        npc.complete(leaf);
                    }
                    self.push_event(SceneEventKind::ConversationEnded { actor, leaf });
                }
                Followup::Select(ChoiceAction::Follow { actor, next }) => {
                    self.push_event(SceneEventKind::ChoiceFollowed {
                        actor,
                        next: next.clone(),
                    });
                    if let Some(npc) = self
                        .actors
                        .iter_mut()
                        .find(|candidate| candidate.id() == actor)
                        .and_then(Actor::as_npc_mut)
                    {
                        npc.select(actor, next, &mut self.clock);
                    }
                }
            }
        }
    }

    /// Moves the player unless a text box is open. Returns whether it moved.
    pub fn move_player(&mut self, dx: f32, dy: f32) -> bool {
        let target = self.player.offset(dx, dy);
        self.set_player_position(target)
    }

    pub fn set_player_position(&mut self, position: Position) -> bool {
        if self.dialogue.is_active() {
            return false;
        }
        self.player = position;
        true
    }

    /// Closes the open session and releases every timer and listener the
    /// scene still holds.
    pub fn shutdown(&mut self) {
        let (mut host, dialogue, _) = self.parts();
        let followups = dialogue.hide(&mut host);
        self.apply(followups);

        for actor in self.actors.iter_mut() {
            if let Some(npc) = actor.as_npc_mut() {
                npc.cancel_pending(&mut self.clock);
            }
        }
        if let Some(id) = self.interaction_listener.take() {
            self.input.unsubscribe(id);
        }
        info!("scene shut down at {} ms", self.clock.now_ms());
    }

    fn record_interaction(
        &mut self,
        actor: ActorId,
        result: Result<Interaction, GraphIntegrityError>,
    ) {
        match result {
            Ok(Interaction::Started { preempted }) => {
                let name = self
                    .actor(actor)
                    .map(|found| found.name().to_string())
                    .unwrap_or_default();
                info!("{name} ({actor}) interaction started");
                self.push_event(SceneEventKind::InteractionStarted { actor, name });
                self.apply(preempted);
            }
            Ok(Interaction::Ignored(reason)) => {
                debug!("{actor} interaction ignored: {reason:?}");
                self.push_event(SceneEventKind::InteractionIgnored { actor, reason });
            }
            Err(err) => {
                error!("{err}");
                self.faults.push(SceneFault {
                    at_ms: self.clock.now_ms(),
                    actor,
                    npc: err.npc.clone(),
                    node: err.node.clone(),
                });
                self.push_event(SceneEventKind::Fault {
                    actor,
                    message: err.to_string(),
                });
            }
        }
    }

    fn push_event(&mut self, kind: SceneEventKind) {
        self.events.push(SceneEvent {
            at_ms: self.clock.now_ms(),
            kind,
        });
    }

    pub fn summary(&self) -> SceneSummary {
        SceneSummary {
            elapsed_ms: self.clock.now_ms(),
            frames: self.frames,
            sessions_opened: self.dialogue.sessions_opened(),
            timers_fired: self.clock.history().len(),
            player: self.player,
            nearby: self.arbiter.nearby(),
            actors: self
                .actors
                .iter()
                .map(|actor| ActorSummary {
                    id: actor.id(),
                    name: actor.name().to_string(),
                    kind: match actor.kind() {
                        ActorKind::Npc(_) => "npc",
                        ActorKind::Prop(_) => "prop",
                    },
                    position: actor.position(),
                    current_node: actor.as_npc().map(|npc| npc.current_node().to_string()),
                    interacting: actor.as_npc().is_some_and(NpcConversation::is_interacting),
                })
                .collect(),
            faults: self.faults.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::DialoguePhase;
    use crate::presentation::RecordingPresentation;

    const DIALOGUE: &str = r#"{
        "npcs": {
            "villager": {
                "name": "Villager",
                "dialogues": [
                    { "id": "greeting", "text": "Hi", "choices": [
                        { "text": "Ask", "next": "nodeA" },
                        { "text": "Bye" }
                    ] },
                    { "id": "nodeA", "text": "Node A" },
                    { "id": "broken", "text": "Hm", "choices": [
                        { "text": "Go", "next": "ghost" }
                    ] }
                ]
            }
        }
    }"#;

    fn scene_with(config: EngineConfig) -> (Scene, RecordingPresentation, ActorId) {
        let data = DialogueData::from_json_str(DIALOGUE).expect("dialogue json");
        let sink = RecordingPresentation::new();
        let mut scene = Scene::new(config, Rc::new(sink.clone()));
        let villager = scene.add_npc(
            data.npc("villager").expect("villager"),
            Position::new(10.0, 0.0),
        );
        scene.update();
        (scene, sink, villager)
    }

    fn scene() -> (Scene, RecordingPresentation, ActorId) {
        scene_with(EngineConfig::default())
    }

    fn npc(scene: &Scene, id: ActorId) -> &NpcConversation {
        scene
            .actor(id)
            .and_then(Actor::as_npc)
            .expect("npc actor")
    }

    #[test]
    fn chained_conversation_reopens_after_delay_and_rewinds_at_leaf() {
        let (mut scene, sink, villager) = scene();

        scene.press(Button::Confirm);
        assert_eq!(scene.dialogue().full_text(), Some("Hi"));
        scene.advance(300);
        assert_eq!(scene.dialogue().phase(), DialoguePhase::AwaitingChoice);

        scene.press(Button::Confirm);
        assert!(!scene.dialogue().is_active());
        assert_eq!(npc(&scene, villager).current_node(), "nodeA");
        assert!(!npc(&scene, villager).is_interacting());

        scene.advance(99);
        assert!(!scene.dialogue().is_active());
        scene.advance(1);
        assert_eq!(scene.dialogue().full_text(), Some("Node A"));
        assert!(npc(&scene, villager).is_interacting());

        scene.advance(400);
        assert_eq!(sink.visible_text().as_deref(), Some("Node A"));
        scene.press(Button::Confirm);
        assert!(!scene.dialogue().is_active());
        assert_eq!(npc(&scene, villager).current_node(), "greeting");
        assert!(!npc(&scene, villager).is_interacting());
        assert_eq!(scene.dialogue().sessions_opened(), 2);
    }

    #[test]
    fn choice_without_next_ends_the_conversation() {
        let (mut scene, _sink, villager) = scene();
        scene.press(Button::Confirm);
        scene.advance(300);
        scene.press(Button::Down);
        scene.press(Button::Confirm);
        scene.advance(500);

        assert!(!scene.dialogue().is_active());
        assert_eq!(npc(&scene, villager).current_node(), "greeting");
        assert!(!npc(&scene, villager).has_pending_reinteract());
    }

    #[test]
    fn missing_next_node_is_recorded_and_recovers() {
        let config = EngineConfig {
            start_node: "broken".to_string(),
            ..EngineConfig::default()
        };
        let (mut scene, _sink, villager) = scene_with(config);
        scene.press(Button::Confirm);
        scene.advance(300);
        scene.press(Button::Confirm);
        scene.advance(100);

        assert!(!scene.dialogue().is_active());
        assert_eq!(scene.faults().len(), 1);
        assert_eq!(scene.faults()[0].node, "ghost");
        assert_eq!(npc(&scene, villager).current_node(), "broken");
        assert!(!npc(&scene, villager).is_interacting());

        scene.press(Button::Confirm);
        assert_eq!(scene.dialogue().full_text(), Some("Hm"));
    }

    #[test]
    fn free_message_preempts_and_releases_the_npc() {
        let (mut scene, _sink, villager) = scene();
        scene.press(Button::Confirm);
        assert!(npc(&scene, villager).is_interacting());

        scene.show_message(DialogueRequest::new("Saved."));
        assert_eq!(scene.dialogue().full_text(), Some("Saved."));
        assert!(!npc(&scene, villager).is_interacting());
        assert_eq!(npc(&scene, villager).current_node(), "greeting");
    }

    #[test]
    fn player_is_frozen_while_a_session_is_open() {
        let (mut scene, _sink, _) = scene();
        scene.press(Button::Confirm);
        assert!(!scene.move_player(5.0, 0.0));
        assert_eq!(scene.player(), Position::default());

        scene.advance(300);
        scene.press(Button::Down);
        scene.press(Button::Confirm);
        assert!(scene.move_player(5.0, 0.0));
        assert_eq!(scene.player(), Position::new(5.0, 0.0));
    }

    #[test]
    fn dismissing_confirm_does_not_reopen_the_prop() {
        let sink = RecordingPresentation::new();
        let mut scene = Scene::new(EngineConfig::default(), Rc::new(sink.clone()));
        scene.add_prop("plant", Position::new(4.0, 0.0), "A plant.");
        scene.update();

        scene.press(Button::Confirm);
        scene.advance(300);
        scene.press(Button::Confirm);

        assert!(!scene.dialogue().is_active());
        assert_eq!(scene.dialogue().sessions_opened(), 1);
        scene.press(Button::Confirm);
        assert_eq!(scene.dialogue().sessions_opened(), 2);
    }

    #[test]
    fn shutdown_cancels_pending_chain_and_input() {
        let (mut scene, _sink, villager) = scene();
        scene.press(Button::Confirm);
        scene.advance(300);
        scene.press(Button::Confirm);
        assert!(npc(&scene, villager).has_pending_reinteract());

        scene.shutdown();
        assert!(!npc(&scene, villager).has_pending_reinteract());
        scene.advance(500);
        scene.press(Button::Confirm);
        assert!(!scene.dialogue().is_active());
        assert_eq!(scene.dialogue().sessions_opened(), 1);
    }

    #[test]
    fn preempted_followups_from_an_interaction_reach_the_npc() {
        let (mut scene, _sink, villager) = scene();
        scene.press(Button::Confirm);
        assert!(npc(&scene, villager).is_interacting());
        let plant = scene.add_prop("plant", Position::new(4.0, 0.0), "A plant.");

        scene.record_interaction(
            plant,
            Ok(Interaction::Started {
                preempted: vec![Followup::Complete(CompletionHook::EndConversation {
                    actor: villager,
                    leaf: false,
                })],
            }),
        );

        assert!(!npc(&scene, villager).is_interacting());
        assert!(matches!(
            scene.events().last().map(|event| &event.kind),
            Some(SceneEventKind::ConversationEnded { actor, leaf: false }) if *actor == villager
        ));
    }

    #[test]
    fn unbounded_lock_and_chain_delays_do_not_overflow() {
        let config = EngineConfig {
            settle_lock_ms: u64::MAX,
            chain_delay_ms: u64::MAX,
            ..EngineConfig::default()
        };
        config.validate().expect("config is valid");
        let (mut scene, _sink, villager) = scene_with(config);

        scene.press(Button::Confirm);
        scene.advance(1_000);
        assert_eq!(scene.dialogue().phase(), DialoguePhase::AwaitingChoice);
        assert!(scene.dialogue().is_input_locked());

        scene.press(Button::Down);
        assert_eq!(scene.dialogue().selected_choice(), Some(0));
        scene.advance(u64::MAX);
        assert!(!scene.dialogue().is_input_locked());
        assert_eq!(npc(&scene, villager).current_node(), "greeting");
    }

    #[test]
    fn summary_reports_actor_state() {
        let (mut scene, _sink, _) = scene();
        scene.step(16);
        let summary = scene.summary();
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.nearby, Some(ActorId(0)));
        assert_eq!(summary.actors[0].kind, "npc");
        assert_eq!(summary.actors[0].current_node.as_deref(), Some("greeting"));

        let json = serde_json::to_value(scene.events()).expect("events serialize");
        assert_eq!(json[0]["kind"], "nearby_changed");
        assert_eq!(json[0]["at_ms"], 0);
    }
}
