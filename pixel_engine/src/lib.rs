pub mod actor;
pub mod arbiter;
pub mod config;
pub mod dialogue;
pub mod error;
pub mod host;
pub mod input;
pub mod npc;
pub mod playback;
pub mod presentation;
pub mod scene;
pub mod timer;
pub mod types;

pub use actor::{Actor, ActorKind, IgnoreReason, Interaction, Prop};
pub use arbiter::InteractionArbiter;
pub use config::EngineConfig;
pub use dialogue::{
    Choice, ChoiceAction, CompletionHook, DialoguePhase, DialogueRequest, DialogueSystem,
    DialogueTiming, Followup,
};
pub use error::GraphIntegrityError;
pub use host::HostServices;
pub use input::{Button, InputHub, InputService, Listener, ListenerId};
pub use npc::NpcConversation;
pub use playback::{PlaybackReport, PlaybackScript, PlaybackStep};
pub use presentation::{
    ConsolePresentation, FanoutPresentation, IndicatorKind, PresentationEvent, PresentationSink,
    RecordingPresentation,
};
pub use scene::{Scene, SceneEvent, SceneEventKind, SceneFault, SceneSummary};
pub use timer::{TimerEvent, TimerHandle, TimerService, VirtualClock};
pub use types::{ActorId, Position};
