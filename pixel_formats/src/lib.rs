pub mod dialogue;
pub mod scene;

pub use dialogue::{
    ChoiceSpec, DEFAULT_START_NODE, DialogueData, DialogueGraph, DialogueNode, GraphError,
    NpcScript,
};
pub use scene::{NpcPlacement, Point, PropPlacement, SceneLayout};
