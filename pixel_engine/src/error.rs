use thiserror::Error;

/// An NPC's current node id does not exist in its dialogue graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{npc}: dialogue node `{node}` not found")]
pub struct GraphIntegrityError {
    pub npc: String,
    pub node: String,
}
