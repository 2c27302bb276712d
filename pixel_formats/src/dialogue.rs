use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Node every conversation starts from unless a script overrides it.
pub const DEFAULT_START_NODE: &str = "greeting";

/// Top-level dialogue file: `{ "npcs": { "<key>": { "name", "dialogues": [...] } } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueData {
    #[serde(default)]
    pub npcs: BTreeMap<String, NpcScript>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpcScript {
    pub name: String,
    #[serde(default)]
    pub dialogues: Vec<DialogueNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueNode {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub choices: Vec<ChoiceSpec>,
}

impl DialogueNode {
    pub fn is_leaf(&self) -> bool {
        self.choices.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceSpec {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Integrity problems found while checking a dialogue graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("{npc}: choice {choice:?} on node `{node}` points at missing node `{next}`")]
    DanglingNext {
        npc: String,
        node: String,
        choice: String,
        next: String,
    },
    #[error("{npc}: node id `{node}` is defined more than once")]
    DuplicateNode { npc: String, node: String },
    #[error("{npc}: start node `{node}` is missing")]
    MissingStart { npc: String, node: String },
}

impl DialogueData {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parsing dialogue json")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading dialogue file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing dialogue json {}", path.display()))
    }

    pub fn npc(&self, key: &str) -> Option<&NpcScript> {
        self.npcs.get(key)
    }

    /// Checks every NPC graph against `start_node`, in key order.
    pub fn validate(&self, start_node: &str) -> Vec<GraphError> {
        self.npcs
            .values()
            .flat_map(|script| script.graph().validate(&script.name, start_node))
            .collect()
    }
}

impl NpcScript {
    pub fn graph(&self) -> DialogueGraph {
        DialogueGraph::new(self.dialogues.clone())
    }
}

/// Dialogue nodes of a single NPC, looked up by id.
///
/// Nodes keep their file order; when an id is duplicated the first definition
/// wins, matching a front-to-back search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogueGraph {
    nodes: Vec<DialogueNode>,
    index: BTreeMap<String, usize>,
}

impl DialogueGraph {
    pub fn new<N>(nodes: N) -> Self
    where
        N: IntoIterator<Item = DialogueNode>,
    {
        let nodes: Vec<DialogueNode> = nodes.into_iter().collect();
        let mut index = BTreeMap::new();
        for (position, node) in nodes.iter().enumerate() {
            index.entry(node.id.clone()).or_insert(position);
        }
        Self { nodes, index }
    }

    pub fn node(&self, id: &str) -> Option<&DialogueNode> {
        self.index.get(id).and_then(|&position| self.nodes.get(position))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl ExactSizeIterator<Item = &DialogueNode> {
        self.nodes.iter()
    }

    pub fn validate(&self, npc: &str, start_node: &str) -> Vec<GraphError> {
        let mut errors = Vec::new();

        if !self.contains(start_node) {
            errors.push(GraphError::MissingStart {
                npc: npc.to_string(),
                node: start_node.to_string(),
            });
        }

        let mut seen = BTreeSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                errors.push(GraphError::DuplicateNode {
                    npc: npc.to_string(),
                    node: node.id.clone(),
                });
            }
        }

        for node in &self.nodes {
            for choice in &node.choices {
                let Some(next) = choice.next.as_deref() else {
                    continue;
                };
                if !self.contains(next) {
                    errors.push(GraphError::DanglingNext {
                        npc: npc.to_string(),
                        node: node.id.clone(),
                        choice: choice.text.clone(),
                        next: next.to_string(),
                    });
                }
            }
        }

        errors
    }
}
