use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::input::Button;
use crate::scene::Scene;
use crate::types::Position;

use PlaybackStep::{Move, MoveTo, Press, Wait};

/// Scripted player input replayed against a scene, one frame per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackScript {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_ms: Option<u64>,
    pub steps: Vec<PlaybackStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStep {
    Move { dx: f32, dy: f32 },
    MoveTo { x: f32, y: f32 },
    Press(Button),
    /// Runs frames until this many milliseconds have passed.
    Wait(u64),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackReport {
    pub steps: usize,
    pub frames: u64,
    pub presses: usize,
    pub blocked_moves: usize,
}

impl PlaybackScript {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parsing playback script json")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading playback script {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing playback script json {}", path.display()))
    }

    /// Walk-through of the bundled room: a chained villager conversation, the
    /// potted plant and a short exchange with the stranger.
    pub fn demo() -> Self {
        let confirm = || Press(Button::Confirm);
        Self {
            frame_ms: None,
            steps: vec![
                Move { dx: -10.0, dy: 0.0 },
                Move { dx: -10.0, dy: 0.0 },
                Move { dx: -10.0, dy: 0.0 },
                confirm(),
                Wait(250),
                confirm(),
                Wait(250),
                confirm(),
                Wait(400),
                confirm(),
                Wait(250),
                confirm(),
                Wait(400),
                confirm(),
                Wait(250),
                confirm(),
                MoveTo { x: 65.0, y: 60.0 },
                confirm(),
                Wait(1500),
                confirm(),
                MoveTo { x: 195.0, y: 85.0 },
                confirm(),
                Wait(250),
                Press(Button::Down),
                confirm(),
                Wait(100),
            ],
        }
    }

    /// Replays every step; `default_frame_ms` applies when the script names none.
    pub fn run(&self, scene: &mut Scene, default_frame_ms: u64) -> PlaybackReport {
        let frame_ms = self.frame_ms.unwrap_or(default_frame_ms).max(1);
        let mut report = PlaybackReport::default();

        for step in &self.steps {
            debug!("playback step {step:?} at {} ms", scene.now_ms());
            match step {
                Move { dx, dy } => {
                    if !scene.move_player(*dx, *dy) {
                        report.blocked_moves += 1;
                    }
                    scene.step(frame_ms);
                    report.frames += 1;
                }
                MoveTo { x, y } => {
                    if !scene.set_player_position(Position::new(*x, *y)) {
                        report.blocked_moves += 1;
                    }
                    scene.step(frame_ms);
                    report.frames += 1;
                }
                Press(button) => {
                    scene.press(*button);
                    report.presses += 1;
                    scene.step(frame_ms);
                    report.frames += 1;
                }
                Wait(ms) => {
                    let mut remaining = *ms;
                    while remaining > 0 {
                        let dt = remaining.min(frame_ms);
                        scene.step(dt);
                        report.frames += 1;
                        remaining -= dt;
                    }
                }
            }
            report.steps += 1;
        }
        report
    }
}
