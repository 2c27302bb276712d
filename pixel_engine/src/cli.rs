use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Replays scripted input against a pixel RPG room and reports the dialogue it produced",
    version
)]
pub struct Args {
    /// Path to the dialogue JSON (npc scripts keyed by npc key)
    #[arg(long, default_value = "pixel_engine/data/dialogue.json")]
    pub data: PathBuf,

    /// Path to the scene layout JSON (player, npc and prop placements)
    #[arg(long, default_value = "pixel_engine/data/scene.json")]
    pub scene: PathBuf,

    /// Playback script to replay (default: built-in walk-through)
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Optional JSON file with engine timing and radius overrides
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to write the scene and presentation event log as JSON
    #[arg(long)]
    pub event_log_json: Option<PathBuf>,

    /// Path to write the end-of-run summary as JSON
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Refuse to run when the dialogue data has integrity problems, and fail on runtime faults
    #[arg(long)]
    pub strict: bool,

    /// Enable debug logging (RUST_LOG still takes precedence)
    #[arg(long)]
    pub verbose: bool,

    /// Milliseconds between revealed characters
    #[arg(long)]
    pub reveal_period_ms: Option<u64>,

    /// Delay before a chosen follow-up node opens
    #[arg(long)]
    pub chain_delay_ms: Option<u64>,

    /// Distance under which an actor counts as nearby
    #[arg(long)]
    pub interaction_radius: Option<f32>,

    /// Node id every conversation starts from
    #[arg(long)]
    pub start_node: Option<String>,

    /// Frame length used when the script does not set one
    #[arg(long)]
    pub frame_ms: Option<u64>,
}

pub fn parse() -> Result<Args> {
    let args = Args::parse();
    args.validate()?;
    Ok(args)
}

impl Args {
    fn validate(&self) -> Result<()> {
        if let (Some(events), Some(summary)) = (&self.event_log_json, &self.summary_json) {
            if events == summary {
                bail!(
                    "--event-log-json and --summary-json both point at {}",
                    events.display()
                );
            }
        }
        Ok(())
    }
}
