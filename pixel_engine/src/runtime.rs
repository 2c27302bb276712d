use std::{fs, path::Path, rc::Rc};

use anyhow::{bail, Context, Result};
use log::{info, warn};
use pixel_engine::{
    ConsolePresentation, EngineConfig, FanoutPresentation, PlaybackReport, PlaybackScript,
    PresentationEvent, RecordingPresentation, Scene, SceneEvent, SceneSummary,
};
use pixel_formats::{DialogueData, SceneLayout};
use serde::Serialize;

use crate::cli::Args;

#[derive(Serialize)]
struct EventLog<'a> {
    scene: &'a [SceneEvent],
    presentation: Vec<PresentationEvent>,
}

#[derive(Serialize)]
struct RunSummary {
    playback: PlaybackReport,
    scene: SceneSummary,
}

pub fn execute(args: Args) -> Result<()> {
    let config = load_config(&args)?;

    let data = DialogueData::from_path(&args.data)?;
    let layout = SceneLayout::from_path(&args.scene)?;

    let problems = data.validate(&config.start_node);
    for problem in &problems {
        warn!("{problem}");
    }
    if args.strict && !problems.is_empty() {
        bail!(
            "{} dialogue graph problem(s) in {}",
            problems.len(),
            args.data.display()
        );
    }

    let script = match args.script.as_ref() {
        Some(path) => PlaybackScript::from_path(path)?,
        None => PlaybackScript::demo(),
    };

    let recorder = RecordingPresentation::new();
    let presentation = FanoutPresentation::new()
        .with(Rc::new(recorder.clone()))
        .with(Rc::new(ConsolePresentation::new()));
    let mut scene = Scene::from_layout(&layout, &data, config.clone(), Rc::new(presentation))
        .with_context(|| format!("building scene from {}", args.scene.display()))?;

    scene.update();
    let report = script.run(&mut scene, config.frame_ms);
    scene.shutdown();
    info!(
        "playback finished: {} steps, {} frames",
        report.steps, report.frames
    );

    if let Some(path) = args.event_log_json.as_ref() {
        let log = EventLog {
            scene: scene.events(),
            presentation: recorder.events(),
        };
        write_json(path, &log, "event log")?;
        println!("Saved event log to {}", path.display());
    }

    let summary = RunSummary {
        playback: report,
        scene: scene.summary(),
    };
    if let Some(path) = args.summary_json.as_ref() {
        write_json(path, &summary, "run summary")?;
        println!("Saved run summary to {}", path.display());
    }

    println!(
        "Replayed {} steps over {} frames ({} ms)",
        summary.playback.steps, summary.playback.frames, summary.scene.elapsed_ms
    );
    println!(
        "Dialogue sessions opened: {}",
        summary.scene.sessions_opened
    );
    for fault in &summary.scene.faults {
        println!(
            "  fault @{}ms: {} is missing node `{}`",
            fault.at_ms, fault.npc, fault.node
        );
    }

    if args.strict && !summary.scene.faults.is_empty() {
        bail!(
            "{} dialogue fault(s) during playback",
            summary.scene.faults.len()
        );
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config =
        EngineConfig::from_json_file(args.config.as_deref()).context("loading engine config")?;
    if let Some(value) = args.reveal_period_ms {
        config.reveal_period_ms = value;
    }
    if let Some(value) = args.chain_delay_ms {
        config.chain_delay_ms = value;
    }
    if let Some(value) = args.interaction_radius {
        config.interaction_radius = value;
    }
    if let Some(value) = args.start_node.as_ref() {
        config.start_node = value.clone();
    }
    if let Some(value) = args.frame_ms {
        config.frame_ms = value;
    }
    config.validate().context("validating engine config overrides")?;
    Ok(config)
}

fn write_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
    let json =
        serde_json::to_string_pretty(value).with_context(|| format!("serializing {what} to JSON"))?;
    fs::write(path, &json).with_context(|| format!("writing {what} to {}", path.display()))
}
