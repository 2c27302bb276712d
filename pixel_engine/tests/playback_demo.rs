use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::tempdir;

fn data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data")
}

fn path_str(path: &std::path::Path) -> Result<&str> {
    path.to_str().context("path is not valid UTF-8")
}

#[test]
fn demo_walkthrough_logs_conversations() -> Result<()> {
    let data_dir = data_dir();
    let dialogue = data_dir.join("dialogue.json");
    let scene = data_dir.join("scene.json");

    let temp_dir = tempdir().context("creating temporary directory for logs")?;
    let event_log_path = temp_dir.path().join("events.json");
    let summary_path = temp_dir.path().join("summary.json");

    let output = Command::new(env!("CARGO_BIN_EXE_pixel_engine"))
        .args([
            "--data",
            path_str(&dialogue)?,
            "--scene",
            path_str(&scene)?,
            "--event-log-json",
            path_str(&event_log_path)?,
            "--summary-json",
            path_str(&summary_path)?,
            "--strict",
        ])
        .output()
        .context("executing pixel_engine demo")?;

    let transcript = String::from_utf8_lossy(&output.stdout).to_string();
    assert!(
        output.status.success(),
        "pixel_engine exited with {:?}\n{}{}",
        output.status,
        transcript,
        String::from_utf8_lossy(&output.stderr)
    );

    assert!(
        transcript.contains("[Villager] Hello there, traveler! Welcome to our village."),
        "greeting missing from transcript:\n{transcript}"
    );
    assert!(
        transcript.contains("[Villager] They say a mysterious figure"),
        "chained leaf node missing from transcript:\n{transcript}"
    );
    assert!(transcript.contains("A potted plant. It looks well cared for."));
    assert!(transcript.contains("> Leave"));
    assert!(transcript.contains("Dialogue sessions opened: 5"));

    let summary: Value = serde_json::from_str(
        &fs::read_to_string(&summary_path).context("reading run summary")?,
    )?;
    assert_eq!(summary["scene"]["sessions_opened"], 5);
    assert_eq!(summary["scene"]["faults"].as_array().map(Vec::len), Some(0));
    let villager = summary["scene"]["actors"]
        .as_array()
        .and_then(|actors| actors.iter().find(|actor| actor["name"] == "Villager"))
        .context("villager missing from summary")?;
    assert_eq!(villager["current_node"], "greeting");
    assert_eq!(villager["interacting"], false);

    let events: Value = serde_json::from_str(
        &fs::read_to_string(&event_log_path).context("reading event log")?,
    )?;
    let started: Vec<&str> = events["scene"]
        .as_array()
        .context("scene events missing")?
        .iter()
        .filter(|event| event["kind"] == "interaction_started")
        .filter_map(|event| event["name"].as_str())
        .collect();
    assert_eq!(
        started,
        vec!["Villager", "Villager", "Villager", "plant", "???"]
    );
    let followed = events["scene"]
        .as_array()
        .map(|list| {
            list.iter()
                .filter(|event| event["kind"] == "choice_followed")
                .count()
        })
        .unwrap_or_default();
    assert_eq!(followed, 3);

    let presentation = events["presentation"]
        .as_array()
        .context("presentation events missing")?;
    assert!(presentation
        .iter()
        .any(|event| event["kind"] == "indicator" && event["indicator"] == "inspect"));
    Ok(())
}

#[test]
fn scripted_playback_follows_second_choice() -> Result<()> {
    let data_dir = data_dir();
    let temp_dir = tempdir().context("creating temporary directory for summary")?;
    let summary_path = temp_dir.path().join("summary.json");

    let output = Command::new(env!("CARGO_BIN_EXE_pixel_engine"))
        .args([
            "--data",
            path_str(&data_dir.join("dialogue.json"))?,
            "--scene",
            path_str(&data_dir.join("scene.json"))?,
            "--script",
            path_str(&data_dir.join("news_script.json"))?,
            "--summary-json",
            path_str(&summary_path)?,
        ])
        .output()
        .context("executing pixel_engine with news script")?;

    let transcript = String::from_utf8_lossy(&output.stdout).to_string();
    assert!(output.status.success(), "pixel_engine failed:\n{transcript}");
    assert!(transcript.contains("[Villager] The harvest was good this year."));
    assert!(transcript.contains("Rows of dusty books."));

    let summary: Value = serde_json::from_str(&fs::read_to_string(&summary_path)?)?;
    assert_eq!(summary["scene"]["sessions_opened"], 3);
    assert_eq!(summary["playback"]["blocked_moves"], 0);
    Ok(())
}

#[test]
fn strict_mode_rejects_dangling_choices() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for data")?;
    let dialogue = temp_dir.path().join("dialogue.json");
    fs::write(
        &dialogue,
        r#"{ "npcs": { "villager1": { "name": "Villager", "dialogues": [
            { "id": "greeting", "text": "Hi", "choices": [ { "text": "Go", "next": "nowhere" } ] }
        ] } } }"#,
    )?;
    let scene = temp_dir.path().join("scene.json");
    fs::write(
        &scene,
        r#"{ "player": { "x": 0, "y": 0 }, "npcs": [ { "key": "villager1", "x": 5, "y": 0 } ] }"#,
    )?;

    let output = Command::new(env!("CARGO_BIN_EXE_pixel_engine"))
        .args([
            "--data",
            path_str(&dialogue)?,
            "--scene",
            path_str(&scene)?,
            "--strict",
        ])
        .output()
        .context("executing pixel_engine in strict mode")?;

    assert!(!output.status.success(), "strict run should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("dialogue graph problem"),
        "unexpected stderr:\n{stderr}"
    );
    Ok(())
}
