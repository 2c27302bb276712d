use std::fs;

use anyhow::{Context, Result};
use pixel_formats::{DEFAULT_START_NODE, DialogueData, GraphError, SceneLayout};
use tempfile::tempdir;

#[test]
fn dialogue_file_round_trips_through_disk() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory")?;
    let path = temp_dir.path().join("dialogue.json");
    fs::write(
        &path,
        r#"{
            "npcs": {
                "mysterious_figure": {
                    "name": "???",
                    "dialogues": [
                        {
                            "id": "greeting",
                            "text": "...",
                            "choices": [ { "text": "Hello?", "next": "whisper" } ]
                        }
                    ]
                }
            }
        }"#,
    )?;

    let data = DialogueData::from_path(&path)?;
    let errors = data.validate(DEFAULT_START_NODE);
    assert_eq!(
        errors,
        vec![GraphError::DanglingNext {
            npc: "???".to_string(),
            node: "greeting".to_string(),
            choice: "Hello?".to_string(),
            next: "whisper".to_string(),
        }]
    );
    Ok(())
}

#[test]
fn missing_files_report_their_path() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("absent.json");

    let err = SceneLayout::from_path(&path).expect_err("missing layout should fail");
    assert!(
        format!("{err:#}").contains("absent.json"),
        "error should mention the path: {err:#}"
    );
}
