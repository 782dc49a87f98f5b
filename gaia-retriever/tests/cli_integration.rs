use anyhow::Result;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to run the CLI binary against the database in `temp_dir`
fn run_cli(temp_dir: &TempDir, args: &[&str]) -> Result<Output> {
    let output = Command::new(env!("CARGO_BIN_EXE_gaia"))
        .current_dir(temp_dir.path())
        .arg("--db")
        .arg(temp_dir.path().join("vectors"))
        .args(["--embedder", "hash"])
        .args(args)
        .output()?;
    Ok(output)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Helper to lay out a small document folder
fn populate_documents(root: &Path) -> Result<()> {
    let lore = root.join("docs").join("lore");
    let people = root.join("docs").join("personen");
    std::fs::create_dir_all(&lore)?;
    std::fs::create_dir_all(&people)?;

    std::fs::write(lore.join("orden.txt"), "Orden der Waldtempler")?;
    std::fs::write(lore.join("CONTEXT.yml"), "categories: [lore]\n")?;
    std::fs::write(people.join("albrecht.txt"), "Alchemie und Trank")?;
    std::fs::write(people.join("CONTEXT.yml"), "categories: [character]\n")?;
    Ok(())
}

fn indexed_workspace() -> Result<TempDir> {
    let temp_dir = TempDir::new()?;
    populate_documents(temp_dir.path())?;

    let docs = temp_dir.path().join("docs");
    let output = run_cli(&temp_dir, &["index", docs.to_string_lossy().as_ref()])?;
    assert!(
        output.status.success(),
        "index failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(temp_dir)
}

#[test]
fn test_index_reports_counts() -> Result<()> {
    let temp_dir = TempDir::new()?;
    populate_documents(temp_dir.path())?;
    let docs = temp_dir.path().join("docs");

    let output = run_cli(&temp_dir, &["index", docs.to_string_lossy().as_ref()])?;
    assert!(output.status.success());

    let out = stdout(&output);
    assert!(out.contains("Indexed 2 documents"));
    assert!(out.contains("small-chunks: 2 chunks"));
    assert!(out.contains("big-chunks: 2 chunks"));
    assert!(temp_dir.path().join("vectors").join("gaia.db").exists());
    Ok(())
}

#[test]
fn test_rebuild_does_not_duplicate_chunks() -> Result<()> {
    let temp_dir = indexed_workspace()?;
    let docs = temp_dir.path().join("docs");

    let output = run_cli(
        &temp_dir,
        &["index", docs.to_string_lossy().as_ref(), "--rebuild"],
    )?;
    assert!(output.status.success());

    let output = run_cli(&temp_dir, &["stats", "--format", "json"])?;
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let collections = stats.as_array().expect("stats should be a list");
    assert_eq!(collections.len(), 2);
    for collection in collections {
        assert_eq!(collection["chunk_count"], 2);
        assert_eq!(collection["document_count"], 2);
    }
    Ok(())
}

#[test]
fn test_stats_summary() -> Result<()> {
    let temp_dir = indexed_workspace()?;

    let output = run_cli(&temp_dir, &["stats"])?;
    assert!(output.status.success());

    let out = stdout(&output);
    assert!(out.contains("Database Statistics"));
    assert!(out.contains("small-chunks: 2 chunks from 2 documents"));
    assert!(out.contains("big-chunks: 2 chunks from 2 documents"));
    Ok(())
}

#[test]
fn test_search_json_with_filters() -> Result<()> {
    let temp_dir = indexed_workspace()?;

    let output = run_cli(
        &temp_dir,
        &[
            "search",
            "Waldtempler",
            "--granularity",
            "coarse",
            "--category",
            "character",
            "--format",
            "json",
        ],
    )?;
    assert!(output.status.success());

    let results: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    let results = results.as_array().expect("search should return a list");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["content"], "Alchemie und Trank");
    assert!(
        results[0]["chunk_id"]
            .as_str()
            .is_some_and(|id| id.ends_with("albrecht.txt_0"))
    );
    Ok(())
}

#[test]
fn test_search_summary_ranks_matching_chunk_first() -> Result<()> {
    let temp_dir = indexed_workspace()?;

    let output = run_cli(&temp_dir, &["search", "Orden der Waldtempler", "--limit", "2"])?;
    assert!(output.status.success());

    let out = stdout(&output);
    assert!(out.contains("Found 2 chunks:"));
    let first = out
        .lines()
        .find(|line| line.contains("Similarity:"))
        .unwrap_or_default();
    assert!(first.contains("orden.txt_0"), "unexpected first hit: {first}");
    Ok(())
}

#[test]
fn test_ask_without_answer_prints_passages() -> Result<()> {
    let temp_dir = indexed_workspace()?;

    let output = run_cli(&temp_dir, &["ask", "Orden der Waldtempler", "--no-answer"])?;
    assert!(
        output.status.success(),
        "ask failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let out = stdout(&output);
    assert!(out.contains("Found 1 chunks:"));
    assert!(out.contains("orden.txt_0"));
    assert!(!out.contains("albrecht.txt"));
    Ok(())
}

#[test]
fn test_ask_without_relevant_documents() -> Result<()> {
    let temp_dir = indexed_workspace()?;

    let output = run_cli(&temp_dir, &["ask", "Berg Gipfel Schnee", "--no-answer"])?;
    assert!(output.status.success());
    assert!(stdout(&output).contains("No relevant passages found."));
    Ok(())
}

#[test]
fn test_config_file_sets_database_dir() -> Result<()> {
    let temp_dir = TempDir::new()?;
    populate_documents(temp_dir.path())?;
    let db_dir = temp_dir.path().join("from-config");
    let config_path = temp_dir.path().join("custom.toml");
    std::fs::write(
        &config_path,
        format!(
            "database_dir = {:?}\n\n[retrieval]\nfine_collection = \"klein\"\n",
            db_dir.to_string_lossy()
        ),
    )?;

    let docs = temp_dir.path().join("docs");
    let output = Command::new(env!("CARGO_BIN_EXE_gaia"))
        .current_dir(temp_dir.path())
        .args(["--embedder", "hash", "--config"])
        .arg(&config_path)
        .arg("index")
        .arg(&docs)
        .output()?;
    assert!(
        output.status.success(),
        "index failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout(&output).contains("klein: 2 chunks"));
    assert!(db_dir.join("gaia.db").exists());
    Ok(())
}

#[test]
fn test_missing_document_path_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let output = run_cli(&temp_dir, &["index", "does-not-exist"])?;
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
    Ok(())
}

#[test]
fn test_invalid_granularity_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let output = run_cli(&temp_dir, &["search", "x", "--granularity", "medium"])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid granularity"));
    Ok(())
}
