//! Walks the whole data path against a real repository: status refresh
//! into changelists, gutter ranges for one file, then shelve and preview.
//!
//! Usage: shelve_workflow [repo-path]

use anyhow::Result;
use std::env;
use std::sync::Arc;

use gutter_diff::parse_unified_diff;
use shelvery::{
    ChangeListManager, ChangelistStore, Config, JsonFileStore, ShelveOptions, ShelveStore,
};

fn main() -> Result<()> {
    env_logger::init();

    let path = env::args().nth(1).unwrap_or_else(|| ".".to_string());
    let repo = Arc::new(git::Repository::open(&path)?);
    let config = Arc::new(Config::default());

    println!("Repository: {}", repo.work_dir().display());
    println!("Branch:     {}", repo.current_branch()?);

    // State lives next to the repository's own metadata
    let state_dir = repo.work_dir().join(".git").join("shelvery");
    let mut changelists = ChangelistStore::new(
        Box::new(JsonFileStore::new(state_dir.clone())),
        config.clone(),
    );
    let mut shelves = ShelveStore::new(
        repo.clone(),
        Box::new(JsonFileStore::new(state_dir)),
        config,
    );

    // Pull working-tree status into the changelists
    let mut manager = ChangeListManager::new(repo.clone());
    let changes = manager.refresh(&mut changelists)?;
    println!("\n{} changed file(s)", changes.len());

    for changelist in changelists.get_all_changelists() {
        let marker = if changelist.is_active { "*" } else { " " };
        println!("{} {} ({} files)", marker, changelist.name, changelist.files.len());
        for file in &changelist.files {
            println!("    {} {}", file.status, file.relative_path);
        }
    }

    // Gutter ranges for the first modified file
    if let Some(change) = changes.first() {
        let patch = repo.workdir_patch(&change.relative_path)?;
        println!("\nGutter ranges for {}:", change.relative_path);
        for range in parse_unified_diff(&patch) {
            println!("  {} lines {}..{}", range.kind, range.start_line, range.end_line);
        }
    }

    // Shelve the active changelist if it holds anything
    let active = changelists.active_changelist().clone();
    if active.files.is_empty() {
        println!("\nActive changelist is empty, nothing to shelve");
        return Ok(());
    }

    let shelf = shelves.create_shelf_from_changelist(
        "example shelf",
        &active,
        ShelveOptions::default(),
    )?;
    println!("\nCreated shelf '{}' ({})", shelf.name, shelf.id);

    let preview = shelves.preview_unshelve(&shelf.id)?;
    for report in &preview.files {
        println!("  {}", report.description);
    }

    // Leave the working tree alone; just clean up the demo shelf
    shelves.delete_shelf(&shelf.id)?;

    Ok(())
}
