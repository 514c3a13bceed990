use anyhow::Result;
use git::Repository;
use std::env;

fn main() -> Result<()> {
    // Use current directory if no path provided
    let path = env::args().nth(1).unwrap_or_else(|| ".".to_string());

    let repo = Repository::open(&path)?;
    println!("Opened repository at: {}", repo.work_dir().display());
    println!("Branch: {}", repo.current_branch()?);

    let status = repo.status()?;
    if status.is_clean() {
        println!("\nWorking tree is clean");
        return Ok(());
    }

    println!("\nModified files:");
    for path in &status.modified {
        println!("  {}", path);
    }

    println!("\nCreated files:");
    for path in &status.created {
        println!("  {}", path);
    }

    println!("\nDeleted files:");
    for path in &status.deleted {
        println!("  {}", path);
    }

    println!("\nRenamed files:");
    for rename in &status.renamed {
        println!("  {} -> {}", rename.old_path, rename.new_path);
    }

    println!("\nUntracked files:");
    for path in &status.untracked {
        println!("  {}", path);
    }

    println!("\nStaged files:");
    for path in &status.staged {
        println!("  {}", path);
    }

    Ok(())
}
