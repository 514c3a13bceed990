use anyhow::Result;
use git::Repository;
use std::env;

fn main() -> Result<()> {
    let path = env::args().nth(1).unwrap_or_else(|| ".".to_string());
    let count = env::args()
        .nth(2)
        .and_then(|n| n.parse().ok())
        .unwrap_or(10);

    let repo = Repository::open(&path)?;
    println!(
        "Last {} commit(s) on {}:\n",
        count,
        repo.current_branch()?
    );

    for commit in repo.log(Some(count))? {
        println!(
            "{}  {}  {}",
            commit.short_id, commit.author_name, commit.message
        );
    }

    Ok(())
}
