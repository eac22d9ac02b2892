//! Listing command handlers
//!
//! Show what an operation would run and where its playbooks resolve,
//! without invoking the engine.

use anyhow::Result;
use cairn_runner::Operation;
use colored::*;

use crate::config::Config;

/// List the phases of one operation, or of all of them
pub fn list_phases(operation: Option<Operation>) -> Result<()> {
    let operations = match operation {
        Some(operation) => vec![operation],
        None => Operation::ALL.to_vec(),
    };

    for operation in operations {
        println!("{}", format!("{}:", operation).bold());
        for (index, (kind, optional)) in operation.phases().iter().enumerate() {
            let optional = if *optional { " (optional)" } else { "" };
            println!(
                "  {:02} {}{}  {}",
                index + 1,
                kind.name().cyan(),
                optional.dimmed(),
                kind.playbooks().join(", ").dimmed()
            );
        }
        println!();
    }

    Ok(())
}

/// List the playbook catalog with the resolved paths
pub fn list_playbooks(config: &Config) -> Result<()> {
    let runner = config.runner()?;
    let catalog = runner.catalog();

    println!(
        "{}",
        format!(
            "{} playbook(s) in {}:",
            catalog.len(),
            runner.config().playbook_dir.display()
        )
        .bold()
    );

    for (id, path) in catalog.iter() {
        let state = if path.is_file() {
            "✓".green()
        } else {
            "missing".red()
        };
        println!(
            "  {} {}  {}",
            state,
            id.cyan(),
            path.display().to_string().dimmed()
        );
    }

    Ok(())
}
