//! Listing scopes and registry topology

use colored::Colorize;
use scope_core::{Placement, Registry};

use crate::error::Result;

/// Run the list command
pub fn run_list(registry: &Registry) -> Result<()> {
    println!("{}", "Scopes".bold());
    println!();

    for node in registry.scopes() {
        let parent = node
            .parent()
            .map(|p| p.name().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<24} {} {}", node.name().green(), "parent:".dimmed(), parent);

        for (key, value) in node.tracked_items() {
            let raw = value
                .raw()
                .map(|raw| raw.to_string())
                .unwrap_or_else(|| "<unset>".to_string());
            println!("      {:<20} {:<10} {}", key, value.kind().name().cyan(), raw);
        }
    }

    println!();
    println!("{} {} scopes", "Total:".dimmed(), registry.len());
    Ok(())
}

/// Run the tree command
pub fn run_tree(registry: &Registry) -> Result<()> {
    for (name, placement) in registry.topology() {
        match placement {
            Placement::Node { parent: Some(parent) } => {
                println!("{name} -> {parent}");
            }
            Placement::Node { parent: None } => {
                println!("{name}");
            }
            Placement::Marker { waiting } => {
                println!(
                    "{name} {} (waiting: {})",
                    "marker".yellow(),
                    waiting.join(", ")
                );
            }
        }
    }
    Ok(())
}
